// Overlay state machine - error / loading / no-data messages over the chart
use crate::application::host::Surface;
use crate::domain::options::{ChartOptions, OverlayMessage};
use std::ops::{Deref, DerefMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Error,
    Loading,
    NoData,
}

/// Inputs to the overlay decision, read fresh on every draw.
#[derive(Debug, Clone, Copy)]
pub struct OverlayInputs<'a> {
    pub error: Option<&'a str>,
    pub loading: bool,
    pub has_data: bool,
}

/// Message to paint, if any. Error beats loading beats no-data.
pub fn select_overlay<'a>(
    inputs: OverlayInputs<'a>,
    options: &'a ChartOptions,
) -> Option<(OverlayKind, &'a OverlayMessage, String)> {
    if let Some(error) = inputs.error {
        let text = options
            .error_msg
            .message
            .clone()
            .unwrap_or_else(|| error.to_string());
        return Some((OverlayKind::Error, &options.error_msg, text));
    }
    if inputs.loading {
        let template = options.loading_msg.as_ref()?;
        let text = template.message.clone().unwrap_or_default();
        return Some((OverlayKind::Loading, template, text));
    }
    if !inputs.has_data {
        let text = options.no_data_msg.message.clone().unwrap_or_default();
        return Some((OverlayKind::NoData, &options.no_data_msg, text));
    }
    None
}

/// Saved surface state, restored when dropped.
pub struct SurfaceGuard<'a> {
    surface: &'a mut dyn Surface,
}

impl<'a> SurfaceGuard<'a> {
    pub fn new(surface: &'a mut dyn Surface) -> Self {
        surface.save();
        Self { surface }
    }
}

impl<'a> Deref for SurfaceGuard<'a> {
    type Target = dyn Surface + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.surface
    }
}

impl<'a> DerefMut for SurfaceGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.surface
    }
}

impl Drop for SurfaceGuard<'_> {
    fn drop(&mut self) {
        self.surface.restore();
    }
}

/// Clear the surface and write `text` centered, styled by `template`.
pub fn write_text(
    surface: &mut dyn Surface,
    width: u32,
    height: u32,
    template: &OverlayMessage,
    text: &str,
) {
    surface.clear();

    let mut styled = SurfaceGuard::new(surface);
    styled.set_direction(template.direction);
    styled.set_text_align(template.text_align);
    styled.set_text_baseline(template.text_baseline);
    styled.set_font(&template.font);
    styled.fill_text(text, f64::from(width) / 2.0, f64::from(height) / 2.0);
}
