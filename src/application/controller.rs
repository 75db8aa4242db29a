// Lifecycle controller - per-chart refresh state machine
use crate::application::axes::{fill_gaps, time_axis};
use crate::application::dispatcher::dispatch;
use crate::application::host::{ChartHost, ChartId, UpdateRequester};
use crate::application::merge::build_datasets;
use crate::application::overlay::{select_overlay, write_text, OverlayInputs};
use crate::application::query_executor::QueryExecutor;
use crate::domain::dataset::VisibilityMap;
use crate::domain::options::{ChartOptions, PartialOptions};
use crate::domain::series::QueryResult;
use crate::domain::step::effective_step;
use crate::domain::time_range::{Clock, SystemClock, TimeWindow};
use crate::error::{Error, RefreshError, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

/// Overlay text stored in the chart state when a refresh fails.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch data";

/// Mutable state of one chart, owned by the controller.
#[derive(Debug, Default)]
pub struct PerChartState {
    /// A dispatch is outstanding.
    pub loading: bool,
    /// The controller's own render pass is running.
    pub rendering: bool,
    pub error: Option<String>,
    update_interval: Option<JoinHandle<()>>,
    applied: Option<(u64, TimeWindow)>,
}

impl PerChartState {
    /// Step and window of the last dispatched refresh.
    pub fn applied(&self) -> Option<(u64, TimeWindow)> {
        self.applied
    }

    pub fn has_update_interval(&self) -> bool {
        self.update_interval.is_some()
    }

    fn cancel_update_interval(&mut self) {
        if let Some(handle) = self.update_interval.take() {
            handle.abort();
        }
    }
}

/// Outcome of the before-update hook.
#[derive(Debug)]
pub enum UpdateDecision {
    /// Let the host draw with its current datasets.
    Proceed,
    /// Data is on its way; the host should skip this draw and hand the
    /// completed task back through [`LifecycleController::complete_refresh`].
    Defer(RefreshTask),
}

/// An outstanding dispatch plus everything needed to apply its result.
pub struct RefreshTask {
    chart: ChartId,
    options: Arc<ChartOptions>,
    window: TimeWindow,
    step: u64,
    visibility: VisibilityMap,
    pending: BoxFuture<'static, std::result::Result<Vec<QueryResult>, RefreshError>>,
}

impl RefreshTask {
    pub fn chart(&self) -> ChartId {
        self.chart
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn step(&self) -> u64 {
        self.step
    }
}

impl fmt::Debug for RefreshTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshTask")
            .field("chart", &self.chart)
            .field("window", &self.window)
            .field("step", &self.step)
            .finish_non_exhaustive()
    }
}

impl IntoFuture for RefreshTask {
    type Output = RefreshCompletion;
    type IntoFuture = BoxFuture<'static, RefreshCompletion>;

    fn into_future(self) -> Self::IntoFuture {
        let RefreshTask {
            chart,
            options,
            window,
            step,
            visibility,
            pending,
        } = self;
        async move {
            RefreshCompletion {
                chart,
                options,
                window,
                step,
                visibility,
                outcome: pending.await,
            }
        }
        .boxed()
    }
}

/// A finished dispatch, ready to be applied to its chart.
pub struct RefreshCompletion {
    chart: ChartId,
    options: Arc<ChartOptions>,
    window: TimeWindow,
    step: u64,
    visibility: VisibilityMap,
    outcome: std::result::Result<Vec<QueryResult>, RefreshError>,
}

impl RefreshCompletion {
    pub fn chart(&self) -> ChartId {
        self.chart
    }
}

/// Entry points invoked by the hosting chart, plus the state of every chart
/// registered with it.
pub struct LifecycleController {
    executor: Arc<dyn QueryExecutor>,
    clock: Arc<dyn Clock>,
    charts: HashMap<ChartId, PerChartState>,
}

impl LifecycleController {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self::with_clock(executor, Arc::new(SystemClock))
    }

    pub fn with_clock(executor: Arc<dyn QueryExecutor>, clock: Arc<dyn Clock>) -> Self {
        Self {
            executor,
            clock,
            charts: HashMap::new(),
        }
    }

    pub fn state(&self, id: ChartId) -> Option<&PerChartState> {
        self.charts.get(&id)
    }

    /// Allocate fresh state for `id`.
    pub fn initialize(&mut self, id: ChartId) {
        if let Some(mut previous) = self.charts.insert(id, PerChartState::default()) {
            previous.cancel_update_interval();
        }
    }

    /// Validate the options, then arm auto-refresh or request a first cycle.
    pub fn after_initialize(
        &mut self,
        id: ChartId,
        partial: &PartialOptions,
        requester: &UpdateRequester,
    ) -> Result<()> {
        let options = partial.validate()?;
        let state = state_mut(&mut self.charts, id)?;

        match options.update_interval() {
            Some(period) => {
                state.cancel_update_interval();
                state.update_interval = Some(arm_update_interval(period, requester.clone()));
                tracing::info!("Auto-refresh armed for {} every {:?}", id, period);
            }
            None => {
                requester.request_update();
            }
        }
        Ok(())
    }

    /// Render-cycle hook, run before every host draw.
    pub fn before_update<H: ChartHost + ?Sized>(
        &mut self,
        id: ChartId,
        host: &mut H,
        partial: &PartialOptions,
    ) -> Result<UpdateDecision> {
        let options = Arc::new(partial.validate()?);
        self.before_update_with(id, host, options)
    }

    /// Repaint the overlay after the host has drawn.
    pub fn after_draw<H: ChartHost + ?Sized>(
        &mut self,
        id: ChartId,
        host: &mut H,
        partial: &PartialOptions,
    ) -> Result<()> {
        let options = partial.validate()?;
        self.paint(id, host, &options)
    }

    /// Cancel auto-refresh and forget the chart. In-flight requests are left
    /// to finish; their completions are discarded.
    pub fn destroy(&mut self, id: ChartId) -> Result<()> {
        let mut state = self.charts.remove(&id).ok_or(Error::UnknownChart(id))?;
        state.cancel_update_interval();
        tracing::info!("Destroyed {}", id);
        Ok(())
    }

    /// One host update: before-update, then draw and after-draw unless the
    /// update was deferred.
    pub fn update<H: ChartHost + ?Sized>(
        &mut self,
        id: ChartId,
        host: &mut H,
        partial: &PartialOptions,
    ) -> Result<Option<RefreshTask>> {
        let options = Arc::new(partial.validate()?);
        self.host_update(id, host, options)
    }

    /// Apply a finished dispatch to its chart and run a render pass.
    ///
    /// A failed dispatch empties the chart and sets the error overlay; the
    /// original error is still returned.
    pub fn complete_refresh<H: ChartHost + ?Sized>(
        &mut self,
        host: &mut H,
        completion: RefreshCompletion,
    ) -> Result<()> {
        let RefreshCompletion {
            chart,
            options,
            window,
            step,
            visibility,
            outcome,
        } = completion;

        let Some(state) = self.charts.get_mut(&chart) else {
            tracing::debug!("Discarding refresh result for destroyed {}", chart);
            return Ok(());
        };
        if state.applied != Some((step, window)) {
            tracing::debug!("Applying superseded refresh result for {}", chart);
        }

        let failure = match outcome {
            Ok(results) => {
                let mut datasets = build_datasets(&results, &options, &visibility);
                if !datasets.is_empty() {
                    if options.fill_gaps {
                        fill_gaps(&mut datasets, &window, step);
                    }
                    if let Some(hook) = &options.data_set_hook {
                        datasets = hook(datasets);
                    }
                }
                tracing::debug!("Refresh of {} produced {} datasets", chart, datasets.len());
                host.set_datasets(datasets);
                None
            }
            Err(err) => {
                tracing::warn!("Refresh of {} failed: {}", chart, err);
                host.set_datasets(Vec::new());
                state.error = Some(FETCH_FAILED_MESSAGE.to_string());
                Some(err)
            }
        };

        host.set_time_axis(time_axis(&window, options.stacked));
        self.resume_rendering(chart, host, options)?;

        match failure {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn before_update_with<H: ChartHost + ?Sized>(
        &mut self,
        id: ChartId,
        host: &mut H,
        options: Arc<ChartOptions>,
    ) -> Result<UpdateDecision> {
        let now = self.clock.now();
        let state = state_mut(&mut self.charts, id)?;
        if state.loading || state.rendering {
            tracing::trace!("Update of {} dropped, refresh in progress", id);
            return Ok(UpdateDecision::Proceed);
        }

        let window = options.time_range.range.resolve(now);
        let step = effective_step(&options.time_range, &window, host.width());
        if state.applied == Some((step, window)) {
            tracing::trace!("Window of {} unchanged, skipping refresh", id);
            return Ok(UpdateDecision::Proceed);
        }

        tracing::debug!(
            "Refreshing {} from {} to {} with step {}s",
            id,
            window.start,
            window.end,
            step
        );
        state.applied = Some((step, window));
        state.error = None;

        let visibility = VisibilityMap::snapshot(host.datasets(), |i| host.is_dataset_visible(i));
        let pending = dispatch(self.executor.clone(), &options, window, step);

        state.loading = true;
        paint_overlay(state, host, &options);

        Ok(UpdateDecision::Defer(RefreshTask {
            chart: id,
            options,
            window,
            step,
            visibility,
            pending,
        }))
    }

    fn host_update<H: ChartHost + ?Sized>(
        &mut self,
        id: ChartId,
        host: &mut H,
        options: Arc<ChartOptions>,
    ) -> Result<Option<RefreshTask>> {
        match self.before_update_with(id, host, options.clone())? {
            UpdateDecision::Proceed => {
                host.draw();
                self.paint(id, host, &options)?;
                Ok(None)
            }
            UpdateDecision::Defer(task) => Ok(Some(task)),
        }
    }

    fn resume_rendering<H: ChartHost + ?Sized>(
        &mut self,
        id: ChartId,
        host: &mut H,
        options: Arc<ChartOptions>,
    ) -> Result<()> {
        let state = state_mut(&mut self.charts, id)?;
        state.loading = false;
        state.rendering = true;

        // before-update is a no-op while rendering, so this only draws.
        let drawn = self.host_update(id, host, options);

        if let Some(state) = self.charts.get_mut(&id) {
            state.rendering = false;
        }
        drawn.map(|_| ())
    }

    fn paint<H: ChartHost + ?Sized>(
        &self,
        id: ChartId,
        host: &mut H,
        options: &ChartOptions,
    ) -> Result<()> {
        let state = self.charts.get(&id).ok_or(Error::UnknownChart(id))?;
        paint_overlay(state, host, options);
        Ok(())
    }
}

impl Drop for LifecycleController {
    fn drop(&mut self) {
        for state in self.charts.values_mut() {
            state.cancel_update_interval();
        }
    }
}

fn state_mut(
    charts: &mut HashMap<ChartId, PerChartState>,
    id: ChartId,
) -> Result<&mut PerChartState> {
    charts.get_mut(&id).ok_or(Error::UnknownChart(id))
}

fn paint_overlay<H: ChartHost + ?Sized>(
    state: &PerChartState,
    host: &mut H,
    options: &ChartOptions,
) {
    let inputs = OverlayInputs {
        error: state.error.as_deref(),
        loading: state.loading,
        has_data: !host.datasets().is_empty(),
    };
    if let Some((_, template, text)) = select_overlay(inputs, options) {
        let (width, height) = (host.width(), host.height());
        write_text(host.surface(), width, height, template, &text);
    }
}

/// Post an update request every `period`, starting one period from now.
fn arm_update_interval(period: Duration, requester: UpdateRequester) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = IntervalStream::new(interval);
        while ticks.next().await.is_some() {
            if !requester.request_update() {
                break;
            }
        }
    })
}
