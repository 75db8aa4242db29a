// Chart driver - single task event loop around one chart and its controller
use crate::application::controller::{LifecycleController, RefreshCompletion};
use crate::application::host::{ChartCommand, ChartHost, ChartId, UpdateRequester};
use crate::application::query_executor::QueryExecutor;
use crate::domain::options::PartialOptions;
use crate::error::{Error, Result};
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use std::future::IntoFuture;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Owns a chart host and serializes everything that touches it: commands
/// (timer ticks, resizes, legend toggles) and refresh completions all run on
/// the driver's task, one at a time.
pub struct ChartDriver<H: ChartHost> {
    id: ChartId,
    controller: LifecycleController,
    host: H,
    options: PartialOptions,
    requester: UpdateRequester,
    commands: mpsc::UnboundedReceiver<ChartCommand>,
    in_flight: FuturesUnordered<BoxFuture<'static, RefreshCompletion>>,
}

impl<H: ChartHost> ChartDriver<H> {
    pub fn new(
        id: ChartId,
        executor: Arc<dyn QueryExecutor>,
        host: H,
        options: PartialOptions,
    ) -> Self {
        Self::with_controller(id, LifecycleController::new(executor), host, options)
    }

    pub fn with_controller(
        id: ChartId,
        controller: LifecycleController,
        host: H,
        options: PartialOptions,
    ) -> Self {
        let (requester, commands) = UpdateRequester::channel();
        Self {
            id,
            controller,
            host,
            options,
            requester,
            commands,
            in_flight: FuturesUnordered::new(),
        }
    }

    /// Handle for posting commands from other tasks.
    pub fn requester(&self) -> UpdateRequester {
        self.requester.clone()
    }

    /// Run until a `Destroy` command arrives or `shutdown` flips. Returns the
    /// host so callers can inspect its final state.
    ///
    /// Refresh failures are logged and the loop keeps going; configuration
    /// errors stop it.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<H> {
        self.controller.initialize(self.id);
        self.controller
            .after_initialize(self.id, &self.options, &self.requester)?;

        loop {
            tokio::select! {
                Some(command) = self.commands.recv() => {
                    if self.handle(command)?.is_break() {
                        break;
                    }
                }
                Some(completion) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.apply(completion)?;
                }
                _ = shutdown.changed() => {
                    tracing::debug!("Shutdown requested for {}", self.id);
                    break;
                }
            }
        }

        if !self.in_flight.is_empty() {
            tracing::debug!(
                "Leaving {} refresh(es) of {} unfinished",
                self.in_flight.len(),
                self.id
            );
        }
        self.controller.destroy(self.id)?;
        Ok(self.host)
    }

    fn handle(&mut self, command: ChartCommand) -> Result<ControlFlow<()>> {
        match command {
            ChartCommand::Update => self.update()?,
            ChartCommand::Resize { width, height } => {
                self.host.resize(width, height);
                self.update()?;
            }
            ChartCommand::SetVisibility { index, visible } => {
                self.host.set_dataset_visibility(index, visible);
                self.update()?;
            }
            ChartCommand::Destroy => return Ok(ControlFlow::Break(())),
        }
        Ok(ControlFlow::Continue(()))
    }

    fn update(&mut self) -> Result<()> {
        if let Some(task) = self
            .controller
            .update(self.id, &mut self.host, &self.options)?
        {
            self.in_flight.push(task.into_future());
        }
        Ok(())
    }

    fn apply(&mut self, completion: RefreshCompletion) -> Result<()> {
        let chart = completion.chart();
        match self.controller.complete_refresh(&mut self.host, completion) {
            Err(Error::Refresh(err)) => {
                tracing::error!("Refresh of {} failed: {}", chart, err);
                Ok(())
            }
            other => other,
        }
    }
}
