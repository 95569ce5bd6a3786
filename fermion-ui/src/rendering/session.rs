//! Progressive render session.
//!
//! A session takes one render from validated input to a final image. While
//! the execution unit works, it polls progress and a pixel snapshot on every
//! scheduler tick and forwards them to the output sink. Completion is driven
//! solely by the deferred `getFinal` reply, never by progress reaching 1.0.

use super::export;
use super::output::OutputSink;
use super::render_progress::ProgressSample;
use crate::config::SessionConfig;
use crate::scheduler::Scheduler;
use crate::workers::{RenderContextHandle, RenderWorker};
use fermion_core::{PixelBuffer, RenderError, RenderRequest};
use futures::future::{self, Fuse, FusedFuture, LocalBoxFuture};
use futures::{select, FutureExt, StreamExt};
use log::{debug, info, warn};
use std::cell::{Cell, Ref, RefCell};
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Initializing,
    Rendering,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Initializing | SessionState::Rendering)
    }
}

type PendingPoll<'a> = Fuse<LocalBoxFuture<'a, Result<(f32, PixelBuffer), RenderError>>>;

pub struct RenderSession<S: Scheduler, O: OutputSink> {
    worker: RenderWorker,
    scheduler: S,
    config: SessionConfig,
    sink: RefCell<O>,
    state: Cell<SessionState>,
    initialized: Cell<bool>,
    start_enabled: Cell<bool>,
    skipped_ticks: Cell<u64>,
    last_image: RefCell<Option<PixelBuffer>>,
}

impl<S: Scheduler, O: OutputSink> RenderSession<S, O> {
    pub fn new(worker: RenderWorker, scheduler: S, config: SessionConfig, sink: O) -> Self {
        Self {
            worker,
            scheduler,
            config,
            sink: RefCell::new(sink),
            state: Cell::new(SessionState::Idle),
            initialized: Cell::new(false),
            start_enabled: Cell::new(false),
            skipped_ticks: Cell::new(0),
            last_image: RefCell::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn is_start_enabled(&self) -> bool {
        self.start_enabled.get()
    }

    pub fn worker(&self) -> &RenderWorker {
        &self.worker
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn sink(&self) -> Ref<'_, O> {
        self.sink.borrow()
    }

    /// Ticks that fired while the previous poll was still unanswered.
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks.get()
    }

    /// Final image of the last completed render.
    pub fn last_image(&self) -> Option<PixelBuffer> {
        self.last_image.borrow().clone()
    }

    /// Prepare the execution unit. Enables starting renders on success.
    pub async fn initialize(&self, threads: Option<usize>) -> Result<usize, RenderError> {
        match self.worker.initialize(threads).await {
            Ok(threads) => {
                self.initialized.set(true);
                self.set_start_enabled(true);
                Ok(threads)
            }
            Err(e) => {
                self.sink.borrow_mut().report_error(&e);
                Err(e)
            }
        }
    }

    /// Validate `scene_json` and run one render to completion or failure.
    ///
    /// Resolves once the session has reached `Completed` or `Failed`.
    pub async fn start(&self, scene_json: &str, concurrency: u32) -> Result<(), RenderError> {
        if self.state.get().is_active() {
            warn!("Render already in progress, ignoring start");
            return Err(RenderError::Busy);
        }
        if !self.initialized.get() {
            let err = RenderError::NotInitialized;
            self.sink.borrow_mut().report_error(&err);
            return Err(err);
        }

        let request = match RenderRequest::parse(scene_json, concurrency, &self.config.limits()) {
            Ok(request) => request,
            Err(e) => {
                let err = RenderError::from(e);
                self.set_state(SessionState::Idle);
                self.sink.borrow_mut().report_error(&err);
                return Err(err);
            }
        };

        let started_ms = self.scheduler.now_ms();
        self.set_state(SessionState::Initializing);
        self.set_start_enabled(false);

        let (width, height) = request.scene().dimensions();
        info!(
            "Starting {}x{} render with concurrency {}",
            width,
            height,
            request.concurrency()
        );

        let handle = match self.worker.render(&request).await {
            Ok(handle) => handle,
            Err(e) => return Err(self.fail(e)),
        };

        self.set_state(SessionState::Rendering);
        let outcome = self.poll_until_final(&handle, started_ms).await;
        handle.release();

        match outcome {
            Ok(image) => {
                self.complete(image, started_ms);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn poll_until_final(
        &self,
        handle: &RenderContextHandle,
        started_ms: f64,
    ) -> Result<PixelBuffer, RenderError> {
        let mut final_image = handle.final_image().boxed_local().fuse();
        let mut ticks = self.scheduler.interval(self.config.update_interval()).fuse();
        let mut in_flight: PendingPoll<'_> = Fuse::terminated();

        loop {
            select! {
                image = final_image => return image,
                tick = ticks.next() => {
                    if tick.is_none() {
                        continue;
                    }
                    if in_flight.is_terminated() {
                        in_flight = future::try_join(handle.progress(), handle.snapshot())
                            .boxed_local()
                            .fuse();
                    } else {
                        self.skipped_ticks.set(self.skipped_ticks.get() + 1);
                        debug!("Skipping tick: previous poll still in flight");
                    }
                }
                polled = in_flight => {
                    let (fraction, pixels) = polled?;
                    let sample = ProgressSample::new(fraction, self.elapsed_ms(started_ms), pixels);
                    self.sink.borrow_mut().progress(&sample);
                }
            }
        }
    }

    fn complete(&self, image: PixelBuffer, started_ms: f64) {
        let elapsed_ms = self.elapsed_ms(started_ms);
        {
            let mut sink = self.sink.borrow_mut();
            sink.progress(&ProgressSample::new(1.0, elapsed_ms, image.clone()));
            sink.completed(&image, elapsed_ms);
        }
        *self.last_image.borrow_mut() = Some(image);

        info!("Render completed in {} ms", elapsed_ms);
        self.set_state(SessionState::Completed);
        self.set_start_enabled(true);
    }

    fn fail(&self, error: RenderError) -> RenderError {
        warn!("Render failed: {}", error);
        self.set_state(SessionState::Failed);
        self.sink.borrow_mut().report_error(&error);
        self.set_start_enabled(true);
        error
    }

    /// Write the last completed image as PNG.
    pub fn export_png(&self, path: &Path) -> Result<(), RenderError> {
        match self.last_image.borrow().as_ref() {
            Some(image) => export::save_png(image, path),
            None => Err(RenderError::NothingToExport),
        }
    }

    fn elapsed_ms(&self, started_ms: f64) -> u64 {
        (self.scheduler.now_ms() - started_ms).max(0.0) as u64
    }

    fn set_state(&self, state: SessionState) {
        if self.state.replace(state) != state {
            debug!("Session state -> {:?}", state);
            self.sink.borrow_mut().state_changed(state);
        }
    }

    fn set_start_enabled(&self, enabled: bool) {
        self.start_enabled.set(enabled);
        self.sink.borrow_mut().start_enabled(enabled);
    }
}
