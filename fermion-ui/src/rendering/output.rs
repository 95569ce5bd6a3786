use super::render_progress::ProgressSample;
use crate::rendering::session::SessionState;
use fermion_core::{PixelBuffer, RenderError};
use log::{debug, error, info};

/// Receives everything a render session produces.
pub trait OutputSink {
    fn state_changed(&mut self, _state: SessionState) {}

    /// Whether the user may start a new render.
    fn start_enabled(&mut self, enabled: bool);

    fn progress(&mut self, sample: &ProgressSample);

    fn completed(&mut self, image: &PixelBuffer, elapsed_ms: u64);

    fn report_error(&mut self, error: &RenderError);
}

/// Sink that logs progress labels and keeps nothing.
#[derive(Debug, Default)]
pub struct LogSink;

impl OutputSink for LogSink {
    fn state_changed(&mut self, state: SessionState) {
        debug!("Session state: {:?}", state);
    }

    fn start_enabled(&mut self, _enabled: bool) {}

    fn progress(&mut self, sample: &ProgressSample) {
        info!("{}", sample.label());
    }

    fn completed(&mut self, image: &PixelBuffer, elapsed_ms: u64) {
        let (width, height) = image.dimensions();
        info!("Rendered {}x{} in {} ms", width, height, elapsed_ms);
    }

    fn report_error(&mut self, error: &RenderError) {
        error!("Render failed: {}", error);
    }
}
