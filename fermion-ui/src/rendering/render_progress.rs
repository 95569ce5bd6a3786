use fermion_core::PixelBuffer;

/// One observation of a render in flight.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressSample {
    /// Completion fraction in `[0, 1]`.
    pub fraction: f32,
    pub elapsed_ms: u64,
    pub pixels: PixelBuffer,
}

impl ProgressSample {
    pub fn new(fraction: f32, elapsed_ms: u64, pixels: PixelBuffer) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
            elapsed_ms,
            pixels,
        }
    }

    /// Completion percentage rounded to two decimals (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        (self.fraction as f64 * 10_000.0).round() / 100.0
    }

    /// Status text, e.g. `"42.5% (1.2s)"`.
    pub fn label(&self) -> String {
        progress_label(self.fraction, self.elapsed_ms)
    }

    pub fn is_complete(&self) -> bool {
        self.fraction >= 1.0
    }
}

pub fn progress_label(fraction: f32, elapsed_ms: u64) -> String {
    let percent = (fraction.clamp(0.0, 1.0) as f64 * 10_000.0).round() / 100.0;
    format!("{}% ({}s)", percent, elapsed_ms as f64 / 1000.0)
}
