//! Constants shared by the controlling context and the execution unit.

use std::time::Duration;

/// Largest accepted output width or height.
pub const MAX_DIM: u32 = 650;

/// Default polling cadence: fifteen updates per second.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(1000 / 15);

/// File name offered for the exported final image.
pub const DEFAULT_EXPORT_NAME: &str = "fermion_out.png";

/// Edge length of the square tiles the render module works through.
pub const DEFAULT_TILE_SIZE: u32 = 32;

/// Bounds a [`RenderRequest`](crate::RenderRequest) must satisfy before dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestLimits {
    pub max_dim: u32,
    pub max_concurrency: u32,
}

impl RequestLimits {
    pub fn new(max_dim: u32, max_concurrency: u32) -> Self {
        Self {
            max_dim,
            max_concurrency,
        }
    }

    /// Reference limits for a host with `parallelism` hardware threads.
    pub fn for_host(parallelism: usize) -> Self {
        Self::new(MAX_DIM, parallelism.max(1) as u32)
    }
}

/// Hardware parallelism of the current host, at least 1.
pub fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
