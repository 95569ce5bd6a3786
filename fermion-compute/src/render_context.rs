use crate::shader::Shader;
use crate::tiles::{generate_tiles, partition_tiles};
use fermion_core::{PixelBuffer, PixelRect, SceneDescription};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Knobs for how the render module walks the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSettings {
    pub tile_size: u32,
    /// Pause after each tile; only useful to make short renders observable.
    pub tile_delay: Option<Duration>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            tile_size: fermion_core::DEFAULT_TILE_SIZE,
            tile_delay: None,
        }
    }
}

struct RenderShared {
    width: u32,
    height: u32,
    pixels: Mutex<PixelBuffer>,
    completed: AtomicUsize,
    finished: AtomicBool,
}

/// A render in progress, owned by the execution unit.
///
/// Workers on the pool write finished tiles under the pixel lock and then
/// bump the completed-pixel counter; readers only ever copy.
#[derive(Clone)]
pub struct RenderContext {
    shared: Arc<RenderShared>,
}

impl RenderContext {
    /// Start rendering `scene` on `pool`, split into `concurrency` work groups.
    ///
    /// `on_finished` runs on a pool thread once every pixel is written.
    pub fn start<F>(
        scene: &SceneDescription,
        shader: Shader,
        concurrency: usize,
        pool: &ThreadPool,
        settings: RenderSettings,
        on_finished: F,
    ) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (width, height) = scene.dimensions();
        let shared = Arc::new(RenderShared {
            width,
            height,
            pixels: Mutex::new(PixelBuffer::new(width, height)),
            completed: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
        });

        let groups = partition_tiles(generate_tiles(width, height, settings.tile_size), concurrency);
        let job_state = Arc::clone(&shared);

        pool.spawn(move || {
            groups.par_iter().for_each(|group| {
                for tile in group {
                    render_tile(&job_state, &shader, tile);
                    if let Some(delay) = settings.tile_delay {
                        std::thread::sleep(delay);
                    }
                }
            });

            job_state.finished.store(true, Ordering::Release);
            on_finished();
        });

        Self { shared }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.shared.width, self.shared.height)
    }

    /// Fraction of pixels written so far, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        let total = self.shared.width as usize * self.shared.height as usize;
        if total == 0 {
            return 1.0;
        }
        self.shared.completed.load(Ordering::Relaxed) as f32 / total as f32
    }

    /// Copy of the pixels as they are right now.
    pub fn snapshot(&self) -> PixelBuffer {
        self.shared
            .pixels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }
}

fn render_tile(shared: &RenderShared, shader: &Shader, tile: &PixelRect) {
    let colors: Vec<(u32, u32, [u8; 4])> = tile
        .pixels()
        .map(|(x, y)| (x, y, shader.shade(x, y)))
        .collect();

    {
        let mut pixels = shared.pixels.lock().unwrap_or_else(PoisonError::into_inner);
        for (x, y, rgba) in &colors {
            pixels.set_pixel(*x, *y, *rgba);
        }
    }

    shared.completed.fetch_add(colors.len(), Ordering::Relaxed);
}
