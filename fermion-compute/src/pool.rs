//! One-shot setup of the execution unit's render thread pool.

use fermion_core::{host_parallelism, RemoteError, RemoteErrorKind};
use log::{debug, info};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;

/// Builds the rayon pool the render module runs on.
///
/// Initialization is idempotent: once a pool exists, further calls return it
/// unchanged, whatever thread count they ask for.
#[derive(Default)]
pub struct PoolInitializer {
    pool: Option<Arc<ThreadPool>>,
}

impl PoolInitializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the pool with `threads` workers, or one per hardware thread.
    pub fn initialize(&mut self, threads: Option<usize>) -> Result<Arc<ThreadPool>, RemoteError> {
        if let Some(pool) = &self.pool {
            debug!(
                "Render pool already initialized with {} threads",
                pool.current_num_threads()
            );
            return Ok(Arc::clone(pool));
        }

        let threads = threads.unwrap_or_else(host_parallelism).max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("fermion-render-{i}"))
            .build()
            .map_err(|e| RemoteError::new(RemoteErrorKind::Render, e.to_string()))?;

        info!("Render pool ready with {} threads", threads);

        let pool = Arc::new(pool);
        self.pool = Some(Arc::clone(&pool));
        Ok(pool)
    }

    pub fn pool(&self) -> Option<&Arc<ThreadPool>> {
        self.pool.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.is_some()
    }

    pub fn thread_count(&self) -> Option<usize> {
        self.pool.as_ref().map(|p| p.current_num_threads())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uninitialized() {
        let init = PoolInitializer::new();
        assert!(!init.is_initialized());
        assert!(init.pool().is_none());
    }

    #[test]
    fn builds_requested_thread_count() {
        let mut init = PoolInitializer::new();
        let pool = init.initialize(Some(3)).unwrap();
        assert_eq!(pool.current_num_threads(), 3);
        assert_eq!(init.thread_count(), Some(3));
    }

    #[test]
    fn second_initialize_is_a_no_op() {
        let mut init = PoolInitializer::new();
        let first = init.initialize(Some(2)).unwrap();
        let second = init.initialize(Some(6)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(init.thread_count(), Some(2));
    }

    #[test]
    fn zero_threads_is_clamped_to_one() {
        let mut init = PoolInitializer::new();
        init.initialize(Some(0)).unwrap();
        assert_eq!(init.thread_count(), Some(1));
    }
}
