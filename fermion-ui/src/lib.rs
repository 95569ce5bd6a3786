pub mod config;
pub mod rendering;
pub mod scheduler;
pub mod workers;

pub use config::{ConfigError, SessionConfig, UnitConfig};
pub use rendering::{
    LogSink, OutputSink, ProgressSample, RenderSession, SessionState,
};
pub use scheduler::{ManualScheduler, Scheduler, SystemScheduler};
pub use workers::{Bridge, RemoteObject, RenderContextHandle, RenderWorker};
