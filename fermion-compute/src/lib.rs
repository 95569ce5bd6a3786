pub mod dispatcher;
pub mod pool;
pub mod render_context;
pub mod shader;
pub mod tiles;
pub mod unit;

pub use dispatcher::{Dispatcher, UnitEvent};
pub use pool::PoolInitializer;
pub use render_context::{RenderContext, RenderSettings};
pub use shader::Shader;
pub use tiles::{generate_tiles, partition_tiles};
pub use unit::ExecutionUnit;

// Re-export core types for convenience
pub use fermion_core::*;
