pub mod bridge;
pub mod remote_object;
pub mod render_worker;

pub use bridge::{Bridge, ProtocolError, Reply};
pub use remote_object::RemoteObject;
pub use render_worker::{RenderContextHandle, RenderWorker};
