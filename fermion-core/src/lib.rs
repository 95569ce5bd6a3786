pub mod channel;
pub mod config;
pub mod error;
pub mod messages;
pub mod pixel_buffer;
pub mod pixel_rect;
pub mod scene;

pub use channel::{channel_pair, Endpoint};
pub use config::{
    host_parallelism, RequestLimits, DEFAULT_EXPORT_NAME, DEFAULT_TILE_SIZE,
    DEFAULT_UPDATE_INTERVAL, MAX_DIM,
};
pub use error::{RemoteError, RemoteErrorKind, RenderError, ValidationError};
pub use messages::{ChannelMessage, CallId, ObjectId, ReturnValue, Target, RENDER_CONTEXT_METHODS};
pub use pixel_buffer::PixelBuffer;
pub use pixel_rect::PixelRect;
pub use scene::{RenderRequest, SceneDescription};
