pub mod export;
pub mod output;
mod render_progress;
pub mod session;

pub use export::{encode_png, save_png};
pub use output::{LogSink, OutputSink};
pub use render_progress::{progress_label, ProgressSample};
pub use session::{RenderSession, SessionState};
