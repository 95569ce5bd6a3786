//! Ordered frame transport between the controlling context and an execution unit.
//!
//! Each side of a pair owns the sender towards its peer and the receiver of
//! the peer's frames. Frames are JSON-encoded [`ChannelMessage`]s; delivery is
//! FIFO per direction and there is no ordering between the two directions.
//! A side observes the other's termination as the end of its receiver.
//!
//! [`ChannelMessage`]: crate::ChannelMessage

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// One side of a bidirectional frame channel.
pub struct Endpoint {
    pub sender: UnboundedSender<String>,
    pub receiver: UnboundedReceiver<String>,
}

impl Endpoint {
    pub fn split(self) -> (UnboundedSender<String>, UnboundedReceiver<String>) {
        (self.sender, self.receiver)
    }
}

/// Create two connected endpoints: `(controller side, unit side)`.
pub fn channel_pair() -> (Endpoint, Endpoint) {
    let (to_unit, from_controller) = mpsc::unbounded();
    let (to_controller, from_unit) = mpsc::unbounded();

    (
        Endpoint {
            sender: to_unit,
            receiver: from_unit,
        },
        Endpoint {
            sender: to_controller,
            receiver: from_controller,
        },
    )
}
