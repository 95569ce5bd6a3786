use crate::dispatcher::{Dispatcher, UnitEvent};
use crate::render_context::RenderSettings;
use fermion_core::{channel_pair, Endpoint};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::executor::block_on_stream;
use futures::{future, stream, StreamExt};
use log::{error, info};
use std::io;
use std::thread::{self, JoinHandle};

/// An isolated execution unit: a dedicated thread that owns the render
/// module and every render object, reachable only through its channel.
pub struct ExecutionUnit {
    control: UnboundedSender<UnitEvent>,
    thread: Option<JoinHandle<()>>,
}

impl ExecutionUnit {
    /// Start the unit thread. Returns the controlling side of its channel.
    pub fn spawn(settings: RenderSettings) -> io::Result<(Self, Endpoint)> {
        let (controller, unit) = channel_pair();
        let (events_tx, events_rx) = mpsc::unbounded();
        let control = events_tx.clone();

        let thread = thread::Builder::new()
            .name("fermion-unit".to_string())
            .spawn(move || run_unit(unit, events_tx, events_rx, settings))?;

        info!("Execution unit spawned");

        Ok((
            Self {
                control,
                thread: Some(thread),
            },
            controller,
        ))
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Kill the unit. Outstanding calls are never answered; the controlling
    /// side sees its channel close.
    pub fn terminate(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        // Fails only if the loop already exited on its own.
        let _ = self.control.unbounded_send(UnitEvent::Terminate);
        if thread.join().is_err() {
            error!("Execution unit thread panicked");
        }
    }
}

impl Drop for ExecutionUnit {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Unit main loop: merge controller frames with render completions and feed
/// them to the dispatcher until disconnect or termination.
fn run_unit(
    endpoint: Endpoint,
    events_tx: UnboundedSender<UnitEvent>,
    events_rx: UnboundedReceiver<UnitEvent>,
    settings: RenderSettings,
) {
    let (outbox, frames) = endpoint.split();
    let mut dispatcher = Dispatcher::new(outbox, events_tx, settings);

    let frames = frames
        .map(UnitEvent::Frame)
        .chain(stream::once(future::ready(UnitEvent::Disconnected)));

    for event in block_on_stream(stream::select(frames, events_rx)) {
        if !dispatcher.handle_event(event) {
            break;
        }
    }

    info!("Execution unit stopped");
}
