//! Controlling side of the channel protocol.
//!
//! A [`Bridge`] turns remote method calls into local futures: each call gets a
//! fresh id and a pending resolver, and the pump task settles resolvers as
//! `Result`/`Error` frames arrive. When the execution unit goes away, every
//! pending call is rejected with [`RenderError::ChannelClosed`].

use super::remote_object::RemoteObject;
use fermion_core::{CallId, ChannelMessage, Endpoint, ObjectId, RenderError, ReturnValue, Target};
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender};
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use futures::{FutureExt, StreamExt};
use log::{debug, info, warn};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use thiserror::Error;

type Resolver = oneshot::Sender<Result<ReturnValue, RenderError>>;

/// Anomalies in frames coming from the execution unit. Logged, never fatal.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("response for unknown call id {0}")]
    UnknownCallId(CallId),

    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unexpected {0} frame from the execution unit")]
    Unexpected(&'static str),
}

/// What a successful call produced.
#[derive(Debug)]
pub enum Reply {
    Value(Value),
    Object(RemoteObject),
}

impl Reply {
    pub fn into_value(self) -> Result<Value, RenderError> {
        match self {
            Reply::Value(value) => Ok(value),
            Reply::Object(object) => {
                object.release();
                Err(RenderError::Protocol(format!(
                    "expected a value, got remote object {}",
                    object.id()
                )))
            }
        }
    }

    pub fn into_object(self) -> Result<RemoteObject, RenderError> {
        match self {
            Reply::Object(object) => Ok(object),
            Reply::Value(value) => Err(RenderError::Protocol(format!(
                "expected a remote object, got {value}"
            ))),
        }
    }
}

struct BridgeInner {
    sender: UnboundedSender<String>,
    pending: RefCell<HashMap<CallId, Resolver>>,
    next_call_id: Cell<CallId>,
    closed: Cell<bool>,
    anomalies: Cell<u64>,
}

impl BridgeInner {
    fn handle_frame(&self, frame: &str) -> Result<(), ProtocolError> {
        match ChannelMessage::decode(frame)? {
            ChannelMessage::Result { call_id, value } => self.resolve(call_id, Ok(value)),
            ChannelMessage::Error { call_id, error } => self.resolve(call_id, Err(error.into())),
            ChannelMessage::Invoke { .. } => Err(ProtocolError::Unexpected("Invoke")),
            ChannelMessage::Release { .. } => Err(ProtocolError::Unexpected("Release")),
        }
    }

    fn resolve(
        &self,
        call_id: CallId,
        outcome: Result<ReturnValue, RenderError>,
    ) -> Result<(), ProtocolError> {
        let resolver = self
            .pending
            .borrow_mut()
            .remove(&call_id)
            .ok_or(ProtocolError::UnknownCallId(call_id))?;

        if resolver.send(outcome).is_err() {
            debug!("Caller of call {} stopped waiting", call_id);
        }
        Ok(())
    }

    fn close(&self) {
        self.closed.set(true);
        let pending: Vec<_> = self.pending.borrow_mut().drain().collect();

        if pending.is_empty() {
            info!("Execution unit channel closed");
        } else {
            warn!(
                "Execution unit channel closed with {} calls outstanding",
                pending.len()
            );
        }

        for (_, resolver) in pending {
            let _ = resolver.send(Err(RenderError::ChannelClosed));
        }
    }
}

/// Remote capability proxy over one execution unit channel.
///
/// Cheap to clone; all clones share the pending-call table.
#[derive(Clone)]
pub struct Bridge {
    inner: Rc<BridgeInner>,
}

impl Bridge {
    /// Wrap the controlling side of a channel.
    ///
    /// The returned pump future must be spawned on the local executor; it
    /// delivers replies and observes channel termination.
    pub fn new(endpoint: Endpoint) -> (Self, LocalBoxFuture<'static, ()>) {
        let (sender, receiver) = endpoint.split();
        let inner = Rc::new(BridgeInner {
            sender,
            pending: RefCell::new(HashMap::new()),
            next_call_id: Cell::new(1),
            closed: Cell::new(false),
            anomalies: Cell::new(0),
        });

        let pump = pump(Rc::downgrade(&inner), receiver).boxed_local();
        (Self { inner }, pump)
    }

    /// Invoke `method` on `target` and wait for its reply.
    pub async fn call(
        &self,
        target: Target,
        method: &str,
        args: Value,
    ) -> Result<Reply, RenderError> {
        let reply = self.dispatch(target, method, args)?;
        let value = reply.await.map_err(|_| RenderError::ChannelClosed)??;

        Ok(match value {
            ReturnValue::Value { value } => Reply::Value(value),
            ReturnValue::Ref { object_id, methods } => {
                Reply::Object(RemoteObject::new(self.clone(), object_id, methods))
            }
        })
    }

    fn dispatch(
        &self,
        target: Target,
        method: &str,
        args: Value,
    ) -> Result<oneshot::Receiver<Result<ReturnValue, RenderError>>, RenderError> {
        let inner = &self.inner;
        if inner.closed.get() {
            return Err(RenderError::ChannelClosed);
        }

        let call_id = inner.next_call_id.get();
        inner.next_call_id.set(call_id + 1);

        let frame = ChannelMessage::Invoke {
            call_id,
            target,
            method: method.to_string(),
            args,
        }
        .encode()
        .map_err(|e| RenderError::Protocol(e.to_string()))?;

        let (resolver, reply) = oneshot::channel();
        inner.pending.borrow_mut().insert(call_id, resolver);

        if inner.sender.unbounded_send(frame).is_err() {
            inner.pending.borrow_mut().remove(&call_id);
            return Err(RenderError::ChannelClosed);
        }

        debug!("Call {} -> {:?}.{}", call_id, target, method);
        Ok(reply)
    }

    /// Tell the execution unit it may drop `object_id`.
    pub(crate) fn send_release(&self, object_id: ObjectId) {
        if self.inner.closed.get() {
            debug!("Release of object {} skipped: channel closed", object_id);
            return;
        }

        match (ChannelMessage::Release { object_id }).encode() {
            Ok(frame) => {
                if self.inner.sender.unbounded_send(frame).is_err() {
                    debug!("Release of object {} dropped: channel closed", object_id);
                }
            }
            Err(e) => warn!("Failed to encode release of object {}: {}", object_id, e),
        }
    }

    /// Calls sent but not yet answered.
    pub fn outstanding_calls(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    /// Frames that were logged and dropped (unknown call ids, garbage, ...).
    pub fn protocol_anomalies(&self) -> u64 {
        self.inner.anomalies.get()
    }
}

async fn pump(inner: Weak<BridgeInner>, mut receiver: UnboundedReceiver<String>) {
    while let Some(frame) = receiver.next().await {
        let Some(bridge) = inner.upgrade() else {
            return;
        };
        if let Err(e) = bridge.handle_frame(&frame) {
            warn!("Execution unit protocol anomaly: {}", e);
            bridge.anomalies.set(bridge.anomalies.get() + 1);
        }
    }

    if let Some(bridge) = inner.upgrade() {
        bridge.close();
    }
}
