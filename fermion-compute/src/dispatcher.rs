//! Execution-unit side of the channel protocol.
//!
//! The dispatcher owns every object handed out by reference, answers each
//! `Invoke` with exactly one `Result` or `Error`, and parks `getFinal` calls
//! until the matching render reports completion.

use crate::pool::PoolInitializer;
use crate::render_context::{RenderContext, RenderSettings};
use crate::shader::Shader;
use fermion_core::{
    CallId, ChannelMessage, ObjectId, PixelBuffer, RemoteError, RemoteErrorKind, RenderRequest,
    ReturnValue, Target, MAX_DIM, RENDER_CONTEXT_METHODS,
};
use futures::channel::mpsc::UnboundedSender;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Everything the unit's loop reacts to.
#[derive(Debug)]
pub enum UnitEvent {
    /// Encoded `ChannelMessage` from the controlling context.
    Frame(String),
    /// A render job wrote its last pixel.
    RenderFinished(ObjectId),
    /// The controlling context dropped its end of the channel.
    Disconnected,
    /// Stop immediately, abandoning outstanding calls.
    Terminate,
}

#[derive(Deserialize, Default)]
struct InitializeArgs {
    #[serde(default)]
    threads: Option<usize>,
}

pub struct Dispatcher {
    outbox: UnboundedSender<String>,
    events: UnboundedSender<UnitEvent>,
    initializer: PoolInitializer,
    settings: RenderSettings,
    objects: HashMap<ObjectId, RenderContext>,
    waiting_finals: HashMap<ObjectId, Vec<CallId>>,
    next_object_id: ObjectId,
}

impl Dispatcher {
    /// `events` is where finished renders report back to this dispatcher.
    pub fn new(
        outbox: UnboundedSender<String>,
        events: UnboundedSender<UnitEvent>,
        settings: RenderSettings,
    ) -> Self {
        Self {
            outbox,
            events,
            initializer: PoolInitializer::new(),
            settings,
            objects: HashMap::new(),
            waiting_finals: HashMap::new(),
            next_object_id: 1,
        }
    }

    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    /// Process one event. Returns `false` once the unit should stop.
    pub fn handle_event(&mut self, event: UnitEvent) -> bool {
        match event {
            UnitEvent::Frame(frame) => {
                self.handle_frame(&frame);
                true
            }
            UnitEvent::RenderFinished(object_id) => {
                self.finish_render(object_id);
                true
            }
            UnitEvent::Disconnected => {
                info!("Controlling context disconnected");
                false
            }
            UnitEvent::Terminate => {
                info!(
                    "Execution unit terminated with {} live objects",
                    self.objects.len()
                );
                false
            }
        }
    }

    fn handle_frame(&mut self, frame: &str) {
        let msg = match ChannelMessage::decode(frame) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Dropping malformed frame: {}", e);
                return;
            }
        };

        match msg {
            ChannelMessage::Invoke {
                call_id,
                target,
                method,
                args,
            } => {
                debug!("Call {} -> {:?}.{}", call_id, target, method);
                let outcome = match target {
                    Target::Root => Some(self.invoke_root(&method, args)),
                    Target::Object(object_id) => self.invoke_object(call_id, object_id, &method),
                };
                if let Some(outcome) = outcome {
                    self.reply(call_id, outcome);
                }
            }
            ChannelMessage::Release { object_id } => self.release(object_id),
            ChannelMessage::Result { call_id, .. } | ChannelMessage::Error { call_id, .. } => {
                warn!("Ignoring reply for call {}: the unit issues no calls", call_id);
            }
        }
    }

    fn invoke_root(&mut self, method: &str, args: Value) -> Result<ReturnValue, RemoteError> {
        match method {
            "initialize" => {
                let args: InitializeArgs = decode_args(args)?;
                let pool = self.initializer.initialize(args.threads)?;
                Ok(ReturnValue::value(
                    json!({ "threads": pool.current_num_threads() }),
                ))
            }
            "render" => self.render(args),
            "objectCount" => Ok(ReturnValue::value(self.objects.len())),
            other => Err(RemoteError::new(
                RemoteErrorKind::UnknownMethod,
                format!("unknown method `{other}`"),
            )),
        }
    }

    fn render(&mut self, args: Value) -> Result<ReturnValue, RemoteError> {
        let pool = self.initializer.pool().cloned().ok_or_else(|| {
            RemoteError::new(
                RemoteErrorKind::NotInitialized,
                "initialize must complete before render",
            )
        })?;

        let request: RenderRequest = decode_args(args)?;
        let (width, height) = request.scene().dimensions();
        if width == 0 || height == 0 {
            return Err(RemoteError::invalid_arguments(format!(
                "cannot render an empty {width}x{height} image"
            )));
        }
        if width > MAX_DIM || height > MAX_DIM {
            return Err(RemoteError::invalid_arguments(format!(
                "width and height must not exceed {MAX_DIM} (got {width}x{height})"
            )));
        }
        if request.concurrency() == 0 {
            return Err(RemoteError::invalid_arguments("concurrency must be positive"));
        }
        let shader = Shader::for_scene(request.scene())?;

        let object_id = self.next_object_id;
        self.next_object_id += 1;

        let events = self.events.clone();
        let context = RenderContext::start(
            request.scene(),
            shader,
            request.concurrency() as usize,
            &pool,
            self.settings,
            move || {
                // The dispatcher may already be gone; nothing left to notify then.
                let _ = events.unbounded_send(UnitEvent::RenderFinished(object_id));
            },
        );
        self.objects.insert(object_id, context);

        info!(
            "Render {} started: {}x{} in {} groups",
            object_id,
            width,
            height,
            request.concurrency()
        );

        Ok(ReturnValue::Ref {
            object_id,
            methods: RENDER_CONTEXT_METHODS.iter().map(|m| m.to_string()).collect(),
        })
    }

    /// `None` means the reply is deferred.
    fn invoke_object(
        &mut self,
        call_id: CallId,
        object_id: ObjectId,
        method: &str,
    ) -> Option<Result<ReturnValue, RemoteError>> {
        let Some(context) = self.objects.get(&object_id) else {
            return Some(Err(RemoteError::new(
                RemoteErrorKind::UnknownObject,
                format!("no live object {object_id}"),
            )));
        };

        match method {
            "getProgress" => Some(Ok(ReturnValue::value(context.progress()))),
            "getSnapshot" => Some(pixels_value(&context.snapshot())),
            "getFinal" => {
                if context.is_finished() {
                    Some(pixels_value(&context.snapshot()))
                } else {
                    self.waiting_finals.entry(object_id).or_default().push(call_id);
                    None
                }
            }
            other => Some(Err(RemoteError::new(
                RemoteErrorKind::UnknownMethod,
                format!("render context has no method `{other}`"),
            ))),
        }
    }

    fn finish_render(&mut self, object_id: ObjectId) {
        let waiting = self.waiting_finals.remove(&object_id).unwrap_or_default();
        let Some(context) = self.objects.get(&object_id) else {
            debug!("Render {} finished after release", object_id);
            return;
        };

        info!("Render {} finished", object_id);
        if waiting.is_empty() {
            return;
        }

        let outcome = pixels_value(&context.snapshot());
        for call_id in waiting {
            self.reply(call_id, outcome.clone());
        }
    }

    fn release(&mut self, object_id: ObjectId) {
        if self.objects.remove(&object_id).is_none() {
            debug!("Release of unknown object {}", object_id);
            return;
        }
        debug!("Released object {}", object_id);

        for call_id in self.waiting_finals.remove(&object_id).unwrap_or_default() {
            self.reply(
                call_id,
                Err(RemoteError::new(
                    RemoteErrorKind::Released,
                    format!("object {object_id} released before the render finished"),
                )),
            );
        }
    }

    fn reply(&self, call_id: CallId, outcome: Result<ReturnValue, RemoteError>) {
        let msg = match outcome {
            Ok(value) => ChannelMessage::Result { call_id, value },
            Err(error) => ChannelMessage::Error { call_id, error },
        };

        match msg.encode() {
            Ok(frame) => {
                if self.outbox.unbounded_send(frame).is_err() {
                    debug!("Reply to call {} dropped: controller gone", call_id);
                }
            }
            Err(e) => warn!("Failed to encode reply to call {}: {}", call_id, e),
        }
    }
}

fn decode_args<T: DeserializeOwned>(args: Value) -> Result<T, RemoteError> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| RemoteError::invalid_arguments(e.to_string()))
}

fn pixels_value(pixels: &PixelBuffer) -> Result<ReturnValue, RemoteError> {
    serde_json::to_value(pixels)
        .map(|value| ReturnValue::Value { value })
        .map_err(|e| RemoteError::new(RemoteErrorKind::Render, e.to_string()))
}
