use crate::RemoteError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of one outstanding call, unique per bridge.
pub type CallId = u64;

/// Identifier of an object owned by the execution unit.
pub type ObjectId = u64;

/// Methods exposed by a render context living in the execution unit.
pub const RENDER_CONTEXT_METHODS: [&str; 3] = ["getProgress", "getSnapshot", "getFinal"];

/// Receiver of an invocation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", content = "id")]
pub enum Target {
    /// The execution unit's top-level method table (`initialize`, `render`, ...).
    Root,

    /// An object previously handed out as a reference.
    Object(ObjectId),
}

/// Successful return of an invocation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind")]
pub enum ReturnValue {
    /// Plain structured value, copied across the boundary.
    Value { value: Value },

    /// The result stays in the execution unit; only a handle crosses.
    Ref {
        object_id: ObjectId,
        methods: Vec<String>,
    },
}

impl ReturnValue {
    pub fn value(value: impl Into<Value>) -> Self {
        ReturnValue::Value {
            value: value.into(),
        }
    }
}

/// Frames exchanged between the controlling context and the execution unit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ChannelMessage {
    /// Call `method` on `target`. Answered by exactly one `Result` or `Error`.
    Invoke {
        call_id: CallId,
        target: Target,
        method: String,
        args: Value,
    },

    /// Successful completion of `call_id`.
    Result { call_id: CallId, value: ReturnValue },

    /// Failed completion of `call_id`.
    Error { call_id: CallId, error: RemoteError },

    /// The controlling context dropped its handle; the unit may reclaim the object.
    Release { object_id: ObjectId },
}

impl ChannelMessage {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}
