use super::bridge::{Bridge, Reply};
use fermion_core::{ObjectId, RenderError, Target};
use log::debug;
use serde_json::Value;
use std::cell::Cell;
use std::fmt;

/// Local stand-in for an object owned by the execution unit.
///
/// Calls are forwarded over the bridge that produced the reference. The
/// remote object stays alive until [`release`](Self::release) is called;
/// dropping the proxy without releasing it leaks the remote side.
pub struct RemoteObject {
    bridge: Bridge,
    object_id: ObjectId,
    methods: Vec<String>,
    released: Cell<bool>,
}

impl RemoteObject {
    pub(crate) fn new(bridge: Bridge, object_id: ObjectId, methods: Vec<String>) -> Self {
        Self {
            bridge,
            object_id,
            methods,
            released: Cell::new(false),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.object_id
    }

    pub fn exposes(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }

    pub fn is_released(&self) -> bool {
        self.released.get()
    }

    pub async fn call(&self, method: &str, args: Value) -> Result<Reply, RenderError> {
        if self.released.get() {
            return Err(RenderError::Released(self.object_id));
        }
        if !self.exposes(method) {
            return Err(RenderError::UnknownMethod(method.to_string()));
        }
        self.bridge
            .call(Target::Object(self.object_id), method, args)
            .await
    }

    /// Let the execution unit drop the object. Idempotent.
    pub fn release(&self) {
        if self.released.replace(true) {
            debug!("Object {} already released", self.object_id);
            return;
        }
        self.bridge.send_release(self.object_id);
    }
}

impl fmt::Debug for RemoteObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteObject")
            .field("object_id", &self.object_id)
            .field("methods", &self.methods)
            .field("released", &self.released.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fermion_core::{channel_pair, ChannelMessage, Endpoint};
    use futures::executor::LocalPool;
    use futures::task::LocalSpawnExt;

    fn setup() -> (LocalPool, RemoteObject, Endpoint) {
        let (controller, unit) = channel_pair();
        let (bridge, pump) = Bridge::new(controller);
        let pool = LocalPool::new();
        pool.spawner().spawn_local(pump).unwrap();
        let object = RemoteObject::new(bridge, 7, vec!["getProgress".to_string()]);
        (pool, object, unit)
    }

    #[test]
    fn double_release_sends_one_frame() {
        let (_pool, object, mut unit) = setup();
        object.release();
        object.release();

        let frame = unit.receiver.try_next().unwrap().unwrap();
        assert_eq!(
            ChannelMessage::decode(&frame).unwrap(),
            ChannelMessage::Release { object_id: 7 }
        );
        assert!(unit.receiver.try_next().is_err());
        assert!(object.is_released());
    }

    #[test]
    fn unknown_method_is_rejected_locally() {
        let (mut pool, object, mut unit) = setup();
        let result = pool.run_until(object.call("getFinal", Value::Null));
        assert_eq!(
            result.unwrap_err(),
            RenderError::UnknownMethod("getFinal".to_string())
        );
        assert!(unit.receiver.try_next().is_err());
    }

    #[test]
    fn calls_after_release_fail() {
        let (mut pool, object, _unit) = setup();
        object.release();
        let result = pool.run_until(object.call("getProgress", Value::Null));
        assert_eq!(result.unwrap_err(), RenderError::Released(7));
    }
}
