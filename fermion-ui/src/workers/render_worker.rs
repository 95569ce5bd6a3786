//! Typed wrappers over the execution unit's root and render-context methods.

use super::bridge::Bridge;
use super::remote_object::RemoteObject;
use fermion_core::{ObjectId, PixelBuffer, RenderError, RenderRequest, Target};
use log::info;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
struct InitializeReply {
    threads: usize,
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T, RenderError> {
    serde_json::from_value(value)
        .map_err(|e| RenderError::Protocol(format!("bad `{method}` reply: {e}")))
}

/// The execution unit's top-level method table.
#[derive(Clone)]
pub struct RenderWorker {
    bridge: Bridge,
}

impl RenderWorker {
    pub fn new(bridge: Bridge) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Prepare the render module and its worker pool. Returns the pool size.
    pub async fn initialize(&self, threads: Option<usize>) -> Result<usize, RenderError> {
        let reply = self
            .bridge
            .call(Target::Root, "initialize", json!({ "threads": threads }))
            .await?
            .into_value()?;
        let reply: InitializeReply = decode("initialize", reply)?;

        info!("Execution unit initialized with {} threads", reply.threads);
        Ok(reply.threads)
    }

    pub async fn render(&self, request: &RenderRequest) -> Result<RenderContextHandle, RenderError> {
        let args = serde_json::to_value(request).map_err(|e| RenderError::Protocol(e.to_string()))?;
        let object = self
            .bridge
            .call(Target::Root, "render", args)
            .await?
            .into_object()?;

        Ok(RenderContextHandle {
            object,
            dimensions: request.scene().dimensions(),
        })
    }

    /// Objects the execution unit currently keeps alive.
    pub async fn object_count(&self) -> Result<usize, RenderError> {
        let reply = self
            .bridge
            .call(Target::Root, "objectCount", Value::Null)
            .await?
            .into_value()?;
        decode("objectCount", reply)
    }
}

/// Controlling-side handle to one running render.
#[derive(Debug)]
pub struct RenderContextHandle {
    object: RemoteObject,
    dimensions: (u32, u32),
}

impl RenderContextHandle {
    pub fn object_id(&self) -> ObjectId {
        self.object.id()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    /// Completion fraction in `[0, 1]`.
    pub async fn progress(&self) -> Result<f32, RenderError> {
        let value = self.object.call("getProgress", Value::Null).await?.into_value()?;
        let fraction: f32 = decode("getProgress", value)?;
        Ok(fraction.clamp(0.0, 1.0))
    }

    pub async fn snapshot(&self) -> Result<PixelBuffer, RenderError> {
        self.pixels("getSnapshot").await
    }

    /// Resolves once the render has finished.
    pub async fn final_image(&self) -> Result<PixelBuffer, RenderError> {
        self.pixels("getFinal").await
    }

    pub fn release(&self) {
        self.object.release();
    }

    pub fn is_released(&self) -> bool {
        self.object.is_released()
    }

    async fn pixels(&self, method: &str) -> Result<PixelBuffer, RenderError> {
        let value = self.object.call(method, Value::Null).await?.into_value()?;
        let pixels: PixelBuffer = decode(method, value)?;

        if !pixels.is_well_formed() || pixels.dimensions() != self.dimensions {
            let (width, height) = self.dimensions;
            let (got_w, got_h) = pixels.dimensions();
            return Err(RenderError::Protocol(format!(
                "`{method}` returned a {got_w}x{got_h} buffer for a {width}x{height} render"
            )));
        }
        Ok(pixels)
    }
}
