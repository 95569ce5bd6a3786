use fermion_core::{RemoteError, SceneDescription};
use serde_json::Value;

/// Per-pixel color function selected by the scene's `"shader"` parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shader {
    /// Red follows the row, green follows the column.
    Gradient { width: u32, height: u32 },
    /// Every pixel the same opaque color.
    Solid { rgb: [u8; 3] },
}

impl Shader {
    pub fn for_scene(scene: &SceneDescription) -> Result<Self, RemoteError> {
        let name = match scene.params.get("shader") {
            None => "gradient",
            Some(Value::String(name)) => name.as_str(),
            Some(other) => {
                return Err(RemoteError::invalid_arguments(format!(
                    "shader must be a string, got {other}"
                )))
            }
        };

        match name {
            "gradient" => Ok(Shader::Gradient {
                width: scene.width,
                height: scene.height,
            }),
            "solid" => {
                let color = scene.params.get("color").cloned().unwrap_or(Value::Null);
                let rgb: [u8; 3] = serde_json::from_value(color).map_err(|e| {
                    RemoteError::invalid_arguments(format!("solid shader needs color [r, g, b]: {e}"))
                })?;
                Ok(Shader::Solid { rgb })
            }
            other => Err(RemoteError::invalid_arguments(format!(
                "unknown shader `{other}`"
            ))),
        }
    }

    pub fn shade(&self, x: u32, y: u32) -> [u8; 4] {
        match *self {
            Shader::Gradient { width, height } => [
                (255.0 * (y as f32 / height as f32)) as u8,
                (255.0 * (x as f32 / width as f32)) as u8,
                0,
                255,
            ],
            Shader::Solid { rgb: [r, g, b] } => [r, g, b, 255],
        }
    }
}
