use crate::{RequestLimits, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Scene submitted by the user.
///
/// Only the output size is interpreted on the controlling side; every other
/// key is carried verbatim to the render module as a scene parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    pub width: u32,
    pub height: u32,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl SceneDescription {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Parse user-supplied JSON.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json).map_err(|e| ValidationError::Malformed(e.to_string()))
    }
}

/// A validated render request, safe to send across the channel.
///
/// Only [`RenderRequest::new`] and [`RenderRequest::parse`] build one on the
/// controlling side. The execution unit decodes requests from the wire and
/// re-checks them before allocating anything.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    scene: SceneDescription,
    concurrency: u32,
}

impl RenderRequest {
    /// Check `scene` and `concurrency` against `limits`.
    pub fn new(
        scene: SceneDescription,
        concurrency: u32,
        limits: &RequestLimits,
    ) -> Result<Self, ValidationError> {
        let (width, height) = scene.dimensions();
        if width == 0 || height == 0 {
            return Err(ValidationError::EmptyDimensions { width, height });
        }
        if width > limits.max_dim || height > limits.max_dim {
            return Err(ValidationError::TooLarge {
                width,
                height,
                max: limits.max_dim,
            });
        }
        if concurrency == 0 || concurrency > limits.max_concurrency {
            return Err(ValidationError::Concurrency {
                value: concurrency,
                max: limits.max_concurrency,
            });
        }

        Ok(Self { scene, concurrency })
    }

    /// Parse and validate in one step, the way the start action does.
    pub fn parse(
        scene_json: &str,
        concurrency: u32,
        limits: &RequestLimits,
    ) -> Result<Self, ValidationError> {
        let scene = SceneDescription::from_json(scene_json)?;
        Self::new(scene, concurrency, limits)
    }

    pub fn scene(&self) -> &SceneDescription {
        &self.scene
    }

    pub fn concurrency(&self) -> u32 {
        self.concurrency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_DIM;
    use serde_json::json;

    fn limits() -> RequestLimits {
        RequestLimits::new(MAX_DIM, 8)
    }

    #[test]
    fn accepts_request_within_bounds() {
        let request = RenderRequest::parse(r#"{"width":100,"height":100}"#, 2, &limits()).unwrap();
        assert_eq!(request.scene().dimensions(), (100, 100));
        assert_eq!(request.concurrency(), 2);
    }

    #[test]
    fn accepts_exactly_max_dim() {
        let scene = SceneDescription::new(MAX_DIM, MAX_DIM);
        assert!(RenderRequest::new(scene, 1, &limits()).is_ok());
    }

    #[test]
    fn rejects_width_over_max_dim() {
        let err = RenderRequest::parse(r#"{"width":700,"height":400}"#, 2, &limits()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLarge {
                width: 700,
                height: 400,
                max: MAX_DIM
            }
        );
    }

    #[test]
    fn rejects_height_over_max_dim() {
        let scene = SceneDescription::new(10, MAX_DIM + 1);
        assert!(matches!(
            RenderRequest::new(scene, 1, &limits()),
            Err(ValidationError::TooLarge { .. })
        ));
    }

    #[test]
    fn rejects_zero_dimensions() {
        let scene = SceneDescription::new(0, 10);
        assert!(matches!(
            RenderRequest::new(scene, 1, &limits()),
            Err(ValidationError::EmptyDimensions { .. })
        ));
    }

    #[test]
    fn rejects_concurrency_out_of_range() {
        let scene = SceneDescription::new(10, 10);
        assert!(RenderRequest::new(scene.clone(), 0, &limits()).is_err());
        assert_eq!(
            RenderRequest::new(scene, 9, &limits()).unwrap_err(),
            ValidationError::Concurrency { value: 9, max: 8 }
        );
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = RenderRequest::parse("{ width: 100", 1, &limits()).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn negative_width_is_malformed() {
        let err = RenderRequest::parse(r#"{"width":-5,"height":10}"#, 1, &limits()).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn scene_parameters_are_preserved() {
        let json = r#"{"width":4,"height":2,"shader":"solid","color":[1,2,3]}"#;
        let scene = SceneDescription::from_json(json).unwrap();
        assert_eq!(scene.params.get("shader"), Some(&json!("solid")));

        let round = serde_json::to_value(&scene).unwrap();
        assert_eq!(round["color"], json!([1, 2, 3]));
        assert_eq!(round["width"], json!(4));
    }
}
