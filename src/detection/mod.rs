pub mod replay;

pub use replay::ReplayModelLoader;

use crate::error::CamError;
use crate::frame::Frame;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Class label that drives highlighting and auto-record
pub const PERSON: &str = "person";

/// Axis-aligned box in source-frame pixels, serialized as `[x, y, width, height]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from([x, y, width, height]: [f32; 4]) -> Self {
        Self::new(x, y, width, height)
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

/// One object recognized in a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    #[serde(rename = "bbox")]
    pub bounding_box: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bounding_box: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bounding_box,
        }
    }

    pub fn is_person(&self) -> bool {
        self.label == PERSON
    }
}

/// Model selection and output filtering
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub base: String,
    pub min_score: f32,
    pub max_detections: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base: "mobilenet_v2".to_string(),
            min_score: 0.5,
            max_detections: 20,
        }
    }
}

/// Pretrained object detector
///
/// Any backend can sit behind this trait; the detection loop, overlay and
/// auto-record policy only ever see the returned list.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, frame: &Frame) -> Vec<Detection>;
}

/// Produces a ready detector, fetching weights as needed
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, config: &ModelConfig) -> Result<Arc<dyn Detector>, CamError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_uses_coco_bbox_layout() {
        let json = r#"{"label":"person","confidence":0.9,"bbox":[10,20,30,40]}"#;
        let detection: Detection = serde_json::from_str(json).unwrap();

        assert_eq!(detection.bounding_box, BoundingBox::new(10.0, 20.0, 30.0, 40.0));
        assert!(detection.is_person());

        let back = serde_json::to_value(&detection).unwrap();
        assert_eq!(back["bbox"], serde_json::json!([10.0, 20.0, 30.0, 40.0]));
    }

    #[test]
    fn test_is_person_is_exact_match() {
        let b = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert!(!Detection::new("Person", 0.9, b).is_person());
        assert!(!Detection::new("personal", 0.9, b).is_person());
    }
}
