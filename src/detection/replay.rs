use super::{Detection, Detector, ModelConfig, ModelLoader};
use crate::error::CamError;
use crate::frame::Frame;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Loads recorded detector output from a JSON file
///
/// The file holds one detection list per cycle, e.g.
/// `[[{"label":"person","confidence":0.92,"bbox":[12,40,120,260]}], []]`.
pub struct ReplayModelLoader {
    path: PathBuf,
}

impl ReplayModelLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ModelLoader for ReplayModelLoader {
    async fn load(&self, config: &ModelConfig) -> Result<Arc<dyn Detector>, CamError> {
        tracing::info!("Loading {} detections from {:?}", config.base, self.path);

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CamError::ModelLoad(format!("{}: {}", self.path.display(), e)))?;

        let cycles: Vec<Vec<Detection>> = serde_json::from_str(&contents)
            .map_err(|e| CamError::ModelLoad(format!("{}: {}", self.path.display(), e)))?;

        if cycles.is_empty() {
            return Err(CamError::ModelLoad(format!(
                "{}: no detection cycles",
                self.path.display()
            )));
        }

        tracing::info!("Model ready ({} cycles)", cycles.len());
        Ok(Arc::new(ReplayDetector::new(cycles, config)))
    }
}

/// Yields recorded cycles in order, wrapping around at the end
pub struct ReplayDetector {
    cycles: Vec<Vec<Detection>>,
    cursor: AtomicUsize,
}

impl ReplayDetector {
    pub fn new(cycles: Vec<Vec<Detection>>, config: &ModelConfig) -> Self {
        let cycles = cycles
            .into_iter()
            .map(|cycle| {
                let mut kept: Vec<Detection> = cycle
                    .into_iter()
                    .filter(|d| d.confidence >= config.min_score)
                    .collect();
                kept.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
                kept.truncate(config.max_detections);
                kept
            })
            .collect();

        Self {
            cycles,
            cursor: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Detector for ReplayDetector {
    async fn detect(&self, _frame: &Frame) -> Vec<Detection> {
        if self.cycles.is_empty() {
            return Vec::new();
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.cycles.len();
        self.cycles[i].clone()
    }
}
