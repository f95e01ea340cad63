use crate::result::{ImpulseResult, Predictions};
use crate::signal::Signal;
use crate::{ImpulseError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Classification,
    ObjectDetection { max_boxes: usize },
}

/// Metadata of the deployed model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    /// Number of raw feature items one inference consumes.
    pub input_frame_size: usize,
    pub labels: Vec<String>,
    pub output: OutputKind,
    #[serde(default)]
    pub has_anomaly: bool,
}

impl ModelInfo {
    /// Check that `result` has the shape this model produces.
    pub fn check(&self, result: &ImpulseResult) -> Result<()> {
        match (&self.output, &result.predictions) {
            (OutputKind::Classification, Predictions::Classification(items)) => {
                if items.len() != self.labels.len() {
                    return Err(ImpulseError::Mismatch(format!(
                        "{} scores for {} labels",
                        items.len(),
                        self.labels.len()
                    )));
                }
            }
            (OutputKind::ObjectDetection { max_boxes }, Predictions::ObjectDetection(boxes)) => {
                if boxes.len() > *max_boxes {
                    return Err(ImpulseError::Mismatch(format!(
                        "{} boxes, model allows {}",
                        boxes.len(),
                        max_boxes
                    )));
                }
            }
            _ => {
                return Err(ImpulseError::Mismatch(
                    "prediction kind differs from model output".to_string(),
                ))
            }
        }
        if self.has_anomaly != result.anomaly.is_some() {
            return Err(ImpulseError::Mismatch("anomaly score presence".to_string()));
        }
        Ok(())
    }
}

/// The external classifier SDK.
pub trait Classifier {
    fn model(&self) -> &ModelInfo;

    /// Run the full impulse over `signal`.
    fn run(&mut self, signal: &dyn Signal, debug: bool) -> Result<ImpulseResult>;
}
