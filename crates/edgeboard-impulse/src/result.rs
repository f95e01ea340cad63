use serde::{Deserialize, Serialize};

/// Per-stage run time in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    pub dsp_us: i64,
    pub classification_us: i64,
    pub anomaly_us: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub label: String,
    pub value: f32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Output shape, fixed by the deployed model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum Predictions {
    Classification(Vec<Classification>),
    ObjectDetection(Vec<BoundingBox>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpulseResult {
    #[serde(default)]
    pub timing: Timing,
    pub predictions: Predictions,
    /// Present only for models with an anomaly block.
    #[serde(default)]
    pub anomaly: Option<f32>,
}
