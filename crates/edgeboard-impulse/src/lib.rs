//! Boundary to the external classifier SDK: signals in, results out.

pub mod classifier;
pub mod render;
pub mod replay;
pub mod result;
pub mod signal;

pub use classifier::{Classifier, ModelInfo, OutputKind};
pub use render::render;
pub use replay::ReplayClassifier;
pub use result::{BoundingBox, Classification, ImpulseResult, Predictions, Timing};
pub use signal::{Signal, StaticSignal};

pub type Result<T> = std::result::Result<T, ImpulseError>;

#[derive(Debug, thiserror::Error)]
pub enum ImpulseError {
    #[error("signal read out of range: offset {offset} + {len} > {total}")]
    OutOfRange { offset: usize, len: usize, total: usize },

    #[error("expected {expected} input items, signal has {actual}")]
    InputSize { expected: usize, actual: usize },

    /// Non-zero code returned by the classifier.
    #[error("classifier returned error code {0}")]
    Classifier(i32),

    #[error("result does not match model: {0}")]
    Mismatch(String),
}
