//! ML model inference components

pub mod artifact;
pub mod forest;
pub mod inference;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use artifact::{ColumnSpec, ColumnTransformer, EncodingError, PipelineManifest};
pub use forest::RandomForest;
pub use inference::{InferenceError, InferenceService, ModelState};
pub use loader::{LoadedPipeline, ModelLoader};

/// A trained two-class estimator.
///
/// Implementations are immutable after load and shared across requests.
pub trait Estimator: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Width of the feature vector the estimator accepts
    fn n_features(&self) -> usize;

    /// Class probabilities ordered `[no, yes]` for one feature vector
    fn predict_proba(&self, features: &[f64]) -> anyhow::Result<[f64; 2]>;
}
