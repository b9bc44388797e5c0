//! Inference service: feature encoding plus the loaded pipeline

use crate::feature_encoder::FeatureEncoder;
use crate::models::artifact::EncodingError;
use crate::models::loader::{LoadedPipeline, ModelLoader};
use crate::types::record::InputRecord;
use crate::types::response::ClassProbabilities;
use anyhow::anyhow;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

/// Errors from a single prediction
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The artifact was never loaded; permanent until restart
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    #[error("estimator failed: {0:#}")]
    Estimator(anyhow::Error),
}

/// Load outcome, fixed for the lifetime of the process
#[derive(Debug)]
pub enum ModelState {
    Loaded(LoadedPipeline),
    Unavailable { reason: String },
}

/// Load-once, read-many prediction service.
///
/// Nothing here is mutated after construction, so it is shared across
/// request handlers behind an `Arc` without locking.
#[derive(Debug)]
pub struct InferenceService {
    state: ModelState,
    encoder: FeatureEncoder,
    artifact_path: PathBuf,
}

impl InferenceService {
    /// Load the artifact at `path`.
    ///
    /// Never fails: a load error is logged once and the service stays in
    /// degraded mode, rejecting every prediction.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        Self::load_with(&ModelLoader::new(), path)
    }

    pub fn load_with<P: AsRef<Path>>(loader: &ModelLoader, path: P) -> Self {
        let path = path.as_ref();
        let state = match loader.load(path) {
            Ok(pipeline) => {
                info!(
                    path = %path.display(),
                    estimator = pipeline.estimator_name(),
                    "Model loaded, service ready"
                );
                ModelState::Loaded(pipeline)
            }
            Err(e) => {
                error!(
                    path = %path.display(),
                    error = %format!("{:#}", e),
                    "Failed to load model artifact, serving in degraded mode"
                );
                ModelState::Unavailable {
                    reason: format!("{:#}", e),
                }
            }
        };

        Self {
            state,
            encoder: FeatureEncoder::new(),
            artifact_path: path.to_path_buf(),
        }
    }

    /// Wrap an already loaded pipeline.
    pub fn from_pipeline(pipeline: LoadedPipeline) -> Self {
        let artifact_path = pipeline.source.clone();
        Self {
            state: ModelState::Loaded(pipeline),
            encoder: FeatureEncoder::new(),
            artifact_path,
        }
    }

    /// A service that was never given a model.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: ModelState::Unavailable {
                reason: reason.into(),
            },
            encoder: FeatureEncoder::new(),
            artifact_path: PathBuf::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, ModelState::Loaded(_))
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Encode `record`, run the estimator and return `[no, yes]` probabilities.
    pub fn predict(&self, record: &InputRecord) -> Result<ClassProbabilities, InferenceError> {
        let pipeline = match &self.state {
            ModelState::Loaded(pipeline) => pipeline,
            ModelState::Unavailable { reason } => {
                return Err(InferenceError::ModelUnavailable(reason.clone()))
            }
        };

        let row = self.encoder.encode(record);
        let features = pipeline.features(&row)?;
        let [no, yes] = pipeline
            .predict_proba(&features)
            .map_err(InferenceError::Estimator)?;

        let probabilities = ClassProbabilities::from_pair(no, yes).ok_or_else(|| {
            InferenceError::Estimator(anyhow!("invalid probabilities {:?}", [no, yes]))
        })?;
        debug!(
            estimator = pipeline.estimator_name(),
            no = probabilities.no,
            yes = probabilities.yes,
            "Inference complete"
        );
        Ok(probabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::artifact::{ColumnSpec, ColumnTransformer};
    use crate::models::Estimator;
    use crate::types::record::*;

    /// Always answers with a fixed pair
    struct FixedEstimator([f64; 2], usize);

    impl Estimator for FixedEstimator {
        fn name(&self) -> &str {
            "fixed"
        }

        fn n_features(&self) -> usize {
            self.1
        }

        fn predict_proba(&self, _features: &[f64]) -> anyhow::Result<[f64; 2]> {
            Ok(self.0)
        }
    }

    fn record() -> InputRecord {
        InputRecord {
            age: 52,
            balance: -120.5,
            duration: 45,
            campaign: 3,
            previous: 1,
            job: Job::Retired,
            marital: Marital::Divorced,
            education: Education::Primary,
            default: YesNo::Yes,
            housing: YesNo::No,
            loan: YesNo::Yes,
            contact: Contact::Telephone,
            month: Month::Nov,
            poutcome: Poutcome::Failure,
        }
    }

    fn service(columns: Vec<ColumnSpec>, pair: [f64; 2]) -> InferenceService {
        let transformer = ColumnTransformer::new(columns);
        let width = transformer.width();
        let pipeline = LoadedPipeline::new(
            PathBuf::from("memory"),
            transformer,
            Box::new(FixedEstimator(pair, width)),
        )
        .unwrap();
        InferenceService::from_pipeline(pipeline)
    }

    #[test]
    fn test_unavailable_service() {
        let svc = InferenceService::unavailable("no artifact");
        assert!(!svc.is_loaded());
        assert!(matches!(
            svc.predict(&record()),
            Err(InferenceError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_load_missing_artifact_degrades() {
        let svc = InferenceService::load("/definitely/not/here/rf_pipeline.json");
        assert!(!svc.is_loaded());
        match svc.state() {
            ModelState::Unavailable { reason } => assert!(reason.contains("rf_pipeline.json")),
            ModelState::Loaded(_) => panic!("expected degraded state"),
        }
        assert!(svc.predict(&record()).is_err());
        assert!(svc.predict(&record()).is_err());
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let svc = service(
            vec![ColumnSpec::Numeric {
                name: "age".to_string(),
            }],
            [0.3, 0.9],
        );
        assert!(svc.is_loaded());
        let p = svc.predict(&record()).unwrap();
        assert!((p.no + p.yes - 1.0).abs() < 1e-9);
        assert!((p.yes - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_estimator_output_is_an_error() {
        let age = || {
            vec![ColumnSpec::Numeric {
                name: "age".to_string(),
            }]
        };
        for pair in [
            [f64::NAN, f64::NAN],
            [0.4, f64::INFINITY],
            [0.0, 0.0],
            [-0.5, 1.5],
        ] {
            let svc = service(age(), pair);
            assert!(
                matches!(svc.predict(&record()), Err(InferenceError::Estimator(_))),
                "{:?}",
                pair
            );
        }
    }

    #[test]
    fn test_encoding_error_when_column_absent() {
        let svc = service(
            vec![ColumnSpec::Numeric {
                name: "nr_employed".to_string(),
            }],
            [0.5, 0.5],
        );
        assert!(matches!(
            svc.predict(&record()),
            Err(InferenceError::Encoding(_))
        ));
    }
}
