//! Pipeline artifact loader

use crate::feature_encoder::EncodedRow;
use crate::models::artifact::{
    ColumnSpec, ColumnTransformer, EncodingError, EstimatorSpec, PipelineManifest, CLASSES,
    FORMAT_VERSION,
};
use crate::models::forest::RandomForest;
use crate::models::Estimator;
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Column transformer plus trained estimator, ready for inference
pub struct LoadedPipeline {
    /// File the pipeline was loaded from
    pub source: PathBuf,
    transformer: ColumnTransformer,
    estimator: Box<dyn Estimator>,
}

impl LoadedPipeline {
    pub fn new(
        source: PathBuf,
        transformer: ColumnTransformer,
        estimator: Box<dyn Estimator>,
    ) -> Result<Self> {
        if transformer.width() != estimator.n_features() {
            bail!(
                "column transformer yields {} features but estimator '{}' expects {}",
                transformer.width(),
                estimator.name(),
                estimator.n_features()
            );
        }
        Ok(Self {
            source,
            transformer,
            estimator,
        })
    }

    pub fn estimator_name(&self) -> &str {
        self.estimator.name()
    }

    pub fn transformer(&self) -> &ColumnTransformer {
        &self.transformer
    }

    /// Lay out the row for the estimator.
    pub fn features(&self, row: &EncodedRow) -> Result<Vec<f64>, EncodingError> {
        self.transformer.transform(row)
    }

    /// Raw `[no, yes]` probabilities for an already laid-out feature vector.
    pub fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2]> {
        self.estimator.predict_proba(features)
    }
}

impl std::fmt::Debug for LoadedPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPipeline")
            .field("source", &self.source)
            .field("estimator", &self.estimator.name())
            .field("n_features", &self.transformer.width())
            .finish()
    }
}

/// Loader for pipeline artifacts
pub struct ModelLoader {
    /// Threads for the ONNX backend
    #[cfg_attr(not(feature = "onnx"), allow(dead_code))]
    onnx_threads: usize,
}

impl ModelLoader {
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Read, parse and validate an artifact file.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<LoadedPipeline> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading model artifact");

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifact {}", path.display()))?;
        let manifest: PipelineManifest = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse model artifact {}", path.display()))?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        self.from_manifest(manifest, path.to_path_buf(), base_dir)
    }

    /// Build a pipeline from an already parsed manifest.
    ///
    /// `base_dir` resolves relative paths inside the manifest.
    pub fn from_manifest(
        &self,
        manifest: PipelineManifest,
        source: PathBuf,
        base_dir: &Path,
    ) -> Result<LoadedPipeline> {
        if manifest.format_version != FORMAT_VERSION {
            bail!(
                "unsupported artifact format_version {} (expected {})",
                manifest.format_version,
                FORMAT_VERSION
            );
        }
        if manifest.classes != CLASSES {
            bail!(
                "artifact classes must be {:?}, found {:?}",
                CLASSES,
                manifest.classes
            );
        }
        validate_columns(&manifest.columns)?;

        let transformer = ColumnTransformer::new(manifest.columns);
        let n_features = transformer.width();
        let kind = manifest.estimator.kind();

        let estimator: Box<dyn Estimator> = match manifest.estimator {
            EstimatorSpec::RandomForest { trees } => {
                let forest = RandomForest::from_specs(trees, n_features)
                    .context("Invalid random forest in model artifact")?;
                info!(trees = forest.tree_count(), "Random forest estimator built");
                Box::new(forest)
            }
            EstimatorSpec::Onnx {
                path,
                input_name,
                output_name,
            } => self.load_onnx(base_dir.join(path), n_features, input_name, output_name)?,
        };

        info!(
            estimator = kind,
            columns = transformer.columns().len(),
            features = n_features,
            "Model artifact loaded successfully"
        );

        LoadedPipeline::new(source, transformer, estimator)
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(
        &self,
        path: PathBuf,
        n_features: usize,
        input_name: Option<String>,
        output_name: Option<String>,
    ) -> Result<Box<dyn Estimator>> {
        let estimator = crate::models::onnx::OnnxEstimator::load(
            path,
            n_features,
            input_name,
            output_name,
            self.onnx_threads,
        )?;
        Ok(Box::new(estimator))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(
        &self,
        path: PathBuf,
        _n_features: usize,
        _input_name: Option<String>,
        _output_name: Option<String>,
    ) -> Result<Box<dyn Estimator>> {
        bail!(
            "artifact requires the ONNX estimator ({}) but this build lacks the `onnx` feature",
            path.display()
        )
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_columns(columns: &[ColumnSpec]) -> Result<()> {
    if columns.is_empty() {
        bail!("artifact declares no columns");
    }
    let mut seen = HashSet::new();
    for column in columns {
        if !seen.insert(column.name()) {
            bail!("column '{}' declared twice", column.name());
        }
        if let ColumnSpec::Categorical { name, categories } = column {
            if categories.is_empty() {
                bail!("categorical column '{}' has no categories", name);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const STUMP_ARTIFACT: &str = r#"{
        "format_version": 1,
        "classes": ["no", "yes"],
        "columns": [
            {"name": "duration", "kind": "numeric"},
            {"name": "poutcome", "kind": "categorical", "categories": ["failure", "success"]}
        ],
        "estimator": {
            "type": "random_forest",
            "trees": [
                {"nodes": [
                    {"feature": 0, "threshold": 300.0, "left": 1, "right": 2},
                    {"value": [90, 10]},
                    {"value": [40, 60]}
                ]}
            ]
        }
    }"#;

    fn write_artifact(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_forest_artifact() {
        let file = write_artifact(STUMP_ARTIFACT);
        let pipeline = ModelLoader::new().load(file.path()).unwrap();

        assert_eq!(pipeline.estimator_name(), "random_forest");
        assert_eq!(pipeline.transformer().width(), 3);
        let [no, yes] = pipeline.predict_proba(&[500.0, 0.0, 1.0]).unwrap();
        assert!((no - 0.4).abs() < 1e-12);
        assert!((yes - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_missing_file() {
        let err = ModelLoader::new()
            .load("/nonexistent/models/rf_pipeline.json")
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read model artifact"));
    }

    #[test]
    fn test_malformed_json() {
        let file = write_artifact("{ not json");
        let err = ModelLoader::new().load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse model artifact"));
    }

    #[test]
    fn test_rejects_wrong_classes() {
        let file = write_artifact(&STUMP_ARTIFACT.replace(r#"["no", "yes"]"#, r#"["yes", "no"]"#));
        assert!(ModelLoader::new().load(file.path()).is_err());
    }

    #[test]
    fn test_rejects_duplicate_columns() {
        let file = write_artifact(&STUMP_ARTIFACT.replace(r#""name": "poutcome""#, r#""name": "duration""#));
        let err = ModelLoader::new().load(file.path()).unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_tree_feature_out_of_range() {
        let file = write_artifact(&STUMP_ARTIFACT.replace(r#""feature": 0"#, r#""feature": 7"#));
        assert!(ModelLoader::new().load(file.path()).is_err());
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_onnx_requires_feature() {
        let manifest = STUMP_ARTIFACT.replace(
            r#""type": "random_forest","#,
            r#""type": "onnx", "path": "rf.onnx","#,
        );
        let file = write_artifact(&manifest);
        let err = ModelLoader::new().load(file.path()).unwrap_err();
        assert!(err.to_string().contains("onnx"));
    }
}
