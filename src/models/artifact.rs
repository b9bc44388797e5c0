//! Pipeline artifact format and the column transformer it declares.
//!
//! The artifact is a JSON manifest exported from the trained pipeline:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "classes": ["no", "yes"],
//!   "columns": [
//!     {"name": "age", "kind": "numeric"},
//!     {"name": "job", "kind": "categorical", "categories": ["admin.", "student"]}
//!   ],
//!   "estimator": {"type": "random_forest", "trees": [ ... ]}
//! }
//! ```
//!
//! Column order in `columns` is the order the estimator was trained on.

use crate::feature_encoder::{EncodedRow, Value};
use crate::models::forest::TreeSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Only manifest version understood by this service
pub const FORMAT_VERSION: u32 = 1;

/// Class labels, in `predict_proba` output order
pub const CLASSES: [&str; 2] = ["no", "yes"];

/// Top-level artifact manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineManifest {
    pub format_version: u32,
    pub classes: Vec<String>,
    pub columns: Vec<ColumnSpec>,
    pub estimator: EstimatorSpec,
}

/// How one input column is turned into estimator features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnSpec {
    /// Passed through as a single feature
    Numeric { name: String },
    /// One-hot encoded over `categories`; unknown values encode as all zeros
    Categorical {
        name: String,
        categories: Vec<String>,
    },
}

impl ColumnSpec {
    pub fn name(&self) -> &str {
        match self {
            ColumnSpec::Numeric { name } | ColumnSpec::Categorical { name, .. } => name,
        }
    }

    /// Number of estimator features this column expands to.
    pub fn width(&self) -> usize {
        match self {
            ColumnSpec::Numeric { .. } => 1,
            ColumnSpec::Categorical { categories, .. } => categories.len(),
        }
    }
}

/// Trained estimator section of the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EstimatorSpec {
    RandomForest {
        trees: Vec<TreeSpec>,
    },
    /// External ONNX graph, path relative to the manifest file
    Onnx {
        path: PathBuf,
        #[serde(default)]
        input_name: Option<String>,
        #[serde(default)]
        output_name: Option<String>,
    },
}

impl EstimatorSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            EstimatorSpec::RandomForest { .. } => "random_forest",
            EstimatorSpec::Onnx { .. } => "onnx",
        }
    }
}

/// Raised when an encoded row cannot be laid out for the estimator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodingError {
    #[error("column '{0}' required by the model artifact is not present in the encoded row")]
    MissingColumn(String),
}

/// Lays out an [`EncodedRow`] as the flat feature vector the estimator expects.
#[derive(Debug, Clone)]
pub struct ColumnTransformer {
    columns: Vec<ColumnSpec>,
    width: usize,
}

impl ColumnTransformer {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        let width = columns.iter().map(ColumnSpec::width).sum();
        Self { columns, width }
    }

    /// Total number of output features.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Missing values become NaN for numeric columns and all-zero
    /// indicators for categorical ones.
    pub fn transform(&self, row: &EncodedRow) -> Result<Vec<f64>, EncodingError> {
        let mut features = Vec::with_capacity(self.width);

        for spec in &self.columns {
            let value = row
                .get(spec.name())
                .ok_or_else(|| EncodingError::MissingColumn(spec.name().to_string()))?;

            match spec {
                ColumnSpec::Numeric { .. } => {
                    features.push(value.as_number().unwrap_or(f64::NAN));
                }
                ColumnSpec::Categorical { categories, .. } => {
                    features.extend(categories.iter().map(|category| {
                        if category_matches(category, value) {
                            1.0
                        } else {
                            0.0
                        }
                    }));
                }
            }
        }

        Ok(features)
    }
}

/// Categories are stored as strings; numeric cells match a category that
/// parses to the same number.
fn category_matches(category: &str, value: &Value) -> bool {
    match value {
        Value::Text(s) => s == category,
        Value::Number(v) => category.parse::<f64>().map(|c| c == *v).unwrap_or(false),
        Value::Missing => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_encoder::FeatureEncoder;
    use crate::types::record::*;

    fn encoded_row() -> EncodedRow {
        FeatureEncoder::new().encode(&InputRecord {
            age: 35,
            balance: 1500.0,
            duration: 200,
            campaign: 2,
            previous: 0,
            job: Job::Technician,
            marital: Marital::Married,
            education: Education::Secondary,
            default: YesNo::No,
            housing: YesNo::Yes,
            loan: YesNo::No,
            contact: Contact::Cellular,
            month: Month::May,
            poutcome: Poutcome::Unknown,
        })
    }

    fn numeric(name: &str) -> ColumnSpec {
        ColumnSpec::Numeric {
            name: name.to_string(),
        }
    }

    fn categorical(name: &str, categories: &[&str]) -> ColumnSpec {
        ColumnSpec::Categorical {
            name: name.to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_transform_layout() {
        let transformer = ColumnTransformer::new(vec![
            numeric("age"),
            categorical("marital", &["divorced", "married", "single"]),
            numeric("housing"),
            numeric("pdays"),
            categorical("month", &["4", "5", "6"]),
        ]);
        assert_eq!(transformer.width(), 9);

        let features = transformer.transform(&encoded_row()).unwrap();
        assert_eq!(features, vec![35.0, 0.0, 1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unknown_category_is_all_zeros() {
        let transformer = ColumnTransformer::new(vec![categorical("job", &["admin.", "student"])]);
        let features = transformer.transform(&encoded_row()).unwrap();
        assert_eq!(features, vec![0.0, 0.0]);
    }

    #[test]
    fn test_text_in_numeric_column_is_nan() {
        let transformer = ColumnTransformer::new(vec![numeric("contact")]);
        let features = transformer.transform(&encoded_row()).unwrap();
        assert!(features[0].is_nan());
    }

    #[test]
    fn test_missing_column() {
        let transformer = ColumnTransformer::new(vec![numeric("emp_var_rate")]);
        let err = transformer.transform(&encoded_row()).unwrap_err();
        assert_eq!(err, EncodingError::MissingColumn("emp_var_rate".to_string()));
    }

    #[test]
    fn test_manifest_parsing() {
        let json = r#"{
            "format_version": 1,
            "classes": ["no", "yes"],
            "columns": [
                {"name": "age", "kind": "numeric"},
                {"name": "job", "kind": "categorical", "categories": ["admin.", "student"]}
            ],
            "estimator": {"type": "onnx", "path": "rf.onnx"}
        }"#;
        let manifest: PipelineManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.columns.len(), 2);
        assert_eq!(manifest.columns[1].width(), 2);
        assert_eq!(manifest.estimator.kind(), "onnx");
    }
}
