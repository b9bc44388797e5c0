//! ONNX estimator backend

use crate::models::Estimator;
use anyhow::{anyhow, Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Estimator backed by an ONNX Runtime session.
///
/// The graph takes one float tensor of shape `[1, n_features]`. Class
/// probabilities are read either from a float tensor of shape `[1, 2]` or
/// from a `seq(map(int64, float))` output, as skl2onnx emits by default.
pub struct OnnxEstimator {
    // `Session::run` needs exclusive access
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    n_features: usize,
}

impl OnnxEstimator {
    pub fn load<P: AsRef<Path>>(
        path: P,
        n_features: usize,
        input_name: Option<String>,
        output_name: Option<String>,
        threads: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        ort::init().commit()?;

        info!(path = %path.display(), threads = threads, "Loading ONNX estimator");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(threads)?
            .commit_from_file(path)
            .context(format!("Failed to load ONNX graph from {:?}", path))?;

        let input_name = input_name.unwrap_or_else(|| {
            session
                .inputs
                .first()
                .map(|i| i.name.clone())
                .unwrap_or_else(|| "float_input".to_string())
        });

        let output_name = output_name.unwrap_or_else(|| {
            session
                .outputs
                .iter()
                .find(|o| o.name.contains("prob"))
                .or_else(|| session.outputs.last())
                .map(|o| o.name.clone())
                .unwrap_or_else(|| "probabilities".to_string())
        });

        info!(input = %input_name, output = %output_name, "ONNX estimator loaded");

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            n_features,
        })
    }
}

impl OnnxEstimator {
    /// Read `[no, yes]` from the configured output, falling back to any
    /// other non-label output that holds probabilities.
    fn extract_probabilities(&self, outputs: &SessionOutputs) -> Result<[f64; 2]> {
        if let Some(output) = outputs.get(self.output_name.as_str()) {
            if let Ok(pair) = probabilities_from_value(output) {
                return Ok(pair);
            }
        }

        for (name, output) in outputs.iter() {
            if name == self.output_name || name.contains("label") {
                continue;
            }
            if let Ok(pair) = probabilities_from_value(&output) {
                debug!(output = %name, "Probabilities read from fallback output");
                return Ok(pair);
            }
        }

        Err(anyhow!(
            "no probability output found (expected '{}')",
            self.output_name
        ))
    }
}

fn probabilities_from_value(output: &DynValue) -> Result<[f64; 2]> {
    if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
        let pair = probabilities_from_tensor(data)?;
        debug!(no = pair[0], yes = pair[1], "ONNX probabilities from tensor");
        return Ok(pair);
    }

    let dtype = output.dtype();
    if !DynSequenceValueType::can_downcast(&dtype) {
        return Err(anyhow!("unsupported output type {:?}", dtype));
    }

    let allocator = Allocator::default();
    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow!("Failed to downcast to sequence: {}", e))?;
    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let first = maps.first().ok_or_else(|| anyhow!("Empty sequence"))?;
    let entries = first.try_extract_key_values::<i64, f32>()?;

    let pair = probabilities_from_class_map(&entries)?;
    debug!(no = pair[0], yes = pair[1], "ONNX probabilities from seq(map)");
    Ok(pair)
}

/// `[no, yes]` from a flat float tensor: two columns, or one holding `yes`.
fn probabilities_from_tensor(data: &[f32]) -> Result<[f64; 2]> {
    match data {
        [no, yes, ..] => Ok([*no as f64, *yes as f64]),
        [yes] => Ok([1.0 - *yes as f64, *yes as f64]),
        [] => Err(anyhow!("probability tensor is empty")),
    }
}

/// `[no, yes]` from ZipMap entries keyed by class index (0 = no, 1 = yes).
fn probabilities_from_class_map(entries: &[(i64, f32)]) -> Result<[f64; 2]> {
    let class = |id: i64| {
        entries
            .iter()
            .find(|(k, _)| *k == id)
            .map(|(_, p)| *p as f64)
    };
    match (class(0), class(1)) {
        (Some(no), Some(yes)) => Ok([no, yes]),
        (None, Some(yes)) => Ok([1.0 - yes, yes]),
        (Some(no), None) => Ok([no, 1.0 - no]),
        (None, None) => Err(anyhow!("class map has neither class 0 nor class 1")),
    }
}

impl Estimator for OnnxEstimator {
    fn name(&self) -> &str {
        "onnx"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2]> {
        if features.len() != self.n_features {
            return Err(anyhow!(
                "expected {} features, got {}",
                self.n_features,
                features.len()
            ));
        }

        let shape = vec![1_i64, features.len() as i64];
        let data: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let input_tensor =
            Tensor::from_array((shape, data)).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow!("Lock error: {}", e))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_tensor])?;

        self.extract_probabilities(&outputs)
    }
}
