//! Random forest estimator evaluated from exported tree structure.
//!
//! Each tree is a flat node list rooted at index 0. Split nodes send a
//! sample left when `x[feature] <= threshold`; leaves hold per-class
//! sample counts (or fractions) ordered `[no, yes]`.

use crate::models::Estimator;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

fn default_missing_left() -> bool {
    true
}

/// One node of an exported decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Leaf {
        value: [f64; 2],
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Direction for NaN inputs
        #[serde(default = "default_missing_left")]
        missing_left: bool,
    },
}

impl NodeSpec {
    pub fn leaf(no: f64, yes: f64) -> Self {
        NodeSpec::Leaf { value: [no, yes] }
    }

    pub fn split(feature: usize, threshold: f64, left: usize, right: usize) -> Self {
        NodeSpec::Split {
            feature,
            threshold,
            left,
            right,
            missing_left: true,
        }
    }
}

/// Exported decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSpec {
    pub nodes: Vec<NodeSpec>,
}

/// A validated tree with leaf distributions already normalized
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<NodeSpec>,
}

impl Tree {
    fn build(index: usize, spec: TreeSpec, n_features: usize) -> Result<Self> {
        if spec.nodes.is_empty() {
            bail!("tree {} has no nodes", index);
        }

        let len = spec.nodes.len();
        let mut nodes = Vec::with_capacity(len);
        for (id, node) in spec.nodes.into_iter().enumerate() {
            match node {
                NodeSpec::Split {
                    feature,
                    left,
                    right,
                    threshold,
                    ..
                } => {
                    if feature >= n_features {
                        bail!(
                            "tree {} node {}: feature index {} out of range (model has {} features)",
                            index,
                            id,
                            feature,
                            n_features
                        );
                    }
                    // Children must come after their parent, which also rules out cycles.
                    if left <= id || right <= id || left >= len || right >= len {
                        bail!("tree {} node {}: invalid children ({}, {})", index, id, left, right);
                    }
                    if threshold.is_nan() {
                        bail!("tree {} node {}: threshold is NaN", index, id);
                    }
                    nodes.push(node);
                }
                NodeSpec::Leaf { value: [no, yes] } => {
                    let valid = no.is_finite() && yes.is_finite() && no >= 0.0 && yes >= 0.0;
                    let total = no + yes;
                    if !valid || !total.is_finite() || total <= 0.0 {
                        bail!("tree {} node {}: invalid leaf value [{}, {}]", index, id, no, yes);
                    }
                    nodes.push(NodeSpec::leaf(no / total, yes / total));
                }
            }
        }

        Ok(Self { nodes })
    }

    fn predict(&self, features: &[f64]) -> [f64; 2] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                NodeSpec::Leaf { value } => return *value,
                NodeSpec::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    missing_left,
                } => {
                    let x = features[*feature];
                    let go_left = if x.is_nan() { *missing_left } else { x <= *threshold };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }
}

/// Forest probability is the unweighted mean of per-tree distributions.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<Tree>,
    n_features: usize,
}

impl RandomForest {
    /// Validate exported trees against the transformed feature width.
    pub fn from_specs(specs: Vec<TreeSpec>, n_features: usize) -> Result<Self> {
        if specs.is_empty() {
            bail!("random forest has no trees");
        }
        let trees = specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| Tree::build(i, spec, n_features))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { trees, n_features })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Estimator for RandomForest {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2]> {
        if features.len() != self.n_features {
            bail!(
                "expected {} features, got {}",
                self.n_features,
                features.len()
            );
        }

        let mut sum = [0.0, 0.0];
        for tree in &self.trees {
            let [no, yes] = tree.predict(features);
            sum[0] += no;
            sum[1] += yes;
        }
        let n = self.trees.len() as f64;
        Ok([sum[0] / n, sum[1] / n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, left: [f64; 2], right: [f64; 2]) -> TreeSpec {
        TreeSpec {
            nodes: vec![
                NodeSpec::split(feature, threshold, 1, 2),
                NodeSpec::leaf(left[0], left[1]),
                NodeSpec::leaf(right[0], right[1]),
            ],
        }
    }

    #[test]
    fn test_single_tree_routing() {
        let forest =
            RandomForest::from_specs(vec![stump(0, 10.0, [9.0, 1.0], [2.0, 8.0])], 1).unwrap();

        let [no, yes] = forest.predict_proba(&[10.0]).unwrap();
        assert!((no - 0.9).abs() < 1e-12);
        assert!((yes - 0.1).abs() < 1e-12);

        let [no, yes] = forest.predict_proba(&[10.5]).unwrap();
        assert!((no - 0.2).abs() < 1e-12);
        assert!((yes - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_forest_averages_trees() {
        let forest = RandomForest::from_specs(
            vec![
                stump(0, 0.5, [1.0, 0.0], [0.0, 1.0]),
                stump(1, 0.5, [1.0, 1.0], [0.0, 4.0]),
            ],
            2,
        )
        .unwrap();
        assert_eq!(forest.tree_count(), 2);

        let [no, yes] = forest.predict_proba(&[1.0, 0.0]).unwrap();
        assert!((no - 0.25).abs() < 1e-12);
        assert!((yes - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_nan_follows_missing_direction() {
        let mut spec = stump(0, 1.0, [1.0, 0.0], [0.0, 1.0]);
        let forest = RandomForest::from_specs(vec![spec.clone()], 1).unwrap();
        assert_eq!(forest.predict_proba(&[f64::NAN]).unwrap(), [1.0, 0.0]);

        if let NodeSpec::Split { missing_left, .. } = &mut spec.nodes[0] {
            *missing_left = false;
        }
        let forest = RandomForest::from_specs(vec![spec], 1).unwrap();
        assert_eq!(forest.predict_proba(&[f64::NAN]).unwrap(), [0.0, 1.0]);
    }

    #[test]
    fn test_rejects_invalid_structure() {
        assert!(RandomForest::from_specs(vec![], 1).is_err());
        assert!(RandomForest::from_specs(vec![TreeSpec { nodes: vec![] }], 1).is_err());
        // feature out of range
        assert!(RandomForest::from_specs(vec![stump(3, 0.0, [1.0, 0.0], [0.0, 1.0])], 2).is_err());
        // self-loop
        let cyclic = TreeSpec {
            nodes: vec![NodeSpec::split(0, 0.0, 0, 1), NodeSpec::leaf(1.0, 0.0)],
        };
        assert!(RandomForest::from_specs(vec![cyclic], 1).is_err());
        // empty leaf
        assert!(RandomForest::from_specs(vec![stump(0, 0.0, [0.0, 0.0], [0.0, 1.0])], 1).is_err());
        // counts whose sum overflows
        assert!(RandomForest::from_specs(vec![stump(0, 0.0, [1e308, 1e308], [0.0, 1.0])], 1).is_err());
    }

    #[test]
    fn test_feature_count_mismatch() {
        let forest = RandomForest::from_specs(vec![stump(0, 0.0, [1.0, 0.0], [0.0, 1.0])], 2).unwrap();
        assert!(forest.predict_proba(&[1.0]).is_err());
    }

    #[test]
    fn test_node_json_shapes() {
        let nodes: Vec<NodeSpec> = serde_json::from_str(
            r#"[
                {"feature": 2, "threshold": 0.5, "left": 1, "right": 2},
                {"value": [3, 1]},
                {"feature": 0, "threshold": 1.5, "left": 3, "right": 4, "missing_left": false}
            ]"#,
        )
        .unwrap();
        assert_eq!(nodes[0], NodeSpec::split(2, 0.5, 1, 2));
        assert_eq!(nodes[1], NodeSpec::leaf(3.0, 1.0));
        assert!(matches!(nodes[2], NodeSpec::Split { missing_left: false, .. }));
    }
}
