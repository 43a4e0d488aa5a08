//! Tree ensemble model (gradient boosting or random forest).
//!
//! # Model
//!
//! Every tree routes a row with `x[feature] <= threshold` to the left child
//! (NaN goes right) until a leaf. Leaves hold one value per model output;
//! `output_index` selects the positive-class output and is the only index
//! read, both for prediction and for attribution.
//!
//! - `aggregation = sum`: `raw = base_score + Σ leaf` (boosting)
//! - `aggregation = mean`: `raw = base_score + mean(leaf)` (bagging)
//! - `link = logistic`: probability is `σ(raw)`, attribution in log-odds
//! - `link = identity`: `raw` already is a probability, attribution in
//!   probability space
//!
//! # Attribution
//!
//! Decision-path attribution: each node's expected output is the
//! cover-weighted mean of the leaves below it. A tree contributes its root
//! expectation to the baseline, and every split on the path contributes
//! `E[child] − E[node]` to the split feature. Along a path these differences
//! telescope to the leaf value, so the attribution is exactly additive.

use serde::{Deserialize, Serialize};

use crate::domain::{sigmoid, Attribution, EncodedVector, OutputSpace};
use crate::ports::{AttributionError, Attributor, Classifier, FittedModel, ModelError};

/// How per-tree outputs combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    Mean,
}

/// Map from aggregated output to probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Link {
    Logistic,
    Identity,
}

/// One node of a decision tree. Children always have larger indices than
/// their parent; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
        /// Number (or weight) of training rows that reached the leaf.
        cover: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn leaf_index(&self, x: &[f64]) -> usize {
        let mut index = 0;
        while let TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        } = &self.nodes[index]
        {
            index = if x[*feature] <= *threshold { *left } else { *right };
        }
        index
    }

    /// Cover-weighted expected output per node, for one output.
    ///
    /// `None` when some subtree has zero total cover.
    fn expectations(&self, output: usize) -> Option<Vec<f64>> {
        let n = self.nodes.len();
        let mut expected = vec![0.0; n];
        let mut cover = vec![0.0; n];

        for index in (0..n).rev() {
            match &self.nodes[index] {
                TreeNode::Leaf { value, cover: c } => {
                    expected[index] = value[output];
                    cover[index] = *c;
                }
                TreeNode::Split { left, right, .. } => {
                    let total = cover[*left] + cover[*right];
                    if total <= 0.0 {
                        return None;
                    }
                    expected[index] =
                        (expected[*left] * cover[*left] + expected[*right] * cover[*right]) / total;
                    cover[index] = total;
                }
            }
        }

        Some(expected)
    }
}

/// Exported ensemble parameters, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEnsembleSpec {
    pub n_features: usize,
    #[serde(default = "default_outputs")]
    pub n_outputs: usize,
    #[serde(default)]
    pub output_index: usize,
    #[serde(default)]
    pub base_score: f64,
    pub aggregation: Aggregation,
    pub link: Link,
    pub trees: Vec<DecisionTree>,
}

fn default_outputs() -> usize {
    1
}

/// Validated tree ensemble.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "TreeEnsembleSpec")]
pub struct TreeEnsemble {
    spec: TreeEnsembleSpec,
    /// Per-tree node expectations for `output_index`.
    expectations: Vec<Option<Vec<f64>>>,
}

impl TreeEnsemble {
    /// Validate an exported ensemble.
    ///
    /// # Errors
    /// Returns `ModelError::InvalidParameters` if the trees are malformed.
    pub fn new(spec: TreeEnsembleSpec) -> Result<Self, ModelError> {
        let invalid = |msg: String| Err(ModelError::InvalidParameters(msg));

        if spec.trees.is_empty() {
            return invalid("ensemble has no trees".into());
        }
        if spec.n_features == 0 {
            return invalid("n_features must be > 0".into());
        }
        if spec.output_index >= spec.n_outputs {
            return invalid(format!(
                "output_index {} out of range for {} outputs",
                spec.output_index, spec.n_outputs
            ));
        }
        if !spec.base_score.is_finite() {
            return invalid("base_score must be finite".into());
        }

        for (t, tree) in spec.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return invalid(format!("tree {t} has no nodes"));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    TreeNode::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if *feature >= spec.n_features {
                            return invalid(format!(
                                "tree {t} node {i}: feature {feature} out of range"
                            ));
                        }
                        if threshold.is_nan() {
                            return invalid(format!("tree {t} node {i}: NaN threshold"));
                        }
                        let n = tree.nodes.len();
                        if *left <= i || *right <= i || *left >= n || *right >= n {
                            return invalid(format!("tree {t} node {i}: invalid child index"));
                        }
                    }
                    TreeNode::Leaf { value, cover } => {
                        if value.len() != spec.n_outputs {
                            return invalid(format!(
                                "tree {t} node {i}: leaf has {} outputs, expected {}",
                                value.len(),
                                spec.n_outputs
                            ));
                        }
                        if value.iter().any(|v| !v.is_finite()) {
                            return invalid(format!("tree {t} node {i}: non-finite leaf value"));
                        }
                        if !cover.is_finite() || *cover < 0.0 {
                            return invalid(format!("tree {t} node {i}: invalid cover"));
                        }
                    }
                }
            }
        }

        let expectations = spec
            .trees
            .iter()
            .map(|tree| tree.expectations(spec.output_index))
            .collect();

        Ok(Self { spec, expectations })
    }

    #[must_use]
    pub fn spec(&self) -> &TreeEnsembleSpec {
        &self.spec
    }

    fn check_shape(&self, vector: &EncodedVector) -> Result<(), ModelError> {
        if vector.len() != self.spec.n_features {
            return Err(ModelError::ShapeMismatch {
                expected: self.spec.n_features,
                got: vector.len(),
            });
        }
        Ok(())
    }

    /// Weight of one tree in the aggregate.
    fn tree_weight(&self) -> f64 {
        match self.spec.aggregation {
            Aggregation::Sum => 1.0,
            Aggregation::Mean => 1.0 / self.spec.trees.len() as f64,
        }
    }

    /// Aggregated output before the link function.
    fn raw_output(&self, x: &[f64]) -> f64 {
        let weight = self.tree_weight();
        let output = self.spec.output_index;
        self.spec.base_score
            + self
                .spec
                .trees
                .iter()
                .map(|tree| match &tree.nodes[tree.leaf_index(x)] {
                    TreeNode::Leaf { value, .. } => value[output] * weight,
                    TreeNode::Split { .. } => 0.0,
                })
                .sum::<f64>()
    }

    fn space(&self) -> OutputSpace {
        match self.spec.link {
            Link::Logistic => OutputSpace::LogOdds,
            Link::Identity => OutputSpace::Probability,
        }
    }
}

impl TryFrom<TreeEnsembleSpec> for TreeEnsemble {
    type Error = ModelError;

    fn try_from(spec: TreeEnsembleSpec) -> Result<Self, Self::Error> {
        Self::new(spec)
    }
}

impl Classifier for TreeEnsemble {
    fn n_features(&self) -> usize {
        self.spec.n_features
    }

    fn predict_probability(&self, vector: &EncodedVector) -> Result<f64, ModelError> {
        self.check_shape(vector)?;
        let raw = self.raw_output(vector.values());
        let p = match self.spec.link {
            Link::Logistic => sigmoid(raw),
            Link::Identity => raw.clamp(0.0, 1.0),
        };
        if p.is_nan() {
            return Err(ModelError::NonFiniteOutput);
        }
        Ok(p)
    }
}

impl Attributor for TreeEnsemble {
    fn explain(&self, vector: &EncodedVector) -> Result<Attribution, AttributionError> {
        self.check_shape(vector)?;
        let x = vector.values();
        let weight = self.tree_weight();

        let mut baseline = self.spec.base_score;
        let mut contributions = vec![0.0; self.spec.n_features];

        for (t, (tree, expected)) in self.spec.trees.iter().zip(&self.expectations).enumerate() {
            let expected = expected.as_ref().ok_or_else(|| {
                AttributionError::Unsupported(format!("tree {t} has a zero-cover subtree"))
            })?;

            baseline += expected[0] * weight;
            let mut index = 0;
            while let TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } = &tree.nodes[index]
            {
                let next = if x[*feature] <= *threshold { *left } else { *right };
                contributions[*feature] += (expected[next] - expected[index]) * weight;
                index = next;
            }
        }

        Ok(Attribution::new(
            baseline,
            vector.columns(),
            contributions,
            self.space(),
        ))
    }
}

impl FittedModel for TreeEnsemble {
    fn family(&self) -> &'static str {
        match self.spec.aggregation {
            Aggregation::Sum => "gradient_boosting",
            Aggregation::Mean => "random_forest",
        }
    }
}
