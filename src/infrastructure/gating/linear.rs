//! Linear softmax gating model loaded from JSON.
//!
//! File format:
//!
//! ```json
//! {
//!   "version": "linear-2024-06",
//!   "actions": ["parametric", "retrieve", "compute", "clarify", "abstain"],
//!   "weights": [[...one column per action...], ...one row per feature...],
//!   "bias": [...one per action...]
//! }
//! ```
//!
//! Rows follow [`FeatureVector::NAMES`]. `"abstain"` is read as escalation;
//! columns naming the same action have their probabilities summed, and
//! actions without a column score zero.

use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::models::{ActionKind, FeatureVector};
use crate::domain::ports::GatingModel;

use super::softmax_slice;

#[derive(Error, Debug)]
pub enum GatingModelError {
    #[error("Failed to read gating model {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid gating model JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Gating model shape mismatch: {0}")]
    Shape(String),

    #[error("Unknown action in gating model: {0}")]
    UnknownAction(String),
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    #[serde(default = "default_version")]
    version: String,
    actions: Vec<String>,
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

fn default_version() -> String {
    "linear-unversioned".to_string()
}

#[derive(Debug, Clone)]
pub struct LinearGatingModel {
    version: String,
    actions: Vec<ActionKind>,
    /// `weights[feature][column]`
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl LinearGatingModel {
    pub fn from_json(json: &str) -> Result<Self, GatingModelError> {
        let file: ModelFile = serde_json::from_str(json)?;
        let columns = file.actions.len();
        if columns == 0 {
            return Err(GatingModelError::Shape("no actions".to_string()));
        }
        if file.weights.len() != FeatureVector::DIMENSIONS {
            return Err(GatingModelError::Shape(format!(
                "expected {} weight rows, found {}",
                FeatureVector::DIMENSIONS,
                file.weights.len()
            )));
        }
        if let Some((row, width)) = file
            .weights
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, width)| *width != columns)
        {
            return Err(GatingModelError::Shape(format!(
                "weight row {row} has {width} columns, expected {columns}"
            )));
        }
        if file.bias.len() != columns {
            return Err(GatingModelError::Shape(format!(
                "bias has {} entries, expected {columns}",
                file.bias.len()
            )));
        }
        if file.weights.iter().flatten().chain(&file.bias).any(|w| !w.is_finite()) {
            return Err(GatingModelError::Shape("non-finite parameter".to_string()));
        }

        let actions = file
            .actions
            .iter()
            .map(|name| {
                ActionKind::from_str(name).map_err(|_| GatingModelError::UnknownAction(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version: file.version,
            actions,
            weights: file.weights,
            bias: file.bias,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GatingModelError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| GatingModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let model = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            version = %model.version,
            "Loaded linear gating model"
        );
        Ok(model)
    }
}

impl GatingModel for LinearGatingModel {
    fn version(&self) -> &str {
        &self.version
    }

    fn score(&self, features: &FeatureVector) -> [f64; ActionKind::ALL.len()] {
        let x = features.as_array();
        let logits: Vec<f64> = (0..self.actions.len())
            .map(|column| {
                self.bias[column]
                    + x.iter()
                        .zip(&self.weights)
                        .map(|(value, row)| value * row[column])
                        .sum::<f64>()
            })
            .collect();

        let mut scores = [0.0; ActionKind::ALL.len()];
        for (action, probability) in self.actions.iter().zip(softmax_slice(&logits)) {
            scores[action.index()] += probability;
        }
        scores
    }
}
