//! Tabular dataset structures
//!
//! A dataset is rows x columns with a header; the last column of the source
//! file is the label. Feature columns are typed by inference: a column where
//! every cell parses as a number is numeric, everything else is categorical.

use serde::{Deserialize, Serialize};

/// A single feature column with its inferred type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FeatureColumn {
    Numeric { name: String, values: Vec<f64> },
    Categorical { name: String, values: Vec<String> },
}

impl FeatureColumn {
    /// Column name from the header row
    pub fn name(&self) -> &str {
        match self {
            FeatureColumn::Numeric { name, .. } => name,
            FeatureColumn::Categorical { name, .. } => name,
        }
    }

    /// Number of rows in the column
    pub fn len(&self) -> usize {
        match self {
            FeatureColumn::Numeric { values, .. } => values.len(),
            FeatureColumn::Categorical { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the column restricted to the given row indices
    pub fn select(&self, indices: &[usize]) -> FeatureColumn {
        match self {
            FeatureColumn::Numeric { name, values } => FeatureColumn::Numeric {
                name: name.clone(),
                values: indices.iter().map(|&i| values[i]).collect(),
            },
            FeatureColumn::Categorical { name, values } => FeatureColumn::Categorical {
                name: name.clone(),
                values: indices.iter().map(|&i| values[i].clone()).collect(),
            },
        }
    }
}

/// An in-memory tabular dataset: typed feature columns plus a raw label column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub features: Vec<FeatureColumn>,
    pub target_name: String,
    pub target: Vec<String>,
}

impl Dataset {
    pub fn n_rows(&self) -> usize {
        self.target.len()
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|c| c.name()).collect()
    }

    /// Copy of the dataset restricted to the given row indices
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: self.features.iter().map(|c| c.select(indices)).collect(),
            target_name: self.target_name.clone(),
            target: indices.iter().map(|&i| self.target[i].clone()).collect(),
        }
    }
}

/// Maps raw label strings to dense class indices and back.
///
/// Classes are the sorted unique labels observed at fit time. When every
/// label parses as a number the encoder also keeps the numeric value per
/// class, which enables the RMSE metric on top of accuracy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
    numeric_values: Option<Vec<f64>>,
}

impl LabelEncoder {
    /// Build an encoder over the given labels
    pub fn fit(labels: &[String]) -> Self {
        let mut classes: Vec<String> = labels.to_vec();
        classes.sort();
        classes.dedup();

        let parsed: Vec<Option<f64>> = classes.iter().map(|c| c.trim().parse().ok()).collect();
        let numeric_values = if !parsed.is_empty() && parsed.iter().all(|p| p.is_some()) {
            Some(parsed.into_iter().map(|p| p.unwrap_or(0.0)).collect())
        } else {
            None
        };

        Self {
            classes,
            numeric_values,
        }
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Class index for a raw label. Labels not seen at fit time map to the
    /// first class; callers fit over the full dataset so this is unreachable
    /// in the training path.
    pub fn encode_one(&self, label: &str) -> usize {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .unwrap_or(0)
    }

    /// Encode a batch of raw labels
    pub fn encode(&self, labels: &[String]) -> Vec<usize> {
        labels.iter().map(|l| self.encode_one(l)).collect()
    }

    /// Raw label for a class index
    pub fn decode_one(&self, class: usize) -> &str {
        &self.classes[class]
    }

    /// Decode a batch of class indices
    pub fn decode(&self, classes: &[usize]) -> Vec<String> {
        classes
            .iter()
            .map(|&c| self.classes[c].clone())
            .collect()
    }

    /// Whether every label parsed as a number
    pub fn is_numeric(&self) -> bool {
        self.numeric_values.is_some()
    }

    /// Numeric value of a class, when labels are numeric
    pub fn numeric_value(&self, class: usize) -> Option<f64> {
        self.numeric_values.as_ref().map(|v| v[class])
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}
