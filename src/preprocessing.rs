//! Column-wise preprocessing: numeric passthrough and one-hot encoding
//!
//! The preprocessor is fit on the training split only. Numeric columns pass
//! through unchanged; categorical columns one-hot encode against the
//! vocabulary observed during fitting. Categories never seen at fit time
//! encode to an all-zero block.

use crate::types::dataset::{Dataset, FeatureColumn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Per-column encoding step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ColumnEncoder {
    /// Numeric column copied into a single output feature
    Passthrough { name: String },
    /// Categorical column expanded into one indicator per known category
    OneHot {
        name: String,
        categories: Vec<String>,
    },
}

impl ColumnEncoder {
    /// Width of this encoder's output block
    fn width(&self) -> usize {
        match self {
            ColumnEncoder::Passthrough { .. } => 1,
            ColumnEncoder::OneHot { categories, .. } => categories.len(),
        }
    }
}

/// Errors raised while encoding rows with a fitted preprocessor
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("expected {expected} columns per row, got {got}")]
    WrongArity { expected: usize, got: usize },
    #[error("column {column} expects a number, got {value:?}")]
    NotNumeric { column: String, value: String },
}

/// Fitted column-dispatch preprocessor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    encoders: Vec<ColumnEncoder>,
}

impl Preprocessor {
    /// Fit encoders against the training split
    pub fn fit(train: &Dataset) -> Self {
        let encoders = train
            .features
            .iter()
            .map(|column| match column {
                FeatureColumn::Numeric { name, .. } => ColumnEncoder::Passthrough {
                    name: name.clone(),
                },
                FeatureColumn::Categorical { name, values } => {
                    let categories: BTreeSet<&String> = values.iter().collect();
                    ColumnEncoder::OneHot {
                        name: name.clone(),
                        categories: categories.into_iter().cloned().collect(),
                    }
                }
            })
            .collect();

        Self { encoders }
    }

    /// Total width of the encoded feature matrix
    pub fn output_dim(&self) -> usize {
        self.encoders.iter().map(|e| e.width()).sum()
    }

    /// Number of input columns the preprocessor expects
    pub fn input_dim(&self) -> usize {
        self.encoders.len()
    }

    /// Names of the encoded output features, `column=value` for indicators
    pub fn output_feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.output_dim());
        for encoder in &self.encoders {
            match encoder {
                ColumnEncoder::Passthrough { name } => names.push(name.clone()),
                ColumnEncoder::OneHot { name, categories } => {
                    for category in categories {
                        names.push(format!("{}={}", name, category));
                    }
                }
            }
        }
        names
    }

    /// Encode a dataset whose columns line up with the fitted schema
    pub fn transform(&self, dataset: &Dataset) -> Result<Array2<f64>, TransformError> {
        if dataset.n_features() != self.encoders.len() {
            return Err(TransformError::WrongArity {
                expected: self.encoders.len(),
                got: dataset.n_features(),
            });
        }

        let n_rows = dataset.n_rows();
        let mut matrix = Array2::zeros((n_rows, self.output_dim()));

        let mut offset = 0;
        for (encoder, column) in self.encoders.iter().zip(&dataset.features) {
            match encoder {
                ColumnEncoder::Passthrough { name } => {
                    match column {
                        FeatureColumn::Numeric { values, .. } => {
                            for (i, &v) in values.iter().enumerate() {
                                matrix[[i, offset]] = v;
                            }
                        }
                        // A categorical column landing on a numeric encoder
                        // means the caller re-parsed with a different schema.
                        FeatureColumn::Categorical { values, .. } => {
                            for (i, v) in values.iter().enumerate() {
                                let parsed = v.trim().parse().map_err(|_| {
                                    TransformError::NotNumeric {
                                        column: name.clone(),
                                        value: v.clone(),
                                    }
                                })?;
                                matrix[[i, offset]] = parsed;
                            }
                        }
                    }
                }
                ColumnEncoder::OneHot { categories, .. } => {
                    let raw: Vec<String> = match column {
                        FeatureColumn::Categorical { values, .. } => values.clone(),
                        FeatureColumn::Numeric { values, .. } => {
                            values.iter().map(|v| v.to_string()).collect()
                        }
                    };
                    for (i, v) in raw.iter().enumerate() {
                        if let Ok(pos) = categories.binary_search(v) {
                            matrix[[i, offset + pos]] = 1.0;
                        }
                        // unknown category: leave the block at zero
                    }
                }
            }
            offset += encoder.width();
        }

        Ok(matrix)
    }

    /// Encode raw string rows, as received when serving a saved pipeline
    pub fn transform_rows(&self, rows: &[Vec<String>]) -> Result<Array2<f64>, TransformError> {
        let mut matrix = Array2::zeros((rows.len(), self.output_dim()));

        for (i, row) in rows.iter().enumerate() {
            if row.len() != self.encoders.len() {
                return Err(TransformError::WrongArity {
                    expected: self.encoders.len(),
                    got: row.len(),
                });
            }

            let mut offset = 0;
            for (encoder, cell) in self.encoders.iter().zip(row) {
                match encoder {
                    ColumnEncoder::Passthrough { name } => {
                        let parsed =
                            cell.trim()
                                .parse()
                                .map_err(|_| TransformError::NotNumeric {
                                    column: name.clone(),
                                    value: cell.clone(),
                                })?;
                        matrix[[i, offset]] = parsed;
                    }
                    ColumnEncoder::OneHot { categories, .. } => {
                        if let Ok(pos) = categories.binary_search(cell) {
                            matrix[[i, offset + pos]] = 1.0;
                        }
                    }
                }
                offset += encoder.width();
            }
        }

        Ok(matrix)
    }
}
