//! Dataset ingestion: file-format dispatch, parsing, and the train/test split

use crate::types::dataset::{Dataset, FeatureColumn};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors raised while turning an uploaded file into a dataset
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to parse dataset: {0}")]
    Parse(#[from] csv::Error),
    #[error("dataset has no data rows")]
    Empty,
    #[error("dataset needs at least one feature column and one target column")]
    TooFewColumns,
    #[error("dataset needs at least {needed} rows to split, got {got}")]
    TooFewRows { needed: usize, got: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Load a tabular file into a [`Dataset`].
///
/// The extension selects the parser: `.csv` and `.tsv` are supported,
/// anything else is [`DatasetError::UnsupportedFormat`]. The first row is the
/// header and the last column is the label.
pub fn load_dataset(path: &Path) -> Result<Dataset, DatasetError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let delimiter = match extension.as_str() {
        "csv" => b',',
        "tsv" => b'\t',
        other => return Err(DatasetError::UnsupportedFormat(other.to_string())),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.len() < 2 {
        return Err(DatasetError::TooFewColumns);
    }

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }
    if rows.is_empty() {
        return Err(DatasetError::Empty);
    }
    if rows.len() < 2 {
        return Err(DatasetError::TooFewRows {
            needed: 2,
            got: rows.len(),
        });
    }

    let n_features = headers.len() - 1;
    let mut features = Vec::with_capacity(n_features);
    for (j, name) in headers.iter().take(n_features).enumerate() {
        let raw: Vec<&str> = rows.iter().map(|r| r[j].as_str()).collect();
        features.push(infer_column(name, &raw));
    }

    let target: Vec<String> = rows.iter().map(|r| r[n_features].clone()).collect();

    let dataset = Dataset {
        features,
        target_name: headers[n_features].clone(),
        target,
    };

    debug!(
        rows = dataset.n_rows(),
        features = dataset.n_features(),
        target = %dataset.target_name,
        "Dataset loaded"
    );

    Ok(dataset)
}

/// A column is numeric only when every cell parses as a number. Empty cells
/// fail the parse, so columns with missing values fall back to categorical
/// and the empty string becomes an ordinary category.
fn infer_column(name: &str, raw: &[&str]) -> FeatureColumn {
    let parsed: Vec<Option<f64>> = raw.iter().map(|v| v.trim().parse().ok()).collect();

    if parsed.iter().all(|p| p.is_some()) {
        FeatureColumn::Numeric {
            name: name.to_string(),
            values: parsed.into_iter().map(|p| p.unwrap_or(0.0)).collect(),
        }
    } else {
        FeatureColumn::Categorical {
            name: name.to_string(),
            values: raw.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Split row indices into train and test sets.
///
/// The shuffle is seeded, so the same dataset, ratio, and seed always yield
/// the same split. At least one row lands on each side.
pub fn train_test_split(
    n_rows: usize,
    test_ratio: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), DatasetError> {
    if n_rows < 2 {
        return Err(DatasetError::TooFewRows {
            needed: 2,
            got: n_rows,
        });
    }

    let n_test = ((n_rows as f64) * test_ratio).round() as usize;
    let n_test = n_test.clamp(1, n_rows - 1);

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut test: Vec<usize> = indices[..n_test].to_vec();
    let mut train: Vec<usize> = indices[n_test..].to_vec();
    train.sort_unstable();
    test.sort_unstable();

    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_unsupported_extension() {
        let (_dir, path) = write_temp("data.xlsx", "a,b\n1,2\n3,4\n");
        let err = load_dataset(&path).unwrap_err();
        assert!(matches!(err, DatasetError::UnsupportedFormat(ref e) if e == "xlsx"));
    }

    #[test]
    fn test_load_csv_with_type_inference() {
        let (_dir, path) = write_temp(
            "data.csv",
            "age,city,label\n25,oslo,no\n40,lima,yes\n31,oslo,no\n",
        );
        let ds = load_dataset(&path).unwrap();

        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.n_features(), 2);
        assert_eq!(ds.target_name, "label");
        assert!(matches!(ds.features[0], FeatureColumn::Numeric { .. }));
        assert!(matches!(ds.features[1], FeatureColumn::Categorical { .. }));
    }

    #[test]
    fn test_load_tsv() {
        let (_dir, path) = write_temp("data.tsv", "a\tlabel\n1\tx\n2\ty\n");
        let ds = load_dataset(&path).unwrap();
        assert_eq!(ds.n_rows(), 2);
        assert!(matches!(ds.features[0], FeatureColumn::Numeric { .. }));
    }

    #[test]
    fn test_missing_values_make_column_categorical() {
        let (_dir, path) = write_temp("data.csv", "a,label\n1,x\n,y\n3,x\n");
        let ds = load_dataset(&path).unwrap();
        assert!(matches!(ds.features[0], FeatureColumn::Categorical { .. }));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let (_dir, path) = write_temp("data.csv", "a,b,label\n1,2,x\n1,y\n");
        let err = load_dataset(&path).unwrap_err();
        assert!(matches!(err, DatasetError::Parse(_)));
    }

    #[test]
    fn test_single_column_rejected() {
        let (_dir, path) = write_temp("data.csv", "label\nx\ny\n");
        let err = load_dataset(&path).unwrap_err();
        assert!(matches!(err, DatasetError::TooFewColumns));
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let (_dir, path) = write_temp("data.csv", "a,label\n");
        let err = load_dataset(&path).unwrap_err();
        assert!(matches!(err, DatasetError::Empty));
    }

    #[test]
    fn test_split_sizes_and_disjointness() {
        let (train, test) = train_test_split(10, 0.2, 42).unwrap();
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 8);

        for i in &test {
            assert!(!train.contains(i));
        }
        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_deterministic_per_seed() {
        let a = train_test_split(50, 0.2, 42).unwrap();
        let b = train_test_split(50, 0.2, 42).unwrap();
        assert_eq!(a, b);

        let c = train_test_split(50, 0.2, 7).unwrap();
        assert_ne!(a.1, c.1);
    }

    #[test]
    fn test_split_always_leaves_both_sides_nonempty() {
        let (train, test) = train_test_split(2, 0.0, 42).unwrap();
        assert_eq!(train.len(), 1);
        assert_eq!(test.len(), 1);

        let (train, test) = train_test_split(3, 0.99, 42).unwrap();
        assert_eq!(train.len(), 1);
        assert_eq!(test.len(), 2);
    }

    #[test]
    fn test_split_too_few_rows() {
        assert!(matches!(
            train_test_split(1, 0.2, 42),
            Err(DatasetError::TooFewRows { .. })
        ));
    }
}
