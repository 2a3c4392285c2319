//! Labeled dataset records and their split into data and integer labels.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::labels::{map_labels_to_int, LabelMap};
use crate::roi::Roi;
use crate::roi_store::RoiStore;

/// One annotated image: where it lives, where the object is and what it is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledRecord {
    pub path: String,
    pub roi: Roi,
    pub label: String,
}

impl LabeledRecord {
    pub fn new(path: impl Into<String>, roi: impl Into<Roi>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            roi: roi.into(),
            label: label.into(),
        }
    }
}

impl<P, R, L> From<(P, R, L)> for LabeledRecord
where
    P: Into<String>,
    R: Into<Roi>,
    L: Into<String>,
{
    fn from((path, roi, label): (P, R, L)) -> Self {
        LabeledRecord::new(path, roi, label)
    }
}

/// Image handle without its label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEntry {
    pub path: String,
    pub roi: Roi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitData {
    pub data: Vec<DataEntry>,
    pub labels: Vec<usize>,
    pub label_map: LabelMap,
}

/// Split records into `(path, roi)` entries, integer labels and the label map.
///
/// Order is preserved: `data[i]` and `labels[i]` both come from `records[i]`.
/// Paths and ROIs are passed through untouched; nothing is loaded from disk.
pub fn split_data_labels(records: &[LabeledRecord]) -> SplitData {
    let data = records
        .iter()
        .map(|record| DataEntry {
            path: record.path.clone(),
            roi: record.roi,
        })
        .collect();
    let str_labels: Vec<&str> = records.iter().map(|record| record.label.as_str()).collect();
    let (labels, label_map) = map_labels_to_int(&str_labels);

    SplitData {
        data,
        labels,
        label_map,
    }
}

/// Read records from a JSON file: `[{"path": ..., "roi": [x, y, w, h], "label": ...}]`
pub fn load_records(path: &Path) -> Result<Vec<LabeledRecord>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file: {}", path.display()))?;

    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse records file: {}", path.display()))
}

/// Build records by joining stored ROIs with a path -> label lookup.
///
/// Returns the records in store order and the paths that had no label.
pub fn attach_labels(
    store: &RoiStore,
    labels: &HashMap<String, String>,
) -> (Vec<LabeledRecord>, Vec<String>) {
    let mut records = Vec::with_capacity(store.len());
    let mut unlabeled = Vec::new();

    for (path, roi) in store.iter() {
        match labels.get(path) {
            Some(label) => records.push(LabeledRecord::new(path.as_str(), *roi, label.as_str())),
            None => unlabeled.push(path.clone()),
        }
    }

    (records, unlabeled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_records() -> Vec<LabeledRecord> {
        vec![
            LabeledRecord::new("a.png", Roi::new(0, 0, 5, 5), "cat"),
            LabeledRecord::new("b.png", Roi::new(1, 1, 3, 3), "dog"),
            ("c.png", Roi::new(2, 2, 4, 4), "cat").into(),
        ]
    }

    #[test]
    fn test_split_data_labels() {
        let split = split_data_labels(&sample_records());

        assert_eq!(
            split.data,
            vec![
                DataEntry { path: "a.png".into(), roi: Roi::new(0, 0, 5, 5) },
                DataEntry { path: "b.png".into(), roi: Roi::new(1, 1, 3, 3) },
                DataEntry { path: "c.png".into(), roi: Roi::new(2, 2, 4, 4) },
            ]
        );
        assert_eq!(split.labels, vec![0, 1, 0]);
        assert_eq!(split.label_map, ["cat", "dog"]);
    }

    #[test]
    fn test_split_empty() {
        let split = split_data_labels(&[]);
        assert!(split.data.is_empty());
        assert!(split.labels.is_empty());
        assert!(split.label_map.is_empty());
    }

    #[test]
    fn test_load_records() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"path": "a.png", "roi": [0, 0, 5, 5], "label": "cat"}},
                {{"path": "b.png", "roi": [1, 1, 3, 3], "label": "dog"}}
            ]"#
        )
        .unwrap();

        let records = load_records(file.path()).unwrap();
        assert_eq!(records, sample_records()[..2].to_vec());
    }

    #[test]
    fn test_load_records_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"path": "a.png", "roi": [0, 0, 5], "label": "cat"}}]"#).unwrap();
        assert!(load_records(file.path()).is_err());
    }

    #[test]
    fn test_attach_labels() {
        let mut store = RoiStore::new();
        store.insert("b.png", Roi::new(1, 1, 3, 3));
        store.insert("a.png", Roi::new(0, 0, 5, 5));
        store.insert("z.png", Roi::new(9, 9, 9, 9));

        let labels: HashMap<String, String> = [("a.png", "cat"), ("b.png", "dog")]
            .into_iter()
            .map(|(p, l)| (p.to_string(), l.to_string()))
            .collect();

        let (records, unlabeled) = attach_labels(&store, &labels);
        assert_eq!(records, sample_records()[..2].to_vec());
        assert_eq!(unlabeled, vec!["z.png".to_string()]);
    }
}
