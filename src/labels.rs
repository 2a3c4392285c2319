//! String label to integer code mapping.
//!
//! Classifiers expect integer labels; a [`LabelMap`] assigns each distinct
//! string the index at which it was first seen.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// Ordered set of distinct labels. A label's position is its integer code.
///
/// Labels are never reordered or removed, so codes stay stable for the
/// lifetime of the map. Lookups go through a hash index kept alongside the
/// ordered list.
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Code for `label`, appending it first if it has not been seen yet
    pub fn insert(&mut self, label: &str) -> usize {
        if let Some(&code) = self.index.get(label) {
            return code;
        }
        let code = self.labels.len();
        self.labels.push(label.to_string());
        self.index.insert(label.to_string(), code);
        code
    }

    pub fn code_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn label_of(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    /// Translate codes back to labels. Unknown codes yield `None`.
    pub fn decode(&self, codes: &[usize]) -> Vec<Option<&str>> {
        codes.iter().map(|&code| self.label_of(code)).collect()
    }

    /// Number of occurrences of each code, indexed by code
    pub fn counts(&self, codes: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.labels.len()];
        for &code in codes {
            if let Some(count) = counts.get_mut(code) {
                *count += 1;
            }
        }
        counts
    }
}

impl PartialEq for LabelMap {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl Eq for LabelMap {}

impl<S: AsRef<str>> FromIterator<S> for LabelMap {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut map = LabelMap::new();
        for label in iter {
            map.insert(label.as_ref());
        }
        map
    }
}

impl PartialEq<[&str]> for LabelMap {
    fn eq(&self, other: &[&str]) -> bool {
        self.labels.len() == other.len() && self.labels.iter().zip(other).all(|(a, b)| a == b)
    }
}

impl<const N: usize> PartialEq<[&str; N]> for LabelMap {
    fn eq(&self, other: &[&str; N]) -> bool {
        *self == other[..]
    }
}

// Serialized as a plain list of labels; the index is rebuilt on load
impl Serialize for LabelMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.labels.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LabelMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let labels = Vec::<String>::deserialize(deserializer)?;
        Ok(labels.into_iter().collect())
    }
}

/// Map string labels to integer codes.
///
/// Returns one code per input label together with the label map, whose
/// entries appear in first-occurrence order. Labels are compared exactly,
/// without any case folding or trimming.
pub fn map_labels_to_int<S: AsRef<str>>(labels: &[S]) -> (Vec<usize>, LabelMap) {
    let mut label_map = LabelMap::new();
    let codes = labels
        .iter()
        .map(|label| label_map.insert(label.as_ref()))
        .collect();
    (codes, label_map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_labels_first_occurrence_order() {
        let (codes, label_map) = map_labels_to_int(&["dog", "cat", "dog", "bird", "cat"]);

        assert_eq!(codes, vec![0, 1, 0, 2, 1]);
        assert_eq!(label_map, ["dog", "cat", "bird"]);
    }

    #[test]
    fn test_codes_point_back_to_labels() {
        let labels = vec!["a", "b", "a", "c", "c", "b", "d", "a"];
        let (codes, label_map) = map_labels_to_int(&labels);

        assert_eq!(codes.len(), labels.len());
        for (code, label) in codes.iter().zip(&labels) {
            assert_eq!(label_map.label_of(*code), Some(*label));
        }
        assert_eq!(label_map.len(), 4);
    }

    #[test]
    fn test_map_labels_idempotent() {
        let labels: Vec<String> = ["x", "y", "x", "z"].iter().map(|s| s.to_string()).collect();
        let first = map_labels_to_int(&labels);
        let second = map_labels_to_int(&labels);
        assert_eq!(first, second);
    }

    #[test]
    fn test_map_labels_exact_match() {
        let (codes, label_map) = map_labels_to_int(&["Cat", "cat", " cat", "cat"]);
        assert_eq!(codes, vec![0, 1, 2, 1]);
        assert_eq!(label_map.len(), 3);
    }

    #[test]
    fn test_map_labels_empty() {
        let (codes, label_map) = map_labels_to_int::<&str>(&[]);
        assert!(codes.is_empty());
        assert!(label_map.is_empty());
    }

    #[test]
    fn test_decode_and_counts() {
        let (codes, label_map) = map_labels_to_int(&["cat", "dog", "cat"]);

        assert_eq!(label_map.decode(&[1, 0, 7]), vec![Some("dog"), Some("cat"), None]);
        assert_eq!(label_map.counts(&codes), vec![2, 1]);
        assert_eq!(label_map.code_of("dog"), Some(1));
        assert_eq!(label_map.code_of("fish"), None);
    }

    #[test]
    fn test_label_map_serde() {
        let label_map: LabelMap = ["cat", "dog"].into_iter().collect();
        let json = serde_json::to_string(&label_map).unwrap();
        assert_eq!(json, r#"["cat","dog"]"#);

        let restored: LabelMap = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, label_map);
        assert_eq!(restored.code_of("dog"), Some(1));
    }
}
