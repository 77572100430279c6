//! Evaluation metrics
//!
//! Produces the [`MetricsReport`] for a run. The metric-name set depends
//! only on the task, never on the model family, so reports from different
//! `model_type` values are directly comparable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Immutable mapping from metric name to scalar value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    values: BTreeMap<String, f64>,
}

impl MetricsReport {
    /// Look up a metric by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Metric names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    /// Number of metrics in the report.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the report holds no metrics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    fn insert(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }
}

/// Evaluate predictions against ground-truth labels.
///
/// Reports `accuracy` and `macro_f1` over `n_classes` classes.
///
/// # Errors
///
/// Returns [`Error::Fit`] if predictions and labels disagree in length or
/// the label set is empty.
pub fn evaluate(predictions: &[u32], labels: &[u32], n_classes: usize) -> Result<MetricsReport> {
    if predictions.len() != labels.len() {
        return Err(Error::Fit(format!(
            "{} predictions for {} labels",
            predictions.len(),
            labels.len()
        )));
    }
    if labels.is_empty() {
        return Err(Error::Fit("cannot evaluate zero samples".to_string()));
    }

    let matrix = confusion_matrix(predictions, labels, n_classes);
    let correct: usize = (0..n_classes).map(|c| matrix[c][c]).sum();

    let mut f1_sum = 0.0;
    for class in 0..n_classes {
        let tp = matrix[class][class] as f64;
        let predicted: usize = (0..n_classes).map(|t| matrix[t][class]).sum();
        let actual: usize = matrix[class].iter().sum();
        // Precision and recall both zero ⇒ class F1 is zero
        let denom = predicted as f64 + actual as f64;
        if denom > 0.0 {
            f1_sum += 2.0 * tp / denom;
        }
    }

    let mut report = MetricsReport::default();
    report.insert("accuracy", correct as f64 / labels.len() as f64);
    report.insert("macro_f1", f1_sum / n_classes as f64);
    Ok(report)
}

/// Confusion matrix indexed `[actual][predicted]`.
///
/// Labels or predictions outside `0..n_classes` are counted in no cell.
#[must_use]
pub fn confusion_matrix(predictions: &[u32], labels: &[u32], n_classes: usize) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0usize; n_classes]; n_classes];
    for (&pred, &label) in predictions.iter().zip(labels.iter()) {
        let (pred, label) = (pred as usize, label as usize);
        if pred < n_classes && label < n_classes {
            matrix[label][pred] += 1;
        }
    }
    matrix
}
