//! Classification metrics: accuracy, confusion matrix, per-class report

use bci_core::TaskLabel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Fraction of predictions matching ground truth.
pub fn accuracy_score(y_true: &[TaskLabel], y_pred: &[TaskLabel]) -> f32 {
    if y_true.is_empty() {
        return 0.0;
    }
    let hits = y_true
        .iter()
        .zip(y_pred)
        .filter(|(t, p)| t == p)
        .count();
    hits as f32 / y_true.len() as f32
}

/// Confusion matrix over the union of observed labels, rows = truth,
/// columns = prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    labels: Vec<TaskLabel>,
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &[TaskLabel], y_pred: &[TaskLabel]) -> Self {
        let labels: Vec<TaskLabel> = y_true
            .iter()
            .chain(y_pred)
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let index = |label: TaskLabel| labels.iter().position(|&l| l == label).unwrap();
        let mut counts = vec![vec![0usize; labels.len()]; labels.len()];
        for (&truth, &pred) in y_true.iter().zip(y_pred) {
            counts[index(truth)][index(pred)] += 1;
        }

        ConfusionMatrix { labels, counts }
    }

    /// Labels covered by the matrix, in deterministic order
    pub fn labels(&self) -> &[TaskLabel] {
        &self.labels
    }

    /// Count of examples with the given truth predicted as the given label
    pub fn count(&self, truth: TaskLabel, predicted: TaskLabel) -> usize {
        let t = self.labels.iter().position(|&l| l == truth);
        let p = self.labels.iter().position(|&l| l == predicted);
        match (t, p) {
            (Some(t), Some(p)) => self.counts[t][p],
            _ => 0,
        }
    }
}

impl std::fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>12}", "truth\\pred")?;
        for label in &self.labels {
            write!(f, " {:>12}", label.to_string())?;
        }
        writeln!(f)?;
        for (row_label, row) in self.labels.iter().zip(&self.counts) {
            write!(f, "{:>12}", row_label.to_string())?;
            for count in row {
                write!(f, " {:>12}", count)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Precision, recall, F1 and support for one class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: TaskLabel,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub support: usize,
}

/// Full per-class report computed from a confusion matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassReport {
    pub classes: Vec<ClassMetrics>,
}

impl ClassReport {
    pub fn from_predictions(y_true: &[TaskLabel], y_pred: &[TaskLabel]) -> Self {
        let matrix = ConfusionMatrix::from_predictions(y_true, y_pred);
        let classes = matrix
            .labels
            .iter()
            .map(|&label| {
                let tp = matrix.count(label, label);
                let predicted: usize = matrix
                    .labels
                    .iter()
                    .map(|&truth| matrix.count(truth, label))
                    .sum();
                let support: usize = matrix
                    .labels
                    .iter()
                    .map(|&pred| matrix.count(label, pred))
                    .sum();

                let precision = if predicted > 0 {
                    tp as f32 / predicted as f32
                } else {
                    0.0
                };
                let recall = if support > 0 {
                    tp as f32 / support as f32
                } else {
                    0.0
                };
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };

                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        ClassReport { classes }
    }
}

impl std::fmt::Display for ClassReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10} {:>10}",
            "class", "precision", "recall", "f1", "support"
        )?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>12} {:>10.3} {:>10.3} {:>10.3} {:>10}",
                c.label.to_string(),
                c.precision,
                c.recall,
                c.f1,
                c.support
            )?;
        }
        Ok(())
    }
}
