//! F1 scoring of mapped predictions, with `Bad` as the positive class.

use crate::AnswerKey;
use crate::validation::MappedPredictions;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoreError {
    #[error("no valid predictions remain to be scored")]
    EmptyInput,
    #[error("prediction for row {row} has no answer key entry ({len} entries)")]
    IndexOutOfRange { row: usize, len: usize },
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ConfusionCounts {
    pub true_positives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub true_negatives: u64,
}

impl ConfusionCounts {
    /// `2TP / (2TP + FP + FN)`, or zero when that denominator is zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn f1(&self) -> f64 {
        let doubled_tp = 2 * self.true_positives;
        let denominator = doubled_tp + self.false_positives + self.false_negatives;
        if denominator == 0 {
            0.0
        } else {
            doubled_tp as f64 / denominator as f64
        }
    }
}

/// Tally predictions against the answer key entry at each prediction's original row.
///
/// # Errors
/// Returns `IndexOutOfRange` if a prediction points past the end of the key.
pub fn confusion_counts(
    predictions: &MappedPredictions,
    answer_key: &AnswerKey,
) -> Result<ConfusionCounts, ScoreError> {
    let mut counts = ConfusionCounts::default();
    for prediction in predictions.predictions() {
        let truth = answer_key
            .get(prediction.row)
            .ok_or(ScoreError::IndexOutOfRange {
                row: prediction.row,
                len: answer_key.len(),
            })?;
        match (prediction.label.is_positive(), truth.is_positive()) {
            (true, true) => counts.true_positives += 1,
            (true, false) => counts.false_positives += 1,
            (false, true) => counts.false_negatives += 1,
            (false, false) => counts.true_negatives += 1,
        }
    }
    Ok(counts)
}

/// Compute the F1 score of the predictions.
///
/// # Errors
/// Returns `EmptyInput` if every row was dropped during validation.
pub fn score(predictions: &MappedPredictions, answer_key: &AnswerKey) -> Result<f64, ScoreError> {
    if predictions.is_empty() {
        return Err(ScoreError::EmptyInput);
    }
    Ok(confusion_counts(predictions, answer_key)?.f1())
}
