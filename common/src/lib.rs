//! A library with common types and logic for scoring prediction submissions
//! against an answer key and ranking the participants.

pub mod cache;
#[cfg(any(feature = "rustls-tls", feature = "openssl-tls"))]
pub mod client_api;
pub mod competition;
#[cfg(feature = "database")]
pub mod db_util;
pub mod display;
pub mod leaderboard;
pub mod scoring;
pub mod store;
pub mod validation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CLIENT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Cell value mapped to the positive class.
pub const BAD_PAYER_LABEL: &str = "bad payer";
/// Cell value mapped to the negative class.
pub const GOOD_PAYER_LABEL: &str = "good payer";

pub const DEFAULT_COMPETITION: &str = "competition_ml_2025_1";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 5;
pub const DEFAULT_DISPLAY_UTC_OFFSET_HOURS: i32 = -3;
pub const MAX_NAME_CHARS: usize = 50;
pub const MAX_DESCRIPTION_CHARS: usize = 100;

/// Store-assigned identity of a persisted submission.
pub type SubmissionId = u64;

/// A ground-truth or predicted class. `Bad` is the positive class.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Label {
    Good,
    Bad,
}

impl Label {
    #[must_use]
    pub fn is_positive(self) -> bool {
        self == Label::Bad
    }
}

impl TryFrom<u8> for Label {
    type Error = AnswerKeyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::Good),
            1 => Ok(Label::Bad),
            other => Err(AnswerKeyError::InvalidLabel {
                index: 0,
                value: other,
            }),
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        match label {
            Label::Good => 0,
            Label::Bad => 1,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnswerKeyError {
    #[error("the answer key is empty")]
    Empty,
    #[error("answer key entry #{index} is {value}, expected 0 or 1")]
    InvalidLabel { index: usize, value: u8 },
}

/// The fixed ground-truth labels of a competition.
/// Its length is the row count every submission must match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct AnswerKey {
    labels: Vec<Label>,
}

impl AnswerKey {
    /// Build an answer key from raw 0/1 values.
    ///
    /// # Errors
    /// Returns an error if the key is empty or holds anything other than 0 or 1.
    pub fn new(values: &[u8]) -> Result<Self, AnswerKeyError> {
        let labels = values
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                Label::try_from(value).map_err(|_| AnswerKeyError::InvalidLabel { index, value })
            })
            .collect::<Result<Vec<Label>, AnswerKeyError>>()?;
        Self::from_labels(labels)
    }

    /// # Errors
    /// Returns an error if there are no labels.
    pub fn from_labels(labels: Vec<Label>) -> Result<Self, AnswerKeyError> {
        if labels.is_empty() {
            return Err(AnswerKeyError::Empty);
        }
        Ok(Self { labels })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn get(&self, row: usize) -> Option<Label> {
        self.labels.get(row).copied()
    }

    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }
}

impl TryFrom<Vec<u8>> for AnswerKey {
    type Error = AnswerKeyError;

    fn try_from(values: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(&values)
    }
}

impl From<AnswerKey> for Vec<u8> {
    fn from(key: AnswerKey) -> Self {
        key.labels.into_iter().map(u8::from).collect()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParticipantError {
    #[error("the participant name is empty")]
    EmptyName,
    #[error("the participant name is longer than {MAX_NAME_CHARS} characters")]
    NameTooLong,
    #[error("the model description is empty")]
    EmptyDescription,
    #[error("the model description is longer than {MAX_DESCRIPTION_CHARS} characters")]
    DescriptionTooLong,
}

/// Who is submitting and with what model. Both fields are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    name: String,
    model_description: String,
}

impl Participant {
    /// Surrounding whitespace is trimmed before the limits are checked.
    ///
    /// # Errors
    /// Returns an error if either field is blank or over its character limit.
    pub fn new(name: &str, model_description: &str) -> Result<Self, ParticipantError> {
        let name = name.trim();
        let model_description = model_description.trim();
        if name.is_empty() {
            return Err(ParticipantError::EmptyName);
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(ParticipantError::NameTooLong);
        }
        if model_description.is_empty() {
            return Err(ParticipantError::EmptyDescription);
        }
        if model_description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(ParticipantError::DescriptionTooLong);
        }
        Ok(Self {
            name: name.to_string(),
            model_description: model_description.to_string(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn model_description(&self) -> &str {
        &self.model_description
    }
}

/// A scored submission, before the store assigns it an ID.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub participant_name: String,
    pub model_description: String,
    pub score: f64,
    pub submitted_at: DateTime<Utc>,
}

/// A persisted submission. Never mutated after it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub submission_id: SubmissionId,
    pub participant_name: String,
    pub model_description: String,
    pub score: f64,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionRecord {
    #[must_use]
    pub fn from_new(submission_id: SubmissionId, new: NewSubmission) -> Self {
        Self {
            submission_id,
            participant_name: new.participant_name,
            model_description: new.model_description,
            score: new.score,
            submitted_at: new.submitted_at,
        }
    }
}

impl fmt::Display for SubmissionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Submission #{} by {} ({:.4})",
            self.submission_id, self.participant_name, self.score
        )
    }
}

/// Returned to the submitter after an accepted upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub submission_id: SubmissionId,
    pub score: f64,
    pub score_display: String,
    pub submitted_at: DateTime<Utc>,
    pub dropped_rows: Vec<usize>,
    pub warning: Option<String>,
}

/// One line of the submission history table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub submission_id: SubmissionId,
    pub submitted_at: DateTime<Utc>,
    pub submitted_at_display: String,
    pub name: String,
    pub model_description: String,
    pub score: f64,
    pub score_display: String,
}

/// One line of the ranking table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRow {
    pub position: usize,
    pub position_display: String,
    pub name: String,
    pub score: f64,
    pub score_display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub history: Vec<HistoryRow>,
    pub ranking: Vec<RankingRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKeyInfo {
    pub rows: usize,
}
