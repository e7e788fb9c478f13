//! A competition instance: one answer key, one submission store, and a
//! short-lived cache in front of the store's read path.

use crate::cache::TtlCache;
use crate::leaderboard::{self, Leaderboard};
use crate::scoring::{self, ScoreError};
use crate::store::{StoreError, SubmissionStore};
use crate::validation::{self, PredictionTable, UnmappableLabelWarning, ValidationError};
use crate::{AnswerKey, NewSubmission, Participant, SubmissionId, SubmissionRecord};
use chrono::{DateTime, Utc};
use log::info;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub submission_id: SubmissionId,
    pub score: f64,
    pub submitted_at: DateTime<Utc>,
    pub warning: Option<UnmappableLabelWarning>,
}

pub struct Competition {
    answer_key: AnswerKey,
    store: Arc<dyn SubmissionStore>,
    submissions: TtlCache<Arc<Vec<SubmissionRecord>>>,
}

impl Competition {
    pub fn new(answer_key: AnswerKey, store: Arc<dyn SubmissionStore>, cache_ttl: Duration) -> Self {
        Self {
            answer_key,
            store,
            submissions: TtlCache::new(cache_ttl),
        }
    }

    #[must_use]
    pub fn answer_key(&self) -> &AnswerKey {
        &self.answer_key
    }

    /// Parse, validate, score and persist an uploaded CSV.
    ///
    /// # Errors
    /// Nothing is written unless the file validates and scores.
    /// A store failure after scoring is returned as-is; the caller resubmits.
    pub fn submit(&self, participant: &Participant, csv: &[u8]) -> Result<SubmitOutcome, SubmitError> {
        let table = PredictionTable::from_csv_bytes(csv)?;
        self.submit_table(participant, &table)
    }

    /// # Errors
    /// See [`Competition::submit`].
    pub fn submit_table(
        &self,
        participant: &Participant,
        table: &PredictionTable,
    ) -> Result<SubmitOutcome, SubmitError> {
        let predictions = validation::validate(table, &self.answer_key)?;
        let score = scoring::score(&predictions, &self.answer_key)?;
        let submitted_at = Utc::now();

        let submission_id = self.store.append(NewSubmission {
            participant_name: participant.name().to_string(),
            model_description: participant.model_description().to_string(),
            score,
            submitted_at,
        })?;
        info!(
            "Accepted submission #{submission_id} from {} with F1 {score:.4}",
            participant.name()
        );

        Ok(SubmitOutcome {
            submission_id,
            score,
            submitted_at,
            warning: predictions.warning(),
        })
    }

    /// All submissions, possibly up to one cache TTL old.
    ///
    /// # Errors
    /// Returns an error if the cache is cold and the store cannot be read.
    pub fn submissions(&self) -> Result<Arc<Vec<SubmissionRecord>>, StoreError> {
        self.submissions
            .get_or_refresh(|| self.store.list_all().map(Arc::new))
    }

    /// # Errors
    /// See [`Competition::submissions`].
    pub fn leaderboard(&self) -> Result<Leaderboard, StoreError> {
        Ok(leaderboard::project(&self.submissions()?))
    }

    /// # Errors
    /// See [`Competition::submissions`].
    pub fn participants(&self) -> Result<Vec<String>, StoreError> {
        Ok(leaderboard::participant_names(&self.submissions()?))
    }
}
