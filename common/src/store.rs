//! The submission repository: an append-only log of scored submissions.
//!
//! The Postgres-backed implementation lives in [`crate::db_util`]. The
//! in-memory one here backs tests and local runs without a database.

use crate::{NewSubmission, SubmissionId, SubmissionRecord};
use log::debug;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("the submission store is unavailable: {0}")]
    Unavailable(String),
    #[error("the submission store rejected the query: {0}")]
    Query(String),
    #[error("could not convert a stored record: {0}")]
    Conversion(String),
}

pub trait SubmissionStore: Send + Sync {
    /// Persist a submission and return the ID the store assigned to it.
    ///
    /// # Errors
    /// Returns an error if the store could not be reached or refused the write.
    fn append(&self, submission: NewSubmission) -> Result<SubmissionId, StoreError>;

    /// Every submission of the competition, in no particular order.
    ///
    /// # Errors
    /// Returns an error if the store could not be reached or a record is invalid.
    fn list_all(&self) -> Result<Vec<SubmissionRecord>, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemorySubmissionStore {
    records: Mutex<Vec<SubmissionRecord>>,
}

impl MemorySubmissionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubmissionStore for MemorySubmissionStore {
    fn append(&self, submission: NewSubmission) -> Result<SubmissionId, StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        let submission_id = records.len() as SubmissionId + 1;
        records.push(SubmissionRecord::from_new(submission_id, submission));
        debug!("Stored submission #{submission_id} in memory");
        Ok(submission_id)
    }

    fn list_all(&self) -> Result<Vec<SubmissionRecord>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(records.clone())
    }
}
