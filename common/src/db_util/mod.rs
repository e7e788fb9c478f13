//! Interfaces between the application code and database.

mod conversions;
mod submissions;

pub use submissions::*;

use crate::store::{StoreError, SubmissionStore};
use crate::{NewSubmission, SubmissionId, SubmissionRecord};
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use std::env;
use std::time::Duration;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

const POOL_MAX_SIZE: u32 = 8;
const POOL_CONNECTION_TIMEOUT_SECS: u64 = 10;

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for StoreError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Read `DATABASE_URL` from the environment, loading `.env` first if present.
#[must_use]
pub fn get_database_url() -> Option<String> {
    dotenvy::dotenv().ok();
    env::var("DATABASE_URL").ok()
}

/// Build a connection pool. Fails if no connection can be opened.
///
/// # Errors
/// Returns `StoreError::Unavailable` if the database cannot be reached.
pub fn get_database_pool(database_url: &str) -> Result<PgPool, StoreError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Ok(Pool::builder()
        .max_size(POOL_MAX_SIZE)
        .connection_timeout(Duration::from_secs(POOL_CONNECTION_TIMEOUT_SECS))
        .build(manager)?)
}

/// # Errors
/// Returns `StoreError::Unavailable` if no connection frees up before the timeout.
pub fn get_pooled_database_connection(pool: &PgPool) -> Result<PgPooledConnection, StoreError> {
    Ok(pool.get()?)
}

/// Submissions of one competition, persisted in Postgres.
/// Several competitions can share a database; each sees only its own rows.
#[derive(Clone)]
pub struct PgSubmissionStore {
    pool: PgPool,
    competition: String,
}

impl PgSubmissionStore {
    pub fn new(pool: PgPool, competition: impl Into<String>) -> Self {
        Self {
            pool,
            competition: competition.into(),
        }
    }

    #[must_use]
    pub fn competition(&self) -> &str {
        &self.competition
    }
}

impl SubmissionStore for PgSubmissionStore {
    fn append(&self, submission: NewSubmission) -> Result<SubmissionId, StoreError> {
        let mut conn = get_pooled_database_connection(&self.pool)?;
        let record = insert_submission(&mut conn, &self.competition, submission)?;
        Ok(record.submission_id)
    }

    fn list_all(&self) -> Result<Vec<SubmissionRecord>, StoreError> {
        let mut conn = get_pooled_database_connection(&self.pool)?;
        get_submissions_by_competition(&mut conn, &self.competition)
    }
}
