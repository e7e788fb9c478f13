//! Competition configuration and construction of the shared state at ignite.

use chrono::FixedOffset;
use podium_common::competition::Competition;
use podium_common::db_util::{self, PgSubmissionStore};
use podium_common::display::utc_offset_from_hours;
use podium_common::store::{MemorySubmissionStore, StoreError, SubmissionStore};
use podium_common::{
    AnswerKey, DEFAULT_CACHE_TTL_SECS, DEFAULT_COMPETITION, DEFAULT_DISPLAY_UTC_OFFSET_HOURS,
};
use rocket::serde::Deserialize;
use rocket::{Build, Rocket, fairing};
use std::sync::Arc;
use std::time::Duration;

/// Read from `Rocket.toml` and `ROCKET_*` environment variables.
#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ApiConfig {
    pub answer_key: AnswerKey,
    #[serde(default = "default_competition")]
    pub competition: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_display_utc_offset_hours")]
    pub display_utc_offset_hours: i32,
    #[serde(default)]
    pub database_url: Option<String>,
}

fn default_competition() -> String {
    DEFAULT_COMPETITION.to_string()
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_display_utc_offset_hours() -> i32 {
    DEFAULT_DISPLAY_UTC_OFFSET_HOURS
}

/// Offset that history timestamps are rendered in.
#[derive(Debug, Clone, Copy)]
pub struct DisplayOffset(pub FixedOffset);

/// Postgres when a database URL is configured, otherwise a process-local store.
fn build_store(
    database_url: Option<String>,
    competition: &str,
) -> Result<Arc<dyn SubmissionStore>, StoreError> {
    match database_url.or_else(db_util::get_database_url) {
        Some(url) => {
            let pool = db_util::get_database_pool(&url)?;
            tracing::info!(competition, "Connected to the submission database");
            Ok(Arc::new(PgSubmissionStore::new(pool, competition)))
        }
        None => {
            tracing::warn!(
                "No database configured, submissions are kept in memory and lost on shutdown"
            );
            Ok(Arc::new(MemorySubmissionStore::new()))
        }
    }
}

/// Ignite fairing: a missing or invalid answer key is fatal.
pub async fn attach_competition(rocket: Rocket<Build>) -> fairing::Result {
    let config: ApiConfig = match rocket.figment().extract() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Fatal: could not load the competition configuration (is `answer_key` set?)");
            return Err(rocket);
        }
    };

    let Some(offset) = utc_offset_from_hours(config.display_utc_offset_hours) else {
        tracing::error!(
            hours = config.display_utc_offset_hours,
            "Fatal: display offset must be within ±23 hours"
        );
        return Err(rocket);
    };

    let competition_name = config.competition.clone();
    let database_url = config.database_url.clone();
    let store = match rocket::tokio::task::spawn_blocking(move || {
        build_store(database_url, &competition_name)
    })
    .await
    {
        Ok(Ok(store)) => store,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Fatal: could not open the submission store");
            return Err(rocket);
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal: store setup task failed");
            return Err(rocket);
        }
    };

    tracing::info!(
        competition = %config.competition,
        rows = config.answer_key.len(),
        cache_ttl_secs = config.cache_ttl_secs,
        "Competition loaded"
    );

    let competition = Competition::new(
        config.answer_key,
        store,
        Duration::from_secs(config.cache_ttl_secs),
    );
    Ok(rocket
        .manage(Arc::new(competition))
        .manage(DisplayOffset(offset)))
}
