//! Presentation of leaderboard tables: local send time, four-decimal scores
//! and decorated positions.

use crate::competition::SubmitOutcome;
use crate::leaderboard::{Leaderboard, Medal, RankingEntry};
use crate::{HistoryRow, LeaderboardResponse, RankingRow, SubmissionRecord, SubmitReceipt};
use chrono::{DateTime, FixedOffset, Utc};

pub const TIMESTAMP_FORMAT: &str = "%d/%m/%y - %H:%M";

/// `None` if the offset is outside ±23 hours.
#[must_use]
pub fn utc_offset_from_hours(hours: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(hours.checked_mul(3600)?)
}

#[must_use]
pub fn format_timestamp(timestamp: DateTime<Utc>, offset: FixedOffset) -> String {
    timestamp
        .with_timezone(&offset)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

#[must_use]
pub fn format_score(score: f64) -> String {
    format!("{score:.4}")
}

/// `"1º 🥇"` for medal positions, `"4º"` otherwise.
#[must_use]
pub fn format_position(position: usize, medal: Option<Medal>) -> String {
    match medal {
        Some(medal) => format!("{position}º {}", medal.emoji()),
        None => format!("{position}º"),
    }
}

impl SubmitReceipt {
    #[must_use]
    pub fn from_outcome(outcome: &SubmitOutcome) -> Self {
        Self {
            submission_id: outcome.submission_id,
            score: outcome.score,
            score_display: format_score(outcome.score),
            submitted_at: outcome.submitted_at,
            dropped_rows: outcome
                .warning
                .as_ref()
                .map(|warning| warning.dropped_rows.clone())
                .unwrap_or_default(),
            warning: outcome.warning.as_ref().map(ToString::to_string),
        }
    }
}

impl HistoryRow {
    #[must_use]
    pub fn render(record: &SubmissionRecord, offset: FixedOffset) -> Self {
        Self {
            submission_id: record.submission_id,
            submitted_at: record.submitted_at,
            submitted_at_display: format_timestamp(record.submitted_at, offset),
            name: record.participant_name.clone(),
            model_description: record.model_description.clone(),
            score: record.score,
            score_display: format_score(record.score),
        }
    }
}

impl RankingRow {
    #[must_use]
    pub fn render(entry: &RankingEntry) -> Self {
        Self {
            position: entry.position,
            position_display: format_position(entry.position, entry.medal),
            name: entry.best.participant_name.clone(),
            score: entry.best.score,
            score_display: format_score(entry.best.score),
        }
    }
}

impl LeaderboardResponse {
    #[must_use]
    pub fn render(board: &Leaderboard, offset: FixedOffset) -> Self {
        Self {
            history: board
                .history
                .iter()
                .map(|record| HistoryRow::render(record, offset))
                .collect(),
            ranking: board.ranking.iter().map(RankingRow::render).collect(),
        }
    }
}
