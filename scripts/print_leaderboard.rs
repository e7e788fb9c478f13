#!/usr/bin/env rust-script
//! ```cargo
//! [dependencies]
//! podium_common = { path = "../common", features = ["database"] }
//! ```

use podium_common::display::{format_position, format_score, format_timestamp, utc_offset_from_hours};
use podium_common::leaderboard::project;
use podium_common::{db_util, DEFAULT_DISPLAY_UTC_OFFSET_HOURS};

fn main() {
    // get db connection
    let url = db_util::get_database_url().expect("DATABASE_URL is not set");
    let pool = db_util::get_database_pool(&url).unwrap();
    let mut conn = db_util::get_pooled_database_connection(&pool).unwrap();
    let offset = utc_offset_from_hours(DEFAULT_DISPLAY_UTC_OFFSET_HOURS).unwrap();

    // every competition that has at least one submission
    let competitions = db_util::get_competitions(&mut conn).unwrap();

    for competition in competitions {
        let submissions = db_util::get_submissions_by_competition(&mut conn, &competition).unwrap();
        let board = project(&submissions);
        let latest = board
            .history
            .first()
            .map(|s| format_timestamp(s.submitted_at, offset))
            .unwrap_or_default();
        println!(
            "{competition}: {} submissions from {} participants, latest {latest}",
            board.history.len(),
            board.ranking.len()
        );
        for entry in &board.ranking {
            println!(
                "  {:<6} {:<24} {}",
                format_position(entry.position, entry.medal),
                entry.best.participant_name,
                format_score(entry.best.score)
            );
        }
    }
}
