//! Project the submission log into a chronological history and a
//! best-score-per-participant ranking.

use crate::SubmissionRecord;
use itertools::Itertools;
use std::cmp::Ordering;

/// Decoration for the top three positions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Medal {
    Gold,
    Silver,
    Bronze,
}

impl Medal {
    #[must_use]
    pub fn for_position(position: usize) -> Option<Medal> {
        match position {
            1 => Some(Medal::Gold),
            2 => Some(Medal::Silver),
            3 => Some(Medal::Bronze),
            _ => None,
        }
    }

    #[must_use]
    pub fn emoji(self) -> &'static str {
        match self {
            Medal::Gold => "🥇",
            Medal::Silver => "🥈",
            Medal::Bronze => "🥉",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingEntry {
    /// 1-based.
    pub position: usize,
    pub medal: Option<Medal>,
    /// The participant's best submission.
    pub best: SubmissionRecord,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Leaderboard {
    pub history: Vec<SubmissionRecord>,
    pub ranking: Vec<RankingEntry>,
}

impl Leaderboard {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Newest first. Equal timestamps fall back to the higher ID first.
fn history_order(a: &SubmissionRecord, b: &SubmissionRecord) -> Ordering {
    b.submitted_at
        .cmp(&a.submitted_at)
        .then_with(|| b.submission_id.cmp(&a.submission_id))
}

/// Higher score first. Equal scores go to the earlier submission, then the
/// name, then the lower ID, so the order never depends on store iteration.
fn ranking_order(a: &SubmissionRecord, b: &SubmissionRecord) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.submitted_at.cmp(&b.submitted_at))
        .then_with(|| a.participant_name.cmp(&b.participant_name))
        .then_with(|| a.submission_id.cmp(&b.submission_id))
}

#[must_use]
pub fn history(submissions: &[SubmissionRecord]) -> Vec<SubmissionRecord> {
    submissions.iter().cloned().sorted_by(history_order).collect()
}

/// The best submission of each participant, best participant first.
#[must_use]
pub fn best_per_participant(submissions: &[SubmissionRecord]) -> Vec<SubmissionRecord> {
    submissions
        .iter()
        .into_group_map_by(|sub| sub.participant_name.as_str())
        .into_values()
        .filter_map(|group| group.into_iter().min_by(|a, b| ranking_order(a, b)))
        .cloned()
        .sorted_by(ranking_order)
        .collect()
}

#[must_use]
pub fn ranking(submissions: &[SubmissionRecord]) -> Vec<RankingEntry> {
    best_per_participant(submissions)
        .into_iter()
        .enumerate()
        .map(|(index, best)| RankingEntry {
            position: index + 1,
            medal: Medal::for_position(index + 1),
            best,
        })
        .collect()
}

#[must_use]
pub fn project(submissions: &[SubmissionRecord]) -> Leaderboard {
    Leaderboard {
        history: history(submissions),
        ranking: ranking(submissions),
    }
}

/// Distinct participant names in alphabetical order.
#[must_use]
pub fn participant_names(submissions: &[SubmissionRecord]) -> Vec<String> {
    submissions
        .iter()
        .map(|sub| sub.participant_name.clone())
        .sorted()
        .dedup()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 14, minute, 0).unwrap()
    }

    fn create_test_submission(
        submission_id: u64,
        name: &str,
        score: f64,
        submitted_at: DateTime<Utc>,
    ) -> SubmissionRecord {
        SubmissionRecord {
            submission_id,
            participant_name: name.to_string(),
            model_description: format!("model {submission_id}"),
            score,
            submitted_at,
        }
    }

    fn ranked_names(board: &Leaderboard) -> Vec<(&str, f64)> {
        board
            .ranking
            .iter()
            .map(|entry| (entry.best.participant_name.as_str(), entry.best.score))
            .collect()
    }

    #[test_log::test]
    fn test_best_score_per_participant() {
        let submissions = vec![
            create_test_submission(1, "A", 0.80, at(0)),
            create_test_submission(2, "A", 0.90, at(1)),
            create_test_submission(3, "B", 0.85, at(2)),
        ];

        let board = project(&submissions);

        assert_eq!(ranked_names(&board), vec![("A", 0.90), ("B", 0.85)]);
        assert_eq!(board.ranking[0].position, 1);
        assert_eq!(board.ranking[0].medal, Some(Medal::Gold));
        assert_eq!(board.ranking[1].position, 2);
        assert_eq!(board.ranking[1].medal, Some(Medal::Silver));
        assert_eq!(board.history.len(), 3);
    }

    #[test_log::test]
    fn test_history_newest_first() {
        let submissions = vec![
            create_test_submission(1, "A", 0.1, at(1)),
            create_test_submission(2, "B", 0.2, at(3)),
            create_test_submission(3, "C", 0.3, at(2)),
        ];

        let order: Vec<_> = history(&submissions)
            .iter()
            .map(|sub| sub.submitted_at)
            .collect();

        assert_eq!(order, vec![at(3), at(2), at(1)]);
    }

    #[test_log::test]
    fn test_only_top_three_get_medals() {
        let submissions: Vec<_> = (0..5u32)
            .map(|i| {
                create_test_submission(
                    u64::from(i) + 1,
                    &format!("team {i}"),
                    f64::from(i) / 10.0,
                    at(i),
                )
            })
            .collect();

        let board = project(&submissions);

        let medals: Vec<_> = board.ranking.iter().map(|entry| entry.medal).collect();
        assert_eq!(
            medals,
            vec![
                Some(Medal::Gold),
                Some(Medal::Silver),
                Some(Medal::Bronze),
                None,
                None
            ]
        );
        let positions: Vec<_> = board.ranking.iter().map(|entry| entry.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
        assert_eq!(board.ranking[0].best.participant_name, "team 4");
    }

    #[test_log::test]
    fn test_equal_best_scores_prefer_earliest_submission() {
        let submissions = vec![
            create_test_submission(7, "A", 0.75, at(9)),
            create_test_submission(3, "A", 0.75, at(4)),
            create_test_submission(5, "B", 0.75, at(5)),
            create_test_submission(6, "C", 0.75, at(4)),
        ];

        let best = best_per_participant(&submissions);

        // A's earlier 0.75 is kept; A and C tie on time and fall back to the name
        let summary: Vec<_> = best
            .iter()
            .map(|sub| (sub.participant_name.as_str(), sub.submission_id))
            .collect();
        assert_eq!(summary, vec![("A", 3), ("C", 6), ("B", 5)]);
    }

    #[test_log::test]
    fn test_empty_log_projects_empty_board() {
        let board = project(&[]);
        assert!(board.is_empty());
        assert!(board.ranking.is_empty());
    }

    #[test_log::test]
    fn test_participant_names_sorted_and_unique() {
        let submissions = vec![
            create_test_submission(1, "zeta", 0.1, at(0)),
            create_test_submission(2, "alpha", 0.2, at(1)),
            create_test_submission(3, "zeta", 0.3, at(2)),
        ];
        assert_eq!(participant_names(&submissions), vec!["alpha", "zeta"]);
    }
}
