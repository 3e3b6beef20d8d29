//! Shapes of the persisted documents

use serde::{Deserialize, Serialize};
use serde_with::{TimestampMilliSeconds, serde_as};
use web_time::SystemTime;

use crate::{
    evaluation::{log::EvaluationLog, setup::EvaluationSetup, summary::SummaryRow},
    quiz::{config::Quiz, scoring::ParticipantResult},
    room_code::RoomCode,
    roster::SlotId,
};

/// A host's saved quiz
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizDocument {
    /// Host display name
    pub host_name: String,
    /// The quiz definition
    pub quiz: Quiz,
    /// When the quiz was saved
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub saved_at: SystemTime,
}

/// One entry of a score snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Display name, used to match returning groups
    pub name: String,
    /// Cumulative score
    pub score: f64,
    /// Slot the score belonged to
    pub slot: SlotId,
}

/// The scores of the first groups in a room, in slot order
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    /// Host display name
    pub host_name: String,
    /// Room the scores were taken from
    pub room_code: RoomCode,
    /// Group scores
    pub scores: Vec<ScoreEntry>,
    /// When the snapshot was taken
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub saved_at: SystemTime,
}

impl ScoreSnapshot {
    /// Saved score for a display name
    pub fn score_of(&self, name: &str) -> Option<f64> {
        self.scores.iter().find(|s| s.name == name).map(|s| s.score)
    }
}

/// A host's saved evaluation setup
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupDocument {
    /// The criteria
    pub setup: EvaluationSetup,
    /// When the setup was saved
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub saved_at: SystemTime,
}

/// The evaluation log of a room's current round
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogDocument {
    /// Room the log belongs to
    pub room_code: RoomCode,
    /// Round number within the room
    pub round: u32,
    /// The ratings
    pub log: EvaluationLog,
    /// When the log was saved
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub saved_at: SystemTime,
}

/// Per-question answer detail of a quiz run
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizDetailDocument {
    /// Room the quiz ran in
    pub room_code: RoomCode,
    /// Results sorted by score
    pub results: Vec<ParticipantResult>,
    /// When the run ended
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub saved_at: SystemTime,
}

/// Summary of a completed evaluation round
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsDocument {
    /// Room the round ran in
    pub room_code: RoomCode,
    /// Round number within the room
    pub round: u32,
    /// One row per group
    pub rows: Vec<SummaryRow>,
    /// The ratings the rows were derived from
    pub log: EvaluationLog,
    /// When the round completed
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub saved_at: SystemTime,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_score_snapshot_lookup_and_shape() {
        let snapshot = ScoreSnapshot {
            host_name: "Teacher1".to_owned(),
            room_code: RoomCode::from_str("ABC123").unwrap(),
            scores: vec![ScoreEntry {
                name: "Group 1 - Falcons".to_owned(),
                score: 45.,
                slot: SlotId::new(1),
            }],
            saved_at: web_time::UNIX_EPOCH,
        };

        assert_eq!(snapshot.score_of("Group 1 - Falcons"), Some(45.));
        assert_eq!(snapshot.score_of("Group 2 - Owls"), None);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["room_code"], "ABC123");
        assert_eq!(json["saved_at"], 0);
        assert_eq!(json["scores"][0]["slot"], 1);

        let back: ScoreSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
