//! Ranked quiz scoring
//!
//! For every question the correct answers from scorable participants are
//! ordered by arrival and awarded points by rank from
//! [`RANK_POINTS`](crate::constants::quiz::RANK_POINTS). Anything past the
//! last rank, wrong, or missing earns nothing.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{TimestampMilliSeconds, serde_as};
use web_time::SystemTime;

use crate::{constants::quiz::RANK_POINTS, roster::SlotId};

use super::{answers::AnswerBook, config::Quiz};

/// Points for the n-th correct answer to a question, counting from zero
pub fn rank_points(rank: usize) -> u64 {
    RANK_POINTS.get(rank).copied().unwrap_or(0)
}

/// How one participant fared on one question
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDetail {
    /// Index of the question
    pub question_index: usize,
    /// The question text
    pub prompt: String,
    /// The answer options
    pub options: Vec<String>,
    /// Index of the correct option
    pub correct: usize,
    /// The option chosen, if the participant answered
    pub chosen: Option<usize>,
    /// Whether an answer was recorded
    pub answered: bool,
    /// When the answer was received
    #[serde_as(as = "Option<TimestampMilliSeconds<i64>>")]
    #[serde(default)]
    pub answered_at: Option<SystemTime>,
    /// Whether the answer was correct
    pub is_correct: bool,
    /// Points earned
    pub points: u64,
}

/// Quiz outcome for one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantResult {
    /// The scored slot
    pub slot: SlotId,
    /// Display name at scoring time
    pub name: String,
    /// Number of correct answers
    pub correct_answers: usize,
    /// Number of questions in the quiz
    pub total_questions: usize,
    /// Total points
    pub score: u64,
    /// Per-question breakdown
    pub details: Vec<QuestionDetail>,
}

/// Outcome of scoring a whole quiz
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct QuizResults {
    /// Results sorted by score, highest first; ties keep join order
    pub results: Vec<ParticipantResult>,
}

impl QuizResults {
    /// Total points per participant
    pub fn points(&self) -> BTreeMap<SlotId, u64> {
        self.results.iter().map(|r| (r.slot, r.score)).collect()
    }

    /// Looks up the result for one participant
    pub fn get(&self, slot: SlotId) -> Option<&ParticipantResult> {
        self.results.iter().find(|r| r.slot == slot)
    }
}

/// Scores a quiz for the given participants
///
/// `scorable` lists slot ids with their display names in join order. Answers
/// from anyone else are ignored.
pub fn score_quiz(quiz: &Quiz, answers: &AnswerBook, scorable: &[(SlotId, String)]) -> QuizResults {
    let mut totals: BTreeMap<SlotId, u64> = BTreeMap::new();
    let mut details: BTreeMap<SlotId, Vec<QuestionDetail>> = BTreeMap::new();

    for (index, question) in quiz.questions().iter().enumerate() {
        let ranked = scorable
            .iter()
            .filter_map(|(slot, _)| answers.get(*slot, index))
            .filter(|answer| question.is_correct(answer.option))
            .sorted_by_key(|answer| answer.sequence)
            .map(|answer| answer.participant)
            .collect_vec();

        for (slot, _) in scorable {
            let answer = answers.get(*slot, index);
            let is_correct = answer.is_some_and(|a| question.is_correct(a.option));
            let points = if is_correct {
                ranked
                    .iter()
                    .position(|s| s == slot)
                    .map_or(0, rank_points)
            } else {
                0
            };

            *totals.entry(*slot).or_default() += points;
            details.entry(*slot).or_default().push(QuestionDetail {
                question_index: index,
                prompt: question.prompt().to_owned(),
                options: question.options().to_vec(),
                correct: question.correct(),
                chosen: answer.map(|a| a.option),
                answered: answer.is_some(),
                answered_at: answer.map(|a| a.received_at),
                is_correct,
                points,
            });
        }
    }

    let results = scorable
        .iter()
        .map(|(slot, name)| {
            let details = details.remove(slot).unwrap_or_default();
            ParticipantResult {
                slot: *slot,
                name: name.clone(),
                correct_answers: details.iter().filter(|d| d.is_correct).count(),
                total_questions: quiz.len(),
                score: totals.get(slot).copied().unwrap_or(0),
                details,
            }
        })
        .sorted_by(|a, b| b.score.cmp(&a.score))
        .collect_vec();

    QuizResults { results }
}
