//! Evaluation summary
//!
//! Summary rows are rebuilt from the log every time they are needed, so the
//! log stays the single source of truth for what each group earned.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    constants::evaluation::{HOST_CAP, PEER_CAP},
    roster::SlotId,
};

use super::{
    log::{EvaluationLog, Source},
    setup::EvaluationSetup,
};

/// Rounds to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.).round() / 100.
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0., 0_u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

/// Host score of a target, capped
pub fn host_score(log: &EvaluationLog, setup: &EvaluationSetup, target: SlotId) -> Option<f64> {
    log.host_ratings(target)
        .map(|ratings| setup.raw_score(Source::Host, ratings).min(HOST_CAP))
}

/// Mean peer score of a target, capped; the target's own ratings are ignored
pub fn peer_average(log: &EvaluationLog, setup: &EvaluationSetup, target: SlotId) -> Option<f64> {
    mean(
        log.peer_ratings(target)
            .map(|(evaluator, ratings)| setup.raw_score(Source::Peer(evaluator), ratings)),
    )
    .map(|average| average.min(PEER_CAP))
}

/// Mean teacher score of a target, rounded to two decimals
pub fn teacher_average(
    log: &EvaluationLog,
    setup: &EvaluationSetup,
    target: SlotId,
) -> Option<f64> {
    mean(
        log.teacher_ratings(target)
            .map(|(teacher, ratings)| setup.raw_score(Source::Teacher(teacher), ratings)),
    )
    .map(round2)
}

/// A group to summarize
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryInput {
    /// The group's slot
    pub slot: SlotId,
    /// Display name
    pub name: String,
    /// Points from the last quiz run
    pub quiz_score: f64,
}

/// One row of the evaluation summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// The group's slot
    pub slot: SlotId,
    /// Display name
    pub name: String,
    /// Capped host score
    pub host_score: f64,
    /// Rounded teacher average
    pub teacher_average: f64,
    /// Capped peer average
    pub peer_average: f64,
    /// Points from the last quiz run
    pub quiz_score: f64,
    /// Sum of the above
    pub total: f64,
}

/// Builds one row per group from the log
pub fn build_summary(
    log: &EvaluationLog,
    setup: &EvaluationSetup,
    groups: &[SummaryInput],
) -> Vec<SummaryRow> {
    groups
        .iter()
        .map(|group| {
            let host_score = host_score(log, setup, group.slot).unwrap_or(0.);
            let teacher_average = teacher_average(log, setup, group.slot).unwrap_or(0.);
            let peer_average = peer_average(log, setup, group.slot).unwrap_or(0.);
            SummaryRow {
                slot: group.slot,
                name: group.name.clone(),
                host_score,
                teacher_average,
                peer_average,
                quiz_score: group.quiz_score,
                total: round2(host_score + teacher_average + peer_average + group.quiz_score),
            }
        })
        .collect_vec()
}
