//! Multi-party evaluation
//!
//! After a quiz the host opens an evaluation round. The host rates every
//! group, then groups rate each other, then teacher-observers rate every
//! group. [`Evaluation`] gates each submission on the current phase and the
//! submitter's role, merges accepted ratings into the round's log and works
//! out the next phase. Turning ratings into score changes is left to
//! [`crate::accumulator`].

pub mod log;
pub mod phase;
pub mod setup;
pub mod summary;

use serde::Serialize;
use thiserror::Error;

use crate::roster::SlotId;

use self::{
    log::{EvaluationLog, Source, Submission},
    phase::{Attendance, Phase},
    setup::{CriterionId, EvaluationSetup},
    summary::SummaryRow,
};

/// Errors that can occur when submitting evaluations
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No evaluation round has been started
    #[error("evaluation has not started")]
    NotStarted,
    /// Submissions from this role are not accepted in the current phase
    #[error("evaluations are not accepted from you during the {0} phase")]
    WrongPhase(Phase),
    /// The submitter may not evaluate anyone
    #[error("you are not allowed to submit evaluations")]
    NotPermitted,
    /// The submission rates its own author
    #[error("you cannot evaluate yourself")]
    SelfEvaluation,
    /// The target is not an online group
    #[error("{0} cannot be evaluated")]
    InvalidTarget(SlotId),
    /// The rating refers to a criterion that is not part of the setup
    #[error("unknown criterion {0}")]
    UnknownCriterion(CriterionId),
    /// The rating level is outside the rating scale
    #[error("rating level {0} is out of range")]
    InvalidLevel(u8),
    /// The submission has no ratings
    #[error("submission contains no ratings")]
    EmptySubmission,
    /// The criteria setup failed validation
    #[error("invalid evaluation setup: {0}")]
    InvalidSetup(String),
}

/// Evaluation messages broadcast to the room
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// A round started with this setup
    Started {
        /// Criteria for the round
        setup: EvaluationSetup,
        /// The first phase
        phase: Phase,
    },
    /// The round moved to a new phase
    Phase(Phase),
    /// Summary rows after the round completed
    Results(Vec<SummaryRow>),
    /// The round is complete
    PhaseComplete,
}

/// The evaluation state of a room
#[derive(Debug, Default, Clone)]
pub struct Evaluation {
    setup: Option<EvaluationSetup>,
    started: bool,
    phase: Phase,
    log: EvaluationLog,
    round: u32,
}

impl Evaluation {
    /// The criteria setup, if one has been saved
    pub fn setup(&self) -> Option<&EvaluationSetup> {
        self.setup.as_ref()
    }

    /// The current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The log of the current round
    pub fn log(&self) -> &EvaluationLog {
        &self.log
    }

    /// Number of rounds started so far
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Whether a round is open for submissions
    pub fn is_running(&self) -> bool {
        self.started && self.phase != Phase::Done
    }

    /// Stores a setup without starting a round
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSetup`] if validation fails.
    pub fn save_setup(&mut self, setup: EvaluationSetup) -> Result<(), Error> {
        setup.check()?;
        self.setup = Some(setup);
        Ok(())
    }

    /// Starts a fresh round: phase back to host and an empty log
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSetup`] if validation fails; nothing changes.
    pub fn start(&mut self, setup: EvaluationSetup) -> Result<(), Error> {
        self.save_setup(setup)?;
        self.started = true;
        self.phase = Phase::Host;
        self.log.clear();
        self.round += 1;
        Ok(())
    }

    /// Starts over after a new quiz round, keeping the setup
    ///
    /// A round that was started goes back to the host phase with an empty
    /// log. Returns whether anything changed; a round that has not seen a
    /// submission yet is left alone.
    pub fn restart(&mut self) -> bool {
        if !self.started || (self.phase == Phase::Host && self.log.is_empty()) {
            return false;
        }
        self.phase = Phase::Host;
        self.log.clear();
        self.round += 1;
        true
    }

    /// Checks a submission without changing anything
    ///
    /// # Errors
    ///
    /// Returns the first reason the submission cannot be accepted.
    pub fn check(
        &self,
        source: Source,
        submission: &Submission,
        attendance: &Attendance,
    ) -> Result<(), Error> {
        let setup = self.setup.as_ref().filter(|_| self.started).ok_or(Error::NotStarted)?;
        if !self.phase.accepts(source) {
            return Err(Error::WrongPhase(self.phase));
        }
        if submission.is_empty() || submission.values().any(|r| r.is_empty()) {
            return Err(Error::EmptySubmission);
        }
        for (target, ratings) in submission {
            if source.evaluator() == Some(*target) {
                return Err(Error::SelfEvaluation);
            }
            if !attendance.groups.contains(target) {
                return Err(Error::InvalidTarget(*target));
            }
            setup.check_ratings(source, ratings)?;
        }
        Ok(())
    }

    /// Validates and merges a submission, then moves the phase forward
    ///
    /// Returns the phase after the submission. A rejected submission leaves
    /// the log untouched.
    ///
    /// # Errors
    ///
    /// See [`Evaluation::check`].
    pub fn submit(
        &mut self,
        source: Source,
        submission: &Submission,
        attendance: &Attendance,
    ) -> Result<Phase, Error> {
        self.check(source, submission, attendance)?;
        self.log.merge(source, submission);

        let phase = match source {
            Source::Host => attendance.after_host(),
            Source::Peer(_) | Source::Teacher(_) => self.phase,
        };
        self.phase = phase.settle(&self.log, attendance);
        Ok(self.phase)
    }

    /// Re-checks completion after the set of online participants changed
    ///
    /// Returns the new phase if it moved.
    pub fn advance_phase_if_complete(&mut self, attendance: &Attendance) -> Option<Phase> {
        if !self.is_running() {
            return None;
        }
        let next = self.phase.settle(&self.log, attendance);
        (next != self.phase).then(|| {
            self.phase = next;
            next
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::evaluation::setup::Criterion;

    fn setup() -> EvaluationSetup {
        EvaluationSetup {
            host_criteria: vec![Criterion::new("h", "", 40.)],
            member_criteria: vec![Criterion::new("m", "", 20.)],
            levels: vec![],
        }
    }

    fn submission(targets: &[u32], criterion: &str, level: u8) -> Submission {
        targets
            .iter()
            .map(|t| {
                (
                    SlotId::new(*t),
                    BTreeMap::from([(CriterionId::new(criterion), level)]),
                )
            })
            .collect()
    }

    fn attendance(groups: &[u32], teachers: &[u32]) -> Attendance {
        Attendance {
            groups: groups.iter().copied().map(SlotId::new).collect(),
            teachers: teachers.iter().copied().map(SlotId::new).collect(),
        }
    }

    fn started() -> Evaluation {
        let mut evaluation = Evaluation::default();
        evaluation.start(setup()).unwrap();
        evaluation
    }

    #[test]
    fn test_restart_goes_back_to_host_with_empty_log() {
        let mut idle = Evaluation::default();
        assert!(!idle.restart());
        assert_eq!(idle.round(), 0);

        let mut evaluation = started();
        let present = attendance(&[1, 2], &[]);
        evaluation
            .submit(Source::Host, &submission(&[1, 2], "h", 4), &present)
            .unwrap();
        assert_eq!(evaluation.phase(), Phase::Peers);

        assert!(evaluation.restart());
        assert_eq!(evaluation.phase(), Phase::Host);
        assert!(evaluation.log().is_empty());
        assert_eq!(evaluation.round(), 2);
        assert!(evaluation.is_running());
        assert!(!evaluation.restart());
        assert_eq!(evaluation.round(), 2);
        assert_eq!(
            evaluation.submit(Source::Peer(SlotId::new(1)), &submission(&[2], "m", 3), &present),
            Err(Error::WrongPhase(Phase::Host))
        );
    }

    #[test]
    fn test_submissions_require_started_round() {
        let mut evaluation = Evaluation::default();
        evaluation.save_setup(setup()).unwrap();
        assert_eq!(
            evaluation.submit(Source::Host, &submission(&[1], "h", 4), &attendance(&[1], &[])),
            Err(Error::NotStarted)
        );
    }

    #[test]
    fn test_full_round() {
        let mut evaluation = started();
        let present = attendance(&[1, 2], &[9]);

        assert_eq!(
            evaluation.submit(Source::Host, &submission(&[1, 2], "h", 4), &present),
            Ok(Phase::Peers)
        );
        assert_eq!(
            evaluation.submit(Source::Peer(SlotId::new(1)), &submission(&[2], "m", 3), &present),
            Ok(Phase::Peers)
        );
        assert_eq!(
            evaluation.submit(Source::Peer(SlotId::new(2)), &submission(&[1], "m", 3), &present),
            Ok(Phase::Teachers)
        );
        assert_eq!(
            evaluation.submit(
                Source::Teacher(SlotId::new(9)),
                &submission(&[1, 2], "m", 2),
                &present
            ),
            Ok(Phase::Done)
        );
        assert!(!evaluation.is_running());
    }

    #[test]
    fn test_wrong_phase_is_rejected() {
        let mut evaluation = started();
        let present = attendance(&[1, 2], &[]);
        assert_eq!(
            evaluation.submit(Source::Peer(SlotId::new(1)), &submission(&[2], "m", 3), &present),
            Err(Error::WrongPhase(Phase::Host))
        );

        evaluation
            .submit(Source::Host, &submission(&[1, 2], "h", 4), &present)
            .unwrap();
        assert_eq!(
            evaluation.submit(Source::Host, &submission(&[1], "h", 1), &present),
            Err(Error::WrongPhase(Phase::Peers))
        );
    }

    #[test]
    fn test_rejected_submission_is_not_merged() {
        let mut evaluation = started();
        let present = attendance(&[1, 2], &[]);
        evaluation
            .submit(Source::Host, &submission(&[1, 2], "h", 4), &present)
            .unwrap();

        let mut partly_bad = submission(&[2], "m", 3);
        partly_bad.insert(SlotId::new(1), BTreeMap::from([(CriterionId::new("m"), 9)]));
        assert_eq!(
            evaluation.submit(Source::Peer(SlotId::new(3)), &partly_bad, &present),
            Err(Error::InvalidLevel(9))
        );
        assert!(evaluation.log().peers.is_empty());
    }

    #[test]
    fn test_target_rules() {
        let mut evaluation = started();
        let present = attendance(&[1, 2], &[9]);
        evaluation
            .submit(Source::Host, &submission(&[1, 2], "h", 4), &present)
            .unwrap();

        let peer = Source::Peer(SlotId::new(1));
        assert_eq!(
            evaluation.check(peer, &submission(&[1], "m", 3), &present),
            Err(Error::SelfEvaluation)
        );
        assert_eq!(
            evaluation.check(peer, &submission(&[9], "m", 3), &present),
            Err(Error::InvalidTarget(SlotId::new(9)))
        );
        assert_eq!(
            evaluation.check(peer, &submission(&[2], "h", 3), &present),
            Err(Error::UnknownCriterion(CriterionId::new("h")))
        );
        assert_eq!(
            evaluation.check(peer, &Submission::new(), &present),
            Err(Error::EmptySubmission)
        );
    }

    #[test]
    fn test_restart_clears_log_and_phase() {
        let mut evaluation = started();
        let present = attendance(&[1, 2], &[]);
        evaluation
            .submit(Source::Host, &submission(&[1, 2], "h", 4), &present)
            .unwrap();

        evaluation.start(setup()).unwrap();
        assert_eq!(evaluation.phase(), Phase::Host);
        assert!(evaluation.log().is_empty());
        assert_eq!(evaluation.round(), 2);
    }

    #[test]
    fn test_invalid_setup_changes_nothing() {
        let mut evaluation = started();
        let mut bad = setup();
        bad.host_criteria.clear();
        assert!(matches!(evaluation.start(bad), Err(Error::InvalidSetup(_))));
        assert_eq!(evaluation.round(), 1);
        assert_eq!(evaluation.setup(), Some(&setup()));
    }

    #[test]
    fn test_advance_phase_when_group_leaves() {
        let mut evaluation = started();
        let mut present = attendance(&[1, 2, 3], &[]);
        evaluation
            .submit(Source::Host, &submission(&[1, 2, 3], "h", 4), &present)
            .unwrap();
        evaluation
            .submit(Source::Peer(SlotId::new(1)), &submission(&[2], "m", 3), &present)
            .unwrap();
        evaluation
            .submit(Source::Peer(SlotId::new(2)), &submission(&[1], "m", 3), &present)
            .unwrap();
        assert_eq!(evaluation.advance_phase_if_complete(&present), None);

        present.groups.pop();
        assert_eq!(evaluation.advance_phase_if_complete(&present), Some(Phase::Done));
    }
}
