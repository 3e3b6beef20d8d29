//! Evaluation phases
//!
//! A round moves strictly forward: host, then peers, then teachers, then
//! done. Peers and teachers are skipped when nobody could take part, and
//! the completion predicates only consider participants who are online.

use serde::{Deserialize, Serialize};

use crate::roster::SlotId;

use super::log::{EvaluationLog, Source};

/// The phase of an evaluation round
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// The host rates every group
    #[default]
    #[display("host")]
    Host,
    /// Groups rate each other
    #[display("peers")]
    Peers,
    /// Teacher-observers rate every group
    #[display("teachers")]
    Teachers,
    /// The round is complete
    #[display("done")]
    Done,
}

/// Who is currently online and able to take part
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attendance {
    /// Online group slots
    pub groups: Vec<SlotId>,
    /// Online teacher slots
    pub teachers: Vec<SlotId>,
}

impl Attendance {
    /// Whether every online group has rated every other online group
    pub fn peers_complete(&self, log: &EvaluationLog) -> bool {
        self.groups.iter().all(|evaluator| {
            self.groups
                .iter()
                .filter(|target| *target != evaluator)
                .all(|target| log.has_rated(Source::Peer(*evaluator), *target))
        })
    }

    /// Whether every online teacher has rated every online group
    pub fn teachers_complete(&self, log: &EvaluationLog) -> bool {
        self.teachers.iter().all(|teacher| {
            self.groups
                .iter()
                .all(|target| log.has_rated(Source::Teacher(*teacher), *target))
        })
    }

    fn after_peers(&self) -> Phase {
        if self.teachers.is_empty() {
            Phase::Done
        } else {
            Phase::Teachers
        }
    }

    /// The phase that follows the host's submission
    pub fn after_host(&self) -> Phase {
        if self.groups.len() >= 2 {
            Phase::Peers
        } else {
            self.after_peers()
        }
    }
}

impl Phase {
    /// Whether submissions from this source are accepted in this phase
    pub fn accepts(self, source: Source) -> bool {
        matches!(
            (self, source),
            (Phase::Host, Source::Host)
                | (Phase::Peers, Source::Peer(_))
                | (Phase::Teachers, Source::Teacher(_))
        )
    }

    /// Advances through every phase whose completion predicate already holds
    ///
    /// The host phase only ends with a host submission, so it is returned
    /// unchanged.
    pub fn settle(self, log: &EvaluationLog, attendance: &Attendance) -> Phase {
        let mut phase = self;
        loop {
            let next = match phase {
                Phase::Peers if attendance.peers_complete(log) => attendance.after_peers(),
                Phase::Teachers if attendance.teachers_complete(log) => Phase::Done,
                _ => return phase,
            };
            phase = next;
        }
    }
}
