//! Score accumulation
//!
//! Every change to a group's cumulative score goes through the [`Ledger`],
//! which remembers, per participant and category, the amount already
//! applied this round. That makes retried or repeated submissions safe:
//! the host contribution lands once, and the peer and teacher averages
//! only ever apply the difference between the new average and what was
//! already added.

use std::collections::HashMap;

use enum_map::{Enum, EnumMap};
use serde::Serialize;

use crate::{
    constants::evaluation::{HOST_CAP, PEER_CAP},
    evaluation::summary::round2,
    roster::{Participant, SlotId},
};

/// Where a score contribution comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Contribution {
    /// Quiz points; replaces the score instead of adding to it
    Quiz,
    /// The host's evaluation
    HostEval,
    /// The mean of peer evaluations
    PeerEval,
    /// The mean of teacher evaluations
    TeacherEval,
}

/// Result of applying a contribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Outcome {
    /// The score changed by this amount
    Applied {
        /// Change to the cumulative score
        delta: f64,
    },
    /// The same contribution was already applied this round
    AlreadyApplied,
}

impl Contribution {
    /// Normalizes a raw amount: caps for host and peer, rounding for teacher
    pub fn normalize(self, amount: f64) -> f64 {
        let amount = amount.max(0.);
        match self {
            Contribution::Quiz => amount,
            Contribution::HostEval => amount.min(HOST_CAP),
            Contribution::PeerEval => amount.min(PEER_CAP),
            Contribution::TeacherEval => round2(amount),
        }
    }
}

/// Amounts applied per participant and category in the current round
///
/// The host contribution is applied once per round and later host amounts
/// are ignored. Peer and teacher contributions are averages that change as
/// more evaluators submit, so each new teacher or peer average replaces the
/// previous one: only `new - previous` is added, and an unchanged average
/// is [`Outcome::AlreadyApplied`]. Over a round a group therefore receives
/// exactly one teacher average and one peer average, the latest.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    applied: HashMap<SlotId, EnumMap<Contribution, Option<f64>>>,
}

impl Ledger {
    /// The amount already applied for a participant and category
    pub fn applied(&self, slot: SlotId, category: Contribution) -> Option<f64> {
        self.applied.get(&slot).and_then(|entry| entry[category])
    }

    /// Applies a contribution to a participant's score
    pub fn apply(
        &mut self,
        participant: &mut Participant,
        category: Contribution,
        amount: f64,
    ) -> Outcome {
        let amount = category.normalize(amount);
        let entry = &mut self.applied.entry(participant.slot()).or_default()[category];

        let delta = match (category, *entry) {
            (Contribution::HostEval, Some(_)) => return Outcome::AlreadyApplied,
            (_, Some(previous)) if previous == amount => return Outcome::AlreadyApplied,
            (Contribution::Quiz, _) => amount - participant.score(),
            (_, previous) => amount - previous.unwrap_or(0.),
        };

        *entry = Some(amount);
        participant.set_score(participant.score() + delta);
        Outcome::Applied { delta }
    }

    /// Forgets everything applied, starting a new round
    pub fn clear(&mut self) {
        self.applied.clear();
    }
}
