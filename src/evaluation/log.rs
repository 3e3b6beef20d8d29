//! Evaluation log
//!
//! The log records every rating submitted during a round, keyed by
//! evaluator, target and criterion. Submissions are merged in, never
//! replaced wholesale, so a partial re-submission only overwrites the
//! criteria it carries. Summaries are always derived from the log.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::roster::SlotId;

use super::setup::Ratings;

/// Who submitted an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// The host
    Host,
    /// A group rating other groups
    Peer(SlotId),
    /// A teacher-observer
    Teacher(SlotId),
}

impl Source {
    /// The evaluator's slot, if it is not the host
    pub fn evaluator(self) -> Option<SlotId> {
        match self {
            Source::Host => None,
            Source::Peer(slot) | Source::Teacher(slot) => Some(slot),
        }
    }
}

/// Ratings submitted in one go, keyed by target
pub type Submission = BTreeMap<SlotId, Ratings>;

/// All ratings of the current round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationLog {
    /// Host ratings by target
    #[serde(default)]
    pub host: BTreeMap<SlotId, Ratings>,
    /// Peer ratings by evaluator, then target
    #[serde(default)]
    pub peers: BTreeMap<SlotId, BTreeMap<SlotId, Ratings>>,
    /// Teacher ratings by teacher, then target
    #[serde(default)]
    pub teachers: BTreeMap<SlotId, BTreeMap<SlotId, Ratings>>,
}

fn merge_into(existing: &mut BTreeMap<SlotId, Ratings>, incoming: &Submission) {
    for (target, ratings) in incoming {
        existing
            .entry(*target)
            .or_default()
            .extend(ratings.iter().map(|(id, level)| (id.clone(), *level)));
    }
}

impl EvaluationLog {
    /// Merges a submission into the log
    pub fn merge(&mut self, source: Source, incoming: &Submission) {
        match source {
            Source::Host => merge_into(&mut self.host, incoming),
            Source::Peer(evaluator) => {
                merge_into(self.peers.entry(evaluator).or_default(), incoming);
            }
            Source::Teacher(teacher) => {
                merge_into(self.teachers.entry(teacher).or_default(), incoming);
            }
        }
    }

    /// Host ratings of a target
    pub fn host_ratings(&self, target: SlotId) -> Option<&Ratings> {
        self.host.get(&target)
    }

    /// Ratings of a target from every peer other than the target itself
    pub fn peer_ratings(&self, target: SlotId) -> impl Iterator<Item = (SlotId, &Ratings)> {
        self.peers
            .iter()
            .filter(move |(evaluator, _)| **evaluator != target)
            .filter_map(move |(evaluator, targets)| targets.get(&target).map(|r| (*evaluator, r)))
    }

    /// Ratings of a target from every teacher
    pub fn teacher_ratings(&self, target: SlotId) -> impl Iterator<Item = (SlotId, &Ratings)> {
        self.teachers
            .iter()
            .filter_map(move |(teacher, targets)| targets.get(&target).map(|r| (*teacher, r)))
    }

    /// Whether `source` has rated `target`
    pub fn has_rated(&self, source: Source, target: SlotId) -> bool {
        match source {
            Source::Host => self.host.contains_key(&target),
            Source::Peer(evaluator) => self
                .peers
                .get(&evaluator)
                .is_some_and(|targets| targets.contains_key(&target)),
            Source::Teacher(teacher) => self
                .teachers
                .get(&teacher)
                .is_some_and(|targets| targets.contains_key(&target)),
        }
    }

    /// Every slot that has been rated by anyone
    pub fn targets(&self) -> BTreeSet<SlotId> {
        self.host
            .keys()
            .chain(self.peers.values().flat_map(BTreeMap::keys))
            .chain(self.teachers.values().flat_map(BTreeMap::keys))
            .copied()
            .collect()
    }

    /// Forgets every rating
    pub fn clear(&mut self) {
        self.host.clear();
        self.peers.clear();
        self.teachers.clear();
    }

    /// Whether nothing has been rated
    pub fn is_empty(&self) -> bool {
        self.host.is_empty() && self.peers.is_empty() && self.teachers.is_empty()
    }
}

/// Merges a submission into a log, returning the merged log
pub fn merge_log(mut existing: EvaluationLog, incoming: &Submission, source: Source) -> EvaluationLog {
    existing.merge(source, incoming);
    existing
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::evaluation::setup::CriterionId;

    fn submission(target: u32, pairs: &[(&str, u8)]) -> Submission {
        BTreeMap::from([(
            SlotId::new(target),
            pairs
                .iter()
                .map(|(id, level)| (CriterionId::new(*id), *level))
                .collect(),
        )])
    }

    #[test]
    fn test_merge_keeps_other_criteria() {
        let source = Source::Peer(SlotId::new(1));
        let mut log = EvaluationLog::default();
        log.merge(source, &submission(2, &[("a", 1), ("b", 2)]));
        log.merge(source, &submission(2, &[("b", 4)]));

        let ratings = &log.peers[&SlotId::new(1)][&SlotId::new(2)];
        assert_eq!(ratings[&CriterionId::new("a")], 1);
        assert_eq!(ratings[&CriterionId::new("b")], 4);
    }

    #[test]
    fn test_merge_split_equals_merge_together() {
        let source = Source::Teacher(SlotId::new(9));
        let split = merge_log(
            merge_log(EvaluationLog::default(), &submission(2, &[("a", 3)]), source),
            &submission(2, &[("b", 1)]),
            source,
        );
        let together = merge_log(
            EvaluationLog::default(),
            &submission(2, &[("a", 3), ("b", 1)]),
            source,
        );
        assert_eq!(split, together);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let once = merge_log(EvaluationLog::default(), &submission(3, &[("a", 2)]), Source::Host);
        let twice = merge_log(once.clone(), &submission(3, &[("a", 2)]), Source::Host);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_peer_ratings_exclude_self() {
        let mut log = EvaluationLog::default();
        log.peers.insert(SlotId::new(2), submission(2, &[("a", 4)]));
        log.merge(Source::Peer(SlotId::new(1)), &submission(2, &[("a", 1)]));

        let peers = log.peer_ratings(SlotId::new(2)).map(|(s, _)| s).collect::<Vec<_>>();
        assert_eq!(peers, vec![SlotId::new(1)]);
    }

    #[test]
    fn test_has_rated_and_targets() {
        let mut log = EvaluationLog::default();
        log.merge(Source::Host, &submission(2, &[("a", 4)]));
        log.merge(Source::Teacher(SlotId::new(8)), &submission(3, &[("a", 4)]));

        assert!(log.has_rated(Source::Host, SlotId::new(2)));
        assert!(!log.has_rated(Source::Host, SlotId::new(3)));
        assert!(log.has_rated(Source::Teacher(SlotId::new(8)), SlotId::new(3)));
        assert_eq!(
            log.targets(),
            BTreeSet::from([SlotId::new(2), SlotId::new(3)])
        );

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_log_serializes_with_slot_keys() {
        let log = merge_log(EvaluationLog::default(), &submission(2, &[("a", 4)]), Source::Host);
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["host"]["2"]["a"], 4);

        let back: EvaluationLog = serde_json::from_value(json).unwrap();
        assert_eq!(back, log);
    }
}
