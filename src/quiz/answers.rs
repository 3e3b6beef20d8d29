//! Answer recording
//!
//! Answers are write-once per (participant, question). Each accepted answer
//! gets the next value of a per-room sequence counter, which is the only
//! thing used to rank correct answers; the wall-clock receipt time ends up in
//! the per-question detail of the persisted quiz results.

use std::collections::HashMap;

use serde::Serialize;
use web_time::SystemTime;

use crate::roster::SlotId;

/// A recorded answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// Who answered
    pub participant: SlotId,
    /// Which question was answered
    pub question: usize,
    /// Index of the chosen option
    pub option: usize,
    /// Position in the room's answer order
    pub sequence: u64,
    /// When the answer was received
    #[serde(skip)]
    pub received_at: SystemTime,
}

/// Outcome of recording an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Recorded {
    /// The answer was stored with this sequence number
    Accepted(u64),
    /// An answer for this participant and question already exists
    Duplicate,
}

/// All answers given during the current quiz run
#[derive(Debug, Default, Clone)]
pub struct AnswerBook {
    answers: HashMap<(SlotId, usize), Answer>,
    next_sequence: u64,
}

impl AnswerBook {
    /// Records an answer unless one already exists for the same key
    pub fn record(&mut self, participant: SlotId, question: usize, option: usize) -> Recorded {
        self.record_at(participant, question, option, SystemTime::now())
    }

    /// Records an answer with an explicit receipt time
    pub fn record_at(
        &mut self,
        participant: SlotId,
        question: usize,
        option: usize,
        received_at: SystemTime,
    ) -> Recorded {
        let key = (participant, question);
        if self.answers.contains_key(&key) {
            return Recorded::Duplicate;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.answers.insert(
            key,
            Answer {
                participant,
                question,
                option,
                sequence,
                received_at,
            },
        );
        Recorded::Accepted(sequence)
    }

    /// Looks up the answer for a participant and question
    pub fn get(&self, participant: SlotId, question: usize) -> Option<&Answer> {
        self.answers.get(&(participant, question))
    }

    /// Number of participants who answered a question
    pub fn answered_count(&self, question: usize) -> usize {
        self.answers.keys().filter(|(_, q)| *q == question).count()
    }

    /// Forgets every answer; the sequence keeps counting
    pub fn clear(&mut self) {
        self.answers.clear();
    }

    /// Total number of recorded answers
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    /// Whether no answers are recorded
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}
