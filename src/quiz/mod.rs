//! Multiple choice quiz
//!
//! This module holds the quiz definition, the answers given during a run
//! and the ranked scoring applied when the run ends. [`QuizRun`] drives a
//! single run: the host starts it, moves through the questions and ends it,
//! while groups submit one answer per question.

pub mod answers;
pub mod config;
pub mod media;
pub mod scoring;

use serde::Serialize;
use serde_with::skip_serializing_none;
use thiserror::Error;

use crate::roster::SlotId;

use self::{
    answers::{AnswerBook, Recorded},
    config::Quiz,
    media::MediaRef,
    scoring::{ParticipantResult, QuizResults},
};

/// Errors that can occur while running a quiz
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No quiz has been created in this room
    #[error("no quiz has been created")]
    NoQuiz,
    /// The operation needs a running quiz
    #[error("quiz is not active")]
    NotActive,
    /// The quiz definition failed validation
    #[error("invalid quiz: {0}")]
    Invalid(String),
    /// The question index is outside the quiz
    #[error("question does not exist")]
    QuestionOutOfRange,
    /// The question has not been shown yet
    #[error("question has not been asked yet")]
    QuestionNotAsked,
    /// The chosen option does not exist on the question
    #[error("option does not exist")]
    InvalidOption,
    /// Only groups may answer
    #[error("only groups can answer questions")]
    NotAGroup,
}

/// Whether a quiz run is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum State {
    /// No run in progress
    #[default]
    Inactive,
    /// The run is showing the question at this index
    Active(usize),
}

/// A question as shown to participants, without the correct answer
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    /// Index of the question
    pub index: usize,
    /// Number of questions in the quiz
    pub count: usize,
    /// The question text
    pub prompt: String,
    /// The answer options
    pub options: Vec<String>,
    /// Seconds allowed
    pub time_limit: u32,
    /// Attached media
    pub media: Option<MediaRef>,
}

/// Summary of the room's quiz state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuizInfo {
    /// Whether a quiz has been created
    pub has_quiz: bool,
    /// Whether a run is in progress
    pub active: bool,
    /// Index of the current question while active
    pub current_question: Option<usize>,
    /// Number of questions
    pub question_count: usize,
}

/// Quiz messages broadcast to the room
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// A new quiz replaced the previous one
    Created {
        /// Number of questions
        question_count: usize,
    },
    /// A question is now being asked
    Question(QuestionView),
    /// Number of groups that answered the current question
    AnswerCount {
        /// Groups that answered
        answered: usize,
        /// Groups expected to answer
        expected: usize,
    },
    /// The run ended; results sorted by score
    Results(Vec<ParticipantResult>),
}

/// The quiz and its current run
#[derive(Debug, Default, Clone)]
pub struct QuizRun {
    quiz: Option<Quiz>,
    state: State,
    answers: AnswerBook,
}

impl QuizRun {
    /// The current quiz definition
    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    /// The run state
    pub fn state(&self) -> State {
        self.state
    }

    /// Answers recorded in the current run
    pub fn answers(&self) -> &AnswerBook {
        &self.answers
    }

    /// Replaces the quiz, stopping any run and forgetting its answers
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] if the quiz fails validation; the previous
    /// quiz is left in place.
    pub fn replace(&mut self, quiz: Quiz) -> Result<(), Error> {
        quiz.check()?;
        self.quiz = Some(quiz);
        self.state = State::Inactive;
        self.answers.clear();
        Ok(())
    }

    fn view(&self, index: usize) -> Result<QuestionView, Error> {
        let quiz = self.quiz.as_ref().ok_or(Error::NoQuiz)?;
        let question = quiz.question(index).ok_or(Error::QuestionOutOfRange)?;
        Ok(QuestionView {
            index,
            count: quiz.len(),
            prompt: question.prompt().to_owned(),
            options: question.options().to_vec(),
            time_limit: question.time_limit(),
            media: question.media().cloned(),
        })
    }

    /// Starts a fresh run at the first question
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoQuiz`] if no quiz was created.
    pub fn start(&mut self) -> Result<QuestionView, Error> {
        let view = self.view(0)?;
        self.answers.clear();
        self.state = State::Active(0);
        Ok(view)
    }

    /// Records an answer from a group
    ///
    /// Answers may be given for the current question or any earlier one.
    ///
    /// # Errors
    ///
    /// Returns an error if no run is active, the question is out of range or
    /// not yet asked, or the option does not exist.
    pub fn answer(&mut self, slot: SlotId, question: usize, option: usize) -> Result<Recorded, Error> {
        let State::Active(current) = self.state else {
            return Err(Error::NotActive);
        };
        let quiz = self.quiz.as_ref().ok_or(Error::NoQuiz)?;
        let asked = quiz.question(question).ok_or(Error::QuestionOutOfRange)?;
        if question > current {
            return Err(Error::QuestionNotAsked);
        }
        if !asked.has_option(option) {
            return Err(Error::InvalidOption);
        }

        Ok(self.answers.record(slot, question, option))
    }

    /// Moves to the next question
    ///
    /// Returns `None` once the last question has been passed; the caller is
    /// expected to end the run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotActive`] if no run is in progress.
    pub fn advance(&mut self) -> Result<Option<QuestionView>, Error> {
        let State::Active(current) = self.state else {
            return Err(Error::NotActive);
        };
        let next = current + 1;
        match self.view(next) {
            Ok(view) => {
                self.state = State::Active(next);
                Ok(Some(view))
            }
            Err(Error::QuestionOutOfRange) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Ends the run and scores it
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotActive`] if no run is in progress.
    pub fn finish(&mut self, scorable: &[(SlotId, String)]) -> Result<QuizResults, Error> {
        if self.state == State::Inactive {
            return Err(Error::NotActive);
        }
        let quiz = self.quiz.as_ref().ok_or(Error::NoQuiz)?;
        self.state = State::Inactive;
        Ok(scoring::score_quiz(quiz, &self.answers, scorable))
    }

    /// Summary of the quiz state
    pub fn info(&self) -> QuizInfo {
        QuizInfo {
            has_quiz: self.quiz.is_some(),
            active: matches!(self.state, State::Active(_)),
            current_question: match self.state {
                State::Active(index) => Some(index),
                State::Inactive => None,
            },
            question_count: self.quiz.as_ref().map_or(0, Quiz::len),
        }
    }
}
