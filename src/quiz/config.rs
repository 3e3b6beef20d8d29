//! Quiz definitions
//!
//! A quiz is an ordered list of multiple choice questions created by the
//! host. Definitions are validated with `garde` when they arrive and are
//! immutable afterwards; creating a new quiz replaces the old one.

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::constants::quiz::{
    DEFAULT_TIME_LIMIT, MAX_OPTION_LENGTH, MAX_OPTIONS, MAX_PROMPT_LENGTH, MAX_QUESTIONS,
    MAX_TIME_LIMIT, MIN_OPTIONS, MIN_QUESTIONS, MIN_TIME_LIMIT,
};

use super::{Error, media::MediaRef};

type ValidationResult = garde::Result;

fn validate_time_limit(val: &Option<u32>) -> ValidationResult {
    match val {
        Some(seconds) if !(MIN_TIME_LIMIT..=MAX_TIME_LIMIT).contains(seconds) => {
            Err(garde::Error::new(format!(
                "time_limit is outside of the bounds [{MIN_TIME_LIMIT},{MAX_TIME_LIMIT}]",
            )))
        }
        _ => Ok(()),
    }
}

fn validate_options(val: &[String]) -> ValidationResult {
    if val.iter().any(|option| option.trim().is_empty()) {
        Err(garde::Error::new("options cannot be blank"))
    } else {
        Ok(())
    }
}

/// A single multiple choice question
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Question {
    /// The question text shown to every participant
    #[garde(length(min = 1, max = MAX_PROMPT_LENGTH))]
    prompt: String,
    /// Answer options in display order
    #[garde(
        length(min = MIN_OPTIONS, max = MAX_OPTIONS),
        inner(length(max = MAX_OPTION_LENGTH)),
        custom(|v, _| validate_options(v))
    )]
    options: Vec<String>,
    /// Index into `options` of the correct answer
    #[garde(skip)]
    correct: usize,
    /// Seconds allowed for the question, shown to clients only
    #[garde(custom(|v, _| validate_time_limit(v)))]
    time_limit: Option<u32>,
    /// Image or video attached to the question
    #[garde(dive)]
    media: Option<MediaRef>,
}

impl Question {
    /// Creates a question without media or an explicit time limit
    pub fn new(prompt: impl Into<String>, options: Vec<String>, correct: usize) -> Self {
        Self {
            prompt: prompt.into(),
            options,
            correct,
            time_limit: None,
            media: None,
        }
    }

    /// Sets the time limit in seconds
    #[must_use]
    pub fn with_time_limit(mut self, seconds: u32) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Attaches media to the question
    #[must_use]
    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media = Some(media);
        self
    }

    /// The question text
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The answer options
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Index of the correct option
    pub fn correct(&self) -> usize {
        self.correct
    }

    /// Time limit in seconds, falling back to the default
    pub fn time_limit(&self) -> u32 {
        self.time_limit.unwrap_or(DEFAULT_TIME_LIMIT)
    }

    /// The attached media, if any
    pub fn media(&self) -> Option<&MediaRef> {
        self.media.as_ref()
    }

    /// Whether `option` indexes an existing answer option
    pub fn has_option(&self, option: usize) -> bool {
        option < self.options.len()
    }

    /// Whether `option` is the correct answer
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct
    }
}

/// A complete quiz definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Quiz {
    /// The questions in presentation order
    #[garde(length(min = MIN_QUESTIONS, max = MAX_QUESTIONS), dive)]
    questions: Vec<Question>,
}

impl Quiz {
    /// Creates a quiz from its questions without validating them
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// Validates field limits and that every correct index points at an option
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] describing the first problem found.
    pub fn check(&self) -> Result<(), Error> {
        self.validate()
            .map_err(|report| Error::Invalid(report.to_string()))?;

        if let Some(index) = self
            .questions
            .iter()
            .position(|q| !q.has_option(q.correct))
        {
            return Err(Error::Invalid(format!(
                "questions[{index}].correct does not point at an option"
            )));
        }

        Ok(())
    }

    /// Number of questions
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the quiz has no questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Looks up a question by index
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// All questions in order
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn question() -> Question {
        Question::new(
            "What is 2 + 2?",
            vec!["3".to_owned(), "4".to_owned(), "5".to_owned()],
            1,
        )
    }

    #[test]
    fn test_valid_quiz() {
        let quiz = Quiz::new(vec![question(), question().with_time_limit(60)]);
        assert!(quiz.check().is_ok());
        assert_eq!(quiz.len(), 2);
    }

    #[test]
    fn test_quiz_question_count_bounds() {
        assert!(Quiz::new(vec![]).check().is_err());

        let eleven = vec![question(); MAX_QUESTIONS + 1];
        assert!(Quiz::new(eleven).check().is_err());

        let ten = vec![question(); MAX_QUESTIONS];
        assert!(Quiz::new(ten).check().is_ok());
    }

    #[test]
    fn test_correct_index_must_exist() {
        let bad = Question::new("Q", vec!["a".to_owned(), "b".to_owned()], 2);
        let err = Quiz::new(vec![bad]).check().unwrap_err();
        assert!(matches!(err, Error::Invalid(reason) if reason.contains("correct")));
    }

    #[test]
    fn test_option_count_and_blank_options() {
        let one = Question::new("Q", vec!["a".to_owned()], 0);
        assert!(one.validate().is_err());

        let blank = Question::new("Q", vec!["a".to_owned(), "  ".to_owned()], 0);
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_time_limit_defaults_and_bounds() {
        assert_eq!(question().time_limit(), DEFAULT_TIME_LIMIT);
        assert!(question().with_time_limit(MIN_TIME_LIMIT - 1).validate().is_err());
        assert!(question().with_time_limit(MAX_TIME_LIMIT + 1).validate().is_err());
        assert!(question().with_time_limit(MAX_TIME_LIMIT).validate().is_ok());
    }

    #[test]
    fn test_quiz_deserialization_without_optional_fields() {
        let quiz: Quiz = serde_json::from_str(
            r#"{"questions":[{"prompt":"Q","options":["a","b"],"correct":0}]}"#,
        )
        .unwrap();
        assert!(quiz.check().is_ok());
        assert_eq!(quiz.question(0).unwrap().time_limit(), DEFAULT_TIME_LIMIT);
        assert!(quiz.question(0).unwrap().media().is_none());
    }
}
