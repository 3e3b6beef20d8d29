//! Crate-wide error type
//!
//! Each module reports its own failures; [`Error`] collects them so room
//! operations can use `?` throughout. Errors are only ever sent back to the
//! participant whose request failed, as a [`Rejection`].

use serde::Serialize;
use thiserror::Error;

use crate::{evaluation, names, quiz, room_code::RoomCode, roster};

/// Any reason a room operation can be rejected
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No room has this code
    #[error("room {0} does not exist")]
    RoomNotFound(RoomCode),
    /// A display name was rejected
    #[error(transparent)]
    Name(#[from] names::Error),
    /// A roster rule was broken
    #[error(transparent)]
    Roster(#[from] roster::Error),
    /// A quiz rule was broken
    #[error(transparent)]
    Quiz(#[from] quiz::Error),
    /// An evaluation rule was broken
    #[error(transparent)]
    Evaluation(#[from] evaluation::Error),
    /// An upload was refused
    #[error(transparent)]
    Media(#[from] quiz::media::Error),
    /// A manually set score was negative or not a number
    #[error("score must be a non-negative number")]
    InvalidScore,
}

/// Coarse classification of a rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// The requester may not do this now
    Authorization,
    /// The request itself is malformed
    Validation,
    /// A limit was reached
    Capacity,
    /// Something referenced does not exist
    NotFound,
}

impl Error {
    /// Classifies the error
    pub fn kind(&self) -> Kind {
        match self {
            Error::RoomNotFound(_)
            | Error::Roster(roster::Error::UnknownParticipant)
            | Error::Quiz(quiz::Error::NoQuiz) => Kind::NotFound,
            Error::Roster(roster::Error::RoomFull | roster::Error::NoSlot)
            | Error::Media(quiz::media::Error::TooLarge) => Kind::Capacity,
            Error::Roster(roster::Error::NotHost)
            | Error::Quiz(quiz::Error::NotAGroup)
            | Error::Evaluation(
                evaluation::Error::WrongPhase(_)
                | evaluation::Error::NotPermitted
                | evaluation::Error::SelfEvaluation
                | evaluation::Error::InvalidTarget(_),
            ) => Kind::Authorization,
            _ => Kind::Validation,
        }
    }
}

/// A rejection as sent to the requester
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// What kind of failure this was
    pub kind: Kind,
    /// Human-readable reason
    pub reason: String,
}

impl From<&Error> for Rejection {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.kind(),
            reason: error.to_string(),
        }
    }
}
