//! Document persistence
//!
//! Rooms persist quizzes, score snapshots, evaluation setups, logs and
//! results as JSON documents addressed by the host's name, or by the host's
//! name and the room code. A [`DocumentStore`] only needs to get, replace
//! and check documents; typed access comes from [`DocumentStoreExt`].
//!
//! Persistence is best effort. Callers log failures and carry on with the
//! in-memory state.

pub mod documents;
pub mod file;
pub mod in_memory;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::room_code::RoomCode;

pub use self::{file::FileStore, in_memory::InMemoryStore};

/// Errors produced by document stores
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Error {
    /// Reading or writing the underlying storage failed
    #[error("storage error at {path}: {message}")]
    Io {
        /// Location of the document
        path: String,
        /// Description of the failure
        message: String,
    },
    /// A document could not be converted to or from JSON
    #[error("document {path} could not be (de)serialized: {message}")]
    Serialization {
        /// Location of the document
        path: String,
        /// Description of the failure
        message: String,
    },
}

/// Turns a display name into a file-safe slug
///
/// Lowercases ASCII letters, replaces every run of other characters with a
/// single `-` and trims dashes from both ends.
pub fn slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_owned()
}

/// Address of a persisted document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    /// The host's latest quiz definition
    Quiz {
        /// Host display name
        host: String,
    },
    /// The host's latest score snapshot
    Scores {
        /// Host display name
        host: String,
    },
    /// The host's latest evaluation setup
    EvaluationSetup {
        /// Host display name
        host: String,
    },
    /// The evaluation log of a room
    EvaluationLog {
        /// Host display name
        host: String,
        /// Room the log belongs to
        room: RoomCode,
    },
    /// Per-question answer detail of a room's last quiz run
    QuizDetail {
        /// Host display name
        host: String,
        /// Room the detail belongs to
        room: RoomCode,
    },
    /// Summary of a room's last completed evaluation round
    EvaluationResults {
        /// Host display name
        host: String,
        /// Room the results belong to
        room: RoomCode,
    },
}

impl DocumentKey {
    /// Relative path of the document, also used as its identity
    pub fn path(&self) -> String {
        match self {
            DocumentKey::Quiz { host } => format!("quizzes/{}.json", slug(host)),
            DocumentKey::Scores { host } => format!("scores/{}-scores.json", slug(host)),
            DocumentKey::EvaluationSetup { host } => {
                format!("evaluations/{}-setup.json", slug(host))
            }
            DocumentKey::EvaluationLog { host, room } => {
                format!("evaluations/{}-{}-log.json", slug(host), slug(room.as_str()))
            }
            DocumentKey::QuizDetail { host, room } => {
                format!("quiz-details/{}-{}.json", slug(host), slug(room.as_str()))
            }
            DocumentKey::EvaluationResults { host, room } => {
                format!("evaluations/{}-{}-results.json", slug(host), slug(room.as_str()))
            }
        }
    }
}

/// A key to JSON document store
pub trait DocumentStore: Send + Sync {
    /// Fetches a document, returning `None` if it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn get(&self, key: &DocumentKey) -> Result<Option<serde_json::Value>, Error>;

    /// Replaces a document
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    fn put(&self, key: &DocumentKey, document: serde_json::Value) -> Result<(), Error>;

    /// Checks whether a document exists
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be queried.
    fn exists(&self, key: &DocumentKey) -> Result<bool, Error>;
}

/// Typed access on top of [`DocumentStore`]
pub trait DocumentStoreExt: DocumentStore {
    /// Fetches and deserializes a document
    ///
    /// # Errors
    ///
    /// Returns an error if the storage fails or the document has the wrong shape.
    fn load<T: DeserializeOwned>(&self, key: &DocumentKey) -> Result<Option<T>, Error> {
        self.get(key)?
            .map(|value| {
                serde_json::from_value(value).map_err(|e| Error::Serialization {
                    path: key.path(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    /// Serializes and stores a document
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the storage fails.
    fn save<T: Serialize>(&self, key: &DocumentKey, document: &T) -> Result<(), Error> {
        let value = serde_json::to_value(document).map_err(|e| Error::Serialization {
            path: key.path(),
            message: e.to_string(),
        })?;
        self.put(key, value)
    }
}

impl<S: DocumentStore + ?Sized> DocumentStoreExt for S {}
