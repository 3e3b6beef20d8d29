//! Process configuration
//!
//! The only runtime knob is the port the transport layer listens on.
//! Everything else is a compile-time limit in [`crate::constants`].

use std::num::ParseIntError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Port used when `PORT` is not set
pub const DEFAULT_PORT: u16 = 3009;

/// Environment variable holding the listen port
pub const PORT_VAR: &str = "PORT";

/// Errors produced while reading configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The port variable was present but not a valid port number
    #[error("invalid {PORT_VAR} value {value:?}: {source}")]
    InvalidPort {
        /// The raw value that failed to parse
        value: String,
        /// The underlying parse failure
        source: ParseIntError,
    },
}

/// Settings for the process hosting the room service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Port the transport layer should listen on
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl Settings {
    /// Reads settings from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPort`] if `PORT` is set to something that is
    /// not a `u16`.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPort`] if the port value does not parse.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, Error> {
        let port = match lookup(PORT_VAR) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|source| Error::InvalidPort { value, source })?,
            None => DEFAULT_PORT,
        };

        Ok(Self { port })
    }
}
