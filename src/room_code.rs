//! Room code generation and parsing
//!
//! Room codes are short uppercase alphanumeric strings that participants
//! type in to join a room. They are generated randomly and compared
//! case-insensitively when parsed.

use std::{fmt::Display, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

use crate::constants::room::{CODE_ALPHABET, CODE_LENGTH};

/// A unique identifier for a room
///
/// Always exactly [`CODE_LENGTH`] characters from [`CODE_ALPHABET`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct RoomCode([u8; CODE_LENGTH]);

/// Errors produced when parsing a room code
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The input does not have the expected number of characters
    #[error("room code must be {CODE_LENGTH} characters long")]
    Length,
    /// The input contains a character outside the room code alphabet
    #[error("room code contains an invalid character")]
    Character,
}

impl RoomCode {
    /// Creates a new random room code
    pub fn new() -> Self {
        let mut code = [0; CODE_LENGTH];
        for c in &mut code {
            *c = CODE_ALPHABET[fastrand::usize(..CODE_ALPHABET.len())];
        }
        Self(code)
    }

    /// Returns the code as a string slice
    pub fn as_str(&self) -> &str {
        // Only ASCII alphabet bytes are ever stored.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl Default for RoomCode {
    /// Creates a new random room code (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomCode {
    type Err = ParseError;

    /// Parses a room code, accepting lowercase input
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Length`] for inputs of the wrong length and
    /// [`ParseError::Character`] for characters outside the alphabet.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != CODE_LENGTH {
            return Err(ParseError::Length);
        }
        let mut code = [0; CODE_LENGTH];
        for (slot, byte) in code.iter_mut().zip(s.bytes()) {
            let byte = byte.to_ascii_uppercase();
            if !CODE_ALPHABET.contains(&byte) {
                return Err(ParseError::Character);
            }
            *slot = byte;
        }
        Ok(Self(code))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_room_code_new_uses_alphabet() {
        for _ in 0..100 {
            let code = RoomCode::new();
            assert_eq!(code.as_str().len(), CODE_LENGTH);
            assert!(code.as_str().bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_room_code_from_str() {
        let code = RoomCode::from_str("ABC123").unwrap();
        assert_eq!(code.to_string(), "ABC123");

        let lower = RoomCode::from_str("abc123").unwrap();
        assert_eq!(lower, code);
    }

    #[test]
    fn test_room_code_from_str_invalid() {
        assert_eq!(RoomCode::from_str("ABC12"), Err(ParseError::Length));
        assert_eq!(RoomCode::from_str("ABC1234"), Err(ParseError::Length));
        assert_eq!(RoomCode::from_str("ABC-12"), Err(ParseError::Character));
        assert_eq!(RoomCode::from_str(""), Err(ParseError::Length));
    }

    #[test]
    fn test_room_code_serialization() {
        let code = RoomCode::from_str("ZZ9PLZ").unwrap();
        let serialized = serde_json::to_string(&code).unwrap();
        assert_eq!(serialized, "\"ZZ9PLZ\"");

        let deserialized: RoomCode = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, code);
    }

    #[test]
    fn test_room_code_deserialization_error() {
        let result: Result<RoomCode, _> = serde_json::from_str("\"bad\"");
        assert!(result.is_err());
    }
}
