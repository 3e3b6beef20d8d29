//! Configuration constants for the quiz room system
//!
//! This module contains the limits and fixed scoring tables used
//! throughout the room, quiz, and evaluation components so that every
//! boundary is defined in one place.

/// Room-wide limits
pub mod room {
    /// Number of characters in a generated room code
    pub const CODE_LENGTH: usize = 6;
    /// Characters a room code is drawn from
    pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    /// Number of fixed group slots (and maximum number of real groups)
    pub const MAX_GROUPS: usize = 4;
    /// Number of scorable participants kept in a persisted score snapshot
    pub const SNAPSHOT_SIZE: usize = 4;
}

/// Display name limits
pub mod names {
    /// Maximum length of a display name in bytes, before the role prefix is applied
    pub const MAX_LENGTH: usize = 30;
    /// Canonical prefix used for group participants (followed by the group number)
    pub const GROUP_PREFIX: &str = "Group";
    /// Canonical prefix used for teacher-observers
    pub const TEACHER_PREFIX: &str = "Teacher";
    /// Separator placed between a prefix and the cleaned name
    pub const SEPARATOR: &str = " - ";
}

/// Quiz definition limits and scoring
pub mod quiz {
    /// Minimum number of questions in a quiz
    pub const MIN_QUESTIONS: usize = 1;
    /// Maximum number of questions in a quiz
    pub const MAX_QUESTIONS: usize = 10;
    /// Maximum length of a question prompt
    pub const MAX_PROMPT_LENGTH: usize = 500;
    /// Minimum number of answer options
    pub const MIN_OPTIONS: usize = 2;
    /// Maximum number of answer options
    pub const MAX_OPTIONS: usize = 8;
    /// Maximum length of a single answer option
    pub const MAX_OPTION_LENGTH: usize = 200;
    /// Time limit in seconds used when a question does not specify one
    pub const DEFAULT_TIME_LIMIT: u32 = 30;
    /// Minimum configurable time limit in seconds
    pub const MIN_TIME_LIMIT: u32 = 5;
    /// Maximum configurable time limit in seconds
    pub const MAX_TIME_LIMIT: u32 = 240;
    /// Points awarded to correct answers by rank; ranks past the end earn nothing
    pub const RANK_POINTS: [u64; 4] = [5, 4, 3, 2];
}

/// Evaluation scoring limits
pub mod evaluation {
    /// Number of non-zero rating levels; a criterion's score is `max_score / LEVELS * level`
    pub const LEVELS: u8 = 4;
    /// Maximum number of level labels in a setup
    pub const MAX_LEVEL_LABELS: usize = LEVELS as usize;
    /// Maximum amount a host evaluation may add to a participant's score
    pub const HOST_CAP: f64 = 40.0;
    /// Maximum amount the peer average may add to a participant's score
    pub const PEER_CAP: f64 = 20.0;
    /// Maximum number of criteria in one criteria list
    pub const MAX_CRITERIA: usize = 20;
    /// Maximum score a single criterion may be worth
    pub const MAX_CRITERION_SCORE: f64 = 100.0;
    /// Maximum length of a criterion or level label
    pub const MAX_LABEL_LENGTH: usize = 200;
}

/// Media upload limits
pub mod media {
    /// Maximum accepted upload size in bytes (50 MB)
    pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;
    /// Public path prefix for stored uploads
    pub const UPLOAD_PATH_PREFIX: &str = "/uploads/";
}
