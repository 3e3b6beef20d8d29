//! # Quizroom
//!
//! This library provides the core logic for classroom quiz rooms: a host
//! runs a timed multiple choice quiz for up to four groups, then opens an
//! evaluation round in which the host, the groups themselves and any
//! teacher-observers rate the groups against configurable criteria.
//!
//! Rooms are transport agnostic. Every operation takes a tunnel finder that
//! maps a session to its [`session::Tunnel`], and all messages leave the
//! engine as [`UpdateMessage`]s or [`SyncMessage`]s.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::module_name_repetitions)]
use serde::Serialize;

pub mod accumulator;
pub mod config;
pub mod constants;
pub mod error;
pub mod evaluation;
pub mod names;
pub mod quiz;
pub mod resolver;
pub mod room;
pub mod room_code;
pub mod roster;
pub mod service;
pub mod session;
pub mod store;

pub use error::Error;

/// Messages that bring a single client up to date
///
/// Sent when a participant joins or reconnects.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum SyncMessage {
    /// Room state
    Room(room::SyncMessage),
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Messages broadcast to everyone in a room
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum UpdateMessage {
    /// Roster and score updates
    Room(room::UpdateMessage),
    /// Quiz progress
    Quiz(quiz::UpdateMessage),
    /// Evaluation progress
    Evaluation(evaluation::UpdateMessage),
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}
