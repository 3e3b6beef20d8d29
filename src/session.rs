//! Communication session management
//!
//! This module defines the trait for tunneling messages between the room
//! engine and connected clients. The engine never owns a connection: the
//! transport layer hands in a finder that maps a session id to its tunnel,
//! so any pub/sub or RPC layer can sit behind it.

use super::{SyncMessage, UpdateMessage};

/// Trait for sending messages through a communication tunnel
///
/// Implementations might wrap a WebSocket, a Server-Sent Events stream or
/// an in-process channel.
pub trait Tunnel {
    /// Sends an update message to the client
    ///
    /// Update messages notify clients about changes to the room that all
    /// connected views must reflect.
    fn send_message(&self, message: &UpdateMessage);

    /// Sends a state synchronization message to the client
    ///
    /// Sync messages carry a full snapshot of the room, typically when a
    /// client connects or its session is rebound after a reconnect.
    fn send_state(&self, state: &SyncMessage);

    /// Closes the communication tunnel
    fn close(self);
}
