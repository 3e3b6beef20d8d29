//! Participant and slot management
//!
//! This module tracks everyone in a room: the host, the fixed group slots
//! and any teacher-observers. Each participant has a stable [`SlotId`] that
//! survives reconnects and is what scores and evaluation logs are keyed by,
//! and a transient [`SessionId`] owned by the transport layer. The roster
//! keeps join order, which decides host promotion and snapshot order.

use std::{
    collections::{BTreeSet, HashMap},
    fmt::Display,
    str::FromStr,
};

use enum_map::{Enum, EnumMap};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;

use super::{SyncMessage, UpdateMessage, constants, names, session::Tunnel};

/// A transport session identifier
///
/// Assigned by the transport layer for every connection. A participant who
/// reconnects gets a new session id that is rebound to their old slot.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// A stable participant slot within a room
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SlotId(u32);

impl SlotId {
    /// Creates a slot id from its raw value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }
}

impl Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

/// The role a participant plays in the room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Controls the quiz and evaluation flow; never scored or evaluated
    Host,
    /// A scorable group bound to a fixed group number
    Group {
        /// The group number, starting at 1
        number: u8,
    },
    /// Evaluates groups but is never scored or evaluated
    Teacher,
}

/// The kind of role without associated data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum RoleKind {
    /// The host
    Host,
    /// A group
    Group,
    /// A teacher-observer
    Teacher,
}

impl Role {
    /// Returns the kind of this role
    pub fn kind(self) -> RoleKind {
        match self {
            Role::Host => RoleKind::Host,
            Role::Group { .. } => RoleKind::Group,
            Role::Teacher => RoleKind::Teacher,
        }
    }

    /// Returns the group number for group roles
    pub fn group_number(self) -> Option<u8> {
        match self {
            Role::Group { number } => Some(number),
            _ => None,
        }
    }
}

/// Whether a slot is claimed by a connected participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotKind {
    /// A reserved group position with nobody in it
    Placeholder,
    /// A slot bound to a live session
    Occupied,
}

/// A participant slot in a room
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participant {
    slot: SlotId,
    #[serde(skip)]
    session: Option<SessionId>,
    name: String,
    role: Role,
    score: f64,
    kind: SlotKind,
    /// Canonical name and score of the last occupant of a vacated placeholder
    #[serde(skip)]
    vacated: Option<(String, f64)>,
}

impl Participant {
    fn placeholder(slot: SlotId, number: u8) -> Self {
        Self {
            slot,
            session: None,
            name: names::placeholder(number),
            role: Role::Group { number },
            score: 0.,
            kind: SlotKind::Placeholder,
            vacated: None,
        }
    }

    /// The stable slot id
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// The current transport session, if the slot is occupied
    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// The display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The participant's role
    pub fn role(&self) -> Role {
        self.role
    }

    /// The cumulative score
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Whether the slot is a placeholder or occupied
    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// Whether this slot is bound to a live session
    pub fn is_online(&self) -> bool {
        self.kind == SlotKind::Occupied
    }

    /// Whether this participant is the host
    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }

    /// Whether this participant takes part in quiz scoring and can be evaluated
    pub fn is_scorable(&self) -> bool {
        self.is_online() && self.role.kind() == RoleKind::Group
    }

    /// Canonical name of whoever last vacated this placeholder
    pub fn vacated_by(&self) -> Option<&str> {
        self.vacated.as_ref().map(|(name, _)| name.as_str())
    }

    pub(crate) fn set_score(&mut self, score: f64) {
        self.score = score.max(0.);
    }
}

/// What happened when a session left the room
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    /// The slot that was vacated or removed
    pub slot: SlotId,
    /// Display name at the time of leaving
    pub name: String,
    /// Role at the time of leaving
    pub role: Role,
    /// Whether the slot was kept as a placeholder
    pub restored_placeholder: bool,
    /// The slot promoted to host, if the host left
    pub promoted: Option<SlotId>,
}

/// Errors that can occur when managing the roster
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The session or slot is not part of this room
    #[error("participant not found")]
    UnknownParticipant,
    /// The session is already bound to a participant in this room
    #[error("you are already in this room")]
    AlreadyJoined,
    /// The room already has the maximum number of groups
    #[error("room is full (at most {} groups)", constants::room::MAX_GROUPS)]
    RoomFull,
    /// The placeholder for the requested group number is already taken
    #[error("no free slot for this group")]
    NoSlot,
    /// The requested group number does not exist
    #[error("group number must be between 1 and {}", constants::room::MAX_GROUPS)]
    InvalidGroup,
    /// The action requires the host
    #[error("only the host can do this")]
    NotHost,
}

/// Public view of a participant, sent in roster broadcasts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantView {
    /// Stable slot id
    pub slot: SlotId,
    /// Display name
    pub name: String,
    /// Role
    pub role: Role,
    /// Cumulative score
    pub score: f64,
    /// Whether this is the host
    pub is_host: bool,
    /// Whether the slot is an unclaimed placeholder
    pub placeholder: bool,
}

impl From<&Participant> for ParticipantView {
    fn from(p: &Participant) -> Self {
        Self {
            slot: p.slot,
            name: p.name.clone(),
            role: p.role,
            score: p.score,
            is_host: p.is_host(),
            placeholder: p.kind == SlotKind::Placeholder,
        }
    }
}

/// All participant slots of a room, in join order
#[derive(Debug, Default)]
pub struct Roster {
    /// Slots in join order
    participants: Vec<Participant>,
    /// Live sessions and the slot each is bound to
    sessions: HashMap<SessionId, SlotId>,
    /// Occupied slots organized by role kind
    online: EnumMap<RoleKind, BTreeSet<SlotId>>,
    /// Slot ids of teachers who left, by canonical name
    retired_teachers: HashMap<String, SlotId>,
    next_slot: u32,
}

impl Roster {
    /// Creates a roster with a host and one placeholder per group number
    pub fn with_host(session: SessionId, name: String) -> Self {
        let mut roster = Self::default();
        let host = roster.allocate();
        roster.participants.push(Participant {
            slot: host,
            session: Some(session),
            name,
            role: Role::Host,
            score: 0.,
            kind: SlotKind::Occupied,
            vacated: None,
        });
        roster.sessions.insert(session, host);
        roster.online[RoleKind::Host].insert(host);

        for number in 1..=constants::room::MAX_GROUPS as u8 {
            let slot = roster.allocate();
            roster
                .participants
                .push(Participant::placeholder(slot, number));
        }

        roster
    }

    fn allocate(&mut self) -> SlotId {
        let slot = SlotId(self.next_slot);
        self.next_slot += 1;
        slot
    }

    fn position(&self, slot: SlotId) -> Option<usize> {
        self.participants.iter().position(|p| p.slot == slot)
    }

    /// All slots in join order, placeholders included
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    /// Looks up a slot
    pub fn get(&self, slot: SlotId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.slot == slot)
    }

    pub(crate) fn get_mut(&mut self, slot: SlotId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.slot == slot)
    }

    /// Resolves a live session to its slot
    pub fn slot_of(&self, session: SessionId) -> Option<SlotId> {
        self.sessions.get(&session).copied()
    }

    /// Resolves a live session to its participant
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownParticipant` if the session is not in this room.
    pub fn by_session(&self, session: SessionId) -> Result<&Participant, Error> {
        self.slot_of(session)
            .and_then(|slot| self.get(slot))
            .ok_or(Error::UnknownParticipant)
    }

    /// Checks that a session belongs to the host
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownParticipant` or `Error::NotHost`.
    pub fn require_host(&self, session: SessionId) -> Result<&Participant, Error> {
        let participant = self.by_session(session)?;
        if participant.is_host() {
            Ok(participant)
        } else {
            Err(Error::NotHost)
        }
    }

    /// The current host
    pub fn host(&self) -> Option<&Participant> {
        self.online[RoleKind::Host]
            .iter()
            .next()
            .and_then(|slot| self.get(*slot))
    }

    /// Online participants of a given kind, in join order
    pub fn online(&self, kind: RoleKind) -> impl Iterator<Item = &Participant> {
        self.participants
            .iter()
            .filter(move |p| self.online[kind].contains(&p.slot))
    }

    /// Number of online participants of a given kind
    pub fn online_count(&self, kind: RoleKind) -> usize {
        self.online[kind].len()
    }

    /// Whether a slot is an online scorable group
    pub fn is_online_group(&self, slot: SlotId) -> bool {
        self.online[RoleKind::Group].contains(&slot)
    }

    /// Slot ids of online groups, in join order
    pub fn scorable(&self) -> Vec<SlotId> {
        self.online(RoleKind::Group).map(Participant::slot).collect_vec()
    }

    /// Whether no participant is connected
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Views of every slot, for roster broadcasts
    pub fn views(&self) -> Vec<ParticipantView> {
        self.participants.iter().map(ParticipantView::from).collect()
    }

    fn bind(&mut self, slot: SlotId, session: SessionId) {
        let Some(index) = self.position(slot) else {
            return;
        };
        let participant = &mut self.participants[index];
        if let Some(old) = participant.session.replace(session) {
            self.sessions.remove(&old);
        }
        participant.kind = SlotKind::Occupied;
        let kind = participant.role.kind();
        self.sessions.insert(session, slot);
        self.online[kind].insert(slot);
    }

    /// Claims the unclaimed placeholder for a group number
    ///
    /// Returns the claimed slot together with the name and score left
    /// behind by its previous occupant, if any. A returning occupant keeps
    /// the slot id; anyone else gets a fresh one, so ratings and answers
    /// recorded for the previous occupant stay with them.
    pub(crate) fn occupy_placeholder(
        &mut self,
        number: u8,
        session: SessionId,
        name: String,
    ) -> Option<(SlotId, Option<(String, f64)>)> {
        let index = self.participants.iter().position(|p| {
            p.kind == SlotKind::Placeholder && p.role == Role::Group { number }
        })?;
        let replaced = self.participants[index]
            .vacated_by()
            .is_some_and(|previous| previous != name);
        let fresh = replaced.then(|| self.allocate());

        let participant = &mut self.participants[index];
        if let Some(fresh) = fresh {
            participant.slot = fresh;
        }
        let slot = participant.slot;
        let vacated = participant.vacated.take();
        participant.name = name;
        participant.score = 0.;
        self.bind(slot, session);
        Some((slot, vacated))
    }

    /// Appends a teacher-observer, reusing their former slot id if they left earlier
    pub(crate) fn add_teacher(&mut self, session: SessionId, name: String) -> SlotId {
        let slot = match self.retired_teachers.remove(&name) {
            Some(slot) => slot,
            None => self.allocate(),
        };
        self.participants.push(Participant {
            slot,
            session: None,
            name,
            role: Role::Teacher,
            score: 0.,
            kind: SlotKind::Placeholder,
            vacated: None,
        });
        self.bind(slot, session);
        slot
    }

    /// Binds a new session to an occupied slot after a reconnect
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownParticipant` if the slot is missing or not
    /// occupied, and `Error::AlreadyJoined` if the session is bound elsewhere.
    pub fn rebind(&mut self, slot: SlotId, session: SessionId) -> Result<(), Error> {
        if self.sessions.get(&session).is_some_and(|s| *s != slot) {
            return Err(Error::AlreadyJoined);
        }
        match self.get(slot) {
            Some(p) if p.is_online() => {
                self.bind(slot, session);
                Ok(())
            }
            _ => Err(Error::UnknownParticipant),
        }
    }

    /// Removes a session from the room
    ///
    /// Group slots go back to being placeholders so the slot count stays
    /// fixed; teachers and hosts are removed. When the host leaves, the next
    /// online participant in join order becomes host.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownParticipant` if the session is not in the room.
    pub fn vacate(&mut self, session: SessionId) -> Result<Departure, Error> {
        let slot = self
            .sessions
            .remove(&session)
            .ok_or(Error::UnknownParticipant)?;
        let index = self.position(slot).ok_or(Error::UnknownParticipant)?;
        let role = self.participants[index].role;
        self.online[role.kind()].remove(&slot);

        let (name, restored_placeholder) = match role {
            Role::Group { number } => {
                let participant = &mut self.participants[index];
                let name = std::mem::replace(&mut participant.name, names::placeholder(number));
                participant.vacated = Some((name.clone(), participant.score));
                participant.session = None;
                participant.score = 0.;
                participant.kind = SlotKind::Placeholder;
                (name, true)
            }
            Role::Teacher => {
                let participant = self.participants.remove(index);
                self.retired_teachers
                    .insert(participant.name.clone(), participant.slot);
                (participant.name, false)
            }
            Role::Host => (self.participants.remove(index).name, false),
        };

        let promoted = if role == Role::Host {
            self.promote_host()
        } else {
            None
        };

        Ok(Departure {
            slot,
            name,
            role,
            restored_placeholder,
            promoted,
        })
    }

    fn promote_host(&mut self) -> Option<SlotId> {
        let index = self.participants.iter().position(Participant::is_online)?;
        let participant = &mut self.participants[index];
        let slot = participant.slot;
        let previous = std::mem::replace(&mut participant.role, Role::Host);
        participant.score = 0.;
        self.online[previous.kind()].remove(&slot);
        self.online[RoleKind::Host].insert(slot);

        if let Role::Group { number } = previous {
            let replacement = self.allocate();
            self.participants
                .push(Participant::placeholder(replacement, number));
        }

        Some(slot)
    }

    /// Sends an update message to one session
    pub fn send_message<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        message: &UpdateMessage,
        session: SessionId,
        tunnel_finder: F,
    ) {
        let Some(tunnel) = tunnel_finder(session) else {
            return;
        };

        tunnel.send_message(message);
    }

    /// Sends a state synchronization message to one session
    pub fn send_state<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        message: &SyncMessage,
        session: SessionId,
        tunnel_finder: F,
    ) {
        let Some(tunnel) = tunnel_finder(session) else {
            return;
        };

        tunnel.send_state(message);
    }

    /// Broadcasts an update message to every connected participant
    pub fn announce<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        message: &UpdateMessage,
        tunnel_finder: F,
    ) {
        for session in self.sessions.keys() {
            self.send_message(message, *session, &tunnel_finder);
        }
    }

    /// Closes every connected session's tunnel
    pub fn close_all<T: Tunnel, F: Fn(SessionId) -> Option<T>>(&self, tunnel_finder: F) {
        for session in self.sessions.keys() {
            if let Some(tunnel) = tunnel_finder(*session) {
                tunnel.close();
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn roster() -> (Roster, SessionId) {
        let host = SessionId::new();
        (Roster::with_host(host, "Teacher1".to_owned()), host)
    }

    #[test]
    fn test_roster_starts_with_host_and_placeholders() {
        let (roster, host) = roster();

        assert_eq!(roster.iter().count(), 1 + constants::room::MAX_GROUPS);
        assert_eq!(roster.host().map(Participant::name), Some("Teacher1"));
        assert!(roster.require_host(host).is_ok());
        assert_eq!(roster.online_count(RoleKind::Group), 0);
        assert!(
            roster
                .iter()
                .skip(1)
                .all(|p| p.kind() == SlotKind::Placeholder)
        );
    }

    #[test]
    fn test_occupy_placeholder_keeps_position() {
        let (mut roster, _) = roster();
        let before = roster.iter().map(Participant::slot).collect_vec();

        let session = SessionId::new();
        let (slot, vacated) = roster
            .occupy_placeholder(2, session, "Group 2 - Falcons".to_owned())
            .unwrap();

        assert!(vacated.is_none());
        assert_eq!(roster.iter().map(Participant::slot).collect_vec(), before);
        assert_eq!(roster.slot_of(session), Some(slot));
        assert!(roster.is_online_group(slot));
        assert!(
            roster
                .occupy_placeholder(2, SessionId::new(), "Group 2 - Other".to_owned())
                .is_none()
        );
    }

    #[test]
    fn test_vacate_group_restores_placeholder() {
        let (mut roster, _) = roster();
        let session = SessionId::new();
        let (slot, _) = roster
            .occupy_placeholder(1, session, "Group 1 - Falcons".to_owned())
            .unwrap();
        roster.get_mut(slot).unwrap().set_score(12.);

        let departure = roster.vacate(session).unwrap();

        assert!(departure.restored_placeholder);
        let participant = roster.get(slot).unwrap();
        assert_eq!(participant.kind(), SlotKind::Placeholder);
        assert_eq!(participant.name(), "Group 1");
        assert_eq!(participant.vacated_by(), Some("Group 1 - Falcons"));
        assert_eq!(roster.iter().count(), 1 + constants::room::MAX_GROUPS);
    }

    #[test]
    fn test_returning_group_keeps_slot_id() {
        let (mut roster, _) = roster();
        let session = SessionId::new();
        let (slot, _) = roster
            .occupy_placeholder(1, session, "Group 1 - Falcons".to_owned())
            .unwrap();
        roster.get_mut(slot).unwrap().set_score(12.);
        roster.vacate(session).unwrap();

        let again = SessionId::new();
        let (reclaimed, vacated) = roster
            .occupy_placeholder(1, again, "Group 1 - Falcons".to_owned())
            .unwrap();
        assert_eq!(reclaimed, slot);
        assert_eq!(vacated, Some(("Group 1 - Falcons".to_owned(), 12.)));
        assert_eq!(roster.slot_of(again), Some(slot));
    }

    #[test]
    fn test_new_group_in_vacated_placeholder_gets_fresh_slot_id() {
        let (mut roster, _) = roster();
        let session = SessionId::new();
        let (slot, _) = roster
            .occupy_placeholder(1, session, "Group 1 - Falcons".to_owned())
            .unwrap();
        let position = roster.iter().position(|p| p.slot() == slot).unwrap();
        roster.vacate(session).unwrap();

        let newcomer = SessionId::new();
        let (fresh, vacated) = roster
            .occupy_placeholder(1, newcomer, "Group 1 - Hawks".to_owned())
            .unwrap();

        assert_ne!(fresh, slot);
        assert_eq!(vacated, Some(("Group 1 - Falcons".to_owned(), 0.)));
        assert!(roster.get(slot).is_none());
        assert_eq!(roster.iter().position(|p| p.slot() == fresh), Some(position));
        assert_eq!(roster.slot_of(newcomer), Some(fresh));
        assert!(roster.is_online_group(fresh));
    }

    #[test]
    fn test_teacher_rejoin_gets_same_slot() {
        let (mut roster, _) = roster();
        let session = SessionId::new();
        let slot = roster.add_teacher(session, "Teacher - Lan".to_owned());
        roster.vacate(session).unwrap();
        assert!(roster.get(slot).is_none());

        let again = roster.add_teacher(SessionId::new(), "Teacher - Lan".to_owned());
        assert_eq!(again, slot);
    }

    #[test]
    fn test_host_leaving_promotes_next_participant() {
        let (mut roster, host) = roster();
        let group = SessionId::new();
        let (slot, _) = roster
            .occupy_placeholder(3, group, "Group 3 - Owls".to_owned())
            .unwrap();

        let departure = roster.vacate(host).unwrap();

        assert_eq!(departure.promoted, Some(slot));
        assert!(roster.require_host(group).is_ok());
        assert_eq!(roster.online_count(RoleKind::Group), 0);
        assert_eq!(roster.online_count(RoleKind::Host), 1);
        // The group's number still has a placeholder
        assert!(
            roster
                .iter()
                .any(|p| p.kind() == SlotKind::Placeholder && p.role() == Role::Group { number: 3 })
        );
    }

    #[test]
    fn test_last_participant_leaving_empties_roster() {
        let (mut roster, host) = roster();
        roster.vacate(host).unwrap();
        assert!(roster.is_empty());
        assert!(roster.host().is_none());
    }

    #[test]
    fn test_rebind_moves_session() {
        let (mut roster, _) = roster();
        let old = SessionId::new();
        let (slot, _) = roster
            .occupy_placeholder(1, old, "Group 1 - Falcons".to_owned())
            .unwrap();

        let new = SessionId::new();
        roster.rebind(slot, new).unwrap();

        assert_eq!(roster.slot_of(new), Some(slot));
        assert_eq!(roster.slot_of(old), None);
        assert_eq!(
            roster.rebind(SlotId::new(99), SessionId::new()),
            Err(Error::UnknownParticipant)
        );
    }

    #[test]
    fn test_require_host_rejects_groups() {
        let (mut roster, _) = roster();
        let group = SessionId::new();
        roster.occupy_placeholder(1, group, "Group 1 - A".to_owned());
        assert_eq!(roster.require_host(group).err(), Some(Error::NotHost));
        assert_eq!(
            roster.require_host(SessionId::new()).err(),
            Some(Error::UnknownParticipant)
        );
    }

    #[test]
    fn test_session_id_round_trip_display() {
        let id = SessionId::new();
        assert_eq!(SessionId::from_str(&id.to_string()).unwrap(), id);
    }
}
