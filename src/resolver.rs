//! Join resolution
//!
//! Decides which slot a joining participant gets. Groups claim the
//! placeholder for their group number in place, so a group keeps its
//! position (and its slot id) however often it reconnects. A different group
//! taking over a vacated number starts on a fresh slot id. Teachers are
//! appended as observers and get their former slot id back if they return
//! under the same name.

use serde::Deserialize;

use crate::{
    constants, names,
    roster::{self, Participant, ParticipantView, RoleKind, Roster, SessionId},
    store::documents::ScoreSnapshot,
};

/// The role a participant asks to join as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinRole {
    /// A group with a fixed number
    Group {
        /// Group number, starting at 1
        number: u8,
    },
    /// A teacher-observer
    Teacher,
}

/// A request to join a room
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JoinRequest {
    /// Requested role
    pub role: JoinRole,
    /// Requested display name, with or without a role prefix
    pub name: String,
}

/// Where a joining participant's score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOrigin {
    /// Nothing was known; the score starts at zero
    Fresh,
    /// The slot's previous occupant had the same name
    Restored,
    /// Found in the host's saved score snapshot
    Saved,
}

/// An accepted join
#[derive(Debug, Clone, PartialEq)]
pub struct Joined {
    /// The participant as others see it
    pub participant: ParticipantView,
    /// Where the score came from
    pub origin: ScoreOrigin,
}

/// Assigns a slot to a joining session
///
/// `saved` is the host's last persisted score snapshot, used to seed the
/// score of a group that is not returning to its own slot.
///
/// # Errors
///
/// Fails with a name error for invalid names, or a roster error if the
/// session already joined, the group number is invalid, the room is full
/// or the group number is already taken.
pub fn resolve_join(
    roster: &mut Roster,
    session: SessionId,
    request: &JoinRequest,
    saved: Option<&ScoreSnapshot>,
) -> Result<Joined, crate::Error> {
    if roster.slot_of(session).is_some() {
        return Err(roster::Error::AlreadyJoined.into());
    }

    let (slot, origin) = match request.role {
        JoinRole::Teacher => {
            let name = names::teacher(&request.name)?;
            (roster.add_teacher(session, name), ScoreOrigin::Fresh)
        }
        JoinRole::Group { number } => {
            if number == 0 || usize::from(number) > constants::room::MAX_GROUPS {
                return Err(roster::Error::InvalidGroup.into());
            }
            if roster.online_count(RoleKind::Group) >= constants::room::MAX_GROUPS {
                return Err(roster::Error::RoomFull.into());
            }
            let name = names::group(number, &request.name)?;

            let (slot, vacated) = roster
                .occupy_placeholder(number, session, name.clone())
                .ok_or(roster::Error::NoSlot)?;
            let origin = match vacated {
                Some((previous, score)) if previous == name => {
                    set_score(roster, slot, score);
                    ScoreOrigin::Restored
                }
                _ => match saved.and_then(|snapshot| snapshot.score_of(&name)) {
                    Some(score) => {
                        set_score(roster, slot, score);
                        ScoreOrigin::Saved
                    }
                    None => ScoreOrigin::Fresh,
                },
            };
            (slot, origin)
        }
    };

    let participant = roster
        .get(slot)
        .map(ParticipantView::from)
        .ok_or(roster::Error::UnknownParticipant)?;

    Ok(Joined {
        participant,
        origin,
    })
}

fn set_score(roster: &mut Roster, slot: roster::SlotId, score: f64) {
    if let Some(participant) = roster.get_mut(slot) {
        Participant::set_score(participant, score);
    }
}
