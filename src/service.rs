//! Room registry
//!
//! [`RoomService`] owns every live room, keyed by room code. Rooms sit in a
//! concurrent map so different rooms are handled in parallel, while each
//! operation on one room runs to completion under that room's entry lock.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};

use crate::{
    error::Error,
    evaluation::{log::Submission, phase::Phase, setup::EvaluationSetup},
    names,
    quiz::{QuestionView, QuizInfo, answers::Recorded, config::Quiz, scoring::ParticipantResult},
    resolver::JoinRequest,
    room::{Advance, Room},
    room_code::RoomCode,
    roster::{Departure, ParticipantView, SessionId, SlotId},
    session::Tunnel,
    store::{
        DocumentKey, DocumentStore, DocumentStoreExt,
        documents::{QuizDocument, ScoreEntry, ScoreSnapshot, SetupDocument},
    },
};

const LOG_TARGET: &str = "quizroom::service";

/// A freshly created room
#[derive(Debug, Clone, PartialEq)]
pub struct Created {
    /// Code participants use to join
    pub code: RoomCode,
    /// The host
    pub host: ParticipantView,
    /// The host's last saved scores, when loading existing data was requested
    pub saved_scores: Option<ScoreSnapshot>,
}

/// Every live room and the store they persist to
pub struct RoomService {
    rooms: DashMap<RoomCode, Room>,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for RoomService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomService")
            .field("rooms", &self.rooms.len())
            .finish_non_exhaustive()
    }
}

impl RoomService {
    /// Creates an empty service persisting to `store`
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            rooms: DashMap::new(),
            store,
        }
    }

    /// Number of live rooms
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Whether a room with this code is live
    pub fn contains(&self, code: RoomCode) -> bool {
        self.rooms.contains_key(&code)
    }

    fn with_room<R>(
        &self,
        code: RoomCode,
        f: impl FnOnce(&mut Room) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let mut room = self.rooms.get_mut(&code).ok_or(Error::RoomNotFound(code))?;
        f(&mut room)
    }

    fn load<T: serde::de::DeserializeOwned>(&self, key: &DocumentKey) -> Option<T> {
        self.store.load(key).unwrap_or_else(|e| {
            tracing::warn!(target: LOG_TARGET, path = %key.path(), error = %e, "failed to load document");
            None
        })
    }

    fn restore(&self, room: &mut Room) -> Option<ScoreSnapshot> {
        let host = room.host_name().to_owned();

        if let Some(document) = self.load::<QuizDocument>(&DocumentKey::Quiz { host: host.clone() }) {
            if let Err(e) = room.restore_quiz(document.quiz) {
                tracing::warn!(target: LOG_TARGET, room = %room.code(), error = %e, "saved quiz rejected");
            }
        }
        let setup_key = DocumentKey::EvaluationSetup { host: host.clone() };
        if let Some(document) = self.load::<SetupDocument>(&setup_key) {
            if let Err(e) = room.restore_setup(document.setup) {
                tracing::warn!(target: LOG_TARGET, room = %room.code(), error = %e, "saved evaluation setup rejected");
            }
        }

        self.load(&DocumentKey::Scores { host })
    }

    /// Opens a new room with the caller as host
    ///
    /// With `load_existing`, the host's saved quiz and evaluation setup are
    /// installed and the last score snapshot is returned.
    ///
    /// # Errors
    ///
    /// Returns a name error if the host name is rejected.
    pub fn create_room<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        session: SessionId,
        host_name: &str,
        load_existing: bool,
        tunnel_finder: F,
    ) -> Result<Created, Error> {
        let host_name = names::host(host_name)?;

        loop {
            let code = RoomCode::new();
            let Entry::Vacant(entry) = self.rooms.entry(code) else {
                continue;
            };

            let mut room = Room::new(code, session, host_name.clone(), self.store.clone());
            let saved_scores = if load_existing {
                self.restore(&mut room)
            } else {
                None
            };
            let host = room
                .roster()
                .host()
                .map(ParticipantView::from)
                .ok_or(crate::roster::Error::UnknownParticipant)?;

            room.roster()
                .send_state(&room.state_message(session), session, &tunnel_finder);
            entry.insert(room);

            tracing::info!(target: LOG_TARGET, room = %code, host = %host_name, load_existing, "room created");

            return Ok(Created {
                code,
                host,
                saved_scores,
            });
        }
    }

    /// Adds a group or teacher to a room
    ///
    /// # Errors
    ///
    /// Fails if the room does not exist or the join is rejected.
    pub fn join_room<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        code: RoomCode,
        session: SessionId,
        request: &JoinRequest,
        tunnel_finder: F,
    ) -> Result<ParticipantView, Error> {
        self.with_room(code, |room| room.join(session, request, tunnel_finder))
    }

    /// Removes a session from a room, dropping the room once it is empty
    ///
    /// # Errors
    ///
    /// Fails if the room does not exist or the session is not in it.
    pub fn leave_room<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        code: RoomCode,
        session: SessionId,
        tunnel_finder: F,
    ) -> Result<Departure, Error> {
        let departure = self.with_room(code, |room| room.leave(session, tunnel_finder))?;

        if self
            .rooms
            .remove_if(&code, |_, room| room.is_empty())
            .is_some()
        {
            tracing::info!(target: LOG_TARGET, room = %code, "room closed after last participant left");
        }

        Ok(departure)
    }

    /// Re-attaches a reconnecting client to its slot
    ///
    /// # Errors
    ///
    /// Fails if the room does not exist or the slot is not occupied.
    pub fn rebind_session<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        code: RoomCode,
        slot: SlotId,
        session: SessionId,
        tunnel_finder: F,
    ) -> Result<(), Error> {
        self.with_room(code, |room| room.rebind(slot, session, tunnel_finder))
    }

    /// Closes a room on request of its host
    ///
    /// # Errors
    ///
    /// Fails if the room does not exist or the session is not the host.
    pub fn close_room<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        code: RoomCode,
        session: SessionId,
        tunnel_finder: F,
    ) -> Result<(), Error> {
        self.with_room(code, |room| {
            room.roster().require_host(session)?;
            Ok(())
        })?;

        if let Some((_, room)) = self.rooms.remove(&code) {
            tracing::info!(target: LOG_TARGET, room = %code, "room closed by host");
            room.close(tunnel_finder);
        }
        Ok(())
    }

    /// See [`Room::create_quiz`]
    ///
    /// # Errors
    ///
    /// Fails if the room does not exist or the quiz is rejected.
    pub fn create_quiz<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        code: RoomCode,
        session: SessionId,
        quiz: Quiz,
        tunnel_finder: F,
    ) -> Result<bool, Error> {
        self.with_room(code, |room| room.create_quiz(session, quiz, tunnel_finder))
    }

    /// See [`Room::start_quiz`]
    ///
    /// # Errors
    ///
    /// Fails if the room does not exist or the quiz cannot start.
    pub fn start_quiz<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        code: RoomCode,
        session: SessionId,
        tunnel_finder: F,
    ) -> Result<QuestionView, Error> {
        self.with_room(code, |room| room.start_quiz(session, tunnel_finder))
    }

    /// See [`Room::submit_answer`]
    ///
    /// # Errors
    ///
    /// Fails if the room does not exist or the answer is rejected.
    pub fn submit_answer<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        code: RoomCode,
        session: SessionId,
        question: usize,
        option: usize,
        tunnel_finder: F,
    ) -> Result<Recorded, Error> {
        self.with_room(code, |room| {
            room.submit_answer(session, question, option, tunnel_finder)
        })
    }

    /// See [`Room::advance_question`]
    ///
    /// # Errors
    ///
    /// Fails if the room does not exist or no run is active.
    pub fn advance_question<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        code: RoomCode,
        session: SessionId,
        tunnel_finder: F,
    ) -> Result<Advance, Error> {
        self.with_room(code, |room| room.advance_question(session, tunnel_finder))
    }

    /// See [`Room::end_quiz`]
    ///
    /// # Errors
    ///
    /// Fails if the room does not exist or no run is active.
    pub fn end_quiz<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        code: RoomCode,
        session: SessionId,
        tunnel_finder: F,
    ) -> Result<Vec<ParticipantResult>, Error> {
        self.with_room(code, |room| room.end_quiz(session, tunnel_finder))
    }

    /// Quiz state of a room
    ///
    /// # Errors
    ///
    /// Returns [`Error::RoomNotFound`] for unknown rooms.
    pub fn quiz_info(&self, code: RoomCode) -> Result<QuizInfo, Error> {
        self.with_room(code, |room| Ok(room.quiz_info()))
    }

    /// See [`Room::save_evaluation_setup`]
    ///
    /// # Errors
    ///
    /// Fails if the room does not exist or the setup is rejected.
    pub fn save_evaluation_setup(
        &self,
        code: RoomCode,
        session: SessionId,
        setup: EvaluationSetup,
    ) -> Result<bool, Error> {
        self.with_room(code, |room| room.save_evaluation_setup(session, setup))
    }

    /// See [`Room::start_evaluation`]
    ///
    /// # Errors
    ///
    /// Fails if the room does not exist or the setup is rejected.
    pub fn start_evaluation<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        code: RoomCode,
        session: SessionId,
        setup: EvaluationSetup,
        tunnel_finder: F,
    ) -> Result<bool, Error> {
        self.with_room(code, |room| {
            room.start_evaluation(session, setup, tunnel_finder)
        })
    }

    /// See [`Room::submit_host_evaluation`]
    ///
    /// # Errors
    ///
    /// Fails if the room does not exist or the submission is rejected.
    pub fn submit_host_evaluation<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        code: RoomCode,
        session: SessionId,
        submission: &Submission,
        tunnel_finder: F,
    ) -> Result<Phase, Error> {
        self.with_room(code, |room| {
            room.submit_host_evaluation(session, submission, tunnel_finder)
        })
    }

    /// See [`Room::submit_peer_or_teacher_evaluation`]
    ///
    /// # Errors
    ///
    /// Fails if the room does not exist or the submission is rejected.
    pub fn submit_peer_or_teacher_evaluation<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        code: RoomCode,
        session: SessionId,
        submission: &Submission,
        tunnel_finder: F,
    ) -> Result<Phase, Error> {
        self.with_room(code, |room| {
            room.submit_peer_or_teacher_evaluation(session, submission, tunnel_finder)
        })
    }

    /// Scores of every online group in a room
    ///
    /// # Errors
    ///
    /// Returns [`Error::RoomNotFound`] for unknown rooms.
    pub fn current_scores(&self, code: RoomCode) -> Result<Vec<ScoreEntry>, Error> {
        self.with_room(code, |room| Ok(room.current_scores()))
    }

    /// See [`Room::update_player_score`]
    ///
    /// # Errors
    ///
    /// Fails if the room does not exist or the update is rejected.
    pub fn update_player_score<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        code: RoomCode,
        session: SessionId,
        slot: SlotId,
        score: f64,
        tunnel_finder: F,
    ) -> Result<bool, Error> {
        self.with_room(code, |room| {
            room.update_player_score(session, slot, score, tunnel_finder)
        })
    }

    /// See [`Room::save_scores`]
    ///
    /// # Errors
    ///
    /// Fails if the room does not exist or the session is not the host.
    pub fn save_scores(&self, code: RoomCode, session: SessionId) -> Result<bool, Error> {
        self.with_room(code, |room| room.save_scores(session))
    }

    /// Every slot of a room in join order
    ///
    /// # Errors
    ///
    /// Returns [`Error::RoomNotFound`] for unknown rooms.
    pub fn players(&self, code: RoomCode) -> Result<Vec<ParticipantView>, Error> {
        self.with_room(code, |room| Ok(room.players()))
    }

    /// The last score snapshot saved under a host's name
    pub fn load_scores(&self, host_name: &str) -> Option<ScoreSnapshot> {
        self.load(&DocumentKey::Scores {
            host: host_name.to_owned(),
        })
    }

    /// Whether a quiz is saved under a host's name
    pub fn check_quiz(&self, host_name: &str) -> bool {
        let key = DocumentKey::Quiz {
            host: host_name.to_owned(),
        };
        self.store.exists(&key).unwrap_or_else(|e| {
            tracing::warn!(target: LOG_TARGET, path = %key.path(), error = %e, "failed to check document");
            false
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::{collections::BTreeMap, str::FromStr};

    use itertools::Itertools;

    use super::*;
    use crate::{
        evaluation::setup::{Criterion, CriterionId},
        quiz::config::Question,
        resolver::JoinRole,
        room::tests::Outbox,
        roster,
        store::{FileStore, InMemoryStore},
    };

    fn service() -> RoomService {
        RoomService::new(Arc::new(InMemoryStore::default()))
    }

    fn open_room(service: &RoomService, code: &str, host: SessionId) -> RoomCode {
        let code = RoomCode::from_str(code).unwrap();
        service.rooms.insert(
            code,
            Room::new(code, host, "Teacher1".to_owned(), service.store.clone()),
        );
        code
    }

    fn join_group(
        service: &RoomService,
        code: RoomCode,
        number: u8,
        name: &str,
        outbox: &Outbox,
    ) -> SessionId {
        let session = SessionId::new();
        service
            .join_room(
                code,
                session,
                &JoinRequest {
                    role: JoinRole::Group { number },
                    name: name.to_owned(),
                },
                outbox.finder(),
            )
            .unwrap();
        session
    }

    fn two_questions() -> Quiz {
        Quiz::new(vec![
            Question::new(
                "Which planet is largest?",
                vec!["Mars".to_owned(), "Jupiter".to_owned(), "Venus".to_owned()],
                1,
            ),
            Question::new(
                "How many sides does a hexagon have?",
                vec!["5".to_owned(), "6".to_owned(), "8".to_owned()],
                1,
            ),
        ])
    }

    #[test]
    fn test_create_room_assigns_unique_codes() {
        let service = service();
        let outbox = Outbox::default();
        let codes = (0..20)
            .map(|_| {
                service
                    .create_room(SessionId::new(), "Teacher1", false, outbox.finder())
                    .unwrap()
                    .code
            })
            .unique()
            .count();
        assert_eq!(codes, 20);
        assert_eq!(service.room_count(), 20);
    }

    #[test]
    fn test_create_room_validates_host_name() {
        let service = service();
        let outbox = Outbox::default();
        assert_eq!(
            service.create_room(SessionId::new(), "   ", false, outbox.finder()),
            Err(Error::Name(names::Error::Empty))
        );
        assert_eq!(service.room_count(), 0);
    }

    #[test]
    fn test_unknown_room() {
        let service = service();
        let outbox = Outbox::default();
        let code = RoomCode::from_str("ZZZ999").unwrap();
        assert_eq!(
            service.join_room(
                code,
                SessionId::new(),
                &JoinRequest {
                    role: JoinRole::Teacher,
                    name: "Lan".to_owned(),
                },
                outbox.finder()
            ),
            Err(Error::RoomNotFound(code))
        );
        assert_eq!(service.quiz_info(code), Err(Error::RoomNotFound(code)));
    }

    #[test]
    fn test_fifth_group_is_rejected() {
        let service = service();
        let outbox = Outbox::default();
        let code = open_room(&service, "ABC123", SessionId::new());
        for number in 1..=4 {
            join_group(&service, code, number, "Team", &outbox);
        }
        assert_eq!(
            service.join_room(
                code,
                SessionId::new(),
                &JoinRequest {
                    role: JoinRole::Group { number: 2 },
                    name: "Late".to_owned(),
                },
                outbox.finder()
            ),
            Err(Error::Roster(roster::Error::RoomFull))
        );
    }

    #[test]
    fn test_room_is_dropped_when_empty() {
        let service = service();
        let outbox = Outbox::default();
        let host = SessionId::new();
        let code = open_room(&service, "ABC123", host);
        let group = join_group(&service, code, 1, "Falcons", &outbox);

        let departure = service.leave_room(code, host, outbox.finder()).unwrap();
        assert_eq!(departure.promoted, service.players(code).unwrap().iter().find(|p| p.is_host).map(|p| p.slot));
        assert!(service.contains(code));

        service.leave_room(code, group, outbox.finder()).unwrap();
        assert!(!service.contains(code));
    }

    #[test]
    fn test_close_room_requires_host() {
        let service = service();
        let outbox = Outbox::default();
        let host = SessionId::new();
        let code = open_room(&service, "ABC123", host);
        let group = join_group(&service, code, 1, "Falcons", &outbox);

        assert_eq!(
            service.close_room(code, group, outbox.finder()),
            Err(Error::Roster(roster::Error::NotHost))
        );
        service.close_room(code, host, outbox.finder()).unwrap();
        assert!(!service.contains(code));
        assert_eq!(outbox.closed().len(), 2);
    }

    #[test]
    fn test_load_existing_restores_quiz_and_scores() {
        let service = service();
        let outbox = Outbox::default();
        let host = SessionId::new();
        let code = open_room(&service, "ABC123", host);
        let group = join_group(&service, code, 1, "Falcons", &outbox);
        service
            .create_quiz(code, host, two_questions(), outbox.finder())
            .unwrap();
        let slot = service.players(code).unwrap()[1].slot;
        service
            .update_player_score(code, host, slot, 12., outbox.finder())
            .unwrap();
        assert!(service.check_quiz("Teacher1"));
        assert!(!service.check_quiz("Teacher2"));

        let created = service
            .create_room(SessionId::new(), "Teacher1", true, outbox.finder())
            .unwrap();
        assert!(service.quiz_info(created.code).unwrap().has_quiz);
        let saved = created.saved_scores.unwrap();
        assert_eq!(saved.score_of("Group 1 - Falcons"), Some(12.));
        assert_eq!(service.load_scores("Teacher1"), Some(saved));

        // The group moves to the new room and picks its score back up
        service.leave_room(code, group, outbox.finder()).unwrap();
        let moved = service
            .join_room(
                created.code,
                SessionId::new(),
                &JoinRequest {
                    role: JoinRole::Group { number: 1 },
                    name: "Falcons".to_owned(),
                },
                outbox.finder(),
            )
            .unwrap();
        assert_eq!(moved.score, 12.);
    }

    #[test]
    fn test_rooms_persist_to_files() {
        let root = std::env::temp_dir().join(format!("quizroom-{}", uuid::Uuid::new_v4()));
        let service = RoomService::new(Arc::new(FileStore::new(&root)));
        let outbox = Outbox::default();
        let host = SessionId::new();
        let code = open_room(&service, "ABC123", host);
        join_group(&service, code, 1, "Falcons", &outbox);

        assert_eq!(service.save_scores(code, host), Ok(true));
        assert!(root.join("scores/teacher1-scores.json").is_file());

        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_classroom_scenario() {
        let service = service();
        let outbox = Outbox::default();
        let host = SessionId::new();
        let code = open_room(&service, "ABC123", host);

        let groups = (1..=4)
            .map(|n| join_group(&service, code, n, &format!("Group{n}"), &outbox))
            .collect_vec();

        service
            .create_quiz(code, host, two_questions(), outbox.finder())
            .unwrap();
        let first = service.start_quiz(code, host, outbox.finder()).unwrap();
        assert_eq!(first.time_limit, 30);

        service
            .submit_answer(code, groups[0], 0, 1, outbox.finder())
            .unwrap();
        service
            .submit_answer(code, groups[1], 0, 1, outbox.finder())
            .unwrap();
        service
            .submit_answer(code, groups[2], 0, 0, outbox.finder())
            .unwrap();
        service
            .advance_question(code, host, outbox.finder())
            .unwrap();
        for group in &groups {
            service
                .submit_answer(code, *group, 1, 2, outbox.finder())
                .unwrap();
        }

        let results = service.end_quiz(code, host, outbox.finder()).unwrap();
        let totals = results
            .iter()
            .map(|r| (r.name.as_str(), r.score))
            .collect_vec();
        assert_eq!(
            totals,
            vec![
                ("Group 1 - Group1", 5),
                ("Group 2 - Group2", 4),
                ("Group 3 - Group3", 0),
                ("Group 4 - Group4", 0),
            ]
        );

        let setup = EvaluationSetup {
            host_criteria: vec![Criterion::new("content", "Content", 40.)],
            member_criteria: vec![Criterion::new("teamwork", "Teamwork", 20.)],
            levels: vec![],
        };
        service
            .start_evaluation(code, host, setup, outbox.finder())
            .unwrap();

        let slots = service
            .current_scores(code)
            .unwrap()
            .iter()
            .map(|s| s.slot)
            .collect_vec();
        let submission: Submission = slots
            .iter()
            .map(|slot| (*slot, BTreeMap::from([(CriterionId::new("content"), 4)])))
            .collect();
        assert_eq!(
            service.submit_host_evaluation(code, host, &submission, outbox.finder()),
            Ok(Phase::Peers)
        );
        // A retried host submission is not applied twice
        assert_eq!(
            service.submit_host_evaluation(code, host, &submission, outbox.finder()),
            Err(Error::Evaluation(crate::evaluation::Error::WrongPhase(Phase::Peers)))
        );

        let scores = service
            .current_scores(code)
            .unwrap()
            .into_iter()
            .map(|s| s.score)
            .collect_vec();
        assert_eq!(scores, vec![45., 44., 40., 40.]);

        let saved = service.load_scores("Teacher1").unwrap();
        assert_eq!(saved.room_code, code);
        assert_eq!(
            saved.scores.iter().map(|s| s.score).collect_vec(),
            vec![45., 44., 40., 40.]
        );
    }
}
