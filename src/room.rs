//! A single quiz room
//!
//! A [`Room`] owns everything that happens under one room code: the roster,
//! the quiz run, the evaluation round and the score ledger. Every operation
//! runs to completion against the in-memory state first; persistence is
//! attempted afterwards and only reported as a `persisted` flag.

use std::{collections::BTreeMap, sync::Arc};

use itertools::Itertools;
use serde::Serialize;
use serde_with::skip_serializing_none;
use web_time::SystemTime;

use crate::{
    accumulator::{Contribution, Ledger, Outcome},
    constants,
    error::Error,
    evaluation::{
        self, Evaluation,
        log::{Source, Submission},
        phase::{Attendance, Phase},
        setup::EvaluationSetup,
        summary::{self, SummaryInput, SummaryRow},
    },
    quiz::{self, QuestionView, QuizInfo, QuizRun, answers::Recorded, config::Quiz, scoring::ParticipantResult},
    resolver::{self, JoinRequest, ScoreOrigin},
    room_code::RoomCode,
    roster::{self, Departure, ParticipantView, Role, RoleKind, Roster, SessionId, SlotId},
    session::Tunnel,
    store::{
        DocumentKey, DocumentStore, DocumentStoreExt,
        documents::{
            LogDocument, QuizDetailDocument, QuizDocument, ResultsDocument, ScoreEntry,
            ScoreSnapshot, SetupDocument,
        },
    },
};

const LOG_TARGET: &str = "quizroom::room";

/// Room messages broadcast to every participant
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// The full participant list after any change
    Roster(Vec<ParticipantView>),
    /// Someone left the room
    Left {
        /// The slot that was vacated
        slot: SlotId,
        /// Display name of whoever left
        name: String,
        /// The slot promoted to host, if the host left
        promoted: Option<SlotId>,
    },
    /// The host set a score by hand
    ScoreUpdated {
        /// The group whose score changed
        slot: SlotId,
        /// Display name
        name: String,
        /// New cumulative score
        score: f64,
    },
}

/// Full room state sent to a single session
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub enum SyncMessage {
    /// Everything a client needs to render the room
    Room {
        /// The room code
        code: RoomCode,
        /// Every slot in join order
        participants: Vec<ParticipantView>,
        /// Quiz state
        quiz: QuizInfo,
        /// Evaluation phase, once a round has been started
        phase: Option<Phase>,
        /// The receiving participant
        you: Option<ParticipantView>,
    },
}

/// What happened when the host moved past a question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The next question is being asked
    Question(QuestionView),
    /// There were no questions left; the quiz was scored
    Ended(Vec<ParticipantResult>),
}

/// A room and all of its state
pub struct Room {
    code: RoomCode,
    host_name: String,
    roster: Roster,
    quiz: QuizRun,
    /// Points from the last finished quiz run
    quiz_points: BTreeMap<SlotId, u64>,
    evaluation: Evaluation,
    ledger: Ledger,
    created_at: SystemTime,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("code", &self.code)
            .field("host_name", &self.host_name)
            .field("roster", &self.roster)
            .field("quiz", &self.quiz)
            .field("evaluation", &self.evaluation)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl Room {
    /// Creates a room with its host and an empty placeholder per group
    ///
    /// `host_name` is expected to be already validated.
    pub fn new(
        code: RoomCode,
        host: SessionId,
        host_name: String,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            code,
            roster: Roster::with_host(host, host_name.clone()),
            host_name,
            quiz: QuizRun::default(),
            quiz_points: BTreeMap::new(),
            evaluation: Evaluation::default(),
            ledger: Ledger::default(),
            created_at: SystemTime::now(),
            store,
        }
    }

    /// The room code
    pub fn code(&self) -> RoomCode {
        self.code
    }

    /// Name of the host who created the room; documents are filed under it
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// When the room was created
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// The participants
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The evaluation state
    pub fn evaluation(&self) -> &Evaluation {
        &self.evaluation
    }

    /// Whether nobody is connected anymore
    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    fn persist<T: Serialize>(&self, key: &DocumentKey, document: &T) -> bool {
        match self.store.save(key, document) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    room = %self.code,
                    path = %key.path(),
                    error = %e,
                    "failed to persist document"
                );
                false
            }
        }
    }

    fn load_snapshot(&self) -> Option<ScoreSnapshot> {
        let key = DocumentKey::Scores {
            host: self.host_name.clone(),
        };
        self.store.load(&key).unwrap_or_else(|e| {
            tracing::warn!(
                target: LOG_TARGET,
                room = %self.code,
                path = %key.path(),
                error = %e,
                "failed to load score snapshot"
            );
            None
        })
    }

    /// Scores of the first groups in slot order
    pub fn score_snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            host_name: self.host_name.clone(),
            room_code: self.code,
            scores: self
                .roster
                .online(RoleKind::Group)
                .sorted_by_key(|p| p.slot())
                .take(constants::room::SNAPSHOT_SIZE)
                .map(|p| ScoreEntry {
                    name: p.name().to_owned(),
                    score: p.score(),
                    slot: p.slot(),
                })
                .collect_vec(),
            saved_at: SystemTime::now(),
        }
    }

    fn persist_scores(&self) -> bool {
        self.persist(
            &DocumentKey::Scores {
                host: self.host_name.clone(),
            },
            &self.score_snapshot(),
        )
    }

    fn persist_log(&self) -> bool {
        self.persist(
            &DocumentKey::EvaluationLog {
                host: self.host_name.clone(),
                room: self.code,
            },
            &LogDocument {
                room_code: self.code,
                round: self.evaluation.round(),
                log: self.evaluation.log().clone(),
                saved_at: SystemTime::now(),
            },
        )
    }

    fn persist_setup(&self, setup: &EvaluationSetup) -> bool {
        self.persist(
            &DocumentKey::EvaluationSetup {
                host: self.host_name.clone(),
            },
            &SetupDocument {
                setup: setup.clone(),
                saved_at: SystemTime::now(),
            },
        )
    }

    fn announce_roster<T: Tunnel, F: Fn(SessionId) -> Option<T>>(&self, tunnel_finder: F) {
        self.roster.announce(
            &UpdateMessage::Roster(self.roster.views()).into(),
            tunnel_finder,
        );
    }

    fn attendance(&self) -> Attendance {
        Attendance {
            groups: self.roster.scorable(),
            teachers: self
                .roster
                .online(RoleKind::Teacher)
                .map(roster::Participant::slot)
                .collect_vec(),
        }
    }

    /// Full state for one session
    pub fn state_message(&self, session: SessionId) -> crate::SyncMessage {
        SyncMessage::Room {
            code: self.code,
            participants: self.roster.views(),
            quiz: self.quiz.info(),
            phase: (self.evaluation.round() > 0).then_some(self.evaluation.phase()),
            you: self.roster.by_session(session).ok().map(ParticipantView::from),
        }
        .into()
    }

    /// Adds a group or teacher to the room
    ///
    /// The joiner receives the full room state; everyone else sees the new
    /// roster.
    ///
    /// # Errors
    ///
    /// See [`resolver::resolve_join`].
    pub fn join<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &mut self,
        session: SessionId,
        request: &JoinRequest,
        tunnel_finder: F,
    ) -> Result<ParticipantView, Error> {
        let saved = self.load_snapshot();
        let joined = resolver::resolve_join(
            &mut self.roster,
            session,
            request,
            saved.as_ref(),
        )?;

        tracing::debug!(
            target: LOG_TARGET,
            room = %self.code,
            slot = %joined.participant.slot,
            name = %joined.participant.name,
            restored = joined.origin != ScoreOrigin::Fresh,
            "participant joined"
        );

        self.roster
            .send_state(&self.state_message(session), session, &tunnel_finder);
        self.announce_roster(&tunnel_finder);

        Ok(joined.participant)
    }

    /// Removes a session from the room
    ///
    /// Leaving can complete the current evaluation phase, since only online
    /// participants are waited for.
    ///
    /// # Errors
    ///
    /// Returns `roster::Error::UnknownParticipant` if the session is not in
    /// the room.
    pub fn leave<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &mut self,
        session: SessionId,
        tunnel_finder: F,
    ) -> Result<Departure, Error> {
        let departure = self.roster.vacate(session)?;

        tracing::debug!(
            target: LOG_TARGET,
            room = %self.code,
            slot = %departure.slot,
            name = %departure.name,
            promoted = ?departure.promoted,
            "participant left"
        );

        self.roster.announce(
            &UpdateMessage::Left {
                slot: departure.slot,
                name: departure.name.clone(),
                promoted: departure.promoted,
            }
            .into(),
            &tunnel_finder,
        );
        self.announce_roster(&tunnel_finder);

        let attendance = self.attendance();
        if let Some(phase) = self.evaluation.advance_phase_if_complete(&attendance) {
            self.phase_changed(phase, &tunnel_finder);
        }

        Ok(departure)
    }

    /// Attaches a new transport session to an occupied slot
    ///
    /// # Errors
    ///
    /// See [`Roster::rebind`].
    pub fn rebind<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &mut self,
        slot: SlotId,
        session: SessionId,
        tunnel_finder: F,
    ) -> Result<(), Error> {
        self.roster.rebind(slot, session)?;
        self.roster
            .send_state(&self.state_message(session), session, tunnel_finder);
        Ok(())
    }

    /// Installs a quiz loaded from storage without resetting anything
    ///
    /// # Errors
    ///
    /// Returns [`quiz::Error::Invalid`] if the stored quiz no longer validates.
    pub fn restore_quiz(&mut self, quiz: Quiz) -> Result<(), Error> {
        Ok(self.quiz.replace(quiz)?)
    }

    /// Installs an evaluation setup loaded from storage
    ///
    /// # Errors
    ///
    /// Returns [`evaluation::Error::InvalidSetup`] if it no longer validates.
    pub fn restore_setup(&mut self, setup: EvaluationSetup) -> Result<(), Error> {
        Ok(self.evaluation.save_setup(setup)?)
    }

    /// Zeroes every score and, if an evaluation round was started, restarts it
    fn reset_round<T: Tunnel, F: Fn(SessionId) -> Option<T>>(&mut self, tunnel_finder: F) {
        for slot in self.roster.iter().map(roster::Participant::slot).collect_vec() {
            if let Some(participant) = self.roster.get_mut(slot) {
                participant.set_score(0.);
            }
        }
        self.ledger.clear();
        self.quiz_points.clear();

        if self.evaluation.restart() {
            tracing::info!(
                target: LOG_TARGET,
                room = %self.code,
                round = self.evaluation.round(),
                "evaluation restarted for new quiz round"
            );
            self.persist_log();
            self.roster.announce(
                &evaluation::UpdateMessage::Phase(self.evaluation.phase()).into(),
                tunnel_finder,
            );
        }
    }

    /// Replaces the room's quiz
    ///
    /// Scores are reset and a started evaluation round goes back to the host
    /// phase. Returns whether the quiz was persisted.
    ///
    /// # Errors
    ///
    /// Fails if the session is not the host or the quiz is invalid.
    pub fn create_quiz<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &mut self,
        session: SessionId,
        quiz: Quiz,
        tunnel_finder: F,
    ) -> Result<bool, Error> {
        self.roster.require_host(session)?;
        self.quiz.replace(quiz.clone())?;
        self.reset_round(&tunnel_finder);

        let persisted = self.persist(
            &DocumentKey::Quiz {
                host: self.host_name.clone(),
            },
            &QuizDocument {
                host_name: self.host_name.clone(),
                quiz,
                saved_at: SystemTime::now(),
            },
        );

        self.roster.announce(
            &quiz::UpdateMessage::Created {
                question_count: self.quiz.info().question_count,
            }
            .into(),
            &tunnel_finder,
        );
        self.announce_roster(&tunnel_finder);

        Ok(persisted)
    }

    /// Starts a quiz run at the first question
    ///
    /// # Errors
    ///
    /// Fails if the session is not the host or no quiz exists.
    pub fn start_quiz<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &mut self,
        session: SessionId,
        tunnel_finder: F,
    ) -> Result<QuestionView, Error> {
        self.roster.require_host(session)?;
        let view = self.quiz.start()?;
        self.reset_round(&tunnel_finder);

        tracing::info!(
            target: LOG_TARGET,
            room = %self.code,
            questions = view.count,
            groups = self.roster.online_count(RoleKind::Group),
            "quiz started"
        );

        self.roster
            .announce(&quiz::UpdateMessage::Question(view.clone()).into(), &tunnel_finder);
        self.announce_roster(&tunnel_finder);

        Ok(view)
    }

    /// Records a group's answer
    ///
    /// Duplicates are acknowledged without changing anything.
    ///
    /// # Errors
    ///
    /// Fails if the session is not an online group or the answer is not
    /// acceptable for the current run.
    pub fn submit_answer<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &mut self,
        session: SessionId,
        question: usize,
        option: usize,
        tunnel_finder: F,
    ) -> Result<Recorded, Error> {
        let participant = self.roster.by_session(session)?;
        if !participant.is_scorable() {
            return Err(quiz::Error::NotAGroup.into());
        }
        let slot = participant.slot();

        let recorded = self.quiz.answer(slot, question, option)?;
        if let Recorded::Accepted(_) = recorded {
            self.roster.announce(
                &quiz::UpdateMessage::AnswerCount {
                    answered: self.quiz.answers().answered_count(question),
                    expected: self.roster.online_count(RoleKind::Group),
                }
                .into(),
                tunnel_finder,
            );
        }

        Ok(recorded)
    }

    /// Moves to the next question, ending the quiz after the last one
    ///
    /// # Errors
    ///
    /// Fails if the session is not the host or no run is active.
    pub fn advance_question<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &mut self,
        session: SessionId,
        tunnel_finder: F,
    ) -> Result<Advance, Error> {
        self.roster.require_host(session)?;
        match self.quiz.advance()? {
            Some(view) => {
                self.roster
                    .announce(&quiz::UpdateMessage::Question(view.clone()).into(), tunnel_finder);
                Ok(Advance::Question(view))
            }
            None => self.finish_quiz(tunnel_finder).map(Advance::Ended),
        }
    }

    /// Ends the quiz run and scores it
    ///
    /// # Errors
    ///
    /// Fails if the session is not the host or no run is active.
    pub fn end_quiz<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &mut self,
        session: SessionId,
        tunnel_finder: F,
    ) -> Result<Vec<ParticipantResult>, Error> {
        self.roster.require_host(session)?;
        self.finish_quiz(tunnel_finder)
    }

    fn finish_quiz<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &mut self,
        tunnel_finder: F,
    ) -> Result<Vec<ParticipantResult>, Error> {
        let scorable = self
            .roster
            .online(RoleKind::Group)
            .map(|p| (p.slot(), p.name().to_owned()))
            .collect_vec();
        let results = self.quiz.finish(&scorable)?;

        self.quiz_points = results.points();
        for (slot, points) in &self.quiz_points {
            if let Some(participant) = self.roster.get_mut(*slot) {
                self.ledger
                    .apply(participant, Contribution::Quiz, *points as f64);
            }
        }

        tracing::info!(
            target: LOG_TARGET,
            room = %self.code,
            groups = results.results.len(),
            "quiz ended"
        );

        self.persist(
            &DocumentKey::QuizDetail {
                host: self.host_name.clone(),
                room: self.code,
            },
            &QuizDetailDocument {
                room_code: self.code,
                results: results.results.clone(),
                saved_at: SystemTime::now(),
            },
        );
        self.persist_scores();

        self.roster.announce(
            &quiz::UpdateMessage::Results(results.results.clone()).into(),
            &tunnel_finder,
        );
        self.announce_roster(&tunnel_finder);

        Ok(results.results)
    }

    /// Summary of the quiz state
    pub fn quiz_info(&self) -> QuizInfo {
        self.quiz.info()
    }

    /// Validates and stores criteria without starting a round
    ///
    /// Returns whether the setup was persisted.
    ///
    /// # Errors
    ///
    /// Fails if the session is not the host or the setup is invalid.
    pub fn save_evaluation_setup(
        &mut self,
        session: SessionId,
        setup: EvaluationSetup,
    ) -> Result<bool, Error> {
        self.roster.require_host(session)?;
        self.evaluation.save_setup(setup.clone())?;
        Ok(self.persist_setup(&setup))
    }

    /// Starts a new evaluation round
    ///
    /// The log and the contribution ledger are cleared; cumulative scores
    /// are kept. Returns whether the setup and the empty log were persisted.
    ///
    /// # Errors
    ///
    /// Fails if the session is not the host or the setup is invalid.
    pub fn start_evaluation<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &mut self,
        session: SessionId,
        setup: EvaluationSetup,
        tunnel_finder: F,
    ) -> Result<bool, Error> {
        self.roster.require_host(session)?;
        self.evaluation.start(setup.clone())?;
        self.ledger.clear();

        tracing::info!(
            target: LOG_TARGET,
            room = %self.code,
            round = self.evaluation.round(),
            groups = self.roster.online_count(RoleKind::Group),
            teachers = self.roster.online_count(RoleKind::Teacher),
            "evaluation started"
        );

        let persisted = self.persist_setup(&setup) & self.persist_log();

        self.roster.announce(
            &evaluation::UpdateMessage::Started {
                setup,
                phase: self.evaluation.phase(),
            }
            .into(),
            tunnel_finder,
        );

        Ok(persisted)
    }

    /// Accepts the host's ratings of the groups
    ///
    /// Returns the phase after the submission.
    ///
    /// # Errors
    ///
    /// Fails if the session is not the host or the submission is rejected.
    pub fn submit_host_evaluation<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &mut self,
        session: SessionId,
        submission: &Submission,
        tunnel_finder: F,
    ) -> Result<Phase, Error> {
        self.roster.require_host(session)?;
        self.submit_evaluation(Source::Host, submission, tunnel_finder)
    }

    /// Accepts a group's or a teacher's ratings
    ///
    /// Returns the phase after the submission.
    ///
    /// # Errors
    ///
    /// Fails if the session is neither an online group nor a teacher, or the
    /// submission is rejected.
    pub fn submit_peer_or_teacher_evaluation<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &mut self,
        session: SessionId,
        submission: &Submission,
        tunnel_finder: F,
    ) -> Result<Phase, Error> {
        let participant = self.roster.by_session(session)?;
        let source = match participant.role() {
            Role::Group { .. } if participant.is_scorable() => Source::Peer(participant.slot()),
            Role::Teacher => Source::Teacher(participant.slot()),
            _ => return Err(evaluation::Error::NotPermitted.into()),
        };
        self.submit_evaluation(source, submission, tunnel_finder)
    }

    fn submit_evaluation<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &mut self,
        source: Source,
        submission: &Submission,
        tunnel_finder: F,
    ) -> Result<Phase, Error> {
        let before = self.evaluation.phase();
        let attendance = self.attendance();
        let phase = self.evaluation.submit(source, submission, &attendance)?;

        tracing::debug!(
            target: LOG_TARGET,
            room = %self.code,
            source = ?source,
            targets = submission.len(),
            phase = %phase,
            "evaluation accepted"
        );

        self.apply_contributions(source, submission.keys().copied());
        self.persist_scores();
        self.persist_log();
        self.announce_roster(&tunnel_finder);

        if phase != before {
            self.phase_changed(phase, &tunnel_finder);
        }

        Ok(phase)
    }

    fn apply_contributions(&mut self, source: Source, targets: impl Iterator<Item = SlotId>) {
        let Some(setup) = self.evaluation.setup() else {
            return;
        };
        let log = self.evaluation.log();

        let amounts = targets
            .filter_map(|target| {
                let (category, amount) = match source {
                    Source::Host => (Contribution::HostEval, summary::host_score(log, setup, target)),
                    Source::Peer(_) => {
                        (Contribution::PeerEval, summary::peer_average(log, setup, target))
                    }
                    Source::Teacher(_) => (
                        Contribution::TeacherEval,
                        summary::teacher_average(log, setup, target),
                    ),
                };
                amount.map(|amount| (target, category, amount))
            })
            .collect_vec();

        for (target, category, amount) in amounts {
            let Some(participant) = self.roster.get_mut(target) else {
                continue;
            };
            if let Outcome::Applied { delta } = self.ledger.apply(participant, category, amount) {
                tracing::trace!(
                    target: LOG_TARGET,
                    room = %self.code,
                    slot = %target,
                    category = ?category,
                    delta,
                    "score contribution applied"
                );
            }
        }
    }

    fn phase_changed<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &self,
        phase: Phase,
        tunnel_finder: F,
    ) {
        tracing::info!(target: LOG_TARGET, room = %self.code, phase = %phase, "evaluation phase changed");

        self.roster
            .announce(&evaluation::UpdateMessage::Phase(phase).into(), &tunnel_finder);
        if phase == Phase::Done {
            self.finalize_evaluation(&tunnel_finder);
        }
    }

    /// Rows for every group that is online or was rated this round
    pub fn evaluation_summary(&self) -> Vec<SummaryRow> {
        let Some(setup) = self.evaluation.setup() else {
            return Vec::new();
        };
        let log = self.evaluation.log();
        let targets = log.targets();

        let groups = self
            .roster
            .iter()
            .filter(|p| p.role().kind() == RoleKind::Group)
            .filter(|p| p.is_online() || targets.contains(&p.slot()))
            .map(|p| SummaryInput {
                slot: p.slot(),
                name: if p.is_online() {
                    p.name().to_owned()
                } else {
                    p.vacated_by().unwrap_or(p.name()).to_owned()
                },
                quiz_score: self.quiz_points.get(&p.slot()).copied().unwrap_or(0) as f64,
            })
            .collect_vec();

        summary::build_summary(log, setup, &groups)
    }

    fn finalize_evaluation<T: Tunnel, F: Fn(SessionId) -> Option<T>>(&self, tunnel_finder: F) {
        let rows = self.evaluation_summary();

        self.persist(
            &DocumentKey::EvaluationResults {
                host: self.host_name.clone(),
                room: self.code,
            },
            &ResultsDocument {
                room_code: self.code,
                round: self.evaluation.round(),
                rows: rows.clone(),
                log: self.evaluation.log().clone(),
                saved_at: SystemTime::now(),
            },
        );
        self.persist_log();
        self.persist_scores();

        self.roster
            .announce(&evaluation::UpdateMessage::Results(rows).into(), &tunnel_finder);
        self.roster
            .announce(&evaluation::UpdateMessage::PhaseComplete.into(), &tunnel_finder);
    }

    /// Scores of every online group, in join order
    pub fn current_scores(&self) -> Vec<ScoreEntry> {
        self.roster
            .online(RoleKind::Group)
            .map(|p| ScoreEntry {
                name: p.name().to_owned(),
                score: p.score(),
                slot: p.slot(),
            })
            .collect_vec()
    }

    /// Lets the host overwrite a group's cumulative score
    ///
    /// Returns whether the new scores were persisted.
    ///
    /// # Errors
    ///
    /// Fails if the session is not the host, the slot is not an online
    /// group, or the score is negative or not finite.
    pub fn update_player_score<T: Tunnel, F: Fn(SessionId) -> Option<T>>(
        &mut self,
        session: SessionId,
        slot: SlotId,
        score: f64,
        tunnel_finder: F,
    ) -> Result<bool, Error> {
        self.roster.require_host(session)?;
        if !score.is_finite() || score < 0. {
            return Err(Error::InvalidScore);
        }
        if !self.roster.is_online_group(slot) {
            return Err(roster::Error::UnknownParticipant.into());
        }
        let participant = self
            .roster
            .get_mut(slot)
            .ok_or(roster::Error::UnknownParticipant)?;
        participant.set_score(score);
        let message = UpdateMessage::ScoreUpdated {
            slot,
            name: participant.name().to_owned(),
            score: participant.score(),
        };

        let persisted = self.persist_scores();
        self.roster.announce(&message.into(), tunnel_finder);
        Ok(persisted)
    }

    /// Persists the score snapshot on request of the host
    ///
    /// # Errors
    ///
    /// Fails if the session is not the host.
    pub fn save_scores(&self, session: SessionId) -> Result<bool, Error> {
        self.roster.require_host(session)?;
        Ok(self.persist_scores())
    }

    /// Views of every slot in join order
    pub fn players(&self) -> Vec<ParticipantView> {
        self.roster.views()
    }

    /// Closes every connected tunnel
    pub fn close<T: Tunnel, F: Fn(SessionId) -> Option<T>>(&self, tunnel_finder: F) {
        self.roster.close_all(tunnel_finder);
    }
}
