use crate::actors::messages::{
    ActorError, AppError, Responder, SessionId, SupervisorMessage,
};
use crate::brain::catalog::{Category, QuickTopic};
use crate::brain::orchestrator::{Orchestrator, SessionSnapshot, TurnReply};
use crate::brain::trend::TrendSummary;
use crate::models::MoodEntry;
use crate::session::SessionStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};
use tracing::{error, info, info_span, instrument, warn};

const MAILBOX_SIZE: usize = 32;

/// A handle to the `SupervisorActor`.
///
/// The supervisor owns every live session. Requests for the same session are
/// handled one at a time in arrival order, so a session is never mutated
/// concurrently.
#[derive(Clone)]
pub struct SupervisorHandle {
    sender: mpsc::Sender<SupervisorMessage>,
    request_timeout: Duration,
}

impl SupervisorHandle {
    /// Spawns the supervisor and returns a handle to it.
    ///
    /// # Arguments
    ///
    /// * `orchestrator` - The engine every session is run through.
    /// * `rng_seed` - Fixed seed for reproducible replies. Each session gets its
    ///   own generator derived from it; `None` seeds from entropy.
    /// * `request_timeout` - Upper bound on a single request.
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        rng_seed: Option<u64>,
        request_timeout: Duration,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(MAILBOX_SIZE);
        let actor = SupervisorRunner::new(receiver, orchestrator, rng_seed);
        tokio::spawn(async move { actor.run().await });
        Self {
            sender,
            request_timeout,
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Responder<T>) -> SupervisorMessage,
    ) -> Result<T, AppError> {
        let (send, recv) = oneshot::channel();
        self.sender
            .send(build(send))
            .await
            .map_err(|e| ActorError::Unavailable(e.to_string()))?;
        timeout(self.request_timeout, recv)
            .await?
            .map_err(|e| ActorError::NoReply(e.to_string()))?
    }

    /// Opens a session. Returns its id and the welcome message.
    #[instrument(skip(self))]
    pub async fn open_session(&self) -> Result<(SessionId, String), AppError> {
        self.request(|responder| SupervisorMessage::OpenSession { responder })
            .await
    }

    /// Processes a user message from a specific session.
    #[instrument(skip(self, content))]
    pub async fn process_message(
        &self,
        session_id: SessionId,
        content: String,
    ) -> Result<TurnReply, AppError> {
        self.request(|responder| SupervisorMessage::ProcessUserMessage {
            session_id,
            content,
            responder,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn quick_topic(
        &self,
        session_id: SessionId,
        topic: QuickTopic,
    ) -> Result<TurnReply, AppError> {
        self.request(|responder| SupervisorMessage::QuickTopic {
            session_id,
            topic,
            responder,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn help_now(&self, session_id: SessionId) -> Result<String, AppError> {
        self.request(|responder| SupervisorMessage::HelpNow {
            session_id,
            responder,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn record_mood(
        &self,
        session_id: SessionId,
        mood: i32,
        stress: i32,
        category: Category,
        crisis: bool,
    ) -> Result<MoodEntry, AppError> {
        self.request(|responder| SupervisorMessage::RecordMood {
            session_id,
            mood,
            stress,
            category,
            crisis,
            responder,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn trends(&self, session_id: SessionId) -> Result<TrendSummary, AppError> {
        self.request(|responder| SupervisorMessage::Trends {
            session_id,
            responder,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn reset_session(&self, session_id: SessionId) -> Result<String, AppError> {
        self.request(|responder| SupervisorMessage::ResetSession {
            session_id,
            responder,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn snapshot(&self, session_id: SessionId) -> Result<SessionSnapshot, AppError> {
        self.request(|responder| SupervisorMessage::Snapshot {
            session_id,
            responder,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn close_session(&self, session_id: SessionId) -> Result<(), AppError> {
        self.request(|responder| SupervisorMessage::CloseSession {
            session_id,
            responder,
        })
        .await
    }

    /// Stops the supervisor. Pending and later requests fail with an actor error.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        self.sender
            .send(SupervisorMessage::Shutdown)
            .await
            .map_err(|e| ActorError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

// --- Actor Runner ---

/// Per-session state: the store plus its own generator.
struct SessionState {
    store: SessionStore,
    rng: StdRng,
}

struct SupervisorRunner {
    receiver: mpsc::Receiver<SupervisorMessage>,
    orchestrator: Arc<Orchestrator>,
    sessions: HashMap<SessionId, SessionState>,
    rng_seed: Option<u64>,
    opened: u64,
}

impl SupervisorRunner {
    fn new(
        receiver: mpsc::Receiver<SupervisorMessage>,
        orchestrator: Arc<Orchestrator>,
        rng_seed: Option<u64>,
    ) -> Self {
        Self {
            receiver,
            orchestrator,
            sessions: HashMap::new(),
            rng_seed,
            opened: 0,
        }
    }

    async fn run(mut self) {
        info!("Supervisor started");
        while let Some(msg) = self.receiver.recv().await {
            if let SupervisorMessage::Shutdown = msg {
                info!("Supervisor shutting down...");
                break;
            }
            self.handle_message(msg);
        }
        info!(sessions = self.sessions.len(), "Supervisor stopped");
    }

    /// Generator for the next session. With a fixed seed, the n-th session of
    /// a run always gets the same stream.
    fn session_rng(&mut self) -> StdRng {
        self.opened += 1;
        match self.rng_seed {
            Some(seed) => {
                StdRng::seed_from_u64(seed ^ self.opened.wrapping_mul(0x9E37_79B9_7F4A_7C15))
            }
            None => StdRng::from_entropy(),
        }
    }

    /// Runs `f` on a live session inside a span carrying its id.
    fn with_session<T>(
        &mut self,
        session_id: SessionId,
        f: impl FnOnce(&Orchestrator, &mut SessionState) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let _span = info_span!("session", %session_id).entered();
        let state = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| ActorError::UnknownSession(session_id.to_string()))?;
        f(&self.orchestrator, state)
    }

    #[instrument(skip(self, msg))]
    fn handle_message(&mut self, msg: SupervisorMessage) {
        match msg {
            SupervisorMessage::OpenSession { responder } => {
                let session_id = SessionId::new();
                let store = self.orchestrator.new_session();
                let welcome = self.orchestrator.catalog().texts().welcome.clone();
                let rng = self.session_rng();
                self.sessions.insert(session_id, SessionState { store, rng });
                info!(%session_id, "Session opened");
                let _ = responder.send(Ok((session_id, welcome)));
            }
            SupervisorMessage::ProcessUserMessage {
                session_id,
                content,
                responder,
            } => {
                let result = self.with_session(session_id, |orchestrator, state| {
                    orchestrator.process_turn(&mut state.store, &content, &mut state.rng)
                });
                reply(responder, result, "processing user message");
            }
            SupervisorMessage::QuickTopic {
                session_id,
                topic,
                responder,
            } => {
                let result = self.with_session(session_id, |orchestrator, state| {
                    orchestrator.quick_topic(&mut state.store, topic, &mut state.rng)
                });
                reply(responder, result, "running quick topic");
            }
            SupervisorMessage::HelpNow {
                session_id,
                responder,
            } => {
                let result = self.with_session(session_id, |orchestrator, state| {
                    Ok(orchestrator.help_now(&mut state.store))
                });
                reply(responder, result, "serving help now");
            }
            SupervisorMessage::RecordMood {
                session_id,
                mood,
                stress,
                category,
                crisis,
                responder,
            } => {
                let result = self.with_session(session_id, |orchestrator, state| {
                    Ok(orchestrator.record_mood_entry(
                        &mut state.store,
                        mood,
                        stress,
                        category,
                        crisis,
                    ))
                });
                reply(responder, result, "recording mood");
            }
            SupervisorMessage::Trends {
                session_id,
                responder,
            } => {
                let result = self.with_session(session_id, |orchestrator, state| {
                    Ok(orchestrator.trends(&state.store))
                });
                reply(responder, result, "computing trends");
            }
            SupervisorMessage::ResetSession {
                session_id,
                responder,
            } => {
                let result = self.with_session(session_id, |orchestrator, state| {
                    orchestrator.reset_session(&mut state.store);
                    Ok(orchestrator.catalog().texts().welcome.clone())
                });
                reply(responder, result, "resetting session");
            }
            SupervisorMessage::Snapshot {
                session_id,
                responder,
            } => {
                let result = self.with_session(session_id, |orchestrator, state| {
                    Ok(orchestrator.snapshot(&session_id.to_string(), &state.store))
                });
                reply(responder, result, "taking snapshot");
            }
            SupervisorMessage::CloseSession {
                session_id,
                responder,
            } => {
                let result: Result<(), AppError> = match self.sessions.remove(&session_id) {
                    Some(_) => {
                        info!(%session_id, "Session closed");
                        Ok(())
                    }
                    None => Err(ActorError::UnknownSession(session_id.to_string()).into()),
                };
                reply(responder, result, "closing session");
            }
            SupervisorMessage::Shutdown => {}
        }
    }
}

fn reply<T>(responder: Responder<T>, result: Result<T, AppError>, action: &str) {
    if let Err(e) = &result {
        error!("Error {}: {}", action, e);
    }
    if responder.send(result).is_err() {
        warn!("Requester went away before the reply ({})", action);
    }
}
