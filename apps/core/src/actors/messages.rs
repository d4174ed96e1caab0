use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::brain::catalog::{Category, QuickTopic};
use crate::brain::orchestrator::{SessionSnapshot, TurnReply};
use crate::brain::trend::TrendSummary;
use crate::models::MoodEntry;

/// Defines errors that can occur within the actor system.
#[derive(Debug, thiserror::Error, Serialize, Clone)]
pub enum ActorError {
    /// The supervisor mailbox is closed.
    #[error("Supervisor unavailable: {0}")]
    Unavailable(String),
    /// The supervisor dropped a request without answering.
    #[error("No reply from supervisor: {0}")]
    NoReply(String),
    /// A request named a session the supervisor does not know.
    #[error("Unknown session: {0}")]
    UnknownSession(String),
    /// An error indicating that an actor operation timed out.
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl From<tokio::time::error::Elapsed> for ActorError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        ActorError::Timeout(format!("Actor operation timed out: {}", err))
    }
}

// Re-export AppError for convenience
pub use crate::error::AppError;

/// Opaque handle naming one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SessionId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Channel a supervisor request answers on.
pub type Responder<T> = oneshot::Sender<Result<T, AppError>>;

/// Messages that can be sent to the `SupervisorActor`.
#[derive(Debug)]
pub enum SupervisorMessage {
    /// Opens a session and returns its id plus the welcome message.
    OpenSession {
        responder: Responder<(SessionId, String)>,
    },
    /// Runs one user turn.
    ProcessUserMessage {
        session_id: SessionId,
        content: String,
        responder: Responder<TurnReply>,
    },
    /// Runs the canned prompt for a quick topic as a turn.
    QuickTopic {
        session_id: SessionId,
        topic: QuickTopic,
        responder: Responder<TurnReply>,
    },
    /// Returns the emergency contacts message.
    HelpNow {
        session_id: SessionId,
        responder: Responder<String>,
    },
    /// Records a mood/stress entry reported by the user.
    RecordMood {
        session_id: SessionId,
        mood: i32,
        stress: i32,
        category: Category,
        crisis: bool,
        responder: Responder<MoodEntry>,
    },
    /// Current trends for a session.
    Trends {
        session_id: SessionId,
        responder: Responder<TrendSummary>,
    },
    /// Clears a session and returns the fresh welcome message.
    ResetSession {
        session_id: SessionId,
        responder: Responder<String>,
    },
    /// Serializable copy of a session.
    Snapshot {
        session_id: SessionId,
        responder: Responder<SessionSnapshot>,
    },
    /// Drops a session.
    CloseSession {
        session_id: SessionId,
        responder: Responder<()>,
    },
    /// A command to shut down the supervisor.
    Shutdown,
}
