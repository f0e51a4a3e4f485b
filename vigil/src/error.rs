use std::{sync::Arc, time::Duration};

use crate::{CommandId, Event};

/// The single error type for all Vigil operations.
///
/// Every fallible Vigil API returns `vigil::Result<T>` (alias for
/// `Result<T, vigil::Error>`). The first four variants are assertion
/// failures about the actor under test and are never retried by the engine;
/// the rest describe the session itself.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// No event matched before the deadline. Carries a dump of the log.
    #[error("no event matching {expected} within {timeout:?}\n{dump}")]
    Timeout {
        expected: String,
        timeout: Duration,
        dump: String,
    },

    /// An absence check observed a disallowed event.
    #[error("unexpected event matching {expected}: {event}")]
    FoundUnexpected { expected: String, event: Arc<Event> },

    /// More than one response event carries the same command id.
    #[error("command {id} correlated with {} responses (sequences {sequences:?})", sequences.len())]
    AmbiguousCorrelation { id: CommandId, sequences: Vec<u64> },

    /// The actor never reached the active state during setup. `timeout` is
    /// set only when the readiness event did not arrive in time.
    #[error("actor '{actor}' failed to bind{}: {reason}", within(.timeout))]
    SessionBind {
        actor: String,
        timeout: Option<Duration>,
        reason: String,
    },

    #[error("Session closed")]
    SessionClosed,

    #[error("Actor failed: {0}")]
    ActorFailed(String),

    #[error("Actor '{0}' does not accept commands")]
    CommandsUnsupported(String),

    #[error("External error: {0}")]
    External(#[source] Arc<dyn std::error::Error + Send + Sync>),

    #[error("IO error: {0}")]
    IoError(#[source] Arc<std::io::Error>),

    #[error("Internal Vigil error {0}")]
    Internal(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

fn within(timeout: &Option<Duration>) -> String {
    timeout
        .map(|t| format!(" within {t:?}"))
        .unwrap_or_default()
}

impl Error {
    pub fn external(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::External(Arc::new(e))
    }

    #[cfg_attr(not(feature = "tokio"), allow(dead_code))]
    pub(crate) fn internal(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Internal(Arc::new(e))
    }

    /// True for the variants that report a misbehaving actor or a failed
    /// expectation, as opposed to session plumbing.
    pub fn is_assertion(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. }
                | Error::FoundUnexpected { .. }
                | Error::AmbiguousCorrelation { .. }
                | Error::SessionBind { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(Arc::new(e))
    }
}
