use std::{fmt, sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::{
    Actor, ActorContext, Arguments, Command, CommandHandle, Error, Event, EventStream, Recorder,
    Response, Result, SessionConfig, command,
    log::{Closure, EventLog},
};

/// Lifecycle state of a [`Session`].
///
/// ```text
/// Created -> Binding -> Active -> Closing -> Closed
///               |          |
///               +----------+--> Failed
/// ```
///
/// `Failed` and `Closed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Created,
    Binding,
    Active,
    Closing,
    Closed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Created => "created",
            SessionState::Binding => "binding",
            SessionState::Active => "active",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Owns one actor under test and the event log it reports into.
///
/// Opening a session installs the actor and blocks until it reports the
/// configured readiness event. Closing it (explicitly, on drop, or at the end
/// of [`Session::scope`]) releases every blocked waiter, uninstalls the actor
/// and audits command correlations. Teardown runs on every exit path.
///
/// # Example
///
/// ```rust,ignore
/// let session = Session::open(SessionConfig::default(), Keyboard::new())?;
/// let mut stream = session.open_stream();
///
/// let text = session.call("getTextBeforeCursor", Arguments::new().with("n", 5), TIMEOUT)?;
/// assert_eq!(text.return_value().and_then(Value::as_str), Some("hello"));
///
/// stream.expect_event("onUpdateSelection", TIMEOUT)?;
/// session.close()
/// ```
pub struct Session {
    config: SessionConfig,
    log: Arc<EventLog>,
    state: Mutex<SessionState>,
    actor: Mutex<Box<dyn Actor>>,
    issued: Mutex<Vec<CommandHandle>>,
    /// Held for the whole of `close`, so concurrent callers return only
    /// after teardown finished.
    closing: Mutex<()>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("actor", &self.config.actor_name())
            .field("state", &self.state())
            .field("log", &self.log)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Install `actor` and wait for it to become ready.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionBind`] if install fails or the readiness event
    /// does not arrive within the bind timeout. The actor is uninstalled
    /// before the error is returned.
    pub fn open<A: Actor>(config: SessionConfig, actor: A) -> Result<Self> {
        let session = Self {
            log: Arc::new(EventLog::with_capacity(config.log_capacity())),
            config,
            state: Mutex::new(SessionState::Created),
            actor: Mutex::new(Box::new(actor)),
            issued: Mutex::new(Vec::new()),
            closing: Mutex::new(()),
        };
        session.bind()?;
        Ok(session)
    }

    /// Open a session, run `body`, and close the session whatever happens.
    ///
    /// The first failure wins: an error from `body` is returned even if
    /// closing fails too. A panic in `body` still closes the session on
    /// unwind.
    pub fn scope<A, R, F>(config: SessionConfig, actor: A, body: F) -> Result<R>
    where
        A: Actor,
        F: FnOnce(&Session) -> Result<R>,
    {
        let session = Session::open(config, actor)?;
        let result = body(&session);
        let closed = session.close();
        match result {
            Ok(value) => closed.map(|()| value),
            Err(e) => {
                if let Err(close_error) = closed {
                    tracing::warn!(
                        actor = %session.config.actor_name(),
                        error = %close_error,
                        "close failed after test body error"
                    );
                }
                Err(e)
            }
        }
    }

    fn bind(&self) -> Result<()> {
        self.transition(SessionState::Binding);
        let mut ready = EventStream::new(self.log.clone(), 0);
        let ctx = ActorContext::new(
            self.config.actor_name().to_owned(),
            self.recorder(),
            self.config.actor_settings().clone(),
        );

        let installed = self.actor.lock().install(&ctx);
        let bound = installed.and_then(|()| {
            ready
                .expect_event(self.config.ready_event().clone(), self.config.bind_timeout())
                .map(|_| ())
        });

        match bound {
            Ok(()) => {
                self.transition(SessionState::Active);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    actor = %self.config.actor_name(),
                    error = %e,
                    "actor failed to bind"
                );
                // Teardown errors were already logged; the bind failure is what surfaces.
                let _ = self.teardown();
                self.transition(SessionState::Failed);
                let timeout = matches!(e, Error::Timeout { .. }).then(|| self.config.bind_timeout());
                Err(Error::SessionBind {
                    actor: self.config.actor_name().to_owned(),
                    timeout,
                    reason: e.to_string(),
                })
            }
        }
    }

    fn transition(&self, next: SessionState) {
        let mut state = self.state.lock();
        tracing::debug!(
            actor = %self.config.actor_name(),
            from = %*state,
            to = %next,
            "session state changed"
        );
        *state = next;
    }

    /// Current lifecycle state. Reports `Failed` as soon as the actor
    /// reported a failure, before the session is closed.
    pub fn state(&self) -> SessionState {
        let state = *self.state.lock();
        if state == SessionState::Active
            && matches!(self.log.closure(), Some(Closure::Failed(_)))
        {
            return SessionState::Failed;
        }
        state
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    fn ensure_active(&self) -> Result<()> {
        if let Some(closure) = self.log.closure() {
            return Err(closure.to_error());
        }
        match self.state() {
            SessionState::Active => Ok(()),
            _ => Err(Error::SessionClosed),
        }
    }

    #[cfg_attr(not(feature = "tokio"), allow(dead_code))]
    pub(crate) fn log(&self) -> &Arc<EventLog> {
        &self.log
    }

    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// A producer handle to this session's log.
    pub fn recorder(&self) -> Recorder {
        Recorder::new(self.log.clone())
    }

    /// A stream positioned at the current end of the log: it observes only
    /// events appended from now on.
    pub fn open_stream(&self) -> EventStream {
        EventStream::new(self.log.clone(), self.log.len())
    }

    /// A stream that replays the log from its first event.
    pub fn open_stream_from_start(&self) -> EventStream {
        EventStream::new(self.log.clone(), 0)
    }

    /// Send `command` to the actor.
    ///
    /// # Errors
    ///
    /// [`Error::SessionClosed`] or [`Error::ActorFailed`] if the session is
    /// no longer active, or whatever the actor's command channel returns.
    pub fn send(&self, command: Command) -> Result<CommandHandle> {
        self.ensure_active()?;
        let handle = CommandHandle {
            id: command.id(),
            name: command.name().to_owned(),
            issued_at: self.log.len(),
        };
        self.actor
            .lock()
            .send_command(&command)
            .map_err(|e| match e {
                Error::CommandsUnsupported(_) => {
                    Error::CommandsUnsupported(self.config.actor_name().to_owned())
                }
                other => other,
            })?;
        tracing::debug!(command = %command.name(), id = %command.id(), "command sent");
        self.issued.lock().push(handle.clone());
        Ok(handle)
    }

    /// Build a command with a fresh id and send it.
    pub fn send_command(&self, name: impl Into<String>, arguments: Arguments) -> Result<CommandHandle> {
        self.send(Command::new(name, arguments))
    }

    /// Wait for the single response to `handle`.
    ///
    /// Independent of any stream: the whole log from the moment the command
    /// was sent is searched, and nothing is consumed.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`], [`Error::AmbiguousCorrelation`], or the session
    /// closure.
    pub fn await_response(&self, handle: &CommandHandle, timeout: Duration) -> Result<Response> {
        command::resolve(&self.log, handle, handle.issued_at, timeout).map(|(_, response)| response)
    }

    /// Send a command and wait for its response.
    pub fn call(
        &self,
        name: impl Into<String>,
        arguments: Arguments,
        timeout: Duration,
    ) -> Result<Response> {
        let handle = self.send_command(name, arguments)?;
        self.await_response(&handle, timeout)
    }

    /// Copy of every event recorded so far.
    pub fn events(&self) -> Vec<Arc<Event>> {
        self.log.snapshot()
    }

    /// Human-readable rendering of the whole log.
    pub fn dump(&self) -> String {
        self.log.render(None)
    }

    /// Close the session. Idempotent.
    ///
    /// A call made while another thread is closing the session blocks until
    /// that teardown has finished, then returns `Ok(())`.
    ///
    /// Blocked waiters return [`Error::SessionClosed`] (or
    /// [`Error::ActorFailed`] if the actor failed first). The actor is then
    /// uninstalled; events it reports while shutting down are still recorded.
    /// Afterwards the log rejects appends but stays readable.
    ///
    /// # Errors
    ///
    /// In order of precedence: the actor's uninstall error, an
    /// [`Error::AmbiguousCorrelation`] found by the final audit of sent
    /// commands, or [`Error::ActorFailed`] if the actor reported a failure.
    pub fn close(&self) -> Result<()> {
        let _closing = self.closing.lock();
        {
            let mut state = self.state.lock();
            if matches!(*state, SessionState::Closing) || state.is_terminal() {
                return Ok(());
            }
            tracing::debug!(
                actor = %self.config.actor_name(),
                from = %*state,
                to = %SessionState::Closing,
                "session state changed"
            );
            *state = SessionState::Closing;
        }

        let uninstalled = self.teardown();
        let audited = self.audit();
        let failure = match self.log.closure() {
            Some(Closure::Failed(reason)) => Some(reason),
            _ => None,
        };
        self.transition(if failure.is_some() {
            SessionState::Failed
        } else {
            SessionState::Closed
        });

        uninstalled?;
        audited?;
        match failure {
            Some(reason) => Err(Error::ActorFailed(reason)),
            None => Ok(()),
        }
    }

    fn teardown(&self) -> Result<()> {
        self.log.close(Closure::Closed);
        let uninstalled = self.actor.lock().uninstall();
        if let Err(e) = &uninstalled {
            tracing::warn!(
                actor = %self.config.actor_name(),
                error = %e,
                "actor teardown failed"
            );
        }
        self.log.seal();
        uninstalled
    }

    /// Check that no sent command collected a second response, including
    /// duplicates that arrived after the first was consumed.
    fn audit(&self) -> Result<()> {
        let issued = self.issued.lock();
        for handle in issued.iter() {
            command::ensure_unique(&self.log, handle)?;
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(
                actor = %self.config.actor_name(),
                error = %e,
                "session close on drop failed"
            );
        }
    }
}
