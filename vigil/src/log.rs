use std::{fmt, sync::Arc, time::Instant};

use parking_lot::{Condvar, Mutex};

use crate::{Error, Event, EventRecord, Result};

/// Why a log stopped accepting events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Closure {
    /// The session closed it.
    Closed,
    /// The actor adapter reported a fatal failure.
    Failed(String),
}

impl Closure {
    pub(crate) fn to_error(&self) -> Error {
        match self {
            Closure::Closed => Error::SessionClosed,
            Closure::Failed(reason) => Error::ActorFailed(reason.clone()),
        }
    }
}

struct LogState {
    events: Vec<Arc<Event>>,
    /// Set once waiters must be released.
    closure: Option<Closure>,
    /// Set once appends must be rejected. Always implies `closure`.
    sealed: bool,
}

/// The single append-only event store of a session.
///
/// One mutex guards the event vector; one condition variable wakes every
/// waiter after each append and on closure. Events are handed out as
/// `Arc<Event>`, so readers copy references out under the lock and inspect
/// them after releasing it.
///
/// Shutdown is two-step: [`close`](Self::close) releases waiters while the
/// actor is being torn down and may still report events, then
/// [`seal`](Self::seal) rejects every later append.
pub(crate) struct EventLog {
    state: Mutex<LogState>,
    appended: Condvar,
}

/// Result of waiting for events past a given position.
pub(crate) enum Batch {
    /// Events at `[from, from + events.len())`.
    Events(Vec<Arc<Event>>),
    TimedOut,
    Closed(Closure),
}

impl EventLog {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LogState {
                events: Vec::with_capacity(capacity),
                closure: None,
                sealed: false,
            }),
            appended: Condvar::new(),
        }
    }

    /// Append a record, assigning it the next sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] or [`Error::ActorFailed`] once the log
    /// no longer accepts events.
    pub(crate) fn append(&self, record: EventRecord) -> Result<Arc<Event>> {
        let event = {
            let mut state = self.state.lock();
            if state.sealed {
                return Err(state
                    .closure
                    .as_ref()
                    .map_or(Error::SessionClosed, Closure::to_error));
            }
            let event = Arc::new(record.build(state.events.len() as u64));
            state.events.push(event.clone());
            event
        };
        self.appended.notify_all();
        tracing::trace!(
            sequence = event.sequence(),
            name = %event.name(),
            thread = %event.thread_name(),
            "event appended"
        );
        Ok(event)
    }

    /// Release every blocked waiter. Appends are still accepted until
    /// [`seal`](Self::seal).
    ///
    /// The first closure wins; closing an already closed log is a no-op.
    /// Returns `true` if this call closed the log.
    pub(crate) fn close(&self, closure: Closure) -> bool {
        let closed = {
            let mut state = self.state.lock();
            if state.closure.is_some() {
                false
            } else {
                state.closure = Some(closure);
                true
            }
        };
        if closed {
            self.appended.notify_all();
        }
        closed
    }

    /// Reject every later append, closing the log first if needed.
    pub(crate) fn seal(&self) {
        self.close(Closure::Closed);
        self.state.lock().sealed = true;
    }

    pub(crate) fn closure(&self) -> Option<Closure> {
        self.state.lock().closure.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Copy of every event appended so far.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Event>> {
        self.state.lock().events.clone()
    }

    /// Copy of the events at or after `from`, without blocking.
    pub(crate) fn events_from(&self, from: usize) -> Vec<Arc<Event>> {
        let state = self.state.lock();
        state.events.get(from..).map(<[_]>::to_vec).unwrap_or_default()
    }

    /// Block until at least one event exists at or after `from`, the log is
    /// closed, or `deadline` passes.
    ///
    /// Events already present are returned without waiting, even on a closed
    /// log. A wakeup that brings no new event goes back to waiting.
    pub(crate) fn wait_from(&self, from: usize, deadline: Instant) -> Batch {
        let mut state = self.state.lock();
        loop {
            if state.events.len() > from {
                return Batch::Events(state.events[from..].to_vec());
            }
            if let Some(closure) = &state.closure {
                return Batch::Closed(closure.clone());
            }
            if self.appended.wait_until(&mut state, deadline).timed_out() {
                if state.events.len() > from {
                    return Batch::Events(state.events[from..].to_vec());
                }
                return Batch::TimedOut;
            }
        }
    }

    /// Render every event for diagnostics, marking `position` if given.
    pub(crate) fn render(&self, position: Option<usize>) -> String {
        use std::fmt::Write;

        let events = self.snapshot();
        if events.is_empty() {
            return "(no events recorded)".to_string();
        }
        let mut out = format!("Recorded events ({}):", events.len());
        for (i, event) in events.iter().enumerate() {
            let marker = if position == Some(i) { "->" } else { "  " };
            let _ = write!(out, "\n{marker} {event}");
        }
        if position == Some(events.len()) {
            out.push_str("\n-> (end of log)");
        }
        out
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EventLog")
            .field("events", &state.events.len())
            .field("closure", &state.closure)
            .finish()
    }
}
