use std::{fmt, sync::Arc, time::Duration};

use crate::{
    CommandHandle, Error, Event, EventMatcher, Response, Result, command,
    log::EventLog,
    waiter::{self, Scan},
};

/// An independent read position into a session's event log.
///
/// A stream owns no events. It only remembers how far it has consumed, so
/// any number of streams can observe the same log from different threads.
///
/// - [`expect_event`](Self::expect_event) consumes: on a match the position
///   moves past the matching event.
/// - [`not_expect_event`](Self::not_expect_event) never moves the position.
/// - [`skip_all`](Self::skip_all) jumps to the current end of the log.
/// - [`copy`](Self::copy) forks an independent stream at the same position.
///
/// The position never moves backwards.
///
/// # Example
///
/// ```rust,ignore
/// let mut stream = session.open_stream();
/// let marker = "A";
///
/// focus_editor(marker);
/// let start = stream.expect_event(
///     EventMatcher::by_name("onStartInput").with_argument("marker", marker),
///     TIMEOUT,
/// )?;
///
/// // Absence checks do not consume
/// stream.not_expect_event("showSoftInput", NOT_EXPECT_TIMEOUT)?;
/// ```
pub struct EventStream {
    log: Arc<EventLog>,
    position: usize,
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("position", &self.position)
            .field("log", &self.log)
            .finish()
    }
}

impl Clone for EventStream {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl EventStream {
    pub(crate) fn new(log: Arc<EventLog>, position: usize) -> Self {
        Self { log, position }
    }

    /// Index of the next event this stream will inspect.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position as u64
    }

    /// Fork a new stream at the same position. Consumption on either stream
    /// does not affect the other.
    pub fn copy(&self) -> Self {
        Self {
            log: self.log.clone(),
            position: self.position,
        }
    }

    /// Move the position to the current end of the log without inspecting
    /// the skipped events.
    pub fn skip_all(&mut self) {
        self.advance_to(self.log.len());
    }

    pub(crate) fn advance_to(&mut self, position: usize) {
        debug_assert!(position >= self.position);
        self.position = self.position.max(position);
    }

    /// Wait for the first event at or after the position that matches, and
    /// consume it.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if nothing matched within `timeout`. The position
    ///   is left unchanged.
    /// - [`Error::SessionClosed`] / [`Error::ActorFailed`] if the session
    ///   ended while waiting.
    pub fn expect_event<M>(&mut self, matcher: M, timeout: Duration) -> Result<Arc<Event>>
    where
        M: Into<EventMatcher>,
    {
        let matcher = matcher.into();
        match waiter::scan(
            &self.log,
            self.position,
            &matcher,
            waiter::deadline_after(timeout),
        ) {
            Scan::Found { index, event } => {
                self.advance_to(index + 1);
                tracing::debug!(
                    sequence = event.sequence(),
                    expected = %matcher,
                    "expected event observed"
                );
                Ok(event)
            }
            Scan::TimedOut => {
                tracing::warn!(expected = %matcher, ?timeout, "expected event timed out");
                Err(Error::Timeout {
                    expected: matcher.to_string(),
                    timeout,
                    dump: self.dump(),
                })
            }
            Scan::Closed(closure) => Err(closure.to_error()),
        }
    }

    /// Assert that no event at or after the position matches within
    /// `timeout`. Does not consume.
    ///
    /// Fails as soon as a matching event is seen, however close to the
    /// deadline it was appended.
    ///
    /// # Errors
    ///
    /// - [`Error::FoundUnexpected`] with the offending event.
    /// - [`Error::SessionClosed`] / [`Error::ActorFailed`] if the session
    ///   ended before the window elapsed.
    pub fn not_expect_event<M>(&self, matcher: M, timeout: Duration) -> Result<()>
    where
        M: Into<EventMatcher>,
    {
        let matcher = matcher.into();
        match waiter::scan(
            &self.log,
            self.position,
            &matcher,
            waiter::deadline_after(timeout),
        ) {
            Scan::Found { event, .. } => {
                tracing::warn!(
                    sequence = event.sequence(),
                    unexpected = %matcher,
                    "unexpected event observed"
                );
                Err(Error::FoundUnexpected {
                    expected: matcher.to_string(),
                    event,
                })
            }
            Scan::TimedOut => Ok(()),
            Scan::Closed(closure) => Err(closure.to_error()),
        }
    }

    /// Consume one event per matcher, in order, under a single deadline.
    ///
    /// Events between the matches are skipped. On failure the position is
    /// left after the last satisfied matcher.
    pub fn expect_sequence(
        &mut self,
        matchers: &[EventMatcher],
        timeout: Duration,
    ) -> Result<Vec<Arc<Event>>> {
        let deadline = waiter::deadline_after(timeout);
        let mut matched = Vec::with_capacity(matchers.len());
        for matcher in matchers {
            match waiter::scan(&self.log, self.position, matcher, deadline) {
                Scan::Found { index, event } => {
                    self.advance_to(index + 1);
                    matched.push(event);
                }
                Scan::TimedOut => {
                    tracing::warn!(
                        expected = %matcher,
                        step = matched.len() + 1,
                        steps = matchers.len(),
                        ?timeout,
                        "expected sequence timed out"
                    );
                    return Err(Error::Timeout {
                        expected: format!(
                            "{} (step {} of {})",
                            matcher,
                            matched.len() + 1,
                            matchers.len()
                        ),
                        timeout,
                        dump: self.dump(),
                    });
                }
                Scan::Closed(closure) => return Err(closure.to_error()),
            }
        }
        Ok(matched)
    }

    /// Wait for the response to a sent command and consume it.
    ///
    /// # Errors
    ///
    /// Same as [`expect_event`](Self::expect_event), plus
    /// [`Error::AmbiguousCorrelation`] if more than one response carries the
    /// command's id.
    pub fn expect_command(&mut self, handle: &CommandHandle, timeout: Duration) -> Result<Response> {
        let (index, response) = command::resolve(&self.log, handle, self.position, timeout)?;
        self.advance_to(index + 1);
        Ok(response)
    }

    /// First unconsumed event that matches, without blocking or consuming.
    pub fn find<M>(&self, matcher: M) -> Option<Arc<Event>>
    where
        M: Into<EventMatcher>,
    {
        let matcher = matcher.into();
        self.log
            .events_from(self.position)
            .into_iter()
            .find(|e| matcher.matches(e))
    }

    /// Snapshot of the events not yet consumed by this stream.
    pub fn pending(&self) -> Vec<Arc<Event>> {
        self.log.events_from(self.position)
    }

    /// Render every event in the log, regardless of position, marking where
    /// this stream stands.
    pub fn dump(&self) -> String {
        self.log.render(Some(self.position))
    }
}
