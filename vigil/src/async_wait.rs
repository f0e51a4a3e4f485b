//! Awaitable variants of the blocking waits, for tests driven by a Tokio
//! runtime.
//!
//! Each wait runs on Tokio's blocking pool, so runtime worker threads stay
//! free while the condition variable is parked. Semantics, timeouts and
//! errors match the blocking versions exactly.

use std::{sync::Arc, time::Duration};

use tokio::task::spawn_blocking;

use crate::{
    CommandHandle, Error, Event, EventMatcher, EventStream, Response, Result, Session, command,
};

impl EventStream {
    /// Async [`expect_event`](Self::expect_event). The stream only advances
    /// once the returned future completes.
    pub async fn expect_event_async<M>(&mut self, matcher: M, timeout: Duration) -> Result<Arc<Event>>
    where
        M: Into<EventMatcher>,
    {
        let matcher = matcher.into();
        let mut fork = self.copy();
        let (fork, result) = spawn_blocking(move || {
            let result = fork.expect_event(matcher, timeout);
            (fork, result)
        })
        .await
        .map_err(Error::internal)?;
        self.advance_to(fork.position() as usize);
        result
    }

    /// Async [`not_expect_event`](Self::not_expect_event).
    pub async fn not_expect_event_async<M>(&self, matcher: M, timeout: Duration) -> Result<()>
    where
        M: Into<EventMatcher>,
    {
        let matcher = matcher.into();
        let fork = self.copy();
        spawn_blocking(move || fork.not_expect_event(matcher, timeout))
            .await
            .map_err(Error::internal)?
    }

    /// Async [`expect_command`](Self::expect_command).
    pub async fn expect_command_async(
        &mut self,
        handle: &CommandHandle,
        timeout: Duration,
    ) -> Result<Response> {
        let handle = handle.clone();
        let mut fork = self.copy();
        let (fork, result) = spawn_blocking(move || {
            let result = fork.expect_command(&handle, timeout);
            (fork, result)
        })
        .await
        .map_err(Error::internal)?;
        self.advance_to(fork.position() as usize);
        result
    }
}

impl Session {
    /// Async [`await_response`](Self::await_response).
    pub async fn await_response_async(
        &self,
        handle: &CommandHandle,
        timeout: Duration,
    ) -> Result<Response> {
        let log = self.log().clone();
        let handle = handle.clone();
        spawn_blocking(move || {
            command::resolve(&log, &handle, handle.issued_at, timeout).map(|(_, response)| response)
        })
        .await
        .map_err(Error::internal)?
    }
}
