#![cfg_attr(docsrs, feature(doc_cfg))]
//! # Vigil
//!
//! Synchronize tests with an asynchronous actor that reports what it does as
//! a stream of named events.
//!
//! The actor under test (a soft keyboard, a broadcast receiver, a remote
//! service) runs on its own threads and calls back whenever something
//! happens. Vigil records every callback in an append-only log and lets test
//! code block, with an explicit timeout, until an event matching a predicate
//! shows up. Or assert that one never does.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use vigil::*;
//!
//! struct Keyboard {
//!     recorder: Option<Recorder>,
//! }
//!
//! impl Actor for Keyboard {
//!     fn install(&mut self, ctx: &ActorContext) -> Result {
//!         ctx.recorder().record(EventRecord::new("ready"))?;
//!         self.recorder = Some(ctx.recorder().clone());
//!         Ok(())
//!     }
//!
//!     fn uninstall(&mut self) -> Result {
//!         self.recorder = None;
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result {
//!     let session = Session::open(SessionConfig::default(), Keyboard { recorder: None })?;
//!     let mut stream = session.open_stream();
//!
//!     // Something external makes the actor report a callback
//!     session.recorder().record(
//!         EventRecord::new("onStartInput").with_argument("marker", "A"),
//!     )?;
//!
//!     let event = stream.expect_event(
//!         EventMatcher::by_name("onStartInput").with_argument("marker", "A"),
//!         Duration::from_secs(5),
//!     )?;
//!     assert_eq!(event.sequence(), 1);
//!
//!     stream.not_expect_event("showSoftInput", Duration::from_millis(20))?;
//!     session.close()
//! }
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Session`] | Installs the actor, owns the event log, tears everything down |
//! | [`Actor`] | Trait implemented by adapters around the actor under test |
//! | [`Recorder`] | Appends events to the log from any thread |
//! | [`Tracer`] | Records callbacks with state snapshots and nesting |
//! | [`EventStream`] | Independent read cursor with blocking expectations |
//! | [`EventMatcher`] | Describable predicate over events |
//! | [`Event`] | Immutable record of one callback |
//! | [`Command`] / [`CommandHandle`] | Correlated request/response with the actor |
//! | [`SessionConfig`] | Actor name, readiness event, bind timeout, settings |
//!
//! ## Streams
//!
//! A stream is only a position in the shared log. `expect_event` consumes up
//! to and including the match; `not_expect_event` never consumes. Fork a
//! stream with [`EventStream::copy`] to look ahead without losing your place:
//!
//! ```rust,ignore
//! let mut fork = stream.copy();
//! fork.expect_event("onStartInputView", TIMEOUT)?;
//! // `stream` still sees onStartInputView
//! ```
//!
//! ## Commands
//!
//! [`Session::send_command`] stamps every command with a fresh id. The actor
//! answers by appending one response event carrying that id (see
//! [`Recorder::respond`]); [`Session::await_response`] picks it out of the
//! log regardless of interleaved traffic.
//!
//! ## Features
//!
//! - **`serde`** - `Serialize` for events and JSON Lines export of a session log
//! - **`tokio`** - `*_async` variants of the blocking waits, run on Tokio's blocking pool

mod actor;
mod arguments;
mod command;
mod command_id;
mod context;
mod error;
mod event;
mod event_record;
mod log;
mod matcher;
mod recorder;
mod session;
mod session_config;
mod stream;
mod tracer;
mod value;
mod waiter;

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
pub mod export;

#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
mod async_wait;

pub use actor::Actor;
pub use arguments::{Arguments, Snapshot};
pub use command::{
    COMMAND_ID_KEY, COMMAND_NAME_KEY, Command, CommandHandle, RESPONSE_EVENT, RETURN_VALUE_KEY,
    Response,
};
pub use command_id::CommandId;
pub use context::ActorContext;
pub use error::Error;
pub use event::Event;
pub use event_record::EventRecord;
pub use matcher::EventMatcher;
pub use recorder::Recorder;
pub use session::{Session, SessionState};
pub use session_config::SessionConfig;
pub use stream::EventStream;
pub use tracer::Tracer;
pub use value::Value;

/// Convenience alias for `Result<T, vigil::Error>`.
pub type Result<T = ()> = std::result::Result<T, Error>;
