use std::thread;

use crate::{Arguments, Event, Snapshot, Value, event::now_nanos};

/// Builder for an event before it is appended to the log.
///
/// The log assigns `sequence` and `timestamp`; everything else is chosen by
/// the producer. Timestamps default to the append time and the thread name
/// defaults to the appending thread.
///
/// # Example
///
/// ```rust,ignore
/// recorder.record(
///     EventRecord::new("onStartInput")
///         .with_argument("marker", "A")
///         .with_exit_state(Snapshot::new().with("hasInputBinding", true)),
/// )?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventRecord {
    name: String,
    arguments: Arguments,
    enter_state: Snapshot,
    exit_state: Snapshot,
    enter_timestamp: Option<u64>,
    exit_timestamp: Option<u64>,
    thread_name: Option<String>,
    nest_level: u32,
}

impl EventRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_arguments(mut self, arguments: Arguments) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key, value);
        self
    }

    pub fn with_enter_state(mut self, state: Snapshot) -> Self {
        self.enter_state = state;
        self
    }

    pub fn with_exit_state(mut self, state: Snapshot) -> Self {
        self.exit_state = state;
        self
    }

    pub fn with_timestamps(mut self, enter: u64, exit: u64) -> Self {
        self.enter_timestamp = Some(enter);
        self.exit_timestamp = Some(exit);
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = Some(name.into());
        self
    }

    pub fn with_nest_level(mut self, level: u32) -> Self {
        self.nest_level = level;
        self
    }

    /// Seal the record into an immutable event at the given log position.
    pub(crate) fn build(self, sequence: u64) -> Event {
        let timestamp = now_nanos();
        let thread_name = self
            .thread_name
            .unwrap_or_else(|| thread::current().name().unwrap_or("unnamed").to_owned());
        Event {
            sequence,
            name: self.name,
            arguments: self.arguments,
            enter_state: self.enter_state,
            exit_state: self.exit_state,
            timestamp,
            enter_timestamp: self.enter_timestamp.unwrap_or(timestamp),
            exit_timestamp: self.exit_timestamp.unwrap_or(timestamp),
            thread_name,
            nest_level: self.nest_level,
        }
    }
}
