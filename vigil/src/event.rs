use std::{fmt, time::SystemTime};

use crate::{Arguments, Snapshot, Value};

/// A named, immutable occurrence reported by the actor under test.
///
/// Events are created by the [`Recorder`](crate::Recorder) when an actor
/// adapter appends them, and are shared as `Arc<Event>` between the log and
/// every [`EventStream`](crate::EventStream) that observes them.
///
/// - `sequence`: position in the session log. Strictly increasing, gap-free.
/// - `timestamp`: append time in nanoseconds since the Unix epoch.
/// - `enter_timestamp` / `exit_timestamp`: bounds of the traced callback.
///   Equal to `timestamp` for plain appends.
/// - `enter_state` / `exit_state`: actor state captured around the callback.
/// - `thread_name` / `nest_level`: where the event was produced, and how many
///   traced callbacks enclosed it on that thread.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Event {
    pub(crate) sequence: u64,
    pub(crate) name: String,
    pub(crate) arguments: Arguments,
    pub(crate) enter_state: Snapshot,
    pub(crate) exit_state: Snapshot,
    pub(crate) timestamp: u64,
    pub(crate) enter_timestamp: u64,
    pub(crate) exit_timestamp: u64,
    pub(crate) thread_name: String,
    pub(crate) nest_level: u32,
}

impl Event {
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Shorthand for `self.arguments().get(key)`.
    #[inline]
    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }

    #[inline]
    pub fn enter_state(&self) -> &Snapshot {
        &self.enter_state
    }

    #[inline]
    pub fn exit_state(&self) -> &Snapshot {
        &self.exit_state
    }

    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    #[inline]
    pub fn enter_timestamp(&self) -> u64 {
        self.enter_timestamp
    }

    #[inline]
    pub fn exit_timestamp(&self) -> u64 {
        self.exit_timestamp
    }

    /// Time spent inside the traced callback, in nanoseconds.
    pub fn duration_nanos(&self) -> u64 {
        self.exit_timestamp.saturating_sub(self.enter_timestamp)
    }

    #[inline]
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    #[inline]
    pub fn nest_level(&self) -> u32 {
        self.nest_level
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.sequence, self.name)?;
        if !self.arguments.is_empty() {
            write!(f, " {}", self.arguments)?;
        }
        write!(f, " [thread: {}", self.thread_name)?;
        if self.nest_level > 0 {
            write!(f, ", nest: {}", self.nest_level)?;
        }
        write!(f, "]")
    }
}

/// Wall-clock time in nanoseconds since the Unix epoch.
///
/// A clock set before the epoch reads as zero rather than failing an append.
pub(crate) fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) fn make_event(sequence: u64, name: &str, arguments: Arguments) -> Event {
    let now = now_nanos();
    Event {
        sequence,
        name: name.to_owned(),
        arguments,
        enter_state: Snapshot::new(),
        exit_state: Snapshot::new(),
        timestamp: now,
        enter_timestamp: now,
        exit_timestamp: now,
        thread_name: "test".to_owned(),
        nest_level: 0,
    }
}
