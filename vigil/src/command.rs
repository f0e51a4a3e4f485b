//! Command/response correlation.

use std::{fmt, sync::Arc, time::Duration};

use crate::{
    Arguments, CommandId, Error, Event, EventMatcher, Result, Value,
    log::EventLog,
    waiter::{self, Scan},
};

/// Argument key under which a response embeds the originating command id.
pub const COMMAND_ID_KEY: &str = "commandId";

/// Argument key under which a response echoes the command name.
pub const COMMAND_NAME_KEY: &str = "commandName";

/// Argument key under which a response carries the command's result.
pub const RETURN_VALUE_KEY: &str = "returnValue";

/// Conventional name of response events appended by
/// [`Recorder::respond`](crate::Recorder::respond).
pub const RESPONSE_EVENT: &str = "onHandleCommand";

/// An instruction sent to the actor under test.
///
/// Every command gets a fresh [`CommandId`]. The actor is expected to append
/// exactly one response event carrying that id (see
/// [`Recorder::respond`](crate::Recorder::respond)).
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    id: CommandId,
    name: String,
    arguments: Arguments,
}

impl Command {
    pub fn new(name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            id: CommandId::new(),
            name: name.into(),
            arguments,
        }
    }

    #[inline]
    pub fn id(&self) -> CommandId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} (id: {})", self.name, self.arguments, self.id)
    }
}

/// Receipt for a sent command, used to await its response.
///
/// Remembers where the log ended when the command was sent; responses can
/// only appear after that point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandHandle {
    pub(crate) id: CommandId,
    pub(crate) name: String,
    pub(crate) issued_at: usize,
}

impl CommandHandle {
    #[inline]
    pub fn id(&self) -> CommandId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The event that answered a command.
#[derive(Debug, Clone)]
pub struct Response {
    event: Arc<Event>,
}

impl Response {
    #[inline]
    pub fn event(&self) -> &Arc<Event> {
        &self.event
    }

    pub fn into_event(self) -> Arc<Event> {
        self.event
    }

    /// The value under `returnValue`, if the actor reported one.
    pub fn return_value(&self) -> Option<&Value> {
        self.event.argument(RETURN_VALUE_KEY)
    }

    /// True if the actor reported no value or an explicit null.
    pub fn is_null_return(&self) -> bool {
        self.return_value().is_none_or(Value::is_null)
    }
}

/// Wait for the response to `handle`, scanning from `from`.
///
/// Returns the matching event's index together with the response. Before
/// returning, every event appended since the command was sent is checked for
/// a second response with the same id.
pub(crate) fn resolve(
    log: &EventLog,
    handle: &CommandHandle,
    from: usize,
    timeout: Duration,
) -> Result<(usize, Response)> {
    let matcher = EventMatcher::by_command(handle.id);
    let start = from.max(handle.issued_at);
    match waiter::scan(log, start, &matcher, waiter::deadline_after(timeout)) {
        Scan::Found { index, event } => {
            ensure_unique(log, handle)?;
            tracing::debug!(
                command = %handle.name,
                id = %handle.id,
                sequence = event.sequence(),
                "command response resolved"
            );
            Ok((index, Response { event }))
        }
        Scan::TimedOut => {
            tracing::warn!(command = %handle.name, id = %handle.id, ?timeout, "command timed out");
            Err(Error::Timeout {
                expected: format!("response to {} ({})", handle.name, matcher),
                timeout,
                dump: log.render(None),
            })
        }
        Scan::Closed(closure) => Err(closure.to_error()),
    }
}

/// Sequences of every response to `handle` appended so far.
pub(crate) fn responses(log: &EventLog, handle: &CommandHandle) -> Vec<u64> {
    let matcher = EventMatcher::by_command(handle.id);
    log.events_from(handle.issued_at)
        .iter()
        .filter(|e| matcher.matches(e))
        .map(|e| e.sequence())
        .collect()
}

/// Fail with [`Error::AmbiguousCorrelation`] if `handle` has more than one response.
pub(crate) fn ensure_unique(log: &EventLog, handle: &CommandHandle) -> Result<()> {
    let sequences = responses(log, handle);
    if sequences.len() > 1 {
        tracing::error!(
            command = %handle.name,
            id = %handle.id,
            ?sequences,
            "command correlated with more than one response"
        );
        return Err(Error::AmbiguousCorrelation {
            id: handle.id,
            sequences,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::{EventRecord, Recorder};

    fn setup() -> (Arc<EventLog>, Recorder) {
        let log = Arc::new(EventLog::with_capacity(8));
        (log.clone(), Recorder::new(log))
    }

    fn handle_for(command: &Command, log: &EventLog) -> CommandHandle {
        CommandHandle {
            id: command.id(),
            name: command.name().to_owned(),
            issued_at: log.len(),
        }
    }

    #[test]
    fn resolves_response_among_unrelated_events() {
        let (log, recorder) = setup();
        let command = Command::new("commitText", Arguments::new().with("text", "hi"));
        let handle = handle_for(&command, &log);

        let producer = thread::spawn(move || {
            recorder.record(EventRecord::new("onUpdateSelection")).unwrap();
            let other = Command::new("commitText", Arguments::new());
            recorder.respond(&other, false).unwrap();
            recorder.respond(&command, true).unwrap();
            recorder.record(EventRecord::new("onUpdateSelection")).unwrap();
        });

        let (index, response) = resolve(&log, &handle, 0, Duration::from_secs(5)).unwrap();
        producer.join().unwrap();
        assert_eq!(index, 2);
        assert_eq!(response.return_value(), Some(&Value::Bool(true)));
        assert!(!response.is_null_return());
    }

    #[test]
    fn duplicate_response_is_ambiguous() {
        let (log, recorder) = setup();
        let command = Command::new("getSelectedText", Arguments::new());
        let handle = handle_for(&command, &log);
        recorder.respond(&command, "a").unwrap();
        recorder.respond(&command, "b").unwrap();

        let err = resolve(&log, &handle, 0, Duration::from_millis(100)).unwrap_err();
        match err {
            Error::AmbiguousCorrelation { id, sequences } => {
                assert_eq!(id, command.id());
                assert_eq!(sequences, vec![0, 1]);
            }
            other => panic!("expected AmbiguousCorrelation, got {other:?}"),
        }
    }

    #[test]
    fn missing_response_times_out_with_dump() {
        let (log, recorder) = setup();
        recorder.record(EventRecord::new("onStartInput")).unwrap();
        let command = Command::new("getTextAfterCursor", Arguments::new());
        let handle = handle_for(&command, &log);

        let err = resolve(&log, &handle, 0, Duration::from_millis(30)).unwrap_err();
        match err {
            Error::Timeout { expected, dump, .. } => {
                assert!(expected.contains("getTextAfterCursor"));
                assert!(dump.contains("onStartInput"));
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[test]
    fn uppercase_echo_resolves_and_counts_toward_ambiguity() {
        let (log, recorder) = setup();
        let command = Command::new("getSelectedText", Arguments::new());
        let handle = handle_for(&command, &log);
        recorder
            .record(
                EventRecord::new(RESPONSE_EVENT)
                    .with_argument(COMMAND_ID_KEY, command.id().to_string().to_uppercase())
                    .with_argument(RETURN_VALUE_KEY, "sel"),
            )
            .unwrap();

        let (index, response) = resolve(&log, &handle, 0, Duration::from_millis(300)).unwrap();
        assert_eq!(index, 0);
        assert_eq!(response.return_value(), Some(&Value::from("sel")));

        recorder.respond(&command, "again").unwrap();
        assert_eq!(responses(&log, &handle), vec![0, 1]);
        assert!(matches!(
            ensure_unique(&log, &handle),
            Err(Error::AmbiguousCorrelation { .. })
        ));
    }

    #[test]
    fn null_return_detected() {
        let (log, recorder) = setup();
        let command = Command::new("getExtractedText", Arguments::new());
        let handle = handle_for(&command, &log);
        recorder.respond(&command, Value::Null).unwrap();
        let (_, response) = resolve(&log, &handle, 0, Duration::from_millis(100)).unwrap();
        assert!(response.is_null_return());
    }
}
