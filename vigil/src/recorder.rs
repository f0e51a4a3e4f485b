use std::{fmt, sync::Arc};

use crate::{
    Arguments, Command, Event, EventRecord, Result, Snapshot, Value,
    command::{COMMAND_ID_KEY, COMMAND_NAME_KEY, RESPONSE_EVENT, RETURN_VALUE_KEY},
    log::{Closure, EventLog},
};

/// Producer-side handle to a session's event log.
///
/// Actor adapters receive a `Recorder` on install and translate every
/// platform callback into an append. It is cheap to clone and safe to use
/// from any number of threads at once: appends are serialized by the log's
/// mutex and wake every blocked waiter.
///
/// # Example
///
/// ```rust,ignore
/// impl Actor for Keyboard {
///     fn install(&mut self, ctx: &ActorContext) -> vigil::Result {
///         let recorder = ctx.recorder().clone();
///         self.platform.on_start_input(move |editor| {
///             let _ = recorder.append(
///                 "onStartInput",
///                 Arguments::new().with("marker", editor.marker()),
///                 Snapshot::new(),
///                 Snapshot::new(),
///             );
///         });
///         Ok(())
///     }
///     // ...
/// }
/// ```
#[derive(Clone)]
pub struct Recorder {
    log: Arc<EventLog>,
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder").field("log", &self.log).finish()
    }
}

impl Recorder {
    pub(crate) fn new(log: Arc<EventLog>) -> Self {
        Self { log }
    }

    /// Append an event and wake every waiter blocked on the log.
    ///
    /// Returns the sequence number assigned to the event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`](crate::Error::SessionClosed) after the
    /// session closed, or [`Error::ActorFailed`](crate::Error::ActorFailed)
    /// after a reported failure. The event is not stored in either case.
    pub fn append(
        &self,
        name: impl Into<String>,
        arguments: Arguments,
        enter_state: Snapshot,
        exit_state: Snapshot,
    ) -> Result<u64> {
        self.record(
            EventRecord::new(name)
                .with_arguments(arguments)
                .with_enter_state(enter_state)
                .with_exit_state(exit_state),
        )
    }

    /// Append a fully specified record.
    pub fn record(&self, record: EventRecord) -> Result<u64> {
        self.log.append(record).map(|event| event.sequence())
    }

    /// Append the response event for `command`.
    ///
    /// The event is named `onHandleCommand` and carries the command id, the
    /// command name and `return_value`.
    pub fn respond(&self, command: &Command, return_value: impl Into<Value>) -> Result<u64> {
        self.record(
            EventRecord::new(RESPONSE_EVENT)
                .with_argument(COMMAND_ID_KEY, command.id().to_string())
                .with_argument(COMMAND_NAME_KEY, command.name())
                .with_argument(RETURN_VALUE_KEY, return_value),
        )
    }

    /// Signal that the actor died or became unusable.
    ///
    /// The session moves to `Failed`, further appends are rejected and every
    /// blocked waiter returns [`Error::ActorFailed`](crate::Error::ActorFailed).
    /// Only the first report (or the session closing first) takes effect.
    pub fn report_failure(&self, reason: impl Into<String>) {
        let reason = reason.into();
        if self.log.close(Closure::Failed(reason.clone())) {
            tracing::warn!(reason = %reason, "actor reported failure");
        }
        self.log.seal();
    }

    /// Returns true once the session is closing or the actor failed.
    pub fn is_closed(&self) -> bool {
        self.log.closure().is_some()
    }

    /// Copy of every event recorded so far.
    pub fn events(&self) -> Vec<Arc<Event>> {
        self.log.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, thread};

    use super::*;
    use crate::Error;

    fn recorder() -> Recorder {
        Recorder::new(Arc::new(EventLog::with_capacity(4)))
    }

    #[test]
    fn append_returns_sequence() {
        let recorder = recorder();
        let seq = recorder
            .append(
                "onStartInput",
                Arguments::new().with("marker", "A"),
                Snapshot::new(),
                Snapshot::new().with("hasInputBinding", true),
            )
            .unwrap();
        assert_eq!(seq, 0);
        let events = recorder.events();
        assert_eq!(events[0].argument("marker"), Some(&Value::from("A")));
        assert_eq!(events[0].exit_state().get_bool("hasInputBinding"), Some(true));
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let recorder = recorder();
        let producers: Vec<_> = (0..8)
            .map(|t| {
                let recorder = recorder.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        recorder
                            .record(
                                EventRecord::new("tick")
                                    .with_argument("producer", t)
                                    .with_argument("i", i),
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }

        let events = recorder.events();
        assert_eq!(events.len(), 2000);
        for (i, e) in events.iter().enumerate() {
            assert_eq!(e.sequence(), i as u64);
        }
        let unique: HashSet<_> = events
            .iter()
            .map(|e| (e.arguments().get_i64("producer"), e.arguments().get_i64("i")))
            .collect();
        assert_eq!(unique.len(), 2000);
    }

    #[test]
    fn respond_embeds_command_id() {
        let recorder = recorder();
        let command = Command::new("getTextBeforeCursor", Arguments::new());
        recorder.respond(&command, "abc").unwrap();
        let event = &recorder.events()[0];
        assert_eq!(event.name(), RESPONSE_EVENT);
        assert_eq!(
            event.arguments().get_str(COMMAND_ID_KEY),
            Some(command.id().to_string().as_str())
        );
        assert_eq!(event.arguments().get_str(RETURN_VALUE_KEY), Some("abc"));
    }

    #[test]
    fn report_failure_rejects_later_appends() {
        let recorder = recorder();
        recorder.report_failure("process died");
        assert!(recorder.is_closed());
        let err = recorder.record(EventRecord::new("late")).unwrap_err();
        assert!(matches!(err, Error::ActorFailed(reason) if reason == "process died"));
    }
}
