use std::{cell::Cell, fmt, sync::Arc, thread};

use crate::{Arguments, EventRecord, Recorder, Snapshot, event::now_nanos};

thread_local! {
    static NEST_LEVEL: Cell<u32> = const { Cell::new(0) };
}

/// Restores the thread's nest level when a traced callback ends, even by
/// unwinding.
struct NestGuard {
    level: u32,
}

impl NestGuard {
    fn enter() -> Self {
        let level = NEST_LEVEL.with(|n| {
            let level = n.get();
            n.set(level + 1);
            level
        });
        Self { level }
    }
}

impl Drop for NestGuard {
    fn drop(&mut self) {
        NEST_LEVEL.with(|n| n.set(self.level));
    }
}

type StateProbe = Arc<dyn Fn() -> Snapshot + Send + Sync>;

/// Records actor callbacks as events, one per callback.
///
/// Wrap each callback body in [`record`](Self::record). The tracer captures
/// the actor state before and after the body, the enter and exit timestamps,
/// the producing thread, and how deeply the callback is nested inside other
/// traced callbacks on that thread. The event is appended once the body
/// returns, so an outer callback is logged after the callbacks it triggered.
///
/// # Example
///
/// ```rust,ignore
/// let tracer = Tracer::new(ctx.recorder().clone(), move || keyboard_state());
///
/// fn on_start_input(&self, editor: &Editor, restarting: bool) {
///     self.tracer.record(
///         "onStartInput",
///         Arguments::new()
///             .with("marker", editor.marker())
///             .with("restarting", restarting),
///         || self.inner.on_start_input(editor, restarting),
///     )
/// }
/// ```
#[derive(Clone)]
pub struct Tracer {
    recorder: Recorder,
    probe: StateProbe,
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("recorder", &self.recorder)
            .finish_non_exhaustive()
    }
}

impl Tracer {
    pub fn new<F>(recorder: Recorder, probe: F) -> Self
    where
        F: Fn() -> Snapshot + Send + Sync + 'static,
    {
        Self {
            recorder,
            probe: Arc::new(probe),
        }
    }

    /// A tracer that records empty state snapshots.
    pub fn stateless(recorder: Recorder) -> Self {
        Self::new(recorder, Snapshot::new)
    }

    /// Run `body` as the callback `name` and append its event.
    ///
    /// A failed append (session already closed) is logged and otherwise
    /// ignored; the callback's result is always returned.
    pub fn record<R>(&self, name: &str, arguments: Arguments, body: impl FnOnce() -> R) -> R {
        let enter_state = (self.probe)();
        let enter_timestamp = now_nanos();
        let (level, result) = {
            let guard = NestGuard::enter();
            (guard.level, body())
        };
        let exit_timestamp = now_nanos();
        let exit_state = (self.probe)();

        let record = EventRecord::new(name)
            .with_arguments(arguments)
            .with_enter_state(enter_state)
            .with_exit_state(exit_state)
            .with_timestamps(enter_timestamp, exit_timestamp)
            .with_thread_name(thread::current().name().unwrap_or("unnamed"))
            .with_nest_level(level);
        if let Err(e) = self.recorder.record(record) {
            tracing::warn!(callback = %name, error = %e, "tracer failed to record callback");
        }
        result
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }
}
