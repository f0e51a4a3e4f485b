use std::fmt;

use crate::{Arguments, Recorder, Tracer};

/// Session-provided context handed to an [`Actor`](crate::Actor) on install.
///
/// Use it to:
/// - `recorder()`: append events from platform callbacks, on any thread
/// - `tracer(probe)`: wrap callbacks so each one is recorded with its state
/// - `settings()`: read the key/value settings the test configured
/// - `actor_name()`: the actor's label in logs and errors
///
/// See also: [`Recorder`], [`Tracer`], [`crate::SessionConfig`].
#[derive(Clone)]
pub struct ActorContext {
    actor_name: String,
    recorder: Recorder,
    settings: Arguments,
}

impl fmt::Debug for ActorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorContext")
            .field("actor_name", &self.actor_name)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ActorContext {
    pub(crate) fn new(actor_name: String, recorder: Recorder, settings: Arguments) -> Self {
        Self {
            actor_name,
            recorder,
            settings,
        }
    }

    #[inline]
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Build a [`Tracer`] that snapshots actor state with `probe`.
    pub fn tracer<F>(&self, probe: F) -> Tracer
    where
        F: Fn() -> crate::Snapshot + Send + Sync + 'static,
    {
        Tracer::new(self.recorder.clone(), probe)
    }

    #[inline]
    pub fn settings(&self) -> &Arguments {
        &self.settings
    }

    #[inline]
    pub fn actor_name(&self) -> &str {
        &self.actor_name
    }
}
