use crate::{ActorContext, Command, Error, Result};

/// Adapter between a [`Session`](crate::Session) and the actor under test.
///
/// The actor itself (a soft keyboard, a broadcast receiver, a profile proxy)
/// lives outside Vigil. An adapter installs it, forwards commands to it over
/// whatever channel the platform provides, and translates its callbacks into
/// events through the [`Recorder`](crate::Recorder) found in the context.
///
/// # Lifecycle
///
/// - [`install`](Self::install)  - Called once while the session binds. Start
///   or enable the actor and register callbacks. The session then waits for
///   the configured readiness event.
/// - [`send_command`](Self::send_command)  - Called for every command the
///   test sends. The actor answers asynchronously by appending a response
///   event (see [`Recorder::respond`](crate::Recorder::respond)).
/// - [`uninstall`](Self::uninstall)  - Called exactly once when the session
///   closes, including after a failed bind. Release the actor and any
///   registered listeners.
///
/// # Example
///
/// ```ignore
/// struct Receiver {
///     registration: Option<Registration>,
/// }
///
/// impl Actor for Receiver {
///     fn install(&mut self, ctx: &ActorContext) -> Result {
///         let recorder = ctx.recorder().clone();
///         self.registration = Some(platform::register(move |intent| {
///             let _ = recorder.record(EventRecord::new("onReceive").with_argument("action", intent.action()));
///         })?);
///         Ok(())
///     }
///
///     fn uninstall(&mut self) -> Result {
///         if let Some(r) = self.registration.take() {
///             r.unregister()?;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Actor: Send + 'static {
    /// Start the actor and hook its callbacks up to the context's recorder.
    fn install(&mut self, ctx: &ActorContext) -> Result<()>;

    /// Transmit a command to the actor.
    ///
    /// # Default Behavior
    ///
    /// Returns [`Error::CommandsUnsupported`], for actors that are driven only
    /// through external actions.
    fn send_command(&mut self, command: &Command) -> Result<()> {
        let _ = command;
        Err(Error::CommandsUnsupported(std::any::type_name::<Self>().to_string()))
    }

    /// Stop the actor and release everything `install` acquired.
    fn uninstall(&mut self) -> Result<()>;
}
