//! Event predicates for stream expectations.

use std::{borrow::Cow, fmt, sync::Arc};

use crate::{CommandId, Event, Value, command::COMMAND_ID_KEY};

type MatchFn = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// A predicate over a single [`Event`], used by every stream expectation.
///
/// `EventMatcher` can match events by:
/// - Name (exact match)
/// - Argument value
/// - Correlated command id
/// - Custom predicate
///
/// Matchers compose with [`and`](Self::and), [`or`](Self::or) and
/// [`negate`](Self::negate), and carry a description that shows up in
/// timeout and unexpected-event errors.
///
/// # Example
///
/// ```rust
/// use vigil::EventMatcher;
///
/// // Match by name
/// let started = EventMatcher::by_name("onStartInput");
///
/// // Name plus argument, the usual "callback for this editor" check
/// let for_editor = EventMatcher::by_name("onStartInputView").with_argument("marker", "A");
///
/// // Custom predicate over the full event
/// let nested = EventMatcher::by_fn(|e| e.nest_level() > 0);
/// ```
#[derive(Clone)]
pub struct EventMatcher {
    matcher: MatchFn,
    description: Cow<'static, str>,
}

impl fmt::Debug for EventMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventMatcher")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for EventMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl EventMatcher {
    fn new<F>(description: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Self {
            matcher: Arc::new(predicate),
            description: description.into(),
        }
    }

    /// Match every event.
    pub fn any() -> Self {
        Self::new("any event", |_| true)
    }

    /// Match events by name.
    pub fn by_name(name: impl Into<Cow<'static, str>>) -> Self {
        let name: Cow<'static, str> = name.into();
        Self::new(format!("name == {name:?}"), move |e| e.name() == name)
    }

    /// Match events whose argument `key` equals `value`.
    pub fn by_argument(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        Self::new(format!("{key} == {value}"), move |e| {
            e.argument(&key) == Some(&value)
        })
    }

    /// Match events that carry argument `key`, whatever its value.
    pub fn has_argument(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(format!("has {key}"), move |e| e.arguments().contains(&key))
    }

    /// Match the response to a command.
    ///
    /// The echoed `commandId` is parsed rather than compared as text, so an
    /// actor may report the id in any form [`CommandId::parse`] accepts.
    pub fn by_command(id: CommandId) -> Self {
        Self::new(format!("{COMMAND_ID_KEY} == {id}"), move |e| {
            e.arguments().get_str(COMMAND_ID_KEY).and_then(CommandId::parse) == Some(id)
        })
    }

    /// Match events using a custom predicate.
    pub fn by_fn<F>(predicate: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Self::new("<predicate>", predicate)
    }

    /// Replace the description shown in error messages.
    pub fn described(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = description.into();
        self
    }

    /// Both matchers must accept the event.
    pub fn and(self, other: EventMatcher) -> Self {
        let description = format!("{} && {}", self.description, other.description);
        Self::new(description, move |e| self.matches(e) && other.matches(e))
    }

    /// Either matcher accepts the event.
    pub fn or(self, other: EventMatcher) -> Self {
        let description = format!("({} || {})", self.description, other.description);
        Self::new(description, move |e| self.matches(e) || other.matches(e))
    }

    /// Accept exactly the events this matcher rejects.
    pub fn negate(self) -> Self {
        let description = format!("!({})", self.description);
        Self::new(description, move |e| !self.matches(e))
    }

    /// Shorthand for `self.and(EventMatcher::by_argument(key, value))`.
    pub fn with_argument(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Self::by_argument(key, value))
    }

    /// Returns true if the given event matches this matcher.
    #[inline]
    pub fn matches(&self, event: &Event) -> bool {
        (self.matcher)(event)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

// Allow &str to be used directly as a name matcher
impl From<&'static str> for EventMatcher {
    fn from(name: &'static str) -> Self {
        EventMatcher::by_name(name)
    }
}

// Allow String to be used as a name matcher
impl From<String> for EventMatcher {
    fn from(name: String) -> Self {
        EventMatcher::by_name(name)
    }
}

// Allow CommandId to be used directly as a response matcher
impl From<CommandId> for EventMatcher {
    fn from(id: CommandId) -> Self {
        EventMatcher::by_command(id)
    }
}
