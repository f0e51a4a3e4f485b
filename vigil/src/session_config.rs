use std::time::Duration;

use crate::{Arguments, EventMatcher, Value};

/// Setup configuration for a [`Session`](crate::Session).
///
/// Controls how the actor is identified, what counts as "ready", and how long
/// binding may take. Use the builder pattern to customize, or use
/// [`Default`] for sensible defaults.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use vigil::{EventMatcher, SessionConfig};
///
/// let config = SessionConfig::default()
///     .with_actor_name("mock-ime")
///     .with_bind_timeout(Duration::from_secs(5))
///     .with_ready_event(EventMatcher::by_name("onCreate"))
///     .with_actor_setting("fullscreenMode", false);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Label for the actor in logs and errors.
    /// Default: "actor"
    actor_name: String,

    /// How long the actor may take to report readiness.
    /// Default: 10s
    bind_timeout: Duration,

    /// Matcher for the readiness event.
    /// Default: an event named "ready"
    ready_event: EventMatcher,

    /// Key/value settings handed to the actor on install.
    /// Default: empty
    actor_settings: Arguments,

    /// Initial capacity of the event log.
    /// Default: 32
    log_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            actor_name: "actor".to_string(),
            bind_timeout: Duration::from_secs(10),
            ready_event: EventMatcher::by_name("ready"),
            actor_settings: Arguments::new(),
            log_capacity: 32,
        }
    }
}

impl SessionConfig {
    pub fn with_actor_name(mut self, name: impl Into<String>) -> Self {
        self.actor_name = name.into();
        self
    }

    /// Returns the actor label.
    pub fn actor_name(&self) -> &str {
        &self.actor_name
    }

    /// Set how long binding may take before the session fails.
    pub fn with_bind_timeout(mut self, timeout: Duration) -> Self {
        self.bind_timeout = timeout;
        self
    }

    /// Returns the bind timeout.
    pub fn bind_timeout(&self) -> Duration {
        self.bind_timeout
    }

    /// Set the matcher that recognizes the actor's readiness event.
    pub fn with_ready_event(mut self, matcher: impl Into<EventMatcher>) -> Self {
        self.ready_event = matcher.into();
        self
    }

    /// Returns the readiness matcher.
    pub fn ready_event(&self) -> &EventMatcher {
        &self.ready_event
    }

    /// Add one setting for the actor.
    pub fn with_actor_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.actor_settings.insert(key, value);
        self
    }

    /// Replace all actor settings.
    pub fn with_actor_settings(mut self, settings: Arguments) -> Self {
        self.actor_settings = settings;
        self
    }

    /// Returns the settings handed to the actor.
    pub fn actor_settings(&self) -> &Arguments {
        &self.actor_settings
    }

    /// Set the initial capacity of the event log.
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Returns the initial log capacity.
    pub fn log_capacity(&self) -> usize {
        self.log_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.actor_name(), "actor");
        assert_eq!(config.bind_timeout(), Duration::from_secs(10));
        assert_eq!(config.ready_event().description(), "name == \"ready\"");
        assert!(config.actor_settings().is_empty());
        assert_eq!(config.log_capacity(), 32);
    }

    #[test]
    fn builder_overrides() {
        let config = SessionConfig::default()
            .with_actor_name("bt-proxy")
            .with_bind_timeout(Duration::from_millis(250))
            .with_ready_event("onServiceConnected")
            .with_actor_setting("profile", "a2dp")
            .with_log_capacity(4);
        assert_eq!(config.actor_name(), "bt-proxy");
        assert_eq!(config.bind_timeout(), Duration::from_millis(250));
        assert_eq!(
            config.ready_event().description(),
            "name == \"onServiceConnected\""
        );
        assert_eq!(config.actor_settings().get_str("profile"), Some("a2dp"));
        assert_eq!(config.log_capacity(), 4);
    }
}
