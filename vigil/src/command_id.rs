use std::fmt;

use uuid::Uuid;

/// Correlation id linking a [`Command`](crate::Command) to its response event.
///
/// Generated fresh (UUID v4) for every command sent. Actors echo it back in
/// the response's `"commandId"` argument as a string; any textual form the
/// `uuid` crate parses (hyphenated, simple, braced, urn, either case) refers
/// to the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(Uuid);

impl CommandId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the string form an actor echoed back in a response.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Default for CommandId {
    fn default() -> Self {
        CommandId::new()
    }
}
