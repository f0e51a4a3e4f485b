use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::Arc,
};

use crate::{Error, Event, Result, Session};

/// Write `events` in JSON Lines format: one JSON object per line, in log
/// order.
///
/// Meant for post-mortem inspection of a failed test; the field layout
/// follows [`Event`] and is not a stable format.
///
/// # Errors
///
/// Returns [`Error::IoError`] if writing fails, or [`Error::External`] if an
/// event cannot be serialized.
pub fn write_jsonl<W: Write>(events: &[Arc<Event>], mut writer: W) -> Result<()> {
    for event in events {
        serde_json::to_writer(&mut writer, event.as_ref()).map_err(Error::external)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

impl Session {
    /// Write every event recorded so far to `path` as JSON Lines.
    ///
    /// Returns the number of events written. Works on closed sessions too.
    ///
    /// # Example
    ///
    /// ```ignore
    /// if let Err(e) = run_scenario(&session) {
    ///     session.export_jsonl("target/failed-scenario.jsonl")?;
    ///     return Err(e);
    /// }
    /// ```
    pub fn export_jsonl<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let events = self.events();
        let file = File::create(path.as_ref())?;
        write_jsonl(&events, BufWriter::new(file))?;
        tracing::debug!(
            path = %path.as_ref().display(),
            events = events.len(),
            "session log exported"
        );
        Ok(events.len())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::{Arguments, event::make_event};

    #[test]
    fn writes_one_object_per_line() {
        let events = vec![
            Arc::new(make_event(0, "onCreate", Arguments::new())),
            Arc::new(make_event(
                1,
                "onStartInput",
                Arguments::new().with("marker", "A").with("restarting", false),
            )),
        ];
        let mut out = Vec::new();
        write_jsonl(&events, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["sequence"], 1);
        assert_eq!(second["name"], "onStartInput");
        assert_eq!(second["arguments"]["marker"], "A");
        assert_eq!(second["arguments"]["restarting"], false);
        assert_eq!(second["thread_name"], "test");
    }

    #[test]
    fn empty_log_writes_nothing() {
        let mut out = Vec::new();
        write_jsonl(&[], &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn session_export_to_file() {
        use crate::{Actor, ActorContext, EventRecord, SessionConfig};

        struct Ready;
        impl Actor for Ready {
            fn install(&mut self, ctx: &ActorContext) -> Result {
                ctx.recorder().record(EventRecord::new("ready"))?;
                Ok(())
            }
            fn uninstall(&mut self) -> Result {
                Ok(())
            }
        }

        let path = std::env::temp_dir().join("vigil_export_test.jsonl");
        let session = Session::open(SessionConfig::default(), Ready).unwrap();
        session.close().unwrap();
        assert_eq!(session.export_jsonl(&path).unwrap(), 1);

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert!(content.contains("\"name\":\"ready\""));

        let _ = std::fs::remove_file(&path);
    }
}
