//! Bounded, condition-driven scans over the session log.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    Event, EventMatcher,
    log::{Batch, Closure, EventLog},
};

/// Outcome of a scan for a matching event.
#[derive(Debug)]
pub(crate) enum Scan {
    /// First match at or after the start position.
    Found { index: usize, event: Arc<Event> },
    /// Deadline passed with every appended event inspected.
    TimedOut,
    /// Log closed with every appended event inspected.
    Closed(Closure),
}

/// Scan forward from `from` for the first event accepted by `matcher`,
/// blocking on the log's condition variable until `deadline`.
///
/// Scanning resumes at the first uninspected event after every wakeup, so
/// each appended event is inspected at most once per scan. The matcher runs
/// outside the log mutex.
pub(crate) fn scan(
    log: &EventLog,
    from: usize,
    matcher: &EventMatcher,
    deadline: Instant,
) -> Scan {
    let mut next = from;
    loop {
        match log.wait_from(next, deadline) {
            Batch::Events(events) => {
                if let Some(offset) = events.iter().position(|e| matcher.matches(e)) {
                    return Scan::Found {
                        index: next + offset,
                        event: events[offset].clone(),
                    };
                }
                next += events.len();
            }
            Batch::TimedOut => return Scan::TimedOut,
            Batch::Closed(closure) => return Scan::Closed(closure),
        }
    }
}

/// Deadline `timeout` from now. Saturates instead of overflowing.
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(60 * 60 * 24 * 365))
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::EventRecord;

    fn log_with(names: &[&str]) -> Arc<EventLog> {
        let log = Arc::new(EventLog::with_capacity(8));
        for name in names {
            log.append(EventRecord::new(*name)).unwrap();
        }
        log
    }

    #[test]
    fn finds_first_match_at_or_after_start() {
        let log = log_with(&["a", "b", "a", "b"]);
        let matcher = EventMatcher::by_name("b");
        let deadline = deadline_after(Duration::ZERO);
        assert!(matches!(scan(&log, 0, &matcher, deadline), Scan::Found { index: 1, .. }));
        assert!(matches!(scan(&log, 2, &matcher, deadline), Scan::Found { index: 3, .. }));
        assert!(matches!(scan(&log, 4, &matcher, deadline), Scan::TimedOut));
    }

    #[test]
    fn inspects_each_event_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let log = log_with(&["x", "x", "x"]);
        let calls = Arc::new(AtomicUsize::new(0));
        let matcher = {
            let calls = calls.clone();
            EventMatcher::by_fn(move |e| {
                calls.fetch_add(1, Ordering::SeqCst);
                e.name() == "hit"
            })
        };
        let producer = {
            let log = log.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                log.append(EventRecord::new("x")).unwrap();
                thread::sleep(Duration::from_millis(20));
                log.append(EventRecord::new("hit")).unwrap();
            })
        };
        let result = scan(&log, 0, &matcher, deadline_after(Duration::from_secs(5)));
        producer.join().unwrap();
        assert!(matches!(result, Scan::Found { index: 4, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn close_releases_blocked_scan() {
        let log = log_with(&[]);
        let closer = {
            let log = log.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                log.close(Closure::Closed);
            })
        };
        let started = Instant::now();
        let result = scan(
            &log,
            0,
            &EventMatcher::any(),
            deadline_after(Duration::from_secs(10)),
        );
        closer.join().unwrap();
        assert!(matches!(result, Scan::Closed(Closure::Closed)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn huge_timeout_does_not_overflow() {
        let _ = deadline_after(Duration::MAX);
    }
}
