//! End-to-end scenarios against a simulated soft keyboard that runs its
//! callbacks on a dedicated thread, the way a real input method service does.

use std::{
    sync::{
        Arc,
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use vigil::*;

const TIMEOUT: Duration = Duration::from_secs(5);
const NOT_EXPECT_TIMEOUT: Duration = Duration::from_millis(100);

enum Message {
    Focus { marker: String, show: bool },
    Command(Command),
    Shutdown,
}

#[derive(Debug, Default)]
struct KeyboardState {
    text: String,
    input_view_shown: bool,
}

/// External handle standing in for the app that owns the focused editor.
#[derive(Clone)]
struct Editor {
    tx: Sender<Message>,
}

impl Editor {
    fn focus(&self, marker: &str, show: bool) {
        self.tx
            .send(Message::Focus {
                marker: marker.to_owned(),
                show,
            })
            .unwrap();
    }
}

struct Keyboard {
    tx: Sender<Message>,
    rx: Option<Receiver<Message>>,
    worker: Option<JoinHandle<()>>,
}

impl Keyboard {
    fn new() -> (Self, Editor) {
        let (tx, rx) = mpsc::channel();
        let editor = Editor { tx: tx.clone() };
        (
            Self {
                tx,
                rx: Some(rx),
                worker: None,
            },
            editor,
        )
    }
}

fn run_keyboard(rx: Receiver<Message>, tracer: Tracer, state: Arc<Mutex<KeyboardState>>) {
    let recorder = tracer.recorder().clone();
    tracer.record("onCreate", Arguments::new(), || ());

    while let Ok(message) = rx.recv() {
        match message {
            Message::Focus { marker, show } => {
                tracer.record(
                    "onStartInput",
                    Arguments::new()
                        .with("marker", marker.as_str())
                        .with("restarting", false),
                    || (),
                );
                if show {
                    tracer.record("showSoftInput", Arguments::new(), || {
                        tracer.record(
                            "onStartInputView",
                            Arguments::new().with("marker", marker.as_str()),
                            || state.lock().input_view_shown = true,
                        );
                    });
                }
            }
            Message::Command(command) => match command.name() {
                "commitText" => {
                    let text = command.arguments().get_str("text").unwrap_or_default();
                    let selection = {
                        let mut state = state.lock();
                        state.text.push_str(text);
                        state.text.len() as i64
                    };
                    tracer.record(
                        "onUpdateSelection",
                        Arguments::new().with("selStart", selection),
                        || (),
                    );
                    let _ = recorder.respond(&command, true);
                }
                "getTextBeforeCursor" => {
                    let n = command.arguments().get_i64("n").unwrap_or(0) as usize;
                    let before = {
                        let state = state.lock();
                        let start = state.text.len().saturating_sub(n);
                        state.text[start..].to_owned()
                    };
                    let _ = recorder.respond(&command, before);
                }
                "crash" => {
                    recorder.report_failure("keyboard process died");
                }
                _ => {
                    let _ = recorder.respond(&command, Value::Null);
                }
            },
            Message::Shutdown => break,
        }
    }

    tracer.record("onDestroy", Arguments::new(), || ());
}

impl Actor for Keyboard {
    fn install(&mut self, ctx: &ActorContext) -> Result {
        let rx = self.rx.take().ok_or(Error::SessionClosed)?;
        let state = Arc::new(Mutex::new(KeyboardState {
            text: ctx.settings().get_str("initialText").unwrap_or_default().to_owned(),
            input_view_shown: false,
        }));
        let probe_state = state.clone();
        let tracer = ctx.tracer(move || {
            let state = probe_state.lock();
            Snapshot::new()
                .with("textLength", state.text.len() as i64)
                .with("inputViewShown", state.input_view_shown)
        });
        let worker = thread::Builder::new()
            .name("ime-main".into())
            .spawn(move || run_keyboard(rx, tracer, state))?;
        self.worker = Some(worker);
        Ok(())
    }

    fn send_command(&mut self, command: &Command) -> Result {
        self.tx
            .send(Message::Command(command.clone()))
            .map_err(|_| Error::ActorFailed("keyboard thread gone".into()))
    }

    fn uninstall(&mut self) -> Result {
        let _ = self.tx.send(Message::Shutdown);
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| Error::ActorFailed("keyboard thread panicked".into()))?;
        }
        Ok(())
    }
}

fn config() -> SessionConfig {
    SessionConfig::default()
        .with_actor_name("keyboard")
        .with_ready_event("onCreate")
        .with_bind_timeout(TIMEOUT)
}

fn marker_matcher(name: &'static str, marker: &str) -> EventMatcher {
    EventMatcher::by_name(name).with_argument("marker", marker)
}

#[test]
fn focus_without_show_then_with_show() -> Result {
    let (keyboard, editor) = Keyboard::new();
    let session = Session::open(config(), keyboard)?;
    let mut stream = session.open_stream();

    editor.focus("A", false);
    let start = stream.expect_event(marker_matcher("onStartInput", "A"), TIMEOUT)?;
    assert_eq!(start.thread_name(), "ime-main");
    assert_eq!(start.arguments().get_bool("restarting"), Some(false));
    stream.not_expect_event("showSoftInput", NOT_EXPECT_TIMEOUT)?;

    editor.focus("B", true);
    let events = stream.expect_sequence(
        &[
            marker_matcher("onStartInput", "B"),
            marker_matcher("onStartInputView", "B"),
            EventMatcher::by_name("showSoftInput"),
        ],
        TIMEOUT,
    )?;
    assert_eq!(events[1].nest_level(), 1);
    assert_eq!(events[2].nest_level(), 0);
    assert_eq!(events[1].enter_state().get_bool("inputViewShown"), Some(false));
    assert_eq!(events[1].exit_state().get_bool("inputViewShown"), Some(true));

    session.close()
}

#[test]
fn commands_correlate_among_callbacks() -> Result {
    let (keyboard, _editor) = Keyboard::new();
    let session = Session::open(config().with_actor_setting("initialText", "say "), keyboard)?;
    let mut stream = session.open_stream();

    let commit = session.send_command("commitText", Arguments::new().with("text", "hello"))?;
    let update = stream.expect_event(EventMatcher::by_name("onUpdateSelection"), TIMEOUT)?;
    assert_eq!(update.arguments().get_i64("selStart"), Some(9));
    let committed = stream.expect_command(&commit, TIMEOUT)?;
    assert_eq!(committed.return_value(), Some(&Value::Bool(true)));

    let before = session.call(
        "getTextBeforeCursor",
        Arguments::new().with("n", 3),
        TIMEOUT,
    )?;
    assert_eq!(before.return_value().and_then(Value::as_str), Some("llo"));

    let unknown = session.call("performEditorAction", Arguments::new(), TIMEOUT)?;
    assert!(unknown.is_null_return());

    session.close()
}

#[test]
fn forked_streams_observe_from_other_threads() -> Result {
    let (keyboard, editor) = Keyboard::new();
    let session = Session::open(config(), keyboard)?;
    let stream = session.open_stream();

    let observers: Vec<_> = (0..4)
        .map(|_| {
            let mut fork = stream.copy();
            thread::spawn(move || {
                fork.expect_event(marker_matcher("onStartInput", "C"), TIMEOUT)
                    .map(|e| e.sequence())
            })
        })
        .collect();

    editor.focus("C", false);
    let sequences: Vec<u64> = observers
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect::<Result<_>>()?;
    assert!(sequences.windows(2).all(|w| w[0] == w[1]));

    // The original stream was never consumed.
    assert_eq!(
        stream.find(marker_matcher("onStartInput", "C")).map(|e| e.sequence()),
        Some(sequences[0])
    );
    session.close()
}

#[test]
fn crash_releases_waiters_and_fails_session() {
    let (keyboard, _editor) = Keyboard::new();
    let session = Session::open(config(), keyboard).unwrap();
    let mut stream = session.open_stream();

    let started = Instant::now();
    session.send_command("crash", Arguments::new()).unwrap();
    let err = stream
        .expect_event("onFinishInput", Duration::from_secs(30))
        .unwrap_err();
    assert!(matches!(&err, Error::ActorFailed(reason) if reason == "keyboard process died"));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(session.state(), SessionState::Failed);

    assert!(matches!(session.close(), Err(Error::ActorFailed(_))));
    assert_eq!(session.state(), SessionState::Failed);
}

#[test]
fn teardown_events_recorded_on_close() -> Result {
    let (keyboard, _editor) = Keyboard::new();
    let session = Session::open(config(), keyboard)?;
    session.close()?;

    let names: Vec<_> = session.events().iter().map(|e| e.name().to_owned()).collect();
    assert_eq!(names, vec!["onCreate", "onDestroy"]);
    assert!(session.dump().contains("onDestroy"));
    Ok(())
}

#[test]
fn scope_reports_timeout_with_dump() {
    let (keyboard, editor) = Keyboard::new();
    let result = Session::scope(config(), keyboard, |session| {
        let mut stream = session.open_stream();
        editor.focus("D", false);
        stream.expect_event(marker_matcher("onStartInput", "D"), TIMEOUT)?;
        stream.expect_event("onStartInputView", Duration::from_millis(50))
    });

    match result {
        Err(Error::Timeout { expected, dump, .. }) => {
            assert!(expected.contains("onStartInputView"));
            assert!(dump.contains("onStartInput {marker: \"D\""));
            assert!(dump.contains("-> (end of log)"));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}
