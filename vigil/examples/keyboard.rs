//! Keyboard Example
//!
//! Drives a toy soft keyboard running on its own thread and synchronizes with
//! it purely through recorded events.
//!
//! # Key Concepts Demonstrated
//!
//! - Binding a session on a readiness event (`onCreate`)
//! - Wrapping callbacks in a [`Tracer`] so each one is recorded with state
//! - Waiting for an event, and asserting another one never shows up
//! - Sending a command and correlating its response
//!
//! Run with `RUST_LOG=vigil=debug cargo run --example keyboard` to watch the
//! session transitions and matches.

use std::{
    sync::mpsc::{self, Sender},
    thread::{self, JoinHandle},
    time::Duration,
};

use tracing_subscriber::EnvFilter;
use vigil::*;

const TIMEOUT: Duration = Duration::from_secs(5);

enum Message {
    Focus(&'static str),
    Command(Command),
    Shutdown,
}

struct Keyboard {
    tx: Sender<Message>,
    rx: Option<mpsc::Receiver<Message>>,
    worker: Option<JoinHandle<()>>,
}

impl Actor for Keyboard {
    fn install(&mut self, ctx: &ActorContext) -> Result {
        let rx = self.rx.take().ok_or(Error::SessionClosed)?;
        let tracer = Tracer::stateless(ctx.recorder().clone());
        self.worker = Some(
            thread::Builder::new()
                .name("ime-main".into())
                .spawn(move || {
                    tracer.record("onCreate", Arguments::new(), || ());
                    while let Ok(message) = rx.recv() {
                        match message {
                            Message::Focus(marker) => {
                                tracer.record(
                                    "onStartInput",
                                    Arguments::new().with("marker", marker),
                                    || (),
                                );
                            }
                            Message::Command(command) => {
                                let _ = tracer.recorder().respond(&command, command.name().len() as i64);
                            }
                            Message::Shutdown => break,
                        }
                    }
                    tracer.record("onDestroy", Arguments::new(), || ());
                })?,
        );
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
            let _ = worker.join();
        }
        Ok(())
    }
}

fn main() -> Result {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let (tx, rx) = mpsc::channel();
    let editor = tx.clone();
    let keyboard = Keyboard {
        tx,
        rx: Some(rx),
        worker: None,
    };

    let config = SessionConfig::default()
        .with_actor_name("keyboard")
        .with_ready_event("onCreate");

    Session::scope(config, keyboard, |session| {
        let mut stream = session.open_stream();

        let _ = editor.send(Message::Focus("A"));
        let event = stream.expect_event(
            EventMatcher::by_name("onStartInput").with_argument("marker", "A"),
            TIMEOUT,
        )?;
        println!("observed {event}");

        stream.not_expect_event("showSoftInput", Duration::from_millis(200))?;
        println!("no showSoftInput, as expected");

        let response = session.call("getTextBeforeCursor", Arguments::new(), TIMEOUT)?;
        println!("command answered with {:?}", response.return_value());

        println!("{}", session.dump());
        Ok(())
    })
}
