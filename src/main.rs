//! Escape-room client binary: terminal front-end wired to the Socket.IO transport.

use std::env;

use anyhow::Context;
use escape_room_client::{
    config::ClientConfig,
    services::{
        dispatch::Command,
        runtime::{self, ClientHandle, RuntimeOptions},
    },
    state::RoomSession,
    transport::SocketIoConnector,
    view::RoomView,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::watch,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "commands: /auth <code> [name], /start, /hint, /submit, /set <control> <value>, \
/replay, /wake, /view, /quit; any other line is sent as chat";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::load();
    let room = env::args()
        .nth(1)
        .or_else(|| config.room.clone())
        .context("no room given: pass it as the first argument or set ESCAPE_ROOM")?;

    let connector = SocketIoConnector::new(config.socket_url());
    info!(%room, url = %connector.url(), "starting client");

    let session = RoomSession::from_config(&config, room.as_str());
    let options = RuntimeOptions::from_config(&config, &room);
    let (handle, views, task) = runtime::spawn(session, connector, options);

    tokio::spawn(print_views(views.clone()));
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                match parse_line(&line, config.player_name.as_deref()) {
                    Some(Input::Quit) => break,
                    Some(Input::ShowView) => println!("{}", *views.borrow()),
                    Some(Input::Help) => println!("{HELP}"),
                    Some(Input::Wake) => {
                        handle.wake();
                    }
                    Some(Input::Command(command)) => {
                        send(&handle, command);
                    }
                    None => {}
                }
            }
            _ = &mut shutdown => break,
        }
    }

    handle.shutdown();
    task.await.context("joining client runtime")?;
    Ok(())
}

fn send(handle: &ClientHandle, command: Command) {
    if !handle.send(command) {
        eprintln!("client stopped");
    }
}

/// A parsed line of terminal input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Command(Command),
    Wake,
    ShowView,
    Help,
    Quit,
}

fn parse_line(line: &str, default_name: Option<&str>) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Input::Command(Command::Chat(line.to_string())));
    };

    let (verb, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let args = args.trim();
    let input = match verb {
        "auth" => {
            let (code, name) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
            let name = match name.trim() {
                "" => default_name.unwrap_or_default(),
                name => name,
            };
            Input::Command(Command::Authenticate {
                name: name.to_string(),
                code: code.to_string(),
            })
        }
        "start" => Input::Command(Command::Start),
        "hint" => Input::Command(Command::Hint),
        "submit" => Input::Command(Command::Submit),
        "replay" => Input::Command(Command::Replay),
        "set" => {
            let (key, value) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
            Input::Command(Command::SetValue {
                key: key.to_string(),
                value: value.trim().to_string(),
            })
        }
        "wake" => Input::Wake,
        "view" => Input::ShowView,
        "quit" | "exit" => Input::Quit,
        _ => Input::Help,
    };
    Some(input)
}

/// Print the view when something other than the countdown changes, and new chat lines as they arrive.
async fn print_views(mut views: watch::Receiver<RoomView>) {
    let mut last: Option<RoomView> = None;
    let mut printed_lines = 0;

    while views.changed().await.is_ok() {
        let view = views.borrow_and_update().clone();

        if view.transcript.len() < printed_lines {
            printed_lines = 0;
        }
        for line in &view.transcript[printed_lines..] {
            println!("💬 {line}");
        }
        printed_lines = view.transcript.len();

        let only_timer_moved = last.as_ref().is_some_and(|last| {
            let mut quiet = view.clone();
            quiet.timer = last.timer.clone();
            quiet.transcript = last.transcript.clone();
            quiet == *last
        });
        if !only_timer_moved {
            println!("{view}");
        }
        last = Some(view);
    }
}

/// Configure tracing subscribers; logs go to stderr so they never interleave with the view.
fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
