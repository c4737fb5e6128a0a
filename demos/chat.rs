//! Joins a room and prints what happens in it.
//!
//! ```text,ignore
//! $ cargo run --example chat -- \
//!   --nick my_bot \
//!   --token oauth:yfvzjqb705z12hrhy1zkwa9xt7v662 \
//!   --room forsen
//! ```
//!
//! Without `--token`, the session logs in anonymously and only reads.
//! With it, the bot answers `!ping` in chat and in whispers.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tmi_session::client::TlsTransport;
use tmi_session::{Credentials, Event, EventKind, Session};

#[derive(Parser)]
#[command(author, version)]
struct Args {
  /// Login of the bot account
  #[arg(long)]
  nick: Option<String>,

  /// Login oauth2 token
  #[arg(long)]
  token: Option<String>,

  /// Room to join
  #[arg(long)]
  room: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let credentials = match (args.nick, args.token) {
    (Some(nick), Some(token)) => Credentials::new(nick, token),
    _ => Credentials::anon(),
  };
  let anon = credentials.is_anon();

  let session = Session::builder()
    .credentials(credentials)
    .room(&args.room)
    .build(Arc::new(TlsTransport::new()?));

  session.subscribe(EventKind::Connected, |_| println!("connected"));
  session.subscribe(EventKind::Message, |event| {
    if let Event::Message(msg) = event {
      println!("#{} {}: {}", msg.room(), msg.display_name(), msg.text());
    }
  });
  session.subscribe(EventKind::RoomStateChanged, |event| {
    if let Event::RoomStateChanged(state) = event {
      println!("room state: {state:?}");
    }
  });
  let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel();
  let done = done_tx.clone();
  session.subscribe(EventKind::LoginError, move |event| {
    if let Event::LoginError { username, message } = event {
      eprintln!("login failed for {username}: {message}");
    }
    let _ = done.send(());
  });
  session.subscribe(EventKind::Disconnected, move |_| {
    let _ = done_tx.send(());
  });

  if !anon {
    let chat = session.downgrade();
    session.subscribe(EventKind::ChatCommand, move |event| {
      let (Event::ChatCommand { command, .. }, Some(session)) = (event, chat.upgrade()) else {
        return;
      };
      if command.command() == "ping" {
        if let Err(e) = session.send_message("pong") {
          eprintln!("{e}");
        }
      }
    });
    let whisper = session.downgrade();
    session.subscribe(EventKind::WhisperCommand, move |event| {
      let (Event::WhisperCommand { command, whisper: msg }, Some(session)) =
        (event, whisper.upgrade())
      else {
        return;
      };
      if command.command() == "ping" {
        if let Err(e) = session.send_whisper(msg.sender().login(), "pong") {
          eprintln!("{e}");
        }
      }
    });
  }

  session.connect()?;

  tokio::select! {
    _ = tokio::signal::ctrl_c() => {
      println!("CTRL-C");
      session.disconnect();
    }
    _ = done_rx.recv() => {
      println!("disconnected");
    }
  }

  Ok(())
}
