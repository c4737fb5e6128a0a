//! ## tmi-session
//!
//! A Twitch chat session for a single room.
//!
//! Every line received from the server is classified into typed events
//! ([`Event`]) by an ordered rule table ([`Dispatcher`]), and delivered to
//! subscribers registered on the [`Session`] in the order the lines arrived.
//! Outgoing chat messages and whispers pass through independent
//! [`Throttle`] gates before reaching the [`Transport`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tmi_session::{Credentials, Event, EventKind, Session};
//!
//! # fn run(transport: Arc<dyn tmi_session::Transport>) -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::builder()
//!   .credentials(Credentials::new("my_bot", "oauth:token"))
//!   .room("pajlada")
//!   .build(transport);
//!
//! session.subscribe(EventKind::Message, |event| {
//!   if let Event::Message(msg) = event {
//!     println!("{}: {}", msg.display_name(), msg.text());
//!   }
//! });
//! session.connect()?;
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate tracing;

pub(crate) const fn assert_sync<T: ?Sized + Sync>() {}
macro_rules! static_assert_sync {
  ($T:ty) => {
    const _: () = {
      let _ = $crate::assert_sync::<$T>;
    };
  };
}

pub(crate) const fn assert_send<T: ?Sized + Send>() {}
macro_rules! static_assert_send {
  ($T:ty) => {
    const _: () = {
      let _ = $crate::assert_send::<$T>;
    };
  };
}

pub mod common;

pub mod irc;
pub use irc::*;

#[macro_use]
pub mod msg;
pub use msg::*;

pub mod command;
pub use command::CommandInvocation;

pub mod emotes;
pub use emotes::{EmoteCollection, EmoteInfo, EmoteSet, EmoteSpan, EmoteTier};

pub mod throttle;
pub use throttle::{Throttle, ThrottleConfig, Violation};

pub mod dispatch;
pub use dispatch::{DispatchContext, DispatchMode, Dispatcher, Event, EventKind, Outcome, SendKind};

pub mod transport;
pub use transport::{Priority, Transport, TransportError, TransportEvents};

pub mod session;
pub use session::{
  Config, ConnectionState, Credentials, RoomCommand, SendError, Sent, Session, SessionBuilder,
  Snapshot, SubscriptionId, WeakSession,
};

#[cfg(feature = "client")]
pub mod client;

use std::borrow::Cow;

/// Unescape a tag value.
///
/// Borrows `value` unless it contains an escape sequence.
/// Twitch escapes `;`, space, backslash, CR and LF. Any other escaped
/// character stands for itself, and a trailing lone backslash is dropped.
pub fn maybe_unescape<'a>(value: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
  let value: Cow<'_, str> = value.into();
  match value.find('\\') {
    Some(start) => Cow::Owned(unescape_from(&value, start)),
    None => value,
  }
}

fn unescape_from(input: &str, start: usize) -> String {
  let mut out = String::with_capacity(input.len());
  out.push_str(&input[..start]);

  let mut chars = input[start..].chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }
    match chars.next() {
      Some(':') => out.push(';'),
      Some('s') => out.push(' '),
      Some('r') => out.push('\r'),
      Some('n') => out.push('\n'),
      Some(other) => out.push(other),
      None => {}
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unescape_borrows_when_clean() {
    assert!(matches!(maybe_unescape("plain"), Cow::Borrowed("plain")));
  }

  #[test]
  fn unescape_known_sequences() {
    assert_eq!(maybe_unescape("Riot\\sGames"), "Riot Games");
    assert_eq!(maybe_unescape("a\\:b\\\\c"), "a;b\\c");
    assert_eq!(maybe_unescape("line\\r\\n"), "line\r\n");
  }
}
