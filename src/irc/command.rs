use std::fmt::Display;

use crate::common::Span;

macro_rules! commands {
  ($($(#[$meta:meta])* $name:ident = $value:literal,)*) => {
    /// A Twitch IRC command.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum Command<'src> {
      $($(#[$meta])* $name,)*
      /// Unknown command
      Other(&'src str),
    }

    impl<'src> Command<'src> {
      /// Get the string value of the [`Command`].
      pub fn as_str(&self) -> &'src str {
        match self {
          $(Command::$name => $value,)*
          Command::Other(cmd) => cmd,
        }
      }

      fn known(word: &str) -> Option<Command<'static>> {
        match word {
          $($value => Some(Command::$name),)*
          _ => None,
        }
      }
    }
  };
}

commands! {
  /// Keepalive request from the server
  Ping = "PING",
  /// Keepalive reply
  Pong = "PONG",
  /// A user joined a room
  Join = "JOIN",
  /// A user left a room
  Part = "PART",
  /// A chat message
  Privmsg = "PRIVMSG",
  /// A private message to the session user
  Whisper = "WHISPER",
  /// General notices from the server
  Notice = "NOTICE",
  /// The server is about to restart
  Reconnect = "RECONNECT",
  /// Room settings
  RoomState = "ROOMSTATE",
  /// Subscriptions and other room events
  UserNotice = "USERNOTICE",
  /// The session user's state in a room
  UserState = "USERSTATE",
  /// Capability negotiation
  Capability = "CAP",
  /// Moderator status granted or revoked
  Mode = "MODE",
  /// Host mode started or stopped
  HostTarget = "HOSTTARGET",
  /// `001`, the login was accepted
  RplWelcome = "001",
  /// `353`, users already in a room
  RplNames = "353",
  /// `366`
  RplEndOfNames = "366",
}

impl<'src> Display for Command<'src> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A command which refers back into the line it was parsed from.
#[derive(Clone, Copy)]
pub(super) enum RawCommand {
  Known(Command<'static>),
  Other(Span),
}

impl RawCommand {
  #[inline]
  pub(super) fn get<'src>(&self, src: &'src str) -> Command<'src> {
    match self {
      RawCommand::Known(command) => *command,
      RawCommand::Other(span) => Command::Other(&src[*span]),
    }
  }
}

/// `COMMAND <rest>`
///
/// Returns `None` if the command is empty.
#[inline(always)]
pub(super) fn parse(src: &str, pos: &mut usize) -> Option<RawCommand> {
  let rest = &src[*pos..];
  let (word, consumed) = match rest.split_once(' ') {
    Some((word, _)) => (word, word.len() + 1),
    None => (rest, rest.len()),
  };
  if word.is_empty() {
    return None;
  }

  let command = match Command::known(word) {
    Some(command) => RawCommand::Known(command),
    None => RawCommand::Other(Span::from(*pos..*pos + word.len())),
  };
  *pos += consumed;
  Some(command)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn command() {
    let data = "PING <rest>";
    let mut pos = 0;

    let command = parse(data, &mut pos).unwrap();
    assert_eq!(command.get(data), Command::Ping);
    assert_eq!(&data[pos..], "<rest>");
  }

  #[test]
  fn numeric_and_unknown() {
    let data = "353 bot = #room :a b";
    let mut pos = 0;
    assert_eq!(parse(data, &mut pos).unwrap().get(data), Command::RplNames);

    let data = "CLEARCHAT";
    let mut pos = 0;
    let command = parse(data, &mut pos).unwrap().get(data);
    assert_eq!(command, Command::Other("CLEARCHAT"));
    assert_eq!(command.to_string(), "CLEARCHAT");
    assert_eq!(pos, data.len());
  }

  #[test]
  fn empty() {
    let mut pos = 0;
    assert!(parse(" PING", &mut pos).is_none());
  }
}
