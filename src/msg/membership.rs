//! Room membership: joins, parts, moderator changes, and the names list.

use super::MessageParseError;
use crate::irc::{Command, IrcMessageRef};

/// Whether a user entered or left a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MembershipKind {
  Join,
  Part,
}

/// A user entered or left a room.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Membership {
  kind: MembershipKind,
  room: String,
  user: String,
}

generate_getters! {
  for Membership as self {
    /// Join or part.
    kind -> MembershipKind,

    /// Room name, without the `#`.
    room -> &str = self.room.as_ref(),

    /// Login of the user.
    user -> &str = self.user.as_ref(),
  }
}

impl super::FromIrc for Membership {
  fn from_irc(message: &IrcMessageRef<'_>) -> Result<Self, MessageParseError> {
    let kind = match message.command() {
      Command::Join => MembershipKind::Join,
      Command::Part => MembershipKind::Part,
      _ => return Err(MessageParseError),
    };
    Ok(Membership {
      kind,
      room: room_of(message)?,
      user: message.nick().ok_or(MessageParseError)?.to_owned(),
    })
  }
}

/// A user was granted (`+o`) or lost (`-o`) moderator status.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModeratorChange {
  room: String,
  user: String,
  granted: bool,
}

generate_getters! {
  for ModeratorChange as self {
    /// Room name, without the `#`.
    room -> &str = self.room.as_ref(),

    /// Login of the user.
    user -> &str = self.user.as_ref(),

    /// `true` for `+o`, `false` for `-o`.
    granted -> bool,
  }
}

impl super::FromIrc for ModeratorChange {
  fn from_irc(message: &IrcMessageRef<'_>) -> Result<Self, MessageParseError> {
    if message.command() != Command::Mode {
      return Err(MessageParseError);
    }
    let mut params = message.params().ok_or(MessageParseError)?.split_whitespace();
    let granted = match params.next() {
      Some("+o") => true,
      Some("-o") => false,
      _ => return Err(MessageParseError),
    };
    Ok(ModeratorChange {
      room: room_of(message)?,
      user: params.next().ok_or(MessageParseError)?.to_owned(),
      granted,
    })
  }
}

/// Users which were already in the room at join time (`353`).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Names {
  room: String,
  users: Vec<String>,
}

generate_getters! {
  for Names as self {
    /// Room name, without the `#`.
    room -> &str = self.room.as_ref(),

    /// Logins of the listed users.
    users -> &[String] = &self.users,
  }
}

impl super::FromIrc for Names {
  fn from_irc(message: &IrcMessageRef<'_>) -> Result<Self, MessageParseError> {
    if message.command() != Command::RplNames {
      return Err(MessageParseError);
    }
    // `353 nick = #room :a b c`: the room follows the nick and `=`,
    // so it is found in the params rather than in the channel slot.
    let params = message.params().ok_or(MessageParseError)?;
    let (head, list) = params.split_once(':').ok_or(MessageParseError)?;
    let room = head
      .split_whitespace()
      .find_map(|token| token.strip_prefix('#'))
      .ok_or(MessageParseError)?;
    Ok(Names {
      room: room.to_owned(),
      users: list.split_whitespace().map(String::from).collect(),
    })
  }
}

fn room_of(message: &IrcMessageRef<'_>) -> Result<String, MessageParseError> {
  message
    .channel()
    .map(|channel| channel.trim_start_matches('#').to_owned())
    .ok_or(MessageParseError)
}
