//! Sent upon joining a room, or upon successfully sending a message to a room.
//!
//! Carries the session user's room-specific badges, color and emote sets.

use super::{badges_of, is_not_empty, parse_bool, split_comma, Badge, MessageParseError};
use crate::irc::{Command, IrcMessageRef, Tag};

/// The session user's state in a room.
///
/// Each one replaces the previous one wholesale.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserState {
  room: String,
  display_name: String,
  badges: Vec<Badge>,
  emote_sets: Vec<String>,
  color: Option<String>,
  is_moderator: bool,
  is_subscriber: bool,
  user_type: String,
}

generate_getters! {
  for UserState as self {
    /// Room in which this state applies, without the `#`.
    room -> &str = self.room.as_ref(),

    /// Display name of the user.
    display_name -> &str = self.display_name.as_ref(),

    /// Iterator over room-specific badges.
    badges -> impl DoubleEndedIterator<Item = &Badge> + ExactSizeIterator = self.badges.iter(),

    /// Iterator over the emote sets which are available in this room.
    emote_sets -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator
      = self.emote_sets.iter().map(|v| v.as_ref()),

    /// The user's selected name color.
    color -> Option<&str> = self.color.as_deref(),

    /// Whether the user is a moderator in this room.
    is_moderator -> bool,

    /// Whether the user is subscribed to this room.
    is_subscriber -> bool,

    /// Raw `user-type` tag.
    user_type -> &str = self.user_type.as_ref(),
  }
}

impl UserState {
  fn parse(message: &IrcMessageRef<'_>) -> Option<Self> {
    if message.command() != Command::UserState {
      return None;
    }

    let badges = badges_of(message);
    Some(UserState {
      room: message.channel()?.trim_start_matches('#').to_owned(),
      display_name: message
        .tag(Tag::DisplayName)
        .map(|name| crate::maybe_unescape(name).into_owned())
        .unwrap_or_default(),
      is_moderator: message.tag(Tag::Mod).is_some_and(parse_bool)
        || badges.contains(&Badge::Moderator)
        || badges.contains(&Badge::Broadcaster),
      is_subscriber: message.tag(Tag::Subscriber).is_some_and(parse_bool),
      badges,
      emote_sets: message
        .tag(Tag::EmoteSets)
        .map(|sets| split_comma(sets).map(String::from).collect())
        .unwrap_or_default(),
      color: message
        .tag(Tag::Color)
        .filter(is_not_empty)
        .map(String::from),
      user_type: message.tag(Tag::UserType).unwrap_or_default().into(),
    })
  }
}

impl super::FromIrc for UserState {
  #[inline]
  fn from_irc(message: &IrcMessageRef<'_>) -> Result<Self, MessageParseError> {
    Self::parse(message).ok_or(MessageParseError)
  }
}
