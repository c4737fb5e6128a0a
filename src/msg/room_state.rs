//! Room settings, and partial updates to them.

use super::{parse_bool, MessageParseError};
use crate::irc::{Command, IrcMessageRef, Tag};
use chrono::Duration;

/// Followers-only setting of a room.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FollowersOnly {
  /// Followers-only mode is disabled.
  ///
  /// Anyone can send chat messages within the bounds
  /// of the other chat settings.
  #[default]
  Disabled,

  /// Followers-only mode is enabled, with an optional duration.
  ///
  /// If the duration is [`None`], then all followers can chat.
  /// Otherwise, only followers which have a follow age of at
  /// least the set duration can chat.
  Enabled(Option<Duration>),
}

/// The known settings of a room.
///
/// This starts out with every mode disabled, and is updated by
/// overlaying each [`RoomStateUpdate`] received for the room.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoomState {
  /// Room name, without the `#`.
  pub room: String,

  /// ID of the room.
  pub room_id: String,

  /// Chat messages may only contain emotes.
  pub emote_only: bool,

  /// Only followers (optionally with a minimum followage) can chat.
  pub followers_only: FollowersOnly,

  /// Only unique messages may be sent to chat.
  pub r9k: bool,

  /// Minimum time between messages of a single user, in seconds.
  ///
  /// `0` means slow mode is disabled.
  pub slow: u64,

  /// Users may only send messages if they have an active subscription.
  pub subscriber_only: bool,
}

impl RoomState {
  /// Overlay `update` on top of this state.
  ///
  /// Settings which are absent from the update keep their current value.
  pub fn apply(&mut self, update: &RoomStateUpdate) {
    if !update.room.is_empty() {
      self.room.clone_from(&update.room);
    }
    if let Some(room_id) = &update.room_id {
      self.room_id.clone_from(room_id);
    }
    if let Some(emote_only) = update.emote_only {
      self.emote_only = emote_only;
    }
    if let Some(followers_only) = update.followers_only {
      self.followers_only = followers_only;
    }
    if let Some(r9k) = update.r9k {
      self.r9k = r9k;
    }
    if let Some(slow) = update.slow {
      self.slow = slow;
    }
    if let Some(subscriber_only) = update.subscriber_only {
      self.subscriber_only = subscriber_only;
    }
  }

  /// Returns a copy of this state with `update` applied.
  pub fn overlay(&self, update: &RoomStateUpdate) -> Self {
    let mut next = self.clone();
    next.apply(update);
    next
  }
}

/// A partial update to the settings of a room.
///
/// For every setting:
/// - [`None`] means no change.
/// - [`Some`] means the setting now has the given value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoomStateUpdate {
  /// Room this update applies to, without the `#`.
  pub room: String,
  pub room_id: Option<String>,
  pub emote_only: Option<bool>,
  pub followers_only: Option<FollowersOnly>,
  pub r9k: Option<bool>,
  pub slow: Option<u64>,
  pub subscriber_only: Option<bool>,
}

impl RoomStateUpdate {
  fn parse(message: &IrcMessageRef<'_>) -> Option<Self> {
    if message.command() != Command::RoomState {
      return None;
    }

    Some(RoomStateUpdate {
      room: message.channel()?.trim_start_matches('#').to_owned(),
      room_id: message.tag(Tag::RoomId).map(String::from),
      emote_only: message.tag(Tag::EmoteOnly).map(parse_bool),
      followers_only: message
        .tag(Tag::FollowersOnly)
        .and_then(|v| v.parse::<i64>().ok())
        .map(|n| match n {
          n if n > 0 => FollowersOnly::Enabled(Some(Duration::minutes(n))),
          0 => FollowersOnly::Enabled(None),
          _ => FollowersOnly::Disabled,
        }),
      r9k: message.tag(Tag::R9K).map(parse_bool),
      slow: message.tag(Tag::Slow).and_then(|v| v.parse().ok()),
      subscriber_only: message.tag(Tag::SubsOnly).map(parse_bool),
    })
  }
}

impl super::FromIrc for RoomStateUpdate {
  #[inline]
  fn from_irc(message: &IrcMessageRef<'_>) -> Result<Self, MessageParseError> {
    Self::parse(message).ok_or(MessageParseError)
  }
}
