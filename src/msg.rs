//! ## Twitch message types
//!
//! Each type in this module is built from a single [`IrcMessageRef`]
//! by its [`FromIrc`] implementation. Building is pure: it only reads
//! the line, and either produces the typed value or fails with
//! [`MessageParseError`].
//!
//! All types own their data, so they may be cached or sent across threads.

#[macro_use]
mod macros;

use crate::irc::IrcMessageRef;
use crate::maybe_unescape;
use smallvec::SmallVec;

/// Implemented for types which may be built from a base [`IrcMessageRef`].
pub trait FromIrc: Sized + private::Sealed {
  /// Attempt to build `Self` from an [`IrcMessageRef`].
  fn from_irc(message: &IrcMessageRef<'_>) -> Result<Self, MessageParseError>;
}

/// Failed to build a typed message from a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageParseError;
impl std::fmt::Display for MessageParseError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("failed to parse message")
  }
}
impl std::error::Error for MessageParseError {}

/// A chat badge.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
  feature = "serde",
  derive(serde::Serialize, serde::Deserialize),
  serde(rename_all = "lowercase")
)]
pub enum Badge {
  /// `staff/1`
  Staff,

  /// `turbo/1`
  Turbo,

  /// `broadcaster/1`
  Broadcaster,

  /// `moderator/1`
  Moderator,

  /// `subscriber/{variant}` from `badges` + `subscriber/{months}` from `badge_info`.
  Subscriber(Subscriber),

  /// Some other badge.
  Other(BadgeData),
}

impl Badge {
  /// Get the base [`BadgeData`].
  pub fn as_badge_data(&self) -> BadgeData {
    BadgeData::from(self.clone())
  }
}

impl From<Badge> for BadgeData {
  fn from(value: Badge) -> Self {
    let simple = |name: &str| BadgeData {
      name: name.into(),
      version: "1".into(),
      extra: None,
    };
    match value {
      Badge::Staff => simple("staff"),
      Badge::Turbo => simple("turbo"),
      Badge::Broadcaster => simple("broadcaster"),
      Badge::Moderator => simple("moderator"),
      Badge::Subscriber(Subscriber { version, months }) => BadgeData {
        name: "subscriber".into(),
        version,
        extra: Some(months.to_string()),
      },
      Badge::Other(data) => data,
    }
  }
}

impl From<BadgeData> for Badge {
  fn from(value: BadgeData) -> Self {
    match value.name.as_str() {
      "staff" => Self::Staff,
      "turbo" => Self::Turbo,
      "broadcaster" => Self::Broadcaster,
      "moderator" => Self::Moderator,
      "subscriber" => Self::Subscriber(Subscriber {
        months: value
          .extra
          .as_deref()
          .and_then(|v| v.parse().ok())
          .unwrap_or(1),
        version: value.version,
      }),
      _ => Self::Other(value),
    }
  }
}

/// A subscriber badge.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Subscriber {
  version: String,
  months: u64,
}

generate_getters! {
  for Subscriber as self {
    /// Version of the badge.
    ///
    /// This comes from the `badges` tag.
    version -> &str = self.version.as_ref(),

    /// Number of months subscribed.
    ///
    /// This comes from the `badge_info` tag.
    months -> u64,
  }
}

/// Basic info about a badge.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BadgeData {
  name: String,
  version: String,
  extra: Option<String>,
}

generate_getters! {
  for BadgeData as self {
    /// Name of the badge, e.g. `subscriber`.
    name -> &str = self.name.as_ref(),

    /// Version of the badge.
    version -> &str = self.version.as_ref(),

    /// Extra badge info, such as the exact number of
    /// subscribed months for `subscriber`.
    ///
    /// This comes from the `badge_info` tag.
    extra -> Option<&str> = self.extra.as_deref(),
  }
}

/// Basic information about a user.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
  id: String,
  login: String,
  name: String,
}

generate_getters! {
  for User as self {
    /// Id of the user.
    id -> &str = self.id.as_ref(),

    /// Login of the user.
    login -> &str = self.login.as_ref(),

    /// Display name.
    ///
    /// This is the name which appears in chat, and may contain arbitrary unicode characters.
    /// This is in contrast to [`User::login`] which is always only ASCII.
    ///
    /// Falls back to the login when the display name tag is empty.
    name -> &str = self.name.as_ref(),
  }
}

impl User {
  fn from_irc(message: &IrcMessageRef<'_>, login: &str) -> Self {
    let name = message
      .tag(crate::Tag::DisplayName)
      .filter(is_not_empty)
      .map(|name| maybe_unescape(name).trim_end().to_owned())
      .unwrap_or_else(|| login.to_owned());
    User {
      id: message.tag(crate::Tag::UserId).unwrap_or_default().into(),
      login: login.into(),
      name,
    }
  }
}

fn is_not_empty<T: AsRef<str>>(s: &T) -> bool {
  !s.as_ref().is_empty()
}

fn parse_timestamp(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
  use chrono::TimeZone;
  chrono::Utc.timestamp_millis_opt(s.parse().ok()?).single()
}

fn parse_message_text(input: &str) -> (&str, bool) {
  let Some(s) = input.strip_prefix("\u{0001}ACTION ") else {
    return (input, false);
  };
  let Some(s) = s.strip_suffix('\u{0001}') else {
    return (input, false);
  };
  (s, true)
}

fn split_comma(s: &str) -> impl DoubleEndedIterator<Item = &str> + '_ {
  s.split(',').filter(|v| !v.is_empty())
}

fn parse_badges(badges: &str, badge_info: &str) -> Vec<Badge> {
  if badges.is_empty() {
    return Vec::new();
  }

  let badge_info = badge_info
    .split(',')
    .flat_map(|info| info.split_once('/'))
    .collect::<SmallVec<[_; 32]>>();

  badges
    .split(',')
    .flat_map(|badge| badge.split_once('/'))
    .map(|(name, version)| {
      BadgeData {
        name: name.into(),
        version: version.into(),
        extra: badge_info
          .iter()
          .find(|(needle, _)| *needle == name)
          .map(|(_, value)| (*value).to_owned()),
      }
      .into()
    })
    .collect()
}

fn badges_of(message: &IrcMessageRef<'_>) -> Vec<Badge> {
  message
    .tag(crate::Tag::Badges)
    .map(|badges| parse_badges(badges, message.tag(crate::Tag::BadgeInfo).unwrap_or_default()))
    .unwrap_or_default()
}

fn parse_bool(v: &str) -> bool {
  v.parse::<u8>().ok().map(|n| n > 0).unwrap_or(false)
}

pub mod chat_message;
pub use chat_message::*;
pub mod host;
pub use host::*;
pub mod membership;
pub use membership::*;
pub mod notice;
pub use notice::*;
pub mod room_state;
pub use room_state::*;
pub mod user_notice;
pub use user_notice::*;
pub mod user_state;
pub use user_state::*;
pub mod whisper;
pub use whisper::*;

mod private {
  pub trait Sealed {}
}
impl private::Sealed for ChatMessage {}
impl private::Sealed for HostTarget {}
impl private::Sealed for Membership {}
impl private::Sealed for ModeratorChange {}
impl private::Sealed for Names {}
impl private::Sealed for Notice {}
impl private::Sealed for RoomStateUpdate {}
impl private::Sealed for SubscriptionNotice {}
impl private::Sealed for ResubscriptionNotice {}
impl private::Sealed for UserState {}
impl private::Sealed for WhisperMessage {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn badges_with_info() {
    let badges = parse_badges("moderator/1,subscriber/12,glhf-pledge/1", "subscriber/22");
    assert_eq!(badges.len(), 3);
    assert_eq!(badges[0], Badge::Moderator);
    match &badges[1] {
      Badge::Subscriber(sub) => {
        assert_eq!(sub.version(), "12");
        assert_eq!(sub.months(), 22);
      }
      other => panic!("expected subscriber badge, got {other:?}"),
    }
    assert_eq!(badges[2].as_badge_data().name(), "glhf-pledge");
  }

  #[test]
  fn empty_badges() {
    assert!(parse_badges("", "").is_empty());
  }

  #[test]
  fn action_text() {
    assert_eq!(parse_message_text("\u{0001}ACTION waves\u{0001}"), ("waves", true));
    assert_eq!(parse_message_text("waves"), ("waves", false));
    assert_eq!(
      parse_message_text("\u{0001}ACTION unterminated"),
      ("\u{0001}ACTION unterminated", false)
    );
  }

  #[test]
  fn bools() {
    assert!(parse_bool("1"));
    assert!(!parse_bool("0"));
    assert!(!parse_bool(""));
    assert!(!parse_bool("yes"));
  }
}
