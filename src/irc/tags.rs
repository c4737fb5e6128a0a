use std::fmt::Display;
use std::ops::Deref;

use crate::common::Span;

macro_rules! tags_def {
  (
    $tag:ident;
    $($(#[$meta:meta])* $key:literal = $name:ident),* $(,)?
  ) => {
    /// A known tag key.
    #[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
    #[non_exhaustive]
    pub enum $tag<'src> {
      $(
        $(#[$meta])*
        $name,
      )*
      Unknown(&'src str),
    }

    impl<'src> $tag<'src> {
      #[doc = concat!("Get the string value of the [`", stringify!($tag), "`].")]
      #[inline]
      pub fn as_str(&self) -> &'src str {
        match self {
          $(Self::$name => $key,)*
          Self::Unknown(key) => key,
        }
      }

      #[doc = concat!("Parse a [`", stringify!($tag), "`] from a string.")]
      #[inline]
      pub fn parse(src: &'src str) -> Self {
        match src {
          $($key => Self::$name,)*
          _ => Self::Unknown(src),
        }
      }
    }
  }
}

impl<'src> From<&'src str> for Tag<'src> {
  fn from(value: &'src str) -> Self {
    Tag::parse(value)
  }
}

tags_def! {
  Tag;
  "msg-id" = MsgId,
  "badges" = Badges,
  "badge-info" = BadgeInfo,
  "display-name" = DisplayName,
  "emote-only" = EmoteOnly,
  "emotes" = Emotes,
  "emote-sets" = EmoteSets,
  "flags" = Flags,
  "id" = Id,
  "mod" = Mod,
  "room-id" = RoomId,
  "subscriber" = Subscriber,
  "tmi-sent-ts" = TmiSentTs,
  "turbo" = Turbo,
  "user-id" = UserId,
  "user-type" = UserType,
  "login" = Login,
  "bits" = Bits,
  "color" = Color,
  "system-msg" = SystemMsg,
  "thread-id" = ThreadId,
  "message-id" = MessageId,

  /// Followers-only mode, in minutes. `-1` means disabled.
  "followers-only" = FollowersOnly,
  "r9k" = R9K,
  /// Slow mode, in seconds. `0` means disabled.
  "slow" = Slow,
  "subs-only" = SubsOnly,

  "msg-param-cumulative-months" = MsgParamCumulativeMonths,
  "msg-param-months" = MsgParamMonths,
  "msg-param-streak-months" = MsgParamStreakMonths,
  "msg-param-should-share-streak" = MsgParamShouldShareStreak,
  "msg-param-sub-plan" = MsgParamSubPlan,
  "msg-param-sub-plan-name" = MsgParamSubPlanName,
}

impl<'src> Display for Tag<'src> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Default, Clone)]
pub(super) struct RawTags(Vec<TagPair>);

impl Deref for RawTags {
  type Target = Vec<TagPair>;

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

#[derive(Clone, Copy)]
pub(super) struct TagPair {
  key: Span,
  value: Span,
}

impl TagPair {
  // key=value
  // ^^^
  #[inline]
  pub fn key(&self) -> Span {
    self.key
  }

  // key=value
  //     ^^^^^
  #[inline]
  pub fn value(&self) -> Span {
    self.value
  }

  #[inline]
  pub fn get<'src>(&self, src: &'src str) -> (&'src str, &'src str) {
    (&src[self.key], &src[self.value])
  }
}

/// `@a=a;b=b;c= <rest>`
///
/// Each entry is split on its first `=`. An entry without `=`
/// has an empty value.
pub(super) fn parse(src: &str, pos: &mut usize) -> Option<RawTags> {
  let rest = src[*pos..].strip_prefix('@')?;
  let start = *pos + 1;
  let end = match rest.find(' ') {
    Some(end) => start + end,
    None => src.len(),
  };

  let mut tags = Vec::with_capacity(32);
  let mut entry_start = start;
  for entry in src[start..end].split(';') {
    let entry_end = entry_start + entry.len();
    if !entry.is_empty() {
      let pair = match entry.find('=') {
        Some(eq) => TagPair {
          key: Span::from(entry_start..entry_start + eq),
          value: Span::from(entry_start + eq + 1..entry_end),
        },
        None => TagPair {
          key: Span::from(entry_start..entry_end),
          value: Span::from(entry_end..entry_end),
        },
      };
      tags.push(pair);
    }
    entry_start = entry_end + 1;
  }

  *pos = (end + 1).min(src.len());

  Some(RawTags(tags))
}
