//! Subscription announcements sent as `USERNOTICE`.
//!
//! Only `sub` and `resub` are modelled here. Other notice kinds
//! (gifts, raids, announcements) are left to the raw line observer.

use super::{badges_of, is_not_empty, parse_timestamp, Badge, MessageParseError, User};
use crate::irc::{Command, IrcMessageRef, Tag};
use crate::maybe_unescape;
use chrono::{DateTime, Utc};

/// Subscription tier.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SubPlan {
  /// `Prime`
  Prime,
  /// `1000`
  Tier1,
  /// `2000`
  Tier2,
  /// `3000`
  Tier3,
  /// Anything else, kept verbatim.
  Other(String),
}

impl SubPlan {
  /// Parse the `msg-param-sub-plan` tag value.
  pub fn parse(value: &str) -> Self {
    match value {
      "Prime" => Self::Prime,
      "1000" => Self::Tier1,
      "2000" => Self::Tier2,
      "3000" => Self::Tier3,
      other => Self::Other(other.to_owned()),
    }
  }

  /// The wire value of this plan.
  pub fn as_str(&self) -> &str {
    match self {
      Self::Prime => "Prime",
      Self::Tier1 => "1000",
      Self::Tier2 => "2000",
      Self::Tier3 => "3000",
      Self::Other(other) => other,
    }
  }
}

/// Fields shared by `sub` and `resub` notices.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct SubscriptionInfo {
  room: String,
  room_id: String,
  subscriber: User,
  plan: SubPlan,
  plan_name: String,
  system_message: Option<String>,
  text: Option<String>,
  badges: Vec<Badge>,
  color: Option<String>,
  message_id: String,
  timestamp: Option<DateTime<Utc>>,
}

impl SubscriptionInfo {
  fn parse(message: &IrcMessageRef<'_>, kind: &str) -> Option<Self> {
    if message.command() != Command::UserNotice || message.tag(Tag::MsgId)? != kind {
      return None;
    }

    let login = message.tag(Tag::Login).filter(is_not_empty)?;
    Some(SubscriptionInfo {
      room: message.channel()?.trim_start_matches('#').to_owned(),
      room_id: message.tag(Tag::RoomId).unwrap_or_default().into(),
      subscriber: User::from_irc(message, login),
      plan: SubPlan::parse(message.tag(Tag::MsgParamSubPlan).unwrap_or_default()),
      plan_name: message
        .tag(Tag::MsgParamSubPlanName)
        .map(|name| maybe_unescape(name).into_owned())
        .unwrap_or_default(),
      system_message: message
        .tag(Tag::SystemMsg)
        .filter(is_not_empty)
        .map(|msg| maybe_unescape(msg).trim_end().to_owned()),
      // a notice without a user message has no trailing param
      text: message
        .params()
        .and_then(|params| params.split_once(':'))
        .map(|(_, text)| text.to_owned()),
      badges: badges_of(message),
      color: message
        .tag(Tag::Color)
        .filter(is_not_empty)
        .map(String::from),
      message_id: message.tag(Tag::Id).unwrap_or_default().into(),
      timestamp: message.tag(Tag::TmiSentTs).and_then(parse_timestamp),
    })
  }
}

macro_rules! subscription_getters {
  ($T:ty) => {
    generate_getters! {
      for $T as self {
        /// Room in which the subscription happened, without the `#`.
        room -> &str = self.info.room.as_ref(),

        /// ID of the room.
        room_id -> &str = self.info.room_id.as_ref(),

        /// The subscribing user.
        subscriber -> &User = &self.info.subscriber,

        /// Subscription tier.
        plan -> &SubPlan = &self.info.plan,

        /// Channel-specific name of the plan.
        plan_name -> &str = self.info.plan_name.as_ref(),

        /// Message generated by Twitch, e.g. `x subscribed at Tier 1.`
        system_message -> Option<&str> = self.info.system_message.as_deref(),

        /// Message shared by the subscriber.
        text -> Option<&str> = self.info.text.as_deref(),

        /// Iterator over the subscriber's badges.
        badges -> impl DoubleEndedIterator<Item = &Badge> + ExactSizeIterator
          = self.info.badges.iter(),

        /// The subscriber's selected name color.
        color -> Option<&str> = self.info.color.as_deref(),

        /// Unique ID of the notice.
        message_id -> &str = self.info.message_id.as_ref(),

        /// Time at which the notice was sent.
        timestamp -> Option<DateTime<Utc>> = self.info.timestamp,
      }
    }
  };
}

/// A user subscribed for the first time.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubscriptionNotice {
  info: SubscriptionInfo,
}

subscription_getters!(SubscriptionNotice);

impl super::FromIrc for SubscriptionNotice {
  #[inline]
  fn from_irc(message: &IrcMessageRef<'_>) -> Result<Self, MessageParseError> {
    SubscriptionInfo::parse(message, "sub")
      .map(|info| SubscriptionNotice { info })
      .ok_or(MessageParseError)
  }
}

/// A user renewed their subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResubscriptionNotice {
  info: SubscriptionInfo,
  cumulative_months: u64,
  streak_months: Option<u64>,
}

subscription_getters!(ResubscriptionNotice);

generate_getters! {
  for ResubscriptionNotice as self {
    /// Total number of months the user has been subscribed.
    cumulative_months -> u64,

    /// Current consecutive streak, if the user chose to share it.
    streak_months -> Option<u64>,
  }
}

impl super::FromIrc for ResubscriptionNotice {
  #[inline]
  fn from_irc(message: &IrcMessageRef<'_>) -> Result<Self, MessageParseError> {
    let info = SubscriptionInfo::parse(message, "resub").ok_or(MessageParseError)?;
    let shares_streak = message
      .tag(Tag::MsgParamShouldShareStreak)
      .is_some_and(super::parse_bool);
    Ok(ResubscriptionNotice {
      info,
      cumulative_months: message
        .tag(Tag::MsgParamCumulativeMonths)
        .and_then(|v| v.parse().ok())
        .unwrap_or_default(),
      streak_months: message
        .tag(Tag::MsgParamStreakMonths)
        .filter(|_| shares_streak)
        .and_then(|v| v.parse().ok()),
    })
  }
}
