//! A basic chat message sent by some user to the session's room.

use super::{
  badges_of, is_not_empty, parse_bool, parse_message_text, parse_timestamp, Badge,
  MessageParseError, User,
};
use crate::emotes::{EmoteCollection, EmoteSet, EmoteTier};
use crate::irc::{Command, IrcMessageRef, Tag};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A basic chat message sent by some user to a room.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChatMessage {
  room: String,
  room_id: String,
  message_id: String,
  sender: User,
  text: String,
  is_action: bool,
  badges: Vec<Badge>,
  color: Option<String>,
  bits: Option<u64>,
  emotes: EmoteSet,
  emote_replaced_text: Option<String>,
  is_moderator: bool,
  is_subscriber: bool,
  is_turbo: bool,
  user_type: String,
  timestamp: Option<DateTime<Utc>>,
  tags: HashMap<String, String>,
}

generate_getters! {
  for ChatMessage as self {
    /// Room in which this message was sent, without the `#`.
    room -> &str = self.room.as_ref(),

    /// ID of the room in which this message was sent.
    room_id -> &str = self.room_id.as_ref(),

    /// Unique ID of the message.
    message_id -> &str = self.message_id.as_ref(),

    /// Basic info about the user who sent this message.
    sender -> &User = &self.sender,

    /// Login of the sender.
    username -> &str = self.sender.login(),

    /// Display name of the sender.
    display_name -> &str = self.sender.name(),

    /// Text content of the message.
    ///
    /// This strips the action prefix/suffix bytes if the message was sent with `/me`.
    text -> &str = self.text.as_ref(),

    /// Whether the message was sent with `/me`.
    is_action -> bool,

    /// Iterator over the room badges enabled by the sender.
    badges -> impl DoubleEndedIterator<Item = &Badge> + ExactSizeIterator = self.badges.iter(),

    /// The sender's selected name color.
    ///
    /// [`None`] means the user has not selected a color.
    color -> Option<&str> = self.color.as_deref(),

    /// The number of bits cheered with this message.
    bits -> Option<u64>,

    /// Emote positions in [`ChatMessage::text`].
    emotes -> &EmoteSet = &self.emotes,

    /// Text with emotes replaced, if replacement was requested.
    emote_replaced_text -> Option<&str> = self.emote_replaced_text.as_deref(),

    /// Whether the sender is a moderator in this room.
    is_moderator -> bool,

    /// Whether the sender is subscribed to this room.
    is_subscriber -> bool,

    /// Whether the sender has Turbo.
    is_turbo -> bool,

    /// Whether the sender is the broadcaster of this room.
    is_broadcaster -> bool = self.badges.contains(&Badge::Broadcaster),

    /// Raw `user-type` tag, e.g. `mod`, `staff` or empty.
    user_type -> &str = self.user_type.as_ref(),

    /// The time at which the message was sent.
    timestamp -> Option<DateTime<Utc>>,

    /// All tags present on the line, with their raw values.
    tags -> &HashMap<String, String> = &self.tags,
  }
}

impl ChatMessage {
  fn parse(message: &IrcMessageRef<'_>) -> Option<Self> {
    if message.command() != Command::Privmsg {
      return None;
    }

    let login = message.nick()?;
    let (text, is_action) = parse_message_text(message.text()?);
    let badges = badges_of(message);
    Some(ChatMessage {
      room: message.channel()?.trim_start_matches('#').to_owned(),
      room_id: message.tag(Tag::RoomId).unwrap_or_default().into(),
      message_id: message.tag(Tag::Id).unwrap_or_default().into(),
      sender: User::from_irc(message, login),
      text: text.into(),
      is_action,
      is_moderator: message.tag(Tag::Mod).is_some_and(parse_bool)
        || badges.contains(&Badge::Moderator),
      is_subscriber: message.tag(Tag::Subscriber).is_some_and(parse_bool),
      is_turbo: message.tag(Tag::Turbo).is_some_and(parse_bool),
      badges,
      color: message
        .tag(Tag::Color)
        .filter(is_not_empty)
        .map(String::from),
      bits: message.tag(Tag::Bits).and_then(|bits| bits.parse().ok()),
      emotes: message.tag(Tag::Emotes).map(EmoteSet::parse).unwrap_or_default(),
      emote_replaced_text: None,
      user_type: message.tag(Tag::UserType).unwrap_or_default().into(),
      timestamp: message.tag(Tag::TmiSentTs).and_then(parse_timestamp),
      tags: message.tag_map(),
    })
  }

  /// Replace the emotes in the text using `emotes`, as allowed for `tier`.
  ///
  /// The result is available through [`ChatMessage::emote_replaced_text`].
  pub fn with_emotes_replaced(mut self, emotes: &EmoteCollection, tier: EmoteTier) -> Self {
    self.emote_replaced_text = Some(emotes.replace(&self.text, &self.emotes, tier));
    self
  }

  /// Returns the first character of the text if it is one of `prefixes`.
  pub fn command_prefix(&self, prefixes: &[char]) -> Option<char> {
    crate::command::command_prefix(&self.text, prefixes)
  }
}

impl super::FromIrc for ChatMessage {
  #[inline]
  fn from_irc(message: &IrcMessageRef<'_>) -> Result<Self, MessageParseError> {
    Self::parse(message).ok_or(MessageParseError)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::emotes::EmoteInfo;
  use crate::msg::macros::parse_irc;

  #[test]
  fn parse_chat_message_basic_example() {
    let msg: ChatMessage = parse_irc("@badge-info=;badges=;color=#0000FF;display-name=JuN1oRRRR;emotes=;flags=;id=e9d998c3-36f1-430f-89ec-6b887c28af36;mod=0;room-id=11148817;subscriber=0;tmi-sent-ts=1594545155039;turbo=0;user-id=29803735;user-type= :jun1orrrr!jun1orrrr@jun1orrrr.tmi.twitch.tv PRIVMSG #pajlada :dank cam").unwrap();
    assert_eq!(msg.room(), "pajlada");
    assert_eq!(msg.room_id(), "11148817");
    assert_eq!(msg.username(), "jun1orrrr");
    assert_eq!(msg.display_name(), "JuN1oRRRR");
    assert_eq!(msg.sender().id(), "29803735");
    assert_eq!(msg.text(), "dank cam");
    assert_eq!(msg.color(), Some("#0000FF"));
    assert_eq!(msg.bits(), None);
    assert!(!msg.is_action());
    assert!(!msg.is_moderator());
    assert_eq!(msg.badges().len(), 0);
    assert_eq!(
      msg.timestamp().map(|ts| ts.timestamp_millis()),
      Some(1594545155039)
    );
    assert_eq!(msg.tags().get("flags").map(String::as_str), Some(""));
    assert_eq!(msg.tags().len(), 14);
  }

  #[test]
  fn parse_chat_message_action_and_badges() {
    let msg: ChatMessage = parse_irc("@badge-info=subscriber/22;badges=moderator/1,subscriber/12;color=#19E6E6;display-name=randers;emotes=;flags=;id=d831d848-b7c7-4559-ae3a-2cb88f4dbfed;mod=1;room-id=11148817;subscriber=1;tmi-sent-ts=1594555275886;turbo=0;user-id=40286300;user-type=mod :randers!randers@randers.tmi.twitch.tv PRIVMSG #pajlada :\u{0001}ACTION -tags\u{0001}").unwrap();
    assert!(msg.is_action());
    assert_eq!(msg.text(), "-tags");
    assert!(msg.is_moderator());
    assert!(msg.is_subscriber());
    assert_eq!(msg.user_type(), "mod");
    assert_eq!(msg.badges().len(), 2);
  }

  #[test]
  fn parse_chat_message_display_name_with_escapes() {
    let msg: ChatMessage = parse_irc("@badge-info=;badges=;color=;display-name=Riot\\sGames;emotes=;flags=;id=bdfa278e-11c4-484f-9491-0a61b16fab60;mod=1;room-id=36029255;subscriber=0;tmi-sent-ts=1593953876927;turbo=0;user-id=36029255;user-type= :riotgames!riotgames@riotgames.tmi.twitch.tv PRIVMSG #riotgames :test fake message").unwrap();
    assert_eq!(msg.display_name(), "Riot Games");
    assert_eq!(msg.color(), None);
  }

  #[test]
  fn parse_chat_message_trailing_space_display_name() {
    let msg: ChatMessage = parse_irc("@badge-info=;badges=;color=;display-name=CarvedTaleare\\s;emotes=;flags=;id=c9b941d9-a0ab-4534-9903-971768fcdf10;mod=0;room-id=22484632;subscriber=0;tmi-sent-ts=1594554085753;turbo=0;user-id=467684514;user-type= :carvedtaleare!carvedtaleare@carvedtaleare.tmi.twitch.tv PRIVMSG #forsen :NaM").unwrap();
    assert_eq!(msg.display_name(), "CarvedTaleare");
  }

  #[test]
  fn parse_chat_message_with_bits() {
    let msg: ChatMessage = parse_irc("@badge-info=;badges=bits/100;bits=1;color=#004B49;display-name=TETYYS;emotes=;flags=;id=d7f03a35-f339-41ca-b4d4-7c0721438570;mod=0;room-id=11148817;subscriber=0;tmi-sent-ts=1594571566672;turbo=0;user-id=36175310;user-type= :tetyys!tetyys@tetyys.tmi.twitch.tv PRIVMSG #pajlada :trihard1").unwrap();
    assert_eq!(msg.bits(), Some(1));
  }

  #[test]
  fn parse_chat_message_without_tags() {
    let msg: ChatMessage = parse_irc(":bob!bob@bob.tmi.twitch.tv PRIVMSG #room :hi there").unwrap();
    assert_eq!(msg.display_name(), "bob");
    assert_eq!(msg.text(), "hi there");
    assert!(msg.tags().is_empty());
    assert_eq!(msg.timestamp(), None);
  }

  #[test]
  fn parse_chat_message_emotes() {
    let msg: ChatMessage = parse_irc("@badge-info=;badges=moderator/1;color=#FF0000;display-name=boring_nick;emotes=555555591:51-52/25:0-4,12-16,18-22/1902:6-10,29-33,35-39/1:45-46,48-49;first-msg=0;flags=;id=3d9540a0-04b6-4bea-baf9-9165b14160be;mod=1;room-id=55203741;subscriber=0;tmi-sent-ts=1696093084212;turbo=0;user-id=111024753;user-type=mod :boring_nick!boring_nick@boring_nick.tmi.twitch.tv PRIVMSG #moscowwbish :Kappa Keepo Kappa Kappa test Keepo Keepo 123 :) :) :P").unwrap();
    assert_eq!(msg.emotes().len(), 9);
    assert_eq!(msg.emote_replaced_text(), None);

    let emotes = EmoteCollection::new()
      .with(EmoteInfo::new("25", "Kappa", "<K>"))
      .with(EmoteInfo::new("1902", "Keepo", "<k>"));
    let msg = msg.with_emotes_replaced(&emotes, EmoteTier::Everyone);
    assert_eq!(
      msg.emote_replaced_text(),
      Some("<K> <k> <K> <K> test <k> <k> 123 :) :) :P")
    );
    assert_eq!(msg.text(), "Kappa Keepo Kappa Kappa test Keepo Keepo 123 :) :) :P");
  }

  #[test]
  fn not_a_privmsg() {
    assert!(parse_irc::<ChatMessage>(":bob!bob@bob.tmi.twitch.tv JOIN #room").is_err());
  }

  #[test]
  fn command_prefix() {
    let msg: ChatMessage = parse_irc(":bob!bob@bob.tmi.twitch.tv PRIVMSG #room :!give bob 5 gold").unwrap();
    assert_eq!(msg.command_prefix(&['!', '?']), Some('!'));
    assert_eq!(msg.command_prefix(&['?']), None);
  }

  #[cfg(feature = "serde")]
  #[test]
  fn roundtrip_chat_message() {
    let msg: ChatMessage = parse_irc("@badge-info=subscriber/22;badges=moderator/1,subscriber/12;color=#19E6E6;display-name=randers;emotes=25:0-4;flags=;id=d831d848;mod=1;room-id=11148817;subscriber=1;tmi-sent-ts=1594555275886;turbo=0;user-id=40286300;user-type=mod :randers!randers@randers.tmi.twitch.tv PRIVMSG #pajlada :Kappa").unwrap();
    let json = serde_json::to_string(&msg).unwrap();
    let back: ChatMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(msg, back);
  }
}
