//! A direct message between users.

use super::{badges_of, is_not_empty, Badge, MessageParseError, User};
use crate::emotes::EmoteSet;
use crate::irc::{Command, IrcMessageRef, Tag};
use std::collections::HashMap;

/// A direct message between users.
///
/// The recipient is always the session user.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WhisperMessage {
  recipient: String,
  sender: User,
  text: String,
  badges: Vec<Badge>,
  emotes: EmoteSet,
  color: Option<String>,
  thread_id: String,
  message_id: String,
  tags: HashMap<String, String>,
}

generate_getters! {
  for WhisperMessage as self {
    /// Login of the recipient.
    recipient -> &str = self.recipient.as_ref(),

    /// Basic info about the sender.
    sender -> &User = &self.sender,

    /// Login of the sender.
    username -> &str = self.sender.login(),

    /// Display name of the sender.
    display_name -> &str = self.sender.name(),

    /// Text content of the message.
    text -> &str = self.text.as_ref(),

    /// Iterator over the badges visible in the whisper window.
    badges -> impl DoubleEndedIterator<Item = &Badge> + ExactSizeIterator = self.badges.iter(),

    /// Emote positions in [`WhisperMessage::text`].
    emotes -> &EmoteSet = &self.emotes,

    /// The [sender][`WhisperMessage::sender`]'s selected name color.
    color -> Option<&str> = self.color.as_deref(),

    /// ID of the whisper conversation.
    thread_id -> &str = self.thread_id.as_ref(),

    /// ID of the message within the conversation.
    message_id -> &str = self.message_id.as_ref(),

    /// All tags present on the line, with their raw values.
    tags -> &HashMap<String, String> = &self.tags,
  }
}

impl WhisperMessage {
  fn parse(message: &IrcMessageRef<'_>) -> Option<Self> {
    if message.command() != Command::Whisper {
      return None;
    }

    let (recipient, text) = message.params()?.split_once(" :")?;
    let login = message.nick()?;

    Some(WhisperMessage {
      recipient: recipient.trim().into(),
      sender: User::from_irc(message, login),
      text: text.into(),
      color: message
        .tag(Tag::Color)
        .filter(is_not_empty)
        .map(String::from),
      badges: badges_of(message),
      emotes: message.tag(Tag::Emotes).map(EmoteSet::parse).unwrap_or_default(),
      thread_id: message.tag(Tag::ThreadId).unwrap_or_default().into(),
      message_id: message.tag(Tag::MessageId).unwrap_or_default().into(),
      tags: message.tag_map(),
    })
  }

  /// Returns the first character of the text if it is one of `prefixes`.
  pub fn command_prefix(&self, prefixes: &[char]) -> Option<char> {
    crate::command::command_prefix(&self.text, prefixes)
  }
}

impl super::FromIrc for WhisperMessage {
  #[inline]
  fn from_irc(message: &IrcMessageRef<'_>) -> Result<Self, MessageParseError> {
    Self::parse(message).ok_or(MessageParseError)
  }
}
