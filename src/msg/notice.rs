use super::MessageParseError;
use crate::irc::{Command, IrcMessageRef, Tag};

/// Sent by TMI for various reasons to notify the client about something,
/// usually in response to invalid actions.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Notice {
  room: Option<String>,
  text: String,
  id: Option<String>,
}

generate_getters! {
  for Notice as self {
    /// Target room name, without the `#`.
    ///
    /// This is absent before successful login.
    room -> Option<&str> = self.room.as_deref(),

    /// Notice message.
    text -> &str = self.text.as_ref(),

    /// Notice ID, see <https://dev.twitch.tv/docs/irc/msg-id/>.
    ///
    /// This will only be empty before successful login.
    id -> Option<&str> = self.id.as_deref(),
  }
}

impl Notice {
  /// Returns `true` if this notice reports rejected credentials.
  pub fn is_login_failure(&self) -> bool {
    is_login_failure_text(&self.text)
  }
}

/// Returns `true` if `text` is one of the notices Twitch sends for rejected credentials.
pub fn is_login_failure_text(text: &str) -> bool {
  text.contains("Login authentication failed") || text.contains("Improperly formatted auth")
}

impl super::FromIrc for Notice {
  fn from_irc(message: &IrcMessageRef<'_>) -> Result<Self, MessageParseError> {
    if message.command() != Command::Notice {
      return Err(MessageParseError);
    }

    Ok(Notice {
      room: message
        .channel()
        .map(|channel| channel.trim_start_matches('#').to_owned()),
      text: message.text().ok_or(MessageParseError)?.to_owned(),
      id: message.tag(Tag::MsgId).map(String::from),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::msg::macros::parse_irc;

  #[test]
  fn parse_notice_before_login() {
    let notice: Notice = parse_irc(":tmi.twitch.tv NOTICE * :Improperly formatted auth").unwrap();
    assert_eq!(notice.room(), None);
    assert_eq!(notice.id(), None);
    assert!(notice.is_login_failure());
  }

  #[test]
  fn parse_notice_basic() {
    let notice: Notice = parse_irc("@msg-id=msg_banned :tmi.twitch.tv NOTICE #forsen :You are permanently banned from talking in forsen.").unwrap();
    assert_eq!(notice.room(), Some("forsen"));
    assert_eq!(notice.id(), Some("msg_banned"));
    assert_eq!(notice.text(), "You are permanently banned from talking in forsen.");
    assert!(!notice.is_login_failure());
  }
}
