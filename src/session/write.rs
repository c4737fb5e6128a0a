//! Outgoing line formatting.

use super::Credentials;
use std::borrow::Cow;
use std::fmt::Display;
use std::time::Duration;

/// Host used in outgoing prefixes and keepalive replies.
pub const SERVICE_HOST: &str = "tmi.twitch.tv";

/// Join-less room which whispers are sent through.
pub const WHISPER_ROOM: &str = "jtv";

/// Capabilities requested at login, in order.
pub const CAPABILITIES: [&str; 3] = [
  "twitch.tv/membership",
  "twitch.tv/commands",
  "twitch.tv/tags",
];

/// Replace line terminators in outgoing text, which would otherwise
/// split it into several protocol lines.
pub fn sanitize(text: &str) -> Cow<'_, str> {
  match text.contains(['\r', '\n']) {
    false => Cow::Borrowed(text),
    true => Cow::Owned(text.replace("\r\n", " ").replace(['\r', '\n'], " ")),
  }
}

/// `:{user}!{user}@{user}.tmi.twitch.tv PRIVMSG #{room} :{body}`
pub fn chat_line(user: &str, room: &str, body: &str) -> String {
  format!(
    ":{user}!{user}@{user}.{SERVICE_HOST} PRIVMSG #{room} :{}",
    sanitize(body)
  )
}

/// `:{user}~{user}@{user}.tmi.twitch.tv PRIVMSG #jtv :/w {recipient} {body}`
pub fn whisper_line(user: &str, recipient: &str, body: &str) -> String {
  format!(
    ":{user}~{user}@{user}.{SERVICE_HOST} PRIVMSG #{WHISPER_ROOM} :/w {recipient} {}",
    sanitize(body)
  )
}

/// Lines sent once the transport is connected, in order.
pub fn login_lines(credentials: &Credentials, room: &str) -> Vec<String> {
  let nick = &credentials.nick;
  let mut lines = vec![
    format!("PASS {}", credentials.pass),
    format!("NICK {nick}"),
    format!("USER {nick} 8 * :{nick}"),
  ];
  lines.extend(CAPABILITIES.iter().map(|cap| format!("CAP REQ {cap}")));
  lines.push(join_line(room));
  lines
}

pub fn join_line(room: &str) -> String {
  format!("JOIN #{room}")
}

pub fn part_line(room: &str) -> String {
  format!("PART #{room}")
}

/// Twitch drops a message identical to the previous one sent by the same
/// user within 30 seconds. Repeated bodies get an invisible suffix on
/// every other send so they are accepted.
///
/// [`SameMessageBypass::body`] does not change any state. Call
/// [`SameMessageBypass::sent`] once the line actually went out.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SameMessageBypass {
  last: Option<String>,
  suffixed: bool,
}

impl SameMessageBypass {
  const SUFFIX: &'static str = concat!(" ", "\u{2800}");

  /// Returns the body to send in place of `body`.
  pub fn body<'a>(&self, body: &'a str) -> Cow<'a, str> {
    match self.last.as_deref() == Some(body) && !self.suffixed {
      true => Cow::Owned(format!("{body}{}", Self::SUFFIX)),
      false => Cow::Borrowed(body),
    }
  }

  /// Record that `sent`, the result of [`SameMessageBypass::body`] for `body`, was sent.
  pub fn sent(&mut self, body: &str, sent: &str) {
    self.suffixed = body != sent;
    if self.last.as_deref() != Some(body) {
      self.last = Some(body.to_owned());
    }
  }
}

/// A moderation or room settings command, sent as a chat message body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoomCommand {
  /// `/clear`
  Clear,
  /// `/timeout <user> [seconds]`. Twitch defaults to 10 minutes.
  Timeout {
    user: String,
    duration: Option<Duration>,
  },
  /// `/untimeout <user>`
  Untimeout(String),
  /// `/ban <user> [reason]`
  Ban { user: String, reason: Option<String> },
  /// `/unban <user>`
  Unban(String),
  /// `/slow [seconds]`, or `/slowoff`
  Slow(Option<Option<u64>>),
  /// `/followers [duration]`, or `/followersoff`
  Followers(Option<Option<Duration>>),
  /// `/subscribers` or `/subscribersoff`
  Subscribers(bool),
  /// `/emoteonly` or `/emoteonlyoff`
  EmoteOnly(bool),
  /// `/uniquechat` or `/uniquechatoff`
  UniqueChat(bool),
}

impl Display for RoomCommand {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let toggle = |f: &mut std::fmt::Formatter<'_>, name: &str, on: bool| match on {
      true => write!(f, "/{name}"),
      false => write!(f, "/{name}off"),
    };
    match self {
      RoomCommand::Clear => f.write_str("/clear"),
      RoomCommand::Timeout { user, duration } => match duration {
        Some(duration) => write!(f, "/timeout {user} {}", duration.as_secs()),
        None => write!(f, "/timeout {user}"),
      },
      RoomCommand::Untimeout(user) => write!(f, "/untimeout {user}"),
      RoomCommand::Ban { user, reason } => match reason {
        Some(reason) => write!(f, "/ban {user} {reason}"),
        None => write!(f, "/ban {user}"),
      },
      RoomCommand::Unban(user) => write!(f, "/unban {user}"),
      RoomCommand::Slow(Some(Some(seconds))) => write!(f, "/slow {seconds}"),
      RoomCommand::Slow(Some(None)) => f.write_str("/slow"),
      RoomCommand::Slow(None) => f.write_str("/slowoff"),
      RoomCommand::Followers(Some(Some(duration))) => {
        let secs = duration.as_secs();
        write!(f, "/followers {}d {}s", secs / 86400, secs % 86400)
      }
      RoomCommand::Followers(Some(None)) => f.write_str("/followers"),
      RoomCommand::Followers(None) => f.write_str("/followersoff"),
      RoomCommand::Subscribers(on) => toggle(f, "subscribers", *on),
      RoomCommand::EmoteOnly(on) => toggle(f, "emoteonly", *on),
      RoomCommand::UniqueChat(on) => toggle(f, "uniquechat", *on),
    }
  }
}
