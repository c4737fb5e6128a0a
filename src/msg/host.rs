//! Host mode changes (`HOSTTARGET`).
//!
//! `:tmi.twitch.tv HOSTTARGET #hosting :target 42` starts hosting `target`,
//! `:tmi.twitch.tv HOSTTARGET #hosting :- 42` stops.

use super::MessageParseError;
use crate::irc::{Command, IrcMessageRef};

/// A room started or stopped hosting another room.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HostTarget {
  Started {
    /// Room doing the hosting, without the `#`.
    hosting_room: String,
    /// Room being hosted.
    target_room: String,
    viewers: u64,
  },
  Stopped {
    hosting_room: String,
    viewers: u64,
  },
}

impl HostTarget {
  /// Room doing the hosting.
  pub fn hosting_room(&self) -> &str {
    match self {
      HostTarget::Started { hosting_room, .. } | HostTarget::Stopped { hosting_room, .. } => {
        hosting_room
      }
    }
  }

  /// Number of viewers carried over. Unparseable counts are `0`.
  pub fn viewers(&self) -> u64 {
    match self {
      HostTarget::Started { viewers, .. } | HostTarget::Stopped { viewers, .. } => *viewers,
    }
  }
}

/// Whitespace tokenizer which yields empty strings and zeroes
/// instead of failing on missing or malformed tokens.
struct Fields<'a>(std::str::SplitWhitespace<'a>);

impl<'a> Fields<'a> {
  fn new(s: &'a str) -> Self {
    Self(s.split_whitespace())
  }

  fn text(&mut self) -> &'a str {
    self.0.next().unwrap_or_default()
  }

  fn count(&mut self) -> u64 {
    self.0.next().and_then(|v| v.parse().ok()).unwrap_or(0)
  }
}

impl super::FromIrc for HostTarget {
  fn from_irc(message: &IrcMessageRef<'_>) -> Result<Self, MessageParseError> {
    if message.command() != Command::HostTarget {
      return Err(MessageParseError);
    }
    let hosting_room = message
      .channel()
      .ok_or(MessageParseError)?
      .trim_start_matches('#')
      .to_owned();

    let mut fields = Fields::new(message.text().unwrap_or_default());
    let target = fields.text();
    let viewers = fields.count();
    Ok(match target {
      "-" => HostTarget::Stopped {
        hosting_room,
        viewers,
      },
      target => HostTarget::Started {
        hosting_room,
        target_room: target.to_owned(),
        viewers,
      },
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::msg::macros::parse_irc;

  #[test]
  fn parse_host_start() {
    let host: HostTarget = parse_irc(":tmi.twitch.tv HOSTTARGET #randers :leebaxd 73").unwrap();
    assert_eq!(
      host,
      HostTarget::Started {
        hosting_room: "randers".into(),
        target_room: "leebaxd".into(),
        viewers: 73,
      }
    );
  }

  #[test]
  fn parse_host_stop() {
    let host: HostTarget = parse_irc(":tmi.twitch.tv HOSTTARGET #randers :- 12").unwrap();
    assert_eq!(
      host,
      HostTarget::Stopped {
        hosting_room: "randers".into(),
        viewers: 12,
      }
    );
  }

  #[test]
  fn malformed_viewers_are_zero() {
    let host: HostTarget = parse_irc(":tmi.twitch.tv HOSTTARGET #randers :- lots").unwrap();
    assert_eq!(host.viewers(), 0);
    let host: HostTarget = parse_irc(":tmi.twitch.tv HOSTTARGET #randers :leebaxd").unwrap();
    assert_eq!(host.viewers(), 0);
    assert_eq!(host.hosting_room(), "randers");
  }
}
