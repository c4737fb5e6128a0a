//! ## IRCv3 line parser
//!
//! The entrypoint to this module is [`IrcMessageRef`].
//!
//! ```rust
//! let msg = tmi_session::IrcMessageRef::parse(":tmi.twitch.tv PING :tmi.twitch.tv").unwrap();
//! assert_eq!(msg.command(), tmi_session::Command::Ping);
//! ```
//!
//! ⚠ This parser is _not_ compliant with the IRCv3 spec!
//! It assumes that it will only ever parse lines sent by Twitch,
//! which means it handles Twitch-specific quirks, but it also means
//! that it's unlikely to work for lines sent by other servers.

mod channel;
mod command;
mod params;
mod prefix;
mod tags;

pub use command::Command;
pub use prefix::Prefix;
pub use tags::Tag;

use crate::common::Span;
use std::collections::HashMap;
use std::fmt::Debug;

use command::RawCommand;
use prefix::RawPrefix;
use tags::RawTags;

/// A base IRC message.
///
/// This references the original line instead of owning it.
#[derive(Clone)]
pub struct IrcMessageRef<'src> {
  src: &'src str,
  parts: IrcMessageParts,
}

#[derive(Clone)]
struct IrcMessageParts {
  tags: RawTags,
  prefix: Option<RawPrefix>,
  command: RawCommand,
  channel: Option<Span>,
  params: Option<Span>,
}

impl<'src> IrcMessageRef<'src> {
  /// Parse a single Twitch IRC line.
  ///
  /// Returns [`None`] if the line has no command.
  pub fn parse(src: &'src str) -> Option<Self> {
    let src = src.trim_end_matches(['\r', '\n']);
    let mut pos = 0usize;

    let tags = tags::parse(src, &mut pos).unwrap_or_default();
    let prefix = prefix::parse(src, &mut pos);
    let command = command::parse(src, &mut pos)?;
    let channel = channel::parse(src, &mut pos);
    let params = params::parse(src, &pos);

    Some(Self {
      src,
      parts: IrcMessageParts {
        tags,
        prefix,
        command,
        channel,
        params,
      },
    })
  }

  /// Get the string from which this message was parsed.
  pub fn raw(&self) -> &'src str {
    self.src
  }

  /// Get an iterator over the message [`Tag`]s.
  pub fn tags(&self) -> impl Iterator<Item = (&'src str, &'src str)> + '_ {
    self.parts.tags.iter().map(|pair| pair.get(self.src))
  }

  /// Collect the tags into an owned map.
  ///
  /// Values are kept exactly as they appear on the wire, escapes included.
  pub fn tag_map(&self) -> HashMap<String, String> {
    self
      .tags()
      .map(|(key, value)| (key.to_owned(), value.to_owned()))
      .collect()
  }

  /// Get the message [`Prefix`].
  pub fn prefix(&self) -> Option<Prefix<'src>> {
    self.parts.prefix.map(|prefix| prefix.get(self.src))
  }

  /// Get the `nick` part of the prefix, if there is one.
  pub fn nick(&self) -> Option<&'src str> {
    self.prefix().and_then(|prefix| prefix.nick)
  }

  /// Get the message [`Command`].
  pub fn command(&self) -> Command<'src> {
    self.parts.command.get(self.src)
  }

  /// Get the channel name this message was sent to, including the `#`.
  pub fn channel(&self) -> Option<&'src str> {
    self.parts.channel.map(|span| &self.src[span])
  }

  /// Returns `true` if this message was sent to `#room`.
  ///
  /// `room` is given without the `#` and is compared case-insensitively.
  pub fn is_in_room(&self, room: &str) -> bool {
    self
      .channel()
      .and_then(|channel| channel.strip_prefix('#'))
      .is_some_and(|channel| channel.eq_ignore_ascii_case(room))
  }

  /// Get the raw message params.
  ///
  /// You have to call `split_whitespace` on it yourself.
  pub fn params(&self) -> Option<&'src str> {
    self.parts.params.map(|span| &self.src[span])
  }

  /// Retrieve the value of `tag`.
  ///
  /// `tag` can provided as:
  /// - A variant of the [`Tag`] enum
  /// - The stringified kebab-case tag name
  ///
  /// A tag which is present without a value (`key=` or just `key`) yields `Some("")`.
  pub fn tag<'a>(&self, tag: impl Into<Tag<'a>>) -> Option<&'src str> {
    let tag = tag.into();
    self
      .parts
      .tags
      .iter()
      .find(|pair| &self.src[pair.key()] == tag.as_str())
      .map(|pair| &self.src[pair.value()])
  }

  /// Returns the contents of the params after the first `:`.
  ///
  /// If `:` is not present, returns all params.
  pub fn text(&self) -> Option<&'src str> {
    match self.parts.params {
      Some(params) => {
        let params = &self.src[params];
        match params.find(':') {
          Some(start) => Some(&params[start + 1..]),
          None => Some(params),
        }
      }
      None => None,
    }
  }
}

impl<'src> Debug for IrcMessageRef<'src> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("IrcMessage")
      .field("tags", &DebugIter::new(self.tags()))
      .field("prefix", &self.prefix())
      .field("command", &self.command())
      .field("channel", &self.channel())
      .field("params", &self.params())
      .finish()
  }
}

static_assert_send!(IrcMessageRef);
static_assert_sync!(IrcMessageRef);

struct DebugIter<I>(std::cell::RefCell<I>);
impl<I> DebugIter<I> {
  fn new(iter: I) -> Self {
    Self(std::cell::RefCell::new(iter))
  }
}
impl<I> Debug for DebugIter<I>
where
  I: Iterator,
  I::Item: Debug,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    use std::ops::DerefMut;
    let mut list = f.debug_list();
    for item in self.0.borrow_mut().deref_mut() {
      list.entry(&item);
    }
    list.finish()
  }
}

/// Returns `true` if the second or third whitespace-delimited token of `line` is `WHISPER`.
///
/// The token is the second one for untagged lines (`:prefix WHISPER ...`)
/// and the third one for tagged lines (`@tags :prefix WHISPER ...`).
pub fn is_whisper_line(line: &str) -> bool {
  let mut tokens = line.split_whitespace().skip(1);
  let second = tokens.next();
  let third = tokens.next();
  second == Some("WHISPER") || third == Some("WHISPER")
}
