//! Chat command extraction.
//!
//! A command is a message whose text starts with one of the registered
//! prefix characters, e.g. `!give bob 5 gold`.

use crate::common::JoinIter;

/// A command found in a chat message or whisper.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandInvocation {
  prefix: char,
  command: String,
  args: Vec<String>,
  args_text: String,
}

generate_getters! {
  for CommandInvocation as self {
    /// The prefix character which introduced the command.
    prefix -> char,

    /// First token of the text, without the prefix.
    command -> &str = self.command.as_ref(),

    /// Remaining tokens.
    args -> &[String] = &self.args,

    /// Remaining tokens, joined by single spaces.
    args_text -> &str = self.args_text.as_ref(),
  }
}

/// Returns the first character of `text` if it is one of `prefixes`.
pub fn command_prefix(text: &str, prefixes: &[char]) -> Option<char> {
  text.chars().next().filter(|c| prefixes.contains(c))
}

impl CommandInvocation {
  /// Extract a command from `text` if it starts with one of `prefixes`.
  ///
  /// ```
  /// use tmi_session::CommandInvocation;
  ///
  /// let cmd = CommandInvocation::parse("!give bob 5 gold", &['!']).unwrap();
  /// assert_eq!(cmd.command(), "give");
  /// assert_eq!(cmd.args(), ["bob", "5", "gold"]);
  /// assert_eq!(cmd.args_text(), "bob 5 gold");
  /// ```
  pub fn parse(text: &str, prefixes: &[char]) -> Option<Self> {
    let prefix = command_prefix(text, prefixes)?;
    let mut tokens = text[prefix.len_utf8()..].split_whitespace();
    let command = tokens.next().unwrap_or_default().to_owned();
    let args: Vec<String> = tokens.map(String::from).collect();
    let args_text = args.iter().join(' ').to_string();
    Some(CommandInvocation {
      prefix,
      command,
      args,
      args_text,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn command_with_args() {
    let cmd = CommandInvocation::parse("!give bob 5 gold", &['!']).unwrap();
    assert_eq!(cmd.prefix(), '!');
    assert_eq!(cmd.command(), "give");
    assert_eq!(cmd.args(), ["bob", "5", "gold"]);
    assert_eq!(cmd.args_text(), "bob 5 gold");
  }

  #[test]
  fn bare_command() {
    let cmd = CommandInvocation::parse("!ping", &['!']).unwrap();
    assert_eq!(cmd.command(), "ping");
    assert!(cmd.args().is_empty());
    assert_eq!(cmd.args_text(), "");
  }

  #[test]
  fn extra_whitespace_is_collapsed() {
    let cmd = CommandInvocation::parse("?roll   2d6    +3", &['!', '?']).unwrap();
    assert_eq!(cmd.prefix(), '?');
    assert_eq!(cmd.args_text(), "2d6 +3");
  }

  #[test]
  fn unregistered_prefix() {
    assert_eq!(CommandInvocation::parse("!ping", &['?']), None);
    assert_eq!(CommandInvocation::parse("ping", &['!']), None);
    assert_eq!(CommandInvocation::parse("", &['!']), None);
  }

  #[test]
  fn prefix_of_text() {
    assert_eq!(command_prefix("?help", &['!', '?']), Some('?'));
    assert_eq!(command_prefix("help?", &['?']), None);
    assert_eq!(command_prefix("", &['!']), None);
  }
}
