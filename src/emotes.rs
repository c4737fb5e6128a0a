//! Emote positions and emote replacement.
//!
//! Twitch reports emote positions in the `emotes` tag as
//! `id:start-end,start-end/id:start-end`, where `start` and `end` are
//! inclusive offsets into the message text, counted in UTF-16 code units.
//!
//! [`EmoteSet`] holds the positions found in one message, and an
//! [`EmoteCollection`] maps emote ids to what they should be replaced with.

use std::collections::HashMap;
use std::fmt::{Display, Write};

/// The position of a single emote in a message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmoteSpan {
  /// Emote id.
  pub id: String,

  /// First UTF-16 code unit of the emote, inclusive.
  pub start: usize,

  /// Last UTF-16 code unit of the emote, inclusive.
  pub end: usize,
}

/// Emote positions in a single message, sorted by `start` and never overlapping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmoteSet {
  spans: Vec<EmoteSpan>,
}

impl EmoteSet {
  /// Parse the value of an `emotes` tag.
  ///
  /// Malformed entries are skipped. A span which overlaps an
  /// earlier one is dropped.
  pub fn parse(tag: &str) -> Self {
    let mut spans = Vec::new();
    for emote in tag.split('/').filter(|v| !v.is_empty()) {
      let Some((id, ranges)) = emote.split_once(':') else {
        continue;
      };
      for range in ranges.split(',') {
        let Some((start, end)) = range.split_once('-') else {
          continue;
        };
        let (Ok(start), Ok(end)) = (start.parse::<usize>(), end.parse::<usize>()) else {
          continue;
        };
        if end < start {
          continue;
        }
        spans.push(EmoteSpan {
          id: id.into(),
          start,
          end,
        });
      }
    }
    Self::from_spans(spans)
  }

  /// Build a set from arbitrary spans, sorting them and dropping overlaps.
  pub fn from_spans(mut spans: Vec<EmoteSpan>) -> Self {
    spans.sort_by_key(|span| (span.start, span.end));
    let mut out: Vec<EmoteSpan> = Vec::with_capacity(spans.len());
    for span in spans {
      if out.last().is_some_and(|last| span.start <= last.end) {
        continue;
      }
      out.push(span);
    }
    Self { spans: out }
  }

  /// Iterator over the spans in ascending order.
  pub fn iter(&self) -> impl DoubleEndedIterator<Item = &EmoteSpan> + ExactSizeIterator {
    self.spans.iter()
  }

  pub fn len(&self) -> usize {
    self.spans.len()
  }

  pub fn is_empty(&self) -> bool {
    self.spans.is_empty()
  }
}

/// Formats the set back into the `emotes` tag format.
///
/// Ids are written in order of their first appearance in the message.
impl Display for EmoteSet {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut order: Vec<&str> = Vec::new();
    for span in &self.spans {
      if !order.contains(&span.id.as_str()) {
        order.push(&span.id);
      }
    }
    for (i, id) in order.iter().enumerate() {
      if i > 0 {
        f.write_char('/')?;
      }
      write!(f, "{id}:")?;
      let ranges = self.spans.iter().filter(|span| span.id == *id);
      for (j, span) in ranges.enumerate() {
        if j > 0 {
          f.write_char(',')?;
        }
        write!(f, "{}-{}", span.start, span.end)?;
      }
    }
    Ok(())
  }
}

/// Who may use an emote.
///
/// Tiers are ordered: a chatter with some tier may use every emote
/// at that tier or below.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EmoteTier {
  #[default]
  Everyone,
  Subscriber,
  Vip,
  Moderator,
  Broadcaster,
}

/// What an emote id resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmoteInfo {
  /// Emote id, as it appears in the `emotes` tag.
  pub id: String,

  /// The text which chatters type to use the emote, e.g. `Kappa`.
  pub name: String,

  /// The token which replaces the emote text.
  pub replacement: String,

  /// Minimum tier needed to use the emote.
  pub tier: EmoteTier,
}

impl EmoteInfo {
  pub fn new(
    id: impl Into<String>,
    name: impl Into<String>,
    replacement: impl Into<String>,
  ) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      replacement: replacement.into(),
      tier: EmoteTier::Everyone,
    }
  }

  pub fn tier(mut self, tier: EmoteTier) -> Self {
    self.tier = tier;
    self
  }
}

/// Known emotes, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct EmoteCollection {
  emotes: HashMap<String, EmoteInfo>,
}

impl EmoteCollection {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add an emote, replacing any previous emote with the same id.
  pub fn insert(&mut self, emote: EmoteInfo) {
    self.emotes.insert(emote.id.clone(), emote);
  }

  pub fn with(mut self, emote: EmoteInfo) -> Self {
    self.insert(emote);
    self
  }

  pub fn get(&self, id: &str) -> Option<&EmoteInfo> {
    self.emotes.get(id)
  }

  pub fn len(&self) -> usize {
    self.emotes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.emotes.is_empty()
  }

  /// Find emotes in `text` by their names.
  ///
  /// Only whole whitespace-delimited words match.
  pub fn find_spans(&self, text: &str) -> EmoteSet {
    let by_name = self
      .emotes
      .values()
      .map(|emote| (emote.name.as_str(), emote.id.as_str()))
      .collect::<HashMap<_, _>>();

    let mut spans = Vec::new();
    let mut offset = 0usize;
    let mut word_start = None;
    let mut word = String::new();
    let flush = |word: &mut String, start: Option<usize>, end: usize, spans: &mut Vec<EmoteSpan>| {
      if let (Some(start), Some(id)) = (start, by_name.get(word.as_str())) {
        spans.push(EmoteSpan {
          id: (*id).to_owned(),
          start,
          end: end - 1,
        });
      }
      word.clear();
    };
    for c in text.chars() {
      if c.is_whitespace() {
        flush(&mut word, word_start.take(), offset, &mut spans);
      } else {
        word_start.get_or_insert(offset);
        word.push(c);
      }
      offset += c.len_utf16();
    }
    flush(&mut word, word_start.take(), offset, &mut spans);

    EmoteSet::from_spans(spans)
  }

  /// Replace the emotes at the positions in `set` with their replacement tokens.
  ///
  /// Spans are applied from the last one to the first one, so earlier
  /// offsets stay valid. Spans are skipped when the id is unknown, when
  /// `tier` is below the emote's tier, or when the span does not fall on
  /// character boundaries of `text`.
  pub fn replace(&self, text: &str, set: &EmoteSet, tier: EmoteTier) -> String {
    let offsets = utf16_offsets(text);
    let mut out = text.to_owned();
    for span in set.iter().rev() {
      let Some(emote) = self.get(&span.id) else {
        continue;
      };
      if emote.tier > tier {
        continue;
      }
      let Some(range) = byte_range(&offsets, span) else {
        continue;
      };
      out.replace_range(range, &emote.replacement);
    }
    out
  }
}

/// Maps each UTF-16 offset to its byte offset in `text`.
///
/// Offsets which point into the middle of a surrogate pair map to [`None`].
/// The last entry is the offset one past the end of the text.
fn utf16_offsets(text: &str) -> Vec<Option<usize>> {
  let mut offsets = Vec::with_capacity(text.len() + 1);
  for (byte, c) in text.char_indices() {
    offsets.push(Some(byte));
    for _ in 1..c.len_utf16() {
      offsets.push(None);
    }
  }
  offsets.push(Some(text.len()));
  offsets
}

fn byte_range(offsets: &[Option<usize>], span: &EmoteSpan) -> Option<std::ops::Range<usize>> {
  let start = (*offsets.get(span.start)?)?;
  let end = (*offsets.get(span.end.checked_add(1)?)?)?;
  (start <= end).then_some(start..end)
}
