use crate::common::Span;

/// Everything after the command and channel, if anything is left.
#[inline(always)]
pub(super) fn parse(src: &str, pos: &usize) -> Option<Span> {
  match src[*pos..].trim_end().is_empty() {
    true => None,
    false => Some(Span::from(*pos..src.trim_end().len())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn remaining_params() {
    let data = "+o some_user";
    let params = parse(data, &0).unwrap();
    assert_eq!(params.get(data), "+o some_user");
  }

  #[test]
  fn whitespace_only_is_none() {
    assert!(parse("#room ", &6).is_none());
    assert!(parse("   ", &0).is_none());
  }
}
