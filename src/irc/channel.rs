use crate::common::Span;

/// `#room <rest>`
///
/// The returned span includes the leading `#`.
#[inline(always)]
pub(super) fn parse(src: &str, pos: &mut usize) -> Option<Span> {
  let rest = &src[*pos..];
  if !rest.starts_with('#') {
    return None;
  }

  let start = *pos;
  let (end, next) = match rest.find(' ') {
    Some(len) => (start + len, start + len + 1),
    None => (src.len(), src.len()),
  };
  *pos = next;
  Some(Span::from(start..end))
}
