//! Markup tag structure resolution.
//!
//! A [`TagIter`] walks the buffer tag by tag in either direction,
//! recognizing `<name`, `</name`, and self-closing `/>` heads (an unescaped
//! `/` directly before the `>` with nothing but whitespace between). On top
//! of it sit the per-tag-name stack walkers [`find_matching_close`] and
//! [`find_matching_open`], and the public queries: [`find_matching_tag`]
//! (what does the tag under the cursor pair with), [`find_enclosing_tag`]
//! (nearest fully-matched ancestor, retrying outward through unbalanced
//! markup), [`scan_for_closing_tag`], and [`fold_range`] (the foldable span
//! of an element opened on a line).
//!
//! Only characters classified as [`TokenKind::Tag`] participate, so angle
//! brackets inside attribute strings or scripts never derail a walk.

use braid_core::chars::{
  char_is_xml_name,
  char_is_xml_name_start,
};

use crate::{
  buffer::{
    Buffer,
    MarkupContext,
    TokenKind,
  },
  position::{
    Position,
    Span,
  },
};

/// Which end of a tag pair the cursor was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSide {
  Open,
  Close,
}

/// One tag head with its buffer span (`<` through `>` inclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRange {
  pub span: Span,
  pub name: String,
}

/// Result of [`find_matching_tag`]. A missing `open` or `close` signals an
/// unopened/unclosed structure; self-closing tags always have `close: None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
  pub open:  Option<TagRange>,
  pub close: Option<TagRange>,
  pub at:    TagSide,
}

/// A fully-matched ancestor element around a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclosingTag {
  pub open:  TagRange,
  pub close: TagRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagEnd {
  Regular,
  SelfClose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TagHead {
  closing:  bool,
  name:     String,
  /// Chars from `<` through the end of the name.
  full_len: usize,
}

/// Cursor over the buffer's tags, bounded to a line range (a viewport).
pub struct TagIter<'a, B: Buffer + ?Sized> {
  buf:   &'a B,
  line:  usize,
  col:   usize,
  chars: Vec<char>,
  min:   usize,
  max:   usize,
}

impl<'a, B: Buffer + ?Sized> TagIter<'a, B> {
  pub fn new(buf: &'a B, pos: Position, range: Option<(usize, usize)>) -> Self {
    let min = range.map_or(0, |(from, _)| from);
    let max = range.map_or(buf.last_line(), |(_, to)| {
      to.saturating_sub(1).min(buf.last_line())
    });
    let chars = buf
      .line(pos.line)
      .map(|line| line.chars().collect())
      .unwrap_or_default();
    Self {
      buf,
      line: pos.line,
      col: pos.col,
      chars,
      min,
      max,
    }
  }

  pub fn pos(&self) -> Position {
    Position::new(self.line, self.col)
  }

  fn load_line(&mut self, n: usize) {
    self.line = n;
    self.chars = self
      .buf
      .line(n)
      .map(|line| line.chars().collect())
      .unwrap_or_default();
  }

  fn next_line(&mut self) -> bool {
    if self.line >= self.max {
      return false;
    }
    let n = self.line + 1;
    self.load_line(n);
    self.col = 0;
    true
  }

  fn prev_line(&mut self) -> bool {
    if self.line <= self.min {
      return false;
    }
    let n = self.line - 1;
    self.load_line(n);
    self.col = self.chars.len();
    true
  }

  fn is_tag_char(&self, col: usize) -> bool {
    self.buf.token_kind_at(Position::new(self.line, col)) == Some(TokenKind::Tag)
  }

  fn index_of(&self, ch: char, from: usize) -> Option<usize> {
    self.chars[from.min(self.chars.len())..]
      .iter()
      .position(|c| *c == ch)
      .map(|i| i + from)
  }

  fn last_index_of(&self, ch: char, before: usize) -> Option<usize> {
    self.chars[..before.min(self.chars.len())]
      .iter()
      .rposition(|c| *c == ch)
  }

  /// Parse `<name` / `</name` starting exactly at `col`.
  fn parse_tag_head_at(&self, col: usize) -> Option<TagHead> {
    if self.chars.get(col) != Some(&'<') {
      return None;
    }
    let mut i = col + 1;
    let closing = self.chars.get(i) == Some(&'/');
    if closing {
      i += 1;
    }
    if !matches!(self.chars.get(i), Some(c) if char_is_xml_name_start(*c)) {
      return None;
    }
    let name_start = i;
    while matches!(self.chars.get(i), Some(c) if char_is_xml_name(*c)) {
      i += 1;
    }
    Some(TagHead {
      closing,
      name: self.chars[name_start..i].iter().collect(),
      full_len: i - col,
    })
  }

  /// Find the next `<name`/`</name` at or after `from` on the current line.
  fn find_tag_head(&self, from: usize) -> Option<(usize, TagHead)> {
    let mut at = from;
    while let Some(lt) = self.index_of('<', at) {
      if let Some(head) = self.parse_tag_head_at(lt) {
        return Some((lt, head));
      }
      at = lt + 1;
    }
    None
  }

  /// Advance past the `>` of the tag the iterator is inside of. The
  /// self-close check looks for an unescaped `/` with only whitespace
  /// between it and the `>`.
  fn to_tag_end(&mut self) -> Option<TagEnd> {
    loop {
      let Some(gt) = self.index_of('>', self.col) else {
        if self.next_line() {
          continue;
        }
        return None;
      };
      if !self.is_tag_char(gt) {
        self.col = gt + 1;
        continue;
      }
      let last_slash = self.last_index_of('/', gt);
      let self_close = last_slash
        .is_some_and(|ls| self.chars[ls + 1..gt].iter().all(|c| c.is_whitespace()));
      self.col = gt + 1;
      return Some(if self_close {
        TagEnd::SelfClose
      } else {
        TagEnd::Regular
      });
    }
  }

  /// Walk back to the `<` of the tag whose end the iterator just passed.
  fn to_tag_start(&mut self) -> Option<TagHead> {
    loop {
      let lt = if self.col > 0 {
        self.last_index_of('<', self.col)
      } else {
        None
      };
      let Some(lt) = lt else {
        if self.prev_line() {
          continue;
        }
        return None;
      };
      if !self.is_tag_char(lt) {
        self.col = lt;
        continue;
      }
      self.col = lt;
      if let Some(head) = self.parse_tag_head_at(lt) {
        return Some(head);
      }
    }
  }

  /// Advance to just past the head of the next tag.
  fn to_next_tag(&mut self) -> Option<TagHead> {
    loop {
      let Some((index, head)) = self.find_tag_head(self.col) else {
        if self.next_line() {
          continue;
        }
        return None;
      };
      if !self.is_tag_char(index) {
        self.col = index + 1;
        continue;
      }
      self.col = index + head.full_len;
      return Some(head);
    }
  }

  /// Walk back to just past the `>` of the previous tag.
  fn to_prev_tag(&mut self) -> Option<TagEnd> {
    loop {
      let gt = if self.col > 0 {
        self.last_index_of('>', self.col)
      } else {
        None
      };
      let Some(gt) = gt else {
        if self.prev_line() {
          continue;
        }
        return None;
      };
      if !self.is_tag_char(gt) {
        self.col = gt;
        continue;
      }
      let last_slash = self.last_index_of('/', gt);
      let self_close = last_slash
        .is_some_and(|ls| self.chars[ls + 1..gt].iter().all(|c| c.is_whitespace()));
      self.col = gt + 1;
      return Some(if self_close {
        TagEnd::SelfClose
      } else {
        TagEnd::Regular
      });
    }
  }
}

/// Scan forward for the closing tag that ends the current nesting level —
/// the close whose open, if any, lies before the iterator. With `tag` given,
/// only a close of that name counts; others are skipped over.
pub fn find_matching_close<B: Buffer + ?Sized>(
  iter: &mut TagIter<'_, B>,
  tag: Option<&str>,
) -> Option<TagRange> {
  let mut stack: Vec<String> = Vec::new();
  loop {
    let next = iter.to_next_tag()?;
    let start = Position::new(iter.line, iter.col - next.full_len);
    let end = iter.to_tag_end()?;
    if end == TagEnd::SelfClose {
      continue;
    }
    if next.closing {
      if let Some(i) = stack.iter().rposition(|name| *name == next.name) {
        stack.truncate(i);
      } else if tag.is_none_or(|t| t == next.name) {
        return Some(TagRange {
          span: Span::new(start, iter.pos()),
          name: next.name,
        });
      }
    } else {
      stack.push(next.name);
    }
  }
}

/// Scan backward for the opening tag that starts the current nesting level.
pub fn find_matching_open<B: Buffer + ?Sized>(
  iter: &mut TagIter<'_, B>,
  tag: Option<&str>,
) -> Option<TagRange> {
  let mut stack: Vec<String> = Vec::new();
  loop {
    let prev = iter.to_prev_tag()?;
    if prev == TagEnd::SelfClose {
      let _ = iter.to_tag_start();
      continue;
    }
    let end = iter.pos();
    let start = iter.to_tag_start()?;
    if start.closing {
      stack.push(start.name);
    } else if let Some(i) = stack.iter().rposition(|name| *name == start.name) {
      stack.truncate(i);
    } else if tag.is_none_or(|t| t == start.name) {
      return Some(TagRange {
        span: Span::new(iter.pos(), end),
        name: start.name,
      });
    }
  }
}

/// What does the tag under `pos` pair with?
///
/// Determines whether `pos` sits in an opening or closing tag, then scans
/// (forward/backward respectively) with a per-tag-name stack. Self-closing
/// tags short-circuit with `close: None`. `range` bounds the walk to a
/// viewport's line range.
pub fn find_matching_tag<B: Buffer + ?Sized>(
  buf: &B,
  pos: Position,
  range: Option<(usize, usize)>,
) -> Option<TagMatch> {
  let mut iter = TagIter::new(buf, pos, range);
  if !iter.chars.contains(&'<') && !iter.chars.contains(&'>') {
    return None;
  }

  let end = iter.to_tag_end()?;
  let to = iter.pos();
  let start = iter.to_tag_start()?;
  if iter.pos() > pos {
    return None;
  }

  let here = TagRange {
    span: Span::new(iter.pos(), to),
    name: start.name.clone(),
  };

  if end == TagEnd::SelfClose {
    return Some(TagMatch {
      open:  Some(here),
      close: None,
      at:    TagSide::Open,
    });
  }

  if start.closing {
    let open = find_matching_open(&mut iter, Some(&start.name));
    Some(TagMatch {
      open,
      close: Some(here),
      at: TagSide::Close,
    })
  } else {
    let mut forward = TagIter::new(buf, to, range);
    let close = find_matching_close(&mut forward, Some(&start.name));
    Some(TagMatch {
      open: Some(here),
      close,
      at: TagSide::Open,
    })
  }
}

/// Nearest ancestor element around `pos` that is fully matched.
///
/// Unbalanced markup degrades instead of failing: an open with no
/// corresponding close in the forward direction is skipped and the search
/// retries one level further out.
pub fn find_enclosing_tag<B: Buffer + ?Sized>(
  buf: &B,
  pos: Position,
  range: Option<(usize, usize)>,
  tag: Option<&str>,
) -> Option<EnclosingTag> {
  let mut iter = TagIter::new(buf, pos, range);
  loop {
    let open = find_matching_open(&mut iter, tag)?;
    let mut forward = TagIter::new(buf, pos, range);
    if let Some(close) = find_matching_close(&mut forward, Some(&open.name)) {
      return Some(EnclosingTag { open, close });
    }
  }
}

/// The next closing tag after `pos` that ends the current nesting level,
/// bounded to `end_line` when given. `name` restricts to one tag name.
pub fn scan_for_closing_tag<B: Buffer + ?Sized>(
  buf: &B,
  pos: Position,
  name: Option<&str>,
  end_line: Option<usize>,
) -> Option<TagRange> {
  let range = end_line.map(|end| (0, end));
  let mut iter = TagIter::new(buf, pos, range);
  find_matching_close(&mut iter, name)
}

/// The foldable span of the first unclosed element opened on `line`: from
/// just after its opening `>` to just before its closing tag.
pub fn fold_range<B: Buffer + ?Sized>(buf: &B, line: usize) -> Option<Span> {
  let mut iter = TagIter::new(buf, Position::new(line, 0), None);
  loop {
    let open_tag = iter.to_next_tag()?;
    if iter.line != line {
      return None;
    }
    let end = iter.to_tag_end()?;
    if !open_tag.closing && end != TagEnd::SelfClose {
      let start = iter.pos();
      let close = find_matching_close(&mut iter, Some(&open_tag.name))?;
      return (close.span.from > start).then(|| Span::new(start, close.span.from));
    }
  }
}

/// Derive the markup surroundings of `pos` by scanning: the unterminated
/// tag head the position sits in (if any) and the chain of enclosing
/// ancestors, innermost first.
///
/// Hosts whose tokenizer tracks this state directly should report it from
/// [`Buffer::markup_context_at`] instead; this is the fallback for buffers
/// that only expose text and token kinds.
pub fn derive_markup_context<B: Buffer + ?Sized>(buf: &B, pos: Position) -> MarkupContext {
  let mut tag_name = None;
  let mut in_close_tag = false;

  // Walk back over the current (and preceding) lines looking for the `<`
  // of an unterminated head, stopping at the first code-level `>`.
  'head: for line_no in (0..=pos.line).rev() {
    let Some(line) = buf.line(line_no) else {
      continue;
    };
    let chars: Vec<char> = line.chars().collect();
    let upto = if line_no == pos.line {
      pos.col.min(chars.len())
    } else {
      chars.len()
    };
    for col in (0..upto).rev() {
      let kind = buf.token_kind_at(Position::new(line_no, col));
      if kind == Some(TokenKind::String) {
        continue;
      }
      match chars[col] {
        '>' => break 'head,
        '<' => {
          let iter = TagIter::new(buf, Position::new(line_no, 0), None);
          if let Some(head) = iter.parse_tag_head_at(col) {
            tag_name = Some(head.name);
            in_close_tag = head.closing;
          }
          break 'head;
        },
        _ => {},
      }
    }
  }

  let mut context = Vec::new();
  let mut iter = TagIter::new(buf, pos, None);
  while let Some(open) = find_matching_open(&mut iter, None) {
    context.push(open.name);
  }

  MarkupContext {
    tag_name,
    in_close_tag,
    context,
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::buffer::{
    LineBuffer,
    MarkupTokenizer,
  };

  fn buf(text: &str) -> LineBuffer<MarkupTokenizer> {
    LineBuffer::from_str(text)
  }

  #[test]
  fn test_match_from_open_tag() {
    let b = buf("<div><span>x</span></div>");
    let m = find_matching_tag(&b, Position::new(0, 2), None).unwrap();
    assert_eq!(m.at, TagSide::Open);
    assert_eq!(m.open.as_ref().unwrap().name, "div");
    let close = m.close.unwrap();
    assert_eq!(close.name, "div");
    assert_eq!(close.span.from, Position::new(0, 19));
    assert_eq!(close.span.to, Position::new(0, 25));
  }

  #[test]
  fn test_match_from_close_tag() {
    let b = buf("<div><span>x</span></div>");
    // Cursor inside `</span>`.
    let m = find_matching_tag(&b, Position::new(0, 14), None).unwrap();
    assert_eq!(m.at, TagSide::Close);
    let open = m.open.unwrap();
    assert_eq!(open.name, "span");
    assert_eq!(open.span.from, Position::new(0, 5));
  }

  #[test]
  fn test_self_closing_has_no_close() {
    let b = buf("<div><br/></div>");
    let m = find_matching_tag(&b, Position::new(0, 7), None).unwrap();
    assert_eq!(m.at, TagSide::Open);
    assert_eq!(m.open.unwrap().name, "br");
    assert!(m.close.is_none());

    // Space before the slash still self-closes.
    let b = buf("<img src=\"x\" />");
    let m = find_matching_tag(&b, Position::new(0, 2), None).unwrap();
    assert!(m.close.is_none());
  }

  #[test]
  fn test_same_name_nesting() {
    let b = buf("<div><div>a</div>b</div>");
    let m = find_matching_tag(&b, Position::new(0, 2), None).unwrap();
    let close = m.close.unwrap();
    // Outer div pairs with the outer close, not the inner one.
    assert_eq!(close.span.from, Position::new(0, 18));
  }

  #[test]
  fn test_unclosed_tag_reports_missing_close() {
    let b = buf("<div><span>x</div>");
    let m = find_matching_tag(&b, Position::new(0, 7), None).unwrap();
    assert_eq!(m.at, TagSide::Open);
    assert_eq!(m.open.unwrap().name, "span");
    assert!(m.close.is_none());
  }

  #[test]
  fn test_multiline_structure() {
    let b = buf("<ul>\n  <li>one</li>\n  <li>two</li>\n</ul>");
    let m = find_matching_tag(&b, Position::new(0, 1), None).unwrap();
    let close = m.close.unwrap();
    assert_eq!(close.span.from, Position::new(3, 0));

    // Tag head split across lines.
    let b = buf("<div\n  class=\"a\">x</div>");
    let m = find_matching_tag(&b, Position::new(0, 2), None).unwrap();
    assert_eq!(m.close.unwrap().span.from, Position::new(1, 13));
  }

  #[test]
  fn test_enclosing_tag_skips_unbalanced() {
    // `<b>` is never closed; the enclosing search steps out to `<a>`.
    let b = buf("<a><b>te xt</a>");
    let enclosing = find_enclosing_tag(&b, Position::new(0, 8), None, None).unwrap();
    assert_eq!(enclosing.open.name, "a");
    assert_eq!(enclosing.close.name, "a");
  }

  #[test]
  fn test_enclosing_tag_nested() {
    let b = buf("<a><b>te xt</b></a>");
    let enclosing = find_enclosing_tag(&b, Position::new(0, 8), None, None).unwrap();
    assert_eq!(enclosing.open.name, "b");
  }

  #[test]
  fn test_scan_for_closing_tag() {
    let b = buf("<div>\n  <p>x</p>\n</div>");
    let close = scan_for_closing_tag(&b, Position::new(0, 5), Some("div"), None).unwrap();
    assert_eq!(close.span.from, Position::new(2, 0));

    // A close of a different name at the current level does not count.
    assert!(scan_for_closing_tag(&b, Position::new(0, 5), Some("span"), None).is_none());

    // Any-name scan returns the first level-ending close.
    let any = scan_for_closing_tag(&b, Position::new(0, 5), None, None).unwrap();
    assert_eq!(any.name, "div");
  }

  #[test]
  fn test_fold_range() {
    let b = buf("<ul>\n  <li>one</li>\n</ul>");
    let span = fold_range(&b, 0).unwrap();
    assert_eq!(span.from, Position::new(0, 4));
    assert_eq!(span.to, Position::new(2, 0));

    // Nothing foldable on a line with only a self-closing tag.
    let b = buf("<br/>\n<p>x</p>");
    assert!(fold_range(&b, 0).is_none());
  }

  #[test]
  fn test_derive_markup_context() {
    // Inside an unterminated head.
    let b = buf("<div><p><span cla");
    let ctx = b.markup_context_at(Position::new(0, 17));
    assert_eq!(ctx.tag_name.as_deref(), Some("span"));
    assert!(!ctx.in_close_tag);
    assert_eq!(ctx.context, vec!["p".to_string(), "div".to_string()]);

    // In text content: no head, ancestors only.
    let b = buf("<div><p>he");
    let ctx = b.markup_context_at(Position::new(0, 10));
    assert_eq!(ctx.tag_name, None);
    assert_eq!(ctx.context, vec!["p".to_string(), "div".to_string()]);

    // Inside a closing head.
    let b = buf("<div>x</di");
    let ctx = b.markup_context_at(Position::new(0, 10));
    assert_eq!(ctx.tag_name.as_deref(), Some("di"));
    assert!(ctx.in_close_tag);
  }
}
