//! Cursor-driven match highlighting.
//!
//! [`BracketHighlighter`] and [`TagHighlighter`] own the transient marks for
//! one buffer each. The host calls [`BracketHighlighter::refresh`] /
//! [`TagHighlighter::cursor_moved`] on every cursor movement; previous marks
//! are cleared before the new query runs, so stale highlights never survive
//! a movement. In transient usage the host additionally schedules a
//! [`clear`](BracketHighlighter::clear) after
//! [`MatchConfig::clear_after_ms`]; in live usage marks simply persist until
//! the next refresh.

use smallvec::SmallVec;

use crate::{
  buffer::{
    Buffer,
    MarkId,
    MarkStyle,
  },
  config::MatchConfig,
  position::{
    Caret,
    Position,
  },
  scan::find_matching_bracket,
  tag::{
    TagSide,
    find_matching_tag,
  },
};

/// Bracket-match marks for one buffer.
#[derive(Debug, Default)]
pub struct BracketHighlighter {
  marks: SmallVec<[MarkId; 2]>,
}

impl BracketHighlighter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn clear<B: Buffer + ?Sized>(&mut self, buf: &mut B) {
    for id in self.marks.drain(..) {
      buf.clear_mark(id);
    }
  }

  /// Re-run the match query for every empty caret and replace the marks.
  ///
  /// Both ends get the same style on a match; a counterpart of the wrong
  /// type gets the non-matching style on both ends; an exhausted scan marks
  /// only the origin; an inconclusive scan marks nothing. Lines longer than
  /// the highlight ceiling are skipped entirely.
  pub fn refresh<B: Buffer + ?Sized>(&mut self, buf: &mut B, config: &MatchConfig) {
    self.clear(buf);

    let line_len = |buf: &B, line: usize| {
      buf
        .line(line)
        .map_or(usize::MAX, |text| text.chars().count())
    };

    let carets = buf.carets();
    for caret in carets.iter().filter(|caret| caret.is_empty()) {
      let Some(found) = find_matching_bracket(&*buf, caret.head, config) else {
        continue;
      };
      if line_len(buf, found.from.from.line) > config.max_highlight_line_len {
        continue;
      }

      let style = if found.matched {
        MarkStyle::MatchingBracket
      } else {
        MarkStyle::NonMatchingBracket
      };
      self.marks.push(buf.mark_span(found.from, style));

      if let Some(to) = found.to {
        if line_len(buf, to.from.line) <= config.max_highlight_line_len {
          self.marks.push(buf.mark_span(to, style));
        }
      }
    }
  }

  pub fn marks(&self) -> &[MarkId] {
    &self.marks
  }
}

/// Tag-match marks for one buffer.
///
/// A failed match (open with no close in the scanned range) is remembered;
/// [`viewport_changed`](TagHighlighter::viewport_changed) retries it when
/// more of the buffer scrolls into view.
#[derive(Debug, Default)]
pub struct TagHighlighter {
  hit:           Option<MarkId>,
  other:         Option<MarkId>,
  failed:        bool,
  /// Also mark the tag under the cursor, not just its counterpart.
  pub both_tags: bool,
}

impl TagHighlighter {
  pub fn new(both_tags: bool) -> Self {
    Self {
      both_tags,
      ..Self::default()
    }
  }

  pub fn clear<B: Buffer + ?Sized>(&mut self, buf: &mut B) {
    if let Some(id) = self.hit.take() {
      buf.clear_mark(id);
    }
    if let Some(id) = self.other.take() {
      buf.clear_mark(id);
    }
  }

  pub fn cursor_moved<B: Buffer + ?Sized>(
    &mut self,
    buf: &mut B,
    viewport: Option<(usize, usize)>,
  ) {
    self.failed = false;
    self.clear(buf);
    if buf.something_selected() {
      return;
    }

    let cur = buf.carets()[0].head;
    // Widen the viewport to always include the cursor line.
    let range = viewport.map(|(from, to)| (from.min(cur.line), to.max(cur.line + 1)));

    let Some(found) = find_matching_tag(&*buf, cur, range) else {
      return;
    };

    if self.both_tags {
      let hit = match found.at {
        TagSide::Open => &found.open,
        TagSide::Close => &found.close,
      };
      if let Some(hit) = hit {
        self.hit = Some(buf.mark_span(hit.span, MarkStyle::MatchingTag));
      }
    }

    let other = match found.at {
      TagSide::Close => found.open,
      TagSide::Open => found.close,
    };
    match other {
      Some(other) => {
        self.other = Some(buf.mark_span(other.span, MarkStyle::MatchingTag));
      },
      None => self.failed = true,
    }
  }

  /// Retry a previously failed match now that a different slice of the
  /// buffer is visible.
  pub fn viewport_changed<B: Buffer + ?Sized>(
    &mut self,
    buf: &mut B,
    viewport: Option<(usize, usize)>,
  ) {
    if self.failed {
      self.cursor_moved(buf, viewport);
    }
  }

  pub fn failed(&self) -> bool {
    self.failed
  }
}

/// The selection for a "jump to matching tag" command: the counterpart tag,
/// head at its end so the jump lands visibly on it.
pub fn to_matching_tag<B: Buffer + ?Sized>(buf: &B, pos: Position) -> Option<Caret> {
  let found = find_matching_tag(buf, pos, None)?;
  let other = match found.at {
    TagSide::Close => found.open,
    TagSide::Open => found.close,
  }?;
  Some(Caret::new(other.span.from, other.span.to))
}

#[cfg(test)]
mod test {
  use smallvec::smallvec;

  use super::*;
  use crate::buffer::{
    LineBuffer,
    MarkupTokenizer,
    PlainTokenizer,
  };

  fn set_cursor<B: Buffer + ?Sized>(buf: &mut B, line: usize, col: usize) {
    buf.set_carets(smallvec![Caret::point(Position::new(line, col))]);
  }

  #[test]
  fn test_bracket_marks_matched_pair() {
    let mut buf = LineBuffer::<PlainTokenizer>::from_str("(abc)");
    set_cursor(&mut buf, 0, 1);

    let mut hl = BracketHighlighter::new();
    hl.refresh(&mut buf, &MatchConfig::default());

    assert_eq!(buf.marks().len(), 2);
    assert!(buf
      .marks()
      .iter()
      .all(|(.., style)| *style == MarkStyle::MatchingBracket));
  }

  #[test]
  fn test_bracket_marks_mismatch_styled_as_error() {
    let mut buf = LineBuffer::<PlainTokenizer>::from_str("(abc]");
    set_cursor(&mut buf, 0, 1);

    let mut hl = BracketHighlighter::new();
    hl.refresh(&mut buf, &MatchConfig::default());

    assert_eq!(buf.marks().len(), 2);
    assert!(buf
      .marks()
      .iter()
      .all(|(.., style)| *style == MarkStyle::NonMatchingBracket));
  }

  #[test]
  fn test_bracket_origin_only_when_exhausted() {
    let mut buf = LineBuffer::<PlainTokenizer>::from_str("(abc");
    set_cursor(&mut buf, 0, 1);

    let mut hl = BracketHighlighter::new();
    hl.refresh(&mut buf, &MatchConfig::default());
    assert_eq!(buf.marks().len(), 1);
  }

  #[test]
  fn test_refresh_replaces_previous_marks() {
    let mut buf = LineBuffer::<PlainTokenizer>::from_str("(a) [b]");
    set_cursor(&mut buf, 0, 1);

    let mut hl = BracketHighlighter::new();
    hl.refresh(&mut buf, &MatchConfig::default());
    assert_eq!(buf.marks().len(), 2);

    set_cursor(&mut buf, 0, 5);
    hl.refresh(&mut buf, &MatchConfig::default());
    assert_eq!(buf.marks().len(), 2);
    // The new marks cover the second pair.
    assert!(buf
      .marks()
      .iter()
      .any(|(_, span, _)| span.from == Position::new(0, 4)));
  }

  #[test]
  fn test_selection_skips_highlighting() {
    let mut buf = LineBuffer::<PlainTokenizer>::from_str("(abc)");
    buf.set_carets(smallvec![Caret::new(
      Position::new(0, 1),
      Position::new(0, 3)
    )]);

    let mut hl = BracketHighlighter::new();
    hl.refresh(&mut buf, &MatchConfig::default());
    assert!(buf.marks().is_empty());
  }

  #[test]
  fn test_long_line_not_highlighted() {
    let long = format!("({})", "x".repeat(2_000));
    let mut buf = LineBuffer::<PlainTokenizer>::from_str(&long);
    set_cursor(&mut buf, 0, 1);

    let mut hl = BracketHighlighter::new();
    hl.refresh(&mut buf, &MatchConfig::default());
    assert!(buf.marks().is_empty());
  }

  #[test]
  fn test_tag_highlight_both_tags() {
    let mut buf = LineBuffer::<MarkupTokenizer>::from_str("<div>x</div>");
    set_cursor(&mut buf, 0, 2);

    let mut hl = TagHighlighter::new(true);
    hl.cursor_moved(&mut buf, None);

    assert_eq!(buf.marks().len(), 2);
    assert!(!hl.failed());
  }

  #[test]
  fn test_tag_highlight_unclosed_sets_failed_and_retries() {
    let mut buf = LineBuffer::<MarkupTokenizer>::from_str("<div>x");
    set_cursor(&mut buf, 0, 2);

    let mut hl = TagHighlighter::new(true);
    hl.cursor_moved(&mut buf, None);
    assert!(hl.failed());
    assert_eq!(buf.marks().len(), 1);

    // The close tag "appears" (edit clears the old mark as a side effect);
    // a viewport change retries the failed match.
    buf.replace_range("x</div>", Position::new(0, 5), Position::new(0, 6));
    hl.viewport_changed(&mut buf, None);
    assert!(!hl.failed());
    assert_eq!(buf.marks().len(), 2);
  }

  #[test]
  fn test_to_matching_tag_jump() {
    let buf = LineBuffer::<MarkupTokenizer>::from_str("<div>x</div>");
    let caret = to_matching_tag(&buf, Position::new(0, 2)).unwrap();
    assert_eq!(caret.anchor, Position::new(0, 6));
    assert_eq!(caret.head, Position::new(0, 12));

    // From the close tag back to the open.
    let caret = to_matching_tag(&buf, Position::new(0, 8)).unwrap();
    assert_eq!(caret.anchor, Position::new(0, 0));
  }
}
