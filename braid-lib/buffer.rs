//! The buffer abstraction the matching/completion core runs against.
//!
//! The host editor owns the document; this module defines the [`Buffer`]
//! trait the core consumes — line access, token classification at a
//! position, the caret list, replace and mark operations — plus a reference
//! implementation, [`LineBuffer`], backed by a [`ropey::Rope`] with a
//! pluggable [`tokenize::Tokenizer`]. Hosts with their own document model
//! implement [`Buffer`] directly; `LineBuffer` exists for tests and for
//! embedding without one.
//!
//! Tokens are immutable snapshots: they are valid until the next edit and
//! never retained across one.

use std::borrow::Cow;

use smallvec::SmallVec;

use crate::{
  Tendril,
  position::{
    Caret,
    Position,
    Span,
  },
};

pub mod tokenize;

pub use tokenize::{
  MarkupTokenizer,
  PlainTokenizer,
  ScriptTokenizer,
  Tokenizer,
};

/// Classification of a token, as reported by the host's tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
  Tag,
  Attribute,
  String,
  Comment,
  Keyword,
  Property,
  Variable,
  Atom,
  Number,
  Word,
  Punctuation,
}

/// Which language governs a position in a mixed-mode document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
  Markup,
  Script,
  Style,
  Plain,
}

/// A token snapshot at a position. Columns are char offsets into the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub text:  String,
  pub start: usize,
  pub end:   usize,
  pub kind:  Option<TokenKind>,
}

impl Token {
  /// An empty token sitting at `col`, used when the cursor is not inside
  /// any word-like token.
  pub fn empty_at(col: usize) -> Self {
    Self {
      text:  String::new(),
      start: col,
      end:   col,
      kind:  None,
    }
  }
}

/// Markup surroundings of a position: the tag whose head (name/attribute
/// area) the position sits in, and the chain of enclosing ancestor tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupContext {
  /// Name of the unterminated tag head containing the position, if any.
  pub tag_name:     Option<String>,
  /// Whether that tag head is a closing tag (`</name`).
  pub in_close_tag: bool,
  /// Enclosing ancestor tag names, innermost first.
  pub context:      Vec<String>,
}

/// Visual style of a mark placed by the highlighters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkStyle {
  MatchingBracket,
  NonMatchingBracket,
  MatchingTag,
}

/// Handle to a mark placed with [`Buffer::mark_span`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkId(pub u64);

/// The seam between the core and the host editor.
///
/// Line numbers and columns are 0-indexed; columns count chars. All
/// position-taking methods tolerate out-of-range input by returning `None`
/// or clamping — the core treats such lines as absent rather than erroring.
pub trait Buffer {
  /// The text of line `n`, without its line ending.
  fn line(&self, n: usize) -> Option<Cow<'_, str>>;

  fn line_count(&self) -> usize;

  /// The token whose span contains `pos` — the token the character just
  /// before the position belongs to (`start < col <= end`), or the token
  /// starting at the position when the column is 0 or sits at a boundary
  /// with nothing before it.
  fn token_at(&self, pos: Position) -> Token;

  /// Classification of the character *at* `pos` (`start <= col < end`).
  fn token_kind_at(&self, pos: Position) -> Option<TokenKind>;

  /// Which language governs `pos` in a mixed-mode document.
  fn inner_mode_at(&self, pos: Position) -> ModeKind;

  /// Markup surroundings of `pos`. Hosts with a real tokenizer report their
  /// mode state; [`crate::tag::derive_markup_context`] derives this by
  /// scanning when no richer source exists.
  fn markup_context_at(&self, pos: Position) -> MarkupContext;

  fn carets(&self) -> SmallVec<[Caret; 1]>;

  fn set_carets(&mut self, carets: SmallVec<[Caret; 1]>);

  /// Replace `from..to` with `text`. Returns the end position of the
  /// inserted text. Marks overlapping the edited region are dropped.
  fn replace_range(&mut self, text: &str, from: Position, to: Position) -> Position;

  fn mark_span(&mut self, span: Span, style: MarkStyle) -> MarkId;

  fn clear_mark(&mut self, id: MarkId);

  /// Re-indent line `n`; returns the resulting indentation width.
  fn indent_line(&mut self, n: usize) -> usize;

  fn line_separator(&self) -> &str {
    "\n"
  }

  // Provided helpers.
  //

  fn last_line(&self) -> usize {
    self.line_count().saturating_sub(1)
  }

  /// The character at `pos`, if the line exists and is long enough.
  fn char_at(&self, pos: Position) -> Option<char> {
    self.line(pos.line)?.chars().nth(pos.col)
  }

  /// Text between two positions on the same or different lines, joined
  /// with the buffer's line separator.
  fn text_range(&self, from: Position, to: Position) -> String {
    if from.line == to.line {
      let Some(line) = self.line(from.line) else {
        return String::new();
      };
      return line
        .chars()
        .skip(from.col)
        .take(to.col.saturating_sub(from.col))
        .collect();
    }

    let mut out = String::new();
    for n in from.line..=to.line.min(self.last_line()) {
      let Some(line) = self.line(n) else { continue };
      if n == from.line {
        out.extend(line.chars().skip(from.col));
      } else if n == to.line {
        out.push_str(self.line_separator());
        out.extend(line.chars().take(to.col));
      } else {
        out.push_str(self.line_separator());
        out.push_str(&line);
      }
    }
    out
  }

  /// Does any caret hold a non-empty selection?
  fn something_selected(&self) -> bool {
    self.carets().iter().any(|caret| !caret.is_empty())
  }
}

/// One replacement, used when a handler batches edits across carets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
  pub span: Span,
  pub text: Tendril,
}

impl Edit {
  pub fn insert(at: Position, text: impl Into<Tendril>) -> Self {
    Self {
      span: Span::new(at, at),
      text: text.into(),
    }
  }

  /// End position of the replacement text, in post-edit coordinates.
  pub fn end(&self) -> Position {
    let mut line = self.span.from.line;
    let mut col = self.span.from.col;
    for ch in self.text.chars() {
      if ch == '\n' {
        line += 1;
        col = 0;
      } else {
        col += 1;
      }
    }
    Position::new(line, col)
  }
}

/// Map a position strictly after `edit.span` through the edit.
///
/// Used when multi-caret handlers apply edits in reverse document order:
/// positions recorded for later carets are remapped through each earlier
/// edit as it lands.
pub fn map_through(edit: &Edit, pos: Position) -> Position {
  if pos <= edit.span.from {
    return pos;
  }

  let end = edit.end();
  if pos.line == edit.span.to.line {
    let col = end.col + pos.col.saturating_sub(edit.span.to.col);
    Position::new(end.line, col)
  } else {
    let line_delta = end.line as isize - edit.span.to.line as isize;
    Position::new((pos.line as isize + line_delta) as usize, pos.col)
  }
}

/// Re-indent a line and remap already-placed carets through the equivalent
/// leading-whitespace edit. Shared by the multi-caret typing handlers.
pub(crate) fn indent_and_remap<B: Buffer + ?Sized>(
  buf: &mut B,
  line: usize,
  placed: &mut [(usize, Caret)],
) -> usize {
  let old = buf.line(line).map_or(0, |text| {
    text.chars().take_while(|c| c.is_whitespace()).count()
  });
  let width = buf.indent_line(line);
  let edit = Edit {
    span: Span::new(Position::new(line, 0), Position::new(line, old)),
    text: " ".repeat(width).into(),
  };
  for (_, caret) in placed.iter_mut() {
    caret.anchor = map_through(&edit, caret.anchor);
    caret.head = map_through(&edit, caret.head);
  }
  width
}

/// Reference buffer: a rope plus a pluggable tokenizer.
///
/// Tokenization is recomputed from the top of the buffer per query so that
/// constructs spanning lines (multi-line tags, script islands) classify
/// correctly; this is O(document) per query and meant for tests and small
/// embeddings, not as a production document store.
pub struct LineBuffer<T: Tokenizer = PlainTokenizer> {
  text:      ropey::Rope,
  tokenizer: T,
  carets:    SmallVec<[Caret; 1]>,
  marks:     Vec<(MarkId, Span, MarkStyle)>,
  next_mark: u64,
  indent:    String,
}

impl<T: Tokenizer + Default> LineBuffer<T> {
  pub fn from_str(text: &str) -> Self {
    Self::with_tokenizer(text, T::default())
  }
}

impl<T: Tokenizer> LineBuffer<T> {
  pub fn with_tokenizer(text: &str, tokenizer: T) -> Self {
    Self {
      text: ropey::Rope::from_str(text),
      tokenizer,
      carets: smallvec::smallvec![Caret::point(Position::zero())],
      marks: Vec::new(),
      next_mark: 0,
      indent: "  ".to_string(),
    }
  }

  pub fn text(&self) -> String {
    self.text.to_string()
  }

  /// Marks currently alive, for the host's renderer (and tests).
  pub fn marks(&self) -> &[(MarkId, Span, MarkStyle)] {
    &self.marks
  }

  /// Tokenizer state at the start of line `n`.
  fn state_at_line(&self, n: usize) -> T::State {
    let mut state = T::State::default();
    for line_no in 0..n.min(self.text.len_lines()) {
      let line = self.line_string(line_no);
      self.tokenizer.tokens(&line, &mut state);
    }
    state
  }

  fn line_string(&self, n: usize) -> String {
    let line = self.text.line(n);
    let mut out = line.to_string();
    while out.ends_with(['\n', '\r']) {
      out.pop();
    }
    out
  }

  fn char_index(&self, pos: Position) -> usize {
    let line = pos.line.min(self.text.len_lines().saturating_sub(1));
    let start = self.text.line_to_char(line);
    let len = self.line_string(line).chars().count();
    start + pos.col.min(len)
  }

  fn line_tokens(&self, n: usize) -> Vec<Token> {
    let mut state = self.state_at_line(n);
    self.tokenizer.tokens(&self.line_string(n), &mut state)
  }
}

impl<T: Tokenizer> Buffer for LineBuffer<T> {
  fn line(&self, n: usize) -> Option<Cow<'_, str>> {
    if n >= self.line_count() {
      return None;
    }
    Some(Cow::Owned(self.line_string(n)))
  }

  fn line_count(&self) -> usize {
    // A trailing newline makes ropey report one extra, empty line; keep it,
    // it is addressable like any other.
    self.text.len_lines()
  }

  fn token_at(&self, pos: Position) -> Token {
    let tokens = self.line_tokens(pos.line);
    if tokens.is_empty() {
      return Token::empty_at(pos.col);
    }
    for token in &tokens {
      if token.start < pos.col && pos.col <= token.end {
        return token.clone();
      }
    }
    if pos.col == 0 {
      return tokens[0].clone();
    }
    tokens.last().cloned().unwrap_or_else(|| Token::empty_at(pos.col))
  }

  fn token_kind_at(&self, pos: Position) -> Option<TokenKind> {
    self
      .line_tokens(pos.line)
      .iter()
      .find(|token| token.start <= pos.col && pos.col < token.end)
      .and_then(|token| token.kind)
  }

  fn inner_mode_at(&self, pos: Position) -> ModeKind {
    let state = self.state_at_line(pos.line);
    self
      .tokenizer
      .mode_at(&self.line_string(pos.line), pos.col, &state)
  }

  fn markup_context_at(&self, pos: Position) -> MarkupContext {
    crate::tag::derive_markup_context(self, pos)
  }

  fn carets(&self) -> SmallVec<[Caret; 1]> {
    self.carets.clone()
  }

  fn set_carets(&mut self, carets: SmallVec<[Caret; 1]>) {
    if !carets.is_empty() {
      self.carets = carets;
    }
  }

  fn replace_range(&mut self, text: &str, from: Position, to: Position) -> Position {
    let span = Span::new(from, to);
    let start = self.char_index(span.from);
    let end = self.char_index(span.to);
    self.text.remove(start..end);
    self.text.insert(start, text);

    self
      .marks
      .retain(|(_, mark, _)| mark.to <= span.from || mark.from >= span.to);

    Edit {
      span,
      text: text.into(),
    }
    .end()
  }

  fn mark_span(&mut self, span: Span, style: MarkStyle) -> MarkId {
    self.next_mark += 1;
    let id = MarkId(self.next_mark);
    self.marks.push((id, span, style));
    id
  }

  fn clear_mark(&mut self, id: MarkId) {
    self.marks.retain(|(mark_id, ..)| *mark_id != id);
  }

  fn indent_line(&mut self, n: usize) -> usize {
    let Some(line) = self.line(n).map(Cow::into_owned) else {
      return 0;
    };

    // Align to the nearest non-blank line above, one unit deeper when that
    // line ends in an opening construct, one unit shallower when this line
    // starts with a closing one.
    let mut want = String::new();
    for above in (0..n).rev() {
      let Some(text) = self.line(above) else { continue };
      if text.trim().is_empty() {
        continue;
      }
      want = text
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect();
      let trimmed = text.trim_end();
      if trimmed.ends_with(['(', '[', '{'])
        || (trimmed.ends_with('>') && !trimmed.ends_with("/>") && !trimmed.contains("</"))
      {
        want.push_str(&self.indent);
      }
      break;
    }

    let body = line.trim_start().to_string();
    if body.starts_with([')', ']', '}']) || body.starts_with("</") {
      let unit = self.indent.chars().count();
      let keep = want.chars().count().saturating_sub(unit);
      want = want.chars().take(keep).collect();
    }
    let width = want.chars().count();
    self.replace_range(
      &format!("{want}{body}"),
      Position::new(n, 0),
      Position::new(n, line.chars().count()),
    );
    width
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_token_at_boundaries() {
    let buf = LineBuffer::<PlainTokenizer>::from_str("foo bar");

    let tok = buf.token_at(Position::new(0, 3));
    assert_eq!(tok.text, "foo");
    assert_eq!((tok.start, tok.end), (0, 3));

    // At a boundary the token before the cursor wins.
    let tok = buf.token_at(Position::new(0, 4));
    assert_eq!(tok.text, " ");

    let tok = buf.token_at(Position::new(0, 6));
    assert_eq!(tok.text, "bar");
  }

  #[test]
  fn test_replace_range_and_mapping() {
    let mut buf = LineBuffer::<PlainTokenizer>::from_str("hello world");
    let end = buf.replace_range("there,", Position::new(0, 6), Position::new(0, 11));
    assert_eq!(buf.text(), "hello there,");
    assert_eq!(end, Position::new(0, 12));

    let edit = Edit::insert(Position::new(0, 0), "ab\ncd");
    assert_eq!(edit.end(), Position::new(1, 2));
    assert_eq!(
      map_through(&edit, Position::new(0, 3)),
      Position::new(1, 5)
    );
    assert_eq!(
      map_through(&edit, Position::new(2, 1)),
      Position::new(3, 1)
    );
  }

  #[test]
  fn test_marks_dropped_on_overlapping_edit() {
    let mut buf = LineBuffer::<PlainTokenizer>::from_str("(hello)");
    let keep = buf.mark_span(
      Span::new(Position::new(0, 0), Position::new(0, 1)),
      MarkStyle::MatchingBracket,
    );
    let drop = buf.mark_span(
      Span::new(Position::new(0, 6), Position::new(0, 7)),
      MarkStyle::MatchingBracket,
    );

    buf.replace_range("!", Position::new(0, 5), Position::new(0, 7));
    let alive: Vec<_> = buf.marks().iter().map(|(id, ..)| *id).collect();
    assert!(alive.contains(&keep));
    assert!(!alive.contains(&drop));
  }

  #[test]
  fn test_text_range_across_lines() {
    let buf = LineBuffer::<PlainTokenizer>::from_str("one\ntwo\nthree");
    assert_eq!(
      buf.text_range(Position::new(0, 1), Position::new(2, 3)),
      "ne\ntwo\nthr"
    );
  }
}
