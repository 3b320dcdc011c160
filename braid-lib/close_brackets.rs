//! Typing-time bracket pairing.
//!
//! [`handle_char`] classifies a typed pair character into one mode per
//! caret — surround a selection, insert both halves, skip an already-present
//! closer, the triple-quote specials — and applies the edit only when every
//! caret agrees on the mode. Any disagreement, or any caret where no mode
//! applies, passes the whole keypress through untouched so multi-caret
//! editing never half-applies.
//!
//! [`handle_backspace`] merges an empty pair around the cursor into one
//! deletion; [`handle_enter`] explodes a configured pair into an indented
//! blank line.

use braid_core::chars::char_is_word;

use crate::{
  HandlerOutcome,
  buffer::{
    Buffer,
    Edit,
    TokenKind,
    indent_and_remap,
    map_through,
  },
  config::PairConfig,
  position::{
    Caret,
    Position,
    Span,
  },
  scan::Direction,
};

/// How a typed pair character is handled at one caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairMode {
  /// Wrap the selection in the pair.
  Surround,
  /// Insert both halves, cursor between them.
  Both,
  /// Step over the closer already present.
  Skip,
  /// Step over a complete closing triple.
  SkipThree,
  /// Extend `""` to a closed `""""` run (cursor after the third).
  AddFour,
}

/// One caret's pending edit plus its caret in post-edit coordinates.
struct Pending {
  edit:  Edit,
  caret: Caret,
}

/// Apply per-caret edits in reverse document order, remapping the carets
/// already placed through each earlier edit as it lands.
fn apply_pending<B: Buffer + ?Sized>(buf: &mut B, pending: Vec<Pending>) {
  let mut placed: Vec<(usize, Caret)> = Vec::with_capacity(pending.len());
  for (index, p) in pending.iter().enumerate().rev() {
    buf.replace_range(&p.edit.text, p.edit.span.from, p.edit.span.to);
    for (_, caret) in placed.iter_mut() {
      caret.anchor = map_through(&p.edit, caret.anchor);
      caret.head = map_through(&p.edit, caret.head);
    }
    placed.push((index, p.caret));
  }
  placed.sort_by_key(|(index, _)| *index);
  buf.set_carets(placed.into_iter().map(|(_, caret)| caret).collect());
}

/// The two characters around a cursor, when both exist on its line.
fn chars_around<B: Buffer + ?Sized>(buf: &B, pos: Position) -> Option<(char, char)> {
  if pos.col == 0 {
    return None;
  }
  let before = buf.char_at(pos.with_col(pos.col - 1))?;
  let after = buf.char_at(pos)?;
  Some((before, after))
}

/// Does a string token begin exactly after `pos`? Guards the quote case
/// where typing the closing quote of `"` right before another string would
/// otherwise be treated as a skip.
fn string_starts_after<B: Buffer + ?Sized>(buf: &B, pos: Position) -> bool {
  let token = buf.token_at(pos.with_col(pos.col + 1));
  token.kind == Some(TokenKind::String)
    && token.start == pos.col
    && (pos.col == 0 || buf.token_kind_at(pos.with_col(pos.col - 1)) != Some(TokenKind::String))
}

fn classify(
  buf: &(impl Buffer + ?Sized),
  caret: &Caret,
  ch: char,
  identical: bool,
  opening: bool,
  config: &PairConfig,
) -> Option<PairMode> {
  let cur = caret.head;
  let next = buf.char_at(cur);

  if opening && !caret.is_empty() {
    return Some(PairMode::Surround);
  }

  if (identical || !opening) && next == Some(ch) {
    if identical && string_starts_after(buf, cur) {
      return Some(PairMode::Both);
    }
    let triple: String = std::iter::repeat(ch).take(3).collect();
    if config.triples.contains(ch)
      && buf.text_range(cur, cur.with_col(cur.col + 3)) == triple
    {
      return Some(PairMode::SkipThree);
    }
    return Some(PairMode::Skip);
  }

  if identical
    && cur.col > 1
    && config.triples.contains(ch)
    && buf.text_range(cur.with_col(cur.col - 2), cur) == format!("{ch}{ch}")
  {
    // Never extend a run that would split an existing string token.
    if cur.col > 2 && buf.token_kind_at(cur.with_col(cur.col - 3)) == Some(TokenKind::String) {
      return None;
    }
    return Some(PairMode::AddFour);
  }

  if identical {
    let prev = if cur.col == 0 {
      ' '
    } else {
      buf.char_at(cur.with_col(cur.col - 1)).unwrap_or(' ')
    };
    let next_is_word = next.is_some_and(char_is_word);
    if !next_is_word && prev != ch && !char_is_word(prev) {
      return Some(PairMode::Both);
    }
    return None;
  }

  if opening
    && next.is_none_or(|next| next.is_whitespace() || config.close_before.contains(next))
  {
    return Some(PairMode::Both);
  }

  None
}

/// Handle a typed pair character across all carets.
pub fn handle_char<B: Buffer + ?Sized>(
  buf: &mut B,
  ch: char,
  config: &PairConfig,
) -> HandlerOutcome {
  let pairs: Vec<char> = config.pairs.chars().collect();
  let Some(pos) = pairs.iter().position(|c| *c == ch) else {
    return HandlerOutcome::Pass;
  };
  let identical = pairs.get(pos + 1) == Some(&ch);
  let opening = pos % 2 == 0;
  let carets = buf.carets();

  let mut mode: Option<PairMode> = None;
  for caret in &carets {
    let Some(caret_mode) = classify(buf, caret, ch, identical, opening, config) else {
      return HandlerOutcome::Pass;
    };
    match mode {
      None => mode = Some(caret_mode),
      Some(m) if m == caret_mode => {},
      // Carets disagree: never apply an inconsistent multi-caret edit.
      Some(_) => return HandlerOutcome::Pass,
    }
  }
  let Some(mode) = mode else {
    return HandlerOutcome::Pass;
  };
  tracing::trace!(?mode, ch = %ch, carets = carets.len(), "close brackets");

  let left = if pos % 2 == 1 { pairs[pos - 1] } else { ch };
  let right = if pos % 2 == 1 { ch } else { pairs[pos + 1] };

  match mode {
    PairMode::Skip | PairMode::SkipThree => {
      let step = if mode == PairMode::Skip { 1 } else { 3 };
      let moved = carets
        .iter()
        .map(|caret| Caret::point(caret.head.with_col(caret.head.col + step)))
        .collect();
      buf.set_carets(moved);
    },
    PairMode::Both => {
      let pending = carets
        .iter()
        .map(|caret| {
          let cur = caret.head;
          Pending {
            edit:  Edit::insert(cur, format!("{left}{right}")),
            caret: Caret::point(cur.with_col(cur.col + 1)),
          }
        })
        .collect();
      apply_pending(buf, pending);
    },
    PairMode::AddFour => {
      let run: String = std::iter::repeat(left).take(4).collect();
      let pending = carets
        .iter()
        .map(|caret| {
          let cur = caret.head;
          Pending {
            edit:  Edit::insert(cur, run.clone()),
            caret: Caret::point(cur.with_col(cur.col + 1)),
          }
        })
        .collect();
      apply_pending(buf, pending);
    },
    PairMode::Surround => {
      let pending = carets
        .iter()
        .map(|caret| {
          let from = caret.from();
          let to = caret.to();
          let inner = buf.text_range(from, to);
          let inner_from = from.with_col(from.col + 1);
          let inner_to = if to.line == from.line {
            to.with_col(to.col + 1)
          } else {
            to
          };
          let placed = match caret.direction() {
            Direction::Forward => Caret::new(inner_from, inner_to),
            Direction::Backward => Caret::new(inner_to, inner_from),
          };
          Pending {
            edit: Edit {
              span: Span::new(from, to),
              text: format!("{left}{inner}{right}").into(),
            },
            caret: placed,
          }
        })
        .collect();
      apply_pending(buf, pending);
    },
  }

  HandlerOutcome::Handled
}

/// Merge an empty pair around every cursor into one deletion.
pub fn handle_backspace<B: Buffer + ?Sized>(buf: &mut B, config: &PairConfig) -> HandlerOutcome {
  let pairs: Vec<char> = config.pairs.chars().collect();
  let carets = buf.carets();

  for caret in &carets {
    if !caret.is_empty() {
      return HandlerOutcome::Pass;
    }
    let Some((before, after)) = chars_around(buf, caret.head) else {
      return HandlerOutcome::Pass;
    };
    let is_pair = pairs
      .chunks_exact(2)
      .any(|pair| pair[0] == before && pair[1] == after);
    if !is_pair {
      return HandlerOutcome::Pass;
    }
  }

  let pending = carets
    .iter()
    .map(|caret| {
      let cur = caret.head;
      Pending {
        edit:  Edit {
          span: Span::new(cur.with_col(cur.col - 1), cur.with_col(cur.col + 1)),
          text: crate::Tendril::new(),
        },
        caret: Caret::point(cur.with_col(cur.col - 1)),
      }
    })
    .collect();
  apply_pending(buf, pending);
  HandlerOutcome::Handled
}

/// Explode a configured pair around every cursor: a blank line goes in
/// between, and both the blank and the closing line are re-indented.
pub fn handle_enter<B: Buffer + ?Sized>(buf: &mut B, config: &PairConfig) -> HandlerOutcome {
  if config.explode.is_empty() {
    return HandlerOutcome::Pass;
  }
  let explode: Vec<char> = config.explode.chars().collect();
  let carets = buf.carets();

  for caret in &carets {
    if !caret.is_empty() {
      return HandlerOutcome::Pass;
    }
    let Some((before, after)) = chars_around(buf, caret.head) else {
      return HandlerOutcome::Pass;
    };
    let is_explodable = explode
      .chunks_exact(2)
      .any(|pair| pair[0] == before && pair[1] == after);
    if !is_explodable {
      return HandlerOutcome::Pass;
    }
  }

  let separator = buf.line_separator().to_string();
  let mut placed: Vec<(usize, Caret)> = Vec::with_capacity(carets.len());

  for (index, caret) in carets.iter().enumerate().rev() {
    let cur = caret.head;
    let edit = Edit::insert(cur, format!("{separator}{separator}"));
    buf.replace_range(&edit.text, cur, cur);
    for (_, placed_caret) in placed.iter_mut() {
      placed_caret.anchor = map_through(&edit, placed_caret.anchor);
      placed_caret.head = map_through(&edit, placed_caret.head);
    }

    let width = indent_and_remap(buf, cur.line + 1, &mut placed);
    indent_and_remap(buf, cur.line + 2, &mut placed);
    placed.push((index, Caret::point(Position::new(cur.line + 1, width))));
  }

  placed.sort_by_key(|(index, _)| *index);
  buf.set_carets(placed.into_iter().map(|(_, caret)| caret).collect());
  HandlerOutcome::Handled
}
