//! Direction-aware delimiter scanning.
//!
//! [`scan_for_bracket`] walks the buffer line by line looking for the
//! counterpart of a delimiter, tracking nesting with an explicit stack. The
//! walk is budgeted: lines longer than the configured ceiling are skipped as
//! unscannable, and the whole scan gives up after a configured number of
//! lines. The three-valued [`ScanOutcome`] keeps "definitively absent"
//! (buffer boundary reached) apart from "inconclusive" (budget exceeded) —
//! callers must not render the latter as a confirmed miss.
//!
//! [`find_matching_bracket`] is the cursor-level entry: it picks the bracket
//! beside the cursor, applies the style filter from the origin token (so a
//! bracket in code never pairs with one in a string), and reports the
//! counterpart with a matched/mismatched verdict.

use braid_core::chars::{
  bracket_partner,
  char_is_open_bracket,
};

use crate::{
  buffer::Buffer,
  config::{
    CursorSide,
    MatchConfig,
    ScanConfig,
  },
  position::{
    Position,
    Span,
  },
};

/// The direction of a scan through the buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
  Forward,
  Backward,
}

impl Direction {
  fn step(self) -> isize {
    match self {
      Direction::Forward => 1,
      Direction::Backward => -1,
    }
  }
}

/// A delimiter found by a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketHit {
  pub pos: Position,
  pub ch:  char,
}

/// Result of one directional scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
  Found(BracketHit),
  /// The buffer boundary was reached: there is definitively no counterpart.
  Exhausted,
  /// The line budget ran out first: inconclusive, not a confirmed absence.
  GaveUp,
}

impl ScanOutcome {
  pub fn found(self) -> Option<BracketHit> {
    match self {
      ScanOutcome::Found(hit) => Some(hit),
      _ => None,
    }
  }

  /// Whether the scan settled the question either way.
  pub fn is_conclusive(&self) -> bool {
    !matches!(self, ScanOutcome::GaveUp)
  }
}

/// A resolved bracket-match query.
///
/// `to: None` means the scan exhausted the buffer without a counterpart.
/// `matched: false` with `to: Some` means a counterpart of the wrong type
/// was found — callers style it as an error rather than dropping it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketMatch {
  pub from:    Span,
  pub to:      Option<Span>,
  pub matched: bool,
  pub forward: bool,
}

/// Does `ch` increase nesting when scanning in `dir`?
fn advances_nesting(ch: char, dir: Direction) -> bool {
  match dir {
    Direction::Forward => char_is_open_bracket(ch),
    Direction::Backward => bracket_partner(ch).is_some() && !char_is_open_bracket(ch),
  }
}

/// Scan from `from` in `dir` for the first delimiter that closes the current
/// nesting level.
///
/// The character at `from` itself is not examined when scanning forward from
/// an opening bracket — start the scan one past it, as
/// [`find_matching_bracket`] does. When `style` is given, only characters
/// whose token kind equals it count; everything else is passed over, which
/// keeps brackets inside strings and comments out of code-level matches.
pub fn scan_for_bracket<B: Buffer + ?Sized>(
  buf: &B,
  from: Position,
  dir: Direction,
  style: Option<crate::buffer::TokenKind>,
  config: &ScanConfig,
) -> ScanOutcome {
  if from.line >= buf.line_count() {
    return ScanOutcome::Exhausted;
  }

  let mut stack: Vec<char> = Vec::new();
  let step = dir.step();
  let last = buf.last_line() as isize;

  let line_end: isize = match dir {
    Direction::Forward => ((from.line + config.max_scan_lines) as isize).min(last + 1),
    Direction::Backward => (from.line as isize - config.max_scan_lines as isize).max(-1),
  };

  let mut line_no = from.line as isize;
  while line_no != line_end {
    let Some(line) = buf.line(line_no as usize) else {
      line_no += step;
      continue;
    };
    let chars: Vec<char> = line.chars().collect();
    if chars.len() > config.max_scan_line_len {
      // Unscannable, not an error: move on.
      line_no += step;
      continue;
    }

    let end: isize = match dir {
      Direction::Forward => chars.len() as isize,
      Direction::Backward => -1,
    };
    let mut pos: isize = match dir {
      Direction::Forward => 0,
      Direction::Backward => chars.len() as isize - 1,
    };
    if line_no as usize == from.line {
      pos = from.col as isize
        - match dir {
          Direction::Forward => 0,
          Direction::Backward => 1,
        };
      pos = match dir {
        Direction::Forward => pos.min(end),
        Direction::Backward => pos.max(end),
      };
    }

    while pos != end {
      let ch = chars[pos as usize];
      if config.brackets.contains(ch)
        && (style.is_none()
          || buf.token_kind_at(Position::new(line_no as usize, pos as usize)) == style)
      {
        if advances_nesting(ch, dir) {
          stack.push(ch);
        } else if stack.is_empty() {
          return ScanOutcome::Found(BracketHit {
            pos: Position::new(line_no as usize, pos as usize),
            ch,
          });
        } else {
          stack.pop();
        }
      }
      pos += step;
    }

    line_no += step;
  }

  let hit_boundary = match dir {
    Direction::Forward => line_no - 1 == last,
    Direction::Backward => line_no + 1 == 0,
  };
  if hit_boundary {
    ScanOutcome::Exhausted
  } else {
    tracing::trace!(
      line = from.line,
      budget = config.max_scan_lines,
      "bracket scan gave up"
    );
    ScanOutcome::GaveUp
  }
}

/// Resolve the bracket beside the cursor to its counterpart.
///
/// Returns `None` when no bracket sits beside the cursor or when the scan
/// was inconclusive ([`ScanOutcome::GaveUp`]) — an inconclusive scan
/// suppresses rendering instead of degrading to "no match".
pub fn find_matching_bracket<B: Buffer + ?Sized>(
  buf: &B,
  at: Position,
  config: &MatchConfig,
) -> Option<BracketMatch> {
  let line = buf.line(at.line)?;
  let chars: Vec<char> = line.chars().collect();
  let after_cursor = config.cursor_side == CursorSide::After;

  let is_target = |i: isize| -> bool {
    i >= 0
      && (i as usize) < chars.len()
      && config.scan.brackets.contains(chars[i as usize])
      && bracket_partner(chars[i as usize]).is_some()
  };

  // The cursor sits between two characters; prefer the one before it unless
  // a fat-cursor convention says the cursor covers the one after.
  let mut pos = at.col as isize - 1;
  if !(!after_cursor && is_target(pos)) {
    pos += 1;
    if !is_target(pos) {
      return None;
    }
  }

  let ch = chars[pos as usize];
  let forward = char_is_open_bracket(ch);
  let dir = if forward {
    Direction::Forward
  } else {
    Direction::Backward
  };

  // Strict mode: only match when the cursor is on the outside of the
  // bracket (before an opener, after a closer).
  if config.strict && forward != (pos as usize == at.col) {
    return None;
  }

  let style = buf.token_kind_at(Position::new(at.line, pos as usize));
  let scan_from = Position::new(at.line, (pos + if forward { 1 } else { 0 }) as usize);
  let from = Span::char_at(Position::new(at.line, pos as usize));

  match scan_for_bracket(buf, scan_from, dir, style, &config.scan) {
    ScanOutcome::GaveUp => None,
    ScanOutcome::Exhausted => Some(BracketMatch {
      from,
      to: None,
      matched: false,
      forward,
    }),
    ScanOutcome::Found(hit) => Some(BracketMatch {
      from,
      to: Some(Span::char_at(hit.pos)),
      matched: Some(hit.ch) == bracket_partner(ch),
      forward,
    }),
  }
}
