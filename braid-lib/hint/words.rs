//! Word-list completion: a supplied list, or words scanned from the buffer.

use braid_core::chars::char_is_word;

use crate::{
  buffer::Buffer,
  config::HintConfig,
  hint::{
    Hint,
    HintList,
    HintProvider,
  },
  position::Position,
};

/// The word-typed-so-far before `pos`, with the span start it replaces.
fn current_term(buf: &dyn Buffer, pos: Position) -> (String, Position) {
  let token = buf.token_at(pos);
  let typed = pos.col.saturating_sub(token.start);
  let last_typed_char = token.text.chars().nth(typed.wrapping_sub(1));
  if token.start < pos.col && last_typed_char.is_some_and(char_is_word) {
    (
      token.text.chars().take(typed).collect(),
      pos.with_col(token.start),
    )
  } else {
    (String::new(), pos)
  }
}

/// Prefix matcher over a fixed word list, in list order.
pub struct FromList {
  pub words: Vec<String>,
}

impl HintProvider for FromList {
  fn hints(&self, buf: &dyn Buffer, pos: Position, _config: &HintConfig) -> Option<HintList> {
    let (term, from) = current_term(buf, pos);
    let found: Vec<Hint> = self
      .words
      .iter()
      .filter(|word| word.starts_with(&term))
      .map(|word| Hint::new(word.clone()))
      .collect();

    (!found.is_empty()).then_some(HintList {
      list: found,
      from,
      to: pos,
    })
  }
}

/// Fallback matcher over words appearing in the buffer near the cursor,
/// top to bottom, deduplicated.
pub struct AnyWord {
  /// Lines scanned each way around the cursor.
  pub range:    usize,
  /// Words shorter than this are not offered.
  pub min_len:  usize,
}

impl Default for AnyWord {
  fn default() -> Self {
    Self {
      range:   500,
      min_len: 2,
    }
  }
}

impl HintProvider for AnyWord {
  fn hints(&self, buf: &dyn Buffer, pos: Position, _config: &HintConfig) -> Option<HintList> {
    let (term, from) = current_term(buf, pos);
    if term.is_empty() {
      return None;
    }

    let first = pos.line.saturating_sub(self.range);
    let last = (pos.line + self.range).min(buf.last_line());

    let mut found: Vec<Hint> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for line_no in first..=last {
      let Some(line) = buf.line(line_no) else {
        continue;
      };
      let mut word = String::new();
      for ch in line.chars().chain(std::iter::once(' ')) {
        if char_is_word(ch) {
          word.push(ch);
          continue;
        }
        // The word being typed is not a candidate for itself.
        let is_current = line_no == pos.line && word == term;
        if !is_current
          && word.len() >= self.min_len
          && word.starts_with(&term)
          && seen.insert(word.clone())
        {
          found.push(Hint::new(word.clone()));
        }
        word.clear();
      }
    }

    (!found.is_empty()).then_some(HintList {
      list: found,
      from,
      to: pos,
    })
  }
}

#[cfg(test)]
mod test {
  use smallvec::smallvec;

  use super::*;
  use crate::{
    buffer::{
      LineBuffer,
      PlainTokenizer,
    },
    position::Caret,
  };

  fn buf_at(text: &str, line: usize, col: usize) -> LineBuffer<PlainTokenizer> {
    let mut buf = LineBuffer::from_str(text);
    buf.set_carets(smallvec![Caret::point(Position::new(line, col))]);
    buf
  }

  fn texts(list: &HintList) -> Vec<&str> {
    list.list.iter().map(|hint| hint.text.as_str()).collect()
  }

  #[test]
  fn test_from_list_prefix_in_list_order() {
    let provider = FromList {
      words: ["foo", "foobar", "bar"]
        .iter()
        .map(|w| w.to_string())
        .collect(),
    };
    let buf = buf_at("foo", 0, 3);
    let list = provider
      .hints(&buf, Position::new(0, 3), &HintConfig::default())
      .unwrap();

    assert_eq!(texts(&list), vec!["foo", "foobar"]);
    assert_eq!(list.from, Position::new(0, 0));
    assert_eq!(list.to, Position::new(0, 3));
  }

  #[test]
  fn test_from_list_no_term_offers_everything() {
    let provider = FromList {
      words: ["alpha", "beta"].iter().map(|w| w.to_string()).collect(),
    };
    // Cursor after a space: empty term, insertion at the cursor.
    let buf = buf_at("x ", 0, 2);
    let list = provider
      .hints(&buf, Position::new(0, 2), &HintConfig::default())
      .unwrap();
    assert_eq!(texts(&list), vec!["alpha", "beta"]);
    assert_eq!(list.from, Position::new(0, 2));
  }

  #[test]
  fn test_from_list_no_matches_is_none() {
    let provider = FromList {
      words: vec!["bar".to_string()],
    };
    let buf = buf_at("foo", 0, 3);
    assert!(provider
      .hints(&buf, Position::new(0, 3), &HintConfig::default())
      .is_none());
  }

  #[test]
  fn test_any_word_scans_buffer() {
    let buf = buf_at("fortune favors\nthe formal fox\nfo", 2, 2);
    let provider = AnyWord::default();
    let list = provider
      .hints(&buf, Position::new(2, 2), &HintConfig::default())
      .unwrap();

    // Buffer order, deduplicated, prefix-matched.
    assert_eq!(texts(&list), vec!["fortune", "formal", "fox"]);
  }

  #[test]
  fn test_any_word_requires_a_term() {
    let buf = buf_at("words here\n ", 1, 1);
    assert!(AnyWord::default()
      .hints(&buf, Position::new(1, 1), &HintConfig::default())
      .is_none());
  }
}
