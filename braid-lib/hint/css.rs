//! Keyword completion for stylesheets.
//!
//! The relevant keyword set depends on where the cursor sits — selector
//! pseudo-class, property name, property value, or media query — which is
//! derived by scanning the text before the cursor (brace depth, the current
//! statement, the declaration colon) rather than from a stylesheet grammar.

use once_cell::sync::Lazy;

use crate::{
  buffer::{
    Buffer,
    ModeKind,
  },
  config::HintConfig,
  hint::{
    Hint,
    HintList,
    HintProvider,
  },
  position::Position,
};

pub static CSS_PSEUDO_CLASSES: &[&str] = &[
  "active",
  "after",
  "before",
  "checked",
  "disabled",
  "empty",
  "enabled",
  "first-child",
  "first-letter",
  "first-line",
  "first-of-type",
  "focus",
  "hover",
  "lang",
  "last-child",
  "last-of-type",
  "link",
  "not",
  "nth-child",
  "nth-of-type",
  "only-child",
  "root",
  "target",
  "visited",
];

pub static CSS_PROPERTIES: &[&str] = &[
  "align-content",
  "align-items",
  "align-self",
  "animation",
  "background",
  "background-color",
  "background-image",
  "background-position",
  "background-repeat",
  "background-size",
  "border",
  "border-bottom",
  "border-collapse",
  "border-color",
  "border-left",
  "border-radius",
  "border-right",
  "border-style",
  "border-top",
  "border-width",
  "bottom",
  "box-shadow",
  "box-sizing",
  "clear",
  "color",
  "content",
  "cursor",
  "display",
  "filter",
  "flex",
  "flex-basis",
  "flex-direction",
  "flex-grow",
  "flex-shrink",
  "flex-wrap",
  "float",
  "font",
  "font-family",
  "font-size",
  "font-style",
  "font-weight",
  "gap",
  "grid",
  "grid-area",
  "grid-column",
  "grid-row",
  "grid-template-columns",
  "grid-template-rows",
  "height",
  "justify-content",
  "left",
  "letter-spacing",
  "line-height",
  "list-style",
  "margin",
  "margin-bottom",
  "margin-left",
  "margin-right",
  "margin-top",
  "max-height",
  "max-width",
  "min-height",
  "min-width",
  "object-fit",
  "opacity",
  "order",
  "outline",
  "overflow",
  "overflow-x",
  "overflow-y",
  "padding",
  "padding-bottom",
  "padding-left",
  "padding-right",
  "padding-top",
  "position",
  "right",
  "text-align",
  "text-decoration",
  "text-overflow",
  "text-transform",
  "top",
  "transform",
  "transition",
  "vertical-align",
  "visibility",
  "white-space",
  "width",
  "word-break",
  "word-wrap",
  "z-index",
];

pub static CSS_VALUE_KEYWORDS: &[&str] = &[
  "absolute",
  "auto",
  "baseline",
  "block",
  "bold",
  "border-box",
  "both",
  "center",
  "column",
  "contain",
  "content-box",
  "cover",
  "ellipsis",
  "fixed",
  "flex",
  "flex-end",
  "flex-start",
  "grid",
  "hidden",
  "inherit",
  "initial",
  "inline",
  "inline-block",
  "inline-flex",
  "italic",
  "left",
  "lowercase",
  "middle",
  "none",
  "normal",
  "nowrap",
  "pointer",
  "relative",
  "right",
  "row",
  "scroll",
  "solid",
  "space-around",
  "space-between",
  "static",
  "sticky",
  "stretch",
  "underline",
  "uppercase",
  "visible",
  "wrap",
];

pub static CSS_COLOR_KEYWORDS: &[&str] = &[
  "aqua",
  "black",
  "blue",
  "currentColor",
  "fuchsia",
  "gray",
  "green",
  "lime",
  "maroon",
  "navy",
  "olive",
  "orange",
  "purple",
  "red",
  "silver",
  "teal",
  "transparent",
  "white",
  "yellow",
];

pub static CSS_MEDIA_TYPES: &[&str] = &["all", "print", "screen", "speech"];

pub static CSS_MEDIA_FEATURES: &[&str] = &[
  "aspect-ratio",
  "device-height",
  "device-width",
  "max-height",
  "max-width",
  "min-height",
  "min-width",
  "orientation",
  "prefers-color-scheme",
  "resolution",
];

static VALUE_CANDIDATES: Lazy<Vec<&'static str>> = Lazy::new(|| {
  CSS_VALUE_KEYWORDS
    .iter()
    .chain(CSS_COLOR_KEYWORDS.iter())
    .copied()
    .collect()
});

/// Where in a stylesheet the cursor sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CssState {
  Selector,
  Pseudo,
  Property,
  Value,
  Media,
}

fn css_word_char(ch: char) -> bool {
  ch.is_alphanumeric() || matches!(ch, '_' | '$' | '-')
}

/// Lines scanned backward when deriving the cursor's stylesheet state.
const STATE_SCAN_LINES: usize = 100;

fn css_state(buf: &dyn Buffer, pos: Position, word_start: usize) -> CssState {
  let mut depth: isize = 0;
  let mut in_string: Option<char> = None;
  let mut statement = String::new();

  let first = pos.line.saturating_sub(STATE_SCAN_LINES);
  for line_no in first..=pos.line {
    let Some(line) = buf.line(line_no) else {
      continue;
    };
    let upto = if line_no == pos.line {
      word_start
    } else {
      line.chars().count()
    };
    for ch in line.chars().take(upto) {
      if let Some(quote) = in_string {
        if ch == quote {
          in_string = None;
        }
        continue;
      }
      match ch {
        '"' | '\'' => in_string = Some(ch),
        '{' => {
          depth += 1;
          statement.clear();
        },
        '}' => {
          depth = depth.saturating_sub(1).max(0);
          statement.clear();
        },
        ';' => statement.clear(),
        _ => statement.push(ch),
      }
    }
    statement.push(' ');
  }

  let statement = statement.trim_start();
  if depth == 0 {
    if statement.starts_with("@media") {
      Media
    } else if statement.trim_end().ends_with(':') {
      Pseudo
    } else {
      Selector
    }
  } else if statement.contains(':') {
    Value
  } else {
    Property
  }
}

use CssState::*;

/// Stylesheet completion provider.
pub struct CssHint;

impl HintProvider for CssHint {
  fn hints(&self, buf: &dyn Buffer, pos: Position, _config: &HintConfig) -> Option<HintList> {
    if !matches!(buf.inner_mode_at(pos), ModeKind::Style | ModeKind::Plain) {
      return None;
    }

    let line = buf.line(pos.line)?;
    let chars: Vec<char> = line.chars().collect();
    let mut start = pos.col.min(chars.len());
    while start > 0 && css_word_char(chars[start - 1]) {
      start -= 1;
    }
    let word: String = chars[start..pos.col.min(chars.len())].iter().collect();

    // `!important` completes on its own, anywhere a value can appear.
    if start > 0 && chars[start - 1] == '!' {
      return "important".starts_with(&word).then_some(HintList {
        list: vec![Hint::new("!important")],
        from: Position::new(pos.line, start - 1),
        to:   Position::new(pos.line, pos.col),
      });
    }

    let candidates: Vec<&str> = match css_state(buf, pos, start) {
      Pseudo => CSS_PSEUDO_CLASSES.to_vec(),
      Property => CSS_PROPERTIES.to_vec(),
      Value => VALUE_CANDIDATES.clone(),
      Media => CSS_MEDIA_TYPES
        .iter()
        .chain(CSS_MEDIA_FEATURES.iter())
        .copied()
        .collect(),
      Selector => return None,
    };

    let found: Vec<Hint> = candidates
      .into_iter()
      .filter(|name| name.starts_with(&word))
      .map(Hint::new)
      .collect();

    (!found.is_empty()).then_some(HintList {
      list: found,
      from: Position::new(pos.line, start),
      to:   Position::new(pos.line, pos.col),
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
  fn test_property_completion_inside_block() {
    let buf = buf_at("body {\n  font-si", 1, 10);
    let list = CssHint
      .hints(&buf, Position::new(1, 10), &HintConfig::default())
      .unwrap();
    assert_eq!(texts(&list), vec!["font-size"]);
    assert_eq!(list.from, Position::new(1, 2));
  }

  #[test]
  fn test_value_completion_after_colon() {
    let buf = buf_at("body { display: in", 0, 18);
    let list = CssHint
      .hints(&buf, Position::new(0, 18), &HintConfig::default())
      .unwrap();
    assert_eq!(
      texts(&list),
      vec!["inherit", "initial", "inline", "inline-block", "inline-flex"]
    );
  }

  #[test]
  fn test_color_keywords_offered_as_values() {
    let buf = buf_at("a { color: re", 0, 13);
    let list = CssHint
      .hints(&buf, Position::new(0, 13), &HintConfig::default())
      .unwrap();
    assert!(texts(&list).contains(&"red"));
    assert!(texts(&list).contains(&"relative"));
  }

  #[test]
  fn test_pseudo_class_after_selector_colon() {
    let buf = buf_at("a:ho", 0, 4);
    let list = CssHint
      .hints(&buf, Position::new(0, 4), &HintConfig::default())
      .unwrap();
    assert_eq!(texts(&list), vec!["hover"]);
  }

  #[test]
  fn test_media_query_completion() {
    let buf = buf_at("@media scr", 0, 10);
    let list = CssHint
      .hints(&buf, Position::new(0, 10), &HintConfig::default())
      .unwrap();
    assert_eq!(texts(&list), vec!["screen"]);
  }

  #[test]
  fn test_important_completion() {
    let buf = buf_at("a { color: red !imp", 0, 19);
    let list = CssHint
      .hints(&buf, Position::new(0, 19), &HintConfig::default())
      .unwrap();
    assert_eq!(texts(&list), vec!["!important"]);
    assert_eq!(list.from, Position::new(0, 15));
  }

  #[test]
  fn test_bare_selector_offers_nothing() {
    let buf = buf_at("bod", 0, 3);
    assert!(CssHint
      .hints(&buf, Position::new(0, 3), &HintConfig::default())
      .is_none());
  }
}
