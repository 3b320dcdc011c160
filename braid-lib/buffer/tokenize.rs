//! Line tokenizers for the reference buffer.
//!
//! These are deliberately small: enough classification for the matching and
//! completion code to be exercised (tag structure, attribute strings,
//! script islands, property chains), not syntax highlighting. A host with a
//! real tokenizer implements [`crate::buffer::Buffer`] against it instead.

use braid_core::chars::{
  char_is_word,
  char_is_xml_name,
  char_is_xml_name_start,
};

use crate::buffer::{
  ModeKind,
  Token,
  TokenKind,
};

/// Splits one line into contiguous tokens, threading `State` across lines so
/// multi-line constructs (attribute strings, script islands, tag heads)
/// classify correctly.
pub trait Tokenizer {
  type State: Default + Clone;

  fn tokens(&self, line: &str, state: &mut Self::State) -> Vec<Token>;

  /// Which language governs column `col`, given the state at line start.
  fn mode_at(&self, _line: &str, _col: usize, _state: &Self::State) -> ModeKind {
    ModeKind::Plain
  }
}

/// Words, whitespace, and single-character punctuation. No memory.
#[derive(Debug, Default, Clone)]
pub struct PlainTokenizer;

impl Tokenizer for PlainTokenizer {
  type State = ();

  fn tokens(&self, line: &str, _state: &mut ()) -> Vec<Token> {
    let chars: Vec<char> = line.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
      let start = i;
      let ch = chars[i];
      if char_is_word(ch) {
        while i < chars.len() && char_is_word(chars[i]) {
          i += 1;
        }
        out.push(token(&chars, start, i, Some(TokenKind::Word)));
      } else if ch.is_whitespace() {
        while i < chars.len() && chars[i].is_whitespace() {
          i += 1;
        }
        out.push(token(&chars, start, i, None));
      } else {
        i += 1;
        out.push(token(&chars, start, i, Some(TokenKind::Punctuation)));
      }
    }
    out
  }
}

fn token(chars: &[char], start: usize, end: usize, kind: Option<TokenKind>) -> Token {
  Token {
    text: chars[start..end].iter().collect(),
    start,
    end,
    kind,
  }
}

/// Where a markup tokenizer is, carried across lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MarkupCtx {
  #[default]
  Text,
  /// Inside a tag head (`<name ...` up to the closing `>`).
  TagHead {
    closing:   bool,
    name:      String,
    seen_name: bool,
  },
  /// Inside a quoted attribute value.
  AttrString { quote: char, closing: bool, name: String },
  /// Inside the content of a `<script>`/`<style>` element.
  Island { mode_is_style: bool },
}

pub type MarkupState = MarkupCtx;

/// XML/HTML-ish tokenizer: tag punctuation and names get [`TokenKind::Tag`],
/// attribute names [`TokenKind::Attribute`], quoted values
/// [`TokenKind::String`]; `<script>`/`<style>` content becomes a script or
/// style island reported through [`Tokenizer::mode_at`].
#[derive(Debug, Default, Clone)]
pub struct MarkupTokenizer;

impl MarkupTokenizer {
  fn island_close(chars: &[char], i: usize, style: bool) -> bool {
    let name = if style { "style" } else { "script" };
    let mut j = i;
    if chars.get(j) != Some(&'<') || chars.get(j + 1) != Some(&'/') {
      return false;
    }
    j += 2;
    for want in name.chars() {
      match chars.get(j) {
        Some(c) if c.eq_ignore_ascii_case(&want) => j += 1,
        _ => return false,
      }
    }
    !matches!(chars.get(j), Some(c) if char_is_xml_name(*c))
  }
}

impl Tokenizer for MarkupTokenizer {
  type State = MarkupState;

  fn tokens(&self, line: &str, state: &mut MarkupState) -> Vec<Token> {
    let chars: Vec<char> = line.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
      let start = i;
      match state.clone() {
        MarkupCtx::Text => {
          let ch = chars[i];
          if ch == '<' {
            if chars.get(i + 1) == Some(&'/')
              && matches!(chars.get(i + 2), Some(c) if char_is_xml_name_start(*c))
            {
              i += 2;
              *state = MarkupCtx::TagHead {
                closing:   true,
                name:      String::new(),
                seen_name: false,
              };
            } else if matches!(chars.get(i + 1), Some(c) if char_is_xml_name_start(*c)) {
              i += 1;
              *state = MarkupCtx::TagHead {
                closing:   false,
                name:      String::new(),
                seen_name: false,
              };
            } else if chars.get(i + 1) == Some(&'/') && chars.get(i + 2).is_none() {
              // A tag being typed: `</` at the end of the line.
              i += 2;
              out.push(token(&chars, start, i, Some(TokenKind::Tag)));
              continue;
            } else if chars.get(i + 1).is_none() {
              // Likewise a lone trailing `<`.
              i += 1;
              out.push(token(&chars, start, i, Some(TokenKind::Tag)));
              continue;
            } else {
              i += 1;
              out.push(token(&chars, start, i, Some(TokenKind::Punctuation)));
              continue;
            }
            out.push(token(&chars, start, i, Some(TokenKind::Tag)));
          } else if char_is_word(ch) {
            while i < chars.len() && char_is_word(chars[i]) {
              i += 1;
            }
            out.push(token(&chars, start, i, Some(TokenKind::Word)));
          } else if ch.is_whitespace() {
            while i < chars.len() && chars[i].is_whitespace() {
              i += 1;
            }
            out.push(token(&chars, start, i, None));
          } else {
            i += 1;
            out.push(token(&chars, start, i, Some(TokenKind::Punctuation)));
          }
        },

        MarkupCtx::TagHead {
          closing,
          name,
          seen_name,
        } => {
          let ch = chars[i];
          if ch.is_whitespace() {
            while i < chars.len() && chars[i].is_whitespace() {
              i += 1;
            }
            out.push(token(&chars, start, i, None));
          } else if ch == '>' {
            i += 1;
            out.push(token(&chars, start, i, Some(TokenKind::Tag)));
            let lower = name.to_ascii_lowercase();
            *state = if !closing && (lower == "script" || lower == "style") {
              MarkupCtx::Island {
                mode_is_style: lower == "style",
              }
            } else {
              MarkupCtx::Text
            };
          } else if ch == '/' && chars.get(i + 1) == Some(&'>') {
            i += 2;
            out.push(token(&chars, start, i, Some(TokenKind::Tag)));
            *state = MarkupCtx::Text;
          } else if ch == '/' {
            i += 1;
            out.push(token(&chars, start, i, Some(TokenKind::Tag)));
          } else if ch == '=' {
            i += 1;
            out.push(token(&chars, start, i, Some(TokenKind::Punctuation)));
          } else if ch == '"' || ch == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != ch {
              i += 1;
            }
            if i < chars.len() {
              i += 1;
              out.push(token(&chars, start, i, Some(TokenKind::String)));
            } else {
              out.push(token(&chars, start, i, Some(TokenKind::String)));
              *state = MarkupCtx::AttrString {
                quote: ch,
                closing,
                name,
              };
            }
          } else if char_is_xml_name_start(ch) || char_is_xml_name(ch) {
            while i < chars.len() && char_is_xml_name(chars[i]) {
              i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            if !seen_name {
              out.push(token(&chars, start, i, Some(TokenKind::Tag)));
              *state = MarkupCtx::TagHead {
                closing,
                name: text,
                seen_name: true,
              };
            } else {
              out.push(token(&chars, start, i, Some(TokenKind::Attribute)));
            }
          } else {
            i += 1;
            out.push(token(&chars, start, i, Some(TokenKind::Punctuation)));
          }
        },

        MarkupCtx::AttrString {
          quote,
          closing,
          name,
        } => {
          while i < chars.len() && chars[i] != quote {
            i += 1;
          }
          if i < chars.len() {
            i += 1;
            *state = MarkupCtx::TagHead {
              closing,
              name,
              seen_name: true,
            };
          }
          out.push(token(&chars, start, i, Some(TokenKind::String)));
        },

        MarkupCtx::Island { mode_is_style } => {
          if Self::island_close(&chars, i, mode_is_style) {
            i += 2;
            out.push(token(&chars, start, i, Some(TokenKind::Tag)));
            *state = MarkupCtx::TagHead {
              closing:   true,
              name:      String::new(),
              seen_name: false,
            };
          } else if chars[i] == '"' || chars[i] == '\'' {
            let quote = chars[i];
            i += 1;
            while i < chars.len() && chars[i] != quote {
              i += 1;
            }
            if i < chars.len() {
              i += 1;
            }
            out.push(token(&chars, start, i, Some(TokenKind::String)));
          } else if char_is_word(chars[i]) {
            while i < chars.len() && char_is_word(chars[i]) {
              i += 1;
            }
            out.push(token(&chars, start, i, Some(TokenKind::Word)));
          } else if chars[i].is_whitespace() {
            while i < chars.len() && chars[i].is_whitespace() {
              i += 1;
            }
            out.push(token(&chars, start, i, None));
          } else {
            i += 1;
            out.push(token(&chars, start, i, Some(TokenKind::Punctuation)));
          }
        },
      }
    }

    out
  }

  fn mode_at(&self, line: &str, col: usize, state: &MarkupState) -> ModeKind {
    // Re-run the machine up to `col` and read off the context.
    let mut scratch = state.clone();
    let prefix: String = line.chars().take(col).collect();
    self.tokens(&prefix, &mut scratch);
    match scratch {
      MarkupCtx::Island { mode_is_style: true } => ModeKind::Style,
      MarkupCtx::Island { mode_is_style: false } => ModeKind::Script,
      _ => ModeKind::Markup,
    }
  }
}

/// Script-ish tokenizer for the identifier/property completion paths:
/// strings, comments, numbers, keywords, atoms, and `.`-chained properties.
#[derive(Debug, Default, Clone)]
pub struct ScriptTokenizer;

/// Carries block comments and unterminated strings across lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScriptState {
  #[default]
  Code,
  BlockComment,
  InString { quote: char },
}

const SCRIPT_ATOMS: &[&str] = &["true", "false", "null", "undefined", "NaN", "Infinity"];

impl Tokenizer for ScriptTokenizer {
  type State = ScriptState;

  fn tokens(&self, line: &str, state: &mut ScriptState) -> Vec<Token> {
    let chars: Vec<char> = line.chars().collect();
    let mut out: Vec<Token> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
      let start = i;
      match state.clone() {
        ScriptState::BlockComment => {
          while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
            i += 1;
          }
          if i < chars.len() {
            i += 2;
            *state = ScriptState::Code;
          }
          out.push(token(&chars, start, i, Some(TokenKind::Comment)));
        },
        ScriptState::InString { quote } => {
          while i < chars.len() && chars[i] != quote {
            if chars[i] == '\\' {
              i += 1;
            }
            i += 1;
          }
          if i < chars.len() {
            i += 1;
            *state = ScriptState::Code;
          }
          out.push(token(&chars, start, i.min(chars.len()), Some(TokenKind::String)));
        },
        ScriptState::Code => {
          let ch = chars[i];
          if ch == '/' && chars.get(i + 1) == Some(&'/') {
            i = chars.len();
            out.push(token(&chars, start, i, Some(TokenKind::Comment)));
          } else if ch == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            *state = ScriptState::BlockComment;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
              i += 1;
            }
            if i < chars.len() {
              i += 2;
              *state = ScriptState::Code;
            }
            out.push(token(&chars, start, i.min(chars.len()), Some(TokenKind::Comment)));
          } else if ch == '"' || ch == '\'' || ch == '`' {
            i += 1;
            while i < chars.len() && chars[i] != ch {
              if chars[i] == '\\' {
                i += 1;
              }
              i += 1;
            }
            if i < chars.len() {
              i += 1;
            } else {
              *state = ScriptState::InString { quote: ch };
            }
            out.push(token(&chars, start, i.min(chars.len()), Some(TokenKind::String)));
          } else if ch.is_ascii_digit() {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
              i += 1;
            }
            out.push(token(&chars, start, i, Some(TokenKind::Number)));
          } else if char_is_word(ch) {
            while i < chars.len() && char_is_word(chars[i]) {
              i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let after_dot = out
              .iter()
              .rev()
              .find(|t| !t.text.trim().is_empty())
              .is_some_and(|t| t.text == ".");
            let kind = if crate::hint::script::JAVASCRIPT_KEYWORDS.contains(&text.as_str()) {
              TokenKind::Keyword
            } else if SCRIPT_ATOMS.contains(&text.as_str()) {
              TokenKind::Atom
            } else if after_dot {
              TokenKind::Property
            } else {
              TokenKind::Variable
            };
            out.push(token(&chars, start, i, Some(kind)));
          } else if ch.is_whitespace() {
            while i < chars.len() && chars[i].is_whitespace() {
              i += 1;
            }
            out.push(token(&chars, start, i, None));
          } else {
            i += 1;
            out.push(token(&chars, start, i, Some(TokenKind::Punctuation)));
          }
        },
      }
    }

    out
  }

  fn mode_at(&self, _line: &str, _col: usize, _state: &ScriptState) -> ModeKind {
    ModeKind::Script
  }
}
