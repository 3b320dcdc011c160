//! Character classification used by the scanning and completion code.

#[derive(Debug, Eq, PartialEq)]
pub enum CharCategory {
  Whitespace,
  Eol,
  Word,
  Punctuation,
  Unknown,
}

pub fn categorize_char(ch: char) -> CharCategory {
  match ch {
    c if char_is_line_ending(c) => CharCategory::Eol,
    c if c.is_whitespace() => CharCategory::Whitespace,
    c if char_is_word(c) => CharCategory::Word,
    c if char_is_punctuation(c) => CharCategory::Punctuation,
    _ => CharCategory::Unknown,
  }
}

#[inline]
pub fn char_is_line_ending(ch: char) -> bool {
  matches!(ch, '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}')
}

#[inline]
pub fn char_is_punctuation(ch: char) -> bool {
  use unicode_general_category::{
    GeneralCategory,
    get_general_category,
  };

  matches!(
    get_general_category(ch),
    GeneralCategory::OtherPunctuation
      | GeneralCategory::OpenPunctuation
      | GeneralCategory::ClosePunctuation
      | GeneralCategory::InitialPunctuation
      | GeneralCategory::FinalPunctuation
      | GeneralCategory::ConnectorPunctuation
      | GeneralCategory::DashPunctuation
      | GeneralCategory::MathSymbol
      | GeneralCategory::CurrencySymbol
      | GeneralCategory::ModifierSymbol
  )
}

#[inline]
pub fn char_is_word(ch: char) -> bool {
  ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// The bracket characters the default scanner tracks.
pub const BRACKETS: &[(char, char)] = &[('(', ')'), ('[', ']'), ('{', '}'), ('<', '>')];

#[inline]
pub fn char_is_open_bracket(ch: char) -> bool {
  BRACKETS.iter().any(|&(open, _)| open == ch)
}

#[inline]
pub fn char_is_close_bracket(ch: char) -> bool {
  BRACKETS.iter().any(|&(_, close)| close == ch)
}

/// Returns the partner of a bracket character, if it is one.
pub fn bracket_partner(ch: char) -> Option<char> {
  BRACKETS
    .iter()
    .find_map(|&(open, close)| match ch {
      c if c == open => Some(close),
      c if c == close => Some(open),
      _ => None,
    })
}

/// Characters permitted to start an XML/HTML tag or attribute name.
///
/// Mirrors the NameStartChar production from the XML specification, minus
/// the colon (kept as a name-continue character only, matching what markup
/// editors accept in practice).
#[inline]
pub fn char_is_xml_name_start(ch: char) -> bool {
  matches!(ch,
    'A'..='Z'
    | '_'
    | 'a'..='z'
    | '\u{C0}'..='\u{D6}'
    | '\u{D8}'..='\u{F6}'
    | '\u{F8}'..='\u{2FF}'
    | '\u{370}'..='\u{37D}'
    | '\u{37F}'..='\u{1FFF}'
    | '\u{200C}'..='\u{200D}'
    | '\u{2070}'..='\u{218F}'
    | '\u{2C00}'..='\u{2FEF}'
    | '\u{3001}'..='\u{D7FF}'
    | '\u{F900}'..='\u{FDCF}'
    | '\u{FDF0}'..='\u{FFFD}')
}

/// Characters permitted inside an XML/HTML tag or attribute name.
#[inline]
pub fn char_is_xml_name(ch: char) -> bool {
  char_is_xml_name_start(ch)
    || matches!(ch,
      '-'
      | ':'
      | '.'
      | '0'..='9'
      | '\u{B7}'
      | '\u{300}'..='\u{36F}'
      | '\u{203F}'..='\u{2040}')
}
