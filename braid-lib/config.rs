//! Layered behavior configuration.
//!
//! Each behavior has one fully-resolved `*Config` struct and a matching
//! `*Overlay` with optional fields. Resolution is explicit: defaults, then a
//! mode-level overlay, then a call-site overlay, producing a single struct
//! per query instead of property lookups scattered through the handlers.
//! Overlays deserialize from TOML so hosts can ship mode profiles as config
//! files.

use serde::Deserialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
  #[error("failed to parse profile overlay")]
  Parse(#[from] toml::de::Error),
}

/// Which side of the cursor a delimiter sitting exactly at it belongs to.
///
/// `Before` is the plain-text-cursor convention; hosts drawing a fat/block
/// cursor over the following character use `After`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorSide {
  Before,
  After,
}

/// Budgets and target set for delimiter scans.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
  /// Lines examined before the scan reports an inconclusive `GaveUp`.
  pub max_scan_lines:    usize,
  /// Lines longer than this are skipped as unscannable.
  pub max_scan_line_len: usize,
  /// The delimiter characters the scan tracks.
  pub brackets:          String,
}

impl Default for ScanConfig {
  fn default() -> Self {
    Self {
      max_scan_lines:    1_000,
      max_scan_line_len: 10_000,
      brackets:          "()[]{}".to_string(),
    }
  }
}

/// Bracket match lookup and highlight behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
  pub scan:                   ScanConfig,
  /// Only match when the cursor sits on the outside of the bracket.
  pub strict:                 bool,
  pub cursor_side:            CursorSide,
  /// Lines longer than this are not highlighted at all.
  pub max_highlight_line_len: usize,
  /// How long transient-mode marks linger before the host clears them.
  pub clear_after_ms:         u64,
}

impl Default for MatchConfig {
  fn default() -> Self {
    Self {
      scan:                   ScanConfig::default(),
      strict:                 false,
      cursor_side:            CursorSide::Before,
      max_highlight_line_len: 1_000,
      clear_after_ms:         800,
    }
  }
}

/// Bracket pairing behavior. The pair strings hold open/close characters in
/// adjacent positions: `"()[]{}"` pairs `(` with `)` and so on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PairConfig {
  pub pairs:        String,
  /// Characters a closer may be typed directly before.
  pub close_before: String,
  /// Characters with triple-run (docstring-style) handling.
  pub triples:      String,
  /// Pairs Enter explodes into an indented blank line.
  pub explode:      String,
}

impl Default for PairConfig {
  fn default() -> Self {
    Self {
      pairs:        "()[]{}''\"\"".to_string(),
      close_before: ")]}'\":;>".to_string(),
      triples:      String::new(),
      explode:      "[]{}".to_string(),
    }
  }
}

/// Tag auto-closing behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CloseTagConfig {
  /// Close when the final `>` of an opening tag is typed.
  pub when_opening:    bool,
  /// Close when the `/` of a closing tag is typed.
  pub when_closing:    bool,
  /// Tag names never auto-closed (void elements).
  pub dont_close:      Vec<String>,
  /// Tag names that get a blank indented line inside when opened.
  pub indent_tags:     Vec<String>,
  /// Tag names closed in place with `/>`.
  pub empty_tags:      Vec<String>,
  pub indent_on_close: bool,
  pub indent_on_slash: bool,
}

impl Default for CloseTagConfig {
  fn default() -> Self {
    Self {
      when_opening:    true,
      when_closing:    true,
      dont_close:      crate::close_tag::HTML_DONT_CLOSE
        .iter()
        .map(|s| s.to_string())
        .collect(),
      indent_tags:     crate::close_tag::HTML_INDENT
        .iter()
        .map(|s| s.to_string())
        .collect(),
      empty_tags:      Vec::new(),
      indent_on_close: true,
      indent_on_slash: true,
    }
  }
}

/// Completion session behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HintConfig {
  /// Apply immediately when exactly one candidate is found.
  pub complete_single:  bool,
  /// Substring instead of prefix candidate matching.
  pub match_in_middle:  bool,
  /// Characters that close the session when typed (whitespace always does).
  pub close_characters: String,
  /// Quote used when completing attribute values.
  pub quote:            char,
}

impl Default for HintConfig {
  fn default() -> Self {
    Self {
      complete_single:  true,
      match_in_middle:  false,
      close_characters: "()[]{};:>,".to_string(),
      quote:            '"',
    }
  }
}

impl HintConfig {
  pub fn is_close_char(&self, ch: char) -> bool {
    ch.is_whitespace() || self.close_characters.contains(ch)
  }
}

macro_rules! overlay {
  ($name:ident over $config:ident { $($field:ident: $ty:ty),* $(,)? }) => {
    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    #[serde(default)]
    pub struct $name {
      $(pub $field: Option<$ty>,)*
    }

    impl $name {
      pub fn apply(&self, config: &mut $config) {
        $(
          if let Some(value) = &self.$field {
            config.$field = value.clone();
          }
        )*
      }
    }
  };
}

overlay!(ScanOverlay over ScanConfig {
  max_scan_lines: usize,
  max_scan_line_len: usize,
  brackets: String,
});

overlay!(MatchOverlay over MatchConfig {
  scan: ScanConfig,
  strict: bool,
  cursor_side: CursorSide,
  max_highlight_line_len: usize,
  clear_after_ms: u64,
});

overlay!(PairOverlay over PairConfig {
  pairs: String,
  close_before: String,
  triples: String,
  explode: String,
});

overlay!(CloseTagOverlay over CloseTagConfig {
  when_opening: bool,
  when_closing: bool,
  dont_close: Vec<String>,
  indent_tags: Vec<String>,
  empty_tags: Vec<String>,
  indent_on_close: bool,
  indent_on_slash: bool,
});

overlay!(HintOverlay over HintConfig {
  complete_single: bool,
  match_in_middle: bool,
  close_characters: String,
  quote: char,
});

/// All behaviors, fully resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
  pub matching:  MatchConfig,
  pub pairs:     PairConfig,
  pub close_tag: CloseTagConfig,
  pub hint:      HintConfig,
}

/// One layer of settings, everything optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProfileOverlay {
  pub matching:  MatchOverlay,
  pub pairs:     PairOverlay,
  pub close_tag: CloseTagOverlay,
  pub hint:      HintOverlay,
}

impl ProfileOverlay {
  pub fn from_toml_str(text: &str) -> Result<Self> {
    Ok(toml::from_str(text)?)
  }
}

impl Profile {
  /// Resolve defaults through the given layers, first to last — later
  /// layers win.
  pub fn resolve(layers: &[&ProfileOverlay]) -> Self {
    let mut profile = Profile::default();
    for layer in layers {
      layer.matching.apply(&mut profile.matching);
      layer.pairs.apply(&mut profile.pairs);
      layer.close_tag.apply(&mut profile.close_tag);
      layer.hint.apply(&mut profile.hint);
    }
    profile
  }
}
