//! Keyword and property-chain completion for script-like languages.
//!
//! Walks the chain of `.`-qualified property accesses to the left of the
//! cursor and resolves it against a supplied [`Namespace`] value tree; with
//! no chain it offers locals, the namespace's top level, and the keyword
//! list. Built-in property sets cover string/array/function values the way
//! a dynamic-language runtime exposes them.

use std::collections::BTreeMap;

use braid_core::chars::char_is_word;

use crate::{
  buffer::{
    Buffer,
    ModeKind,
    Token,
    TokenKind,
  },
  config::HintConfig,
  hint::{
    Hint,
    HintList,
    HintProvider,
  },
  position::Position,
};

pub static JAVASCRIPT_KEYWORDS: &[&str] = &[
  "break",
  "case",
  "catch",
  "class",
  "const",
  "continue",
  "debugger",
  "default",
  "delete",
  "do",
  "else",
  "export",
  "extends",
  "false",
  "finally",
  "for",
  "function",
  "if",
  "in",
  "import",
  "instanceof",
  "new",
  "null",
  "return",
  "super",
  "switch",
  "this",
  "throw",
  "true",
  "try",
  "typeof",
  "var",
  "void",
  "while",
  "with",
  "yield",
];

const STRING_PROPS: &[&str] = &[
  "charAt",
  "charCodeAt",
  "indexOf",
  "lastIndexOf",
  "substring",
  "substr",
  "slice",
  "trim",
  "toUpperCase",
  "toLowerCase",
  "split",
  "concat",
  "match",
  "replace",
  "search",
];

const ARRAY_PROPS: &[&str] = &[
  "length",
  "concat",
  "join",
  "splice",
  "push",
  "pop",
  "shift",
  "unshift",
  "slice",
  "reverse",
  "sort",
  "indexOf",
  "lastIndexOf",
  "every",
  "some",
  "filter",
  "forEach",
  "map",
  "reduce",
  "reduceRight",
];

const FUNC_PROPS: &[&str] = &["prototype", "apply", "call", "bind"];

/// A value in the completion namespace.
#[derive(Debug, Clone)]
pub enum NsValue {
  Object(BTreeMap<String, NsValue>),
  Str,
  Array,
  Func,
  Num,
  Bool,
  Null,
}

impl NsValue {
  pub fn object<S: Into<String>>(entries: impl IntoIterator<Item = (S, NsValue)>) -> Self {
    NsValue::Object(
      entries
        .into_iter()
        .map(|(name, value)| (name.into(), value))
        .collect(),
    )
  }

  fn property(&self, name: &str) -> Option<&NsValue> {
    match self {
      NsValue::Object(map) => map.get(name),
      _ => None,
    }
  }

  fn gather(&self, into: &mut dyn FnMut(&str)) {
    match self {
      NsValue::Str => STRING_PROPS.iter().for_each(|p| into(p)),
      NsValue::Array => ARRAY_PROPS.iter().for_each(|p| into(p)),
      NsValue::Func => FUNC_PROPS.iter().for_each(|p| into(p)),
      NsValue::Object(map) => map.keys().for_each(|k| into(k)),
      _ => {},
    }
  }
}

/// The global scope a [`ScriptHint`] resolves variables against.
#[derive(Debug, Clone, Default)]
pub struct Namespace(pub BTreeMap<String, NsValue>);

impl Namespace {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, name: impl Into<String>, value: NsValue) {
    self.0.insert(name.into(), value);
  }
}

/// Script completion provider.
pub struct ScriptHint {
  pub keywords:  Vec<String>,
  pub namespace: Namespace,
  /// Extra in-scope identifiers supplied by the host.
  pub locals:    Vec<String>,
}

impl Default for ScriptHint {
  fn default() -> Self {
    Self {
      keywords:  JAVASCRIPT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
      namespace: Namespace::new(),
      locals:    Vec::new(),
    }
  }
}

static STR_VALUE: NsValue = NsValue::Str;
static NUM_VALUE: NsValue = NsValue::Num;

impl ScriptHint {
  fn completions(&self, token: &Token, mut chain: Vec<Token>) -> Vec<String> {
    let start = &token.text;
    let mut found: Vec<String> = Vec::new();
    let mut maybe_add = |name: &str| {
      if name.starts_with(start.as_str()) && !found.iter().any(|f| f == name) {
        found.push(name.to_string());
      }
    };

    if let Some(base_token) = chain.pop() {
      // A property access: resolve the base object, then walk the rest of
      // the chain inward.
      let mut base: Option<&NsValue> = match base_token.kind {
        Some(TokenKind::Variable) => self.namespace.0.get(&base_token.text),
        Some(TokenKind::String) => Some(&STR_VALUE),
        Some(TokenKind::Atom) | Some(TokenKind::Number) => Some(&NUM_VALUE),
        _ => None,
      };
      while let (Some(value), Some(next)) = (base, chain.pop()) {
        base = value.property(&next.text);
      }
      if let Some(value) = base {
        value.gather(&mut maybe_add);
      }
    } else {
      for name in &self.locals {
        maybe_add(name);
      }
      for name in self.namespace.0.keys() {
        maybe_add(name);
      }
      for keyword in &self.keywords {
        maybe_add(keyword);
      }
    }

    found
  }
}

impl HintProvider for ScriptHint {
  fn hints(&self, buf: &dyn Buffer, pos: Position, _config: &HintConfig) -> Option<HintList> {
    if !matches!(buf.inner_mode_at(pos), ModeKind::Script | ModeKind::Plain) {
      return None;
    }

    let mut token = buf.token_at(pos);
    if matches!(token.kind, Some(TokenKind::String) | Some(TokenKind::Comment)) {
      return None;
    }

    // Only word-style tokens complete; after a `.` an empty property token
    // is synthesized at the cursor.
    if !token.text.chars().all(char_is_word) {
      token = Token {
        kind: (token.text == ".").then_some(TokenKind::Property),
        ..Token::empty_at(pos.col)
      };
    } else if token.end > pos.col {
      let keep = pos.col - token.start;
      token.text = token.text.chars().take(keep).collect();
      token.end = pos.col;
    }

    // Collect the qualifier chain: `a.b.c|` yields [b, a].
    let mut chain: Vec<Token> = Vec::new();
    let mut prop = token.clone();
    while prop.kind == Some(TokenKind::Property) {
      let dot = buf.token_at(Position::new(pos.line, prop.start));
      if dot.text != "." {
        return None;
      }
      prop = buf.token_at(Position::new(pos.line, dot.start));
      chain.push(prop.clone());
    }

    let found = self.completions(&token, chain);
    (!found.is_empty()).then_some(HintList {
      list: found.into_iter().map(Hint::new).collect(),
      from: Position::new(pos.line, token.start),
      to:   Position::new(pos.line, token.end),
    })
  }
}
