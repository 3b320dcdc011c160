//! Schema-driven tag/attribute/value completion for markup.

use std::{
  collections::BTreeMap,
  sync::Arc,
};

use braid_core::chars::char_is_word;

use crate::{
  buffer::{
    Buffer,
    ModeKind,
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

/// Values an attribute can take.
#[derive(Debug, Clone)]
pub enum AttrValues {
  /// Free-form: no value completion.
  Any,
  List(Vec<String>),
  /// Supplied by the host at completion time.
  Dynamic(fn(&dyn Buffer) -> Vec<String>),
}

impl AttrValues {
  pub fn list<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
    AttrValues::List(values.into_iter().map(Into::into).collect())
  }

  fn resolve(&self, buf: &dyn Buffer) -> Option<Vec<String>> {
    match self {
      AttrValues::Any => None,
      AttrValues::List(values) => Some(values.clone()),
      AttrValues::Dynamic(supply) => Some(supply(buf)),
    }
  }
}

/// One tag's schema entry.
#[derive(Debug, Clone, Default)]
pub struct TagSpec {
  pub attrs:    BTreeMap<String, AttrValues>,
  /// Tags allowed directly inside this one; `None` allows everything.
  pub children: Option<Vec<String>>,
}

/// A markup schema: tags, the top-level tag set, and attributes valid on
/// every tag.
#[derive(Debug, Clone, Default)]
pub struct Schema {
  pub tags:         BTreeMap<String, TagSpec>,
  pub top:          Vec<String>,
  pub global_attrs: BTreeMap<String, AttrValues>,
}

fn matches(hint: &str, typed: &str, in_middle: bool) -> bool {
  if in_middle {
    hint.contains(typed)
  } else {
    hint.starts_with(typed)
  }
}

/// Schema-driven completion provider.
pub struct XmlHint {
  pub schema: Arc<Schema>,
}

impl XmlHint {
  pub fn new(schema: Arc<Schema>) -> Self {
    Self { schema }
  }

  fn tag_hints(
    &self,
    buf: &dyn Buffer,
    pos: Position,
    token: &crate::buffer::Token,
    tag_type: Option<TagType>,
    tag_start: Option<usize>,
    named: bool,
    config: &HintConfig,
  ) -> Option<HintList> {
    let mut result = Vec::new();
    let prefix = if named { token.text.clone() } else { String::new() };
    let replace_token = tag_type.is_some();

    let context = buf.markup_context_at(pos);
    let enclosing = context.context.first();
    let children = match enclosing {
      Some(name) => self
        .schema
        .tags
        .get(name)
        .and_then(|spec| spec.children.as_ref()),
      None => Some(&self.schema.top),
    };

    if tag_type != Some(TagType::Close) {
      match children {
        Some(children) => {
          for name in children {
            if matches(name, &prefix, config.match_in_middle) {
              result.push(Hint::new(format!("<{name}")));
            }
          }
        },
        None => {
          for name in self.schema.tags.keys() {
            if matches(name, &prefix, config.match_in_middle) {
              result.push(Hint::new(format!("<{name}")));
            }
          }
        },
      }
    }
    if let Some(enclosing) = enclosing {
      if prefix.is_empty()
        || (tag_type == Some(TagType::Close)
          && matches(enclosing, &prefix, config.match_in_middle))
      {
        result.push(Hint::new(format!("</{enclosing}>")));
      }
    }

    let (from, to) = if replace_token {
      (
        Position::new(pos.line, tag_start.unwrap_or(token.start)),
        Position::new(pos.line, token.end),
      )
    } else {
      (pos, pos)
    };
    (!result.is_empty()).then_some(HintList {
      list: result,
      from,
      to,
    })
  }

  fn attr_hints(
    &self,
    buf: &dyn Buffer,
    pos: Position,
    token: &crate::buffer::Token,
    tag_name: &str,
    config: &HintConfig,
  ) -> Option<HintList> {
    let spec = self.schema.tags.get(tag_name);
    let local = spec.map(|spec| &spec.attrs);
    if local.is_none_or(|attrs| attrs.is_empty()) && self.schema.global_attrs.is_empty() {
      return None;
    }

    // Tag-local attributes shadow global ones of the same name.
    let mut attrs: BTreeMap<&str, &AttrValues> = BTreeMap::new();
    for (name, values) in &self.schema.global_attrs {
      attrs.insert(name, values);
    }
    if let Some(local) = local {
      for (name, values) in local {
        attrs.insert(name, values);
      }
    }

    let mut token = token.clone();
    let mut result = Vec::new();
    let mut prefix = String::new();
    let mut replace_token = false;

    if token.kind == Some(TokenKind::String) || token.text == "=" {
      // Attribute value: find which attribute the value belongs to.
      let before_to = if token.kind == Some(TokenKind::String) {
        token.start
      } else {
        token.end
      };
      let before = buf.text_range(
        Position::new(pos.line, pos.col.saturating_sub(60)),
        Position::new(pos.line, before_to),
      );
      let attr_name = attr_name_before_eq(&before)?;
      let values = attrs.get(attr_name.as_str())?.resolve(buf)?;

      let mut quote = config.quote;
      if token.kind == Some(TokenKind::String) {
        let chars: Vec<char> = token.text.chars().collect();
        let mut inner = chars.as_slice();
        let mut opened = false;
        if matches!(inner.first(), Some('"') | Some('\'')) {
          quote = inner[0];
          inner = &inner[1..];
          opened = true;
        }
        if let Some(&(last @ ('"' | '\''))) = inner.last() {
          quote = last;
          inner = &inner[..inner.len() - 1];
        }
        prefix = inner.iter().collect();
        if opened {
          // Replace an existing closing quote directly after the token.
          if buf.char_at(Position::new(pos.line, token.end)) == Some(quote) {
            token.end += 1;
          }
        }
        replace_token = true;
      }

      for value in values {
        if matches(&value, &prefix, config.match_in_middle) {
          result.push(Hint::new(format!("{quote}{value}{quote}")));
        }
      }
    } else {
      // Attribute name.
      if token.kind == Some(TokenKind::Attribute) {
        prefix = token.text.clone();
        replace_token = true;
      }
      for name in attrs.keys() {
        if matches(name, &prefix, config.match_in_middle) {
          result.push(Hint::new(name.to_string()));
        }
      }
    }

    let (from, to) = if replace_token {
      (
        Position::new(pos.line, token.start),
        Position::new(pos.line, token.end),
      )
    } else {
      (pos, pos)
    };
    (!result.is_empty()).then_some(HintList {
      list: result,
      from,
      to,
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagType {
  Open,
  Close,
}

/// The `name` of `name=` at the end of `before`, if present.
fn attr_name_before_eq(before: &str) -> Option<String> {
  let rest = before.trim_end().strip_suffix('=')?;
  let name: String = rest
    .chars()
    .rev()
    .take_while(|c| !c.is_whitespace() && !matches!(c, '=' | '<' | '>' | '"' | '\''))
    .collect::<Vec<_>>()
    .into_iter()
    .rev()
    .collect();
  (!name.is_empty()).then_some(name)
}

impl HintProvider for XmlHint {
  fn hints(&self, buf: &dyn Buffer, pos: Position, config: &HintConfig) -> Option<HintList> {
    if buf.inner_mode_at(pos) != ModeKind::Markup {
      return None;
    }

    let mut token = buf.token_at(pos);
    if token.end > pos.col {
      let keep = pos.col.saturating_sub(token.start);
      token.text = token.text.chars().take(keep).collect();
      token.end = pos.col;
    }

    let in_tag_head = token.kind == Some(TokenKind::Tag) && !token.text.ends_with('>');
    let named = in_tag_head && token.text.chars().next().is_some_and(char_is_word);

    let mut tag_type = None;
    let mut tag_start = None;
    if named {
      let before = buf.text_range(
        Position::new(pos.line, token.start.saturating_sub(2)),
        Position::new(pos.line, token.start),
      );
      tag_type = if before.ends_with("</") {
        Some(TagType::Close)
      } else if before.ends_with('<') {
        Some(TagType::Open)
      } else {
        None
      };
      if let Some(t) = tag_type {
        tag_start = Some(token.start - if t == TagType::Close { 2 } else { 1 });
      }
    } else if in_tag_head && token.text == "<" {
      tag_type = Some(TagType::Open);
    } else if in_tag_head && token.text == "</" {
      tag_type = Some(TagType::Close);
    }

    let context = buf.markup_context_at(pos);
    if (!in_tag_head && context.tag_name.is_none()) || tag_type.is_some() {
      self.tag_hints(buf, pos, &token, tag_type, tag_start, named, config)
    } else {
      let tag_name = context.tag_name.clone()?;
      self.attr_hints(buf, pos, &token, &tag_name, config)
    }
  }
}

#[cfg(test)]
mod test {
  use smallvec::smallvec;

  use super::*;
  use crate::{
    buffer::{
      LineBuffer,
      MarkupTokenizer,
    },
    position::Caret,
  };

  fn schema() -> Arc<Schema> {
    let mut tags = BTreeMap::new();
    tags.insert("html".to_string(), TagSpec {
      attrs:    BTreeMap::new(),
      children: Some(vec!["head".to_string(), "body".to_string()]),
    });
    tags.insert("head".to_string(), TagSpec::default());
    tags.insert("body".to_string(), TagSpec::default());
    let mut link_attrs = BTreeMap::new();
    link_attrs.insert(
      "rel".to_string(),
      AttrValues::list(["stylesheet", "alternate"]),
    );
    link_attrs.insert("href".to_string(), AttrValues::Any);
    tags.insert("link".to_string(), TagSpec {
      attrs:    link_attrs,
      children: None,
    });

    let mut global_attrs = BTreeMap::new();
    global_attrs.insert("class".to_string(), AttrValues::Any);
    global_attrs.insert("dir".to_string(), AttrValues::list(["ltr", "rtl"]));

    Arc::new(Schema {
      tags,
      top: vec!["html".to_string()],
      global_attrs,
    })
  }

  fn buf_at(text: &str, line: usize, col: usize) -> LineBuffer<MarkupTokenizer> {
    let mut buf = LineBuffer::from_str(text);
    buf.set_carets(smallvec![Caret::point(Position::new(line, col))]);
    buf
  }

  fn texts(list: &HintList) -> Vec<&str> {
    list.list.iter().map(|hint| hint.text.as_str()).collect()
  }

  #[test]
  fn test_top_level_tag_completion() {
    let provider = XmlHint::new(schema());
    let buf = buf_at("<", 0, 1);
    // A bare `<` offers the top-level tags.
    let list = provider
      .hints(&buf, Position::new(0, 1), &HintConfig::default())
      .unwrap();
    assert_eq!(texts(&list), vec!["<html"]);
    assert_eq!(list.from, Position::new(0, 0));
  }

  #[test]
  fn test_child_tag_completion_with_prefix() {
    let provider = XmlHint::new(schema());
    let buf = buf_at("<html><he", 0, 9);
    let list = provider
      .hints(&buf, Position::new(0, 9), &HintConfig::default())
      .unwrap();
    // Children of html matching "he", plus nothing else ("body" filtered).
    assert_eq!(texts(&list), vec!["<head"]);
    // The replacement span covers `<he`.
    assert_eq!(list.from, Position::new(0, 6));
    assert_eq!(list.to, Position::new(0, 9));
  }

  #[test]
  fn test_close_tag_candidate_for_context() {
    let provider = XmlHint::new(schema());
    let buf = buf_at("<html><head></", 0, 14);
    let list = provider
      .hints(&buf, Position::new(0, 14), &HintConfig::default())
      .unwrap();
    assert_eq!(texts(&list), vec!["</head>"]);
  }

  #[test]
  fn test_attribute_name_completion() {
    let provider = XmlHint::new(schema());
    let buf = buf_at("<link ", 0, 6);
    let list = provider
      .hints(&buf, Position::new(0, 6), &HintConfig::default())
      .unwrap();
    // Tag-local and global attributes, merged.
    assert_eq!(texts(&list), vec!["class", "dir", "href", "rel"]);
    // Nothing typed yet: insert at the cursor.
    assert_eq!(list.from, Position::new(0, 6));
  }

  #[test]
  fn test_attribute_name_prefix_replaces_token() {
    let provider = XmlHint::new(schema());
    let buf = buf_at("<link re", 0, 8);
    let list = provider
      .hints(&buf, Position::new(0, 8), &HintConfig::default())
      .unwrap();
    assert_eq!(texts(&list), vec!["rel"]);
    assert_eq!(list.from, Position::new(0, 6));
    assert_eq!(list.to, Position::new(0, 8));
  }

  #[test]
  fn test_attribute_value_completion_after_eq() {
    let provider = XmlHint::new(schema());
    let buf = buf_at("<link rel=", 0, 10);
    let list = provider
      .hints(&buf, Position::new(0, 10), &HintConfig::default())
      .unwrap();
    assert_eq!(texts(&list), vec!["\"stylesheet\"", "\"alternate\""]);
  }

  #[test]
  fn test_attribute_value_inside_quotes() {
    let provider = XmlHint::new(schema());
    // Cursor after `"st` inside the quoted value.
    let buf = buf_at("<link rel=\"st\"", 0, 13);
    let list = provider
      .hints(&buf, Position::new(0, 13), &HintConfig::default())
      .unwrap();
    assert_eq!(texts(&list), vec!["\"stylesheet\""]);
    // The replacement swallows the existing closing quote.
    assert_eq!(list.from, Position::new(0, 10));
    assert_eq!(list.to, Position::new(0, 14));
  }

  #[test]
  fn test_free_form_attribute_has_no_value_hints() {
    let provider = XmlHint::new(schema());
    let buf = buf_at("<link href=", 0, 11);
    assert!(provider
      .hints(&buf, Position::new(0, 11), &HintConfig::default())
      .is_none());
  }

  #[test]
  fn test_match_in_middle() {
    let provider = XmlHint::new(schema());
    let mut config = HintConfig::default();
    config.match_in_middle = true;

    let buf = buf_at("<html><od", 0, 9);
    let list = provider.hints(&buf, Position::new(0, 9), &config).unwrap();
    assert_eq!(texts(&list), vec!["<body"]);
  }

  #[test]
  fn test_attr_name_before_eq() {
    assert_eq!(attr_name_before_eq("<link rel=").as_deref(), Some("rel"));
    assert_eq!(
      attr_name_before_eq("  data-x=").as_deref(),
      Some("data-x")
    );
    assert_eq!(attr_name_before_eq("<link rel"), None);
    assert_eq!(attr_name_before_eq("="), None);
  }
}
