//! Typing-time tag auto-closing.
//!
//! [`close_on_gt`] runs when the final `>` of an opening tag is typed:
//! unless the tag is a closing/self-closing tag, a configured void element,
//! inside an attribute string, or already has a matching close later in the
//! buffer, it inserts `></name>` with the cursor between — or `/>` for
//! configured empty tags, or an indented blank line for configured block
//! tags. [`close_on_slash`] runs when `/` is typed right after `<` and
//! inserts the close of the innermost enclosing tag; inside a script/style
//! island of a mixed document it closes the island's container instead.
//!
//! Like the bracket handlers, a multi-caret keypress either applies at every
//! caret or passes through untouched.

use crate::{
  HandlerOutcome,
  buffer::{
    Buffer,
    Edit,
    MarkupContext,
    ModeKind,
    TokenKind,
    indent_and_remap,
    map_through,
  },
  config::CloseTagConfig,
  position::{
    Caret,
    Position,
  },
  tag::scan_for_closing_tag,
};

/// Void HTML elements: never auto-closed.
pub const HTML_DONT_CLOSE: &[&str] = &[
  "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen", "link", "meta",
  "param", "source", "track", "wbr",
];

/// Block-level HTML elements: opened with an indented blank line inside.
pub const HTML_INDENT: &[&str] = &[
  "applet",
  "blockquote",
  "body",
  "button",
  "div",
  "dl",
  "fieldset",
  "form",
  "frameset",
  "h1",
  "h2",
  "h3",
  "h4",
  "h5",
  "h6",
  "head",
  "html",
  "iframe",
  "layer",
  "legend",
  "object",
  "ol",
  "p",
  "select",
  "table",
  "ul",
];

/// How far past the cursor [`closing_tag_exists`] looks, in lines.
const CLOSE_SCAN_LINES: usize = 500;

/// Is there already a closing tag for `tag_name` at the right nesting depth
/// after `pos`? When the surrounding context stacks several elements of the
/// same name, one close per open must follow for the answer to be yes.
pub fn closing_tag_exists<B: Buffer + ?Sized>(
  buf: &B,
  tag_name: &str,
  pos: Position,
  context: &MarkupContext,
  new_tag: bool,
) -> bool {
  let end = (pos.line + CLOSE_SCAN_LINES).min(buf.last_line() + 1);
  let Some(next_close) = scan_for_closing_tag(buf, pos, None, Some(end)) else {
    return false;
  };
  if next_close.name != tag_name {
    return false;
  }

  let mut wanted = usize::from(new_tag);
  wanted += context
    .context
    .iter()
    .take_while(|name| name.as_str() == tag_name)
    .count();

  let mut at = next_close.span.to;
  for _ in 1..wanted {
    let Some(next) = scan_for_closing_tag(buf, at, None, Some(end)) else {
      return false;
    };
    if next.name != tag_name {
      return false;
    }
    at = next.span.to;
  }
  true
}

struct Replacement {
  text:   String,
  /// Caret target in post-own-edit coordinates.
  target: Position,
  indent: bool,
}

/// Handle the final `>` of an opening tag being typed.
pub fn close_on_gt<B: Buffer + ?Sized>(buf: &mut B, config: &CloseTagConfig) -> HandlerOutcome {
  if !config.when_opening {
    return HandlerOutcome::Pass;
  }

  let carets = buf.carets();
  let mut replacements = Vec::with_capacity(carets.len());

  for caret in &carets {
    if !caret.is_empty() {
      return HandlerOutcome::Pass;
    }
    let pos = caret.head;
    if buf.inner_mode_at(pos) != ModeKind::Markup {
      return HandlerOutcome::Pass;
    }
    let token = buf.token_at(pos);
    let context = buf.markup_context_at(pos);
    let Some(mut tag_name) = context.tag_name.clone() else {
      return HandlerOutcome::Pass;
    };

    // The cursor may sit inside the name: only the part before it counts.
    if token.end > pos.col {
      let keep = tag_name
        .chars()
        .count()
        .saturating_sub(token.end - pos.col);
      tag_name = tag_name.chars().take(keep).collect();
    }
    let lower = tag_name.to_lowercase();

    // Don't process the `>` of an end tag or self-closing tag, a `>` typed
    // mid-string, an excluded void element, or a tag whose close already
    // exists downstream.
    let unfinished_string = token.kind == Some(TokenKind::String)
      && (token.end != pos.col
        || !token.text.ends_with(['"', '\''])
        || token.text.chars().count() == 1);
    if tag_name.is_empty()
      || unfinished_string
      || context.in_close_tag
      || token.text.ends_with('/')
      || config.dont_close.iter().any(|name| *name == lower)
      || closing_tag_exists(buf, &tag_name, pos, &context, true)
    {
      return HandlerOutcome::Pass;
    }

    if config.empty_tags.iter().any(|name| *name == tag_name) {
      replacements.push(Replacement {
        text:   "/>".to_string(),
        target: pos.with_col(pos.col + 2),
        indent: false,
      });
      continue;
    }

    let indent = config.indent_tags.iter().any(|name| *name == lower);
    let body = if indent { "\n\n" } else { "" };
    replacements.push(Replacement {
      text:   format!(">{body}</{tag_name}>"),
      target: if indent {
        Position::new(pos.line + 1, 0)
      } else {
        pos.with_col(pos.col + 1)
      },
      indent,
    });
  }

  let mut placed: Vec<(usize, Caret)> = Vec::with_capacity(carets.len());
  for (index, (caret, rep)) in carets.iter().zip(&replacements).enumerate().rev() {
    let pos = caret.head;
    let edit = Edit::insert(pos, rep.text.clone());
    buf.replace_range(&edit.text, pos, pos);
    for (_, placed_caret) in placed.iter_mut() {
      placed_caret.anchor = map_through(&edit, placed_caret.anchor);
      placed_caret.head = map_through(&edit, placed_caret.head);
    }

    let mut target = rep.target;
    if rep.indent && config.indent_on_close {
      let width = indent_and_remap(buf, pos.line + 1, &mut placed);
      indent_and_remap(buf, pos.line + 2, &mut placed);
      target = Position::new(pos.line + 1, width);
    }
    placed.push((index, Caret::point(target)));
  }

  placed.sort_by_key(|(index, _)| *index);
  buf.set_carets(placed.into_iter().map(|(_, caret)| caret).collect());
  tracing::debug!(carets = carets.len(), "auto closed tag on '>'");
  HandlerOutcome::Handled
}

/// Handle `/` typed right after `<`.
pub fn close_on_slash<B: Buffer + ?Sized>(buf: &mut B, config: &CloseTagConfig) -> HandlerOutcome {
  if !config.when_closing {
    return HandlerOutcome::Pass;
  }
  close_current(buf, config, true)
}

/// Close the innermost enclosing tag at every cursor — the `closeTag`
/// command. Inserts the whole `</name>`.
pub fn close_current_command<B: Buffer + ?Sized>(
  buf: &mut B,
  config: &CloseTagConfig,
) -> HandlerOutcome {
  close_current(buf, config, false)
}

fn close_current<B: Buffer + ?Sized>(
  buf: &mut B,
  config: &CloseTagConfig,
  typing_slash: bool,
) -> HandlerOutcome {
  let head = if typing_slash { "/" } else { "</" };
  let carets = buf.carets();
  let mut replacements = Vec::with_capacity(carets.len());

  for caret in &carets {
    if !caret.is_empty() {
      return HandlerOutcome::Pass;
    }
    let pos = caret.head;
    let token = buf.token_at(pos);

    if typing_slash
      && (token.kind == Some(TokenKind::String)
        || !token.text.starts_with('<')
        || token.start != pos.col.saturating_sub(1))
    {
      return HandlerOutcome::Pass;
    }

    let mut replacement = match buf.inner_mode_at(pos) {
      ModeKind::Markup => {
        let context = buf.markup_context_at(pos);
        let Some(inner) = context.context.first() else {
          return HandlerOutcome::Pass;
        };
        if closing_tag_exists(buf, inner, pos, &context, false) {
          return HandlerOutcome::Pass;
        }
        format!("{head}{inner}")
      },
      // Inside an embedded-language island there is no markup state to
      // consult, but the container is unambiguous.
      ModeKind::Script => format!("{head}script"),
      ModeKind::Style => format!("{head}style"),
      ModeKind::Plain => return HandlerOutcome::Pass,
    };

    if buf.char_at(Position::new(pos.line, token.end)) != Some('>') {
      replacement.push('>');
    }
    replacements.push(replacement);
  }

  let mut placed: Vec<(usize, Caret)> = Vec::with_capacity(carets.len());
  for (index, (caret, text)) in carets.iter().zip(&replacements).enumerate().rev() {
    let pos = caret.head;
    let edit = Edit::insert(pos, text.clone());
    buf.replace_range(&edit.text, pos, pos);
    for (_, placed_caret) in placed.iter_mut() {
      placed_caret.anchor = map_through(&edit, placed_caret.anchor);
      placed_caret.head = map_through(&edit, placed_caret.head);
    }
    placed.push((index, Caret::point(edit.end())));
  }
  placed.sort_by_key(|(index, _)| *index);

  if config.indent_on_slash {
    // Indent each affected line once, keeping carets in step.
    let mut lines: Vec<usize> = placed.iter().map(|(_, caret)| caret.head.line).collect();
    lines.dedup();
    for line in lines {
      indent_and_remap(buf, line, &mut placed);
    }
  }

  buf.set_carets(placed.into_iter().map(|(_, caret)| caret).collect());
  HandlerOutcome::Handled
}

#[cfg(test)]
mod test {
  use smallvec::smallvec;

  use super::*;
  use crate::buffer::{
    LineBuffer,
    MarkupTokenizer,
  };

  fn buf_at(text: &str, line: usize, col: usize) -> LineBuffer<MarkupTokenizer> {
    let mut buf = LineBuffer::from_str(text);
    buf.set_carets(smallvec![Caret::point(Position::new(line, col))]);
    buf
  }

  #[test]
  fn test_gt_closes_open_tag() {
    let mut buf = buf_at("<span", 0, 5);
    assert_eq!(
      close_on_gt(&mut buf, &CloseTagConfig::default()),
      HandlerOutcome::Handled
    );
    assert_eq!(buf.text(), "<span></span>");
    assert_eq!(buf.carets()[0].head, Position::new(0, 6));
  }

  #[test]
  fn test_gt_passes_when_close_exists_downstream() {
    let mut buf = buf_at("<span\nx</span>", 0, 5);
    assert_eq!(
      close_on_gt(&mut buf, &CloseTagConfig::default()),
      HandlerOutcome::Pass
    );
    assert_eq!(buf.text(), "<span\nx</span>");
  }

  #[test]
  fn test_gt_nested_same_name_still_closes() {
    // The existing `</span>` belongs to the outer open; the new inner tag
    // still needs its own close.
    let mut buf = buf_at("<span>a<span\nx</span>", 0, 12);
    assert_eq!(
      close_on_gt(&mut buf, &CloseTagConfig::default()),
      HandlerOutcome::Handled
    );
    assert_eq!(buf.text(), "<span>a<span></span>\nx</span>");
  }

  #[test]
  fn test_gt_skips_void_elements() {
    let mut buf = buf_at("<br", 0, 3);
    assert_eq!(
      close_on_gt(&mut buf, &CloseTagConfig::default()),
      HandlerOutcome::Pass
    );
  }

  #[test]
  fn test_gt_skips_closing_and_self_closing() {
    let mut buf = buf_at("<div>x</div", 0, 11);
    assert_eq!(
      close_on_gt(&mut buf, &CloseTagConfig::default()),
      HandlerOutcome::Pass
    );

    let mut buf = buf_at("<span /", 0, 7);
    assert_eq!(
      close_on_gt(&mut buf, &CloseTagConfig::default()),
      HandlerOutcome::Pass
    );
  }

  #[test]
  fn test_gt_indent_tags_get_blank_line() {
    let mut buf = buf_at("<div", 0, 4);
    assert_eq!(
      close_on_gt(&mut buf, &CloseTagConfig::default()),
      HandlerOutcome::Handled
    );
    assert_eq!(buf.text(), "<div>\n  \n</div>");
    assert_eq!(buf.carets()[0].head, Position::new(1, 2));
  }

  #[test]
  fn test_gt_empty_tags_self_close() {
    let mut config = CloseTagConfig::default();
    config.empty_tags = vec!["input".to_string()];
    // Not in dont_close for this config, but in empty_tags.
    config.dont_close.retain(|name| name != "input");

    let mut buf = buf_at("<input", 0, 6);
    assert_eq!(close_on_gt(&mut buf, &config), HandlerOutcome::Handled);
    assert_eq!(buf.text(), "<input/>");
    assert_eq!(buf.carets()[0].head, Position::new(0, 8));
  }

  #[test]
  fn test_gt_mid_name_closes_typed_prefix() {
    // Cursor between `sp` and `an`: only the typed prefix counts.
    let mut buf = buf_at("<span", 0, 3);
    assert_eq!(
      close_on_gt(&mut buf, &CloseTagConfig::default()),
      HandlerOutcome::Handled
    );
    assert_eq!(buf.text(), "<sp></sp>an");
  }

  #[test]
  fn test_slash_closes_enclosing_tag() {
    let mut buf = buf_at("<div>x<", 0, 7);
    assert_eq!(
      close_on_slash(&mut buf, &CloseTagConfig::default()),
      HandlerOutcome::Handled
    );
    assert_eq!(buf.text(), "<div>x</div>");
    assert_eq!(buf.carets()[0].head, Position::new(0, 12));
  }

  #[test]
  fn test_slash_passes_when_already_closed() {
    let mut buf = buf_at("<div>x<\n</div>", 0, 7);
    assert_eq!(
      close_on_slash(&mut buf, &CloseTagConfig::default()),
      HandlerOutcome::Pass
    );
  }

  #[test]
  fn test_slash_requires_fresh_lt() {
    // Cursor not directly after `<`.
    let mut buf = buf_at("<div>x< ", 0, 8);
    assert_eq!(
      close_on_slash(&mut buf, &CloseTagConfig::default()),
      HandlerOutcome::Pass
    );
  }

  #[test]
  fn test_slash_closes_script_island() {
    let mut buf = buf_at("<script>\nvar x = 1;<", 1, 11);
    assert_eq!(
      close_on_slash(&mut buf, &CloseTagConfig::default()),
      HandlerOutcome::Handled
    );
    // The closed line is re-indented one unit into the script element.
    assert_eq!(buf.text(), "<script>\n  var x = 1;</script>");
    assert_eq!(buf.carets()[0].head, Position::new(1, 21));
  }

  #[test]
  fn test_close_current_command_inserts_full_close() {
    let mut buf = buf_at("<ul><li>item", 0, 12);
    assert_eq!(
      close_current_command(&mut buf, &CloseTagConfig::default()),
      HandlerOutcome::Handled
    );
    assert_eq!(buf.text(), "<ul><li>item</li>");
  }
}
