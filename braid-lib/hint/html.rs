//! HTML completion: the XML provider specialized with a built-in schema.

use std::{
  collections::BTreeMap,
  sync::Arc,
};

use once_cell::sync::Lazy;

use crate::{
  buffer::Buffer,
  config::HintConfig,
  hint::{
    HintList,
    HintProvider,
    xml::{
      AttrValues,
      Schema,
      TagSpec,
      XmlHint,
    },
  },
  position::Position,
};

const TARGETS: &[&str] = &["_blank", "_self", "_top", "_parent"];
const CHARSETS: &[&str] = &["ascii", "utf-8", "utf-16", "latin1"];
const METHODS: &[&str] = &["get", "post", "put", "delete"];
const ENCS: &[&str] = &[
  "application/x-www-form-urlencoded",
  "multipart/form-data",
  "text/plain",
];
const MEDIA: &[&str] = &[
  "all",
  "screen",
  "print",
  "embossed",
  "braille",
  "handheld",
  "projection",
  "tty",
  "tv",
  "speech",
];
const BOOLISH: &[&str] = &["true", "false"];

fn attrs<const N: usize>(entries: [(&str, AttrValues); N]) -> BTreeMap<String, AttrValues> {
  entries
    .into_iter()
    .map(|(name, values)| (name.to_string(), values))
    .collect()
}

fn toggle(name: &str) -> AttrValues {
  AttrValues::list(["", name])
}

/// The built-in HTML schema: common tags with their attributes and value
/// lists, the `html` root, and the global attribute set.
pub static HTML_SCHEMA: Lazy<Arc<Schema>> = Lazy::new(|| {
  let simple = || TagSpec::default();
  let mut tags: BTreeMap<String, TagSpec> = BTreeMap::new();

  for name in [
    "abbr",
    "address",
    "article",
    "aside",
    "b",
    "bdi",
    "bdo",
    "blockquote",
    "body",
    "br",
    "caption",
    "cite",
    "code",
    "dd",
    "dfn",
    "div",
    "dl",
    "dt",
    "em",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hgroup",
    "hr",
    "i",
    "kbd",
    "legend",
    "li",
    "main",
    "mark",
    "nav",
    "noscript",
    "p",
    "pre",
    "rp",
    "rt",
    "ruby",
    "s",
    "samp",
    "section",
    "small",
    "span",
    "strong",
    "sub",
    "summary",
    "sup",
    "table",
    "tbody",
    "tfoot",
    "thead",
    "title",
    "tr",
    "u",
    "ul",
    "var",
    "wbr",
  ] {
    tags.insert(name.to_string(), simple());
  }

  tags.insert("a".to_string(), TagSpec {
    attrs:    attrs([
      ("href", AttrValues::Any),
      ("ping", AttrValues::Any),
      ("type", AttrValues::Any),
      ("media", AttrValues::list(MEDIA.iter().copied())),
      ("target", AttrValues::list(TARGETS.iter().copied())),
      ("hreflang", AttrValues::Any),
    ]),
    children: None,
  });
  tags.insert("audio".to_string(), TagSpec {
    attrs:    attrs([
      ("src", AttrValues::Any),
      ("crossorigin", AttrValues::list(["anonymous", "use-credentials"])),
      ("preload", AttrValues::list(["none", "metadata", "auto"])),
      ("autoplay", toggle("autoplay")),
      ("loop", toggle("loop")),
      ("controls", toggle("controls")),
    ]),
    children: None,
  });
  tags.insert("base".to_string(), TagSpec {
    attrs:    attrs([
      ("href", AttrValues::Any),
      ("target", AttrValues::list(TARGETS.iter().copied())),
    ]),
    children: None,
  });
  tags.insert("button".to_string(), TagSpec {
    attrs:    attrs([
      ("form", AttrValues::Any),
      ("formaction", AttrValues::Any),
      ("name", AttrValues::Any),
      ("value", AttrValues::Any),
      ("autofocus", toggle("autofocus")),
      ("disabled", toggle("disabled")),
      ("formenctype", AttrValues::list(ENCS.iter().copied())),
      ("formmethod", AttrValues::list(METHODS.iter().copied())),
      ("formtarget", AttrValues::list(TARGETS.iter().copied())),
      ("type", AttrValues::list(["submit", "reset", "button"])),
    ]),
    children: None,
  });
  tags.insert("canvas".to_string(), TagSpec {
    attrs:    attrs([("width", AttrValues::Any), ("height", AttrValues::Any)]),
    children: None,
  });
  tags.insert("col".to_string(), TagSpec {
    attrs:    attrs([("span", AttrValues::Any)]),
    children: None,
  });
  tags.insert("colgroup".to_string(), TagSpec {
    attrs:    attrs([("span", AttrValues::Any)]),
    children: None,
  });
  tags.insert("data".to_string(), TagSpec {
    attrs:    attrs([("value", AttrValues::Any)]),
    children: None,
  });
  tags.insert("del".to_string(), TagSpec {
    attrs:    attrs([("cite", AttrValues::Any), ("datetime", AttrValues::Any)]),
    children: None,
  });
  tags.insert("details".to_string(), TagSpec {
    attrs:    attrs([("open", toggle("open"))]),
    children: None,
  });
  tags.insert("embed".to_string(), TagSpec {
    attrs:    attrs([
      ("src", AttrValues::Any),
      ("type", AttrValues::Any),
      ("width", AttrValues::Any),
      ("height", AttrValues::Any),
    ]),
    children: None,
  });
  tags.insert("form".to_string(), TagSpec {
    attrs:    attrs([
      ("action", AttrValues::Any),
      ("name", AttrValues::Any),
      ("accept-charset", AttrValues::list(CHARSETS.iter().copied())),
      ("autocomplete", AttrValues::list(["on", "off"])),
      ("enctype", AttrValues::list(ENCS.iter().copied())),
      ("method", AttrValues::list(METHODS.iter().copied())),
      ("novalidate", toggle("novalidate")),
      ("target", AttrValues::list(TARGETS.iter().copied())),
    ]),
    children: None,
  });
  tags.insert("head".to_string(), TagSpec {
    attrs:    BTreeMap::new(),
    children: Some(
      ["title", "base", "link", "style", "meta", "script", "noscript"]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    ),
  });
  tags.insert("html".to_string(), TagSpec {
    attrs:    attrs([("manifest", AttrValues::Any)]),
    children: Some(vec!["head".to_string(), "body".to_string()]),
  });
  tags.insert("iframe".to_string(), TagSpec {
    attrs:    attrs([
      ("src", AttrValues::Any),
      ("srcdoc", AttrValues::Any),
      ("name", AttrValues::Any),
      ("width", AttrValues::Any),
      ("height", AttrValues::Any),
      (
        "sandbox",
        AttrValues::list([
          "allow-top-navigation",
          "allow-same-origin",
          "allow-forms",
          "allow-scripts",
        ]),
      ),
      ("seamless", toggle("seamless")),
    ]),
    children: None,
  });
  tags.insert("img".to_string(), TagSpec {
    attrs:    attrs([
      ("alt", AttrValues::Any),
      ("src", AttrValues::Any),
      ("ismap", AttrValues::Any),
      ("usemap", AttrValues::Any),
      ("width", AttrValues::Any),
      ("height", AttrValues::Any),
      ("crossorigin", AttrValues::list(["anonymous", "use-credentials"])),
    ]),
    children: None,
  });
  tags.insert("input".to_string(), TagSpec {
    attrs:    attrs([
      ("alt", AttrValues::Any),
      ("form", AttrValues::Any),
      ("list", AttrValues::Any),
      ("max", AttrValues::Any),
      ("maxlength", AttrValues::Any),
      ("min", AttrValues::Any),
      ("name", AttrValues::Any),
      ("pattern", AttrValues::Any),
      ("placeholder", AttrValues::Any),
      ("size", AttrValues::Any),
      ("src", AttrValues::Any),
      ("step", AttrValues::Any),
      ("value", AttrValues::Any),
      ("accept", AttrValues::list(["audio/*", "video/*", "image/*"])),
      ("autocomplete", AttrValues::list(["on", "off"])),
      ("autofocus", toggle("autofocus")),
      ("checked", toggle("checked")),
      ("disabled", toggle("disabled")),
      ("multiple", toggle("multiple")),
      ("readonly", toggle("readonly")),
      ("required", toggle("required")),
      (
        "type",
        AttrValues::list([
          "hidden",
          "text",
          "search",
          "tel",
          "url",
          "email",
          "password",
          "date",
          "month",
          "week",
          "time",
          "datetime-local",
          "number",
          "range",
          "color",
          "checkbox",
          "radio",
          "file",
          "submit",
          "image",
          "reset",
          "button",
        ]),
      ),
    ]),
    children: None,
  });
  tags.insert("ins".to_string(), TagSpec {
    attrs:    attrs([("cite", AttrValues::Any), ("datetime", AttrValues::Any)]),
    children: None,
  });
  tags.insert("label".to_string(), TagSpec {
    attrs:    attrs([("for", AttrValues::Any), ("form", AttrValues::Any)]),
    children: None,
  });
  tags.insert("link".to_string(), TagSpec {
    attrs:    attrs([
      ("href", AttrValues::Any),
      ("type", AttrValues::Any),
      ("hreflang", AttrValues::Any),
      ("media", AttrValues::list(MEDIA.iter().copied())),
      (
        "rel",
        AttrValues::list([
          "stylesheet",
          "alternate",
          "author",
          "icon",
          "license",
          "next",
          "prefetch",
          "prev",
          "search",
        ]),
      ),
    ]),
    children: None,
  });
  tags.insert("meta".to_string(), TagSpec {
    attrs:    attrs([
      ("content", AttrValues::Any),
      ("charset", AttrValues::list(CHARSETS.iter().copied())),
      (
        "name",
        AttrValues::list([
          "viewport",
          "application-name",
          "author",
          "description",
          "generator",
          "keywords",
        ]),
      ),
      (
        "http-equiv",
        AttrValues::list([
          "content-language",
          "content-type",
          "default-style",
          "refresh",
        ]),
      ),
    ]),
    children: None,
  });
  tags.insert("meter".to_string(), TagSpec {
    attrs:    attrs([
      ("value", AttrValues::Any),
      ("min", AttrValues::Any),
      ("low", AttrValues::Any),
      ("high", AttrValues::Any),
      ("max", AttrValues::Any),
      ("optimum", AttrValues::Any),
    ]),
    children: None,
  });
  tags.insert("object".to_string(), TagSpec {
    attrs:    attrs([
      ("data", AttrValues::Any),
      ("type", AttrValues::Any),
      ("name", AttrValues::Any),
      ("usemap", AttrValues::Any),
      ("form", AttrValues::Any),
      ("width", AttrValues::Any),
      ("height", AttrValues::Any),
    ]),
    children: None,
  });
  tags.insert("ol".to_string(), TagSpec {
    attrs:    attrs([
      ("reversed", toggle("reversed")),
      ("start", AttrValues::Any),
      ("type", AttrValues::list(["1", "a", "A", "i", "I"])),
    ]),
    children: None,
  });
  tags.insert("optgroup".to_string(), TagSpec {
    attrs:    attrs([("disabled", toggle("disabled")), ("label", AttrValues::Any)]),
    children: None,
  });
  tags.insert("option".to_string(), TagSpec {
    attrs:    attrs([
      ("disabled", toggle("disabled")),
      ("label", AttrValues::Any),
      ("selected", toggle("selected")),
      ("value", AttrValues::Any),
    ]),
    children: None,
  });
  tags.insert("output".to_string(), TagSpec {
    attrs:    attrs([
      ("for", AttrValues::Any),
      ("form", AttrValues::Any),
      ("name", AttrValues::Any),
    ]),
    children: None,
  });
  tags.insert("param".to_string(), TagSpec {
    attrs:    attrs([("name", AttrValues::Any), ("value", AttrValues::Any)]),
    children: None,
  });
  tags.insert("progress".to_string(), TagSpec {
    attrs:    attrs([("value", AttrValues::Any), ("max", AttrValues::Any)]),
    children: None,
  });
  tags.insert("q".to_string(), TagSpec {
    attrs:    attrs([("cite", AttrValues::Any)]),
    children: None,
  });
  tags.insert("script".to_string(), TagSpec {
    attrs:    attrs([
      ("type", AttrValues::list(["text/javascript", "module"])),
      ("src", AttrValues::Any),
      ("async", toggle("async")),
      ("defer", toggle("defer")),
      ("charset", AttrValues::list(CHARSETS.iter().copied())),
    ]),
    children: None,
  });
  tags.insert("select".to_string(), TagSpec {
    attrs:    attrs([
      ("form", AttrValues::Any),
      ("name", AttrValues::Any),
      ("size", AttrValues::Any),
      ("autofocus", toggle("autofocus")),
      ("disabled", toggle("disabled")),
      ("multiple", toggle("multiple")),
    ]),
    children: None,
  });
  tags.insert("source".to_string(), TagSpec {
    attrs:    attrs([
      ("src", AttrValues::Any),
      ("type", AttrValues::Any),
      ("media", AttrValues::list(MEDIA.iter().copied())),
    ]),
    children: None,
  });
  tags.insert("style".to_string(), TagSpec {
    attrs:    attrs([
      ("type", AttrValues::list(["text/css"])),
      ("media", AttrValues::list(MEDIA.iter().copied())),
      ("scoped", AttrValues::Any),
    ]),
    children: None,
  });
  tags.insert("td".to_string(), TagSpec {
    attrs:    attrs([
      ("colspan", AttrValues::Any),
      ("rowspan", AttrValues::Any),
      ("headers", AttrValues::Any),
    ]),
    children: None,
  });
  tags.insert("textarea".to_string(), TagSpec {
    attrs:    attrs([
      ("form", AttrValues::Any),
      ("maxlength", AttrValues::Any),
      ("name", AttrValues::Any),
      ("placeholder", AttrValues::Any),
      ("rows", AttrValues::Any),
      ("cols", AttrValues::Any),
      ("autofocus", toggle("autofocus")),
      ("disabled", toggle("disabled")),
      ("readonly", toggle("readonly")),
      ("required", toggle("required")),
      ("wrap", AttrValues::list(["soft", "hard"])),
    ]),
    children: None,
  });
  tags.insert("th".to_string(), TagSpec {
    attrs:    attrs([
      ("colspan", AttrValues::Any),
      ("rowspan", AttrValues::Any),
      ("headers", AttrValues::Any),
      ("scope", AttrValues::list(["row", "col", "rowgroup", "colgroup"])),
    ]),
    children: None,
  });
  tags.insert("time".to_string(), TagSpec {
    attrs:    attrs([("datetime", AttrValues::Any)]),
    children: None,
  });
  tags.insert("track".to_string(), TagSpec {
    attrs:    attrs([
      ("src", AttrValues::Any),
      ("label", AttrValues::Any),
      ("default", AttrValues::Any),
      (
        "kind",
        AttrValues::list([
          "subtitles",
          "captions",
          "descriptions",
          "chapters",
          "metadata",
        ]),
      ),
      ("srclang", AttrValues::Any),
    ]),
    children: None,
  });
  tags.insert("video".to_string(), TagSpec {
    attrs:    attrs([
      ("src", AttrValues::Any),
      ("poster", AttrValues::Any),
      ("width", AttrValues::Any),
      ("height", AttrValues::Any),
      ("crossorigin", AttrValues::list(["anonymous", "use-credentials"])),
      ("preload", AttrValues::list(["auto", "metadata", "none"])),
      ("autoplay", toggle("autoplay")),
      ("muted", toggle("muted")),
      ("controls", toggle("controls")),
    ]),
    children: None,
  });

  let global_attrs = attrs([
    ("class", AttrValues::Any),
    ("contenteditable", AttrValues::list(BOOLISH.iter().copied())),
    ("dir", AttrValues::list(["ltr", "rtl", "auto"])),
    ("draggable", AttrValues::list(["true", "false", "auto"])),
    ("hidden", AttrValues::list(["hidden"])),
    ("id", AttrValues::Any),
    ("lang", AttrValues::Any),
    ("spellcheck", AttrValues::list(BOOLISH.iter().copied())),
    ("style", AttrValues::Any),
    ("tabindex", AttrValues::Any),
    ("title", AttrValues::Any),
    ("translate", AttrValues::list(["yes", "no"])),
    ("onclick", AttrValues::Any),
  ]);

  Arc::new(Schema {
    tags,
    top: vec!["html".to_string()],
    global_attrs,
  })
});

/// HTML completion provider.
pub struct HtmlHint;

impl HintProvider for HtmlHint {
  fn hints(&self, buf: &dyn Buffer, pos: Position, config: &HintConfig) -> Option<HintList> {
    XmlHint::new(Arc::clone(&HTML_SCHEMA)).hints(buf, pos, config)
  }
}
