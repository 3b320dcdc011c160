//! Completion sessions, the selection widget, and candidate providers.
//!
//! A [`Completion`] session is anchored at the token the cursor sat in when
//! it opened. Cursor movement re-validates the anchor — same line, same
//! distance from the line end, cursor not before the anchor, no selection,
//! no close character just typed — and any violation closes the session;
//! otherwise a candidate refetch is debounced to the host's next frame tick.
//! Fetches are generation-guarded: every request carries a handle from a
//! monotonically advancing [`TaskController`], and a result delivered for a
//! superseded request is discarded, so an async provider resolving out of
//! order can never overwrite a newer request's list.
//!
//! Candidate sources implement [`HintProvider`]; [`AutoHint`] chains them
//! and falls back to word lists. The [`HintWidget`] is a pure state machine
//! over the candidate list, driven by [`WidgetCommand`]s.

use std::{
  fmt,
  rc::Rc,
};

use braid_event::{
  FrameDebounce,
  FrameId,
  TaskController,
  TaskHandle,
};
use thiserror::Error;

use crate::{
  buffer::Buffer,
  config::HintConfig,
  position::{
    Caret,
    Position,
  },
};

pub type Result<T> = std::result::Result<T, HintError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum HintError {
  #[error("candidate index {index} out of bounds for list of length {len}")]
  CandidateOutOfBounds { index: usize, len: usize },
  #[error("no completion widget is open")]
  NoWidget,
}

pub mod css;
pub mod html;
pub mod script;
pub mod words;
pub mod xml;

/// Custom insertion hook: applied instead of the plain text replacement.
pub type HintApply = Rc<dyn Fn(&mut dyn Buffer, &HintList, usize)>;

/// One completion candidate.
#[derive(Clone)]
pub struct Hint {
  /// Text inserted on pick.
  pub text:    String,
  /// Text shown in the widget, when different from `text`.
  pub display: Option<String>,
  pub apply:   Option<HintApply>,
}

impl Hint {
  pub fn new(text: impl Into<String>) -> Self {
    Self {
      text:    text.into(),
      display: None,
      apply:   None,
    }
  }

  pub fn display_text(&self) -> &str {
    self.display.as_deref().unwrap_or(&self.text)
  }
}

impl fmt::Debug for Hint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Hint")
      .field("text", &self.text)
      .field("display", &self.display)
      .field("apply", &self.apply.is_some())
      .finish()
  }
}

impl PartialEq for Hint {
  fn eq(&self, other: &Self) -> bool {
    self.text == other.text && self.display == other.display
  }
}

impl From<&str> for Hint {
  fn from(text: &str) -> Self {
    Hint::new(text)
  }
}

impl From<String> for Hint {
  fn from(text: String) -> Self {
    Hint::new(text)
  }
}

/// An ordered candidate list with the span it replaces.
#[derive(Debug, Clone, PartialEq)]
pub struct HintList {
  pub list: Vec<Hint>,
  pub from: Position,
  pub to:   Position,
}

/// A candidate source: given the buffer and cursor, a list or nothing.
pub trait HintProvider {
  fn hints(&self, buf: &dyn Buffer, pos: Position, config: &HintConfig) -> Option<HintList>;

  /// Whether this provider can complete while a selection exists.
  fn supports_selection(&self) -> bool {
    false
  }
}

/// Chains providers in order and falls back to word lists, mirroring the
/// "auto" resolution: the first provider returning a non-empty list wins;
/// otherwise a configured word list, otherwise words scanned from the
/// buffer.
pub struct AutoHint {
  pub providers: Vec<Box<dyn HintProvider>>,
  pub words:     Option<Vec<String>>,
}

impl AutoHint {
  pub fn new(providers: Vec<Box<dyn HintProvider>>) -> Self {
    Self {
      providers,
      words: None,
    }
  }
}

impl HintProvider for AutoHint {
  fn hints(&self, buf: &dyn Buffer, pos: Position, config: &HintConfig) -> Option<HintList> {
    let selected = buf.something_selected();
    for provider in &self.providers {
      if selected && !provider.supports_selection() {
        continue;
      }
      if let Some(list) = provider.hints(buf, pos, config) {
        if !list.list.is_empty() {
          return Some(list);
        }
      }
    }
    if let Some(word_list) = &self.words {
      let from_list = words::FromList {
        words: word_list.clone(),
      };
      return from_list.hints(buf, pos, config);
    }
    words::AnyWord::default().hints(buf, pos, config)
  }

  fn supports_selection(&self) -> bool {
    true
  }
}

/// A generation-stamped fetch request. The host resolves the provider
/// (possibly asynchronously) and reports back through
/// [`Completion::finish_update`] with the same request; a request superseded
/// by a newer one in the meantime is recognized and dropped.
#[derive(Debug, Clone)]
pub struct HintRequest {
  handle: TaskHandle,
}

impl HintRequest {
  pub fn is_stale(&self) -> bool {
    self.handle.is_canceled()
  }
}

/// What [`Completion::cursor_activity`] decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
  /// The anchor was violated; the session is closed.
  Closed,
  /// A refetch was scheduled; fire it on the next frame tick.
  Scheduled(FrameId),
}

/// What [`Completion::finish_update`] did with a fetch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
  /// Result was for an outdated request; dropped.
  Stale,
  /// The single candidate was applied directly; session closed.
  Applied,
  /// The widget now shows this many candidates.
  Shown(usize),
  /// No candidates; widget hidden, session stays open.
  Empty,
  /// The session is already closed.
  Inactive,
}

/// Commands the host's keymap dispatches into an open widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetCommand {
  /// Move the selection. Single steps wrap at the ends; `paging` steps
  /// clamp instead.
  MoveFocus { delta: isize, paging: bool },
  SetFocus(usize),
  Pick,
  Close,
}

/// The transient candidate widget: list plus selected index.
#[derive(Debug)]
pub struct HintWidget {
  data:       HintList,
  selected:   usize,
  /// Set when a pick was requested while the widget was disabled; the next
  /// fetch result applies it.
  pub picked: bool,
  disabled:   bool,
}

impl HintWidget {
  fn new(data: HintList) -> Self {
    Self {
      data,
      selected: 0,
      picked: false,
      disabled: false,
    }
  }

  pub fn data(&self) -> &HintList {
    &self.data
  }

  pub fn selected(&self) -> usize {
    self.selected
  }

  /// Move the selection to `to`, wrapping past the ends unless
  /// `avoid_wrap`.
  fn change_active(&mut self, to: isize, avoid_wrap: bool) {
    let len = self.data.list.len() as isize;
    if len == 0 {
      return;
    }
    let next = if to >= len {
      if avoid_wrap { len - 1 } else { 0 }
    } else if to < 0 {
      if avoid_wrap { 0 } else { len - 1 }
    } else {
      to
    };
    self.selected = next as usize;
  }
}

/// One live completion interaction. At most one per buffer.
pub struct Completion {
  config:    HintConfig,
  start_pos: Position,
  /// Line length minus selection length at open time; cursor movement must
  /// keep `line_len - cursor_col` equal to `start_len - start_col`.
  start_len: usize,
  requests:  TaskController,
  first:     bool,
  closed:    bool,
  debounce:  FrameDebounce,
  widget:    Option<HintWidget>,
}

impl Completion {
  /// Open a session at the primary caret. Refuses multiple carets, and
  /// selections unless the provider supports them (cross-line selections
  /// never complete).
  pub fn open(buf: &dyn Buffer, config: HintConfig, supports_selection: bool) -> Option<Self> {
    let carets = buf.carets();
    if carets.len() > 1 {
      return None;
    }
    let caret = carets[0];
    if !caret.is_empty() {
      if !supports_selection || caret.head.line != caret.anchor.line {
        return None;
      }
    }

    let start_pos = caret.from();
    let line_len = buf.line(start_pos.line)?.chars().count();
    let selection_len = caret.to().col.saturating_sub(caret.from().col);

    Some(Self {
      config,
      start_pos,
      start_len: line_len - selection_len,
      requests: TaskController::new(),
      first: true,
      closed: false,
      debounce: FrameDebounce::new(),
      widget: None,
    })
  }

  pub fn is_active(&self) -> bool {
    !self.closed
  }

  pub fn widget(&self) -> Option<&HintWidget> {
    self.widget.as_ref()
  }

  /// Start (or restart) a fetch immediately, superseding any in-flight one.
  /// The caller resolves the provider and reports back with the request.
  pub fn update(&mut self) -> HintRequest {
    HintRequest {
      handle: self.requests.restart(),
    }
  }

  /// Re-validate the anchor after a cursor movement.
  pub fn cursor_activity(&mut self, buf: &dyn Buffer) -> Activity {
    if self.closed {
      return Activity::Closed;
    }

    let pos = buf.carets()[0].head;
    let line_len = buf
      .line(pos.line)
      .map_or(0, |line| line.chars().count());

    let moved_off_line = pos.line != self.start_pos.line;
    let edited_elsewhere =
      line_len.wrapping_sub(pos.col) != self.start_len.wrapping_sub(self.start_pos.col);
    let before_anchor = pos.col < self.start_pos.col;
    let closing_char = pos.col == 0
      || buf
        .char_at(pos.with_col(pos.col - 1))
        .is_some_and(|ch| self.config.is_close_char(ch));

    if moved_off_line
      || edited_elsewhere
      || before_anchor
      || buf.something_selected()
      || closing_char
    {
      self.close();
      return Activity::Closed;
    }

    if let Some(widget) = &mut self.widget {
      widget.disabled = true;
    }
    Activity::Scheduled(self.debounce.schedule())
  }

  /// The host's frame tick fired. Returns the fetch to run now, if this
  /// frame is still the live one.
  pub fn frame(&mut self, id: FrameId) -> Option<HintRequest> {
    if self.closed || !self.debounce.fire(id) {
      return None;
    }
    Some(self.update())
  }

  /// Deliver a fetch result. Superseded requests are dropped; a single
  /// candidate is applied directly on the first fetch (or after a
  /// disabled-widget pick) when `complete_single` is on.
  pub fn finish_update(
    &mut self,
    buf: &mut dyn Buffer,
    request: HintRequest,
    data: Option<HintList>,
  ) -> UpdateOutcome {
    if self.closed {
      return UpdateOutcome::Inactive;
    }
    if request.is_stale() {
      tracing::trace!("dropping stale completion result");
      return UpdateOutcome::Stale;
    }

    let first = std::mem::take(&mut self.first);
    let picked =
      self.widget.as_ref().is_some_and(|widget| widget.picked)
        || (first && self.config.complete_single);
    self.widget = None;

    match data {
      Some(list) if !list.list.is_empty() => {
        if picked && list.list.len() == 1 {
          self.apply(buf, &list, 0);
          UpdateOutcome::Applied
        } else {
          let shown = list.list.len();
          self.widget = Some(HintWidget::new(list));
          UpdateOutcome::Shown(shown)
        }
      },
      _ => UpdateOutcome::Empty,
    }
  }

  /// Dispatch a widget command. `Ok(false)` means the command was not
  /// consumed and should fall through to the host's default binding.
  pub fn handle(&mut self, buf: &mut dyn Buffer, command: WidgetCommand) -> Result<bool> {
    let Some(widget) = &mut self.widget else {
      return Ok(false);
    };
    if widget.disabled {
      // While waiting for a refetch only a pick registers, applied when
      // the result lands.
      if command == WidgetCommand::Pick {
        widget.picked = true;
        return Ok(true);
      }
      return Ok(false);
    }

    match command {
      WidgetCommand::MoveFocus { delta, paging } => {
        let to = widget.selected as isize + delta;
        widget.change_active(to, paging);
      },
      WidgetCommand::SetFocus(index) => {
        widget.change_active(index as isize, true);
      },
      WidgetCommand::Pick => {
        let selected = widget.selected;
        self.pick(buf, selected)?;
      },
      WidgetCommand::Close => self.close(),
    }
    Ok(true)
  }

  /// Replace the anchor span with candidate `index` and close.
  pub fn pick(&mut self, buf: &mut dyn Buffer, index: usize) -> Result<()> {
    let Some(widget) = self.widget.take() else {
      return Err(HintError::NoWidget);
    };
    let len = widget.data.list.len();
    if index >= len {
      self.widget = Some(widget);
      return Err(HintError::CandidateOutOfBounds { index, len });
    }
    self.apply(buf, &widget.data, index);
    Ok(())
  }

  fn apply(&mut self, buf: &mut dyn Buffer, list: &HintList, index: usize) {
    let hint = &list.list[index];
    if let Some(apply) = &hint.apply {
      apply(buf, list, index);
    } else {
      let end = buf.replace_range(&hint.text, list.from, list.to);
      buf.set_carets(smallvec::smallvec![Caret::point(end)]);
    }
    tracing::debug!(text = %hint.text, "completion picked");
    self.close();
  }

  /// Close the session. Any in-flight fetch becomes a no-op.
  pub fn close(&mut self) {
    if self.closed {
      return;
    }
    self.closed = true;
    self.requests.cancel();
    self.widget = None;
    self.debounce.cancel();
  }
}

#[cfg(test)]
mod test {
  use smallvec::smallvec;

  use super::*;
  use crate::buffer::{
    LineBuffer,
    PlainTokenizer,
  };

  fn word_buf(text: &str, col: usize) -> LineBuffer<PlainTokenizer> {
    let mut buf = LineBuffer::from_str(text);
    buf.set_carets(smallvec![Caret::point(Position::new(0, col))]);
    buf
  }

  fn fetch(buf: &LineBuffer<PlainTokenizer>, words: &[&str]) -> Option<HintList> {
    let provider = words::FromList {
      words: words.iter().map(|w| w.to_string()).collect(),
    };
    provider.hints(buf, buf.carets()[0].head, &HintConfig::default())
  }

  #[test]
  fn test_prefix_completion_and_pick() {
    let mut buf = word_buf("foo", 3);
    let mut session = Completion::open(&buf, HintConfig::default(), false).unwrap();
    let request = session.update();

    let data = fetch(&buf, &["foo", "foobar", "bar"]);
    let list = data.clone().unwrap();
    assert_eq!(
      list.list.iter().map(|h| h.text.as_str()).collect::<Vec<_>>(),
      vec!["foo", "foobar"]
    );

    let outcome = session.finish_update(&mut buf, request, data);
    assert_eq!(outcome, UpdateOutcome::Shown(2));

    session.pick(&mut buf, 0).unwrap();
    assert_eq!(buf.text(), "foo");
    assert!(!session.is_active());
    assert_eq!(buf.carets()[0].head, Position::new(0, 3));
  }

  #[test]
  fn test_complete_single_applies_immediately() {
    let mut buf = word_buf("foob", 4);
    let mut session = Completion::open(&buf, HintConfig::default(), false).unwrap();
    let request = session.update();
    let data = fetch(&buf, &["foo", "foobar", "bar"]);

    let outcome = session.finish_update(&mut buf, request, data);
    assert_eq!(outcome, UpdateOutcome::Applied);
    assert_eq!(buf.text(), "foobar");
    assert!(!session.is_active());
  }

  #[test]
  fn test_stale_async_result_is_dropped() {
    let mut buf = word_buf("foo", 3);
    let mut session = Completion::open(&buf, HintConfig::default(), false).unwrap();

    // Two requests race; the older one resolves last.
    let older = session.update();
    let newer = session.update();

    let newer_data = fetch(&buf, &["foo", "foobar"]);
    assert_eq!(
      session.finish_update(&mut buf, newer, newer_data),
      UpdateOutcome::Shown(2)
    );

    let older_data = fetch(&buf, &["stale"]);
    assert_eq!(
      session.finish_update(&mut buf, older, older_data),
      UpdateOutcome::Stale
    );
    // The displayed list still reflects the newest request.
    assert_eq!(session.widget().unwrap().data().list.len(), 2);
  }

  #[test]
  fn test_cursor_activity_keeps_session_inside_anchor() {
    let mut buf = word_buf("foo", 3);
    let mut session = Completion::open(&buf, HintConfig::default(), false).unwrap();

    // Typing one more word char keeps the distances consistent.
    buf.replace_range("b", Position::new(0, 3), Position::new(0, 3));
    buf.set_carets(smallvec![Caret::point(Position::new(0, 4))]);
    assert!(matches!(
      session.cursor_activity(&buf),
      Activity::Scheduled(_)
    ));
    assert!(session.is_active());
  }

  #[test]
  fn test_cursor_activity_closes_on_violations() {
    // Moving before the anchor start closes.
    let buf = word_buf("foo", 3);
    let mut session = Completion::open(&buf, HintConfig::default(), false).unwrap();
    let mut moved = word_buf("foo", 1);
    moved.set_carets(smallvec![Caret::point(Position::new(0, 1))]);
    assert_eq!(session.cursor_activity(&moved), Activity::Closed);
    assert!(!session.is_active());

    // A close character right before the cursor closes.
    let mut buf = word_buf("foo", 3);
    let mut session = Completion::open(&buf, HintConfig::default(), false).unwrap();
    buf.replace_range(";", Position::new(0, 3), Position::new(0, 3));
    buf.set_carets(smallvec![Caret::point(Position::new(0, 4))]);
    assert_eq!(session.cursor_activity(&buf), Activity::Closed);
  }

  #[test]
  fn test_debounced_refetch_fires_latest_only() {
    let mut buf = word_buf("foo", 3);
    let mut session = Completion::open(&buf, HintConfig::default(), false).unwrap();
    let request = session.update();
    let data = fetch(&buf, &["foo", "foobar"]);
    session.finish_update(&mut buf, request, data);

    let Activity::Scheduled(first) = session.cursor_activity(&buf) else {
      panic!("expected scheduled refetch");
    };
    let Activity::Scheduled(second) = session.cursor_activity(&buf) else {
      panic!("expected scheduled refetch");
    };

    assert!(session.frame(first).is_none());
    assert!(session.frame(second).is_some());
  }

  #[test]
  fn test_widget_navigation_wraps_and_clamps() {
    let mut buf = word_buf("foo", 3);
    let mut session = Completion::open(&buf, HintConfig::default(), false).unwrap();
    let request = session.update();
    let data = fetch(&buf, &["foo", "foobar", "foot"]);
    session.finish_update(&mut buf, request, data);

    // Single steps wrap.
    session
      .handle(&mut buf, WidgetCommand::MoveFocus {
        delta:  -1,
        paging: false,
      })
      .unwrap();
    assert_eq!(session.widget().unwrap().selected(), 2);
    session
      .handle(&mut buf, WidgetCommand::MoveFocus {
        delta:  1,
        paging: false,
      })
      .unwrap();
    assert_eq!(session.widget().unwrap().selected(), 0);

    // Page steps clamp.
    session
      .handle(&mut buf, WidgetCommand::MoveFocus {
        delta:  10,
        paging: true,
      })
      .unwrap();
    assert_eq!(session.widget().unwrap().selected(), 2);
    session
      .handle(&mut buf, WidgetCommand::MoveFocus {
        delta:  -10,
        paging: true,
      })
      .unwrap();
    assert_eq!(session.widget().unwrap().selected(), 0);
  }

  #[test]
  fn test_custom_apply_hook() {
    let mut buf = word_buf("fo", 2);
    let mut session = Completion::open(&buf, HintConfig::default(), false).unwrap();
    let request = session.update();

    let hint = Hint {
      text:    "four".to_string(),
      display: None,
      apply:   Some(Rc::new(|buf: &mut dyn Buffer, list: &HintList, _| {
        let end = buf.replace_range("4", list.from, list.to);
        buf.set_carets(smallvec![Caret::point(end)]);
      })),
    };
    let data = HintList {
      list: vec![hint, Hint::new("fold")],
      from: Position::new(0, 0),
      to:   Position::new(0, 2),
    };

    session.finish_update(&mut buf, request, Some(data));
    session.pick(&mut buf, 0).unwrap();
    assert_eq!(buf.text(), "4");
  }

  #[test]
  fn test_open_refuses_multi_caret_and_selection() {
    let mut buf = word_buf("foo bar", 3);
    buf.set_carets(smallvec![
      Caret::point(Position::new(0, 3)),
      Caret::point(Position::new(0, 7))
    ]);
    assert!(Completion::open(&buf, HintConfig::default(), false).is_none());

    let mut buf = word_buf("foo bar", 3);
    buf.set_carets(smallvec![Caret::new(
      Position::new(0, 0),
      Position::new(0, 3)
    )]);
    assert!(Completion::open(&buf, HintConfig::default(), false).is_none());
    assert!(Completion::open(&buf, HintConfig::default(), true).is_some());
  }
}
