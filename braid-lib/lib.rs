//! Bracket/tag matching and scan-based completion for line-based buffers.
//!
//! The host editor supplies a [`buffer::Buffer`] (line access, token
//! classification, carets, replace and mark operations); this crate supplies
//! the algorithms on top of it:
//!
//! - [`scan`] — direction-aware delimiter scanning with nesting stacks and
//!   scan budgets.
//! - [`highlight`] — bracket and tag match highlighting controllers driven
//!   by cursor movement.
//! - [`tag`] — markup tag structure resolution (matching/enclosing tags,
//!   self-closing detection, folding, closing-tag scans).
//! - [`close_brackets`] — typing-time bracket pairing (insert, skip,
//!   surround, explode, pair deletion).
//! - [`close_tag`] — typing-time tag auto-closing on `>` and `/`.
//! - [`hint`] — completion sessions, the selection widget state machine, and
//!   the candidate providers (schema, script, css, word lists).
//!
//! Everything runs single-threaded and cooperative: the host calls in on
//! cursor movement, keypresses, and frame ticks, and the core returns
//! outcomes instead of scheduling work of its own.

use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod buffer;
pub mod close_brackets;
pub mod close_tag;
pub mod config;
pub mod highlight;
pub mod hint;
pub mod position;
pub mod scan;
pub mod tag;

pub type Tendril = SmartString<LazyCompact>;

/// What a typed-character handler did with the key.
///
/// `Pass` means the handler declined (the host should perform the default
/// insertion); `Handled` means the buffer was already edited. Handlers never
/// partially apply: a multi-caret edit either happens for every caret or the
/// whole keypress passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
  Handled,
  Pass,
}

impl HandlerOutcome {
  pub fn is_handled(self) -> bool {
    matches!(self, HandlerOutcome::Handled)
  }
}
