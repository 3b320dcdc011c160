//! Cooperative scheduling utilities for the matching/completion core.
//!
//! Everything here is driven by the host: the core never assumes a specific
//! event loop, only that the host calls back on the relevant transitions
//! (frame ticks, async provider results). What this crate supplies is the
//! bookkeeping those callbacks need — generation counters that let stale
//! results be recognized and dropped, and a debounce state machine keyed to
//! the host's frame ticks.

use std::sync::{
  Arc,
  atomic::{
    AtomicU64,
    Ordering,
  },
};

pub mod debounce;

pub use debounce::{
  FrameDebounce,
  FrameId,
};

/// Issues generation-stamped handles for cancelable work.
///
/// Each [`restart`](TaskController::restart) invalidates every handle issued
/// before it; [`cancel`](TaskController::cancel) invalidates all outstanding
/// handles without issuing a new one. A callback holding a stale handle sees
/// [`TaskHandle::is_canceled`] and becomes a no-op.
#[derive(Debug, Clone)]
pub struct TaskController {
  generation: Arc<AtomicU64>,
}

impl TaskController {
  pub fn new() -> Self {
    Self {
      generation: Arc::new(AtomicU64::new(0)),
    }
  }

  /// Cancel outstanding work and return a handle for the next round.
  pub fn restart(&self) -> TaskHandle {
    let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
    TaskHandle {
      generation,
      current: Arc::clone(&self.generation),
    }
  }

  /// Cancel outstanding work without starting a new round.
  pub fn cancel(&self) {
    self.generation.fetch_add(1, Ordering::Relaxed);
  }
}

impl Default for TaskController {
  fn default() -> Self {
    Self::new()
  }
}

/// A handle pinned to one generation of a [`TaskController`].
#[derive(Debug, Clone)]
pub struct TaskHandle {
  generation: u64,
  current:    Arc<AtomicU64>,
}

impl TaskHandle {
  pub fn is_canceled(&self) -> bool {
    self.current.load(Ordering::Relaxed) != self.generation
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_restart_invalidates_previous_handles() {
    let controller = TaskController::new();
    let first = controller.restart();
    assert!(!first.is_canceled());

    let second = controller.restart();
    assert!(first.is_canceled());
    assert!(!second.is_canceled());
  }

  #[test]
  fn test_cancel_invalidates_without_new_round() {
    let controller = TaskController::new();
    let handle = controller.restart();
    controller.cancel();
    assert!(handle.is_canceled());
  }
}
