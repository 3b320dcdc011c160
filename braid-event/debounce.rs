//! Frame-granularity debouncing for host-driven refetches.
//!
//! The original completion flow defers candidate refetches to the next
//! animation frame: every cursor movement cancels the previously scheduled
//! refetch and schedules a fresh one, so at most one fetch runs per frame no
//! matter how fast the user types. This module keeps that discipline as a
//! plain state machine; the host owns the actual timer/frame source and
//! reports back with the token it was given.

/// Token identifying one scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameId(u64);

/// Debounce state for a single consumer.
///
/// `schedule` supersedes any previously scheduled callback. When the host's
/// frame fires it calls [`fire`](FrameDebounce::fire) with the token it got
/// from `schedule`; a `false` return means the callback was superseded or
/// canceled in the meantime and must not run.
#[derive(Debug, Default)]
pub struct FrameDebounce {
  next:      u64,
  scheduled: Option<FrameId>,
}

impl FrameDebounce {
  pub fn new() -> Self {
    Self::default()
  }

  /// Schedule a callback for the next frame, superseding any pending one.
  pub fn schedule(&mut self) -> FrameId {
    self.next += 1;
    let id = FrameId(self.next);
    if let Some(stale) = self.scheduled.replace(id) {
      tracing::trace!("frame debounce superseding {:?}", stale);
    }
    id
  }

  /// Drop the pending callback, if any.
  pub fn cancel(&mut self) {
    self.scheduled = None;
  }

  pub fn is_scheduled(&self) -> bool {
    self.scheduled.is_some()
  }

  /// Report that the host's frame fired for `id`. Returns whether the
  /// callback is still the live one and should run now.
  pub fn fire(&mut self, id: FrameId) -> bool {
    if self.scheduled == Some(id) {
      self.scheduled = None;
      true
    } else {
      false
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_fire_runs_latest_only() {
    let mut debounce = FrameDebounce::new();
    let first = debounce.schedule();
    let second = debounce.schedule();

    assert!(!debounce.fire(first));
    assert!(debounce.fire(second));
    // Firing twice is a no-op.
    assert!(!debounce.fire(second));
  }

  #[test]
  fn test_cancel_drops_pending() {
    let mut debounce = FrameDebounce::new();
    let id = debounce.schedule();
    assert!(debounce.is_scheduled());

    debounce.cancel();
    assert!(!debounce.is_scheduled());
    assert!(!debounce.fire(id));
  }
}
