//! Re-entrant modify lock with bulk-modification bookkeeping.
//!
//! One thread holds the gate at a time. The holder may enter again without
//! blocking; the gate opens once every entry has been matched by an exit.
//! Bulk entries additionally suppress per-operation notifications and record
//! whether anything was suppressed, so the outermost bulk exit can report a
//! single content change.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use geofeature_core::StoreError;

#[derive(Debug, Default)]
struct GateState {
    holder: Option<ThreadId>,
    depth: usize,
    bulk_depth: usize,
    pending: bool,
}

/// What the caller must do after leaving the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Release {
    /// Nothing further.
    Quiet,
    /// The outermost bulk ended after suppressing notifications.
    FlushContentChanged,
}

#[derive(Debug, Default)]
pub(crate) struct ModifyGate {
    state: Mutex<GateState>,
    opened: Condvar,
}

impl ModifyGate {
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enter the gate, waiting at most `timeout` when another thread holds
    /// it.
    pub(crate) fn enter(&self, bulk: bool, timeout: Option<Duration>) -> Result<(), StoreError> {
        let me = thread::current().id();
        let deadline = timeout.and_then(|limit| Instant::now().checked_add(limit));
        let mut state = self.lock();
        while state.holder.is_some_and(|holder| holder != me) {
            state = match (timeout, deadline) {
                (None, _) => self.opened.wait(state).unwrap_or_else(PoisonError::into_inner),
                (Some(_), Some(until)) => {
                    let remaining = until.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(StoreError::Interrupted);
                    }
                    self.opened
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                // The deadline overflowed: wait as if unbounded.
                (Some(_), None) => self.opened.wait(state).unwrap_or_else(PoisonError::into_inner),
            };
        }
        state.holder = Some(me);
        state.depth += 1;
        if bulk {
            state.bulk_depth += 1;
        }
        Ok(())
    }

    /// Leave the gate once.
    ///
    /// Fails without changing anything when the calling thread is not the
    /// holder, or when `bulk` is set and no bulk entry is open.
    pub(crate) fn exit(&self, bulk: bool) -> Result<Release, StoreError> {
        let me = thread::current().id();
        let mut state = self.lock();
        if state.holder != Some(me) {
            return Err(StoreError::IllegalState {
                reason: "the modify lock is not held by this thread",
            });
        }
        if bulk && state.bulk_depth == 0 {
            return Err(StoreError::IllegalState {
                reason: "no bulk modification is in progress",
            });
        }
        let mut release = Release::Quiet;
        if bulk {
            state.bulk_depth -= 1;
            if state.bulk_depth == 0 && std::mem::take(&mut state.pending) {
                release = Release::FlushContentChanged;
            }
        }
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.holder = None;
            drop(state);
            self.opened.notify_all();
        }
        Ok(release)
    }

    /// Whether notifications are currently suppressed. Records that one was,
    /// so the enclosing bulk reports a content change when it ends.
    pub(crate) fn suppress(&self) -> bool {
        let mut state = self.lock();
        if state.bulk_depth > 0 {
            state.pending = true;
            true
        } else {
            false
        }
    }

    /// Whether the calling thread has a bulk modification open.
    pub(crate) fn in_bulk(&self) -> bool {
        let state = self.lock();
        state.bulk_depth > 0 && state.holder == Some(thread::current().id())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use rstest::rstest;

    #[rstest]
    fn holder_may_reenter() {
        let gate = ModifyGate::default();
        gate.enter(false, None).expect("first entry");
        gate.enter(false, None).expect("nested entry");
        assert_eq!(gate.exit(false), Ok(Release::Quiet));
        assert_eq!(gate.exit(false), Ok(Release::Quiet));
        assert!(gate.exit(false).is_err());
    }

    #[rstest]
    fn only_the_outermost_bulk_flushes() {
        let gate = ModifyGate::default();
        gate.enter(true, None).expect("outer bulk");
        gate.enter(true, None).expect("inner bulk");
        assert!(gate.in_bulk());
        assert!(gate.suppress());
        assert_eq!(gate.exit(true), Ok(Release::Quiet));
        assert_eq!(gate.exit(true), Ok(Release::FlushContentChanged));
        assert!(!gate.in_bulk());
        assert!(!gate.suppress());
    }

    #[rstest]
    fn quiet_bulk_does_not_flush() {
        let gate = ModifyGate::default();
        gate.enter(true, None).expect("bulk");
        assert_eq!(gate.exit(true), Ok(Release::Quiet));
    }

    #[rstest]
    fn ending_a_bulk_that_never_began_fails() {
        let gate = ModifyGate::default();
        gate.enter(false, None).expect("entry");
        assert!(matches!(
            gate.exit(true),
            Err(StoreError::IllegalState { .. })
        ));
        assert_eq!(gate.exit(false), Ok(Release::Quiet));
    }

    #[rstest]
    fn other_threads_time_out_while_held() {
        let gate = Arc::new(ModifyGate::default());
        gate.enter(true, None).expect("bulk");
        let contender = Arc::clone(&gate);
        let outcome = thread::spawn(move || {
            let entered = contender.enter(false, Some(Duration::from_millis(20)));
            let exited = contender.exit(true);
            (entered, exited, contender.in_bulk())
        })
        .join()
        .expect("contender thread");
        assert_eq!(outcome.0, Err(StoreError::Interrupted));
        assert!(!outcome.2);
        assert!(gate.in_bulk());
        assert!(matches!(outcome.1, Err(StoreError::IllegalState { .. })));
        assert_eq!(gate.exit(true), Ok(Release::Quiet));
    }

    #[rstest]
    fn waiters_proceed_once_released() {
        let gate = Arc::new(ModifyGate::default());
        gate.enter(false, None).expect("entry");
        let contender = Arc::clone(&gate);
        let handle = thread::spawn(move || {
            contender.enter(false, Some(Duration::from_secs(5)))?;
            contender.exit(false)
        });
        thread::sleep(Duration::from_millis(10));
        assert_eq!(gate.exit(false), Ok(Release::Quiet));
        assert_eq!(handle.join().expect("contender thread"), Ok(Release::Quiet));
    }
}
