//! Per-action timers with cancellation and claim-on-fire.
//!
//! Every action owns at most one live timer. A timer is an OS thread waiting
//! on a cancellation channel with a timeout; the table keeps the sender, so
//! removing or replacing the entry disconnects the channel and cancels the
//! wait. When the wait times out the thread must claim its entry
//! under the table lock before running; a timer that lost a race to a cancel
//! or a replacement never runs its task.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use log::trace;
use parking_lot::{Mutex, MutexGuard};

/// What a pending timer will do when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    DelayedPress,
    DelayedHold,
    ToggleOff,
    TapWindow,
    Repeat,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimerKind::DelayedPress => "delayed_press",
            TimerKind::DelayedHold => "delayed_hold",
            TimerKind::ToggleOff => "toggle_off",
            TimerKind::TapWindow => "tap_window",
            TimerKind::Repeat => "repeat",
        };
        f.write_str(name)
    }
}

struct TimerEntry {
    id: u64,
    kind: TimerKind,
    // Dropping the sender wakes the timer thread as cancelled
    _cancel: Sender<()>,
}

type TimerMap = HashMap<String, TimerEntry>;

/// A fired timer's claim on its entry.
///
/// Holds the timer table lock; whatever the task does before dropping it is
/// atomic with respect to `cancel`, `cancel_kind` and new schedules.
pub struct Claimed<'a> {
    _timers: MutexGuard<'a, TimerMap>,
    kind: TimerKind,
}

impl Claimed<'_> {
    pub fn kind(&self) -> TimerKind {
        self.kind
    }
}

#[derive(Default)]
pub struct Scheduler {
    timers: Mutex<TimerMap>,
    next_id: AtomicU64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `entry`, replacing (and so cancelling) any previous timer
    fn install(&self, action: &str, kind: TimerKind, cancel: Sender<()>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let previous = self.timers.lock().insert(
            action.to_string(),
            TimerEntry {
                id,
                kind,
                _cancel: cancel,
            },
        );
        if let Some(previous) = previous {
            trace!("timer {} for '{}' replaced by {}", previous.kind, action, kind);
        }
        id
    }

    /// Remove the timer `id` for `action`; a newer timer is left alone
    pub(crate) fn uninstall(&self, action: &str, id: u64) -> bool {
        let mut timers = self.timers.lock();
        if timers.get(action).is_some_and(|entry| entry.id == id) {
            timers.remove(action);
            return true;
        }
        false
    }

    /// Run `task` once after `delay` unless cancelled or replaced first
    pub fn schedule_once<F>(
        self: &Arc<Self>,
        action: &str,
        kind: TimerKind,
        delay: Duration,
        task: F,
    ) -> std::io::Result<()>
    where
        F: for<'a> FnOnce(Claimed<'a>) + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let id = self.install(action, kind, cancel_tx);
        let scheduler = Arc::clone(self);
        let owned = action.to_string();

        let spawned = thread::Builder::new()
            .name(format!("deckbind-timer-{}", kind))
            .spawn(move || match cancel_rx.recv_timeout(delay) {
                Err(RecvTimeoutError::Timeout) => match scheduler.claim(&owned, id) {
                    Some(claimed) => {
                        trace!("timer {} for '{}' fired", kind, owned);
                        task(claimed);
                    }
                    None => trace!("timer {} for '{}' lost its claim", kind, owned),
                },
                _ => trace!("timer {} for '{}' cancelled", kind, owned),
            });

        if let Err(e) = spawned {
            self.uninstall(action, id);
            return Err(e);
        }
        Ok(())
    }

    /// Run `task` after `initial`, then every `interval`, until cancelled,
    /// replaced, or the task returns `false`. Returns the timer id.
    pub fn schedule_repeating<F>(
        self: &Arc<Self>,
        action: &str,
        kind: TimerKind,
        initial: Duration,
        interval: Duration,
        mut task: F,
    ) -> std::io::Result<u64>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let id = self.install(action, kind, cancel_tx);
        let scheduler = Arc::clone(self);
        let owned = action.to_string();

        let spawned = thread::Builder::new()
            .name(format!("deckbind-timer-{}", kind))
            .spawn(move || {
                let mut wait = initial;
                loop {
                    match cancel_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            if !scheduler.is_current(&owned, id) {
                                break;
                            }
                            if !task() {
                                scheduler.uninstall(&owned, id);
                                break;
                            }
                            wait = interval;
                        }
                        _ => break,
                    }
                }
                trace!("timer {} for '{}' stopped", kind, owned);
            });

        if let Err(e) = spawned {
            self.uninstall(action, id);
            return Err(e);
        }
        Ok(id)
    }

    fn claim(&self, action: &str, id: u64) -> Option<Claimed<'_>> {
        let mut timers = self.timers.lock();
        let kind = match timers.get(action) {
            Some(entry) if entry.id == id => entry.kind,
            _ => return None,
        };
        timers.remove(action);
        Some(Claimed {
            _timers: timers,
            kind,
        })
    }

    fn is_current(&self, action: &str, id: u64) -> bool {
        self.timers
            .lock()
            .get(action)
            .is_some_and(|entry| entry.id == id)
    }

    /// Cancel whatever is pending for `action`
    pub fn cancel(&self, action: &str) -> Option<TimerKind> {
        let removed = self.timers.lock().remove(action).map(|entry| entry.kind);
        if let Some(kind) = removed {
            trace!("timer {} for '{}' cancelled on request", kind, action);
        }
        removed
    }

    /// Cancel the pending timer only if it is one of `kinds`
    pub fn cancel_kind(&self, action: &str, kinds: &[TimerKind]) -> Option<TimerKind> {
        let mut timers = self.timers.lock();
        let kind = timers.get(action).map(|entry| entry.kind)?;
        if !kinds.contains(&kind) {
            return None;
        }
        timers.remove(action);
        Some(kind)
    }

    pub fn pending(&self, action: &str) -> Option<TimerKind> {
        self.timers.lock().get(action).map(|entry| entry.kind)
    }

    /// Cancel every timer; returns how many were pending
    pub fn clear(&self) -> usize {
        let mut timers = self.timers.lock();
        let count = timers.len();
        timers.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.timers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let c = Arc::new(AtomicUsize::new(0));
        (Arc::clone(&c), c)
    }

    #[test]
    fn test_once_fires_and_clears_entry() {
        let scheduler = Arc::new(Scheduler::new());
        let (seen, hits) = counter();
        let delay = Duration::from_millis(10);
        scheduler
            .schedule_once("jump", TimerKind::DelayedPress, delay, move |claimed| {
                assert_eq!(claimed.kind(), TimerKind::DelayedPress);
                hits.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(scheduler.pending("jump"), Some(TimerKind::DelayedPress));

        thread::sleep(Duration::from_millis(150));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending("jump"), None);
    }

    #[test]
    fn test_cancel_before_fire() {
        let scheduler = Arc::new(Scheduler::new());
        let (seen, hits) = counter();
        scheduler
            .schedule_once("jump", TimerKind::DelayedPress, Duration::from_millis(80), move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(scheduler.cancel("jump"), Some(TimerKind::DelayedPress));
        assert_eq!(scheduler.cancel("jump"), None);

        thread::sleep(Duration::from_millis(200));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_replace_cancels_previous() {
        let scheduler = Arc::new(Scheduler::new());
        let (first_seen, first) = counter();
        let (second_seen, second) = counter();
        scheduler
            .schedule_once("jump", TimerKind::DelayedPress, Duration::from_millis(40), move |_| {
                first.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        scheduler
            .schedule_once("jump", TimerKind::DelayedHold, Duration::from_millis(40), move |_| {
                second.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(scheduler.len(), 1);

        thread::sleep(Duration::from_millis(250));
        assert_eq!(first_seen.load(Ordering::SeqCst), 0);
        assert_eq!(second_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_kind_leaves_other_kinds() {
        let scheduler = Arc::new(Scheduler::new());
        scheduler
            .schedule_once("boost", TimerKind::ToggleOff, Duration::from_secs(5), |_| {})
            .unwrap();
        assert_eq!(scheduler.cancel_kind("boost", &[TimerKind::Repeat]), None);
        assert_eq!(scheduler.pending("boost"), Some(TimerKind::ToggleOff));
        assert_eq!(
            scheduler.cancel_kind("boost", &[TimerKind::ToggleOff]),
            Some(TimerKind::ToggleOff)
        );
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_repeating_runs_until_cancelled() {
        let scheduler = Arc::new(Scheduler::new());
        let (seen, hits) = counter();
        scheduler
            .schedule_repeating(
                "strafe",
                TimerKind::Repeat,
                Duration::from_millis(5),
                Duration::from_millis(5),
                move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                    true
                },
            )
            .unwrap();

        thread::sleep(Duration::from_millis(120));
        assert_eq!(scheduler.cancel("strafe"), Some(TimerKind::Repeat));
        let after_cancel = seen.load(Ordering::SeqCst);
        assert!(after_cancel >= 2);

        thread::sleep(Duration::from_millis(80));
        // at most one tick was already past its check when we cancelled
        assert!(seen.load(Ordering::SeqCst) <= after_cancel + 1);
    }

    #[test]
    fn test_repeating_stops_when_task_declines() {
        let scheduler = Arc::new(Scheduler::new());
        let (seen, hits) = counter();
        scheduler
            .schedule_repeating(
                "strafe",
                TimerKind::Repeat,
                Duration::from_millis(5),
                Duration::from_millis(5),
                move || hits.fetch_add(1, Ordering::SeqCst) < 2,
            )
            .unwrap();

        thread::sleep(Duration::from_millis(150));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.pending("strafe"), None);
    }

    #[test]
    fn test_clear_cancels_everything() {
        let scheduler = Arc::new(Scheduler::new());
        let (seen, hits) = counter();
        for action in ["a", "b", "c"] {
            let hits = Arc::clone(&hits);
            let delay = Duration::from_millis(60);
            scheduler
                .schedule_once(action, TimerKind::DelayedPress, delay, move |_| {
                    hits.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        assert_eq!(scheduler.clear(), 3);
        thread::sleep(Duration::from_millis(200));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }
}
