// Deckbind Multi-Tap Windows
// Tap counting for double-tap style activation

use std::collections::HashMap;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, Default)]
struct TapWindow {
    count: u32,
    fired: bool,
}

/// What a registered tap did to its window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// First tap; a new window must be armed
    Opened,
    /// Counted, not enough yet
    Counted(u32),
    /// Reached the required count; `close` means the window is gone
    Fired { close: bool },
    /// Window already fired and blocks further taps until it expires
    Swallowed,
}

#[derive(Debug, Default)]
pub struct TapWindows {
    windows: Mutex<HashMap<String, TapWindow>>,
}

impl TapWindows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one tap of `action` toward `required` (at least 2)
    pub fn register(&self, action: &str, required: u32, block: bool) -> TapOutcome {
        let mut windows = self.windows.lock();
        let Some(window) = windows.get_mut(action) else {
            windows.insert(
                action.to_string(),
                TapWindow {
                    count: 1,
                    fired: false,
                },
            );
            return TapOutcome::Opened;
        };

        if window.fired {
            return TapOutcome::Swallowed;
        }
        window.count += 1;
        if window.count < required {
            return TapOutcome::Counted(window.count);
        }
        if block {
            window.fired = true;
            TapOutcome::Fired { close: false }
        } else {
            windows.remove(action);
            TapOutcome::Fired { close: true }
        }
    }

    /// The window timed out
    pub fn expire(&self, action: &str) -> bool {
        self.windows.lock().remove(action).is_some()
    }

    pub fn is_open(&self, action: &str) -> bool {
        self.windows.lock().contains_key(action)
    }

    pub fn clear(&self) {
        self.windows.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_tap_nonblocking_closes() {
        let taps = TapWindows::new();
        assert_eq!(taps.register("ping", 2, false), TapOutcome::Opened);
        assert_eq!(taps.register("ping", 2, false), TapOutcome::Fired { close: true });
        assert!(!taps.is_open("ping"));
        assert_eq!(taps.register("ping", 2, false), TapOutcome::Opened);
    }

    #[test]
    fn test_double_tap_blocking_swallows_until_expiry() {
        let taps = TapWindows::new();
        taps.register("ping", 2, true);
        assert_eq!(taps.register("ping", 2, true), TapOutcome::Fired { close: false });
        assert_eq!(taps.register("ping", 2, true), TapOutcome::Swallowed);
        assert!(taps.expire("ping"));
        assert_eq!(taps.register("ping", 2, true), TapOutcome::Opened);
    }

    #[test]
    fn test_triple_tap_counts() {
        let taps = TapWindows::new();
        taps.register("salute", 3, false);
        assert_eq!(taps.register("salute", 3, false), TapOutcome::Counted(2));
        assert_eq!(taps.register("salute", 3, false), TapOutcome::Fired { close: true });
    }

    #[test]
    fn test_windows_are_per_action() {
        let taps = TapWindows::new();
        taps.register("a", 2, true);
        assert_eq!(taps.register("b", 2, true), TapOutcome::Opened);
        taps.clear();
        assert!(!taps.is_open("a"));
    }
}
