// Deckbind Hold State
// Which actions currently hold their input down

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::input::ParsedInput;

/// One held action.
///
/// `gate` is locked while the hold's presses are being emitted, so a stop
/// that removes the entry mid-press waits before emitting its releases.
#[derive(Debug, Clone)]
pub struct HoldEntry {
    pub input: ParsedInput,
    pub started: Instant,
    pub(crate) gate: Arc<Mutex<()>>,
}

impl HoldEntry {
    pub(crate) fn new(input: ParsedInput, gate: Arc<Mutex<()>>) -> Self {
        Self {
            input,
            started: Instant::now(),
            gate,
        }
    }
}

/// Action name -> hold entry; at most one entry per action
#[derive(Debug, Default)]
pub struct HoldTable {
    entries: Mutex<HashMap<String, HoldEntry>>,
}

impl HoldTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the action is already holding
    pub fn insert_if_absent(&self, action: &str, entry: HoldEntry) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains_key(action) {
            return false;
        }
        entries.insert(action.to_string(), entry);
        true
    }

    pub fn remove(&self, action: &str) -> Option<HoldEntry> {
        self.entries.lock().remove(action)
    }

    /// Remove only if the entry is the one guarded by `gate`
    pub(crate) fn remove_if_gate(&self, action: &str, gate: &Arc<Mutex<()>>) -> bool {
        let mut entries = self.entries.lock();
        if entries
            .get(action)
            .is_some_and(|entry| Arc::ptr_eq(&entry.gate, gate))
        {
            entries.remove(action);
            return true;
        }
        false
    }

    /// Whether `action` is still held by the entry guarded by `gate`
    pub(crate) fn holds_gate(&self, action: &str, gate: &Arc<Mutex<()>>) -> bool {
        self.entries
            .lock()
            .get(action)
            .is_some_and(|entry| Arc::ptr_eq(&entry.gate, gate))
    }

    pub fn contains(&self, action: &str) -> bool {
        self.entries.lock().contains_key(action)
    }

    pub fn started(&self, action: &str) -> Option<Instant> {
        self.entries.lock().get(action).map(|entry| entry.started)
    }

    /// Names of held actions, sorted
    pub fn actions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn drain(&self) -> Vec<(String, HoldEntry)> {
        self.entries.lock().drain().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::parse_binding;

    fn entry(binding: &str) -> HoldEntry {
        HoldEntry::new(parse_binding(binding).unwrap(), Arc::new(Mutex::new(())))
    }

    #[test]
    fn test_insert_is_exclusive() {
        let table = HoldTable::new();
        assert!(table.insert_if_absent("boost", entry("lshift")));
        assert!(!table.insert_if_absent("boost", entry("lshift")));
        assert_eq!(table.len(), 1);
        assert!(table.remove("boost").is_some());
        assert!(table.remove("boost").is_none());
    }

    #[test]
    fn test_remove_if_gate_ignores_newer_entry() {
        let table = HoldTable::new();
        let old_gate = Arc::new(Mutex::new(()));
        let first = HoldEntry::new(parse_binding("lshift").unwrap(), Arc::clone(&old_gate));
        table.insert_if_absent("boost", first);
        table.remove("boost");
        table.insert_if_absent("boost", entry("lshift"));

        assert!(!table.holds_gate("boost", &old_gate));
        assert!(!table.remove_if_gate("boost", &old_gate));
        assert!(table.contains("boost"));
    }

    #[test]
    fn test_actions_sorted() {
        let table = HoldTable::new();
        table.insert_if_absent("zoom", entry("z"));
        table.insert_if_absent("aim", entry("mouse2"));
        assert_eq!(table.actions(), vec!["aim".to_string(), "zoom".to_string()]);
        assert!(table.started("aim").is_some());
        assert_eq!(table.drain().len(), 2);
        assert!(table.is_empty());
    }
}
