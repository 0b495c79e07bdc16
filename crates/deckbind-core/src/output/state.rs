// Deckbind Pressed Input State
// Reference-counted record of what the engine is holding down

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::input::MouseButton;
use crate::modifier::is_key_modifier_code;
use crate::Key;

/// A physical input that can stay down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Held {
    Key(Key),
    Button(MouseButton),
}

impl Held {
    pub fn is_modifier(self) -> bool {
        match self {
            Held::Key(key) => is_key_modifier_code(key.code()),
            Held::Button(_) => false,
        }
    }
}

/// Tracks pressed inputs by reference count.
///
/// Two actions sharing a modifier each take a reference; only the first press
/// and the last release reach the device.
#[derive(Debug, Default)]
pub struct PressedInputs {
    counts: Mutex<HashMap<Held, u32>>,
}

impl PressedInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a reference. Returns true when the input was up and must be pressed.
    pub fn press(&self, input: Held) -> bool {
        let mut counts = self.counts.lock();
        let count = counts.entry(input).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Drop a reference. Returns true when it was the last and the input must be released.
    pub fn release(&self, input: Held) -> bool {
        let mut counts = self.counts.lock();
        match counts.get_mut(&input) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                counts.remove(&input);
                true
            }
            None => false,
        }
    }

    pub fn is_pressed(&self, input: Held) -> bool {
        self.counts.lock().contains_key(&input)
    }

    pub fn len(&self) -> usize {
        self.counts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.lock().is_empty()
    }

    /// Forget everything and return what was down, non-modifiers first
    pub fn drain(&self) -> Vec<Held> {
        let mut held: Vec<Held> = self.counts.lock().drain().map(|(input, _)| input).collect();
        held.sort_by_key(|input| input.is_modifier());
        held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_press_release() {
        let state = PressedInputs::new();
        let key = Held::Key(Key::from(30)); // A

        assert!(!state.is_pressed(key));
        assert!(state.press(key));
        assert!(state.is_pressed(key));
        assert!(state.release(key));
        assert!(!state.is_pressed(key));
    }

    #[test]
    fn test_state_shared_reference() {
        let state = PressedInputs::new();
        let shift = Held::Key(Key::from(42));

        assert!(state.press(shift));
        assert!(!state.press(shift)); // second holder, already down
        assert!(!state.release(shift)); // still held by the first
        assert!(state.is_pressed(shift));
        assert!(state.release(shift));
        assert!(state.is_empty());
    }

    #[test]
    fn test_state_release_nonexistent() {
        let state = PressedInputs::new();
        assert!(!state.release(Held::Button(MouseButton::Left)));
        assert!(state.is_empty());
    }

    #[test]
    fn test_state_drain_orders_modifiers_last() {
        let state = PressedInputs::new();
        state.press(Held::Key(Key::from(29))); // LCTRL
        state.press(Held::Key(Key::from(30))); // A
        state.press(Held::Button(MouseButton::X1));

        let drained = state.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[2], Held::Key(Key::from(29)));
        assert!(state.is_empty());
    }
}
