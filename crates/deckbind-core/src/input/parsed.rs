// Deckbind Parsed Input
// The three shapes a binding string can take

use std::fmt;

use crate::modifier::ModifierSet;
use crate::Key;

/// Mouse buttons the binding format can name (`mouse1` .. `mouse5`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl MouseButton {
    /// Button for the binding format's 1-based numbering
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(MouseButton::Left),
            2 => Some(MouseButton::Right),
            3 => Some(MouseButton::Middle),
            4 => Some(MouseButton::X1),
            5 => Some(MouseButton::X2),
            _ => None,
        }
    }

    /// Linux BTN_* code for this button
    pub fn code(self) -> u16 {
        match self {
            MouseButton::Left => 0x110,
            MouseButton::Right => 0x111,
            MouseButton::Middle => 0x112,
            MouseButton::X1 => 0x113,
            MouseButton::X2 => 0x114,
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = match self {
            MouseButton::Left => 1,
            MouseButton::Right => 2,
            MouseButton::Middle => 3,
            MouseButton::X1 => 4,
            MouseButton::X2 => 5,
        };
        write!(f, "mouse{}", n)
    }
}

/// Vertical scroll direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelDirection {
    Up,
    Down,
}

impl WheelDirection {
    /// Signed REL_WHEEL delta for one notch
    pub fn delta(self) -> i32 {
        match self {
            WheelDirection::Up => 1,
            WheelDirection::Down => -1,
        }
    }
}

impl fmt::Display for WheelDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WheelDirection::Up => write!(f, "mwheel_up"),
            WheelDirection::Down => write!(f, "mwheel_down"),
        }
    }
}

/// A binding string resolved to physical inputs.
///
/// Immutable once produced. Modifier sets keep the order they were written in
/// and never contain duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParsedInput {
    Keyboard {
        modifiers: ModifierSet,
        keys: Vec<Key>,
    },
    MouseButton {
        modifiers: ModifierSet,
        button: MouseButton,
    },
    MouseWheel {
        modifiers: ModifierSet,
        direction: WheelDirection,
    },
}

impl ParsedInput {
    /// Modifiers pressed around the main input
    pub fn modifiers(&self) -> &[crate::ModifierKey] {
        match self {
            ParsedInput::Keyboard { modifiers, .. }
            | ParsedInput::MouseButton { modifiers, .. }
            | ParsedInput::MouseWheel { modifiers, .. } => modifiers,
        }
    }

    /// True if this input can be held down (wheel notches cannot)
    pub fn is_holdable(&self) -> bool {
        !matches!(self, ParsedInput::MouseWheel { .. })
    }
}

impl fmt::Display for ParsedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.modifiers().iter().map(|m| m.to_string()).collect();
        match self {
            ParsedInput::Keyboard { keys, .. } => {
                parts.extend(keys.iter().map(|k| k.to_string()));
            }
            ParsedInput::MouseButton { button, .. } => parts.push(button.to_string()),
            ParsedInput::MouseWheel { direction, .. } => parts.push(direction.to_string()),
        }
        write!(f, "{}", parts.join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModifierKey;
    use smallvec::smallvec;

    #[test]
    fn test_mouse_button_numbering() {
        assert_eq!(MouseButton::from_number(1), Some(MouseButton::Left));
        assert_eq!(MouseButton::from_number(5), Some(MouseButton::X2));
        assert_eq!(MouseButton::from_number(0), None);
        assert_eq!(MouseButton::from_number(6), None);
        assert_eq!(MouseButton::X1.to_string(), "mouse4");
    }

    #[test]
    fn test_display_matches_binding_format() {
        let input = ParsedInput::Keyboard {
            modifiers: smallvec![ModifierKey::LCtrl, ModifierKey::LAlt],
            keys: vec![Key::from(59)],
        };
        assert_eq!(input.to_string(), "lctrl+lalt+f1");

        let wheel = ParsedInput::MouseWheel {
            modifiers: smallvec![ModifierKey::LAlt],
            direction: WheelDirection::Up,
        };
        assert_eq!(wheel.to_string(), "lalt+mwheel_up");
        assert!(!wheel.is_holdable());
    }
}
