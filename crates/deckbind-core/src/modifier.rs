// Deckbind Modifier Keys
// The six sided modifiers the binding format knows about

use smallvec::SmallVec;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

use crate::Key;

/// A sided keyboard modifier as written in binding strings.
///
/// Parsing is case-insensitive ("LSHIFT", "lshift", "LShift").
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ModifierKey {
    LShift,
    RShift,
    LCtrl,
    RCtrl,
    LAlt,
    RAlt,
}

/// Ordered modifier set. Bindings rarely carry more than three.
pub type ModifierSet = SmallVec<[ModifierKey; 4]>;

impl ModifierKey {
    /// The physical key this modifier presses
    pub fn key(self) -> Key {
        match self {
            ModifierKey::LShift => Key::from(42),
            ModifierKey::RShift => Key::from(54),
            ModifierKey::LCtrl => Key::from(29),
            ModifierKey::RCtrl => Key::from(97),
            ModifierKey::LAlt => Key::from(56),
            ModifierKey::RAlt => Key::from(100),
        }
    }

    /// Reverse lookup from a physical key
    pub fn from_key(key: Key) -> Option<ModifierKey> {
        MODIFIER_KEY_CODES
            .iter()
            .find(|(code, _)| *code == key.code())
            .map(|(_, modifier)| *modifier)
    }

    /// Binding-format name ("lshift", "ralt", ...)
    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl std::fmt::Display for ModifierKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

const MODIFIER_KEY_CODES: &[(u16, ModifierKey)] = &[
    (42, ModifierKey::LShift),
    (54, ModifierKey::RShift),
    (29, ModifierKey::LCtrl),
    (97, ModifierKey::RCtrl),
    (56, ModifierKey::LAlt),
    (100, ModifierKey::RAlt),
];

/// Check if a key code is a modifier using the static table (lock-free)
#[inline]
pub const fn is_key_modifier_code(code: u16) -> bool {
    let mut i = 0;
    while i < MODIFIER_KEY_CODES.len() {
        if MODIFIER_KEY_CODES[i].0 == code {
            return true;
        }
        i += 1;
    }
    false
}
