// Deckbind Key Type
// Physical key identities for the game's binding format

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::ModifierKey;

/// A physical key by its Linux input code.
///
/// Codes follow input-event-codes.h, so they name key positions rather than
/// layout characters and go straight to uinput.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Key(pub u16);

impl Key {
    pub fn code(self) -> u16 {
        self.0
    }

    /// Binding-format name ("f1", "np_5", "lshift")
    pub fn name(self) -> &'static str {
        key_name(self.0)
    }
}

impl From<u16> for Key {
    fn from(code: u16) -> Self {
        Key(code)
    }
}

impl From<Key> for u16 {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A key name the binding format does not know
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key '{0}'")]
pub struct UnknownKey(pub String);

impl FromStr for Key {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        key_from_name(s).ok_or_else(|| UnknownKey(s.trim().to_string()))
    }
}

/// Named (multi-character) keys of the binding format.
///
/// The first entry for a code is its display name; later entries are aliases.
const SPECIAL_KEYS: &[(&str, u16)] = &[
    ("escape", 1),
    ("esc", 1),
    ("backspace", 14),
    ("tab", 15),
    ("enter", 28),
    ("return", 28),
    ("space", 57),
    ("capslock", 58),
    ("f1", 59),
    ("f2", 60),
    ("f3", 61),
    ("f4", 62),
    ("f5", 63),
    ("f6", 64),
    ("f7", 65),
    ("f8", 66),
    ("f9", 67),
    ("f10", 68),
    ("f11", 87),
    ("f12", 88),
    ("f13", 183),
    ("f14", 184),
    ("f15", 185),
    ("f16", 186),
    ("f17", 187),
    ("f18", 188),
    ("f19", 189),
    ("f20", 190),
    ("f21", 191),
    ("f22", 192),
    ("f23", 193),
    ("f24", 194),
    ("numlock", 69),
    ("scrolllock", 70),
    ("print", 99),
    ("pause", 119),
    ("insert", 110),
    ("delete", 111),
    ("home", 102),
    ("end", 107),
    ("pgup", 104),
    ("pageup", 104),
    ("pgdn", 109),
    ("pagedown", 109),
    ("up", 103),
    ("down", 108),
    ("left", 105),
    ("right", 106),
    ("np_0", 82),
    ("np_1", 79),
    ("np_2", 80),
    ("np_3", 81),
    ("np_4", 75),
    ("np_5", 76),
    ("np_6", 77),
    ("np_7", 71),
    ("np_8", 72),
    ("np_9", 73),
    ("np_add", 78),
    ("np_subtract", 74),
    ("np_multiply", 55),
    ("np_divide", 98),
    ("np_period", 83),
    ("np_enter", 96),
    ("minus", 12),
    ("equals", 13),
    ("lbracket", 26),
    ("rbracket", 27),
    ("backslash", 43),
    ("semicolon", 39),
    ("apostrophe", 40),
    ("comma", 51),
    ("period", 52),
    ("slash", 53),
    ("grave", 41),
];

/// Single-character key names, by physical position on a US ANSI board.
///
/// The binding format stores scan-code identity, so "z" is the key left of
/// "x" even on a layout where that key types "y".
const PHYSICAL_KEYS: &[(&str, u16)] = &[
    ("1", 2),
    ("2", 3),
    ("3", 4),
    ("4", 5),
    ("5", 6),
    ("6", 7),
    ("7", 8),
    ("8", 9),
    ("9", 10),
    ("0", 11),
    ("-", 12),
    ("=", 13),
    ("q", 16),
    ("w", 17),
    ("e", 18),
    ("r", 19),
    ("t", 20),
    ("y", 21),
    ("u", 22),
    ("i", 23),
    ("o", 24),
    ("p", 25),
    ("[", 26),
    ("]", 27),
    ("a", 30),
    ("s", 31),
    ("d", 32),
    ("f", 33),
    ("g", 34),
    ("h", 35),
    ("j", 36),
    ("k", 37),
    ("l", 38),
    (";", 39),
    ("'", 40),
    ("`", 41),
    ("\\", 43),
    ("z", 44),
    ("x", 45),
    ("c", 46),
    ("v", 47),
    ("b", 48),
    ("n", 49),
    ("m", 50),
    (",", 51),
    (".", 52),
    ("/", 53),
];

static SPECIAL_BY_NAME: LazyLock<HashMap<String, Key>> = LazyLock::new(|| {
    SPECIAL_KEYS
        .iter()
        .map(|(name, code)| (name.to_ascii_uppercase(), Key(*code)))
        .collect()
});

static PHYSICAL_BY_NAME: LazyLock<HashMap<String, Key>> = LazyLock::new(|| {
    PHYSICAL_KEYS
        .iter()
        .map(|(name, code)| (name.to_ascii_uppercase(), Key(*code)))
        .collect()
});

static NAME_BY_CODE: LazyLock<HashMap<u16, &'static str>> = LazyLock::new(|| {
    let mut names = HashMap::new();
    for (name, code) in SPECIAL_KEYS {
        names.entry(*code).or_insert(*name);
    }
    for (name, code) in PHYSICAL_KEYS {
        names.entry(*code).or_insert(*name);
    }
    names
});

/// Display name for a key code
pub fn key_name(code: u16) -> &'static str {
    if let Some(name) = NAME_BY_CODE.get(&code) {
        return name;
    }
    match ModifierKey::from_key(Key(code)) {
        Some(modifier) => modifier.into(),
        None => "unknown",
    }
}

/// Look up a named special key (F1, arrows, navigation block, numpad...)
pub fn special_key(name: &str) -> Option<Key> {
    SPECIAL_BY_NAME.get(&name.to_ascii_uppercase()).copied()
}

/// Look up a single-character physical key
pub fn physical_key(name: &str) -> Option<Key> {
    if name.chars().count() != 1 {
        return None;
    }
    PHYSICAL_BY_NAME.get(&name.to_ascii_uppercase()).copied()
}

/// Try to parse a key name to a key code.
///
/// Modifier names resolve too, so a bare "lshift" is a valid key.
pub fn key_from_name(name: &str) -> Option<Key> {
    let trimmed = name.trim();
    if let Ok(modifier) = trimmed.parse::<ModifierKey>() {
        return Some(modifier.key());
    }
    special_key(trimmed).or_else(|| physical_key(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_name() {
        assert_eq!(key_from_name("a"), Some(Key::from(30)));
        assert_eq!(key_from_name("A"), Some(Key::from(30)));
        assert_eq!(key_from_name("enter"), Some(Key::from(28)));
        assert_eq!(key_from_name("1"), Some(Key::from(2)));
        assert_eq!(key_from_name("0"), Some(Key::from(11)));
        assert_eq!(key_from_name("F1"), Some(Key::from(59)));
        assert_eq!(key_from_name("np_5"), Some(Key::from(76)));
        assert_eq!(key_from_name("lshift"), Some(Key::from(42)));
        assert_eq!(key_from_name("nope"), None);
    }

    #[test]
    fn test_physical_keys_are_single_characters() {
        assert_eq!(physical_key("z"), Some(Key::from(44)));
        assert_eq!(physical_key(";"), Some(Key::from(39)));
        assert_eq!(physical_key("zz"), None);
        assert_eq!(physical_key(""), None);
    }

    #[test]
    fn test_special_key_aliases_share_codes() {
        assert_eq!(special_key("esc"), special_key("escape"));
        assert_eq!(special_key("PGUP"), special_key("pageup"));
        assert_eq!(special_key("q"), None);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::from(30).to_string(), "a");
        assert_eq!(Key::from(28).to_string(), "enter");
        assert_eq!(Key::from(1).to_string(), "escape");
        assert_eq!(Key::from(29).to_string(), "lctrl");
        assert_eq!(Key::from(0x2ff).to_string(), "unknown");
    }

    #[test]
    fn test_key_from_str() {
        assert_eq!("f12".parse::<Key>(), Ok(Key::from(88)));
        assert_eq!(
            "mouse1".parse::<Key>(),
            Err(UnknownKey("mouse1".to_string()))
        );
        assert_eq!(u16::from(Key::from(88)), 88);
    }
}
