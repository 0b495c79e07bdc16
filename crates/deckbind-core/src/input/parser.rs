// Deckbind Binding Parser
// Parses binding strings like "lctrl+lalt+f1" into structured inputs

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::{MouseButton, ParsedInput, WheelDirection};
use crate::key::{physical_key, special_key};
use crate::modifier::{ModifierKey, ModifierSet};
use crate::Key;

/// Numbered mouse buttons may carry a device prefix or suffix ("MOUSE4_ALT")
static NUMBERED_MOUSE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"MOUSE([1-5])").ok());

/// Errors that can occur during binding parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("binding string cannot be empty")]
    EmptyInput,
    #[error("empty token in binding '{0}'")]
    EmptyToken(String),
    #[error("unknown token '{token}' in binding '{binding}'")]
    UnknownToken { binding: String, token: String },
    #[error("mouse wheel cannot be combined with other keys in '{0}'")]
    WheelWithKeys(String),
    #[error("mouse button cannot be combined with other keys in '{0}'")]
    MouseWithKeys(String),
    #[error("more than one mouse button in '{0}'")]
    MultipleMouseButtons(String),
}

/// One classified `+`-separated token
#[derive(Debug, Clone, Copy)]
enum Token {
    Modifier(ModifierKey),
    Key(Key),
    Mouse(MouseButton),
    Wheel(WheelDirection),
}

fn wheel_token(token: &str) -> Option<WheelDirection> {
    match token {
        "MWHEEL_UP" => Some(WheelDirection::Up),
        "MWHEEL_DOWN" => Some(WheelDirection::Down),
        _ => None,
    }
}

fn mouse_token(token: &str) -> Option<MouseButton> {
    match token {
        "MOUSE1" => return Some(MouseButton::Left),
        "MOUSE2" => return Some(MouseButton::Right),
        "MOUSE3" => return Some(MouseButton::Middle),
        _ => {}
    }
    let caps = NUMBERED_MOUSE.as_ref()?.captures(token)?;
    let n: u8 = caps.get(1)?.as_str().parse().ok()?;
    MouseButton::from_number(n)
}

fn classify(token: &str) -> Option<Token> {
    if let Ok(modifier) = token.parse::<ModifierKey>() {
        return Some(Token::Modifier(modifier));
    }
    if let Some(key) = special_key(token) {
        return Some(Token::Key(key));
    }
    if let Some(key) = physical_key(token) {
        return Some(Token::Key(key));
    }
    if let Some(button) = mouse_token(token) {
        return Some(Token::Mouse(button));
    }
    wheel_token(token).map(Token::Wheel)
}

/// Parse a binding string into a [`ParsedInput`].
///
/// Tokens are matched case-insensitively. A binding made only of modifiers
/// promotes its last modifier to the key slot, so `"lshift"` holds left shift.
///
/// # Examples
/// ```
/// use deckbind_core::{parse_binding, ParsedInput, WheelDirection};
/// let parsed = parse_binding("lalt+mwheel_up").unwrap();
/// assert!(matches!(
///     parsed,
///     ParsedInput::MouseWheel { direction: WheelDirection::Up, .. }
/// ));
/// ```
pub fn parse_binding(binding: &str) -> Result<ParsedInput, ParseError> {
    let normalized = binding.trim().to_ascii_uppercase();
    if normalized.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    if !normalized.contains('+') {
        if let Some(direction) = wheel_token(&normalized) {
            return Ok(ParsedInput::MouseWheel {
                modifiers: ModifierSet::new(),
                direction,
            });
        }
    }

    let mut modifiers = ModifierSet::new();
    let mut keys: Vec<Key> = Vec::new();
    let mut mouse: Option<MouseButton> = None;
    let mut wheel: Option<WheelDirection> = None;
    let mut non_modifiers = 0usize;

    for raw in normalized.split('+') {
        let token = raw.trim();
        if token.is_empty() {
            return Err(ParseError::EmptyToken(binding.to_string()));
        }
        match classify(token) {
            Some(Token::Modifier(modifier)) => {
                if !modifiers.contains(&modifier) {
                    modifiers.push(modifier);
                }
            }
            Some(Token::Key(key)) => {
                non_modifiers += 1;
                keys.push(key);
            }
            Some(Token::Mouse(button)) => {
                non_modifiers += 1;
                if mouse.is_some() {
                    return Err(ParseError::MultipleMouseButtons(binding.to_string()));
                }
                mouse = Some(button);
            }
            Some(Token::Wheel(direction)) => {
                non_modifiers += 1;
                wheel = Some(direction);
            }
            None => {
                return Err(ParseError::UnknownToken {
                    binding: binding.to_string(),
                    token: token.to_ascii_lowercase(),
                })
            }
        }
    }

    if let Some(direction) = wheel {
        if non_modifiers > 1 {
            return Err(ParseError::WheelWithKeys(binding.to_string()));
        }
        return Ok(ParsedInput::MouseWheel {
            modifiers,
            direction,
        });
    }

    if let Some(button) = mouse {
        if non_modifiers > 1 {
            return Err(ParseError::MouseWithKeys(binding.to_string()));
        }
        return Ok(ParsedInput::MouseButton { modifiers, button });
    }

    if keys.is_empty() {
        // Modifier-only binding: the last modifier is the key itself
        let Some(last) = modifiers.pop() else {
            return Err(ParseError::EmptyInput);
        };
        keys.push(last.key());
    }

    Ok(ParsedInput::Keyboard { modifiers, keys })
}

/// Returns true for a binding that names only a mouse button or wheel, no `+`
pub fn is_plain_mouse_binding(binding: &str) -> bool {
    let normalized = binding.trim().to_ascii_uppercase();
    !normalized.contains('+')
        && (normalized.starts_with("MOUSE") || normalized.starts_with("MWHEEL"))
}
