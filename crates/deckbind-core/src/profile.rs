// Deckbind Bindings Profile
// TOML action records and activation modes, resolved to executable bindings

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::activation::{resolve_mode, ActivationMode, ActivationModeTable, ModeAttributes};
use crate::input::parser::is_plain_mouse_binding;

/// Errors that can occur while loading a profile
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to read profile: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse profile: {0}")]
    TomlParse(String),

    #[error("duplicate action '{0}'")]
    DuplicateAction(String),
}

/// The per-device binding slots of one action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bindings {
    pub keyboard: String,
    pub mouse: String,
    pub joystick: String,
    pub gamepad: String,
}

fn unbound(binding: &str) -> bool {
    binding.trim().is_empty()
}

impl Bindings {
    /// Move a plain mouse binding out of the keyboard slot.
    ///
    /// The game stores mouse-only bindings under the keyboard device; only
    /// moved when the mouse slot is unbound.
    pub fn normalize(&mut self) {
        if is_plain_mouse_binding(&self.keyboard) && unbound(&self.mouse) {
            self.mouse = std::mem::take(&mut self.keyboard);
        }
    }

    /// Keyboard binding if bound, else mouse. Joystick and gamepad never execute.
    pub fn executable(&self) -> Option<&str> {
        [&self.keyboard, &self.mouse]
            .into_iter()
            .map(|b| b.trim())
            .find(|b| !b.is_empty())
    }
}

/// One action as stored in the profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub name: String,
    #[serde(default)]
    pub map: String,
    #[serde(default)]
    pub bindings: Bindings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<ModeAttributes>,
}

/// An action ready to feed the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAction {
    pub name: String,
    pub map: String,
    pub binding: String,
    pub mode: ActivationMode,
}

/// A bindings profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub activation_modes: ActivationModeTable,
    pub actions: Vec<ActionRecord>,
}

impl Profile {
    /// Load a profile from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ProfileError> {
        let content = fs::read_to_string(path.as_ref())?;
        let profile = Self::from_toml(&content)?;
        log::debug!(
            "Loaded profile {} ({} actions)",
            path.as_ref().display(),
            profile.actions.len()
        );
        Ok(profile)
    }

    /// Parse a profile from TOML and normalize its bindings
    pub fn from_toml(content: &str) -> Result<Self, ProfileError> {
        let mut profile: Profile =
            toml::from_str(content).map_err(|e| ProfileError::TomlParse(e.to_string()))?;

        let mut seen = std::collections::HashSet::new();
        for action in &mut profile.actions {
            if !seen.insert(action.name.clone()) {
                return Err(ProfileError::DuplicateAction(action.name.clone()));
            }
            action.bindings.normalize();
        }
        Ok(profile)
    }

    /// The profile's mode table, or the stock one if it defines none
    pub fn modes(&self) -> ActivationModeTable {
        if self.activation_modes.is_empty() {
            ActivationModeTable::builtin()
        } else {
            self.activation_modes.clone()
        }
    }

    pub fn action(&self, name: &str) -> Option<&ActionRecord> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Every action with an executable binding, with its activation mode resolved
    pub fn resolve(&self) -> Vec<ResolvedAction> {
        let modes = self.modes();
        self.actions
            .iter()
            .filter_map(|record| {
                let Some(binding) = record.bindings.executable() else {
                    log::trace!("'{}' has no executable binding", record.name);
                    return None;
                };
                let attrs = record.attributes.unwrap_or_default();
                let mode = resolve_mode(record.activation_mode.as_deref(), &attrs, &modes);
                Some(ResolvedAction {
                    name: record.name.clone(),
                    map: record.map.clone(),
                    binding: binding.to_string(),
                    mode,
                })
            })
            .collect()
    }
}
