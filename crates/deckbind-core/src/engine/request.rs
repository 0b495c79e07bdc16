// Deckbind Execution Requests
// What the host hands the engine for every button event

use crate::activation::{resolve_mode, ActivationMode, ActivationModeTable, ModeAttributes};

use super::EngineError;

/// One button event for one action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub action_name: String,
    pub binding: String,
    pub activation_mode: ActivationMode,
    pub is_button_down: bool,
}

impl ExecutionRequest {
    pub fn new(
        action_name: impl Into<String>,
        binding: impl Into<String>,
        activation_mode: ActivationMode,
        is_button_down: bool,
    ) -> Self {
        Self {
            action_name: action_name.into(),
            binding: binding.into(),
            activation_mode,
            is_button_down,
        }
    }

    /// Build from a mode name as the host sends it; unknown names become `press`
    pub fn from_names(
        action_name: &str,
        binding: &str,
        mode_name: &str,
        is_button_down: bool,
    ) -> Self {
        let mode = resolve_mode(
            Some(mode_name),
            &ModeAttributes::default(),
            &ActivationModeTable::new(),
        );
        Self::new(action_name, binding, mode, is_button_down)
    }

    pub fn down(action_name: &str, binding: &str, activation_mode: ActivationMode) -> Self {
        Self::new(action_name, binding, activation_mode, true)
    }

    pub fn up(action_name: &str, binding: &str, activation_mode: ActivationMode) -> Self {
        Self::new(action_name, binding, activation_mode, false)
    }

    /// Reject requests with a missing action name or binding
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.action_name.trim().is_empty() {
            return Err(EngineError::InvalidRequest(
                "action name is empty".to_string(),
            ));
        }
        if self.binding.trim().is_empty() {
            return Err(EngineError::InvalidRequest(format!(
                "action '{}' has no binding",
                self.action_name
            )));
        }
        Ok(())
    }
}
