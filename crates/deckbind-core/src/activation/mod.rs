// Deckbind Activation Layer
// Activation modes, mode inference and the per-mode event handlers

pub mod handlers;
mod mode;
mod resolver;

use crate::input::ParsedInput;

pub use handlers::dispatch;
pub use mode::{ActivationMode, ActivationModeMetadata, ActivationModeTable};
pub use resolver::{metadata_for, resolve_mode, ModeAttributes};

/// One button event on its way to a handler. Never kept past the dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationExecutionContext {
    pub action_name: String,
    pub input: ParsedInput,
    pub is_button_down: bool,
}
