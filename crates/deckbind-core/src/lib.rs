// Deckbind Core Library
// Activation engine turning game keybindings into synthetic input

pub mod activation;
pub mod engine;
pub mod executor;
pub mod input;
pub mod key;
pub mod modifier;
pub mod output;
pub mod profile;
pub mod settings;

pub use activation::{
    resolve_mode, ActivationExecutionContext, ActivationMode, ActivationModeMetadata,
    ActivationModeTable, ModeAttributes,
};
pub use engine::{Engine, EngineError, ExecutionRequest};
pub use executor::{ExecutorError, InputExecutor};
pub use input::{parse_binding, MouseButton, ParseError, ParsedInput, WheelDirection};
pub use key::{Key, UnknownKey};
pub use modifier::{ModifierKey, ModifierSet};
pub use output::{InputSink, LogSink, RecordingSink, SinkError, SinkEvent};
pub use profile::{ActionRecord, Bindings, Profile, ProfileError, ResolvedAction};
pub use settings::{EngineSettings, SettingsError};

#[cfg(feature = "uinput")]
pub use output::UinputSink;
