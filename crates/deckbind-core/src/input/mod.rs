// Deckbind Input Layer
// Structured form of the game's binding strings

mod parsed;
pub mod parser;

pub use parsed::{MouseButton, ParsedInput, WheelDirection};
pub use parser::{parse_binding, ParseError};
