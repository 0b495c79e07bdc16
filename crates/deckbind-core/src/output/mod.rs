// Deckbind Output Layer
// Synthetic input sinks, output sequencing and pressed-input tracking

mod sequence;
mod sink;
mod state;

#[cfg(feature = "uinput")]
mod uinput;

pub use sequence::{
    held_inputs, hold_down_sequence, hold_up_sequence, press_sequence, OutputStep, Pause,
};
pub use sink::{InputSink, LogSink, RecordingSink, SinkError, SinkEvent};
pub use state::{Held, PressedInputs};

#[cfg(feature = "uinput")]
pub use uinput::UinputSink;
