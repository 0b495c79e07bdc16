// Deckbind Input Sinks
// The capability the executor drives, plus recording and logging sinks

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::info;
use parking_lot::Mutex;

use crate::input::{MouseButton, WheelDirection};
use crate::Key;

/// Error types for synthetic input output
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to create virtual device: {0}")]
    DeviceCreation(String),

    #[error("Failed to write event: {0}")]
    WriteError(String),
}

/// Something that can emit synthetic keyboard and mouse input.
///
/// Implementations must be safe to call from several worker and timer threads
/// at once; each call is one primitive and returns once it has been written.
pub trait InputSink: Send + Sync {
    fn key_down(&self, key: Key) -> Result<(), SinkError>;
    fn key_up(&self, key: Key) -> Result<(), SinkError>;
    fn button_down(&self, button: MouseButton) -> Result<(), SinkError>;
    fn button_up(&self, button: MouseButton) -> Result<(), SinkError>;
    fn scroll(&self, direction: WheelDirection) -> Result<(), SinkError>;

    /// Press and release a mouse button with `hold` in between
    fn click(&self, button: MouseButton, hold: Duration) -> Result<(), SinkError> {
        self.button_down(button)?;
        if !hold.is_zero() {
            std::thread::sleep(hold);
        }
        self.button_up(button)
    }
}

/// One primitive as seen by a [`RecordingSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    KeyDown(Key),
    KeyUp(Key),
    ButtonDown(MouseButton),
    ButtonUp(MouseButton),
    Scroll(WheelDirection),
}

/// Sink that keeps every primitive in order. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    /// Drain the recorded events
    pub fn take(&self) -> Vec<SinkEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Make every following primitive fail (simulates a lost device)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, event: SinkEvent) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::WriteError(format!("rejected {:?}", event)));
        }
        self.events.lock().push(event);
        Ok(())
    }
}

impl InputSink for RecordingSink {
    fn key_down(&self, key: Key) -> Result<(), SinkError> {
        self.record(SinkEvent::KeyDown(key))
    }

    fn key_up(&self, key: Key) -> Result<(), SinkError> {
        self.record(SinkEvent::KeyUp(key))
    }

    fn button_down(&self, button: MouseButton) -> Result<(), SinkError> {
        self.record(SinkEvent::ButtonDown(button))
    }

    fn button_up(&self, button: MouseButton) -> Result<(), SinkError> {
        self.record(SinkEvent::ButtonUp(button))
    }

    fn scroll(&self, direction: WheelDirection) -> Result<(), SinkError> {
        self.record(SinkEvent::Scroll(direction))
    }
}

/// Sink that only logs what it would send
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl InputSink for LogSink {
    fn key_down(&self, key: Key) -> Result<(), SinkError> {
        info!("key down {}", key);
        Ok(())
    }

    fn key_up(&self, key: Key) -> Result<(), SinkError> {
        info!("key up {}", key);
        Ok(())
    }

    fn button_down(&self, button: MouseButton) -> Result<(), SinkError> {
        info!("button down {}", button);
        Ok(())
    }

    fn button_up(&self, button: MouseButton) -> Result<(), SinkError> {
        info!("button up {}", button);
        Ok(())
    }

    fn scroll(&self, direction: WheelDirection) -> Result<(), SinkError> {
        info!("scroll {}", direction);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.key_down(Key::from(30)).unwrap();
        sink.scroll(WheelDirection::Down).unwrap();
        sink.key_up(Key::from(30)).unwrap();

        assert_eq!(
            sink.events(),
            vec![
                SinkEvent::KeyDown(Key::from(30)),
                SinkEvent::Scroll(WheelDirection::Down),
                SinkEvent::KeyUp(Key::from(30)),
            ]
        );
        assert_eq!(sink.take().len(), 3);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_click_is_down_then_up() {
        let sink = RecordingSink::new();
        sink.click(MouseButton::Right, Duration::ZERO).unwrap();
        assert_eq!(
            sink.events(),
            vec![
                SinkEvent::ButtonDown(MouseButton::Right),
                SinkEvent::ButtonUp(MouseButton::Right),
            ]
        );
    }

    #[test]
    fn test_failing_sink_records_nothing() {
        let sink = RecordingSink::new();
        sink.set_failing(true);
        assert!(sink.key_down(Key::from(30)).is_err());
        sink.set_failing(false);
        assert!(sink.events().is_empty());
    }
}
