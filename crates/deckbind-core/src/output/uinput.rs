// Deckbind uinput Output
// Linux virtual keyboard+mouse device behind the InputSink trait

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, RelativeAxisType};
use parking_lot::Mutex;

use super::sink::{InputSink, SinkError};
use crate::input::{MouseButton, WheelDirection};
use crate::Key;

const KEY_RELEASE: i32 = 0;
const KEY_PRESS: i32 = 1;

/// Virtual uinput device for synthetic game input
pub struct UinputSink {
    device: Mutex<VirtualDevice>,
}

impl UinputSink {
    /// Create the virtual device with keyboard keys, mouse buttons and a wheel
    pub fn new() -> Result<Self, SinkError> {
        let mut keys = AttributeSet::new();
        // All standard keyboard keys (0-255)
        for code in 0..256u16 {
            keys.insert(evdev::Key::new(code));
        }
        for button in [
            MouseButton::Left,
            MouseButton::Right,
            MouseButton::Middle,
            MouseButton::X1,
            MouseButton::X2,
        ] {
            keys.insert(evdev::Key::new(button.code()));
        }

        let mut axes = AttributeSet::new();
        axes.insert(RelativeAxisType::REL_WHEEL);

        let device = VirtualDeviceBuilder::new()
            .map_err(|e: std::io::Error| SinkError::DeviceCreation(e.to_string()))?
            .name("Deckbind (virtual) Input")
            .with_keys(&keys)
            .map_err(|e: std::io::Error| SinkError::DeviceCreation(e.to_string()))?
            .with_relative_axes(&axes)
            .map_err(|e: std::io::Error| SinkError::DeviceCreation(e.to_string()))?
            .build()
            .map_err(|e: std::io::Error| SinkError::DeviceCreation(e.to_string()))?;

        log::debug!("created uinput device with {} keys", keys.iter().count());
        Ok(Self {
            device: Mutex::new(device),
        })
    }

    fn emit(&self, event: InputEvent) -> Result<(), SinkError> {
        log::trace!(
            "uinput type={:?} code={} value={}",
            event.event_type(),
            event.code(),
            event.value()
        );
        // SYN event is required for the kernel to process the event
        let syn_event = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);
        self.device
            .lock()
            .emit(&[event, syn_event])
            .map_err(|e: std::io::Error| SinkError::WriteError(e.to_string()))
    }

    fn key_event(&self, code: u16, value: i32) -> Result<(), SinkError> {
        self.emit(InputEvent::new(EventType::KEY, code, value))
    }
}

impl InputSink for UinputSink {
    fn key_down(&self, key: Key) -> Result<(), SinkError> {
        self.key_event(key.code(), KEY_PRESS)
    }

    fn key_up(&self, key: Key) -> Result<(), SinkError> {
        self.key_event(key.code(), KEY_RELEASE)
    }

    fn button_down(&self, button: MouseButton) -> Result<(), SinkError> {
        self.key_event(button.code(), KEY_PRESS)
    }

    fn button_up(&self, button: MouseButton) -> Result<(), SinkError> {
        self.key_event(button.code(), KEY_RELEASE)
    }

    fn scroll(&self, direction: WheelDirection) -> Result<(), SinkError> {
        self.emit(InputEvent::new(
            EventType::RELATIVE,
            RelativeAxisType::REL_WHEEL.0,
            direction.delta(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_device_creation() {
        // Requires /dev/uinput access; skip quietly where it is missing
        match UinputSink::new() {
            Ok(sink) => {
                sink.key_down(Key::from(30)).unwrap();
                sink.key_up(Key::from(30)).unwrap();
            }
            Err(e) => eprintln!("skipping uinput test: {}", e),
        }
    }

    #[test]
    fn test_button_codes_fit_key_space() {
        assert_eq!(MouseButton::Left.code(), 0x110);
        assert_eq!(MouseButton::X2.code(), 0x114);
    }
}
