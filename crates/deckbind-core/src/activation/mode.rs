// Deckbind Activation Modes
// Named behavior profiles and the timing metadata behind them

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// How an action turns button-down/button-up into synthetic input.
///
/// Names match the game's activation mode names and parse case-insensitively.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Display,
    Default,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActivationMode {
    #[default]
    Press,
    PressQuicker,
    DelayedPress,
    DelayedPressQuicker,
    DelayedPressMedium,
    DelayedPressLong,
    Tap,
    TapQuicker,
    DoubleTap,
    DoubleTapNonblocking,
    Hold,
    HoldNoRetrigger,
    All,
    DelayedHold,
    DelayedHoldLong,
    DelayedHoldNoRetrigger,
    HoldToggle,
    SmartToggle,
}

impl ActivationMode {
    /// Canonical table name ("delayed_press_medium", ...)
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn is_hold_family(self) -> bool {
        matches!(
            self,
            ActivationMode::Hold | ActivationMode::HoldNoRetrigger | ActivationMode::All
        )
    }

    pub fn is_toggle(self) -> bool {
        matches!(self, ActivationMode::HoldToggle | ActivationMode::SmartToggle)
    }
}

/// Timing and trigger attributes of one activation mode.
///
/// Thresholds are seconds; a negative value means "not set".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivationModeMetadata {
    pub on_press: bool,
    pub on_hold: bool,
    pub on_release: bool,
    pub press_trigger_threshold: f32,
    pub release_trigger_threshold: f32,
    pub retriggerable: bool,
    pub multi_tap: u32,
    pub multi_tap_block: bool,
    pub release_trigger_delay: f32,
}

impl Default for ActivationModeMetadata {
    fn default() -> Self {
        Self {
            on_press: false,
            on_hold: false,
            on_release: false,
            press_trigger_threshold: -1.0,
            release_trigger_threshold: -1.0,
            retriggerable: false,
            multi_tap: 1,
            multi_tap_block: false,
            release_trigger_delay: 0.0,
        }
    }
}

/// Negative means unset; a value `Duration` cannot hold is unset too
fn seconds(value: f32) -> Option<Duration> {
    if value.is_nan() || value < 0.0 {
        return None;
    }
    match Duration::try_from_secs_f32(value) {
        Ok(duration) => Some(duration),
        Err(e) => {
            log::warn!("Ignoring threshold of {} seconds: {}", value, e);
            None
        }
    }
}

impl ActivationModeMetadata {
    /// Fire on button-down, nothing else. Used whenever a mode is missing.
    pub fn press_default() -> Self {
        Self {
            on_press: true,
            ..Self::default()
        }
    }

    pub fn press_trigger(&self) -> Option<Duration> {
        seconds(self.press_trigger_threshold)
    }

    pub fn release_trigger(&self) -> Option<Duration> {
        seconds(self.release_trigger_threshold)
    }

    /// Delay before a toggle turns off; `None` when zero or unset
    pub fn release_delay(&self) -> Option<Duration> {
        seconds(self.release_trigger_delay).filter(|d| !d.is_zero())
    }

    /// Taps required to fire, never less than one
    pub fn required_taps(&self) -> u32 {
        self.multi_tap.max(1)
    }
}

/// Ordered `name -> metadata` table. Declaration order matters for inference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivationModeTable {
    modes: IndexMap<String, ActivationModeMetadata>,
}

impl ActivationModeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The game's stock activation modes
    pub fn builtin() -> Self {
        let mut table = Self::new();
        let m = ActivationModeMetadata::default;

        table.insert("press", ActivationModeMetadata::press_default());
        table.insert("press_quicker", ActivationModeMetadata::press_default());
        for (name, threshold) in [
            ("delayed_press", 0.25),
            ("delayed_press_quicker", 0.15),
            ("delayed_press_medium", 0.5),
            ("delayed_press_long", 1.5),
        ] {
            table.insert(
                name,
                ActivationModeMetadata {
                    on_press: true,
                    press_trigger_threshold: threshold,
                    ..m()
                },
            );
        }
        for (name, threshold) in [("tap", 0.25), ("tap_quicker", 0.15)] {
            table.insert(
                name,
                ActivationModeMetadata {
                    on_release: true,
                    release_trigger_threshold: threshold,
                    ..m()
                },
            );
        }
        for (name, block) in [("double_tap", true), ("double_tap_nonblocking", false)] {
            table.insert(
                name,
                ActivationModeMetadata {
                    on_release: true,
                    release_trigger_threshold: 0.25,
                    multi_tap: 2,
                    multi_tap_block: block,
                    ..m()
                },
            );
        }

        let held = ActivationModeMetadata {
            on_press: true,
            on_release: true,
            ..m()
        };
        table.insert(
            "hold",
            ActivationModeMetadata {
                retriggerable: true,
                ..held
            },
        );
        table.insert("hold_no_retrigger", held);
        table.insert(
            "all",
            ActivationModeMetadata {
                on_hold: true,
                retriggerable: true,
                ..held
            },
        );
        for (name, threshold, retriggerable) in [
            ("delayed_hold", 0.25, true),
            ("delayed_hold_long", 1.5, true),
            ("delayed_hold_no_retrigger", 0.25, false),
        ] {
            table.insert(
                name,
                ActivationModeMetadata {
                    press_trigger_threshold: threshold,
                    retriggerable,
                    ..held
                },
            );
        }
        table.insert("hold_toggle", held);
        table.insert(
            "smart_toggle",
            ActivationModeMetadata {
                release_trigger_threshold: 0.25,
                ..held
            },
        );
        table
    }

    /// Add or replace a mode; a replaced mode keeps its position
    pub fn insert(&mut self, name: impl Into<String>, metadata: ActivationModeMetadata) {
        self.modes.insert(name.into(), metadata);
    }

    pub fn get(&self, name: &str) -> Option<&ActivationModeMetadata> {
        self.modes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActivationModeMetadata)> {
        self.modes.iter().map(|(name, meta)| (name.as_str(), meta))
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}
