// Deckbind Activation Mode Resolver
// Picks an ActivationMode from an explicit name or from trigger attributes

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::mode::{ActivationMode, ActivationModeMetadata, ActivationModeTable};

/// Trigger flags carried by an action that names no activation mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModeAttributes {
    pub on_press: bool,
    pub on_hold: bool,
    pub on_release: bool,
    pub retriggerable: bool,
}

impl ModeAttributes {
    fn matches(&self, meta: &ActivationModeMetadata) -> bool {
        self.on_press == meta.on_press
            && self.on_hold == meta.on_hold
            && self.on_release == meta.on_release
            && self.retriggerable == meta.retriggerable
    }

    /// Press-and-release without hold reads as a hold, never a press or tap
    fn is_press_release(&self) -> bool {
        self.on_press && self.on_release && !self.on_hold
    }
}

/// Resolve the activation mode for an action.
///
/// An explicit name wins. Without one, the first mode in `known` whose flags
/// match exactly is used, and failing that a fixed heuristic.
pub fn resolve_mode(
    explicit: Option<&str>,
    attrs: &ModeAttributes,
    known: &ActivationModeTable,
) -> ActivationMode {
    if let Some(name) = explicit.map(str::trim).filter(|n| !n.is_empty()) {
        return match name.parse::<ActivationMode>() {
            Ok(mode) => mode,
            Err(_) => {
                warn!("Unknown activation mode '{}', using press", name);
                ActivationMode::Press
            }
        };
    }

    for (name, meta) in known.iter() {
        if !attrs.matches(meta) {
            continue;
        }
        let Ok(mode) = name.parse::<ActivationMode>() else {
            continue;
        };
        let canonical = mode.name();
        if attrs.is_press_release() && (canonical.contains("press") || canonical.contains("tap")) {
            continue;
        }
        return mode;
    }

    infer_mode(attrs)
}

fn infer_mode(attrs: &ModeAttributes) -> ActivationMode {
    let mode = if attrs.on_press && !attrs.on_release && !attrs.on_hold {
        ActivationMode::Press
    } else if attrs.is_press_release() {
        if attrs.retriggerable {
            ActivationMode::Hold
        } else {
            ActivationMode::HoldNoRetrigger
        }
    } else if attrs.on_hold {
        ActivationMode::Hold
    } else if attrs.on_release && !attrs.on_press {
        ActivationMode::Tap
    } else {
        warn!("No activation mode fits {:?}, using press", attrs);
        return ActivationMode::Press;
    };
    debug!("Inferred activation mode {} from {:?}", mode, attrs);
    mode
}

/// Metadata for `mode`, or the press default when the table lacks it
pub fn metadata_for(mode: ActivationMode, table: &ActivationModeTable) -> ActivationModeMetadata {
    match table.get(mode.name()) {
        Some(meta) => *meta,
        None => {
            warn!(
                "Activation mode '{}' missing from mode table, using press default",
                mode
            );
            ActivationModeMetadata::press_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(
        on_press: bool,
        on_hold: bool,
        on_release: bool,
        retriggerable: bool,
    ) -> ModeAttributes {
        ModeAttributes {
            on_press,
            on_hold,
            on_release,
            retriggerable,
        }
    }

    #[test]
    fn test_explicit_name_wins() {
        let table = ActivationModeTable::builtin();
        let flags = attrs(false, false, true, false);
        assert_eq!(
            resolve_mode(Some("Double_Tap"), &flags, &table),
            ActivationMode::DoubleTap
        );
        assert_eq!(
            resolve_mode(Some("not_a_mode"), &flags, &table),
            ActivationMode::Press
        );
    }

    #[test]
    fn test_exact_match_in_table_order() {
        let table = ActivationModeTable::builtin();
        assert_eq!(
            resolve_mode(None, &attrs(true, false, false, false), &table),
            ActivationMode::Press
        );
        assert_eq!(
            resolve_mode(None, &attrs(true, false, true, true), &table),
            ActivationMode::Hold
        );
        assert_eq!(
            resolve_mode(None, &attrs(true, false, true, false), &table),
            ActivationMode::HoldNoRetrigger
        );
        assert_eq!(
            resolve_mode(None, &attrs(false, false, true, false), &table),
            ActivationMode::Tap
        );
        assert_eq!(
            resolve_mode(None, &attrs(true, true, true, true), &table),
            ActivationMode::All
        );
    }

    #[test]
    fn test_press_release_skips_press_and_tap_names() {
        let mut table = ActivationModeTable::new();
        let press_release = ActivationModeMetadata {
            on_press: true,
            on_release: true,
            ..ActivationModeMetadata::default()
        };
        table.insert("delayed_press", press_release);
        table.insert("double_tap", press_release);
        table.insert("hold_toggle", press_release);

        assert_eq!(
            resolve_mode(None, &attrs(true, false, true, false), &table),
            ActivationMode::HoldToggle
        );
    }

    #[test]
    fn test_press_release_skip_ignores_name_case() {
        let mut table = ActivationModeTable::new();
        let press_release = ActivationModeMetadata {
            on_press: true,
            on_release: true,
            ..ActivationModeMetadata::default()
        };
        table.insert("Delayed_Press", press_release);
        table.insert("TAP", press_release);
        table.insert("Hold_Toggle", press_release);

        assert_eq!(
            resolve_mode(None, &attrs(true, false, true, false), &table),
            ActivationMode::HoldToggle
        );
    }

    #[test]
    fn test_unknown_table_names_are_skipped() {
        let mut table = ActivationModeTable::new();
        table.insert("custom_mode", ActivationModeMetadata::press_default());
        table.insert("press_quicker", ActivationModeMetadata::press_default());

        assert_eq!(
            resolve_mode(None, &attrs(true, false, false, false), &table),
            ActivationMode::PressQuicker
        );
    }

    #[test]
    fn test_heuristic_fallbacks() {
        let empty = ActivationModeTable::new();
        assert_eq!(
            resolve_mode(None, &attrs(true, false, false, false), &empty),
            ActivationMode::Press
        );
        assert_eq!(
            resolve_mode(None, &attrs(true, false, true, true), &empty),
            ActivationMode::Hold
        );
        assert_eq!(
            resolve_mode(None, &attrs(true, false, true, false), &empty),
            ActivationMode::HoldNoRetrigger
        );
        assert_eq!(
            resolve_mode(None, &attrs(false, true, false, false), &empty),
            ActivationMode::Hold
        );
        assert_eq!(
            resolve_mode(None, &attrs(false, false, true, false), &empty),
            ActivationMode::Tap
        );
        assert_eq!(
            resolve_mode(None, &attrs(false, false, false, false), &empty),
            ActivationMode::Press
        );
    }

    #[test]
    fn test_metadata_for_falls_back_to_press() {
        let table = ActivationModeTable::new();
        let meta = metadata_for(ActivationMode::SmartToggle, &table);
        assert_eq!(meta, ActivationModeMetadata::press_default());

        let builtin = ActivationModeTable::builtin();
        assert!(metadata_for(ActivationMode::Tap, &builtin).on_release);
    }
}
