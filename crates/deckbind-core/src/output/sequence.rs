// Deckbind Output Sequences
// Ordering logic for pressing and releasing a parsed input

use crate::input::{MouseButton, ParsedInput, WheelDirection};

use super::state::Held;

/// Where a configured pause goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// After modifiers go down and before they come up
    Modifier,
    /// Between a key's down and up
    KeyHold,
}

/// One step of an output sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStep {
    Down(Held),
    Up(Held),
    Click(MouseButton),
    Scroll(WheelDirection),
    Pause(Pause),
}

fn modifier_downs(input: &ParsedInput, steps: &mut Vec<OutputStep>) {
    let modifiers = input.modifiers();
    for modifier in modifiers {
        steps.push(OutputStep::Down(Held::Key(modifier.key())));
    }
    if !modifiers.is_empty() {
        steps.push(OutputStep::Pause(Pause::Modifier));
    }
}

fn modifier_ups(input: &ParsedInput, steps: &mut Vec<OutputStep>) {
    let modifiers = input.modifiers();
    if !modifiers.is_empty() {
        steps.push(OutputStep::Pause(Pause::Modifier));
    }
    for modifier in modifiers.iter().rev() {
        steps.push(OutputStep::Up(Held::Key(modifier.key())));
    }
}

/// Steps for one complete press of `input`.
///
/// Modifiers go down in written order and come up in reverse; every key is
/// tapped with a hold in between. Wheel notches are always a single press.
pub fn press_sequence(input: &ParsedInput) -> Vec<OutputStep> {
    let mut steps = Vec::new();
    modifier_downs(input, &mut steps);
    match input {
        ParsedInput::Keyboard { keys, .. } => {
            for key in keys {
                steps.push(OutputStep::Down(Held::Key(*key)));
                steps.push(OutputStep::Pause(Pause::KeyHold));
                steps.push(OutputStep::Up(Held::Key(*key)));
            }
        }
        ParsedInput::MouseButton { button, .. } => steps.push(OutputStep::Click(*button)),
        ParsedInput::MouseWheel { direction, .. } => steps.push(OutputStep::Scroll(*direction)),
    }
    modifier_ups(input, &mut steps);
    steps
}

/// Inputs that stay down while `input` is held, in press order
pub fn held_inputs(input: &ParsedInput) -> Vec<Held> {
    let mut held: Vec<Held> = input
        .modifiers()
        .iter()
        .map(|m| Held::Key(m.key()))
        .collect();
    match input {
        ParsedInput::Keyboard { keys, .. } => held.extend(keys.iter().map(|k| Held::Key(*k))),
        ParsedInput::MouseButton { button, .. } => held.push(Held::Button(*button)),
        ParsedInput::MouseWheel { .. } => {}
    }
    held
}

/// Steps that start holding `input`
pub fn hold_down_sequence(input: &ParsedInput) -> Vec<OutputStep> {
    let mut steps = Vec::new();
    modifier_downs(input, &mut steps);
    let skip = input.modifiers().len();
    for held in held_inputs(input).into_iter().skip(skip) {
        steps.push(OutputStep::Down(held));
    }
    steps
}

/// Steps that release a held `input`, the exact reverse of [`hold_down_sequence`]
pub fn hold_up_sequence(input: &ParsedInput) -> Vec<OutputStep> {
    let mut steps = Vec::new();
    let skip = input.modifiers().len();
    let mains: Vec<Held> = held_inputs(input).into_iter().skip(skip).collect();
    for held in mains.into_iter().rev() {
        steps.push(OutputStep::Up(held));
    }
    modifier_ups(input, &mut steps);
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::parse_binding;
    use crate::{Key, ModifierKey};

    fn key(code: u16) -> Held {
        Held::Key(Key::from(code))
    }

    #[test]
    fn test_press_sequence_no_modifiers() {
        let input = parse_binding("f").unwrap();
        assert_eq!(
            press_sequence(&input),
            vec![
                OutputStep::Down(key(33)),
                OutputStep::Pause(Pause::KeyHold),
                OutputStep::Up(key(33)),
            ]
        );
    }

    #[test]
    fn test_press_sequence_modifiers_wrap_key() {
        let input = parse_binding("lctrl+lalt+f1").unwrap();
        let steps = press_sequence(&input);
        let lctrl = Held::Key(ModifierKey::LCtrl.key());
        let lalt = Held::Key(ModifierKey::LAlt.key());

        assert_eq!(steps.first(), Some(&OutputStep::Down(lctrl)));
        assert_eq!(steps[1], OutputStep::Down(lalt));
        assert_eq!(steps[steps.len() - 2], OutputStep::Up(lalt));
        assert_eq!(steps.last(), Some(&OutputStep::Up(lctrl)));
        assert!(steps.contains(&OutputStep::Down(key(59))));
    }

    #[test]
    fn test_press_sequence_wheel_and_mouse() {
        let wheel = parse_binding("lalt+mwheel_up").unwrap();
        let steps = press_sequence(&wheel);
        assert!(steps.contains(&OutputStep::Scroll(WheelDirection::Up)));
        assert_eq!(steps.len(), 5);

        let mouse = parse_binding("mouse3").unwrap();
        assert_eq!(
            press_sequence(&mouse),
            vec![OutputStep::Click(MouseButton::Middle)]
        );
    }

    #[test]
    fn test_hold_up_reverses_hold_down() {
        let input = parse_binding("lshift+lctrl+w").unwrap();
        let downs: Vec<Held> = hold_down_sequence(&input)
            .into_iter()
            .filter_map(|s| match s {
                OutputStep::Down(h) => Some(h),
                _ => None,
            })
            .collect();
        let mut ups: Vec<Held> = hold_up_sequence(&input)
            .into_iter()
            .filter_map(|s| match s {
                OutputStep::Up(h) => Some(h),
                _ => None,
            })
            .collect();
        ups.reverse();
        assert_eq!(downs, ups);
        assert_eq!(downs, held_inputs(&input));
    }

    #[test]
    fn test_wheel_holds_nothing() {
        let input = parse_binding("mwheel_down").unwrap();
        assert!(held_inputs(&input).is_empty());
    }
}
