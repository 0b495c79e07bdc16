// Deckbind Activation Handlers
// One function per activation mode family; all state lives in the executor

use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace};

use super::mode::{ActivationMode, ActivationModeMetadata};
use super::ActivationExecutionContext;
use crate::executor::{DelayedKind, ExecutorError, InputExecutor, TimerKind};

/// Route one button event to the handler for `mode`
pub fn dispatch(
    executor: &Arc<InputExecutor>,
    mode: ActivationMode,
    meta: &ActivationModeMetadata,
    default_tap_window: Duration,
    ctx: &ActivationExecutionContext,
) -> Result<(), ExecutorError> {
    trace!(
        "dispatch '{}' mode={} down={}",
        ctx.action_name,
        mode,
        ctx.is_button_down
    );
    match mode {
        ActivationMode::Press | ActivationMode::PressQuicker => press(executor, ctx),
        ActivationMode::Hold | ActivationMode::HoldNoRetrigger | ActivationMode::All => {
            let retriggerable = meta.retriggerable && mode != ActivationMode::HoldNoRetrigger;
            hold(executor, ctx, retriggerable)
        }
        ActivationMode::Tap | ActivationMode::TapQuicker => tap(executor, ctx),
        ActivationMode::DelayedPress
        | ActivationMode::DelayedPressQuicker
        | ActivationMode::DelayedPressMedium
        | ActivationMode::DelayedPressLong => delayed_press(executor, meta, ctx),
        ActivationMode::DelayedHold
        | ActivationMode::DelayedHoldLong
        | ActivationMode::DelayedHoldNoRetrigger => delayed_hold(executor, meta, ctx),
        ActivationMode::DoubleTap | ActivationMode::DoubleTapNonblocking => {
            multi_tap(executor, meta, default_tap_window, ctx)
        }
        ActivationMode::HoldToggle => toggle(executor, meta, ctx, false),
        ActivationMode::SmartToggle => toggle(executor, meta, ctx, true),
    }
}

fn press(
    executor: &Arc<InputExecutor>,
    ctx: &ActivationExecutionContext,
) -> Result<(), ExecutorError> {
    if ctx.is_button_down {
        executor.press_once(&ctx.input)?;
    }
    Ok(())
}

fn hold(
    executor: &Arc<InputExecutor>,
    ctx: &ActivationExecutionContext,
    retriggerable: bool,
) -> Result<(), ExecutorError> {
    let action = ctx.action_name.as_str();
    if !ctx.is_button_down {
        executor.hold_stop(action)?;
        return Ok(());
    }
    if executor.is_holding(action) {
        if !retriggerable {
            trace!("'{}' already held, not retriggerable", action);
            return Ok(());
        }
        debug!("'{}' retriggered", action);
        executor.hold_stop(action)?;
    }
    executor.hold_start(action, &ctx.input)?;
    Ok(())
}

fn tap(
    executor: &Arc<InputExecutor>,
    ctx: &ActivationExecutionContext,
) -> Result<(), ExecutorError> {
    if !ctx.is_button_down {
        executor.press_once(&ctx.input)?;
    }
    Ok(())
}

fn delayed_press(
    executor: &Arc<InputExecutor>,
    meta: &ActivationModeMetadata,
    ctx: &ActivationExecutionContext,
) -> Result<(), ExecutorError> {
    let action = ctx.action_name.as_str();
    if !ctx.is_button_down {
        if let Some(kind) = executor.cancel_scheduled(action) {
            trace!("'{}' released early, {} cancelled", action, kind);
        }
        return Ok(());
    }
    match meta.press_trigger() {
        Some(delay) => executor.schedule_delayed(DelayedKind::Press, action, &ctx.input, delay),
        None => executor.press_once(&ctx.input),
    }
}

fn delayed_hold(
    executor: &Arc<InputExecutor>,
    meta: &ActivationModeMetadata,
    ctx: &ActivationExecutionContext,
) -> Result<(), ExecutorError> {
    let action = ctx.action_name.as_str();
    if !ctx.is_button_down {
        let outcome = executor.release_delayed(action)?;
        trace!("'{}' delayed hold released: {:?}", action, outcome);
        return Ok(());
    }
    match meta.press_trigger() {
        Some(delay) => executor.schedule_delayed(DelayedKind::Hold, action, &ctx.input, delay),
        None => executor.hold_start(action, &ctx.input).map(|_| ()),
    }
}

fn multi_tap(
    executor: &Arc<InputExecutor>,
    meta: &ActivationModeMetadata,
    default_window: Duration,
    ctx: &ActivationExecutionContext,
) -> Result<(), ExecutorError> {
    if ctx.is_button_down {
        return Ok(());
    }
    let window = meta.release_trigger().unwrap_or(default_window);
    executor.register_tap(
        &ctx.action_name,
        &ctx.input,
        meta.required_taps(),
        window,
        meta.multi_tap_block,
    )?;
    Ok(())
}

fn toggle(
    executor: &Arc<InputExecutor>,
    meta: &ActivationModeMetadata,
    ctx: &ActivationExecutionContext,
    smart: bool,
) -> Result<(), ExecutorError> {
    let action = ctx.action_name.as_str();
    if ctx.is_button_down {
        if !executor.is_holding(action) {
            executor.hold_start(action, &ctx.input)?;
            return Ok(());
        }
        debug!("'{}' toggled off", action);
        match meta.release_delay() {
            Some(delay) => executor.schedule_hold_stop(action, delay)?,
            None => {
                executor.hold_stop(action)?;
            }
        }
        return Ok(());
    }

    if !smart || executor.pending_timer(action) == Some(TimerKind::ToggleOff) {
        return Ok(());
    }
    // A long press that turned the toggle on acts momentarily
    let (Some(started), Some(threshold)) = (executor.hold_started(action), meta.release_trigger())
    else {
        return Ok(());
    };
    if started.elapsed() > threshold {
        debug!("'{}' held past {:?}, releasing", action, threshold);
        executor.hold_stop(action)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationModeTable;
    use crate::input::parse_binding;
    use crate::output::{RecordingSink, SinkEvent};
    use crate::settings::EngineSettings;
    use crate::ModifierKey;
    use std::thread;

    struct Rig {
        sink: Arc<RecordingSink>,
        executor: Arc<InputExecutor>,
        table: ActivationModeTable,
    }

    impl Rig {
        fn new() -> Self {
            let sink = Arc::new(RecordingSink::new());
            let executor = InputExecutor::new(sink.clone(), &EngineSettings::immediate());
            Self {
                sink,
                executor,
                table: ActivationModeTable::builtin(),
            }
        }

        fn send(&self, action: &str, binding: &str, mode: ActivationMode, down: bool) {
            let meta = *self.table.get(mode.name()).unwrap();
            let ctx = ActivationExecutionContext {
                action_name: action.to_string(),
                input: parse_binding(binding).unwrap(),
                is_button_down: down,
            };
            dispatch(&self.executor, mode, &meta, Duration::from_millis(250), &ctx).unwrap();
        }
    }

    #[test]
    fn test_press_fires_on_down_only() {
        let rig = Rig::new();
        rig.send("fire", "lshift+f", ActivationMode::Press, true);
        assert_eq!(rig.sink.take().len(), 4);
        rig.send("fire", "lshift+f", ActivationMode::Press, false);
        assert!(rig.sink.events().is_empty());
    }

    #[test]
    fn test_tap_fires_on_up_only() {
        let rig = Rig::new();
        rig.send("ping", "p", ActivationMode::Tap, true);
        assert!(rig.sink.events().is_empty());
        rig.send("ping", "p", ActivationMode::Tap, false);
        assert_eq!(rig.sink.events().len(), 2);
    }

    #[test]
    fn test_hold_no_retrigger_ignores_second_down() {
        let rig = Rig::new();
        rig.send("boost", "lshift", ActivationMode::HoldNoRetrigger, true);
        rig.send("boost", "lshift", ActivationMode::HoldNoRetrigger, true);
        assert_eq!(
            rig.sink.take(),
            vec![SinkEvent::KeyDown(ModifierKey::LShift.key())]
        );
        rig.send("boost", "lshift", ActivationMode::HoldNoRetrigger, false);
        assert_eq!(
            rig.sink.take(),
            vec![SinkEvent::KeyUp(ModifierKey::LShift.key())]
        );
    }

    #[test]
    fn test_hold_retrigger_restarts() {
        let rig = Rig::new();
        rig.send("boost", "lshift", ActivationMode::Hold, true);
        rig.send("boost", "lshift", ActivationMode::Hold, true);
        let shift = ModifierKey::LShift.key();
        assert_eq!(
            rig.sink.take(),
            vec![
                SinkEvent::KeyDown(shift),
                SinkEvent::KeyUp(shift),
                SinkEvent::KeyDown(shift),
            ]
        );
        assert!(rig.executor.is_holding("boost"));
    }

    #[test]
    fn test_delayed_press_released_early() {
        let rig = Rig::new();
        rig.send("eject", "lalt+l", ActivationMode::DelayedPressMedium, true);
        thread::sleep(Duration::from_millis(100));
        rig.send("eject", "lalt+l", ActivationMode::DelayedPressMedium, false);
        thread::sleep(Duration::from_millis(600));
        assert!(rig.sink.events().is_empty());
    }

    #[test]
    fn test_delayed_press_fires_after_threshold() {
        let rig = Rig::new();
        rig.send("eject", "l", ActivationMode::DelayedPressQuicker, true);
        thread::sleep(Duration::from_millis(400));
        rig.send("eject", "l", ActivationMode::DelayedPressQuicker, false);
        assert_eq!(rig.sink.events().len(), 2);
    }

    #[test]
    fn test_toggle_on_off() {
        let rig = Rig::new();
        rig.send("lights", "l", ActivationMode::HoldToggle, true);
        rig.send("lights", "l", ActivationMode::HoldToggle, false);
        assert!(rig.executor.is_holding("lights"));
        rig.send("lights", "l", ActivationMode::HoldToggle, true);
        assert!(!rig.executor.is_holding("lights"));
        rig.send("lights", "l", ActivationMode::HoldToggle, false);
        assert_eq!(rig.sink.events().len(), 2);
    }

    #[test]
    fn test_smart_toggle_long_press_is_momentary() {
        let rig = Rig::new();
        rig.send("aim", "mouse2", ActivationMode::SmartToggle, true);
        thread::sleep(Duration::from_millis(350));
        rig.send("aim", "mouse2", ActivationMode::SmartToggle, false);
        assert!(!rig.executor.is_holding("aim"));
    }

    #[test]
    fn test_smart_toggle_short_press_latches() {
        let rig = Rig::new();
        rig.send("aim", "mouse2", ActivationMode::SmartToggle, true);
        rig.send("aim", "mouse2", ActivationMode::SmartToggle, false);
        assert!(rig.executor.is_holding("aim"));
    }
}
