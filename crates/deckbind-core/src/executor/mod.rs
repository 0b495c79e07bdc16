// Deckbind Input Executor
// Timed, reference-counted emission of parsed inputs through an InputSink

mod holds;
mod scheduler;
mod taps;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, trace, warn};
use parking_lot::Mutex;

use crate::input::ParsedInput;
use crate::output::{
    hold_down_sequence, hold_up_sequence, press_sequence, Held, InputSink, OutputStep, Pause,
    PressedInputs, SinkError,
};
use crate::settings::{EngineSettings, RepeatSettings, TimingSettings};

pub use holds::{HoldEntry, HoldTable};
pub use scheduler::{Claimed, Scheduler, TimerKind};
pub use taps::{TapOutcome, TapWindows};

/// Errors from executor primitives
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("executor has been shut down")]
    ShutDown,

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("failed to start timer thread: {0}")]
    Timer(#[from] std::io::Error),
}

/// What a delayed timer performs when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayedKind {
    Press,
    Hold,
}

impl DelayedKind {
    fn timer_kind(self) -> TimerKind {
        match self {
            DelayedKind::Press => TimerKind::DelayedPress,
            DelayedKind::Hold => TimerKind::DelayedHold,
        }
    }
}

/// Result of releasing a delayed activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The timer had not fired; nothing was emitted
    Cancelled,
    /// The timer had fired and started a hold, which is now released
    Released,
    /// Nothing pending and nothing held
    Idle,
}

/// Executes parsed inputs: one-shot presses, holds, delayed and multi-tap activations.
///
/// All state is keyed by action name and scoped to this instance. Table locks
/// are never held across a sink call, except for a hold's own emission gate.
pub struct InputExecutor {
    sink: Arc<dyn InputSink>,
    timing: TimingSettings,
    repeat: RepeatSettings,
    holds: HoldTable,
    scheduler: Arc<Scheduler>,
    taps: TapWindows,
    pressed: PressedInputs,
    closed: AtomicBool,
}

impl InputExecutor {
    pub fn new(sink: Arc<dyn InputSink>, settings: &EngineSettings) -> Arc<Self> {
        Arc::new(Self {
            sink,
            timing: settings.timing,
            repeat: settings.repeat,
            holds: HoldTable::new(),
            scheduler: Arc::new(Scheduler::new()),
            taps: TapWindows::new(),
            pressed: PressedInputs::new(),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), ExecutorError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(ExecutorError::ShutDown)
        } else {
            Ok(())
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn pause(&self, pause: Pause) {
        let duration = match pause {
            Pause::Modifier => self.timing.modifier_delay(),
            Pause::KeyHold => self.timing.key_hold(),
        };
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }

    fn emit_step(&self, step: OutputStep) -> Result<(), ExecutorError> {
        match step {
            OutputStep::Down(held) => {
                // Nothing new goes down once shutdown has drained the tracker
                self.ensure_open()?;
                if self.pressed.press(held) {
                    let result = match held {
                        Held::Key(key) => self.sink.key_down(key),
                        Held::Button(button) => self.sink.button_down(button),
                    };
                    if let Err(e) = result {
                        self.pressed.release(held);
                        return Err(e.into());
                    }
                }
            }
            OutputStep::Up(held) => {
                if self.pressed.release(held) {
                    match held {
                        Held::Key(key) => self.sink.key_up(key)?,
                        Held::Button(button) => self.sink.button_up(button)?,
                    }
                }
            }
            OutputStep::Click(button) => {
                // A button held by another action is already down
                if !self.pressed.is_pressed(Held::Button(button)) {
                    self.sink.click(button, self.timing.click_hold())?;
                }
            }
            OutputStep::Scroll(direction) => self.sink.scroll(direction)?,
            OutputStep::Pause(pause) => self.pause(pause),
        }
        Ok(())
    }

    /// Run steps in order; on failure release whatever this run left down
    fn run_sequence(&self, steps: &[OutputStep]) -> Result<(), ExecutorError> {
        let mut down: Vec<Held> = Vec::new();
        for step in steps {
            if let Err(e) = self.emit_step(*step) {
                self.rollback(&down);
                return Err(e);
            }
            match step {
                OutputStep::Down(held) => down.push(*held),
                OutputStep::Up(held) => down.retain(|h| h != held),
                _ => {}
            }
        }
        Ok(())
    }

    fn rollback(&self, down: &[Held]) {
        for held in down.iter().rev() {
            if let Err(e) = self.emit_step(OutputStep::Up(*held)) {
                error!("Failed to release {:?} during rollback: {}", held, e);
            }
        }
    }

    /// Emit a complete down+up sequence for `input`
    pub fn press_once(&self, input: &ParsedInput) -> Result<(), ExecutorError> {
        self.ensure_open()?;
        trace!("press_once {}", input);
        self.run_sequence(&press_sequence(input))
    }

    /// Start holding `input` for `action`.
    ///
    /// Returns `false` without emitting anything if the action is already
    /// holding. Wheel inputs cannot be held and are pressed once instead.
    pub fn hold_start(
        self: &Arc<Self>,
        action: &str,
        input: &ParsedInput,
    ) -> Result<bool, ExecutorError> {
        self.ensure_open()?;
        if !input.is_holdable() {
            debug!("'{}' holds a wheel input, pressing once instead", action);
            self.press_once(input)?;
            return Ok(false);
        }
        self.start_hold_with(action, input, |entry| self.holds.insert_if_absent(action, entry))
    }

    /// Insert through `insert` with the emission gate already locked, then press
    fn start_hold_with<F>(
        self: &Arc<Self>,
        action: &str,
        input: &ParsedInput,
        insert: F,
    ) -> Result<bool, ExecutorError>
    where
        F: FnOnce(HoldEntry) -> bool,
    {
        let gate = Arc::new(Mutex::new(()));
        let emitting = gate.lock();
        if !insert(HoldEntry::new(input.clone(), Arc::clone(&gate))) {
            trace!("'{}' already holding", action);
            return Ok(false);
        }

        debug!("hold start '{}' ({})", action, input);
        if let Err(e) = self.run_sequence(&hold_down_sequence(input)) {
            self.holds.remove_if_gate(action, &gate);
            return Err(e);
        }
        drop(emitting);

        if let Err(e) = self.start_repeat(action, input, &gate) {
            warn!("Auto-repeat for '{}' not started: {}", action, e);
        }
        Ok(true)
    }

    /// Re-send the main key of a modified keystroke while its hold lasts.
    ///
    /// Each tick runs under the hold's gate and only while that same entry is
    /// held, so a release never races a repeated key-down.
    fn start_repeat(
        self: &Arc<Self>,
        action: &str,
        input: &ParsedInput,
        gate: &Arc<Mutex<()>>,
    ) -> Result<(), ExecutorError> {
        if !self.repeat.enabled {
            return Ok(());
        }
        let ParsedInput::Keyboard { modifiers, keys } = input else {
            return Ok(());
        };
        let Some(main) = keys.last().copied() else {
            return Ok(());
        };
        if modifiers.is_empty() {
            return Ok(());
        }

        let executor = Arc::downgrade(self);
        let tick_gate = Arc::clone(gate);
        let owned = action.to_string();
        let id = self.scheduler.schedule_repeating(
            action,
            TimerKind::Repeat,
            self.repeat.initial_delay(),
            self.repeat.interval(),
            move || {
                let Some(executor) = executor.upgrade() else {
                    return false;
                };
                let _emitting = tick_gate.lock();
                if executor.is_shut_down() || !executor.holds.holds_gate(&owned, &tick_gate) {
                    trace!("auto-repeat for '{}' ends with its hold", owned);
                    return false;
                }
                if let Err(e) = executor.sink.key_down(main) {
                    warn!("Auto-repeat for '{}' failed: {}", owned, e);
                }
                true
            },
        )?;

        // A stop that ran before the timer was installed could not cancel it
        if !self.holds.holds_gate(action, gate) && self.scheduler.uninstall(action, id) {
            trace!("'{}' released before auto-repeat started", action);
        }
        Ok(())
    }

    /// Release whatever `action` holds. Returns `false` if it held nothing.
    pub fn hold_stop(&self, action: &str) -> Result<bool, ExecutorError> {
        self.ensure_open()?;
        let Some(entry) = self.holds.remove(action) else {
            trace!("'{}' was not holding", action);
            return Ok(false);
        };
        self.scheduler.cancel_kind(action, &[TimerKind::Repeat]);
        self.release_entry(action, &entry)?;
        Ok(true)
    }

    fn release_entry(&self, action: &str, entry: &HoldEntry) -> Result<(), ExecutorError> {
        let _emitting = entry.gate.lock();
        debug!(
            "hold stop '{}' ({}) after {:?}",
            action,
            entry.input,
            entry.started.elapsed()
        );
        self.run_sequence(&hold_up_sequence(&entry.input))
    }

    /// Replace any timer for `action` with one that presses or holds `input` after `delay`
    pub fn schedule_delayed(
        self: &Arc<Self>,
        kind: DelayedKind,
        action: &str,
        input: &ParsedInput,
        delay: Duration,
    ) -> Result<(), ExecutorError> {
        self.ensure_open()?;
        let executor = Arc::clone(self);
        let owned = action.to_string();
        let input = input.clone();

        trace!("'{}' schedules delayed {:?} in {:?}", action, kind, delay);
        self.scheduler.schedule_once(action, kind.timer_kind(), delay, move |claimed| match kind {
            DelayedKind::Press => {
                drop(claimed);
                if let Err(e) = executor.press_once(&input) {
                    error!("Delayed press for '{}' failed: {}", owned, e);
                }
            }
            DelayedKind::Hold => {
                let result = if input.is_holdable() {
                    executor.start_hold_with(&owned, &input, |entry| {
                        // Inserted under the claim: a release now finds the hold
                        let inserted = executor.holds.insert_if_absent(&owned, entry);
                        drop(claimed);
                        inserted
                    })
                } else {
                    drop(claimed);
                    executor.press_once(&input).map(|_| false)
                };
                if let Err(e) = result {
                    error!("Delayed hold for '{}' failed: {}", owned, e);
                }
            }
        })?;
        Ok(())
    }

    /// Cancel a pending timer for `action`; `None` when nothing was pending
    pub fn cancel_scheduled(&self, action: &str) -> Option<TimerKind> {
        self.scheduler.cancel(action)
    }

    /// Button-up for a delayed hold: cancel the timer, or stop the hold it started
    pub fn release_delayed(&self, action: &str) -> Result<ReleaseOutcome, ExecutorError> {
        let pending = [TimerKind::DelayedPress, TimerKind::DelayedHold];
        if self.scheduler.cancel_kind(action, &pending).is_some() {
            trace!("'{}' released before its delay", action);
            return Ok(ReleaseOutcome::Cancelled);
        }
        if self.hold_stop(action)? {
            Ok(ReleaseOutcome::Released)
        } else {
            Ok(ReleaseOutcome::Idle)
        }
    }

    /// Stop the hold of `action` after `delay` (delayed toggle-off)
    pub fn schedule_hold_stop(
        self: &Arc<Self>,
        action: &str,
        delay: Duration,
    ) -> Result<(), ExecutorError> {
        self.ensure_open()?;
        let executor = Arc::clone(self);
        let owned = action.to_string();
        self.scheduler
            .schedule_once(action, TimerKind::ToggleOff, delay, move |claimed| {
                let entry = executor.holds.remove(&owned);
                drop(claimed);
                if let Some(entry) = entry {
                    if let Err(e) = executor.release_entry(&owned, &entry) {
                        error!("Delayed toggle-off for '{}' failed: {}", owned, e);
                    }
                }
            })?;
        Ok(())
    }

    /// Count a tap of `action`; the tap that completes `required` presses `input`.
    ///
    /// Returns whether this tap fired. With `block`, a window that has fired
    /// swallows further taps until it expires.
    pub fn register_tap(
        self: &Arc<Self>,
        action: &str,
        input: &ParsedInput,
        required: u32,
        window: Duration,
        block: bool,
    ) -> Result<bool, ExecutorError> {
        self.ensure_open()?;
        if required <= 1 {
            self.press_once(input)?;
            return Ok(true);
        }

        match self.taps.register(action, required, block) {
            TapOutcome::Opened => {
                let executor = Arc::clone(self);
                let owned = action.to_string();
                self.scheduler
                    .schedule_once(action, TimerKind::TapWindow, window, move |claimed| {
                        executor.taps.expire(&owned);
                        drop(claimed);
                        trace!("tap window for '{}' expired", owned);
                    })?;
                Ok(false)
            }
            TapOutcome::Counted(count) => {
                trace!("'{}' tap {}/{}", action, count, required);
                Ok(false)
            }
            TapOutcome::Fired { close } => {
                if close {
                    self.scheduler.cancel_kind(action, &[TimerKind::TapWindow]);
                }
                debug!("'{}' multi-tap fired", action);
                self.press_once(input)?;
                Ok(true)
            }
            TapOutcome::Swallowed => {
                trace!("'{}' tap swallowed by blocking window", action);
                Ok(false)
            }
        }
    }

    pub fn is_holding(&self, action: &str) -> bool {
        self.holds.contains(action)
    }

    /// When the current hold of `action` began
    pub fn hold_started(&self, action: &str) -> Option<Instant> {
        self.holds.started(action)
    }

    pub fn held_actions(&self) -> Vec<String> {
        self.holds.actions()
    }

    pub fn pending_timer(&self, action: &str) -> Option<TimerKind> {
        self.scheduler.pending(action)
    }

    /// Number of distinct physical inputs currently down
    pub fn pressed_count(&self) -> usize {
        self.pressed.len()
    }

    /// Cancel every timer, release every hold and force up anything still down.
    ///
    /// Idempotent. Afterwards every primitive returns [`ExecutorError::ShutDown`].
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let timers = self.scheduler.clear();
        self.taps.clear();

        let holds = self.holds.drain();
        let hold_count = holds.len();
        for (action, entry) in holds {
            if let Err(e) = self.release_entry(&action, &entry) {
                error!("Failed to release '{}' on shutdown: {}", action, e);
            }
        }

        let leftover = self.pressed.drain();
        for held in &leftover {
            let result = match *held {
                Held::Key(key) => self.sink.key_up(key),
                Held::Button(button) => self.sink.button_up(button),
            };
            if let Err(e) = result {
                error!("Failed to force up {:?}: {}", held, e);
            }
        }
        debug!(
            "executor shut down: {} timers cancelled, {} holds released, {} inputs forced up",
            timers,
            hold_count,
            leftover.len()
        );
    }
}

impl Drop for InputExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
