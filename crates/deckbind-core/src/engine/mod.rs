// Deckbind Activation Engine
// Facade the host calls for every button event

mod request;
mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::activation::{dispatch, metadata_for, ActivationExecutionContext, ActivationModeTable};
use crate::executor::{ExecutorError, InputExecutor};
use crate::input::{parse_binding, ParseError};
use crate::output::InputSink;
use crate::settings::EngineSettings;

pub use request::ExecutionRequest;
pub use worker::{DispatchJob, WorkerPool};

/// Errors surfaced by the engine facade
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("dispatch queue is closed")]
    QueueClosed,

    #[error("engine has been shut down")]
    ShutDown,

    #[error("failed to start dispatch workers: {0}")]
    Spawn(#[from] std::io::Error),
}

/// The activation engine.
///
/// Validation, parsing and metadata lookup run on the caller's thread; the
/// handler itself runs on a dispatch worker. Dropping the engine shuts it
/// down, releasing every held input.
pub struct Engine {
    executor: Arc<InputExecutor>,
    modes: RwLock<Arc<ActivationModeTable>>,
    pool: WorkerPool,
    settings: EngineSettings,
    closed: AtomicBool,
}

impl Engine {
    pub fn new(
        sink: Arc<dyn InputSink>,
        settings: EngineSettings,
        modes: ActivationModeTable,
    ) -> Result<Self, EngineError> {
        let executor = InputExecutor::new(sink, &settings);
        let pool = WorkerPool::new(
            settings.workers.resolved_count(),
            Arc::clone(&executor),
            settings.multi_tap.window(),
        )?;
        Ok(Self {
            executor,
            modes: RwLock::new(Arc::new(modes)),
            pool,
            settings,
            closed: AtomicBool::new(false),
        })
    }

    /// Engine with the game's stock activation modes
    pub fn with_builtin_modes(
        sink: Arc<dyn InputSink>,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        Self::new(sink, settings, ActivationModeTable::builtin())
    }

    fn prepare(&self, req: &ExecutionRequest) -> Result<DispatchJob, EngineError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EngineError::ShutDown);
        }
        req.validate()?;
        let input = parse_binding(&req.binding)?;
        let modes = self.modes();
        let meta = metadata_for(req.activation_mode, &modes);
        Ok(DispatchJob {
            mode: req.activation_mode,
            meta,
            ctx: ActivationExecutionContext {
                action_name: req.action_name.clone(),
                input,
                is_button_down: req.is_button_down,
            },
        })
    }

    /// Queue a request. Errors report validation, parse or queue failures;
    /// failures inside the handler are logged by the worker.
    pub fn try_execute(&self, req: &ExecutionRequest) -> Result<(), EngineError> {
        let job = self.prepare(req)?;
        log::debug!(
            "queue '{}' {} ({}) down={}",
            req.action_name,
            req.activation_mode,
            req.binding,
            req.is_button_down
        );
        if self.pool.submit(job) {
            Ok(())
        } else {
            Err(EngineError::QueueClosed)
        }
    }

    /// Queue a request; `false` if it was rejected
    pub fn execute(&self, req: &ExecutionRequest) -> bool {
        match self.try_execute(req) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("rejected '{}' ({}): {}", req.action_name, req.binding, e);
                false
            }
        }
    }

    /// Run a request on the calling thread, bypassing the workers
    pub fn dispatch_now(&self, req: &ExecutionRequest) -> Result<(), EngineError> {
        let job = self.prepare(req)?;
        dispatch(
            &self.executor,
            job.mode,
            &job.meta,
            self.settings.multi_tap.window(),
            &job.ctx,
        )?;
        Ok(())
    }

    /// Swap in a new activation mode table
    pub fn replace_modes(&self, modes: ActivationModeTable) {
        log::debug!("activation mode table replaced ({} modes)", modes.len());
        *self.modes.write() = Arc::new(modes);
    }

    pub fn modes(&self) -> Arc<ActivationModeTable> {
        Arc::clone(&self.modes.read())
    }

    /// Wait until every request queued before this call has been handled
    pub fn sync(&self) {
        self.pool.sync();
    }

    pub fn executor(&self) -> &Arc<InputExecutor> {
        &self.executor
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    /// Drain the queues, then release everything held. Idempotent.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.pool.stop();
        self.executor.shutdown();
        log::debug!("engine shut down");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationMode;
    use crate::output::RecordingSink;

    fn engine() -> (Arc<RecordingSink>, Engine) {
        let sink = Arc::new(RecordingSink::new());
        let engine = Engine::with_builtin_modes(sink.clone(), EngineSettings::immediate()).unwrap();
        (sink, engine)
    }

    #[test]
    fn test_execute_rejects_bad_requests() {
        let (sink, engine) = engine();
        assert!(!engine.execute(&ExecutionRequest::down("", "f", ActivationMode::Press)));
        assert!(!engine.execute(&ExecutionRequest::down("fire", "", ActivationMode::Press)));
        assert!(matches!(
            engine.try_execute(&ExecutionRequest::down(
                "fire",
                "lctrl+nope",
                ActivationMode::Press
            )),
            Err(EngineError::Parse(_))
        ));
        engine.sync();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_execute_then_sync() {
        let (sink, engine) = engine();
        assert!(engine.execute(&ExecutionRequest::down("fire", "f", ActivationMode::Press)));
        engine.sync();
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn test_dispatch_now_is_synchronous() {
        let (sink, engine) = engine();
        engine
            .dispatch_now(&ExecutionRequest::down("boost", "lshift", ActivationMode::Hold))
            .unwrap();
        assert!(engine.executor().is_holding("boost"));
        assert_eq!(sink.events().len(), 1);
    }

    #[test]
    fn test_huge_threshold_does_not_fault_dispatch() {
        let (sink, engine) = engine();
        let mut modes = ActivationModeTable::builtin();
        modes.insert(
            "delayed_press",
            crate::ActivationModeMetadata {
                on_press: true,
                press_trigger_threshold: 1e20,
                ..Default::default()
            },
        );
        engine.replace_modes(modes);

        engine
            .dispatch_now(&ExecutionRequest::down("eject", "l", ActivationMode::DelayedPress))
            .unwrap();
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn test_replace_modes() {
        let (_sink, engine) = engine();
        assert!(engine.modes().get("press").is_some());
        engine.replace_modes(ActivationModeTable::new());
        assert!(engine.modes().is_empty());
    }

    #[test]
    fn test_shutdown_refuses_requests() {
        let (sink, engine) = engine();
        engine
            .dispatch_now(&ExecutionRequest::down("boost", "lshift", ActivationMode::Hold))
            .unwrap();
        engine.shutdown();
        engine.shutdown();
        assert_eq!(sink.events().len(), 2);
        assert!(matches!(
            engine.try_execute(&ExecutionRequest::down("fire", "f", ActivationMode::Press)),
            Err(EngineError::ShutDown)
        ));
    }
}
