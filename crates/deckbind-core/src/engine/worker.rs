// Deckbind Dispatch Workers
// Multi-worker dispatcher with per-action routing

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::activation::{
    dispatch, ActivationExecutionContext, ActivationMode, ActivationModeMetadata,
};
use crate::executor::{ExecutorError, InputExecutor};

/// A fully prepared event, ready for its handler
#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub mode: ActivationMode,
    pub meta: ActivationModeMetadata,
    pub ctx: ActivationExecutionContext,
}

enum Job {
    Dispatch(DispatchJob),
    Barrier(Sender<()>),
    Stop,
}

/// Fixed set of dispatch threads.
///
/// Jobs for one action always land on the same worker, so they run in the
/// order they were queued; different actions run in parallel.
pub struct WorkerPool {
    workers: Vec<Sender<Job>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(
        worker_count: usize,
        executor: Arc<InputExecutor>,
        tap_window: Duration,
    ) -> std::io::Result<Self> {
        let worker_count = worker_count.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        let mut handles = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let (tx, rx) = unbounded();
            let executor = Arc::clone(&executor);
            let handle = thread::Builder::new()
                .name(format!("deckbind-worker-{}", worker_id))
                .spawn(move || run_worker(worker_id, executor, tap_window, rx))?;
            workers.push(tx);
            handles.push(handle);
        }

        log::debug!("started {} dispatch workers", worker_count);
        Ok(Self {
            workers,
            handles: Mutex::new(handles),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn worker_index(&self, action: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        action.hash(&mut hasher);
        (hasher.finish() as usize) % self.workers.len()
    }

    /// Queue a job; `false` if the worker has already stopped
    pub fn submit(&self, job: DispatchJob) -> bool {
        let idx = self.worker_index(&job.ctx.action_name);
        self.workers[idx].send(Job::Dispatch(job)).is_ok()
    }

    /// Block until every job queued before this call has run
    pub fn sync(&self) {
        let (ack_tx, ack_rx) = bounded(self.workers.len());
        let mut expected = 0;
        for worker in &self.workers {
            if worker.send(Job::Barrier(ack_tx.clone())).is_ok() {
                expected += 1;
            }
        }
        drop(ack_tx);
        for _ in 0..expected {
            if ack_rx.recv().is_err() {
                break;
            }
        }
    }

    /// Let queued jobs finish, then stop and join every worker
    pub fn stop(&self) {
        for worker in &self.workers {
            let _ = worker.send(Job::Stop);
        }
        let handles: Vec<JoinHandle<()>> = self.handles.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                log::error!("dispatch worker exited by panic");
            }
        }
    }
}

fn run_worker(
    worker_id: usize,
    executor: Arc<InputExecutor>,
    tap_window: Duration,
    jobs: Receiver<Job>,
) {
    for job in jobs.iter() {
        match job {
            Job::Dispatch(job) => {
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    dispatch(&executor, job.mode, &job.meta, tap_window, &job.ctx)
                }));
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(ExecutorError::ShutDown)) => {
                        log::debug!("'{}' dropped, executor shut down", job.ctx.action_name);
                    }
                    Ok(Err(e)) => {
                        log::error!("dispatch of '{}' failed: {}", job.ctx.action_name, e);
                    }
                    Err(_) => {
                        log::error!(
                            "dispatch of '{}' panicked on worker {}",
                            job.ctx.action_name,
                            worker_id
                        );
                    }
                }
            }
            Job::Barrier(ack) => {
                let _ = ack.send(());
            }
            Job::Stop => break,
        }
    }
    log::trace!("dispatch worker {} stopped", worker_id);
}
