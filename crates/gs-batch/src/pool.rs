// pool.rs - Bounded worker pool for per-member scoring.
//
// Follows the classic bounded-executor shape:
//   - `core_workers` threads start eagerly and pull from a shared queue
//   - the queue holds at most `queue_capacity` jobs
//   - when the queue is full and fewer than `max_workers` threads exist, a new
//     thread is started and handed the job directly
//   - past that, the rejection policy decides (block, abort, caller runs)
// Shutdown closes the queue, lets workers drain what is already queued, and
// waits up to `await_termination_secs` before abandoning stragglers.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::{PoolConfig, RejectionPolicy};
use crate::error::{PoolError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

const SHUTDOWN_POLL: Duration = Duration::from_millis(10);

pub struct WorkerPool {
    config: PoolConfig,
    sender: Option<SyncSender<Job>>,
    receiver: Arc<Mutex<Receiver<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Validate `config` and start the core workers.
    pub fn start(config: &PoolConfig) -> Result<Self> {
        config.validate()?;

        let (sender, receiver) = mpsc::sync_channel::<Job>(config.queue_capacity);
        let pool = Self {
            config: config.clone(),
            sender: Some(sender),
            receiver: Arc::new(Mutex::new(receiver)),
            workers: Mutex::new(Vec::with_capacity(config.max_workers)),
        };

        {
            let mut workers = pool.lock_workers();
            for ordinal in 0..config.core_workers {
                workers.push(pool.spawn_worker(ordinal, None)?);
            }
        }

        tracing::info!(
            core = config.core_workers,
            max = config.max_workers,
            queue = config.queue_capacity,
            prefix = %config.thread_name_prefix,
            "worker pool started"
        );
        Ok(pool)
    }

    /// Submit a job, growing the pool or applying the rejection policy when
    /// the queue is full.
    pub fn submit<F>(&self, job: F) -> std::result::Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(PoolError::ShutDown)?;

        let job: Job = match sender.try_send(Box::new(job)) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Disconnected(_)) => return Err(PoolError::ShutDown),
            Err(TrySendError::Full(job)) => job,
        };

        let worker_count = {
            let mut workers = self.lock_workers();
            if workers.len() < self.config.max_workers {
                let ordinal = workers.len();
                workers.push(self.spawn_worker(ordinal, Some(job))?);
                tracing::debug!(workers = workers.len(), "queue full, worker pool grew");
                return Ok(());
            }
            workers.len()
        };

        match self.config.rejection {
            RejectionPolicy::Block => sender.send(job).map_err(|_| PoolError::ShutDown),
            RejectionPolicy::Abort => Err(PoolError::Saturated {
                workers: worker_count,
                queued: self.config.queue_capacity,
            }),
            RejectionPolicy::CallerRuns => {
                run_job(job);
                Ok(())
            }
        }
    }

    pub fn worker_count(&self) -> usize {
        self.lock_workers().len()
    }

    /// Stop accepting work, drain the queue, and wait for workers.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        // Dropping the sender closes the queue; workers exit once it is empty.
        if self.sender.take().is_none() {
            return;
        }

        let mut pending: Vec<JoinHandle<()>> = self.lock_workers().drain(..).collect();
        let deadline = Instant::now() + self.config.await_termination();

        loop {
            let (finished, running): (Vec<_>, Vec<_>) =
                pending.into_iter().partition(|h| h.is_finished());
            for handle in finished {
                if handle.join().is_err() {
                    tracing::warn!("worker thread exited with a panic");
                }
            }
            if running.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                tracing::warn!(
                    abandoned = running.len(),
                    grace_secs = self.config.await_termination_secs,
                    "worker pool shutdown grace period elapsed, abandoning busy workers"
                );
                break;
            }
            pending = running;
            thread::sleep(SHUTDOWN_POLL);
        }

        tracing::info!("worker pool shut down");
    }

    fn spawn_worker(
        &self,
        ordinal: usize,
        first_job: Option<Job>,
    ) -> std::result::Result<JoinHandle<()>, PoolError> {
        let name = format!("{}{}", self.config.thread_name_prefix, ordinal + 1);
        let receiver = Arc::clone(&self.receiver);

        thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                if let Some(job) = first_job {
                    run_job(job);
                }
                loop {
                    let next = match receiver.lock() {
                        Ok(rx) => rx.recv(),
                        Err(_) => break,
                    };
                    match next {
                        Ok(job) => run_job(job),
                        Err(_) => break,
                    }
                }
            })
            .map_err(|source| PoolError::Spawn { name, source })
    }

    fn lock_workers(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

// A panicking job must not take its worker thread down with it.
fn run_job(job: Job) {
    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
        tracing::error!("worker pool job panicked");
    }
}
