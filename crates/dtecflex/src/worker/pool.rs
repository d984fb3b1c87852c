use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, error, info, warn};
use serde_json::json;

use crate::broadcast::{JobKind, JobState, JobStore};
use crate::error::WorkerError;
use crate::publish::EntityInserter;

use super::job::InsertTask;

/// Runs queued insertion units on a fixed set of threads.
///
/// Each unit is tracked in the [`JobStore`] under its own id and is bounded
/// by the per-unit time limit. The queue holds two units per worker; a
/// submit beyond that fails instead of stalling the transfer loop.
pub struct InsertWorkerPool {
    sender: Mutex<Option<Sender<InsertTask>>>,
    capacity: usize,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: AtomicBool,
    jobs: Arc<JobStore>,
}

impl InsertWorkerPool {
    pub fn start(
        inserter: Arc<EntityInserter>,
        jobs: Arc<JobStore>,
        worker_count: usize,
        time_limit: Duration,
    ) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::SpawnFailed("worker_count must be > 0".to_string()));
        }
        let capacity = worker_count * 2;
        let (sender, receiver) = bounded::<InsertTask>(capacity);

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let rx = receiver.clone();
            let worker_inserter = Arc::clone(&inserter);
            let worker_jobs = Arc::clone(&jobs);
            let handle = thread::Builder::new()
                .name(format!("insert-worker-{}", worker_id))
                .spawn(move || run_worker(worker_id, rx, worker_inserter, worker_jobs, time_limit))
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;
            workers.push(handle);
        }

        info!("Started {} insertion workers", worker_count);

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            capacity,
            workers: Mutex::new(workers),
            shutdown: AtomicBool::new(false),
            jobs,
        })
    }

    /// Queues a record and returns the unit id. Never blocks: a full queue
    /// fails the unit with [`WorkerError::QueueFull`].
    pub fn submit(&self, record_id: i64) -> Result<String, WorkerError> {
        if self.is_shutdown() {
            return Err(WorkerError::ChannelClosed);
        }
        let sender = self
            .sender
            .lock()
            .map_err(|_| WorkerError::ChannelClosed)?
            .clone()
            .ok_or(WorkerError::ChannelClosed)?;

        let task = InsertTask::new(record_id);
        let unit_id = task.unit_id.clone();
        self.jobs.register(&unit_id, JobKind::Insert, &task.job_key());

        if let Err(e) = sender.try_send(task) {
            let err = match e {
                TrySendError::Full(_) => WorkerError::QueueFull {
                    capacity: self.capacity,
                },
                TrySendError::Disconnected(_) => WorkerError::ChannelClosed,
            };
            warn!("Insertion unit {} for record {} rejected: {}", unit_id, record_id, err);
            self.jobs
                .finish(&unit_id, JobState::Failure, None, Some(err.to_string()));
            return Err(err);
        }
        debug!("Queued insertion unit {} for record {}", unit_id, record_id);
        Ok(unit_id)
    }

    /// Stops accepting units, lets queued ones finish and joins the workers.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down insertion workers...");

        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        let workers = match self.workers.lock() {
            Ok(mut w) => std::mem::take(&mut *w),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for (i, worker) in workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Insertion worker {} panicked: {:?}", i, e);
            }
        }
        info!("All insertion workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

impl Drop for InsertWorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(
    worker_id: usize,
    receiver: Receiver<InsertTask>,
    inserter: Arc<EntityInserter>,
    jobs: Arc<JobStore>,
    time_limit: Duration,
) {
    debug!("Insertion worker {} started", worker_id);

    for task in receiver.iter() {
        run_unit(&task, &inserter, &jobs, time_limit);
    }

    debug!("Insertion worker {} stopped", worker_id);
}

fn run_unit(task: &InsertTask, inserter: &EntityInserter, jobs: &JobStore, time_limit: Duration) {
    jobs.mark_started(&task.unit_id);
    let deadline = Instant::now() + time_limit;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        inserter.insert_for_record_id(task.record_id, Some(deadline))
    }));

    match outcome {
        Ok(Ok(outcome)) => {
            let result = json!({
                "record_id": outcome.record_id,
                "inserted": outcome.inserted,
                "published": outcome.published,
                "rejected": outcome.report.rejected().len(),
            });
            if outcome.report.truncated {
                warn!(
                    "Insertion unit {} hit its {}s limit after {} row(s)",
                    task.unit_id,
                    time_limit.as_secs(),
                    outcome.inserted
                );
                jobs.finish(
                    &task.unit_id,
                    JobState::Failure,
                    Some(result),
                    Some(format!("time limit of {}s exceeded", time_limit.as_secs())),
                );
            } else {
                jobs.finish(&task.unit_id, JobState::Success, Some(result), None);
            }
        }
        Ok(Err(e)) => {
            error!("Insertion unit {} failed: {}", task.unit_id, e);
            jobs.finish(&task.unit_id, JobState::Failure, None, Some(e.to_string()));
        }
        Err(_) => {
            error!("Insertion unit {} panicked", task.unit_id);
            jobs.finish(
                &task.unit_id,
                JobState::Failure,
                None,
                Some("insertion unit panicked".to_string()),
            );
        }
    }
}
