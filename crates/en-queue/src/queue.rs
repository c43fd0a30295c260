//! The job queue itself: slot table, worker pool, completion channel.

use crate::driver::{CancelToken, JobDriver, JobOutcome, JobSpec};
use crate::{QueueError, QueueResult};
use crossbeam::channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info};

/// Stable handle for a submitted job. Restarts re-arm the same index.
pub type QueueIndex = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Waiting,
    Running,
    Done,
    Exit,
    Killed,
}

impl JobStatus {
    fn killable(self) -> bool {
        matches!(self, JobStatus::Waiting | JobStatus::Running)
    }

    // Done is restartable too: a clean exit whose results turn out to be
    // unusable gets resubmitted through the same slot.
    fn restartable(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Exit | JobStatus::Killed)
    }
}

/// One completion report per submission or restart.
#[derive(Debug, Clone)]
pub struct QueueEvent {
    pub queue_index: QueueIndex,
    pub outcome: JobOutcome,
}

struct Slot {
    spec: JobSpec,
    status: JobStatus,
    cancel: CancelToken,
    submit_count: u32,
}

struct Shared {
    slots: Mutex<Vec<Slot>>,
}

pub struct JobQueue {
    shared: Arc<Shared>,
    pending_tx: Option<Sender<QueueIndex>>,
    events_rx: Receiver<QueueEvent>,
    workers: Vec<JoinHandle<()>>,
}

impl JobQueue {
    /// Start a queue with `max_running` workers over the given driver.
    pub fn new(driver: Arc<dyn JobDriver>, max_running: usize) -> Self {
        let shared = Arc::new(Shared {
            slots: Mutex::new(Vec::new()),
        });
        let (pending_tx, pending_rx) = unbounded::<QueueIndex>();
        let (events_tx, events_rx) = unbounded::<QueueEvent>();

        let workers = (0..max_running.max(1))
            .map(|worker| {
                let shared = Arc::clone(&shared);
                let driver = Arc::clone(&driver);
                let pending_rx = pending_rx.clone();
                let events_tx = events_tx.clone();
                std::thread::spawn(move || {
                    worker_loop(worker, &shared, driver.as_ref(), &pending_rx, &events_tx)
                })
            })
            .collect();

        Self {
            shared,
            pending_tx: Some(pending_tx),
            events_rx,
            workers,
        }
    }

    /// Submit a job. The returned index stays valid for the queue's life.
    pub fn submit(&self, spec: JobSpec) -> QueueResult<QueueIndex> {
        let tx = self.pending_tx.as_ref().ok_or(QueueError::ShutDown)?;
        let queue_index = {
            let mut slots = self.shared.slots.lock();
            slots.push(Slot {
                spec,
                status: JobStatus::Waiting,
                cancel: CancelToken::new(),
                submit_count: 1,
            });
            slots.len() - 1
        };
        tx.send(queue_index).map_err(|_| QueueError::ShutDown)?;
        debug!(queue_index, "job submitted");
        Ok(queue_index)
    }

    /// Request cancellation. Only jobs that are waiting or running can be
    /// killed; finished jobs report their current status as the error.
    pub fn kill(&self, queue_index: QueueIndex) -> QueueResult<()> {
        let slots = self.shared.slots.lock();
        let slot = slots
            .get(queue_index)
            .ok_or(QueueError::UnknownJob { queue_index })?;
        if !slot.status.killable() {
            return Err(QueueError::NotKillable {
                status: slot.status,
            });
        }
        slot.cancel.cancel();
        Ok(())
    }

    /// Re-arm a finished slot with a fresh run of the same or an updated
    /// spec. The queue index is unchanged and no new slot is created.
    pub fn set_external_restart(
        &self,
        queue_index: QueueIndex,
        spec: Option<JobSpec>,
    ) -> QueueResult<()> {
        let tx = self.pending_tx.as_ref().ok_or(QueueError::ShutDown)?;
        {
            let mut slots = self.shared.slots.lock();
            let slot = slots
                .get_mut(queue_index)
                .ok_or(QueueError::UnknownJob { queue_index })?;
            if !slot.status.restartable() {
                return Err(QueueError::NotRestartable {
                    status: slot.status,
                });
            }
            if let Some(spec) = spec {
                slot.spec = spec;
            }
            slot.status = JobStatus::Waiting;
            slot.cancel = CancelToken::new();
            slot.submit_count += 1;
        }
        tx.send(queue_index).map_err(|_| QueueError::ShutDown)?;
        debug!(queue_index, "job restarted");
        Ok(())
    }

    pub fn status(&self, queue_index: QueueIndex) -> QueueResult<JobStatus> {
        let slots = self.shared.slots.lock();
        slots
            .get(queue_index)
            .map(|slot| slot.status)
            .ok_or(QueueError::UnknownJob { queue_index })
    }

    /// Whether the queue would accept `set_external_restart` for this slot.
    pub fn restartable(&self, queue_index: QueueIndex) -> bool {
        matches!(self.status(queue_index), Ok(status) if status.restartable())
    }

    /// Times this slot has been handed to the driver, restarts included.
    pub fn submit_count(&self, queue_index: QueueIndex) -> QueueResult<u32> {
        let slots = self.shared.slots.lock();
        slots
            .get(queue_index)
            .map(|slot| slot.submit_count)
            .ok_or(QueueError::UnknownJob { queue_index })
    }

    pub fn num_jobs(&self) -> usize {
        self.shared.slots.lock().len()
    }

    /// Completion stream. Exactly one event arrives per submission/restart.
    pub fn events(&self) -> Receiver<QueueEvent> {
        self.events_rx.clone()
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        // closing the pending channel lets the workers drain and exit
        self.pending_tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    worker: usize,
    shared: &Shared,
    driver: &dyn JobDriver,
    pending_rx: &Receiver<QueueIndex>,
    events_tx: &Sender<QueueEvent>,
) {
    while let Ok(queue_index) = pending_rx.recv() {
        let (spec, cancel) = {
            let mut slots = shared.slots.lock();
            let slot = &mut slots[queue_index];
            if slot.cancel.is_cancelled() {
                // killed while still waiting
                slot.status = JobStatus::Killed;
                let _ = events_tx.send(QueueEvent {
                    queue_index,
                    outcome: JobOutcome::Killed,
                });
                continue;
            }
            slot.status = JobStatus::Running;
            (slot.spec.clone(), slot.cancel.clone())
        };

        info!(worker, queue_index, job = %spec.name, "job starting");
        let outcome = driver.run(&spec, &cancel);
        info!(worker, queue_index, job = %spec.name, ?outcome, "job finished");

        {
            let mut slots = shared.slots.lock();
            slots[queue_index].status = match outcome {
                JobOutcome::Ok => JobStatus::Done,
                JobOutcome::Failed { .. } => JobStatus::Exit,
                JobOutcome::Killed => JobStatus::Killed,
            };
        }
        let _ = events_tx.send(QueueEvent {
            queue_index,
            outcome,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FnDriver<F>(F);

    impl<F> JobDriver for FnDriver<F>
    where
        F: Fn(&JobSpec, &CancelToken) -> JobOutcome + Send + Sync,
    {
        fn run(&self, spec: &JobSpec, cancel: &CancelToken) -> JobOutcome {
            (self.0)(spec, cancel)
        }
    }

    fn spec(name: &str) -> JobSpec {
        JobSpec {
            name: name.to_string(),
            script: PathBuf::from("job.sh"),
            run_path: PathBuf::from("."),
            args: vec![],
            num_cpu: 1,
        }
    }

    #[test]
    fn successful_job_reports_done() {
        let queue = JobQueue::new(Arc::new(FnDriver(|_: &JobSpec, _: &CancelToken| JobOutcome::Ok)), 2);
        let ix = queue.submit(spec("ok")).unwrap();

        let event = queue.events().recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event.queue_index, ix);
        assert_eq!(event.outcome, JobOutcome::Ok);
        assert_eq!(queue.status(ix).unwrap(), JobStatus::Done);
    }

    #[test]
    fn restart_keeps_the_queue_index() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let driver = FnDriver(move |_: &JobSpec, _: &CancelToken| {
            counter.fetch_add(1, Ordering::SeqCst);
            JobOutcome::Failed {
                reason: "boom".to_string(),
            }
        });
        let queue = JobQueue::new(Arc::new(driver), 1);
        let events = queue.events();

        let ix = queue.submit(spec("flaky")).unwrap();
        let first = events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.queue_index, ix);
        assert_eq!(queue.status(ix).unwrap(), JobStatus::Exit);
        assert!(queue.restartable(ix));

        queue.set_external_restart(ix, None).unwrap();
        let second = events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(second.queue_index, ix);

        // same slot, no new entry
        assert_eq!(queue.num_jobs(), 1);
        assert_eq!(queue.submit_count(ix).unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn kill_running_and_waiting_jobs() {
        let driver = FnDriver(|_: &JobSpec, cancel: &CancelToken| {
            while !cancel.is_cancelled() {
                std::thread::sleep(Duration::from_millis(5));
            }
            JobOutcome::Killed
        });
        let queue = JobQueue::new(Arc::new(driver), 1);
        let events = queue.events();

        let running = queue.submit(spec("running")).unwrap();
        let waiting = queue.submit(spec("waiting")).unwrap();

        // single worker, so the second job has to be waiting
        queue.kill(waiting).unwrap();
        queue.kill(running).unwrap();

        let mut killed = vec![
            events.recv_timeout(Duration::from_secs(5)).unwrap(),
            events.recv_timeout(Duration::from_secs(5)).unwrap(),
        ];
        killed.sort_by_key(|event| event.queue_index);
        assert!(killed.iter().all(|e| e.outcome == JobOutcome::Killed));
        assert_eq!(queue.status(running).unwrap(), JobStatus::Killed);
        assert_eq!(queue.status(waiting).unwrap(), JobStatus::Killed);
    }

    #[test]
    fn finished_jobs_are_not_killable() {
        let queue = JobQueue::new(Arc::new(FnDriver(|_: &JobSpec, _: &CancelToken| JobOutcome::Ok)), 1);
        let ix = queue.submit(spec("done")).unwrap();
        queue.events().recv_timeout(Duration::from_secs(5)).unwrap();

        assert!(matches!(
            queue.kill(ix),
            Err(QueueError::NotKillable { .. })
        ));
    }

    #[test]
    fn cleanly_finished_jobs_can_be_rearmed() {
        let queue = JobQueue::new(Arc::new(FnDriver(|_: &JobSpec, _: &CancelToken| JobOutcome::Ok)), 1);
        let events = queue.events();
        let ix = queue.submit(spec("reload")).unwrap();
        events.recv_timeout(Duration::from_secs(5)).unwrap();

        // results may turn out unusable after a clean exit; the slot must
        // accept a resubmission from Done
        assert_eq!(queue.status(ix).unwrap(), JobStatus::Done);
        assert!(queue.restartable(ix));
        queue.set_external_restart(ix, None).unwrap();

        let event = events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event.queue_index, ix);
        assert_eq!(queue.num_jobs(), 1);
        assert_eq!(queue.submit_count(ix).unwrap(), 2);
    }

    #[test]
    fn waiting_jobs_are_not_restartable() {
        let queue = JobQueue::new(
            Arc::new(FnDriver(|_: &JobSpec, cancel: &CancelToken| {
                while !cancel.is_cancelled() {
                    std::thread::sleep(Duration::from_millis(5));
                }
                JobOutcome::Killed
            })),
            1,
        );
        let running = queue.submit(spec("running")).unwrap();
        let waiting = queue.submit(spec("waiting")).unwrap();

        assert!(matches!(
            queue.set_external_restart(waiting, None),
            Err(QueueError::NotRestartable { .. })
        ));

        // unblock the hanging driver so the queue can shut down
        let events = queue.events();
        queue.kill(running).unwrap();
        queue.kill(waiting).unwrap();
        events.recv_timeout(Duration::from_secs(5)).unwrap();
        events.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn unknown_index_is_an_error() {
        let queue = JobQueue::new(Arc::new(FnDriver(|_: &JobSpec, _: &CancelToken| JobOutcome::Ok)), 1);
        assert!(matches!(
            queue.status(3),
            Err(QueueError::UnknownJob { queue_index: 3 })
        ));
    }
}
