//! A bounded, elastic pool for long-lived jobs.
//!
//! Jobs wait in a bounded queue of `task_capacity` entries, so [`WorkerPool::submit`] blocks once the queue is full.
//! The pool starts `min_workers` workers and adds one whenever more jobs are queued than there are idle workers, up
//! to `max_workers`. Workers above the minimum exit after `idle_timeout` without work. Each worker keeps its own idle
//! deadline, so a burst of surplus workers retires together.
use std::{
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use futures_util::{future::BoxFuture, FutureExt};
use log::*;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinSet,
    time::{self, Instant},
};

use crate::{config::PoolConfig, errors::PoolError};

pub type Job = BoxFuture<'static, ()>;

#[derive(Debug, Default)]
struct Counters {
    /// Live pool workers.
    running: AtomicUsize,
    /// Live pool workers that are not executing a job.
    idle: AtomicUsize,
    /// Jobs in the queue that no worker has picked up yet.
    queued: AtomicUsize,
    /// Jobs submitted and not yet finished.
    in_flight: AtomicUsize,
}

struct Shared {
    config: PoolConfig,
    queue: Mutex<mpsc::Receiver<Job>>,
    counters: Counters,
}

pub struct WorkerPool {
    shared: Arc<Shared>,
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<JoinSet<()>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "WorkerPool(running: {}, idle: {}, in flight: {})",
            self.running_workers(),
            self.idle_workers(),
            self.in_flight()
        )
    }
}

impl WorkerPool {
    /// Creates the pool and starts `min_workers` workers. Must be called from within a tokio runtime.
    pub fn new(config: PoolConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.task_capacity.max(1));
        let min_workers = config.min_workers;
        let shared = Arc::new(Shared { config, queue: Mutex::new(receiver), counters: Counters::default() });
        let mut workers = JoinSet::new();
        for _ in 0..min_workers {
            shared.counters.running.fetch_add(1, Ordering::SeqCst);
            shared.counters.idle.fetch_add(1, Ordering::SeqCst);
            workers.spawn(run_worker(Arc::clone(&shared)));
        }
        debug!("🏊️ Worker pool started with {min_workers} workers");
        Self { shared, sender: Mutex::new(Some(sender)), workers: Mutex::new(workers) }
    }

    /// Queues a job, waiting for room if the queue is full.
    pub async fn submit(&self, job: Job) -> Result<(), PoolError> {
        let sender = self.sender.lock().await.clone().ok_or(PoolError::Closed)?;
        let counters = &self.shared.counters;
        counters.in_flight.fetch_add(1, Ordering::SeqCst);
        counters.queued.fetch_add(1, Ordering::SeqCst);
        if sender.send(job).await.is_err() {
            counters.queued.fetch_sub(1, Ordering::SeqCst);
            counters.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(PoolError::Closed);
        }
        self.grow_if_needed().await;
        Ok(())
    }

    async fn grow_if_needed(&self) {
        let counters = &self.shared.counters;
        if counters.queued.load(Ordering::SeqCst) <= counters.idle.load(Ordering::SeqCst) {
            return;
        }
        let max = self.shared.config.max_workers;
        let grown = counters
            .running
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |running| (running < max).then_some(running + 1));
        match grown {
            Ok(previous) => {
                counters.idle.fetch_add(1, Ordering::SeqCst);
                self.workers.lock().await.spawn(run_worker(Arc::clone(&self.shared)));
                trace!("🏊️ Worker pool grew to {} workers", previous + 1);
            },
            Err(_) => trace!("🏊️ Worker pool is at its limit of {max} workers. The job will wait for a free worker."),
        }
    }

    pub fn running_workers(&self) -> usize {
        self.shared.counters.running.load(Ordering::SeqCst)
    }

    pub fn idle_workers(&self) -> usize {
        self.shared.counters.idle.load(Ordering::SeqCst)
    }

    /// Jobs that have been submitted and have not finished yet, queued ones included.
    pub fn in_flight(&self) -> usize {
        self.shared.counters.in_flight.load(Ordering::SeqCst)
    }

    pub async fn is_closed(&self) -> bool {
        self.sender.lock().await.is_none()
    }

    /// Stops accepting jobs, lets every queued job run to completion and waits for all workers to exit.
    pub async fn stop_and_wait(&self) {
        if self.sender.lock().await.take().is_some() {
            debug!("🏊️ Worker pool closed. Waiting for {} jobs to finish.", self.in_flight());
        }
        // Submitters that were already past the closed check may still add a worker, so drain until none are left
        loop {
            let mut workers = std::mem::take(&mut *self.workers.lock().await);
            if workers.is_empty() {
                break;
            }
            while let Some(result) = workers.join_next().await {
                if let Err(e) = result {
                    error!("🏊️ A pool worker did not exit cleanly. {e}");
                }
            }
        }
        debug!("🏊️ Worker pool stopped");
    }
}

async fn run_worker(shared: Arc<Shared>) {
    let counters = &shared.counters;
    loop {
        // The deadline covers the wait for the queue lock too, so idle workers time out side by side
        let idle_deadline = Instant::now() + shared.config.idle_timeout;
        let next = time::timeout_at(idle_deadline, async { shared.queue.lock().await.recv().await }).await;
        let job = match next {
            Ok(Some(job)) => job,
            Ok(None) => {
                counters.idle.fetch_sub(1, Ordering::SeqCst);
                counters.running.fetch_sub(1, Ordering::SeqCst);
                return;
            },
            Err(_) => {
                if !try_retire(&shared) {
                    continue;
                }
                // A job may have been queued by a submitter that counted this worker as idle
                match shared.queue.lock().await.try_recv() {
                    Ok(job) => {
                        counters.running.fetch_add(1, Ordering::SeqCst);
                        counters.idle.fetch_add(1, Ordering::SeqCst);
                        job
                    },
                    Err(_) => {
                        trace!("🏊️ Idle pool worker retired");
                        return;
                    },
                }
            },
        };
        counters.queued.fetch_sub(1, Ordering::SeqCst);
        counters.idle.fetch_sub(1, Ordering::SeqCst);
        if let Err(panic) = AssertUnwindSafe(job).catch_unwind().await {
            error!("🏊️ A pool job panicked: {panic:?}");
        }
        counters.in_flight.fetch_sub(1, Ordering::SeqCst);
        counters.idle.fetch_add(1, Ordering::SeqCst);
    }
}

fn try_retire(shared: &Shared) -> bool {
    let min = shared.config.min_workers;
    let retired = shared
        .counters
        .running
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |running| (running > min).then(|| running - 1))
        .is_ok();
    if retired {
        shared.counters.idle.fetch_sub(1, Ordering::SeqCst);
    }
    retired
}

#[cfg(test)]
mod test {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use futures_util::FutureExt;
    use tokio::{sync::Notify, time::sleep};

    use super::WorkerPool;
    use crate::{config::PoolConfig, errors::PoolError};

    fn config(min: usize, max: usize, capacity: usize, idle_ms: u64) -> PoolConfig {
        PoolConfig {
            min_workers: min,
            max_workers: max,
            task_capacity: capacity,
            idle_timeout: Duration::from_millis(idle_ms),
        }
    }

    #[tokio::test]
    async fn runs_jobs_concurrently_up_to_max() {
        let pool = WorkerPool::new(config(0, 3, 10, 1000));
        let release = Arc::new(Notify::new());
        let started = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let release = Arc::clone(&release);
            let started = Arc::clone(&started);
            let job = async move {
                started.fetch_add(1, Ordering::SeqCst);
                release.notified().await;
            };
            pool.submit(job.boxed()).await.unwrap();
        }
        sleep(Duration::from_millis(50)).await;
        assert_eq!(started.load(Ordering::SeqCst), 3);
        assert_eq!(pool.running_workers(), 3);
        assert_eq!(pool.in_flight(), 5);
        // Release the first three; the queued two can then start
        release.notify_waiters();
        sleep(Duration::from_millis(50)).await;
        assert_eq!(started.load(Ordering::SeqCst), 5);
        release.notify_waiters();
        pool.stop_and_wait().await;
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn full_queue_blocks_submit() {
        let pool = Arc::new(WorkerPool::new(config(0, 1, 1, 1000)));
        let release = Arc::new(Notify::new());
        let blocker = {
            let release = Arc::clone(&release);
            async move { release.notified().await }
        };
        pool.submit(blocker.boxed()).await.unwrap();
        sleep(Duration::from_millis(20)).await;
        // The worker is busy, so this one fills the queue
        pool.submit(async {}.boxed()).await.unwrap();
        let third = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.submit(async {}.boxed()).await })
        };
        sleep(Duration::from_millis(30)).await;
        assert!(!third.is_finished());
        release.notify_waiters();
        third.await.unwrap().unwrap();
        pool.stop_and_wait().await;
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn idle_workers_retire_down_to_min() {
        let pool = WorkerPool::new(config(1, 4, 10, 60));
        assert_eq!(pool.running_workers(), 1);
        let release = Arc::new(Notify::new());
        for _ in 0..4 {
            let release = Arc::clone(&release);
            pool.submit(async move { release.notified().await }.boxed()).await.unwrap();
        }
        sleep(Duration::from_millis(20)).await;
        assert_eq!(pool.running_workers(), 4);
        release.notify_waiters();
        sleep(Duration::from_millis(90)).await;
        assert_eq!(pool.running_workers(), 1);
        assert_eq!(pool.idle_workers(), 1);
        // The pool still works after shrinking
        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        pool.submit(async move { counter.fetch_add(1, Ordering::SeqCst); }.boxed()).await.unwrap();
        pool.stop_and_wait().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn surplus_workers_retire_together() {
        let pool = WorkerPool::new(config(0, 4, 10, 100));
        let release = Arc::new(Notify::new());
        for _ in 0..4 {
            let release = Arc::clone(&release);
            pool.submit(async move { release.notified().await }.boxed()).await.unwrap();
        }
        sleep(Duration::from_millis(20)).await;
        assert_eq!(pool.running_workers(), 4);
        release.notify_waiters();
        sleep(Duration::from_millis(150)).await;
        assert_eq!(pool.running_workers(), 0);
        assert_eq!(pool.idle_workers(), 0);
        assert_eq!(pool.in_flight(), 0);
        pool.stop_and_wait().await;
    }

    #[tokio::test]
    async fn stop_drains_queued_jobs() {
        let pool = WorkerPool::new(config(0, 2, 10, 1000));
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..6 {
            let done = Arc::clone(&done);
            let job = async move {
                sleep(Duration::from_millis(10)).await;
                done.fetch_add(1, Ordering::SeqCst);
            };
            pool.submit(job.boxed()).await.unwrap();
        }
        pool.stop_and_wait().await;
        assert_eq!(done.load(Ordering::SeqCst), 6);
        assert_eq!(pool.running_workers(), 0);
        assert!(pool.is_closed().await);
        let err = pool.submit(async {}.boxed()).await.unwrap_err();
        assert_eq!(err, PoolError::Closed);
    }

    #[tokio::test]
    async fn panicking_job_does_not_take_the_worker_down() {
        let pool = WorkerPool::new(config(1, 1, 10, 1000));
        let explode = async {
            let broken = true;
            assert!(!broken, "boom");
        };
        pool.submit(explode.boxed()).await.unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        pool.submit(async move { counter.fetch_add(1, Ordering::SeqCst); }.boxed()).await.unwrap();
        pool.stop_and_wait().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert_eq!(pool.in_flight(), 0);
    }
}
