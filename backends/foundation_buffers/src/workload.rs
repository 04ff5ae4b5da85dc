//! Producer/consumer workload over one shared buffer.
//!
//! A [`Workload`] spawns `producers` producer threads, each inserting
//! `values` distinct values, and `consumers` consumer threads that together
//! remove exactly as many. Consumers claim a value from a shared countdown
//! before removing it, so every thread terminates once all values went
//! through the buffer. All producers are joined first, then all consumers.
//! A worker that panics cancels the workload, so the others are released
//! from the buffer and [`Workload::run`] reports the panic.
//!
//! # Examples
//!
//! ```
//! use foundation_buffers::buffers::Strategy;
//! use foundation_buffers::config::BufferConfig;
//! use foundation_buffers::workload::Workload;
//!
//! let config = BufferConfig::new(2, 3, 2, Strategy::Condition).unwrap();
//! let report = Workload::new(config).run().unwrap();
//!
//! assert_eq!(report.produced, report.consumed);
//! assert!(!report.was_interrupted());
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, Thread};
use std::time::{Duration, Instant};

use crate::buffers::{new_buffer, BoundedBuffer, Strategy};
use crate::config::{BufferConfig, Mode};
use crate::errors::{InsertError, WorkloadError, WorkloadResult};
use crate::primitives::{lock_or_recover, CondVarMutex};

pub type SharedBuffer = Arc<dyn BoundedBuffer<u64>>;

// How often the joiner re-interrupts the buffer while waiting on a cancelled worker.
const CANCEL_POLL: Duration = Duration::from_millis(5);

/// Outcome of one producer or consumer thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct WorkerStats {
    /// Values inserted (producer) or removed (consumer).
    values: Vec<u64>,
    /// Failed `add`/`remove` attempts or expired `offer`/`poll` deadlines.
    retries: usize,
    /// Stopped early by an interruption or a cancelled workload.
    interrupted: bool,
}

/// Totals collected after every worker has been joined.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadReport {
    pub strategy: Strategy,
    pub mode: Mode,
    pub produced: usize,
    pub consumed: usize,
    /// Inserts that found the buffer full (non-blocking and timed modes).
    pub full_retries: usize,
    /// Removals that found the buffer empty (non-blocking and timed modes).
    pub empty_retries: usize,
    /// Number of workers that stopped before finishing their share.
    pub interrupted_workers: usize,
    /// Every consumed value, sorted.
    pub consumed_values: Vec<u64>,
    pub elapsed: Duration,
}

impl WorkloadReport {
    #[must_use]
    pub fn was_interrupted(&self) -> bool {
        self.interrupted_workers > 0
    }
}

/// A spawned worker and the flag its [`ExitGuard`] raises when it stops.
struct Worker {
    name: String,
    handle: JoinHandle<WorkerStats>,
    done: Arc<AtomicBool>,
}

/// Lives for the whole body of a worker thread.
///
/// On drop it marks the worker done and wakes the joiner. When the drop runs
/// during a panic it also cancels the workload, so that workers parked on
/// the buffer waiting for the dead one are released.
struct ExitGuard {
    done: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
    buffer: SharedBuffer,
    joiner: Thread,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            self.cancelled.store(true, Ordering::Release);
            self.buffer.interrupt();
        }
        self.done.store(true, Ordering::Release);
        self.joiner.unpark();
    }
}

pub struct Workload {
    config: BufferConfig,
    buffer: SharedBuffer,
    cancelled: Arc<AtomicBool>,
    // thread currently inside `run`, woken by `cancel`
    joiner: CondVarMutex<Option<Thread>>,
}

impl Workload {
    /// Builds the buffer selected by `config`.
    ///
    /// # Panics
    ///
    /// Panics if `config.capacity` is 0; configurations coming from
    /// [`BufferConfig::new`] or [`BufferConfig::load`] are already validated.
    #[must_use]
    pub fn new(config: BufferConfig) -> Self {
        let buffer = new_buffer(config.capacity, config.strategy);
        Self::with_buffer(config, buffer)
    }

    /// Runs the workload on a caller-supplied buffer instead.
    #[must_use]
    pub fn with_buffer(config: BufferConfig, buffer: SharedBuffer) -> Self {
        Self {
            config,
            buffer,
            cancelled: Arc::new(AtomicBool::new(false)),
            joiner: CondVarMutex::new(None),
        }
    }

    #[must_use]
    pub fn buffer(&self) -> SharedBuffer {
        Arc::clone(&self.buffer)
    }

    #[must_use]
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Stops a running workload: workers finish the operation in progress,
    /// parked ones are interrupted, and none starts another.
    pub fn cancel(&self) {
        tracing::info!("cancelling workload");
        self.cancelled.store(true, Ordering::Release);
        self.buffer.interrupt();
        if let Some(joiner) = lock_or_recover(&self.joiner).as_ref() {
            joiner.unpark();
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Spawns every worker and waits for all of them.
    ///
    /// # Errors
    ///
    /// [`WorkloadError::Spawn`] if a thread cannot be created and
    /// [`WorkloadError::WorkerPanicked`] if a worker panicked. In both cases
    /// the workload is cancelled and every spawned worker is joined before
    /// returning.
    pub fn run(&self) -> WorkloadResult<WorkloadReport> {
        let config = &self.config;
        tracing::info!(
            capacity = config.capacity,
            producers = config.producers,
            consumers = config.consumers,
            strategy = %config.strategy,
            mode = %config.mode,
            values = config.values,
            "starting workload"
        );

        let start = Instant::now();
        *lock_or_recover(&self.joiner) = Some(thread::current());
        let remaining = Arc::new(AtomicUsize::new(config.total_values()));

        let producers = self.spawn_workers("producer", config.producers, |id| {
            let buffer = self.buffer();
            let config = config.clone();
            let cancelled = Arc::clone(&self.cancelled);
            move || produce(id, &*buffer, &config, &cancelled)
        })?;

        let consumers = self.spawn_workers("consumer", config.consumers, |id| {
            let buffer = self.buffer();
            let config = config.clone();
            let cancelled = Arc::clone(&self.cancelled);
            let remaining = Arc::clone(&remaining);
            move || consume(id, &*buffer, &config, &cancelled, &remaining)
        });
        let consumers = match consumers {
            Ok(handles) => handles,
            Err(err) => {
                let _ = self.join_all(producers);
                return Err(err);
            }
        };

        let produced = self.join_all(producers);
        let consumed = self.join_all(consumers);
        *lock_or_recover(&self.joiner) = None;
        let (produced, consumed) = (produced?, consumed?);

        let mut consumed_values: Vec<u64> = consumed
            .iter()
            .flat_map(|stats| stats.values.iter().copied())
            .collect();
        consumed_values.sort_unstable();

        let report = WorkloadReport {
            strategy: config.strategy,
            mode: config.mode,
            produced: produced.iter().map(|stats| stats.values.len()).sum(),
            consumed: consumed_values.len(),
            full_retries: produced.iter().map(|stats| stats.retries).sum(),
            empty_retries: consumed.iter().map(|stats| stats.retries).sum(),
            interrupted_workers: produced
                .iter()
                .chain(consumed.iter())
                .filter(|stats| stats.interrupted)
                .count(),
            consumed_values,
            elapsed: start.elapsed(),
        };

        tracing::info!(
            produced = report.produced,
            consumed = report.consumed,
            interrupted_workers = report.interrupted_workers,
            elapsed = ?report.elapsed,
            "workload finished"
        );
        Ok(report)
    }

    fn spawn_workers<F, W>(
        &self,
        role: &str,
        count: usize,
        make_worker: F,
    ) -> WorkloadResult<Vec<Worker>>
    where
        F: Fn(usize) -> W,
        W: FnOnce() -> WorkerStats + Send + 'static,
    {
        let mut workers = Vec::with_capacity(count);
        for id in 0..count {
            let name = format!("{role}-{id}");
            let done = Arc::new(AtomicBool::new(false));
            let guard = ExitGuard {
                done: Arc::clone(&done),
                cancelled: Arc::clone(&self.cancelled),
                buffer: self.buffer(),
                joiner: thread::current(),
            };
            let work = make_worker(id);

            let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
                let _guard = guard;
                work()
            });
            match spawned {
                Ok(handle) => workers.push(Worker { name, handle, done }),
                Err(err) => {
                    tracing::error!(worker = %name, "failed to spawn worker: {err}");
                    self.cancel();
                    let _ = self.join_all(workers);
                    return Err(WorkloadError::Spawn(err));
                }
            }
        }
        Ok(workers)
    }

    fn join_all(&self, workers: Vec<Worker>) -> WorkloadResult<Vec<WorkerStats>> {
        let mut stats = Vec::with_capacity(workers.len());
        let mut panicked = None;

        for Worker { name, handle, done } in workers {
            // woken by worker exit guards and by `cancel`; once cancelled,
            // interrupt only reaches calls parked at that instant, so keep
            // nudging until the worker notices the flag
            while !done.load(Ordering::Acquire) {
                if self.is_cancelled() {
                    self.buffer.interrupt();
                    thread::park_timeout(CANCEL_POLL);
                } else {
                    thread::park();
                }
            }

            match handle.join() {
                Ok(worker_stats) => stats.push(worker_stats),
                Err(_) => {
                    tracing::error!(worker = %name, "worker panicked");
                    self.cancel();
                    panicked.get_or_insert(name);
                }
            }
        }

        match panicked {
            Some(name) => Err(WorkloadError::WorkerPanicked(name)),
            None => Ok(stats),
        }
    }
}

fn produce(
    id: usize,
    buffer: &dyn BoundedBuffer<u64>,
    config: &BufferConfig,
    cancelled: &AtomicBool,
) -> WorkerStats {
    let mut stats = WorkerStats::default();
    let first = (id * config.values) as u64;

    for value in first..first + config.values as u64 {
        let inserted = match config.mode {
            _ if cancelled.load(Ordering::Acquire) => Err(InsertError::Interrupted(value)),
            Mode::Blocking => buffer.put(value),
            Mode::NonBlocking => retry_insert(value, &mut stats, cancelled, |value| {
                let result = buffer.add(value);
                if result.as_ref().is_err_and(InsertError::is_full) {
                    thread::sleep(config.backoff());
                }
                result
            }),
            Mode::Timed => retry_insert(value, &mut stats, cancelled, |value| {
                buffer.offer(value, Instant::now() + config.timeout())
            }),
        };

        if inserted.is_err() {
            tracing::debug!(producer = id, "producer interrupted");
            stats.interrupted = true;
            break;
        }
        tracing::debug!(producer = id, value, "produced");
        stats.values.push(value);
    }

    stats
}

// Repeats `attempt` while it reports a full buffer and the workload is live.
fn retry_insert<F>(
    mut value: u64,
    stats: &mut WorkerStats,
    cancelled: &AtomicBool,
    mut attempt: F,
) -> Result<(), InsertError<u64>>
where
    F: FnMut(u64) -> Result<(), InsertError<u64>>,
{
    loop {
        match attempt(value) {
            Err(InsertError::Full(rejected)) => {
                stats.retries += 1;
                if cancelled.load(Ordering::Acquire) {
                    return Err(InsertError::Interrupted(rejected));
                }
                value = rejected;
            }
            other => return other,
        }
    }
}

fn consume(
    id: usize,
    buffer: &dyn BoundedBuffer<u64>,
    config: &BufferConfig,
    cancelled: &AtomicBool,
    remaining: &AtomicUsize,
) -> WorkerStats {
    let mut stats = WorkerStats::default();

    while remaining
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(1))
        .is_ok()
    {
        let removed = match config.mode {
            _ if cancelled.load(Ordering::Acquire) => None,
            Mode::Blocking => buffer.get().ok(),
            Mode::NonBlocking => loop {
                if let Some(value) = buffer.remove() {
                    break Some(value);
                }
                stats.retries += 1;
                if cancelled.load(Ordering::Acquire) {
                    break None;
                }
                thread::sleep(config.backoff());
            },
            Mode::Timed => loop {
                match buffer.poll(Instant::now() + config.timeout()) {
                    Ok(Some(value)) => break Some(value),
                    Ok(None) if !cancelled.load(Ordering::Acquire) => stats.retries += 1,
                    Ok(None) | Err(_) => break None,
                }
            },
        };

        let Some(value) = removed else {
            tracing::debug!(consumer = id, "consumer interrupted");
            stats.interrupted = true;
            break;
        };
        tracing::debug!(consumer = id, value, "consumed");
        stats.values.push(value);
    }

    stats
}
