use std::cell::Cell;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::budget::ThreadBudget;
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::split::RangeSplitter;

thread_local! {
    /// Nesting level of the region the current thread is working in; 0 when
    /// the thread is outside every region.
    static LEVEL: Cell<usize> = const { Cell::new(0) };
}

/// Nesting level of the calling thread.
pub fn nesting_level() -> usize {
    LEVEL.with(Cell::get)
}

/// One unit of work for [`Runtime::run_tasks`].
pub type Task<'a, R> = Box<dyn FnOnce() -> R + Send + 'a>;

/// Counts threads currently executing region bodies and remembers the
/// high-water mark.
#[derive(Default)]
struct ActiveGauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ActiveGauge {
    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Sets the thread's nesting level for the duration of one worker body.
/// A thread is counted as active only on its outermost entry.
struct LevelGuard<'a> {
    gauge: &'a ActiveGauge,
    previous: usize,
}

impl<'a> LevelGuard<'a> {
    fn enter(gauge: &'a ActiveGauge, level: usize) -> Self {
        let previous = LEVEL.with(|l| l.replace(level));
        if previous == 0 {
            gauge.enter();
        }
        LevelGuard { gauge, previous }
    }
}

impl Drop for LevelGuard<'_> {
    fn drop(&mut self) {
        LEVEL.with(|l| l.set(self.previous));
        if self.previous == 0 {
            self.gauge.leave();
        }
    }
}

/// A fixed team of worker threads sized to the configured ceiling.
///
/// All regions are fork-join: every call blocks until each worker of the
/// region has finished. Regions opened from inside a worker share the same
/// team, so no more than `max_threads` workers are ever active at once.
pub struct Runtime {
    config: RuntimeConfig,
    pool: rayon::ThreadPool,
    gauge: ActiveGauge,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_threads)
            .thread_name(|i| format!("kbench-worker-{i}"))
            .build()?;
        debug!(
            max_threads = config.max_threads,
            max_active_levels = config.max_active_levels,
            "worker team ready"
        );
        Ok(Runtime {
            config,
            pool,
            gauge: ActiveGauge::default(),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The configured worker ceiling as a budget.
    pub fn ceiling(&self) -> ThreadBudget {
        ThreadBudget::new(self.config.max_threads).unwrap_or(ThreadBudget::ONE)
    }

    /// Team size a region requesting `budget` gets when opened from the
    /// calling thread.
    pub fn team_size(&self, budget: ThreadBudget) -> usize {
        if nesting_level() >= self.config.max_active_levels {
            1
        } else {
            budget.get().min(self.config.max_threads)
        }
    }

    /// Highest number of threads seen executing region bodies at once.
    pub fn peak_active(&self) -> usize {
        self.gauge.peak.load(Ordering::Acquire)
    }

    pub fn reset_peak(&self) {
        self.gauge.peak.store(0, Ordering::Release);
    }

    /// Splits `0..len` into one contiguous range per worker and runs `body`
    /// on each. Results come back in worker order.
    ///
    /// A panicking worker does not unwind through the region; its panic is
    /// returned as [`RuntimeError::WorkerPanicked`] once every worker is done.
    pub fn map_ranges<R, F>(
        &self,
        len: usize,
        budget: ThreadBudget,
        body: F,
    ) -> Result<Vec<R>, RuntimeError>
    where
        R: Send,
        F: Fn(usize, Range<usize>) -> R + Sync,
    {
        let team = self.team_size(budget);
        let ranges: Vec<Range<usize>> = RangeSplitter::new(len, team).collect();
        self.fork_join(team, ranges, body)
            .into_iter()
            .collect()
    }

    /// Splits `data` (a sequence of `data.len() / unit` records of `unit`
    /// elements each) into one disjoint mutable run of records per worker.
    /// `body` receives the record range it owns and the matching slice; its
    /// results come back in worker order.
    pub fn map_chunks_mut<T, R, F>(
        &self,
        data: &mut [T],
        unit: usize,
        budget: ThreadBudget,
        body: F,
    ) -> Result<Vec<R>, RuntimeError>
    where
        T: Send,
        R: Send,
        F: Fn(Range<usize>, &mut [T]) -> R + Sync,
    {
        if unit == 0 || data.len() % unit != 0 {
            return Err(RuntimeError::InvalidArgument(format!(
                "buffer of {} elements is not a whole number of {}-element records",
                data.len(),
                unit
            )));
        }

        let team = self.team_size(budget);
        let mut parts: Vec<(Range<usize>, &mut [T])> = Vec::with_capacity(team);
        let mut rest = data;
        for records in RangeSplitter::new(rest.len() / unit, team) {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(records.len() * unit);
            parts.push((records, head));
            rest = tail;
        }

        self.fork_join(team, parts, |_, (records, slice)| body(records, slice))
            .into_iter()
            .collect()
    }

    /// Runs independent tasks concurrently on the team and returns one
    /// outcome per task, in submission order. A panicking task fails only its
    /// own slot.
    pub fn run_tasks<'a, R: Send>(&self, tasks: Vec<Task<'a, R>>) -> Vec<Result<R, RuntimeError>> {
        let team = self.team_size(self.ceiling());
        self.fork_join(team, tasks, |_, task| task())
    }

    fn fork_join<I, R, F>(&self, team: usize, items: Vec<I>, f: F) -> Vec<Result<R, RuntimeError>>
    where
        I: Send,
        R: Send,
        F: Fn(usize, I) -> R + Sync,
    {
        let level = nesting_level() + 1;
        trace!(level, team, items = items.len(), "fork");

        if team <= 1 || items.len() <= 1 {
            return items
                .into_iter()
                .enumerate()
                .map(|(worker, item)| self.run_worker(worker, level, || f(worker, item)))
                .collect();
        }

        self.pool.install(|| {
            items
                .into_par_iter()
                .enumerate()
                .with_max_len(1)
                .map(|(worker, item)| self.run_worker(worker, level, || f(worker, item)))
                .collect()
        })
    }

    fn run_worker<R>(
        &self,
        worker: usize,
        level: usize,
        body: impl FnOnce() -> R,
    ) -> Result<R, RuntimeError> {
        let _guard = LevelGuard::enter(&self.gauge, level);
        panic::catch_unwind(AssertUnwindSafe(body))
            .map_err(|payload| RuntimeError::from_panic(worker, payload))
    }
}
