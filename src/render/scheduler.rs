use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use rayon::prelude::*;

use crate::foundation::{
    core::FrameIndex,
    error::{BulbError, BulbResult},
};

/// What happens to the rest of a batch once one unit fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Run every unit and report every failure.
    #[default]
    ContinueAndCollect,
    /// Stop starting new work after the first failure. Units already past their last
    /// checkpoint still finish.
    FailFast,
}

/// Shared flag for cooperative cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-unit view of the batch state, passed to the render function.
#[derive(Debug)]
pub struct UnitContext<'a> {
    frame: FrameIndex,
    started: Instant,
    timeout: Option<Duration>,
    cancel: &'a CancelToken,
    abort: &'a AtomicBool,
}

impl<'a> UnitContext<'a> {
    pub fn new(
        frame: FrameIndex,
        timeout: Option<Duration>,
        cancel: &'a CancelToken,
        abort: &'a AtomicBool,
    ) -> Self {
        Self {
            frame,
            started: Instant::now(),
            timeout,
            cancel,
            abort,
        }
    }

    pub fn frame(&self) -> FrameIndex {
        self.frame
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fail with `Cancelled` or `Timeout` if the unit should stop here.
    pub fn checkpoint(&self) -> BulbResult<()> {
        if self.cancel.is_cancelled() || self.abort.load(Ordering::SeqCst) {
            return Err(BulbError::Cancelled);
        }
        self.check_deadline()
    }

    fn check_deadline(&self) -> BulbResult<()> {
        if let Some(limit) = self.timeout
            && self.elapsed() > limit
        {
            return Err(BulbError::Timeout {
                elapsed_secs: self.elapsed().as_secs_f64(),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct SchedulerOpts {
    /// Worker count; `None` uses available parallelism.
    pub threads: Option<usize>,
    pub policy: FailurePolicy,
    pub unit_timeout: Option<Duration>,
}

/// Outcome of a batch. Completed units are listed in submission order.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub completed: Vec<(FrameIndex, T)>,
    /// [`BulbError::Render`] per failed unit, in submission order.
    pub failures: Vec<BulbError>,
    pub cancelled: Vec<FrameIndex>,
}

impl<T> BatchReport<T> {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.cancelled.is_empty()
    }

    /// Ok with the completed units, or the failure with the lowest frame index.
    pub fn into_result(self) -> BulbResult<Vec<(FrameIndex, T)>> {
        if let Some(first) = self
            .failures
            .into_iter()
            .min_by_key(|e| e.frame().map(|f| f.0).unwrap_or(u64::MAX))
        {
            return Err(first);
        }
        if !self.cancelled.is_empty() {
            return Err(BulbError::Cancelled);
        }
        Ok(self.completed)
    }
}

enum UnitOutcome<T> {
    Done(T),
    Failed(BulbError),
    Cancelled,
}

/// Runs independent per-frame units on a bounded rayon pool.
///
/// The orchestrating thread blocks in [`BatchScheduler::run`] until every unit has completed,
/// failed or been cancelled.
pub struct BatchScheduler {
    opts: SchedulerOpts,
    pool: rayon::ThreadPool,
    cancel: CancelToken,
}

impl BatchScheduler {
    pub fn new(opts: SchedulerOpts) -> BulbResult<Self> {
        let pool = build_thread_pool(opts.threads)?;
        Ok(Self {
            opts,
            pool,
            cancel: CancelToken::new(),
        })
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels every unit not yet past its last checkpoint.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn run<T, F>(&self, frames: &[FrameIndex], render: F) -> BulbResult<BatchReport<T>>
    where
        T: Send,
        F: Fn(FrameIndex, &UnitContext<'_>) -> BulbResult<T> + Sync,
    {
        self.run_with_discard(frames, render, |_, _| {})
    }

    /// Like [`BatchScheduler::run`], but hands the output of a unit that finished past its
    /// deadline to `discard` before the unit is recorded as timed out.
    pub fn run_with_discard<T, F, D>(
        &self,
        frames: &[FrameIndex],
        render: F,
        discard: D,
    ) -> BulbResult<BatchReport<T>>
    where
        T: Send,
        F: Fn(FrameIndex, &UnitContext<'_>) -> BulbResult<T> + Sync,
        D: Fn(FrameIndex, T) + Sync,
    {
        let mut seen = HashSet::with_capacity(frames.len());
        if let Some(dup) = frames.iter().find(|f| !seen.insert(**f)) {
            return Err(BulbError::validation(format!(
                "frame {} was submitted more than once",
                dup.0
            )));
        }

        tracing::info!(
            units = frames.len(),
            threads = self.threads(),
            policy = ?self.opts.policy,
            "scheduling frame units"
        );

        let abort = AtomicBool::new(false);
        let outcomes: Vec<UnitOutcome<T>> = self.pool.install(|| {
            frames
                .par_iter()
                .map(|&frame| {
                    let ctx = UnitContext::new(frame, self.opts.unit_timeout, &self.cancel, &abort);
                    let result = ctx.checkpoint().and_then(|()| render(frame, &ctx)).and_then(
                        |out| match ctx.check_deadline() {
                            Ok(()) => Ok(out),
                            Err(e) => {
                                discard(frame, out);
                                Err(e)
                            }
                        },
                    );
                    match result {
                        Ok(out) => UnitOutcome::Done(out),
                        Err(BulbError::Cancelled) => UnitOutcome::Cancelled,
                        Err(e) => {
                            tracing::warn!(frame = frame.0, kind = e.kind(), "frame unit failed: {e}");
                            if self.opts.policy == FailurePolicy::FailFast {
                                abort.store(true, Ordering::SeqCst);
                            }
                            UnitOutcome::Failed(BulbError::render(frame, e))
                        }
                    }
                })
                .collect()
        });

        let mut report = BatchReport {
            completed: Vec::new(),
            failures: Vec::new(),
            cancelled: Vec::new(),
        };
        for (&frame, outcome) in frames.iter().zip(outcomes) {
            match outcome {
                UnitOutcome::Done(out) => report.completed.push((frame, out)),
                UnitOutcome::Failed(e) => report.failures.push(e),
                UnitOutcome::Cancelled => report.cancelled.push(frame),
            }
        }

        tracing::info!(
            completed = report.completed.len(),
            failed = report.failures.len(),
            cancelled = report.cancelled.len(),
            "frame units finished"
        );
        Ok(report)
    }
}

fn build_thread_pool(threads: Option<usize>) -> BulbResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(BulbError::validation("worker threads must be >= 1 when set"));
    }

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("frame-worker-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| BulbError::validation(format!("failed to build worker pool: {e}")))
}
