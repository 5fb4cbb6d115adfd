// batch.rs - Tumor x normal batch orchestration

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::core::cache::LikelihoodCache;
use crate::core::concordance::{compare_pair, PairResult};
use crate::core::policy::ComparisonPolicy;
use crate::core::progress_bar;
use crate::data::{SampleLikelihoodTable, SampleRef};
use crate::errors::{Error, Result};

pub const DEFAULT_THREADS: usize = 4;

/// Phases of one batch run, visited strictly in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchState {
    Idle,
    Pairing,
    Resolving,
    Dispatching,
    Collecting,
    Done,
}

impl BatchState {
    pub fn next(self) -> Option<Self> {
        match self {
            BatchState::Idle => Some(BatchState::Pairing),
            BatchState::Pairing => Some(BatchState::Resolving),
            BatchState::Resolving => Some(BatchState::Dispatching),
            BatchState::Dispatching => Some(BatchState::Collecting),
            BatchState::Collecting => Some(BatchState::Done),
            BatchState::Done => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateTransition {
    pub state: BatchState,
    /// Seconds since the run started
    pub at: f64,
}

/// Timing and size of one batch run, returned with its results
#[derive(Debug, Clone)]
pub struct RunContext {
    started_at: DateTime<Utc>,
    start: Instant,
    state: BatchState,
    transitions: Vec<StateTransition>,
    finished: Option<Duration>,
    pub threads: usize,
    pub num_tumors: usize,
    pub num_normals: usize,
    pub num_pairs: usize,
}

impl RunContext {
    pub fn new(threads: usize) -> Self {
        Self {
            started_at: Utc::now(),
            start: Instant::now(),
            state: BatchState::Idle,
            transitions: Vec::new(),
            finished: None,
            threads,
            num_tumors: 0,
            num_normals: 0,
            num_pairs: 0,
        }
    }

    /// Move to the following state and return it
    fn advance(&mut self) -> BatchState {
        if let Some(next) = self.state.next() {
            self.state = next;
            let at = self.start.elapsed();
            self.transitions.push(StateTransition {
                state: next,
                at: at.as_secs_f64(),
            });
            if next == BatchState::Done {
                self.finished = Some(at);
            }
            debug!("⏱️  {:?} at {:.3}s", next, at.as_secs_f64());
        }
        self.state
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Wall time of the run; still running runs report time so far
    pub fn elapsed(&self) -> Duration {
        self.finished.unwrap_or_else(|| self.start.elapsed())
    }

    /// Seconds spent in `state`, if the run has left it
    pub fn time_in(&self, state: BatchState) -> Option<f64> {
        let idx = self.transitions.iter().position(|t| t.state == state)?;
        let next = self.transitions.get(idx + 1)?;
        Some(next.at - self.transitions[idx].at)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SamplePair<'s> {
    pub tumor: &'s SampleRef,
    pub normal: &'s SampleRef,
}

/// Every tumor against every normal, tumor-major, in input order
pub fn build_pairs<'s>(tumors: &'s [SampleRef], normals: &'s [SampleRef]) -> Vec<SamplePair<'s>> {
    tumors
        .iter()
        .flat_map(|tumor| normals.iter().map(move |normal| SamplePair { tumor, normal }))
        .collect()
}

/// Self-contained unit of work: both materialized tables
#[derive(Debug, Clone)]
pub struct PairTask {
    pub tumor: Arc<SampleLikelihoodTable>,
    pub normal: Arc<SampleLikelihoodTable>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    /// Comparison ran; the result may still have zero usable markers
    Compared(PairResult),
    /// Comparison aborted
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairRecord {
    pub tumor_id: String,
    pub normal_id: String,
    pub tumor_path: PathBuf,
    pub normal_path: PathBuf,
    pub outcome: PairOutcome,
}

impl PairRecord {
    pub fn result(&self) -> Option<&PairResult> {
        match &self.outcome {
            PairOutcome::Compared(result) => Some(result),
            PairOutcome::Failed { .. } => None,
        }
    }

    pub fn concordance(&self) -> Option<f64> {
        self.result().and_then(PairResult::concordance)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, PairOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub results: Vec<PairRecord>,
    pub context: RunContext,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_failed()).count()
    }

    /// Pairs that were compared but had no usable marker
    pub fn undefined(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.result(), Some(res) if !res.has_usable_markers()))
            .count()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "comparison panicked".to_string()
    }
}

/// Run `compare` on every task in parallel.
///
/// Outcomes come back in task order whatever the completion order. A panic
/// inside one comparison becomes that task's `Failed` outcome.
pub(crate) fn dispatch<F>(tasks: &[PairTask], show_progress: bool, compare: F) -> Vec<PairOutcome>
where
    F: Fn(&PairTask) -> PairResult + Sync,
{
    let pb = progress_bar(tasks.len() as u64, show_progress);

    let outcomes: Vec<PairOutcome> = tasks
        .par_iter()
        .map(|task| {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| compare(task))) {
                Ok(result) => PairOutcome::Compared(result),
                Err(payload) => PairOutcome::Failed {
                    reason: panic_message(payload.as_ref()),
                },
            };
            pb.inc(1);
            outcome
        })
        .collect();

    pb.finish_and_clear();
    outcomes
}

/// Compares every tumor with every normal on a dedicated worker pool
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    policy: ComparisonPolicy,
    threads: usize,
    show_progress: bool,
}

impl BatchOrchestrator {
    pub fn new(policy: ComparisonPolicy, threads: usize) -> Result<Self> {
        policy.validate()?;
        if threads == 0 {
            return Err(Error::config("threads must be at least 1"));
        }
        Ok(Self {
            policy,
            threads,
            show_progress: false,
        })
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn policy(&self) -> &ComparisonPolicy {
        &self.policy
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn run(
        &self,
        tumors: &[SampleRef],
        normals: &[SampleRef],
        cache: &mut LikelihoodCache<'_>,
    ) -> Result<BatchReport> {
        let mut context = RunContext::new(self.threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(|e| Error::ThreadPool { msg: e.to_string() })?;

        context.advance();
        let pairs = build_pairs(tumors, normals);
        context.num_tumors = tumors.len();
        context.num_normals = normals.len();
        context.num_pairs = pairs.len();
        info!(
            "🔗 {} pairs ({} tumors x {} normals)",
            pairs.len(),
            tumors.len(),
            normals.len()
        );

        context.advance();
        let paths: Vec<PathBuf> = tumors
            .iter()
            .chain(normals.iter())
            .map(|sample| sample.path.clone())
            .collect();
        pool.install(|| cache.resolve_all(&paths))?;

        let tasks = pairs
            .iter()
            .map(|pair| -> Result<PairTask> {
                Ok(PairTask {
                    tumor: cache.get(&pair.tumor.path)?,
                    normal: cache.get(&pair.normal.path)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        context.advance();
        info!("⚡ Comparing pairs on {} threads ({})", self.threads, self.policy.description());
        let panel = cache.panel();
        let policy = self.policy;
        let outcomes = pool.install(|| {
            dispatch(&tasks, self.show_progress, |task| {
                compare_pair(&task.tumor, &task.normal, panel, &policy)
            })
        });

        context.advance();
        let results: Vec<PairRecord> = pairs
            .iter()
            .zip(outcomes)
            .map(|(pair, outcome)| PairRecord {
                tumor_id: pair.tumor.id.clone(),
                normal_id: pair.normal.id.clone(),
                tumor_path: pair.tumor.path.clone(),
                normal_path: pair.normal.path.clone(),
                outcome,
            })
            .collect();

        for record in results.iter().filter(|r| r.is_failed()) {
            if let PairOutcome::Failed { reason } = &record.outcome {
                warn!(
                    "⚠️  {} vs {} failed: {}",
                    record.tumor_id, record.normal_id, reason
                );
            }
        }

        context.advance();
        let report = BatchReport { results, context };
        info!(
            "✅ {} pairs in {:.2}s ({} without usable markers, {} failed)",
            report.results.len(),
            report.context.elapsed().as_secs_f64(),
            report.undefined(),
            report.failed()
        );
        Ok(report)
    }
}
