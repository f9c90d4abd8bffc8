use std::collections::VecDeque;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::{Report, Tallies};
use crate::engine::executor::Executor;
use crate::engine::messages::{DEFAULT_RECENT_WINDOW, RecentMessages};
use crate::environment::Environment;
use crate::registry::{CheckRegistry, ListFilter};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("audit state is corrupt: {0}")]
    Corrupt(String),
}

/// Everything the runner needs to continue a half-finished audit. The
/// driver round-trips this value between steps; the runner itself keeps
/// nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchState {
    pub remaining: VecDeque<String>,
    pub total: usize,
    pub processed: usize,
    pub recent: RecentMessages,
    pub report: Report,
    pub finished: bool,
}

impl BatchState {
    /// The counters must reconcile; a state that does not is refused
    /// rather than silently re-run or truncated.
    pub fn validate(&self) -> Result<(), StateError> {
        if self.processed + self.remaining.len() != self.total {
            return Err(StateError::Corrupt(format!(
                "{} processed + {} remaining != {} total",
                self.processed,
                self.remaining.len(),
                self.total
            )));
        }
        if self.finished && !self.remaining.is_empty() {
            return Err(StateError::Corrupt(
                "finished run still has remaining checks".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Checks consumed per `step` call.
    pub checks_per_step: usize,
    pub recent_window: usize,
    pub check_timeout: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            checks_per_step: 1,
            recent_window: DEFAULT_RECENT_WINDOW,
            check_timeout: Duration::from_secs(30),
        }
    }
}

/// Progress snapshot emitted after every step.
#[derive(Debug, Clone)]
pub struct Progress {
    pub fraction: f64,
    pub position: usize,
    pub total: usize,
    pub current_label: Option<String>,
    pub recent_text: String,
}

/// Emitted exactly once, on the step that consumes the last check.
#[derive(Debug, Clone)]
pub struct FinishSummary {
    pub report: Report,
    pub tallies: Tallies,
}

#[derive(Debug)]
pub struct StepOutcome {
    pub progress: Progress,
    pub finished: Option<FinishSummary>,
}

/// Cooperative audit runner. Each `step` call consumes a bounded number
/// of checks and hands back the updated state; the caller decides when
/// (and in which process) the next step happens.
pub struct BatchRunner<'a> {
    registry: &'a CheckRegistry,
    env: &'a Environment,
    opts: RunnerOptions,
}

impl<'a> BatchRunner<'a> {
    pub fn new(registry: &'a CheckRegistry, env: &'a Environment, opts: RunnerOptions) -> Self {
        Self {
            registry,
            env,
            opts,
        }
    }

    /// Starts a fresh run over the given ids. Duplicates are collapsed
    /// to their first occurrence and disabled checks are dropped up
    /// front, so `total` reflects what will actually run.
    pub fn begin(&self, ids: &[String]) -> Result<BatchState> {
        let mut remaining: VecDeque<String> = VecDeque::new();
        for id in ids {
            if remaining.contains(id) {
                continue;
            }
            let enabled = self
                .registry
                .get(id)
                .is_some_and(|check| check.descriptor().enabled);
            // Unknown ids stay queued; the step loop records them as
            // no-longer-registered instead of failing the whole run.
            if self.registry.contains(id) && !enabled {
                continue;
            }
            remaining.push_back(id.clone());
        }

        let generated_at = OffsetDateTime::now_utc().format(&Rfc3339)?;
        let mut report = Report::new(env!("CARGO_PKG_VERSION"), generated_at);
        if !self.env.overview.is_empty() {
            report.set_overview(self.env.overview_map());
        }

        Ok(BatchState {
            total: remaining.len(),
            remaining,
            processed: 0,
            recent: RecentMessages::new(self.opts.recent_window),
            report,
            finished: false,
        })
    }

    /// Picks up a previously persisted state after validating it.
    pub fn resume(&self, state: BatchState) -> Result<BatchState, StateError> {
        state.validate()?;
        Ok(state)
    }

    /// Runs up to `checks_per_step` checks. The finish summary fires on
    /// the call that empties the queue and never again, even if `step`
    /// keeps being called on a finished state.
    pub fn step(&self, state: &mut BatchState) -> StepOutcome {
        let executor = Executor::new(self.env, self.opts.check_timeout);
        let already_finished = state.finished;

        for _ in 0..self.opts.checks_per_step.max(1) {
            let Some(id) = state.remaining.pop_front() else {
                break;
            };
            match self.registry.get(&id) {
                Some(check) => {
                    let execution = executor.run(check);
                    state.recent.extend(execution.messages);
                    state.report.add_verdict(execution.verdict);
                }
                None => {
                    state.recent.push(format!(
                        "check {id} is no longer registered; skipping without a verdict"
                    ));
                }
            }
            state.processed += 1;
        }

        let just_finished = state.remaining.is_empty() && !already_finished;
        if just_finished {
            state.finished = true;
        }

        StepOutcome {
            progress: self.progress(state),
            finished: just_finished.then(|| FinishSummary {
                report: state.report.clone(),
                tallies: state.report.tallies(),
            }),
        }
    }

    /// Drives a run from scratch to completion in-process.
    pub fn run_to_completion(
        &self,
        ids: &[String],
        mut on_progress: impl FnMut(&Progress),
    ) -> Result<FinishSummary> {
        let mut state = self.begin(ids)?;
        loop {
            let outcome = self.step(&mut state);
            on_progress(&outcome.progress);
            if let Some(summary) = outcome.finished {
                return Ok(summary);
            }
        }
    }

    fn progress(&self, state: &BatchState) -> Progress {
        let fraction = if state.total == 0 {
            1.0
        } else {
            state.processed as f64 / state.total as f64
        };
        let current_label = state.remaining.front().map(|id| {
            self.registry
                .get(id)
                .map(|check| check.descriptor().label.clone())
                .unwrap_or_else(|| id.clone())
        });
        Progress {
            fraction,
            position: state.processed,
            total: state.total,
            current_label,
            recent_text: state.recent.as_text(),
        }
    }
}
