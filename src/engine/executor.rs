use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};

use crate::core::{Outcome, Status, Verdict};
use crate::engine::messages::MessageSink;
use crate::engine::requirements;
use crate::environment::Environment;
use crate::registry::Check;

/// Per-run time budget handed to the check. Checks that call out to
/// anything slow should bound the call with `remaining_budget` so one
/// slow check cannot eat the whole invocation.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub timeout: Duration,
    pub deadline: Option<Instant>,
}

impl RunContext {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn remaining_budget(&self) -> Duration {
        let Some(deadline) = self.deadline else {
            return self.timeout;
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        std::cmp::min(self.timeout, remaining)
    }
}

/// The executor's result for one check: the verdict plus the drained
/// capture lines, already tagged with the check's label.
#[derive(Debug)]
pub struct Execution {
    pub verdict: Verdict,
    pub messages: Vec<String>,
}

/// Runs exactly one check: requirements gate, perform, outcome
/// normalization, capture drain. Performs no I/O of its own; nothing a
/// check does can unwind past `run`.
pub struct Executor<'a> {
    env: &'a Environment,
    timeout: Duration,
}

impl<'a> Executor<'a> {
    pub fn new(env: &'a Environment, timeout: Duration) -> Self {
        Self { env, timeout }
    }

    pub fn run(&self, check: &dyn Check) -> Execution {
        let descriptor = check.descriptor();

        if let Err(failure) = requirements::validate(&descriptor.requirements, self.env) {
            let verdict =
                Outcome::skip(failure.to_string()).into_verdict(&descriptor.id, descriptor.severity);
            return Execution {
                verdict,
                messages: Vec::new(),
            };
        }

        let ctx = RunContext::new(self.timeout);
        let mut sink = MessageSink::default();
        let result = catch_unwind(AssertUnwindSafe(|| {
            check.perform(&ctx, self.env, &mut sink)
        }));

        let outcome = match result {
            Ok(Ok(outcome)) => normalize(outcome, &descriptor.id),
            Ok(Err(err)) => Outcome::fail(format!(
                "check {} returned an unexpected error: {err:#}",
                descriptor.id
            )),
            Err(_) => Outcome::fail(format!("check {} panicked during execution", descriptor.id)),
        };

        let messages = sink
            .drain()
            .into_iter()
            .map(|line| format!("[{}] {line}", descriptor.label))
            .collect();

        Execution {
            verdict: outcome.into_verdict(&descriptor.id, descriptor.severity),
            messages,
        }
    }
}

/// A SKIP must always explain itself; fill in a generic reason when a
/// check forgot one.
fn normalize(mut outcome: Outcome, check_id: &str) -> Outcome {
    if outcome.status == Status::Skip
        && outcome
            .reason
            .as_deref()
            .is_none_or(|reason| reason.trim().is_empty())
    {
        outcome.reason = Some(format!("check {check_id} skipped without a stated reason"));
    }
    outcome
}
