mod batch;
mod executor;
mod messages;
mod requirements;

pub use batch::{
    BatchRunner, BatchState, FinishSummary, Progress, RunnerOptions, StateError, StepOutcome,
};
pub use executor::{Execution, Executor, RunContext};
pub use messages::{DEFAULT_RECENT_WINDOW, MessageSink, RecentMessages};
pub use requirements::{RequirementsFailure, validate as validate_requirements};
