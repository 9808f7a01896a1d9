// StepsRunner: the provisioning orchestrator.
// Walks the step list in order, skipping satisfied steps, displacing
// resources on refresh, enforcing the optional per-step timeout, and stopping
// at the first failure.

use bootstrap_sdk::TraceWriter;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::displacement;
use crate::errors::ProvisionError;
use crate::run_context::RunContext;
use crate::step::{RefreshPolicy, Step};
use crate::step_executor::StepExecutor;
use crate::step_result::{RunReport, StepRecord, StepResult};

/// How long a stopped action may take to shut its process down. Covers the
/// process invoker's interrupt and terminate grace periods.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(12);

/// Executes all steps of a plan, in order.
pub struct StepsRunner {
    executor: StepExecutor,
    trace: Arc<dyn TraceWriter>,
    cancel: CancellationToken,
}

impl StepsRunner {
    pub fn new(executor: StepExecutor, trace: Arc<dyn TraceWriter>) -> Self {
        Self {
            executor,
            trace,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancelling `token` stops the running step and fails the run.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run `steps` against `ctx`. No step after the first failure is evaluated.
    pub async fn run(&self, steps: &[Step], ctx: &RunContext) -> RunReport {
        let mut report = RunReport::new();
        let total = steps.len();

        if ctx.refresh() {
            self.trace
                .info("Refresh requested: existing sources will be moved aside and fetched again.");
        }

        for (index, step) in steps.iter().enumerate() {
            let start = Instant::now();
            let position = format!("[{}/{}]", index + 1, total);

            let result = if self.cancel.is_cancelled() {
                StepResult::Failed {
                    error: ProvisionError::Cancelled,
                }
            } else {
                self.run_step(step, ctx, &position).await
            };

            let failed = result.is_failed();
            report.push(StepRecord {
                name: step.name.clone(),
                result,
                elapsed: start.elapsed(),
            });
            if failed {
                break;
            }
        }

        match report.failure() {
            None => self.trace.info("Provisioning finished successfully."),
            Some((name, error)) => {
                self.trace
                    .error(&format!("Provisioning failed at step '{name}': {error}"));
                if let Some(advice) = error.remediation() {
                    self.trace.error(advice);
                }
            }
        }

        report
    }

    async fn run_step(&self, step: &Step, ctx: &RunContext, position: &str) -> StepResult {
        let name = &step.name;
        let satisfied = step.precondition.is_satisfied(ctx);
        let forced = ctx.refresh() && step.refresh != RefreshPolicy::Never;

        if satisfied && !forced {
            self.trace
                .info(&format!("{position} Skipping '{name}': already satisfied."));
            return StepResult::Skipped;
        }

        self.trace.info(&format!("{position} Running '{name}'..."));
        let start = Instant::now();

        match self.execute(step, ctx).await {
            Ok(()) => {
                self.trace.info(&format!(
                    "{position} '{name}' succeeded in {:.1?}.",
                    start.elapsed()
                ));
                StepResult::Executed
            }
            Err(error) if step.best_effort => {
                self.trace.warning(&format!(
                    "{position} '{name}' failed, continuing anyway: {error}"
                ));
                StepResult::Tolerated {
                    message: error.to_string(),
                }
            }
            Err(error) => {
                self.trace
                    .error(&format!("{position} '{name}' failed: {error}"));
                StepResult::Failed { error }
            }
        }
    }

    async fn execute(&self, step: &Step, ctx: &RunContext) -> Result<(), ProvisionError> {
        if ctx.refresh() && step.refresh == RefreshPolicy::Displace {
            if let Some(target) = step.kind.target() {
                displacement::displace(target, self.trace.as_ref()).await?;
            }
        }

        let step_cancel = self.cancel.child_token();
        let action = self.executor.execute(&step.kind, ctx, step_cancel.clone());
        tokio::pin!(action);

        let stopped = tokio::select! {
            result = &mut action => return result,
            elapsed = deadline(ctx.step_timeout()) => {
                self.trace.warning(&format!(
                    "'{}' exceeded its {:.0?} timeout, stopping it.",
                    step.name, elapsed
                ));
                ProvisionError::Timeout(elapsed)
            }
            _ = self.cancel.cancelled() => ProvisionError::Cancelled,
        };

        // Let the action interrupt its process before the future is dropped.
        step_cancel.cancel();
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, &mut action).await;
        Err(stopped)
    }
}

/// Resolves after `timeout`, or never when there is none.
async fn deadline(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(timeout) => {
            tokio::time::sleep(timeout).await;
            timeout
        }
        None => std::future::pending().await,
    }
}
