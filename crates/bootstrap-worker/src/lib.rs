// bootstrap-worker: step model, probes and the orchestrator that provisions
// the Z80 toolchain and framework. Depends on `bootstrap-sdk`.
//
// Flow:
//   installer_plan::default_plan → StepsRunner::run
//     → Precondition::is_satisfied → (displacement) → StepExecutor::execute

pub mod command_runner;
pub mod constants;
pub mod displacement;
pub mod errors;
pub mod fetch;
pub mod installer_plan;
pub mod probe;
pub mod profile;
pub mod run_context;
pub mod settings;
pub mod step;
pub mod step_executor;
pub mod step_result;
pub mod steps_runner;

#[cfg(test)]
mod test_support;

pub use command_runner::{CommandRunner, Downloader, HttpDownloader, ProcessCommandRunner};
pub use errors::{ProvisionError, StepFailure};
pub use installer_plan::default_plan;
pub use profile::ProfileResource;
pub use run_context::RunContext;
pub use settings::Settings;
pub use step::{CommandSpec, Precondition, RefreshPolicy, Step, StepKind};
pub use step_executor::StepExecutor;
pub use step_result::{RunReport, StepRecord, StepResult};
pub use steps_runner::StepsRunner;
