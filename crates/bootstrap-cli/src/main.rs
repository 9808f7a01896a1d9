// Entry point for the z80-bootstrap installer.
//
// Parses arguments, sets up logging, builds the default plan from the loaded
// settings and runs it. The process exit code is the run's exit code.

use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use bootstrap_cli::command_settings::CommandSettings;
use bootstrap_cli::report::format_run_report;
use bootstrap_sdk::{TraceWriter, TracingTraceWriter};
use bootstrap_worker::constants::return_code;
use bootstrap_worker::{
    default_plan, HttpDownloader, ProcessCommandRunner, ProfileResource, RunContext, Settings,
    StepExecutor, StepsRunner,
};

fn main() {
    let command = CommandSettings::parse_from_env();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to build Tokio runtime: {e}");
            std::process::exit(return_code::FAILURE);
        }
    };

    let exit_code = runtime.block_on(async move { run(command).await });

    std::process::exit(exit_code);
}

async fn run(command: CommandSettings) -> i32 {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("z80-bootstrap {} starting.", env!("CARGO_PKG_VERSION"));
    tracing::info!("  Refresh      = {}", command.refresh);

    match provision(&command).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            tracing::error!("{:#}", e);
            return_code::FAILURE
        }
    }
}

async fn provision(command: &CommandSettings) -> anyhow::Result<i32> {
    let settings = Settings::load().context("Failed to load installer settings")?;
    let ctx = RunContext::new(&settings, command.refresh);
    tracing::info!("  Architecture = {}", ctx.architecture());
    tracing::info!("  Install root = {}", ctx.install_root().display());
    tracing::info!("  Packages     = {}", ctx.package_root().display());

    let trace: Arc<dyn TraceWriter> = Arc::new(TracingTraceWriter::default());
    let executor = StepExecutor::new(
        Arc::new(ProcessCommandRunner::new(trace.clone())),
        Arc::new(HttpDownloader::new()?),
        ProfileResource::new(ctx.profile_path()),
        trace.clone(),
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping the current step.");
            on_interrupt.cancel();
        }
    });

    let runner = StepsRunner::new(executor, trace).with_cancellation(cancel);
    let steps = default_plan(&ctx, &settings);
    let report = runner.run(&steps, &ctx).await;

    println!("{}", format_run_report(report.records()));

    let tolerated = report.names_with("Tolerated");
    if !tolerated.is_empty() {
        tracing::warn!("Some optional steps failed: {}", tolerated.join(", "));
    }

    report.into_result()?;
    Ok(return_code::SUCCESS)
}
