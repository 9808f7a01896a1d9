use crate::trace::TraceWriter;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// The duration to wait after sending SIGINT before escalating to SIGTERM.
const SIGINT_TIMEOUT: Duration = Duration::from_millis(7500);
/// The duration to wait after sending SIGTERM before escalating to SIGKILL.
const SIGTERM_TIMEOUT: Duration = Duration::from_millis(2500);
/// Number of trailing stderr lines kept on the output.
const STDERR_TAIL_LINES: usize = 200;

/// Error type for non-zero process exit codes.
#[derive(Debug, thiserror::Error)]
#[error("Exit code {exit_code} returned from process: file name '{file_name}', arguments '{arguments}'.")]
pub struct ProcessExitCodeError {
    pub exit_code: i32,
    pub file_name: String,
    pub arguments: String,
}

/// Failures that prevent a process from producing an exit code.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to start process '{file_name}': {source}")]
    Spawn {
        file_name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait for process '{file_name}': {source}")]
    Wait {
        file_name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("process '{file_name}' was cancelled")]
    Cancelled { file_name: String },
}

/// What a finished process left behind.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub exit_code: i32,
    /// Trailing stderr lines, oldest first.
    pub stderr: Vec<String>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Turn a non-zero exit code into a [`ProcessExitCodeError`].
    pub fn ensure_success(
        &self,
        file_name: &str,
        arguments: &[String],
    ) -> Result<(), ProcessExitCodeError> {
        if self.success() {
            return Ok(());
        }
        Err(ProcessExitCodeError {
            exit_code: self.exit_code,
            file_name: file_name.to_string(),
            arguments: arguments.join(" "),
        })
    }

    /// The captured stderr as one string.
    pub fn stderr_text(&self) -> String {
        self.stderr.join("\n")
    }
}

/// Spawns a child process, streams its stdout to the trace, captures its
/// stderr, and interrupts it gracefully (SIGINT → SIGTERM → SIGKILL) when
/// the cancellation token fires.
pub struct ProcessInvoker {
    trace: Arc<dyn TraceWriter>,
}

impl ProcessInvoker {
    pub fn new(trace: Arc<dyn TraceWriter>) -> Self {
        Self { trace }
    }

    /// Execute `file_name` with `arguments` and wait for it to exit.
    ///
    /// A non-zero exit code is not an error here; callers inspect
    /// [`ProcessOutput::exit_code`] and decide.
    pub async fn execute(
        &self,
        working_directory: Option<&Path>,
        file_name: &str,
        arguments: &[String],
        environment: Option<&HashMap<String, String>>,
        cancellation_token: CancellationToken,
    ) -> Result<ProcessOutput, ProcessError> {
        self.trace.verbose(&format!(
            "Starting process '{file_name}' with arguments '{}'",
            arguments.join(" ")
        ));

        let mut cmd = Command::new(file_name);
        cmd.args(arguments);

        if let Some(dir) = working_directory {
            self.trace
                .verbose(&format!("  Working directory: '{}'", dir.display()));
            cmd.current_dir(dir);
        }

        if let Some(env) = environment {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);

        let start = std::time::Instant::now();
        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            file_name: file_name.to_string(),
            source,
        })?;
        let pid = child.id().unwrap_or(0);

        let stdout = child.stdout.take();
        let trace_stdout = self.trace.clone();
        let stdout_task = tokio::spawn(async move {
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    trace_stdout.verbose(&line);
                }
            }
        });

        let stderr = child.stderr.take();
        let trace_stderr = self.trace.clone();
        let stderr_task = tokio::spawn(async move {
            let mut tail = Vec::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    trace_stderr.verbose(&line);
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.remove(0);
                    }
                    tail.push(line);
                }
            }
            tail
        });

        let (exit_code, was_cancelled) = tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|source| ProcessError::Wait {
                    file_name: file_name.to_string(),
                    source,
                })?;
                (status.code().unwrap_or(-1), false)
            }
            _ = cancellation_token.cancelled() => {
                self.trace.info(&format!("Cancellation requested, stopping process {pid}."));
                (self.cancel_and_kill_process(&mut child).await, true)
            }
        };

        if was_cancelled {
            // Grandchildren may still hold the pipes open.
            stdout_task.abort();
            stderr_task.abort();
            self.trace.verbose(&format!(
                "Stopped process {pid} with exit code {exit_code} after {:.2?}.",
                start.elapsed()
            ));
            return Err(ProcessError::Cancelled {
                file_name: file_name.to_string(),
            });
        }

        let _ = stdout_task.await;
        let stderr = stderr_task.await.unwrap_or_default();

        self.trace.verbose(&format!(
            "Finished process {pid} with exit code {exit_code}, and elapsed time {:.2?}.",
            start.elapsed()
        ));

        Ok(ProcessOutput { exit_code, stderr })
    }

    async fn cancel_and_kill_process(&self, child: &mut tokio::process::Child) -> i32 {
        for (signal, timeout) in [(Signal::Int, SIGINT_TIMEOUT), (Signal::Term, SIGTERM_TIMEOUT)] {
            if self.send_signal_and_wait(child, signal, timeout).await {
                return child
                    .wait()
                    .await
                    .map(|s| s.code().unwrap_or(-1))
                    .unwrap_or(-1);
            }
        }

        self.trace
            .warning("Process ignored both interrupt and terminate signals, killing it.");
        let _ = child.kill().await;
        child
            .wait()
            .await
            .map(|s| s.code().unwrap_or(-1))
            .unwrap_or(-1)
    }

    /// Returns `true` if the process exited within `timeout` after the signal.
    #[cfg(unix)]
    async fn send_signal_and_wait(
        &self,
        child: &mut tokio::process::Child,
        signal: Signal,
        timeout: Duration,
    ) -> bool {
        let Some(pid) = child.id() else {
            return true;
        };

        let sig = match signal {
            Signal::Int => nix::sys::signal::Signal::SIGINT,
            Signal::Term => nix::sys::signal::Signal::SIGTERM,
        };

        if nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), sig).is_err() {
            self.trace
                .verbose(&format!("{sig:?} signal failed to send to process {pid}."));
            return false;
        }

        tokio::select! {
            result = child.wait() => result.is_ok(),
            _ = tokio::time::sleep(timeout) => {
                self.trace.verbose(&format!(
                    "Process did not honor {sig:?} within {:.1}s.",
                    timeout.as_secs_f64()
                ));
                false
            }
        }
    }

    #[cfg(not(unix))]
    async fn send_signal_and_wait(
        &self,
        child: &mut tokio::process::Child,
        _signal: Signal,
        timeout: Duration,
    ) -> bool {
        tokio::select! {
            result = child.wait() => result.is_ok(),
            _ = tokio::time::sleep(timeout) => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Int,
    Term,
}
