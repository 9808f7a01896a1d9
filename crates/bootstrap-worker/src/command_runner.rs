// Seams to the outside world: running external commands and downloading
// archives. The orchestrator only ever talks to these traits.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bootstrap_sdk::{ProcessError, ProcessInvoker, ProcessOutput, TraceWriter};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::step::CommandSpec;

/// Runs an external command to completion and reports its exit status.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        command: &CommandSpec,
        cancel: CancellationToken,
    ) -> Result<ProcessOutput, ProcessError>;
}

/// [`CommandRunner`] backed by real child processes.
pub struct ProcessCommandRunner {
    invoker: ProcessInvoker,
}

impl ProcessCommandRunner {
    pub fn new(trace: Arc<dyn TraceWriter>) -> Self {
        Self {
            invoker: ProcessInvoker::new(trace),
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessCommandRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        cancel: CancellationToken,
    ) -> Result<ProcessOutput, ProcessError> {
        let env = (!command.env.is_empty()).then_some(&command.env);
        self.invoker
            .execute(
                command.working_dir.as_deref(),
                &command.program,
                &command.args,
                env,
                cancel,
            )
            .await
    }
}

/// Copies a remote or local archive to a local file.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Downloads `http(s)://` URLs with reqwest; `file://` URLs and bare paths
/// are copied from disk.
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("z80-bootstrap/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    async fn download_http(&self, url: &str, dest: &Path) -> Result<()> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send download request")?;

        if !response.status().is_success() {
            anyhow::bail!("Download failed with HTTP {}", response.status().as_u16());
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create '{}'", dest.display()))?;
        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read download response body")?
        {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write '{}'", dest.display()))?;
        }
        file.flush()
            .await
            .with_context(|| format!("Failed to write '{}'", dest.display()))?;
        Ok(())
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        match url::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
                self.download_http(url, dest).await
            }
            Ok(parsed) if parsed.scheme() == "file" => {
                let source = parsed
                    .to_file_path()
                    .map_err(|_| anyhow::anyhow!("Invalid file URL '{url}'"))?;
                copy_local(&source, dest).await
            }
            _ => copy_local(Path::new(url), dest).await,
        }
    }
}

async fn copy_local(source: &Path, dest: &Path) -> Result<()> {
    tokio::fs::copy(source, dest)
        .await
        .with_context(|| format!("Failed to copy archive '{}'", source.display()))?;
    Ok(())
}
