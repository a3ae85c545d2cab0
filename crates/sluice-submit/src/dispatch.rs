//! Change-merged consumers backed by the filesystem and external programs.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use sluice_core::id::{AccountId, ChangeId};

use crate::collab::{MergedEvent, MergedHook, MergedNotifier};
use crate::DispatchError;

#[derive(Debug, Serialize)]
struct OutboxRecord {
    event: &'static str,
    change: ChangeId,
    submitter: AccountId,
}

/// Appends one JSON line per merged change to an outbox file for a mailer
/// to pick up.
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    path: PathBuf,
}

impl OutboxNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MergedNotifier for OutboxNotifier {
    async fn change_merged(&self, change: ChangeId, submitter: AccountId) -> Result<(), DispatchError> {
        let mut line = serde_json::to_vec(&OutboxRecord {
            event: "change-merged",
            change,
            submitter,
        })?;
        line.push(b'\n');
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Runs an executable with the merge described in `SLUICE_*` variables.
/// The child is killed once `timeout` elapses.
#[derive(Debug, Clone)]
pub struct CommandHook {
    program: PathBuf,
    timeout: Duration,
}

impl CommandHook {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl MergedHook for CommandHook {
    async fn change_merged(&self, event: &MergedEvent) -> Result<(), DispatchError> {
        let mut cmd = Command::new(&self.program);
        cmd.kill_on_drop(true)
            .env("SLUICE_CHANGE", event.change.id.to_string())
            .env("SLUICE_PROJECT", &event.change.dest.project)
            .env("SLUICE_BRANCH", &event.change.dest.ref_name)
            .env("SLUICE_NEW_REV", event.merge_result.to_hex());
        if let Some(patch_set) = &event.patch_set {
            cmd.env("SLUICE_PATCH_SET", patch_set.id.to_string());
        }
        if let Some(name) = event.submitter.as_ref().and_then(|a| a.full_name.as_deref()) {
            cmd.env("SLUICE_SUBMITTER", name);
        }
        let mut child = cmd.spawn()?;
        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                child.kill().await?;
                return Err(DispatchError::HookTimeout {
                    hook: self.program.display().to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
        };
        debug!(hook = %self.program.display(), %status, "change-merged hook finished");
        if !status.success() {
            return Err(DispatchError::HookFailed {
                hook: self.program.display().to_string(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}
