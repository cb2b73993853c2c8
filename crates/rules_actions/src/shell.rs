use async_trait::async_trait;
use std::process::ExitStatus;

#[async_trait]
pub trait ShellExecutor: Send + Sync {
    async fn execute(&self, command: &str) -> std::io::Result<ExitStatus>;
}

/// Runs commands via `sh -c`, matching the rest of this codebase's local
/// command execution.
#[derive(Default)]
pub struct LocalShellExecutor;

impl LocalShellExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ShellExecutor for LocalShellExecutor {
    async fn execute(&self, command: &str) -> std::io::Result<ExitStatus> {
        tokio::process::Command::new("sh").arg("-c").arg(command).status().await
    }
}
