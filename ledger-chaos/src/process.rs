//! Service process lifecycle: start and kill the ledger under test.
//!
//! Two backends:
//! - [`ScriptProcessControl`] runs an external start command that prints the
//!   service pid, and an external kill command given that pid.
//! - [`DockerProcessControl`] starts a named container and kills it with
//!   SIGKILL through the Docker API.
//!
//! [`MockProcessControl`] records calls and injects failures for tests.

use async_trait::async_trait;
use bollard::container::{KillContainerOptions, StartContainerOptions};
use bollard::Docker;
use std::fmt;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors that can occur while starting or killing the service.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Command exited unsuccessfully.
    #[error("{command} failed: status={status}, stderr={stderr}")]
    CommandFailed {
        /// Command line that was run.
        command: String,
        /// Exit status.
        status: String,
        /// Standard error output.
        stderr: String,
    },

    /// Start command succeeded but printed no process identifier.
    #[error("{0} printed no process identifier")]
    MissingPid(String),

    /// Command line is empty.
    #[error("empty command")]
    EmptyCommand,

    /// Docker API error.
    #[error("docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    /// Injected by [`MockProcessControl`].
    #[error("injected failure: {0}")]
    Injected(String),

    /// General I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Identifier of one launched service instance.
///
/// A pid for the script backend, a container name for the Docker backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessId(String);

impl ProcessId {
    /// Wrap an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Starts and kills the service under test.
#[async_trait]
pub trait ProcessControl: Send + Sync {
    /// Launch the service and return its identifier.
    async fn start(&self) -> Result<ProcessId, ProcessError>;

    /// Stop the service identified by `id`.
    async fn terminate(&self, id: &ProcessId) -> Result<(), ProcessError>;
}

/// Process control through external commands.
///
/// The start command must print the service pid on stdout and then exit.
/// It must not leave the service attached to its stdout, otherwise reading
/// the pid never sees end of stream.
#[derive(Debug, Clone)]
pub struct ScriptProcessControl {
    start_command: Vec<String>,
    kill_command: Vec<String>,
}

impl ScriptProcessControl {
    /// Create a control from argv-style command lines.
    ///
    /// The pid is appended to `kill_command` at termination time.
    pub fn new(start_command: Vec<String>, kill_command: Vec<String>) -> Result<Self, ProcessError> {
        if start_command.is_empty() || kill_command.is_empty() {
            return Err(ProcessError::EmptyCommand);
        }
        Ok(Self {
            start_command,
            kill_command,
        })
    }

    fn command(argv: &[String]) -> Result<tokio::process::Command, ProcessError> {
        let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;
        let mut command = tokio::process::Command::new(program);
        command.args(args).stdin(Stdio::null());
        Ok(command)
    }
}

#[async_trait]
impl ProcessControl for ScriptProcessControl {
    async fn start(&self) -> Result<ProcessId, ProcessError> {
        let output = Self::command(&self.start_command)?.output().await?;
        let command = self.start_command.join(" ");

        if !output.status.success() {
            return Err(ProcessError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let pid = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if pid.is_empty() {
            return Err(ProcessError::MissingPid(command));
        }
        Ok(ProcessId(pid))
    }

    async fn terminate(&self, id: &ProcessId) -> Result<(), ProcessError> {
        let output = Self::command(&self.kill_command)?
            .arg(id.as_str())
            .output()
            .await?;

        if !output.status.success() {
            return Err(ProcessError::CommandFailed {
                command: format!("{} {}", self.kill_command.join(" "), id),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Process control through the Docker API.
///
/// The container must already exist (e.g. created by `docker compose create`).
pub struct DockerProcessControl {
    docker: Docker,
    container: String,
}

impl DockerProcessControl {
    /// Connect to the local Docker daemon.
    pub fn new(container: impl Into<String>) -> Result<Self, ProcessError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self {
            docker,
            container: container.into(),
        })
    }
}

#[async_trait]
impl ProcessControl for DockerProcessControl {
    async fn start(&self) -> Result<ProcessId, ProcessError> {
        self.docker
            .start_container(&self.container, None::<StartContainerOptions<String>>)
            .await?;
        Ok(ProcessId(self.container.clone()))
    }

    async fn terminate(&self, id: &ProcessId) -> Result<(), ProcessError> {
        self.docker
            .kill_container(
                id.as_str(),
                Some(KillContainerOptions { signal: "SIGKILL" }),
            )
            .await?;
        Ok(())
    }
}

/// One call observed by [`MockProcessControl`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// `start()` returned this id.
    Started(ProcessId),
    /// `terminate()` succeeded for this id.
    Killed(ProcessId),
}

/// Process control for testing.
///
/// Hands out sequential ids, records every call, and fails the N-th start
/// or kill on request. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockProcessControl {
    inner: Arc<Mutex<MockProcessInner>>,
}

#[derive(Debug, Default)]
struct MockProcessInner {
    events: Vec<ProcessEvent>,
    starts: usize,
    kills: usize,
    fail_start_at: Option<usize>,
    fail_kill_at: Option<usize>,
}

impl MockProcessControl {
    /// Create a new mock control.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`-th call to `start()` (1-based).
    pub fn fail_start_at(&self, n: usize) {
        self.inner.lock().unwrap().fail_start_at = Some(n);
    }

    /// Fail the `n`-th call to `terminate()` (1-based).
    pub fn fail_kill_at(&self, n: usize) {
        self.inner.lock().unwrap().fail_kill_at = Some(n);
    }

    /// Every successful call so far, in order.
    pub fn events(&self) -> Vec<ProcessEvent> {
        self.inner.lock().unwrap().events.clone()
    }

    /// Number of `start()` calls.
    pub fn starts(&self) -> usize {
        self.inner.lock().unwrap().starts
    }

    /// Number of `terminate()` calls.
    pub fn kills(&self) -> usize {
        self.inner.lock().unwrap().kills
    }
}

#[async_trait]
impl ProcessControl for MockProcessControl {
    async fn start(&self) -> Result<ProcessId, ProcessError> {
        let mut inner = self.inner.lock().unwrap();
        inner.starts += 1;
        if inner.fail_start_at == Some(inner.starts) {
            return Err(ProcessError::Injected("start".into()));
        }
        let id = ProcessId(format!("{}", 1000 + inner.starts));
        inner.events.push(ProcessEvent::Started(id.clone()));
        Ok(id)
    }

    async fn terminate(&self, id: &ProcessId) -> Result<(), ProcessError> {
        let mut inner = self.inner.lock().unwrap();
        inner.kills += 1;
        if inner.fail_kill_at == Some(inner.kills) {
            return Err(ProcessError::Injected("kill".into()));
        }
        inner.events.push(ProcessEvent::Killed(id.clone()));
        Ok(())
    }
}
