//! Running the wrapped CNI plugin
//!
//! The plugin inherits the wrapper's environment, stdout and stderr, receives
//! the rewritten configuration on stdin and gets SIGINT/SIGTERM forwarded
//! while it runs. Its exit status becomes the wrapper's.

use super::signals::{relay_signals, SignalScope};
use crate::error::{Result, WrapperError};
use nix::unistd::Pid;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tokio_util::sync::CancellationToken;

/// Lifecycle of the supervised plugin process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildState {
    NotStarted,
    Starting,
    Running,
    Terminated,
    /// The process could not be launched.
    Failed,
}

impl ChildState {
    fn can_advance_to(self, next: ChildState) -> bool {
        matches!(
            (self, next),
            (ChildState::NotStarted, ChildState::Starting)
                | (ChildState::Starting, ChildState::Running)
                | (ChildState::Starting, ChildState::Failed)
                | (ChildState::Running, ChildState::Terminated)
        )
    }
}

/// How the plugin process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    Exited(i32),
    Signaled(i32),
    /// Neither an exit nor a termination signal; holds the raw wait status.
    Unrecognized(i32),
}

/// Exit code for a wait status that is neither an exit nor a signal.
pub const EXIT_UNRECOGNIZED: i32 = 255;

impl ChildOutcome {
    /// Exit code the wrapper reports, using the shell's `128 + signal`
    /// convention for processes killed by a signal.
    pub fn exit_code(&self) -> i32 {
        match self {
            ChildOutcome::Exited(code) => *code,
            ChildOutcome::Signaled(signal) => 128 + signal,
            ChildOutcome::Unrecognized(_) => EXIT_UNRECOGNIZED,
        }
    }
}

impl From<ExitStatus> for ChildOutcome {
    fn from(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => ChildOutcome::Exited(code),
            (None, Some(signal)) => ChildOutcome::Signaled(signal),
            (None, None) => {
                tracing::warn!("CNI plugin ended with unrecognized wait status {:#x}", status.into_raw());
                ChildOutcome::Unrecognized(status.into_raw())
            }
        }
    }
}

impl fmt::Display for ChildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildOutcome::Exited(code) => write!(f, "exited with code {}", code),
            ChildOutcome::Signaled(signal) => write!(f, "killed by signal {}", signal),
            ChildOutcome::Unrecognized(raw) => write!(f, "ended with wait status {:#x}", raw),
        }
    }
}

/// One invocation of the wrapped plugin binary
pub struct PluginProcess {
    binary: PathBuf,
    args: Vec<OsString>,
    state: ChildState,
}

impl PluginProcess {
    pub fn new(binary: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            binary: binary.into(),
            args,
            state: ChildState::NotStarted,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn state(&self) -> ChildState {
        self.state
    }

    fn advance(&mut self, next: ChildState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(WrapperError::InvalidStateTransition(format!(
                "{:?} -> {:?}",
                self.state, next
            )));
        }
        tracing::trace!("CNI plugin {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(())
    }

    fn launch_failed(&mut self, source: io::Error) -> WrapperError {
        self.state = ChildState::Failed;
        WrapperError::Launch {
            path: self.binary.clone(),
            source,
        }
    }

    /// Run the plugin to completion, feeding it `stdin_payload`.
    ///
    /// Only launch problems are errors; any exit status of the plugin,
    /// including non-zero ones, is a regular [`ChildOutcome`].
    pub async fn run(&mut self, stdin_payload: &[u8]) -> Result<ChildOutcome> {
        self.advance(ChildState::Starting)?;

        // Intercept before spawning so a signal sent right after the plugin
        // starts cannot kill the wrapper instead.
        let (scope, streams) = match SignalScope::install() {
            Ok(installed) => installed,
            Err(e) => return Err(self.launch_failed(e)),
        };

        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return Err(self.launch_failed(e)),
        };

        let Some(pid) = child.id() else {
            return Err(self.launch_failed(io::Error::new(
                io::ErrorKind::Other,
                "plugin exited before its pid could be read",
            )));
        };
        self.advance(ChildState::Running)?;
        tracing::debug!("Started CNI plugin {} (pid {})", self.binary.display(), pid);

        let cancel = CancellationToken::new();
        let relay = tokio::spawn(relay_signals(
            Pid::from_raw(pid as i32),
            streams,
            cancel.clone(),
        ));

        if let Some(stdin) = child.stdin.take() {
            write_payload(stdin, stdin_payload).await;
        }

        let status = child.wait().await;

        cancel.cancel();
        if let Err(e) = relay.await {
            tracing::warn!("Signal relay task failed: {}", e);
        }
        drop(scope);

        let outcome = ChildOutcome::from(status?);
        self.advance(ChildState::Terminated)?;
        tracing::debug!("CNI plugin {}", outcome);

        Ok(outcome)
    }
}

/// Write the configuration and close stdin.
///
/// A plugin may stop reading early; that is its business, so failures are
/// only logged and its exit status stays authoritative.
async fn write_payload(mut stdin: ChildStdin, payload: &[u8]) {
    let written = async {
        stdin.write_all(payload).await?;
        stdin.flush().await
    }
    .await;

    match written {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            tracing::debug!("CNI plugin closed stdin before reading all input");
        }
        Err(e) => tracing::warn!("Failed to write to CNI plugin stdin: {}", e),
    }
}

/// Run `binary` with `args`, feeding `stdin_payload`, and wait for it.
pub async fn run(binary: &Path, args: Vec<OsString>, stdin_payload: &[u8]) -> Result<ChildOutcome> {
    PluginProcess::new(binary, args).run(stdin_payload).await
}
