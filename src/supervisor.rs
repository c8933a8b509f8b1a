/// Child lifecycle: spawn the command through a shell, wait on it in bounded
/// quanta while printing liveness reports, kill it at the deadline, reap it,
/// and hand back its exit code.
use crate::clock::{format_duration, format_timestamp, Clock, SystemClock};
use crate::report::{Reporter, Severity};
use crate::schedule::SleepSchedule;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Final disposition of the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Exit code, or `128 + signal` if the child died from a signal.
    pub code: i32,
    /// True if the deadline passed and the child was killed.
    pub killed: bool,
}

/// Result of one bounded wait on the child.
#[derive(Debug)]
enum WaitOutcome {
    Exited(ExitStatus),
    Running,
}

/// Why the supervise loop stopped.
#[derive(Debug)]
enum LoopExit {
    ChildExited(ExitStatus),
    DeadlineReached,
}

/// Errors that abort supervision.
#[derive(Debug)]
pub enum SupervisorError {
    /// The timeout pushes the deadline past what the clock can represent.
    Deadline { timeout: Duration },
    /// Failed to spawn the shell.
    Spawn {
        shell: String,
        source: std::io::Error,
    },
    /// Waiting on the child failed.
    Wait { source: std::io::Error },
    /// Sending SIGKILL to the child failed.
    Kill { pid: u32, source: Errno },
}

impl std::fmt::Display for SupervisorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupervisorError::Deadline { timeout } => {
                write!(f, "timeout of {}s is out of range", timeout.as_secs())
            }
            SupervisorError::Spawn { shell, source } => {
                write!(f, "failed to spawn {}: {}", shell, source)
            }
            SupervisorError::Wait { source } => {
                write!(f, "failed to wait for child: {}", source)
            }
            SupervisorError::Kill { pid, source } => {
                write!(f, "failed to kill child {}: {}", pid, source)
            }
        }
    }
}

impl std::error::Error for SupervisorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SupervisorError::Deadline { .. } => None,
            SupervisorError::Spawn { source, .. } => Some(source),
            SupervisorError::Wait { source } => Some(source),
            SupervisorError::Kill { source, .. } => Some(source),
        }
    }
}

/// Runs one command under a deadline.
pub struct Supervisor<C: Clock = SystemClock> {
    shell: String,
    schedule: SleepSchedule,
    clock: C,
}

impl Supervisor {
    pub fn new(shell: impl Into<String>, schedule: SleepSchedule) -> Self {
        Self::with_clock(shell, schedule, SystemClock)
    }
}

impl<C: Clock> Supervisor<C> {
    pub fn with_clock(shell: impl Into<String>, schedule: SleepSchedule, clock: C) -> Self {
        Self {
            shell: shell.into(),
            schedule,
            clock,
        }
    }

    /// Run `command` until it exits or `timeout` elapses, reporting as it goes.
    pub async fn run(
        &self,
        command: &str,
        timeout: Duration,
        reporter: &mut dyn Reporter,
    ) -> Result<ExitOutcome, SupervisorError> {
        let start = self.clock.now();
        let deadline = chrono::TimeDelta::from_std(timeout)
            .ok()
            .and_then(|delta| start.checked_add_signed(delta))
            .ok_or(SupervisorError::Deadline { timeout })?;

        reporter.report(Severity::Info, &format!("Running: {command}"));
        reporter.report(
            Severity::Info,
            &format!("Max runtime {}", format_duration(timeout)),
        );
        reporter.report(
            Severity::Info,
            &format!("Will kill at {} UTC", format_timestamp(deadline)),
        );

        let mut child = self.spawn(command)?;
        let pid = child.id();
        tracing::info!(pid = ?pid, %deadline, "child started");

        let loop_exit = loop {
            let now = self.clock.now();
            if now >= deadline {
                break LoopExit::DeadlineReached;
            }
            let remaining = (deadline - now).to_std().unwrap_or(Duration::ZERO);
            reporter.report(
                Severity::Pending,
                &format!("{} remaining", format_duration(remaining)),
            );

            let quantum = self.schedule.quantum(remaining);
            tracing::debug!(
                remaining_secs = remaining.as_secs(),
                ?quantum,
                "waiting on child"
            );
            match bounded_wait(&mut child, quantum).await? {
                WaitOutcome::Exited(status) => break LoopExit::ChildExited(status),
                WaitOutcome::Running => continue,
            }
        };

        let (status, killed) = match loop_exit {
            LoopExit::ChildExited(status) => (status, false),
            LoopExit::DeadlineReached => {
                reporter.report(Severity::Failure, "Timeout reached... killing child.");
                kill_child(&child)?;
                let status = child
                    .wait()
                    .await
                    .map_err(|e| SupervisorError::Wait { source: e })?;
                (status, true)
            }
        };

        let code = exit_code(status);
        tracing::info!(pid = ?pid, code, killed, "child reaped");
        let severity = if code == 0 {
            Severity::Good
        } else {
            Severity::Failure
        };
        reporter.report(severity, &format!("Child has exited with: {code}"));

        Ok(ExitOutcome { code, killed })
    }

    /// Spawn `<shell> -c <command>`. The child stays in the caller's process
    /// group, so a Ctrl-C or a CI cancel aimed at the group reaches it too.
    fn spawn(&self, command: &str) -> Result<Child, SupervisorError> {
        tracing::debug!(shell = %self.shell, command, "spawning child");
        Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .spawn()
            .map_err(|e| SupervisorError::Spawn {
                shell: self.shell.clone(),
                source: e,
            })
    }
}

/// Wait at most `quantum` for the child to exit.
async fn bounded_wait(child: &mut Child, quantum: Duration) -> Result<WaitOutcome, SupervisorError> {
    match tokio::time::timeout(quantum, child.wait()).await {
        Ok(Ok(status)) => Ok(WaitOutcome::Exited(status)),
        Ok(Err(e)) => Err(SupervisorError::Wait { source: e }),
        Err(_) => Ok(WaitOutcome::Running),
    }
}

/// SIGKILL the child. A child with no pid has already been reaped, so there
/// is nothing left to signal.
fn kill_child(child: &Child) -> Result<(), SupervisorError> {
    let Some(pid) = child.id() else {
        tracing::debug!("child already reaped, skipping kill");
        return Ok(());
    };
    let raw = i32::try_from(pid).map_err(|_| SupervisorError::Kill {
        pid,
        source: Errno::EINVAL,
    })?;
    tracing::warn!(pid, "deadline reached, sending SIGKILL to child");
    match kill(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(SupervisorError::Kill { pid, source: e }),
    }
}

/// Shell convention: a signal death is reported as `128 + signal`.
fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}
