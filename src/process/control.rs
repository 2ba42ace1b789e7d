use crate::config::Job;
use crate::error::{ProcmonError, Result};
use nix::sys::signal::{self, Signal};
use nix::unistd::{getpgid, Pid};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::debug;

/// A spawned child whose exit is collected by a background reaper task,
/// so it never lingers as a zombie even if nobody waits for it
#[derive(Debug)]
pub struct DetachedChild {
    /// Process ID assigned by the OS
    pub pid: u32,
    reaper: JoinHandle<std::io::Result<ExitStatus>>,
}

impl DetachedChild {
    /// Whether the reaper has already collected the exit status
    pub fn is_reaped(&self) -> bool {
        self.reaper.is_finished()
    }

    /// Block until the child has exited and been reaped
    pub async fn wait(self) -> Result<ExitStatus> {
        match self.reaper.await {
            Ok(status) => Ok(status?),
            Err(e) => Err(ProcmonError::Other(format!(
                "Reaper for pid {} failed: {}",
                self.pid, e
            ))),
        }
    }
}

/// Spawn the job as a new OS process and hand its exit to a reaper task.
/// Must be called from within a tokio runtime.
pub fn spawn_detached(job: &Job) -> Result<DetachedChild> {
    let job = job.expanded();

    let mut command = Command::new(&job.program);
    command.args(&job.args);
    if let Some(ref cwd) = job.cwd {
        command.current_dir(cwd);
    }
    command.envs(&job.env);
    command.stdin(Stdio::null());

    let mut child = command.spawn().map_err(|e| {
        ProcmonError::SpawnError(format!(
            "Failed to spawn '{}': {}",
            job.program.display(),
            e
        ))
    })?;

    let pid = child.id().ok_or_else(|| {
        ProcmonError::SpawnError(format!(
            "Failed to get PID for '{}'",
            job.program.display()
        ))
    })?;

    let reaper = tokio::spawn(async move {
        let status = child.wait().await;
        debug!("Reaped pid {}: {:?}", pid, status);
        status
    });

    Ok(DetachedChild { pid, reaper })
}

/// Send `signal` to `pid`
pub fn send_signal(pid: u32, signal: Signal) -> Result<()> {
    signal::kill(Pid::from_raw(pid as i32), signal)
        .map_err(|e| ProcmonError::SignalError(format!("Failed to send {} to {}: {}", signal, pid, e)))
}

/// Whether `pid` names a live process. Any lookup failure counts as not alive.
pub fn is_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    getpgid(Some(Pid::from_raw(pid as i32))).is_ok()
}

pub fn parse_signal(signal_name: &str) -> Result<Signal> {
    match signal_name {
        "SIGTERM" => Ok(Signal::SIGTERM),
        "SIGINT" => Ok(Signal::SIGINT),
        "SIGQUIT" => Ok(Signal::SIGQUIT),
        "SIGKILL" => Ok(Signal::SIGKILL),
        "SIGHUP" => Ok(Signal::SIGHUP),
        "SIGUSR1" => Ok(Signal::SIGUSR1),
        "SIGUSR2" => Ok(Signal::SIGUSR2),
        _ => Err(ProcmonError::SignalError(format!(
            "Invalid signal name: {}",
            signal_name
        ))),
    }
}
