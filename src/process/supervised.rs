use crate::config::Job;
use crate::process::control::{self, DetachedChild};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    #[default]
    Unstarted,
    Running,
    Stopped,
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessState::Unstarted => write!(f, "unstarted"),
            ProcessState::Running => write!(f, "running"),
            ProcessState::Stopped => write!(f, "stopped"),
        }
    }
}

/// What the supervisor loop needs from a process it watches
#[allow(async_fn_in_trait)]
pub trait Supervised {
    /// OS identifier of the current incarnation, if one was ever started
    fn pid(&self) -> Option<u32>;

    /// Whether the OS still knows the current pid
    fn is_running(&self) -> bool;

    async fn start(&mut self) -> bool;

    async fn stop(&mut self);

    async fn restart(&mut self) -> bool;
}

/// A child process that can be started, stopped and restarted with the same job
#[derive(Debug, Default)]
pub struct SupervisedProcess {
    job: Option<Job>,
    pid: Option<u32>,
    child: Option<DetachedChild>,
    state: ProcessState,
    restarts: usize,
    started_at: Option<SystemTime>,
}

impl SupervisedProcess {
    pub fn new(job: Job) -> Self {
        Self {
            job: Some(job),
            ..Self::default()
        }
    }

    /// A process with no job; it refuses to start
    pub fn unset() -> Self {
        Self::default()
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    /// Last lifecycle transition performed through this wrapper
    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn restarts(&self) -> usize {
        self.restarts
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    /// Preflight check before `start`
    pub fn is_valid(&self) -> bool {
        if self.is_running() {
            error!("Process {:?} is already running", self.pid);
            return false;
        }

        let Some(ref job) = self.job else {
            error!("Job is not set");
            return false;
        };

        if let Err(e) = job.validate() {
            error!("Job for {} is not valid: {}", job.program.display(), e);
            return false;
        }

        true
    }
}

impl Supervised for SupervisedProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn is_running(&self) -> bool {
        self.pid.is_some_and(control::is_alive)
    }

    async fn start(&mut self) -> bool {
        if !self.is_valid() {
            return false;
        }
        let Some(ref job) = self.job else {
            return false;
        };

        match control::spawn_detached(job) {
            Ok(child) => {
                info!("Started {} (PID: {})", job.program.display(), child.pid);
                self.pid = Some(child.pid);
                self.child = Some(child);
                self.state = ProcessState::Running;
                self.started_at = Some(SystemTime::now());
                true
            }
            Err(e) => {
                error!("Failed to start {}: {}", job.program.display(), e);
                false
            }
        }
    }

    async fn stop(&mut self) {
        let Some(child) = self.child.take() else {
            debug!("Stop requested but no child is tracked (PID: {:?})", self.pid);
            return;
        };

        info!("Stopping process (PID: {})", child.pid);

        // Once reaped the pid may belong to someone else
        if !child.is_reaped() {
            let signal_name = self
                .job
                .as_ref()
                .map(|job| job.stop_signal.as_str())
                .unwrap_or("SIGTERM");
            match control::parse_signal(signal_name) {
                Ok(signal) => {
                    if let Err(e) = control::send_signal(child.pid, signal) {
                        debug!("Ignoring stop signal failure: {}", e);
                    }
                }
                Err(e) => error!("{}", e),
            }
        }

        match child.wait().await {
            Ok(status) => debug!("Process exited with {}", status),
            Err(e) => debug!("Ignoring wait failure: {}", e),
        }

        self.state = ProcessState::Stopped;
    }

    async fn restart(&mut self) -> bool {
        self.stop().await;
        let started = self.start().await;
        if started {
            self.restarts += 1;
        }
        started
    }
}
