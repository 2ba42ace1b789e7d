use crate::checker::Checker;
use crate::config::SupervisorConfig;
use crate::process::supervised::{Supervised, SupervisedProcess};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Handle returned when a process is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProcessId(u64);

/// Handle returned when a checker is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CheckerId(u64);

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a single polling cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Processes removed because they were no longer running
    pub evicted: Vec<ProcessId>,
    /// Processes restarted because a checker fired
    pub restarted: Vec<ProcessId>,
}

/// Running totals since the supervisor was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SupervisorStats {
    pub cycles: u64,
    pub restarts: u64,
    pub evictions: u64,
}

/// Polls a set of processes against a set of checkers and restarts any
/// process whose metric exceeds a checker's trigger
pub struct Supervisor<P: Supervised = SupervisedProcess> {
    config: SupervisorConfig,
    processes: Vec<(ProcessId, P)>,
    checkers: Vec<(CheckerId, Box<dyn Checker>)>,
    next_id: u64,
    stats: SupervisorStats,
}

impl<P: Supervised> Supervisor<P> {
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            processes: Vec::new(),
            checkers: Vec::new(),
            next_id: 1,
            stats: SupervisorStats::default(),
        }
    }

    /// Create a supervisor with the default one-second poll interval
    pub fn with_defaults() -> Self {
        Self::new(SupervisorConfig::default())
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add_process(&mut self, process: P) -> ProcessId {
        let id = ProcessId(self.allocate_id());
        self.processes.push((id, process));
        id
    }

    pub fn remove_process(&mut self, id: ProcessId) -> Option<P> {
        let index = self.processes.iter().position(|(pid, _)| *pid == id)?;
        Some(self.processes.remove(index).1)
    }

    pub fn add_checker(&mut self, checker: Box<dyn Checker>) -> CheckerId {
        let id = CheckerId(self.allocate_id());
        self.checkers.push((id, checker));
        id
    }

    pub fn remove_checker(&mut self, id: CheckerId) -> Option<Box<dyn Checker>> {
        let index = self.checkers.iter().position(|(cid, _)| *cid == id)?;
        Some(self.checkers.remove(index).1)
    }

    pub fn process(&self, id: ProcessId) -> Option<&P> {
        self.processes
            .iter()
            .find(|(pid, _)| *pid == id)
            .map(|(_, process)| process)
    }

    pub fn processes(&self) -> impl Iterator<Item = (ProcessId, &P)> {
        self.processes.iter().map(|(id, process)| (*id, process))
    }

    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    pub fn checker_count(&self) -> usize {
        self.checkers.len()
    }

    pub fn stats(&self) -> SupervisorStats {
        self.stats
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// The loop refuses to run without at least one process and one checker
    pub fn is_valid(&self) -> bool {
        if self.processes.is_empty() {
            error!("Processes are empty");
            return false;
        }
        if self.checkers.is_empty() {
            error!("Checkers are empty");
            return false;
        }
        true
    }

    /// Start every registered process, then poll until no process is left.
    /// Returns `false` without starting anything when the preflight check fails.
    pub async fn run(&mut self) -> bool {
        if !self.is_valid() {
            return false;
        }

        info!(
            "Starting supervisor with {} process(es) and {} checker(s) (poll interval: {:?})",
            self.processes.len(),
            self.checkers.len(),
            self.config.poll_interval()
        );

        for (id, process) in self.processes.iter_mut() {
            if !process.start().await {
                warn!("Process {} failed to start", id);
            }
        }

        let interval = self.config.poll_interval();
        while self.poll_once().await.is_some() {
            sleep(interval).await;
        }

        info!("No supervised processes left, supervisor exiting");
        true
    }

    /// One polling cycle without the trailing sleep: evict processes that
    /// are gone, re-validate, then evaluate the remaining ones. Returns
    /// `None` when the supervisor is no longer valid.
    pub async fn poll_once(&mut self) -> Option<CycleReport> {
        let mut report = CycleReport {
            evicted: self.evict_stopped(),
            ..CycleReport::default()
        };

        if !self.is_valid() {
            return None;
        }

        for (id, process) in self.processes.iter_mut() {
            if check_process(&mut self.checkers, process).await {
                report.restarted.push(*id);
            }
        }

        self.stats.cycles += 1;
        self.stats.restarts += report.restarted.len() as u64;
        Some(report)
    }

    fn evict_stopped(&mut self) -> Vec<ProcessId> {
        let mut evicted = Vec::new();
        self.processes.retain(|(id, process)| {
            if process.is_running() {
                true
            } else {
                warn!("Removing stopped process {} (PID: {:?})", id, process.pid());
                evicted.push(*id);
                false
            }
        });
        self.stats.evictions += evicted.len() as u64;
        evicted
    }
}

/// Evaluate checkers in order; the first one over its trigger restarts the
/// process and ends evaluation for this cycle
async fn check_process<P: Supervised>(
    checkers: &mut [(CheckerId, Box<dyn Checker>)],
    process: &mut P,
) -> bool {
    let Some(pid) = process.pid() else {
        return false;
    };

    for (_, checker) in checkers.iter_mut() {
        let value = checker.get(pid);
        let trigger = checker.trigger();
        debug!("{} {} {} {}", pid, checker.name(), value, trigger);

        if value > trigger {
            warn!("High load! Restarting process {} ({} {} > {})", pid, checker.name(), value, trigger);
            if !process.restart().await {
                error!("Failed to restart process {}", pid);
            }
            return true;
        }
    }

    false
}

impl<P: Supervised> Default for Supervisor<P> {
    fn default() -> Self {
        Self::with_defaults()
    }
}
