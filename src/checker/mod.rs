// Checker module - Resource sampling and threshold evaluation

mod cpu;
mod memory;
pub mod stat;
mod timeline;

pub use cpu::CpuChecker;
pub use memory::MemoryChecker;
pub use stat::{ProcFs, ProcStat};
pub use timeline::Timeline;

/// Samples kept by a checker's timeline
pub const TIMELINE_SIZE: usize = 5;

/// A resource metric evaluated against a trigger threshold.
///
/// `get` must never fail: any problem reading or parsing the process
/// statistics yields `0` so one bad sample never destabilizes the loop.
pub trait Checker: Send {
    /// Short name used in log lines
    fn name(&self) -> &str;

    /// Current metric value for `pid`
    fn get(&mut self, pid: u32) -> i64;

    /// Metric value above which the process is restarted
    fn trigger(&self) -> i64;
}
