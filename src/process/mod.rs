// Process module - Supervised process lifecycle and the polling loop

pub mod control;
mod supervised;
mod supervisor;

pub use supervised::{ProcessState, Supervised, SupervisedProcess};
pub use supervisor::{CheckerId, CycleReport, ProcessId, Supervisor, SupervisorStats};
