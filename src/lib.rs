// Library exports for the procmon process supervisor

pub mod checker;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod process;
