// CLI module - User-facing command-line interface

mod output;

use crate::checker::{CpuChecker, MemoryChecker, ProcFs};
use crate::config::{Job, SupervisorConfig};
use crate::error::{ProcmonError, Result};
use crate::logging;
use crate::process::{SupervisedProcess, Supervisor};
use clap::{ArgAction, Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

/// procmon - restart a process when it misbehaves
#[derive(Parser)]
#[command(name = "procmon")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a program and restart it when it exceeds a threshold
    Run {
        /// Executable to run, a path or a name looked up on PATH
        program: PathBuf,

        /// Restart when CPU usage exceeds this percentage of one core
        #[arg(long)]
        cpu: Option<i64>,

        /// Restart when resident memory exceeds this size (e.g. 512M, 2G)
        #[arg(long, value_parser = parse_size)]
        memory: Option<u64>,

        /// Number of copies to supervise
        #[arg(short, long, default_value = "1")]
        instances: usize,

        /// Working directory for the process
        #[arg(short, long)]
        cwd: Option<PathBuf>,

        /// Environment variables (KEY=VALUE format)
        #[arg(short, long)]
        env: Vec<String>,

        /// Signal sent when stopping the process
        #[arg(long, default_value = "SIGTERM")]
        stop_signal: String,

        /// Milliseconds between polling cycles
        #[arg(long, default_value = "1000")]
        interval_ms: u64,

        /// Arguments to pass to the program
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Show the parsed kernel statistics for a process
    Stat {
        /// Process ID to inspect
        pid: u32,

        /// Print the full record as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Run the CLI application
    pub async fn run() -> Result<()> {
        let cli = Cli::parse();
        logging::init(cli.verbose);
        cli.execute().await
    }

    async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Run {
                program,
                cpu,
                memory,
                instances,
                cwd,
                env,
                stop_signal,
                interval_ms,
                args,
            } => {
                if *instances == 0 {
                    return Err(ProcmonError::ConfigValidationError(
                        "instances must be at least 1".to_string(),
                    ));
                }

                let mut job = Job::new(program.clone())
                    .args(args.iter().cloned())
                    .stop_signal(stop_signal.clone());
                job.env = parse_env_vars(env)?;
                job.cwd = cwd.clone();
                job.validate()?;

                let config = SupervisorConfig {
                    poll_interval_ms: *interval_ms,
                };
                let mut supervisor = build_supervisor(config, &job, *instances, *cpu, *memory)?;

                output::print_info(&format!(
                    "Supervising {} instance(s) of {}",
                    instances,
                    program.display()
                ));

                let started = Instant::now();
                if !supervisor.run().await {
                    let message = "supervisor refused to start (pass --cpu and/or --memory)";
                    output::print_error(message);
                    return Err(ProcmonError::ConfigError(message.to_string()));
                }

                output::print_summary(&supervisor.stats(), started.elapsed());
                Ok(())
            }

            Commands::Stat { pid, json } => {
                let stat = ProcFs::new().read_stats(*pid)?;
                if *json {
                    output::print_stat_json(&stat)
                } else {
                    output::print_stat(&stat, MemoryChecker::new(0).page_size());
                    Ok(())
                }
            }
        }
    }
}

/// Wire one supervised process per instance and one checker per threshold.
/// The CPU checker's refresh period tracks the poll interval.
fn build_supervisor(
    config: SupervisorConfig,
    job: &Job,
    instances: usize,
    cpu: Option<i64>,
    memory: Option<u64>,
) -> Result<Supervisor> {
    // A CPU checker keeps one sample history for every pid it sees
    if cpu.is_some() && instances > 1 {
        return Err(ProcmonError::ConfigValidationError(
            "--cpu supports a single instance; its sample history would mix processes".to_string(),
        ));
    }

    let poll_interval_ms = config.poll_interval_ms;
    let mut supervisor = Supervisor::new(config);

    for _ in 0..instances {
        supervisor.add_process(SupervisedProcess::new(job.clone()));
    }

    if let Some(trigger) = cpu {
        supervisor.add_checker(Box::new(
            CpuChecker::new(trigger).with_refresh_period(poll_interval_ms),
        ));
    }

    if let Some(trigger) = memory {
        let trigger = i64::try_from(trigger).unwrap_or(i64::MAX);
        supervisor.add_checker(Box::new(MemoryChecker::new(trigger)));
    }

    Ok(supervisor)
}

/// Parse environment variables from KEY=VALUE format
fn parse_env_vars(env_vars: &[String]) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();

    for env_str in env_vars {
        if let Some((key, value)) = env_str.split_once('=') {
            map.insert(key.to_string(), value.to_string());
        } else {
            return Err(ProcmonError::ConfigError(format!(
                "Invalid environment variable format: '{}'. Expected KEY=VALUE",
                env_str
            )));
        }
    }

    Ok(map)
}

/// Parse a byte count with an optional binary K/M/G suffix
fn parse_size(input: &str) -> std::result::Result<u64, String> {
    let trimmed = input.trim();
    let upper = trimmed.to_ascii_uppercase();
    let without_b = upper.strip_suffix('B').unwrap_or(&upper);

    let (digits, multiplier) = match without_b.chars().last() {
        Some('K') => (&without_b[..without_b.len() - 1], 1024),
        Some('M') => (&without_b[..without_b.len() - 1], 1024 * 1024),
        Some('G') => (&without_b[..without_b.len() - 1], 1024 * 1024 * 1024),
        _ => (without_b, 1),
    };

    let value: u64 = digits
        .trim()
        .parse()
        .map_err(|_| format!("invalid size '{}'", input))?;

    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size '{}' is too large", input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_vars() {
        let env_vars = vec!["APP_ENV=production".to_string(), "PORT=3000".to_string()];
        let result = parse_env_vars(&env_vars).unwrap();
        assert_eq!(result.get("APP_ENV"), Some(&"production".to_string()));
        assert_eq!(result.get("PORT"), Some(&"3000".to_string()));
    }

    #[test]
    fn test_parse_env_vars_invalid() {
        let env_vars = vec!["INVALID".to_string()];
        assert!(parse_env_vars(&env_vars).is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4096"), Ok(4096));
        assert_eq!(parse_size("512K"), Ok(512 * 1024));
        assert_eq!(parse_size("64m"), Ok(64 * 1024 * 1024));
        assert_eq!(parse_size("2GB"), Ok(2 * 1024 * 1024 * 1024));
        assert!(parse_size("lots").is_err());
        assert!(parse_size("").is_err());
    }

    #[test]
    fn test_build_supervisor_wires_checkers() {
        let job = Job::new("/bin/sleep").arg("10");
        let supervisor =
            build_supervisor(SupervisorConfig::default(), &job, 1, Some(80), Some(1024)).unwrap();
        assert_eq!(supervisor.process_count(), 1);
        assert_eq!(supervisor.checker_count(), 2);
        assert!(supervisor.is_valid());

        let supervisor =
            build_supervisor(SupervisorConfig::default(), &job, 3, None, Some(1024)).unwrap();
        assert_eq!(supervisor.process_count(), 3);
        assert_eq!(supervisor.checker_count(), 1);

        let supervisor = build_supervisor(SupervisorConfig::default(), &job, 1, None, None).unwrap();
        assert!(!supervisor.is_valid());
    }

    #[test]
    fn test_build_supervisor_rejects_cpu_with_many_instances() {
        let job = Job::new("/bin/sleep").arg("10");
        let result = build_supervisor(SupervisorConfig::default(), &job, 2, Some(80), None);
        assert!(matches!(result, Err(ProcmonError::ConfigValidationError(_))));
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "procmon", "-v", "run", "--cpu", "80", "--memory", "256M", "-i", "2", "/bin/sleep", "--",
            "30",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run {
                cpu,
                memory,
                instances,
                args,
                ..
            } => {
                assert_eq!(cpu, Some(80));
                assert_eq!(memory, Some(256 * 1024 * 1024));
                assert_eq!(instances, 2);
                assert_eq!(args, vec!["30"]);
            }
            _ => panic!("Expected Run"),
        }
    }
}
