// Output formatting and display for CLI

use crate::checker::ProcStat;
use crate::error::{ProcmonError, Result};
use crate::process::SupervisorStats;
use colored::*;
use std::time::Duration;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn row(field: &str, value: impl ToString) -> Row {
    Row {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn print_rows(rows: Vec<Row>) {
    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    println!("\n{}\n", table);
}

/// Print an error message to stderr
pub fn print_error(error: &str) {
    eprintln!("{} {}", "✗ Error:".red().bold(), error);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a success message
pub fn print_success_msg(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print the totals collected while the supervisor ran
pub fn print_summary(stats: &SupervisorStats, elapsed: Duration) {
    print_success_msg("All supervised processes have exited");
    print_rows(vec![
        row("Ran for", format_duration(&elapsed)),
        row("Cycles", stats.cycles),
        row("Restarts", stats.restarts),
        row("Evictions", stats.evictions),
    ]);
}

/// Print the interesting fields of a statistics record
pub fn print_stat(stat: &ProcStat, page_size: i64) {
    let rss_bytes = stat
        .rss
        .checked_mul(page_size)
        .and_then(|bytes| u64::try_from(bytes).ok())
        .unwrap_or(0);
    let cpu_ticks = stat
        .cputime()
        .map_or_else(|| "-".to_string(), |ticks| ticks.to_string());

    println!("{} {}", "Process".bold(), stat.comm.cyan());
    print_rows(vec![
        row("PID", stat.pid),
        row("State", format_state_colored(&stat.state)),
        row("Parent PID", stat.ppid),
        row("Priority", format!("{} (nice {})", stat.priority, stat.nice)),
        row("User ticks", stat.utime),
        row("System ticks", stat.stime),
        row("CPU ticks", cpu_ticks),
        row("Virtual memory", format_memory(stat.vsize)),
        row("Resident memory", format!("{} ({} pages)", format_memory(rss_bytes), stat.rss)),
        row("Processor", stat.processor),
    ]);
}

/// Print the whole statistics record as pretty JSON
pub fn print_stat_json(stat: &ProcStat) -> Result<()> {
    let json = serde_json::to_string_pretty(stat)
        .map_err(|e| ProcmonError::SerializationError(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

/// Color the kernel's one-letter process state
fn format_state_colored(state: &str) -> String {
    match state {
        "R" => state.green().to_string(),
        "S" | "I" => state.normal().to_string(),
        "D" => state.yellow().to_string(),
        "Z" | "X" => state.red().bold().to_string(),
        _ => state.bright_black().to_string(),
    }
}

/// Format a duration in human-readable format
fn format_duration(duration: &Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        let mins = secs / 60;
        let secs = secs % 60;
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    }
}

/// Format memory usage in human-readable format
fn format_memory(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{}B", bytes)
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2}GB", bytes as f64 / GB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(&Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(&Duration::from_secs(120)), "2m");
        assert_eq!(format_duration(&Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(&Duration::from_secs(3700)), "1h 1m");
    }

    #[test]
    fn test_format_memory() {
        assert_eq!(format_memory(512), "512B");
        assert_eq!(format_memory(2048), "2.0KB");
        assert_eq!(format_memory(2 * 1024 * 1024), "2.0MB");
        assert_eq!(format_memory(3 * 1024 * 1024 * 1024), "3.00GB");
    }
}
