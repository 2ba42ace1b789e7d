use crate::checker::stat::ProcFs;
use crate::checker::{Checker, Timeline, TIMELINE_SIZE};
use crate::error::{ProcmonError, Result};
use tracing::debug;

/// Milliseconds per scheduling tick (1/100 s)
const TICK_MS: i64 = 10;

/// Default expected gap between samples, matching the supervisor's 1 s poll
const DEFAULT_REFRESH_PERIOD_MS: i64 = 1000;

/// CPU usage as an integer percentage of one core since the previous sample.
///
/// The timeline is shared by every pid this checker is asked about, so
/// applying one instance to several processes mixes their samples.
#[derive(Debug, Clone)]
pub struct CpuChecker {
    trigger: i64,
    refresh_period_ms: i64,
    timeline: Timeline,
    source: ProcFs,
}

impl CpuChecker {
    pub fn new(trigger: i64) -> Self {
        Self::with_source(trigger, ProcFs::new())
    }

    pub fn with_source(trigger: i64, source: ProcFs) -> Self {
        Self {
            trigger,
            refresh_period_ms: DEFAULT_REFRESH_PERIOD_MS,
            timeline: Timeline::new(TIMELINE_SIZE),
            source,
        }
    }

    /// Must equal the supervisor's poll interval for the percentage to be right
    pub fn with_refresh_period(mut self, refresh_period_ms: u64) -> Self {
        self.refresh_period_ms = refresh_period_ms.max(1) as i64;
        self
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    fn sample(&mut self, pid: u32) -> Result<i64> {
        let stat = self.source.read_stats(pid)?;
        let cputime_ms = stat
            .cputime()
            .and_then(|ticks| i64::try_from(ticks).ok())
            .and_then(|ticks| ticks.checked_mul(TICK_MS))
            .ok_or_else(|| overflow(pid, "cputime"))?;
        self.timeline.push(cputime_ms);

        match (self.timeline.back(1), self.timeline.back(2)) {
            (Some(latest), Some(previous)) => latest
                .checked_sub(previous)
                .and_then(|delta| delta.checked_mul(100))
                .map(|scaled| scaled / self.refresh_period_ms)
                .ok_or_else(|| overflow(pid, "cpu delta")),
            _ => Ok(0),
        }
    }
}

fn overflow(pid: u32, what: &str) -> ProcmonError {
    ProcmonError::StatParse(format!("{} out of range for pid {}", what, pid))
}

impl Checker for CpuChecker {
    fn name(&self) -> &str {
        "cpu"
    }

    fn get(&mut self, pid: u32) -> i64 {
        match self.sample(pid) {
            Ok(value) => value,
            Err(e) => {
                debug!("CPU sample for pid {} failed: {}", pid, e);
                0
            }
        }
    }

    fn trigger(&self) -> i64 {
        self.trigger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_stat(root: &std::path::Path, pid: u32, utime: u64, stime: u64) {
        let dir = root.join(pid.to_string());
        fs::create_dir_all(&dir).unwrap();
        let content = format!(
            "{} (worker) R 1 {} {} 0 -1 0 0 0 0 0 {} {} 0 0 20 0 1 0 100 4096 10\n",
            pid, pid, pid, utime, stime
        );
        fs::write(dir.join("stat"), content).unwrap();
    }

    #[test]
    fn test_successive_samples() {
        let temp_dir = TempDir::new().unwrap();
        let mut checker = CpuChecker::with_source(80, ProcFs::with_root(temp_dir.path()));

        let mut results = Vec::new();
        for cputime in [0, 25, 100, 100] {
            write_stat(temp_dir.path(), 7, cputime, 0);
            results.push(checker.get(7));
        }

        assert_eq!(results, vec![0, 25, 75, 0]);
    }

    #[test]
    fn test_cputime_sums_user_and_kernel() {
        let temp_dir = TempDir::new().unwrap();
        let mut checker = CpuChecker::with_source(80, ProcFs::with_root(temp_dir.path()));

        write_stat(temp_dir.path(), 7, 10, 10);
        assert_eq!(checker.get(7), 0);
        write_stat(temp_dir.path(), 7, 50, 20);
        assert_eq!(checker.get(7), 50);
    }

    #[test]
    fn test_refresh_period_scales_percentage() {
        let temp_dir = TempDir::new().unwrap();
        let mut checker = CpuChecker::with_source(80, ProcFs::with_root(temp_dir.path()))
            .with_refresh_period(500);

        write_stat(temp_dir.path(), 7, 0, 0);
        checker.get(7);
        write_stat(temp_dir.path(), 7, 25, 0);
        assert_eq!(checker.get(7), 50);
    }

    #[test]
    fn test_missing_process_yields_zero() {
        let temp_dir = TempDir::new().unwrap();
        let mut checker = CpuChecker::with_source(80, ProcFs::with_root(temp_dir.path()));

        assert_eq!(checker.get(4242), 0);
        assert!(checker.timeline().is_empty());
    }

    #[test]
    fn test_malformed_stat_yields_zero() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("9");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stat"), "garbage").unwrap();

        let mut checker = CpuChecker::with_source(80, ProcFs::with_root(temp_dir.path()));
        assert_eq!(checker.get(9), 0);
    }

    #[test]
    fn test_oversized_counters_yield_zero() {
        let temp_dir = TempDir::new().unwrap();
        let mut checker = CpuChecker::with_source(80, ProcFs::with_root(temp_dir.path()));

        write_stat(temp_dir.path(), 7, u64::MAX, 1);
        assert_eq!(checker.get(7), 0);

        write_stat(temp_dir.path(), 7, i64::MAX as u64, 0);
        assert_eq!(checker.get(7), 0);
        assert!(checker.timeline().is_empty());
    }

    #[test]
    fn test_oversized_delta_yields_zero() {
        let temp_dir = TempDir::new().unwrap();
        let mut checker = CpuChecker::with_source(80, ProcFs::with_root(temp_dir.path()));

        write_stat(temp_dir.path(), 7, 0, 0);
        assert_eq!(checker.get(7), 0);
        // Fits after scaling to ms, overflows once multiplied by 100
        write_stat(temp_dir.path(), 7, (i64::MAX / 20) as u64, 0);
        assert_eq!(checker.get(7), 0);
    }

    #[test]
    fn test_timeline_is_bounded() {
        let temp_dir = TempDir::new().unwrap();
        let mut checker = CpuChecker::with_source(80, ProcFs::with_root(temp_dir.path()));

        for cputime in 0..12 {
            write_stat(temp_dir.path(), 7, cputime, 0);
            checker.get(7);
        }
        assert_eq!(checker.timeline().len(), TIMELINE_SIZE);
    }

    #[test]
    fn test_trigger_and_name() {
        let checker = CpuChecker::new(80);
        assert_eq!(checker.trigger(), 80);
        assert_eq!(checker.name(), "cpu");
    }
}
