use crate::checker::stat::ProcFs;
use crate::checker::Checker;
use crate::error::{ProcmonError, Result};
use tracing::debug;

const FALLBACK_PAGE_SIZE: i64 = 4096;

#[cfg(unix)]
fn system_page_size() -> i64 {
    use nix::unistd::{sysconf, SysconfVar};

    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(size)) if size > 0 => size as i64,
        _ => FALLBACK_PAGE_SIZE,
    }
}

#[cfg(not(unix))]
fn system_page_size() -> i64 {
    FALLBACK_PAGE_SIZE
}

/// Resident memory in bytes
#[derive(Debug, Clone)]
pub struct MemoryChecker {
    trigger: i64,
    page_size: i64,
    source: ProcFs,
}

impl MemoryChecker {
    pub fn new(trigger: i64) -> Self {
        Self::with_source(trigger, ProcFs::new())
    }

    pub fn with_source(trigger: i64, source: ProcFs) -> Self {
        Self {
            trigger,
            page_size: system_page_size(),
            source,
        }
    }

    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    fn sample(&self, pid: u32) -> Result<i64> {
        let stat = self.source.read_stats(pid)?;
        stat.rss.checked_mul(self.page_size).ok_or_else(|| {
            ProcmonError::StatParse(format!("rss out of range for pid {}", pid))
        })
    }
}

impl Checker for MemoryChecker {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&mut self, pid: u32) -> i64 {
        match self.sample(pid) {
            Ok(value) => value,
            Err(e) => {
                debug!("Memory sample for pid {} failed: {}", pid, e);
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

    #[test]
    fn test_rss_in_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("55");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("stat"),
            "55 (mem hog) S 1 55 55 0 -1 0 0 0 0 0 1 1 0 0 20 0 1 0 100 4096 250\n",
        )
        .unwrap();

        let mut checker =
            MemoryChecker::with_source(1024, ProcFs::with_root(temp_dir.path())).with_page_size(4096);
        assert_eq!(checker.get(55), 250 * 4096);
    }

    #[test]
    fn test_oversized_rss_yields_zero() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("56");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("stat"),
            format!(
                "56 (hog) S 1 56 56 0 -1 0 0 0 0 0 1 1 0 0 20 0 1 0 100 4096 {}\n",
                i64::MAX
            ),
        )
        .unwrap();

        let mut checker =
            MemoryChecker::with_source(1024, ProcFs::with_root(temp_dir.path())).with_page_size(4096);
        assert_eq!(checker.get(56), 0);
    }

    #[test]
    fn test_missing_process_yields_zero() {
        let temp_dir = TempDir::new().unwrap();
        let mut checker = MemoryChecker::with_source(1024, ProcFs::with_root(temp_dir.path()));
        assert_eq!(checker.get(31337), 0);
    }

    #[test]
    fn test_page_size_is_positive() {
        let checker = MemoryChecker::new(0);
        assert!(checker.page_size() > 0);
        assert_eq!(checker.name(), "memory");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_reads_own_process() {
        let mut checker = MemoryChecker::new(0);
        assert!(checker.get(std::process::id()) > 0);
    }
}
