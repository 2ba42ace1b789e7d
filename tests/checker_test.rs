use procmon::checker::{Checker, CpuChecker, MemoryChecker, ProcFs};
use procmon::config::Job;
use procmon::process::{Supervised, SupervisedProcess};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_get_never_fails_for_unknown_pids() {
    let mut checkers: Vec<Box<dyn Checker>> =
        vec![Box::new(CpuChecker::new(80)), Box::new(MemoryChecker::new(1024))];

    for checker in checkers.iter_mut() {
        for pid in [0, 1 << 30, u32::MAX] {
            assert_eq!(checker.get(pid), 0, "{} checker for pid {}", checker.name(), pid);
        }
    }
}

#[test]
fn test_shared_timeline_mixes_processes() {
    let temp_dir = TempDir::new().unwrap();
    for (pid, ticks) in [(100u32, 10u64), (200, 60)] {
        let dir = temp_dir.path().join(pid.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("stat"),
            format!(
                "{} (p) S 1 1 1 0 -1 0 0 0 0 0 {} 0 0 0 20 0 1 0 1 1 1",
                pid, ticks
            ),
        )
        .unwrap();
    }

    let mut checker = CpuChecker::with_source(80, ProcFs::with_root(temp_dir.path()));
    assert_eq!(checker.get(100), 0);
    // Second pid is differenced against the first pid's sample
    assert_eq!(checker.get(200), 50);
}

#[tokio::test]
async fn test_checkers_sample_live_process() {
    let mut process = SupervisedProcess::new(Job::new("/bin/sleep").arg("30"));
    assert!(process.start().await);
    let pid = process.pid().unwrap();

    let mut memory = MemoryChecker::new(0);
    assert!(memory.get(pid) > 0);

    let mut cpu = CpuChecker::new(80);
    assert_eq!(cpu.get(pid), 0);
    assert!(cpu.get(pid) >= 0);

    process.stop().await;
    assert_eq!(memory.get(pid), 0);
}
