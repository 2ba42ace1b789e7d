use crate::error::{ProcmonError, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_PROC_ROOT: &str = "/proc";

/// One parsed `/proc/<pid>/stat` record, fields in kernel order.
/// `num_threads` is read past but not kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcStat {
    pub pid: u32,
    pub comm: String,
    pub state: String,
    pub ppid: i32,
    pub pgrp: i32,
    pub session: i32,
    pub tty_nr: i32,
    pub tpgid: i32,
    pub flags: u64,
    pub minflt: u64,
    pub cminflt: u64,
    pub majflt: u64,
    pub cmajflt: u64,
    /// User-mode ticks since process start
    pub utime: u64,
    /// Kernel-mode ticks since process start
    pub stime: u64,
    pub cutime: i64,
    pub cstime: i64,
    pub priority: i64,
    pub nice: i64,
    pub itrealvalue: i64,
    pub starttime: u64,
    pub vsize: u64,
    /// Resident set size, in pages
    pub rss: i64,
    pub rsslim: u64,
    pub startcode: u64,
    pub endcode: u64,
    pub startstack: u64,
    pub kstkesp: u64,
    pub kstkeip: u64,
    pub signal: u64,
    pub blocked: u64,
    pub sigignore: u64,
    pub sigcatch: u64,
    pub wchan: u64,
    pub nswap: u64,
    pub cnswap: u64,
    pub exit_signal: i32,
    pub processor: i32,
    pub rt_priority: u32,
    pub policy: u32,
}

impl ProcStat {
    /// Total CPU ticks consumed (user + kernel), `None` on overflow
    pub fn cputime(&self) -> Option<u64> {
        self.utime.checked_add(self.stime)
    }

    /// Parse the textual content of a stat file
    pub fn parse(content: &str) -> Result<Self> {
        let tokens = tokenize(content);
        let mut fields = Fields {
            tokens: tokens.into_iter(),
        };

        let pid = fields.required("pid")?;
        let comm = fields.next_token("comm")?;
        if !comm.starts_with('(') {
            return Err(ProcmonError::StatParse(format!(
                "expected parenthesized comm, found '{}'",
                comm
            )));
        }
        let comm = comm[1..comm.len() - 1].to_string();
        let state = fields.next_token("state")?.to_string();

        Ok(ProcStat {
            pid,
            comm,
            state,
            ppid: fields.required("ppid")?,
            pgrp: fields.required("pgrp")?,
            session: fields.required("session")?,
            tty_nr: fields.required("tty_nr")?,
            tpgid: fields.required("tpgid")?,
            flags: fields.required("flags")?,
            minflt: fields.required("minflt")?,
            cminflt: fields.required("cminflt")?,
            majflt: fields.required("majflt")?,
            cmajflt: fields.required("cmajflt")?,
            utime: fields.required("utime")?,
            stime: fields.required("stime")?,
            cutime: fields.required("cutime")?,
            cstime: fields.required("cstime")?,
            priority: fields.required("priority")?,
            nice: fields.required("nice")?,
            itrealvalue: {
                fields.next_token("num_threads")?;
                fields.required("itrealvalue")?
            },
            starttime: fields.required("starttime")?,
            vsize: fields.required("vsize")?,
            rss: fields.required("rss")?,
            rsslim: fields.optional("rsslim")?,
            startcode: fields.optional("startcode")?,
            endcode: fields.optional("endcode")?,
            startstack: fields.optional("startstack")?,
            kstkesp: fields.optional("kstkesp")?,
            kstkeip: fields.optional("kstkeip")?,
            signal: fields.optional("signal")?,
            blocked: fields.optional("blocked")?,
            sigignore: fields.optional("sigignore")?,
            sigcatch: fields.optional("sigcatch")?,
            wchan: fields.optional("wchan")?,
            nswap: fields.optional("nswap")?,
            cnswap: fields.optional("cnswap")?,
            exit_signal: fields.optional("exit_signal")?,
            processor: fields.optional("processor")?,
            rt_priority: fields.optional("rt_priority")?,
            policy: fields.optional("policy")?,
        })
    }
}

struct Fields<'a> {
    tokens: std::vec::IntoIter<&'a str>,
}

impl<'a> Fields<'a> {
    fn next_token(&mut self, name: &str) -> Result<&'a str> {
        self.tokens
            .next()
            .ok_or_else(|| ProcmonError::StatParse(format!("missing field '{}'", name)))
    }

    fn required<T: FromStr>(&mut self, name: &str) -> Result<T> {
        let token = self.next_token(name)?;
        parse_token(token, name)
    }

    /// Trailing fields some kernels omit; absent means zero
    fn optional<T: FromStr + Default>(&mut self, name: &str) -> Result<T> {
        match self.tokens.next() {
            Some(token) => parse_token(token, name),
            None => Ok(T::default()),
        }
    }
}

fn parse_token<T: FromStr>(token: &str, name: &str) -> Result<T> {
    token.parse().map_err(|_| {
        ProcmonError::StatParse(format!("invalid value '{}' for field '{}'", token, name))
    })
}

fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Split a stat record into tokens. A token is either the parenthesized
/// comm group, which runs to the last `)` in the record and may contain
/// anything, or a run of word characters with an optional leading `-`.
fn tokenize(content: &str) -> Vec<&str> {
    let bytes = content.as_bytes();
    let comm_end = content.rfind(')');
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'(' {
            match comm_end {
                Some(end) if end > i => {
                    tokens.push(&content[i..=end]);
                    i = end + 1;
                }
                _ => i += 1,
            }
        } else if is_word(b) || (b == b'-' && bytes.get(i + 1).copied().is_some_and(is_word)) {
            let start = i;
            i += 1;
            while i < bytes.len() && is_word(bytes[i]) {
                i += 1;
            }
            tokens.push(&content[start..i]);
        } else {
            i += 1;
        }
    }

    tokens
}

/// Reader for the kernel's per-process statistics pseudo-files
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    /// Read from the live `/proc`
    pub fn new() -> Self {
        Self::with_root(DEFAULT_PROC_ROOT)
    }

    /// Read from an alternative root laid out like `/proc`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn stat_path(&self, pid: u32) -> PathBuf {
        self.root.join(pid.to_string()).join("stat")
    }

    pub fn read_stats(&self, pid: u32) -> Result<ProcStat> {
        // comm may hold arbitrary bytes
        let raw = fs::read(self.stat_path(pid))
            .map_err(|source| ProcmonError::StatRead { pid, source })?;
        ProcStat::parse(&String::from_utf8_lossy(&raw))
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new()
    }
}
