//! Memory probes used to measure the memory delta of a unit of work
//!
//! Rust has no runtime heap counter, so the default probe samples the
//! process's resident set size from procfs. Callers with a counting
//! allocator can plug in their own [`MemoryProbe`].

use std::path::PathBuf;

/// Source of current memory usage in bytes
pub trait MemoryProbe: Send + Sync {
    /// Current usage, or `None` if it cannot be read
    fn current_bytes(&self) -> Option<u64>;
}

/// Reads resident set size from `/proc/self/status`
#[derive(Debug, Clone)]
pub struct ProcessMemoryProbe {
    status_path: PathBuf,
}

impl ProcessMemoryProbe {
    pub fn new() -> Self {
        Self {
            status_path: PathBuf::from("/proc/self/status"),
        }
    }

    /// Read from an alternative status file (used by tests)
    pub fn with_status_path(path: impl Into<PathBuf>) -> Self {
        Self {
            status_path: path.into(),
        }
    }
}

impl Default for ProcessMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn current_bytes(&self) -> Option<u64> {
        let content = std::fs::read_to_string(&self.status_path).ok()?;
        parse_vm_rss(&content)
    }
}

/// Parse the `VmRSS:` line of a procfs status file into bytes
fn parse_vm_rss(content: &str) -> Option<u64> {
    let line = content.lines().find(|l| l.starts_with("VmRSS:"))?;
    let mut parts = line["VmRSS:".len()..].split_whitespace();
    let value: u64 = parts.next()?.parse().ok()?;
    let multiplier = match parts.next() {
        Some("kB") | Some("KB") => 1024,
        Some("mB") | Some("MB") => 1024 * 1024,
        _ => 1,
    };
    Some(value * multiplier)
}

/// Probe that always reports zero; disables memory deltas
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMemoryProbe;

impl MemoryProbe for NullMemoryProbe {
    fn current_bytes(&self) -> Option<u64> {
        Some(0)
    }
}

impl<F> MemoryProbe for F
where
    F: Fn() -> Option<u64> + Send + Sync,
{
    fn current_bytes(&self) -> Option<u64> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = "Name:\tmonitor\nVmPeak:\t  20480 kB\nVmRSS:\t   10240 kB\nThreads:\t4\n";

    #[test]
    fn test_parse_vm_rss() {
        assert_eq!(parse_vm_rss(STATUS), Some(10240 * 1024));
        assert_eq!(parse_vm_rss("Name:\tmonitor\n"), None);
        assert_eq!(parse_vm_rss("VmRSS:\tgarbage kB\n"), None);
    }

    #[test]
    fn test_probe_reads_status_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("status");
        std::fs::write(&path, STATUS).unwrap();

        let probe = ProcessMemoryProbe::with_status_path(&path);
        assert_eq!(probe.current_bytes(), Some(10240 * 1024));
    }

    #[test]
    fn test_missing_status_file() {
        let probe = ProcessMemoryProbe::with_status_path("/nonexistent/status");
        assert_eq!(probe.current_bytes(), None);
    }

    #[test]
    fn test_closure_probe() {
        let probe = || Some(42u64);
        assert_eq!(MemoryProbe::current_bytes(&probe), Some(42));
        assert_eq!(NullMemoryProbe.current_bytes(), Some(0));
    }
}
