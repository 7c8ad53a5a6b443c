//! Linux sample source backed by /proc and statvfs

use super::{unix_now, Sample, SampleSource};
use crate::error::{GuardianError, Result};
use std::ffi::CString;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemInfo {
    pub total_kb: u64,
    pub available_kb: u64,
}

/// Reads CPU and memory from /proc and disk usage via statvfs.
pub struct LinuxSampleSource {
    disk_path: PathBuf,
    last_cpu: Mutex<Option<CpuTimes>>,
}

impl LinuxSampleSource {
    pub fn new(disk_path: impl Into<PathBuf>) -> Self {
        Self {
            disk_path: disk_path.into(),
            last_cpu: Mutex::new(None),
        }
    }

    fn cpu_percent(&self) -> Result<f64> {
        let stat = fs::read_to_string("/proc/stat")
            .map_err(|e| GuardianError::SourceUnavailable(format!("/proc/stat: {}", e)))?;
        let current = parse_cpu_times(&stat)
            .ok_or_else(|| GuardianError::SourceUnavailable("malformed /proc/stat".into()))?;

        let mut last = self.last_cpu.lock().unwrap_or_else(PoisonError::into_inner);
        // First reading falls back to the average since boot
        let (busy, total) = match *last {
            Some(prev) => (
                current.busy.saturating_sub(prev.busy),
                current.total.saturating_sub(prev.total),
            ),
            None => (current.busy, current.total),
        };
        *last = Some(current);

        if total == 0 {
            return Ok(0.0);
        }
        Ok(round1(busy as f64 / total as f64 * 100.0))
    }

    fn memory(&self) -> Result<(f64, f64)> {
        let meminfo = fs::read_to_string("/proc/meminfo")
            .map_err(|e| GuardianError::SourceUnavailable(format!("/proc/meminfo: {}", e)))?;
        let info = parse_meminfo(&meminfo)
            .ok_or_else(|| GuardianError::SourceUnavailable("malformed /proc/meminfo".into()))?;
        if info.total_kb == 0 {
            return Err(GuardianError::SourceUnavailable("MemTotal is zero".into()));
        }
        let used = info.total_kb.saturating_sub(info.available_kb);
        let percent = used as f64 / info.total_kb as f64 * 100.0;
        let available_gb = info.available_kb as f64 / (1024.0 * 1024.0);
        Ok((round1(percent), round2(available_gb)))
    }

    fn disk(&self) -> Result<(f64, f64)> {
        disk_usage(&self.disk_path)
    }
}

impl SampleSource for LinuxSampleSource {
    fn sample(&self) -> Result<Sample> {
        let cpu_percent = self.cpu_percent()?;
        let (memory_percent, memory_available_gb) = self.memory()?;
        let (disk_percent, disk_free_gb) = self.disk()?;
        Ok(Sample {
            timestamp: unix_now(),
            cpu_percent,
            memory_percent,
            memory_available_gb,
            disk_percent,
            disk_free_gb,
        })
    }
}

/// Parses the aggregate `cpu` line of /proc/stat.
pub fn parse_cpu_times(stat: &str) -> Option<CpuTimes> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|v| v.parse().unwrap_or(0))
        .collect();
    if fields.len() < 4 {
        return None;
    }
    // user nice system idle iowait irq softirq steal; guest time is already in user
    let total: u64 = fields.iter().take(8).sum();
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Some(CpuTimes {
        busy: total.saturating_sub(idle),
        total,
    })
}

pub fn parse_meminfo(meminfo: &str) -> Option<MemInfo> {
    let mut total_kb = None;
    let mut available_kb = None;
    for line in meminfo.lines() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("MemTotal:") => total_kb = parts.next().and_then(|v| v.parse().ok()),
            Some("MemAvailable:") => available_kb = parts.next().and_then(|v| v.parse().ok()),
            _ => {}
        }
    }
    Some(MemInfo {
        total_kb: total_kb?,
        available_kb: available_kb?,
    })
}

/// Returns (used percent, free GB) for the filesystem holding `path`.
pub fn disk_usage(path: &Path) -> Result<(f64, f64)> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| GuardianError::SourceUnavailable(format!("invalid path {:?}", path)))?;
    let mut st: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut st) };
    if rc != 0 {
        return Err(GuardianError::SourceUnavailable(format!(
            "statvfs {:?}: {}",
            path,
            std::io::Error::last_os_error()
        )));
    }

    let frsize = st.f_frsize as u64;
    let total = st.f_blocks as u64 * frsize;
    let used = (st.f_blocks as u64).saturating_sub(st.f_bfree as u64) * frsize;
    let free = st.f_bavail as u64 * frsize;
    if total == 0 {
        return Err(GuardianError::SourceUnavailable(format!("{:?} reports zero size", path)));
    }
    Ok((
        round1(used as f64 / total as f64 * 100.0),
        round2(free as f64 / GIB),
    ))
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
