//! Process and host statistic collection.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use sysinfo::{Disks, Pid, ProcessesToUpdate, System};

/// One cycle's worth of resource readings. Immutable once collected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSample {
    /// Memory used by this process, in bytes.
    pub memory_used_bytes: u64,
    /// Bytes used on the filesystem holding the working directory.
    pub disk_used_bytes: f64,
    /// Total bytes on that filesystem.
    pub disk_quota_bytes: f64,
    /// Live async tasks on the runtime.
    pub tasks_alive: u64,
    /// Unix epoch seconds when the sample was taken.
    pub timestamp: u64,
}

/// Reads resource counters. Every read degrades to zero on failure; a
/// reader never panics and never returns an error.
pub struct StatReader {
    system: System,
    disks: Disks,
    pid: Option<Pid>,
}

impl StatReader {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = e, "Could not resolve own pid; memory readings degrade to zero");
                None
            }
        };
        Self {
            system: System::new(),
            disks: Disks::new_with_refreshed_list(),
            pid,
        }
    }

    /// Take one sample of all counters.
    pub fn collect(&mut self) -> ResourceSample {
        let memory_used_bytes = self.read_process_memory();
        let (disk_used_bytes, disk_quota_bytes) = self.read_disk_usage();
        let tasks_alive = read_tasks_alive();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        ResourceSample {
            memory_used_bytes,
            disk_used_bytes,
            disk_quota_bytes,
            tasks_alive,
            timestamp,
        }
    }

    fn read_process_memory(&mut self) -> u64 {
        let Some(pid) = self.pid else {
            return 0;
        };
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        match self.system.process(pid) {
            Some(process) => process.memory(),
            None => 0,
        }
    }

    /// Usage of the filesystem holding the working directory: the disk
    /// with the longest mount-point prefix of the cwd.
    fn read_disk_usage(&mut self) -> (f64, f64) {
        self.disks.refresh(true);

        let cwd = match std::env::current_dir() {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read working directory for disk stats");
                return (0.0, 0.0);
            }
        };

        let mut best: Option<(u64, u64, usize)> = None;
        for disk in self.disks.list() {
            let mount = disk.mount_point();
            if cwd.starts_with(mount) {
                let depth = mount.as_os_str().len();
                if best.map_or(true, |(_, _, d)| depth > d) {
                    best = Some((disk.total_space(), disk.available_space(), depth));
                }
            }
        }

        match best {
            Some((total, available, _)) => {
                let total = total as f64;
                (total - available as f64, total)
            }
            None => {
                tracing::warn!(cwd = %cwd.display(), "No disk covers the working directory");
                (0.0, 0.0)
            }
        }
    }
}

impl Default for StatReader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_tasks_alive() -> u64 {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle.metrics().num_alive_tasks() as u64,
        Err(_) => 0,
    }
}
