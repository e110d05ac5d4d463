//! Memory sampling of a running process tree
//!
//! Resident memory is read through `sysinfo` every time the supervisor ticks.
//! A sample is the summed RSS of the supervised process and every process
//! descending from it. Short spikes between two ticks are caught later by the
//! kernel high-water mark returned when the process is reaped.

use std::collections::HashMap;
use sysinfo::{Pid, ProcessRefreshKind, System};

/// Tracks the peak resident memory of one process tree
pub struct MemoryMonitor {
    system: System,
    root: Pid,
    peak: u64,
}

impl MemoryMonitor {
    pub fn new(pid: u32) -> Self {
        Self {
            system: System::new(),
            root: Pid::from_u32(pid),
            peak: 0,
        }
    }

    /// Take one sample and return the peak seen so far, in bytes
    ///
    /// A tree that already exited leaves the peak unchanged.
    pub fn sample(&mut self) -> u64 {
        self.system
            .refresh_processes_specifics(ProcessRefreshKind::new().with_memory());
        self.peak = self.peak.max(self.tree_memory());
        self.peak
    }

    /// Peak resident memory in bytes
    pub fn peak(&self) -> u64 {
        self.peak
    }

    fn tree_memory(&self) -> u64 {
        let processes = self.system.processes();
        if !processes.contains_key(&self.root) {
            return 0;
        }

        // Threads share their leader's memory
        let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
        for (pid, process) in processes {
            if process.thread_kind().is_some() {
                continue;
            }
            if let Some(parent) = process.parent() {
                children.entry(parent).or_default().push(*pid);
            }
        }

        let mut total = 0;
        let mut pending = vec![self.root];
        while let Some(pid) = pending.pop() {
            if let Some(process) = processes.get(&pid) {
                total += process.memory();
            }
            if let Some(kids) = children.get(&pid) {
                pending.extend(kids);
            }
        }
        total
    }
}
