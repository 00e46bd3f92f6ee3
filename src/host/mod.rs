/*!
 * Simulated Hosts
 * Resource counters, script file table, and the running-job map consumed by
 * admission and teardown. `ram_used` must always equal the sum of reserved
 * RAM over the live contexts on the host; both sides of that invariant are
 * mutated under one host write lock.
 */

use crate::core::types::{round_ram, Pid, RamGb, ScriptArg};
use crate::job::{JobRecord, ScriptKey};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared handle to one live job record
pub type JobHandle = Arc<RwLock<JobRecord>>;

/// One simulated host
pub struct Host {
    pub id: String,
    pub max_ram: RamGb,
    ram_used: RamGb,
    pub admin_rights: bool,
    files: HashMap<String, String>,
    running: HashMap<ScriptKey, HashMap<Pid, JobHandle>>,
}

impl Host {
    #[must_use]
    pub fn new(id: &str, max_ram: RamGb) -> Self {
        Self {
            id: id.to_string(),
            max_ram,
            ram_used: 0.0,
            admin_rights: false,
            files: HashMap::new(),
            running: HashMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_admin_rights(mut self) -> Self {
        self.admin_rights = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn ram_used(&self) -> RamGb {
        self.ram_used
    }

    /// Free headroom on this host
    #[inline]
    #[must_use]
    pub fn ram_available(&self) -> RamGb {
        self.max_ram - self.ram_used
    }

    pub fn write_file(&mut self, filename: &str, source: &str) {
        self.files.insert(filename.to_string(), source.to_string());
    }

    pub fn remove_file(&mut self, filename: &str) -> bool {
        self.files.remove(filename).is_some()
    }

    #[must_use]
    pub fn file(&self, filename: &str) -> Option<&str> {
        self.files.get(filename).map(String::as_str)
    }

    /// Whether a run with this identity is currently live
    #[must_use]
    pub fn is_running(&self, filename: &str, args: &[ScriptArg]) -> bool {
        self.running
            .get(&ScriptKey::new(filename, args))
            .is_some_and(|by_pid| !by_pid.is_empty())
    }

    #[must_use]
    pub fn running_job(&self, pid: Pid) -> Option<JobHandle> {
        self.running
            .values()
            .find_map(|by_pid| by_pid.get(&pid).cloned())
    }

    /// All live job handles on this host
    #[must_use]
    pub fn running_jobs(&self) -> Vec<JobHandle> {
        self.running
            .values()
            .flat_map(|by_pid| by_pid.values().cloned())
            .collect()
    }

    /// Reserve `total` GB and insert the job into the running map.
    ///
    /// Callers must have verified headroom first; this is the mutating half
    /// of admission and is paired with the registry insert.
    pub fn reserve(&mut self, total: RamGb, pid: Pid, job: JobHandle) {
        let key = job.read().key();
        self.ram_used += total;
        self.running.entry(key).or_default().insert(pid, job);
    }

    /// Release `total` GB and drop the running-map entry for `pid`.
    ///
    /// Rounded the same way on every release so paired reserve/release
    /// arithmetic cannot accumulate drift.
    pub fn release(&mut self, total: RamGb, pid: Pid) {
        self.ram_used = round_ram((self.ram_used - total).max(0.0));
        self.running.retain(|_, by_pid| {
            by_pid.remove(&pid);
            !by_pid.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn handle(filename: &str, args: Vec<ScriptArg>, ram: RamGb) -> JobHandle {
        Arc::new(RwLock::new(
            JobRecord::new(filename, "home", args, 1).with_ram(ram),
        ))
    }

    #[test]
    fn test_reserve_release_paired() {
        let mut host = Host::new("home", 8.0);
        host.reserve(4.0, 1, handle("w.js", vec![], 4.0));
        assert_eq!(host.ram_used(), 4.0);
        assert!(host.is_running("w.js", &[]));

        host.release(4.0, 1);
        assert_eq!(host.ram_used(), 0.0);
        assert!(!host.is_running("w.js", &[]));
    }

    #[test]
    fn test_identity_distinguishes_args() {
        let mut host = Host::new("home", 8.0);
        host.reserve(2.0, 1, handle("w.js", vec!["a".into()], 2.0));
        assert!(host.is_running("w.js", &["a".into()]));
        assert!(!host.is_running("w.js", &["b".into()]));
    }

    #[test]
    fn test_release_drops_only_target_pid() {
        let mut host = Host::new("home", 8.0);
        host.reserve(2.0, 1, handle("w.js", vec![], 2.0));
        host.reserve(2.0, 2, handle("w.js", vec![], 2.0));
        host.release(2.0, 1);
        assert!(host.is_running("w.js", &[]));
        assert!(host.running_job(2).is_some());
        assert!(host.running_job(1).is_none());
    }
}
