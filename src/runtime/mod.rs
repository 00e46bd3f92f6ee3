/*!
 * Runtime
 * Owner of every process-wide table: process registry, host table, mailbox
 * ports, and the recently-finished buffer. Constructed once at simulation
 * start and passed by handle to all components; `reset` restores the
 * just-constructed state.
 */

pub mod admission;
pub mod api;
pub mod frontend;
pub mod lifecycle;

pub use admission::LaunchSpec;
pub use api::{ApiError, ApiHandle, ApiResult};
pub use frontend::{EntryFuture, Entrypoint, ScriptFrontend, TableFrontend};

use crate::core::types::{HostId, Pid};
use crate::host::Host;
use crate::job::{JobRecord, RecentJobs};
use crate::ports::PortManager;
use crate::registry::ProcessRegistry;
use ahash::RandomState;
use dashmap::DashMap;
use log::info;
use parking_lot::RwLock;
use std::sync::Arc;

/// Simulation-wide runtime handle
pub struct Runtime {
    registry: ProcessRegistry,
    ports: PortManager,
    hosts: Arc<DashMap<HostId, Arc<RwLock<Host>>, RandomState>>,
    recent: Arc<RecentJobs>,
    frontend: Arc<dyn ScriptFrontend>,
}

impl Runtime {
    #[must_use]
    pub fn new(frontend: Arc<dyn ScriptFrontend>) -> Self {
        info!("Runtime initialized");
        Self {
            registry: ProcessRegistry::new(),
            ports: PortManager::new(),
            hosts: Arc::new(DashMap::with_hasher(RandomState::new())),
            recent: Arc::new(RecentJobs::new()),
            frontend,
        }
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn ports(&self) -> &PortManager {
        &self.ports
    }

    #[inline]
    #[must_use]
    pub fn recent(&self) -> &RecentJobs {
        &self.recent
    }

    #[inline]
    pub(crate) fn frontend(&self) -> &Arc<dyn ScriptFrontend> {
        &self.frontend
    }

    // --- Hosts ---------------------------------------------------------------

    pub fn add_host(&self, host: Host) {
        self.hosts
            .insert(host.id.clone(), Arc::new(RwLock::new(host)));
    }

    #[must_use]
    pub fn host(&self, id: &str) -> Option<Arc<RwLock<Host>>> {
        self.hosts.get(id).map(|e| Arc::clone(e.value()))
    }

    /// Remove a host, killing everything running on it first
    pub fn remove_host(&self, id: &str) -> bool {
        if self.hosts.get(id).is_none() {
            return false;
        }
        self.kill_all(id);
        self.hosts.remove(id).is_some()
    }

    // --- Persistence ----------------------------------------------------------

    /// Snapshots of the live job records on a host, ready to persist
    #[must_use]
    pub fn export_jobs(&self, host_id: &str) -> Vec<JobRecord> {
        self.host(host_id).map_or_else(Vec::new, |host| {
            host.read()
                .running_jobs()
                .iter()
                .map(|job| job.read().clone())
                .collect()
        })
    }

    /// Relaunch a persisted job record. The execution context is rebuilt
    /// fresh; only the record's accumulated stats carry over.
    pub fn restore_job(&self, record: JobRecord) -> Pid {
        let spec = LaunchSpec::new(&record.filename)
            .with_args(record.args.clone())
            .with_threads(record.threads)
            .with_ram_override(record.ram_per_thread);
        let pid = self.launch(&record.host, spec);
        if pid == 0 {
            return 0;
        }
        if let Some(host) = self.host(&record.host) {
            if let Some(job) = host.read().running_job(pid) {
                let mut job = job.write();
                job.online_money = record.online_money;
                job.online_exp = record.online_exp;
                job.offline_money = record.offline_money;
                job.offline_exp = record.offline_exp;
                job.online_runtime_secs = record.online_runtime_secs;
                job.offline_runtime_secs = record.offline_runtime_secs;
                job.data_map = record.data_map;
                job.logs = record.logs;
                job.dependencies = record.dependencies;
            }
        }
        pid
    }

    // --- Reset -----------------------------------------------------------------

    /// Full simulation reset: kill everything, drop every table
    pub fn reset(&self) {
        for pid in self.registry.pids() {
            self.kill(pid);
        }
        self.ports.reset();
        self.hosts.clear();
        self.recent.clear();
        info!("Runtime reset");
    }
}

impl Clone for Runtime {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            ports: self.ports.clone(),
            hosts: Arc::clone(&self.hosts),
            recent: Arc::clone(&self.recent),
            frontend: Arc::clone(&self.frontend),
        }
    }
}
