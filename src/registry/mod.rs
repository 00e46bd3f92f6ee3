/*!
 * Process Registry
 * Global PID -> execution-context table and PID allocation.
 * A PID is never reused while its context is live; exhaustion is reported,
 * never thrown.
 */

use crate::core::errors::RegistryError;
use crate::core::limits::PID_MAX;
use crate::core::types::Pid;
use crate::exec::ExecutionContext;
use ahash::RandomState;
use dashmap::DashMap;
use log::info;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// PID table with wrap-around allocation
pub struct ProcessRegistry {
    contexts: Arc<DashMap<Pid, Arc<ExecutionContext>, RandomState>>,
    next_pid: Arc<AtomicU32>,
}

impl ProcessRegistry {
    #[must_use]
    pub fn new() -> Self {
        info!("Process registry initialized (PID range 1..={})", PID_MAX);
        Self {
            contexts: Arc::new(DashMap::with_hasher(RandomState::new())),
            next_pid: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Allocate a PID not currently held by a live context.
    ///
    /// Wraps through the PID range; a full cycle with every PID live reports
    /// `Exhausted` so the admission pipeline can degrade to a failed launch.
    pub fn allocate(&self) -> Result<Pid, RegistryError> {
        for _ in 0..PID_MAX {
            let candidate = self.next_pid.fetch_add(1, Ordering::SeqCst);
            let pid = candidate.wrapping_sub(1) % PID_MAX + 1;
            if !self.contexts.contains_key(&pid) {
                return Ok(pid);
            }
        }
        Err(RegistryError::Exhausted)
    }

    pub fn register(&self, pid: Pid, ctx: Arc<ExecutionContext>) {
        self.contexts.insert(pid, ctx);
    }

    #[must_use]
    pub fn lookup(&self, pid: Pid) -> Option<Arc<ExecutionContext>> {
        self.contexts.get(&pid).map(|e| Arc::clone(e.value()))
    }

    pub fn unregister(&self, pid: Pid) -> Option<Arc<ExecutionContext>> {
        self.contexts.remove(&pid).map(|(_, ctx)| ctx)
    }

    /// All live PIDs, unordered
    #[must_use]
    pub fn pids(&self) -> Vec<Pid> {
        self.contexts.iter().map(|e| *e.key()).collect()
    }

    /// Live PIDs on one host, unordered
    #[must_use]
    pub fn pids_on_host(&self, host: &str) -> Vec<Pid> {
        self.contexts
            .iter()
            .filter(|e| e.value().host() == host)
            .map(|e| *e.key())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ProcessRegistry {
    fn clone(&self) -> Self {
        Self {
            contexts: Arc::clone(&self.contexts),
            next_pid: Arc::clone(&self.next_pid),
        }
    }
}
