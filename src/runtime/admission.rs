/*!
 * Admission / Spawn Pipeline
 * Shared admission core behind the run/exec/spawn launch modes. Every check
 * is a hard stop with a log line; nothing is mutated until the final step,
 * where the RAM reservation, running-map insert, and registry insert happen
 * together under the host write lock.
 */

use super::api::ApiHandle;
use super::frontend::Entrypoint;
use super::Runtime;
use crate::core::errors::{AdmissionError, AdmissionResult, EntryError};
use crate::core::limits::{BASE_RAM_COST, RAM_COMPARE_EPSILON};
use crate::core::types::{Pid, RamGb, ScriptArg};
use crate::exec::ExecutionContext;
use crate::job::JobRecord;
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Launch request shared by run/exec/spawn
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub script: String,
    pub args: Vec<ScriptArg>,
    pub threads: u32,
    /// Explicit RAM-per-thread, bypassing the static analyzer (min-bounded)
    pub ram_override: Option<RamGb>,
    pub prevent_duplicates: bool,
    /// Transient jobs skip the recently-finished buffer
    pub transient: bool,
}

impl LaunchSpec {
    #[must_use]
    pub fn new(script: &str) -> Self {
        Self {
            script: script.to_string(),
            args: Vec::new(),
            threads: 1,
            ram_override: None,
            prevent_duplicates: false,
            transient: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_args(mut self, args: Vec<ScriptArg>) -> Self {
        self.args = args;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = threads.max(1);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_ram_override(mut self, ram: RamGb) -> Self {
        self.ram_override = Some(ram);
        self
    }

    #[inline]
    #[must_use]
    pub fn prevent_duplicates(mut self) -> Self {
        self.prevent_duplicates = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }
}

impl Runtime {
    /// Public launch surface: PID of the new job, or `0` on any failure.
    ///
    /// `run` and `exec` differ only in who names the host; both land here.
    pub fn launch(&self, host_id: &str, spec: LaunchSpec) -> Pid {
        let script = spec.script.clone();
        match self.admit(host_id, spec) {
            Ok(pid) => pid,
            Err(err) => {
                warn!("launch of {} on {} failed: {}", script, host_id, err);
                0
            }
        }
    }

    /// Admission core. Ordered hard-stop checks; no mutation before the
    /// final reservation step.
    pub fn admit(&self, host_id: &str, spec: LaunchSpec) -> AdmissionResult<Pid> {
        let host_handle = self
            .host(host_id)
            .ok_or_else(|| AdmissionError::HostNotFound(host_id.to_string()))?;

        // 1. Resolve the target file
        let source = host_handle
            .read()
            .file(&spec.script)
            .map(str::to_string)
            .ok_or_else(|| AdmissionError::ScriptNotFound {
                file: spec.script.clone(),
                host: host_id.to_string(),
            })?;

        // 2. Duplicate identity check (rechecked under the write lock below,
        // which is the authoritative one)
        if spec.prevent_duplicates && host_handle.read().is_running(&spec.script, &spec.args) {
            return Err(AdmissionError::Duplicate {
                file: spec.script.clone(),
                host: host_id.to_string(),
            });
        }

        // 3. RAM per thread: bounded override, or the static analyzer
        let ram_per_thread = match spec.ram_override {
            Some(ram) if ram < BASE_RAM_COST => {
                return Err(AdmissionError::RamOverrideTooLow {
                    given: ram,
                    min: BASE_RAM_COST,
                })
            }
            Some(ram) => ram,
            None => self
                .frontend()
                .resolve_static_ram(&spec.script, &source)
                .ok_or_else(|| AdmissionError::UncomputableRam(spec.script.clone()))?,
        };

        // 4. Thread scaling
        let threads = spec.threads.max(1);
        let total = ram_per_thread * f64::from(threads);

        // Compile before any mutation so a broken file cannot leak a
        // reservation
        let entry = self
            .frontend()
            .compile_entrypoint(&spec.script, &source)
            .map_err(|_| AdmissionError::UncomputableRam(spec.script.clone()))?;

        // 5, 6, 7: the remaining checks and the paired mutations share one
        // host write lock so admission is atomic
        let (pid, ctx) = {
            let mut host = host_handle.write();

            if spec.prevent_duplicates && host.is_running(&spec.script, &spec.args) {
                return Err(AdmissionError::Duplicate {
                    file: spec.script.clone(),
                    host: host_id.to_string(),
                });
            }
            if !host.admin_rights {
                return Err(AdmissionError::NoAdminRights(host_id.to_string()));
            }
            if total > host.ram_available() + RAM_COMPARE_EPSILON {
                return Err(AdmissionError::InsufficientRam {
                    needed: total,
                    available: host.ram_available(),
                });
            }

            let pid = self
                .registry()
                .allocate()
                .map_err(|_| AdmissionError::PidExhausted)?;

            let mut record = JobRecord::new(&spec.script, host_id, spec.args.clone(), threads)
                .with_ram(ram_per_thread)
                .with_transient(spec.transient);
            record.pid = pid;
            let job = Arc::new(RwLock::new(record));

            let ctx = Arc::new(ExecutionContext::new(pid, Arc::clone(&job), ram_per_thread));
            self.registry().register(pid, Arc::clone(&ctx));
            host.reserve(total, pid, job);
            (pid, ctx)
        };

        info!(
            "admitted {} on {} (pid {}, {} threads, {} GB)",
            spec.script, host_id, pid, threads, total
        );
        self.begin_execution(ctx, entry);
        Ok(pid)
    }

    /// Drive a freshly admitted entrypoint to completion.
    ///
    /// Every outcome (success, `Killed`, or an unknown runtime error) is
    /// natural completion and funnels into the single kill entry point.
    pub(crate) fn begin_execution(&self, ctx: Arc<ExecutionContext>, entry: Entrypoint) {
        let api = ApiHandle::new(self.clone(), Arc::clone(&ctx));
        let runtime = self.clone();
        tokio::spawn(async move {
            match entry(api).await {
                Ok(()) => debug!("pid {} finished", ctx.pid()),
                Err(EntryError::Killed) => debug!("pid {} killed", ctx.pid()),
                Err(EntryError::Unknown(msg)) => {
                    warn!("pid {} crashed: {}", ctx.pid(), msg);
                    ctx.log(format!("runtime error: {msg}"));
                }
            }
            runtime.kill(ctx.pid());
        });
    }

    /// Deferred launch on the caller's host; the caller dies immediately.
    ///
    /// The deferred task re-resolves the host by id at fire time: the caller
    /// (and possibly the host) may be long gone by then. A vanished host is
    /// logged, never a crash.
    pub fn spawn_deferred(
        &self,
        caller: &Arc<ExecutionContext>,
        spec: LaunchSpec,
        delay: Duration,
    ) {
        let host_id = caller.host().to_string();
        let runtime = self.clone();
        let script = spec.script.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if runtime.host(&host_id).is_none() {
                warn!(
                    "deferred spawn of {} dropped: host {} no longer exists",
                    script, host_id
                );
                return;
            }
            let pid = runtime.launch(&host_id, spec);
            if pid != 0 {
                debug!("deferred spawn of {} started as pid {}", script, pid);
            }
        });
        self.kill(caller.pid());
    }
}
