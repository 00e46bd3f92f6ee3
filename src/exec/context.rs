/*!
 * Execution Context
 * Live, unpersisted state of one active run of a job record: stop flag,
 * pending-wait table, RAM meter, and exit-hook table.
 */

use super::meter::RamMeter;
use crate::core::errors::RuntimeError;
use crate::core::types::{HostId, Pid, RamGb, RuntimeResult};
use crate::job::JobRecord;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Callback run during teardown; may itself trigger a re-entrant kill
pub type ExitHook = Box<dyn FnOnce() + Send>;

/// Derived run state
///
/// `Dead` is terminal; the transition into it is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Suspended,
    Dead,
}

/// Handle to one pending wait, used to clear it on normal resume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitToken(u64);

struct Wait {
    token: u64,
    op: &'static str,
    cancel: oneshot::Sender<()>,
}

/// Pending waits of one context. At most one exclusive operation can be
/// suspended at a time (the guard enforces it); any number of non-exclusive
/// sleeps may overlap it. `torn_down` latches once kill has passed through
/// so a racing suspension attempt cannot arm after teardown began.
struct Suspension {
    waits: Vec<Wait>,
    next_token: u64,
    torn_down: bool,
}

/// Live runtime state of one job run
///
/// Never persisted; rebuilt fresh on every launch.
pub struct ExecutionContext {
    pid: Pid,
    host: HostId,
    job: Arc<RwLock<JobRecord>>,
    /// Static allocation per thread, frozen at admission
    static_ram: RamGb,
    /// `ram_per_thread × threads`, the amount admission charged to the host
    reserved_ram: RamGb,
    transient: bool,
    /// Monotonic false -> true, set exactly once by kill
    stopped: AtomicBool,
    suspension: Mutex<Suspension>,
    meter: Mutex<RamMeter>,
    exit_hooks: Mutex<Vec<ExitHook>>,
}

impl ExecutionContext {
    #[must_use]
    pub fn new(pid: Pid, job: Arc<RwLock<JobRecord>>, static_ram: RamGb) -> Self {
        let (host, reserved_ram, transient) = {
            let job = job.read();
            (job.host.clone(), job.total_ram(), job.transient)
        };
        Self {
            pid,
            host,
            job,
            static_ram,
            reserved_ram,
            transient,
            stopped: AtomicBool::new(false),
            suspension: Mutex::new(Suspension {
                waits: Vec::new(),
                next_token: 0,
                torn_down: false,
            }),
            meter: Mutex::new(RamMeter::new()),
            exit_hooks: Mutex::new(Vec::new()),
        }
    }

    #[inline]
    #[must_use]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    #[must_use]
    pub fn job(&self) -> &Arc<RwLock<JobRecord>> {
        &self.job
    }

    #[inline]
    #[must_use]
    pub fn static_ram(&self) -> RamGb {
        self.static_ram
    }

    #[inline]
    #[must_use]
    pub fn reserved_ram(&self) -> RamGb {
        self.reserved_ram
    }

    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.transient
    }

    /// Check the stop flag
    ///
    /// Hot path: checked at every guarded re-entry point.
    #[inline(always)]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Set the stop flag; returns false if it was already set
    pub fn mark_stopped(&self) -> bool {
        self.stopped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        if self.is_stopped() {
            RunState::Dead
        } else if !self.suspension.lock().waits.is_empty() {
            RunState::Suspended
        } else {
            RunState::Running
        }
    }

    /// Name of the call currently suspended, if any.
    ///
    /// When an exclusive wait and overlapping sleeps are both pending, the
    /// exclusive call is the one reported.
    #[must_use]
    pub fn suspended_in(&self) -> Option<&'static str> {
        let slot = self.suspension.lock();
        slot.waits
            .iter()
            .find(|w| w.op != super::guard::NONEXCLUSIVE_OP)
            .or_else(|| slot.waits.first())
            .map(|w| w.op)
    }

    /// Arm a pending wait for `op` and return its cancel receiver.
    ///
    /// Fails with `Killed` if teardown already started, so a context can
    /// never become suspended after its kill began.
    pub fn begin_suspension(
        &self,
        op: &'static str,
    ) -> RuntimeResult<(WaitToken, oneshot::Receiver<()>)> {
        let mut slot = self.suspension.lock();
        if slot.torn_down || self.is_stopped() {
            return Err(RuntimeError::Killed);
        }
        let (tx, rx) = oneshot::channel();
        let token = slot.next_token;
        slot.next_token += 1;
        slot.waits.push(Wait {
            token,
            op,
            cancel: tx,
        });
        Ok((WaitToken(token), rx))
    }

    /// Clear one pending wait on normal resume
    pub fn end_suspension(&self, token: WaitToken) {
        self.suspension.lock().waits.retain(|w| w.token != token.0);
    }

    /// Abort every pending wait as part of kill.
    ///
    /// Fires the cancel hooks and clears the slots synchronously, so no code
    /// can observe a context that is both suspended and dead.
    pub fn cancel_suspension(&self) {
        let waits = {
            let mut slot = self.suspension.lock();
            slot.torn_down = true;
            std::mem::take(&mut slot.waits)
        };
        for wait in waits {
            let _ = wait.cancel.send(());
        }
    }

    /// Charge a distinct call name against dynamic RAM (repeat names free)
    pub fn charge(&self, op: &'static str, cost: RamGb) -> RuntimeResult<()> {
        self.meter.lock().charge(op, cost, self.static_ram)
    }

    /// Current accrued dynamic RAM
    #[must_use]
    pub fn dynamic_ram(&self) -> RamGb {
        self.meter.lock().dynamic()
    }

    /// Register a teardown hook
    pub fn on_exit(&self, hook: ExitHook) {
        self.exit_hooks.lock().push(hook);
    }

    /// Snapshot-and-clear the exit-hook table.
    ///
    /// Kill clears the stored list before invoking any hook, so a hook that
    /// re-enters kill finds an empty table instead of recursing.
    #[must_use]
    pub fn take_exit_hooks(&self) -> Vec<ExitHook> {
        std::mem::take(&mut *self.exit_hooks.lock())
    }

    /// Append a line to the owning job's log ring
    pub fn log(&self, line: impl Into<String>) {
        self.job.write().log(line);
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("pid", &self.pid)
            .field("host", &self.host)
            .field("static_ram", &self.static_ram)
            .field("reserved_ram", &self.reserved_ram)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ctx() -> ExecutionContext {
        let job = Arc::new(RwLock::new(
            JobRecord::new("w.js", "home", vec![], 2).with_ram(2.0),
        ));
        ExecutionContext::new(7, job, 2.0)
    }

    #[test]
    fn test_reserved_ram_scales_with_threads() {
        let ctx = ctx();
        assert_eq!(ctx.reserved_ram(), 4.0);
        assert_eq!(ctx.static_ram(), 2.0);
    }

    #[test]
    fn test_stop_flag_monotonic() {
        let ctx = ctx();
        assert_eq!(ctx.state(), RunState::Running);
        assert!(ctx.mark_stopped());
        assert!(!ctx.mark_stopped());
        assert_eq!(ctx.state(), RunState::Dead);
    }

    #[test]
    fn test_suspension_slot_cleared_by_cancel() {
        let ctx = ctx();
        let (_token, _rx) = ctx.begin_suspension("sleep").unwrap();
        assert_eq!(ctx.state(), RunState::Suspended);
        ctx.cancel_suspension();
        assert_eq!(ctx.suspended_in(), None);
        // After teardown began, arming again must fail
        assert!(ctx.begin_suspension("sleep").is_err());
    }

    #[test]
    fn test_exclusive_wait_reported_over_sleeps() {
        let ctx = ctx();
        let (_t1, _rx1) = ctx.begin_suspension("hack").unwrap();
        let (sleep_token, _rx2) = ctx.begin_suspension("sleep").unwrap();
        assert_eq!(ctx.suspended_in(), Some("hack"));
        ctx.end_suspension(sleep_token);
        assert_eq!(ctx.suspended_in(), Some("hack"));
        assert_eq!(ctx.state(), RunState::Suspended);
    }
}
