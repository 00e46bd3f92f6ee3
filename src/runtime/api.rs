/*!
 * Script API Surface
 * The statically-typed operation table (name -> RAM cost) and the guarded
 * handle entrypoints receive. Every exposed operation passes the concurrency
 * guard and charges its RAM cost before doing any work; guard and meter
 * failures are fatal and kill the owning context before the error returns.
 */

use super::admission::LaunchSpec;
use super::Runtime;
use crate::core::errors::{EntryError, PortError, RuntimeError};
use crate::core::types::{Pid, PortId, RamGb};
use crate::exec::{delay, guard, ExecutionContext};
use crate::ports::PortValue;
use log::warn;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// RAM cost of one exposed operation, or `None` for an unknown name.
///
/// Explicit registration table: one row per operation, resolved at compile
/// time, nothing reflective.
#[must_use]
pub fn ram_cost(op: &str) -> Option<RamGb> {
    Some(match op {
        "sleep" | "print" | "atExit" => 0.0,
        "readPort" | "peekPort" | "writePort" | "tryWritePort" | "nextPortWrite"
        | "clearPort" => 0.0,
        "run" => 1.0,
        "exec" => 1.3,
        "spawn" => 2.0,
        "kill" => 0.5,
        "getHostMaxRam" | "getHostUsedRam" => 0.05,
        _ => return None,
    })
}

/// Failure of one API call as seen by script code
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl From<ApiError> for EntryError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Runtime(RuntimeError::Killed) => EntryError::Killed,
            other => EntryError::Unknown(other.to_string()),
        }
    }
}

/// Per-call API result
pub type ApiResult<T> = Result<T, ApiError>;

/// The API surface handed to a compiled entrypoint, bound to one context
pub struct ApiHandle {
    runtime: Runtime,
    ctx: Arc<ExecutionContext>,
}

impl ApiHandle {
    pub(crate) fn new(runtime: Runtime, ctx: Arc<ExecutionContext>) -> Self {
        Self { runtime, ctx }
    }

    #[inline]
    #[must_use]
    pub fn pid(&self) -> Pid {
        self.ctx.pid()
    }

    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        self.ctx.host()
    }

    /// Guard check + RAM charge shared by every operation.
    ///
    /// `ConcurrencyViolation` and `RamOverrun` kill the owner here: they are
    /// the only involuntary terminations besides `Killed` itself.
    fn guarded(&self, op: &'static str) -> ApiResult<()> {
        guard::check(&self.ctx, op).map_err(|e| self.escalate(e))?;
        let cost = ram_cost(op).unwrap_or(0.0);
        self.ctx.charge(op, cost).map_err(|e| self.escalate(e))?;
        Ok(())
    }

    fn escalate(&self, err: RuntimeError) -> ApiError {
        if !err.is_killed() {
            warn!("pid {} fatal: {}", self.ctx.pid(), err);
            self.ctx.log(err.to_string());
            self.runtime.kill(self.ctx.pid());
        }
        ApiError::Runtime(err)
    }

    /// Cooperative sleep; the one operation allowed to overlap a suspension
    pub async fn sleep(&self, millis: u64) -> ApiResult<()> {
        self.guarded("sleep")?;
        delay(&self.ctx, "sleep", Duration::from_millis(millis))
            .await
            .map_err(ApiError::Runtime)
    }

    /// Suspend inside a named operation for its computed duration.
    ///
    /// Exclusive: issuing any other guarded call while this is pending is a
    /// protocol violation.
    pub async fn work(&self, op: &'static str, duration: Duration) -> ApiResult<()> {
        self.guarded(op)?;
        delay(&self.ctx, op, duration)
            .await
            .map_err(ApiError::Runtime)
    }

    /// Append a line to the job's log ring
    pub fn print(&self, line: impl Into<String>) -> ApiResult<()> {
        self.guarded("print")?;
        self.ctx.log(line);
        Ok(())
    }

    /// Register a teardown hook, run exactly once when the context dies
    pub fn at_exit(&self, hook: impl FnOnce() + Send + 'static) -> ApiResult<()> {
        self.guarded("atExit")?;
        self.ctx.on_exit(Box::new(hook));
        Ok(())
    }

    // --- Mailbox ports ------------------------------------------------------

    pub fn write_port(&self, id: PortId, value: PortValue) -> ApiResult<Option<PortValue>> {
        self.guarded("writePort")?;
        Ok(self.runtime.ports().write(id, value)?)
    }

    pub fn try_write_port(&self, id: PortId, value: PortValue) -> ApiResult<bool> {
        self.guarded("tryWritePort")?;
        Ok(self.runtime.ports().try_write(id, value)?)
    }

    pub fn read_port(&self, id: PortId) -> ApiResult<PortValue> {
        self.guarded("readPort")?;
        Ok(self.runtime.ports().read(id)?)
    }

    pub fn peek_port(&self, id: PortId) -> ApiResult<PortValue> {
        self.guarded("peekPort")?;
        Ok(self.runtime.ports().peek(id)?)
    }

    pub fn clear_port(&self, id: PortId) -> ApiResult<()> {
        self.guarded("clearPort")?;
        Ok(self.runtime.ports().clear(id)?)
    }

    /// Suspend until the next successful write to the port
    pub async fn next_port_write(&self, id: PortId) -> ApiResult<()> {
        self.guarded("nextPortWrite")?;
        let ports = self.runtime.ports().clone();
        let res = delay::suspend_on(&self.ctx, "nextPortWrite", ports.next_write(id))
            .await
            .map_err(ApiError::Runtime)?;
        res.map_err(ApiError::from)
    }

    // --- Launch & kill ------------------------------------------------------

    /// Launch a job on the caller's own host; `0` on any admission failure
    pub fn run(&self, spec: LaunchSpec) -> ApiResult<Pid> {
        self.guarded("run")?;
        Ok(self.runtime.launch(self.ctx.host(), spec))
    }

    /// Launch a job on an explicitly named host; `0` on any admission failure
    pub fn exec(&self, host: &str, spec: LaunchSpec) -> ApiResult<Pid> {
        self.guarded("exec")?;
        Ok(self.runtime.launch(host, spec))
    }

    /// Schedule a deferred launch on the caller's host, then kill the caller.
    ///
    /// Always returns `Killed`: the caller cannot outlive its own spawn.
    pub fn spawn(&self, spec: LaunchSpec, delay_ms: u64) -> ApiResult<()> {
        self.guarded("spawn")?;
        self.runtime
            .spawn_deferred(&self.ctx, spec, Duration::from_millis(delay_ms));
        Err(ApiError::Runtime(RuntimeError::Killed))
    }

    /// Kill a live context by PID; false if no such PID
    pub fn kill(&self, pid: Pid) -> ApiResult<bool> {
        self.guarded("kill")?;
        Ok(self.runtime.kill(pid))
    }

    // --- Host introspection -------------------------------------------------

    pub fn host_max_ram(&self, host: &str) -> ApiResult<Option<RamGb>> {
        self.guarded("getHostMaxRam")?;
        Ok(self.runtime.host(host).map(|h| h.read().max_ram))
    }

    pub fn host_used_ram(&self, host: &str) -> ApiResult<Option<RamGb>> {
        self.guarded("getHostUsedRam")?;
        Ok(self.runtime.host(host).map(|h| h.read().ram_used()))
    }
}
