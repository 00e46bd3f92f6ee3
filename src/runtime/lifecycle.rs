/*!
 * Lifecycle & Kill
 * The single teardown entry point used by every trigger: explicit kill,
 * natural completion, uncaught entrypoint error, and host removal. Dead is
 * terminal and the transition into it is idempotent.
 */

use super::Runtime;
use crate::core::types::Pid;
use crate::exec::ExecutionContext;
use log::{debug, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

impl Runtime {
    /// Kill a live context by PID. Returns false when no such PID is live.
    ///
    /// Safe to call any number of times: the reserved RAM is freed and the
    /// registry entry removed exactly once.
    pub fn kill(&self, pid: Pid) -> bool {
        match self.registry().lookup(pid) {
            Some(ctx) => {
                self.kill_context(&ctx);
                true
            }
            None => false,
        }
    }

    /// Kill every live context on a host (host-removal path)
    pub fn kill_all(&self, host_id: &str) -> usize {
        let pids = self.registry().pids_on_host(host_id);
        let count = pids.len();
        for pid in pids {
            self.kill(pid);
        }
        count
    }

    pub(crate) fn kill_context(&self, ctx: &Arc<ExecutionContext>) {
        // Idempotence: already dead, nothing to do
        if ctx.is_stopped() {
            return;
        }

        // Settle any pending wait with Killed, synchronously
        ctx.cancel_suspension();

        // Snapshot-then-clear the hook table before invoking anything: a
        // hook that re-enters kill must find it empty
        let hooks = ctx.take_exit_hooks();
        for hook in hooks {
            if catch_unwind(AssertUnwindSafe(hook)).is_err() {
                warn!("exit hook for pid {} panicked", ctx.pid());
            }
        }

        // A hook may have re-entered kill and finalized already; the CAS
        // below also settles two racing kills
        if !ctx.mark_stopped() {
            return;
        }

        // Paired teardown: registry entry out, reserved RAM back
        self.registry().unregister(ctx.pid());
        if let Some(host) = self.host(ctx.host()) {
            host.write().release(ctx.reserved_ram(), ctx.pid());
        }

        // Post-mortem retention for non-transient jobs
        if !ctx.is_transient() {
            let snapshot = ctx.job().read().clone();
            self.recent().record(snapshot);
        }

        debug!(
            "pid {} torn down, {} GB released on {}",
            ctx.pid(),
            ctx.reserved_ram(),
            ctx.host()
        );
    }
}
