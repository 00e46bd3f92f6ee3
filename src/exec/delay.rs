/*!
 * Cooperative Suspension
 * The runtime's suspension points: a timer-based delay and a generic
 * wait-until. A suspended wait races against the context's cancel hook;
 * kill settles the wait with `Killed` instead of letting it run out.
 */

use super::context::{ExecutionContext, WaitToken};
use crate::core::errors::RuntimeError;
use crate::core::types::RuntimeResult;
use std::future::Future;
use std::time::Duration;

/// Clears the pending-wait entry even when the suspension future is dropped
/// mid-wait instead of polled to completion.
struct WaitGuard<'a> {
    ctx: &'a ExecutionContext,
    token: WaitToken,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.ctx.end_suspension(self.token);
    }
}

/// Suspend `ctx` inside `op` until `wait` completes.
///
/// Resolves with the wait's output, or `Err(Killed)` if the context is
/// killed first. The suspended-in marker covers the whole wait and is
/// cleared on either outcome (kill clears it synchronously itself).
pub async fn suspend_on<F>(
    ctx: &ExecutionContext,
    op: &'static str,
    wait: F,
) -> RuntimeResult<F::Output>
where
    F: Future,
{
    let (token, cancelled) = ctx.begin_suspension(op)?;
    let _guard = WaitGuard { ctx, token };
    tokio::select! {
        out = wait => Ok(out),
        // Fired or dropped, either way the owner is being torn down and the
        // wait entry was already cleared by kill.
        _ = cancelled => Err(RuntimeError::Killed),
    }
}

/// Suspend `ctx` inside `op` for `duration`
pub async fn delay(
    ctx: &ExecutionContext,
    op: &'static str,
    duration: Duration,
) -> RuntimeResult<()> {
    suspend_on(ctx, op, tokio::time::sleep(duration)).await
}
