/*!
 * Concurrency Guard
 * Single-in-flight-call enforcement plus the cooperative stop check.
 * Every exposed operation must pass through here before doing any work.
 */

use super::context::ExecutionContext;
use crate::core::errors::RuntimeError;
use crate::core::types::RuntimeResult;

/// The one operation allowed to overlap a pending suspension.
///
/// Sleeping concurrently with a suspended call is harmless; everything else
/// indicates two logically-overlapping calls from the same job, which the
/// cooperative model cannot support.
pub const NONEXCLUSIVE_OP: &str = "sleep";

/// Check the guard for `op` on `ctx`.
///
/// - stop flag set: fails with `Killed`, no side effects;
/// - another call is suspended and `op` is exclusive: `ConcurrencyViolation`
///   (the caller must treat this as fatal and kill the owner);
/// - otherwise the call may proceed. Suspending operations set the
///   suspended-in marker for the duration of their wait.
pub fn check(ctx: &ExecutionContext, op: &'static str) -> RuntimeResult<()> {
    if ctx.is_stopped() {
        return Err(RuntimeError::Killed);
    }
    if let Some(current) = ctx.suspended_in() {
        if op != NONEXCLUSIVE_OP {
            return Err(RuntimeError::ConcurrencyViolation {
                current: current.to_string(),
                requested: op.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobRecord;
    use parking_lot::RwLock;
    use std::sync::Arc;

    fn ctx() -> ExecutionContext {
        let job = Arc::new(RwLock::new(
            JobRecord::new("w.js", "home", vec![], 1).with_ram(2.0),
        ));
        ExecutionContext::new(1, job, 2.0)
    }

    #[test]
    fn test_stopped_context_fails_killed() {
        let ctx = ctx();
        ctx.mark_stopped();
        assert_eq!(check(&ctx, "exec"), Err(RuntimeError::Killed));
    }

    #[test]
    fn test_overlap_is_violation() {
        let ctx = ctx();
        let _wait = ctx.begin_suspension("hack").unwrap();
        let err = check(&ctx, "exec").unwrap_err();
        assert!(matches!(err, RuntimeError::ConcurrencyViolation { .. }));
    }

    #[test]
    fn test_sleep_may_overlap() {
        let ctx = ctx();
        let _wait = ctx.begin_suspension("hack").unwrap();
        assert!(check(&ctx, NONEXCLUSIVE_OP).is_ok());
    }

    #[test]
    fn test_clear_slot_allows_next_call() {
        let ctx = ctx();
        let (token, _rx) = ctx.begin_suspension("hack").unwrap();
        ctx.end_suspension(token);
        assert!(check(&ctx, "exec").is_ok());
    }
}
