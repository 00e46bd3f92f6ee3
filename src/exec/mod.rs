/*!
 * Execution Contexts
 * Live run state, concurrency guard, RAM meter, and cooperative suspension
 */

pub mod context;
pub mod delay;
pub mod guard;
pub mod meter;

pub use context::{ExecutionContext, ExitHook, RunState, WaitToken};
pub use delay::delay;
pub use meter::RamMeter;
