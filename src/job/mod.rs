/*!
 * Job Records
 * Persistent job descriptors and post-mortem retention
 */

pub mod record;
pub mod retention;

pub use record::{HostEarnings, JobRecord, ScriptKey, ScriptSource};
pub use retention::{FinishedJob, RecentJobs};
