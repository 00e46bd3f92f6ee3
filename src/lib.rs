/*!
 * jobkernel
 * Script execution and resource-metering runtime: manages the lifecycle of
 * many player-authored jobs running concurrently against simulated hosts,
 * enforces per-host RAM budgets at admission, polices the single-in-flight-
 * call invariant per job, and provides bounded mailbox channels with
 * deterministic cleanup under kill, crash, or host removal.
 */

pub mod core;
pub mod exec;
pub mod host;
pub mod job;
pub mod ports;
pub mod registry;
pub mod runtime;

// Re-exports
pub use crate::core::errors::{
    AdmissionError, EntryError, FrontendError, PortError, RegistryError, RuntimeError,
};
pub use crate::core::types::{HostId, Pid, PortId, RamGb, ScriptArg};
pub use exec::{ExecutionContext, RunState};
pub use host::Host;
pub use job::{FinishedJob, JobRecord, RecentJobs, ScriptKey};
pub use ports::{PortManager, PortValue};
pub use registry::ProcessRegistry;
pub use runtime::{ApiError, ApiHandle, LaunchSpec, Runtime, ScriptFrontend, TableFrontend};
