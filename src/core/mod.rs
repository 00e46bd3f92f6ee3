/*!
 * Core Module
 * Shared types, errors, limits, and serialization helpers
 */

pub mod errors;
pub mod limits;
pub mod serde;
pub mod types;

pub use errors::{
    AdmissionError, AdmissionResult, EntryError, FrontendError, PortError, PortResult,
    RegistryError, RuntimeError,
};
pub use types::{round_ram, HostId, Pid, PortId, RamGb, RuntimeResult, ScriptArg};
