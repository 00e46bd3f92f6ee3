/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::types::{Pid, PortId, RamGb};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Context-terminating signals and guard failures
///
/// Only these variants may end a context involuntarily; everything else in
/// this module is reported via return value and log line.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum RuntimeError {
    /// Cooperative-cancellation signal. Not a failure: the normal shutdown
    /// path for a context being torn down.
    #[error("killed")]
    #[diagnostic(
        code(runtime::killed),
        help("The context was torn down. This is the normal shutdown signal, not a fault.")
    )]
    Killed,

    #[error("concurrent call to {requested} while still inside {current}")]
    #[diagnostic(
        code(runtime::concurrency_violation),
        help("A job may have only one guarded call in flight. Await the previous call before issuing the next.")
    )]
    ConcurrencyViolation {
        current: String,
        requested: String,
    },

    #[error("dynamic RAM usage {used} GB exceeded static allocation {allowed} GB")]
    #[diagnostic(
        code(runtime::ram_overrun),
        help("The script called something its declared RAM budget does not cover. Re-run the static analyzer or raise the override.")
    )]
    RamOverrun { used: RamGb, allowed: RamGb },
}

impl RuntimeError {
    /// Whether this error is the cooperative shutdown signal
    #[inline]
    #[must_use]
    pub const fn is_killed(&self) -> bool {
        matches!(self, RuntimeError::Killed)
    }
}

/// Admission failures: non-fatal, mapped to a `0` PID plus a log line at the
/// public launch surface. No state is mutated when any of these is returned.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum AdmissionError {
    #[error("host {0} not found")]
    #[diagnostic(code(admission::host_not_found))]
    HostNotFound(String),

    #[error("script {file} not found on {host}")]
    #[diagnostic(
        code(admission::script_not_found),
        help("The target host has no file by that name.")
    )]
    ScriptNotFound { file: String, host: String },

    #[error("script {file} already running on {host} with identical args")]
    #[diagnostic(
        code(admission::duplicate),
        help("Launch was requested with duplicate prevention; kill the existing run or vary the args.")
    )]
    Duplicate { file: String, host: String },

    #[error("static RAM of {0} could not be computed")]
    #[diagnostic(
        code(admission::uncomputable_ram),
        help("The analyzer returned nothing for this file; it is likely syntactically broken.")
    )]
    UncomputableRam(String),

    #[error("RAM override {given} GB is below the minimum of {min} GB")]
    #[diagnostic(code(admission::ram_override_too_low))]
    RamOverrideTooLow { given: RamGb, min: RamGb },

    #[error("no admin rights on {0}")]
    #[diagnostic(
        code(admission::no_admin_rights),
        help("Root access must be gained on the target host before running scripts there.")
    )]
    NoAdminRights(String),

    #[error("insufficient RAM: need {needed} GB, {available} GB free")]
    #[diagnostic(
        code(admission::insufficient_ram),
        help("Free RAM on the host by killing jobs, or lower the thread count.")
    )]
    InsufficientRam { needed: RamGb, available: RamGb },

    #[error("no free PID available")]
    #[diagnostic(
        code(admission::pid_exhausted),
        help("Every PID in the allocation range is held by a live context.")
    )]
    PidExhausted,
}

/// Admission operation result
pub type AdmissionResult<T> = Result<T, AdmissionError>;

/// PID allocator errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum RegistryError {
    #[error("PID space exhausted")]
    #[diagnostic(code(registry::exhausted))]
    Exhausted,

    #[error("process {0} not found")]
    #[diagnostic(code(registry::not_found))]
    NotFound(Pid),
}

/// Mailbox port errors
///
/// Reading or peeking an empty port is NOT an error (it returns the empty
/// sentinel); only an out-of-range id is.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum PortError {
    #[error("invalid port id {0} (valid range 1..={1})")]
    #[diagnostic(
        code(port::invalid_id),
        help("Port ids are bounded positive integers.")
    )]
    InvalidPort(PortId, PortId),
}

/// Port operation result
pub type PortResult<T> = Result<T, PortError>;

/// Errors surfacing from the external language front-end
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum FrontendError {
    #[error("compile failed: {0}")]
    #[diagnostic(code(frontend::compile_failed))]
    CompileFailed(String),
}

/// Completion signal of a job's top-level entrypoint
///
/// Anything other than `Killed` surfacing from the entrypoint is treated as
/// natural (if unclean) completion and triggers the same teardown as success.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum EntryError {
    #[error("killed")]
    #[diagnostic(code(entry::killed))]
    Killed,

    #[error("runtime error: {0}")]
    #[diagnostic(code(entry::runtime_error))]
    Unknown(String),
}

impl From<RuntimeError> for EntryError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Killed => EntryError::Killed,
            other => EntryError::Unknown(other.to_string()),
        }
    }
}
