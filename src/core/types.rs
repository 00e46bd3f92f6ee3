/*!
 * Core Types
 * Common types used across the runtime
 */

use serde::{Deserialize, Serialize};

/// Process ID type
///
/// `0` is reserved as the failed-launch sentinel and is never allocated.
pub type Pid = u32;

/// Mailbox port identifier (valid range `1..=MAX_PORTS`)
pub type PortId = u32;

/// Host identifier (hostname)
pub type HostId = String;

/// RAM quantity in gigabytes
pub type RamGb = f64;

/// Common result type for runtime operations
pub type RuntimeResult<T> = Result<T, super::errors::RuntimeError>;

/// Script argument
///
/// Arguments participate in run identity: two launches of the same file on
/// the same host are duplicates only if their argument vectors match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptArg {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl ScriptArg {
    /// Canonical text form used in script-key identity strings
    #[must_use]
    pub fn canon(&self) -> String {
        match self {
            ScriptArg::Str(s) => s.clone(),
            ScriptArg::Num(n) => n.to_string(),
            ScriptArg::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for ScriptArg {
    fn from(s: &str) -> Self {
        ScriptArg::Str(s.to_string())
    }
}

impl From<f64> for ScriptArg {
    fn from(n: f64) -> Self {
        ScriptArg::Num(n)
    }
}

impl From<bool> for ScriptArg {
    fn from(b: bool) -> Self {
        ScriptArg::Bool(b)
    }
}

/// Round a RAM quantity to fixed precision.
///
/// Applied wherever paired reserve/release arithmetic could accumulate
/// float drift on a host's `ram_used` counter.
#[inline]
#[must_use]
pub fn round_ram(ram: RamGb) -> RamGb {
    (ram * 1_000_000.0).round() / 1_000_000.0
}
