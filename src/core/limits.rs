/*!
 * Runtime Limits and Constants
 *
 * Centralized location for all runtime-wide limits, thresholds, and magic
 * numbers. Organized by domain for maintainability and discoverability.
 */

use crate::core::types::RamGb;

// =============================================================================
// RAM METERING
// =============================================================================

/// Baseline dynamic RAM every execution context starts with (GB)
/// Covers the interpreter scaffolding before any call is charged
pub const BASE_RAM_COST: RamGb = 1.6;

/// Ceiling on a context's accrued dynamic RAM (GB)
/// Dynamic usage is clipped here; the overrun check fires long before this
/// on any sanely-sized script
pub const MAX_DYNAMIC_RAM: RamGb = 1024.0;

/// Multiplier applied to the static allocation in the overrun comparison.
/// Absorbs float drift from summing many small charges; not a behavioral
/// allowance. The exact value is inherited, not derived.
pub const RAM_DRIFT_FACTOR: f64 = 1.000_000_000_000_01;

/// Additive tolerance in the admission headroom comparison (GB).
/// Absorbs float rounding in `max_ram - ram_used`; not a real grant.
pub const RAM_COMPARE_EPSILON: f64 = 1e-5;

// =============================================================================
// PROCESS LIMITS
// =============================================================================

/// Highest PID the allocator will hand out before wrapping to 1
pub const PID_MAX: u32 = 1 << 24;

// =============================================================================
// MAILBOX PORTS
// =============================================================================

/// Number of addressable mailbox ports (ids `1..=MAX_PORTS`)
pub const MAX_PORTS: u32 = 100;

/// Default per-port value capacity
/// Blocking writes past this evict the oldest value
pub const PORT_CAPACITY: usize = 50;

// =============================================================================
// JOB BOOKKEEPING
// =============================================================================

/// Lines retained in a job's log ring before the oldest is dropped
pub const LOG_RING_CAPACITY: usize = 50;

/// Terminated jobs retained for post-mortem inspection, most recent first
pub const RECENT_JOBS_CAPACITY: usize = 50;
