/*!
 * RAM Meter
 * Dynamic RAM accrual against the static allocation that gated admission.
 * Each distinct call name is charged once; an overrun is fatal.
 */

use crate::core::errors::RuntimeError;
use crate::core::limits::{BASE_RAM_COST, MAX_DYNAMIC_RAM, RAM_DRIFT_FACTOR};
use crate::core::types::{RamGb, RuntimeResult};
use std::collections::HashSet;

/// Per-context dynamic RAM accounting
pub struct RamMeter {
    /// Call names already charged; repeats are free
    charged: HashSet<&'static str>,
    dynamic: RamGb,
}

impl RamMeter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            charged: HashSet::new(),
            dynamic: BASE_RAM_COST,
        }
    }

    #[inline]
    #[must_use]
    pub fn dynamic(&self) -> RamGb {
        self.dynamic
    }

    /// Charge `op` against the running total.
    ///
    /// The first charge of a distinct name adds `cost` (clipped at
    /// `MAX_DYNAMIC_RAM`); the total is then checked against the static
    /// allocation with `RAM_DRIFT_FACTOR` absorbing float drift. An overrun
    /// must kill the owning context: no call path may escape the budget that
    /// admitted it.
    pub fn charge(
        &mut self,
        op: &'static str,
        cost: RamGb,
        static_allocation: RamGb,
    ) -> RuntimeResult<()> {
        if !self.charged.insert(op) {
            return Ok(());
        }
        self.dynamic = (self.dynamic + cost).min(MAX_DYNAMIC_RAM);
        if self.dynamic > static_allocation * RAM_DRIFT_FACTOR {
            return Err(RuntimeError::RamOverrun {
                used: self.dynamic,
                allowed: static_allocation,
            });
        }
        Ok(())
    }
}

impl Default for RamMeter {
    fn default() -> Self {
        Self::new()
    }
}
