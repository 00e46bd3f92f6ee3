/*!
 * Port Manager
 * Process-wide table of numbered mailbox ports. Ports are created lazily on
 * first access and dropped from the table once empty with no waiter pending;
 * they are owned by the simulation, never by any job.
 */

use super::port::{Port, PortValue, WriteSignal};
use crate::core::errors::{PortError, PortResult};
use crate::core::limits::{MAX_PORTS, PORT_CAPACITY};
use crate::core::types::PortId;
use ahash::RandomState;
use dashmap::DashMap;
use log::info;
use std::sync::Arc;

/// Process-wide mailbox table
pub struct PortManager {
    ports: Arc<DashMap<PortId, Port, RandomState>>,
    max_ports: PortId,
    capacity: usize,
}

impl PortManager {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(MAX_PORTS, PORT_CAPACITY)
    }

    #[must_use]
    pub fn with_limits(max_ports: PortId, capacity: usize) -> Self {
        info!(
            "Port manager initialized ({} ports, capacity {} each)",
            max_ports, capacity
        );
        Self {
            ports: Arc::new(DashMap::with_hasher(RandomState::new())),
            max_ports,
            capacity,
        }
    }

    fn validate(&self, id: PortId) -> PortResult<()> {
        if id == 0 || id > self.max_ports {
            return Err(PortError::InvalidPort(id, self.max_ports));
        }
        Ok(())
    }

    /// Blocking-variant write: if the port is full, the oldest value is
    /// evicted and returned to the caller. Wakes the waiter slot.
    pub fn write(&self, id: PortId, value: PortValue) -> PortResult<Option<PortValue>> {
        self.validate(id)?;
        let mut port = self
            .ports
            .entry(id)
            .or_insert_with(|| Port::new(self.capacity));
        let evicted = port.push_evicting(value);
        port.wake();
        Ok(evicted)
    }

    /// Non-blocking write: false (no mutation, no wake) when full
    pub fn try_write(&self, id: PortId, value: PortValue) -> PortResult<bool> {
        self.validate(id)?;
        let mut port = self
            .ports
            .entry(id)
            .or_insert_with(|| Port::new(self.capacity));
        if !port.try_push(value) {
            return Ok(false);
        }
        port.wake();
        Ok(true)
    }

    /// Pop the oldest value, or the empty sentinel. Never errors on empty.
    pub fn read(&self, id: PortId) -> PortResult<PortValue> {
        self.validate(id)?;
        let value = match self.ports.get_mut(&id) {
            Some(mut port) => port.values.pop_front().unwrap_or(PortValue::Empty),
            None => PortValue::Empty,
        };
        self.collect(id);
        Ok(value)
    }

    /// Copy the oldest value without removing it, or the empty sentinel
    pub fn peek(&self, id: PortId) -> PortResult<PortValue> {
        self.validate(id)?;
        Ok(self
            .ports
            .get(&id)
            .and_then(|port| port.values.front().cloned())
            .unwrap_or(PortValue::Empty))
    }

    /// Wait until the next successful write to this port.
    ///
    /// The waiter slot is single: concurrent callers share one settle-once
    /// signal, and the next write resolves every one of them. A caller whose
    /// future is dropped mid-wait disarms the slot when it was the last
    /// sharer, so an abandoned wait cannot pin an empty port in the table.
    pub async fn next_write(&self, id: PortId) -> PortResult<()> {
        self.validate(id)?;
        let signal = {
            let mut port = self
                .ports
                .entry(id)
                .or_insert_with(|| Port::new(self.capacity));
            let signal = Arc::clone(port.waiter.get_or_insert_with(|| Arc::new(WriteSignal::new())));
            signal.add_waiter();
            signal
        };
        let guard = WaiterGuard {
            ports: self,
            id,
            signal,
        };
        guard.signal.wait().await;
        Ok(())
    }

    pub fn clear(&self, id: PortId) -> PortResult<()> {
        self.validate(id)?;
        if let Some(mut port) = self.ports.get_mut(&id) {
            port.values.clear();
        }
        self.collect(id);
        Ok(())
    }

    pub fn len(&self, id: PortId) -> PortResult<usize> {
        self.validate(id)?;
        Ok(self.ports.get(&id).map_or(0, |p| p.values.len()))
    }

    pub fn is_empty(&self, id: PortId) -> PortResult<bool> {
        Ok(self.len(id)? == 0)
    }

    pub fn is_full(&self, id: PortId) -> PortResult<bool> {
        self.validate(id)?;
        Ok(self
            .ports
            .get(&id)
            .is_some_and(|p| p.values.len() >= p.capacity))
    }

    /// Ports currently materialized in the table
    #[must_use]
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// Drop every port regardless of contents (full simulation reset)
    pub fn reset(&self) {
        self.ports.clear();
    }

    /// Drop the port when it holds nothing and nobody is waiting
    fn collect(&self, id: PortId) {
        self.ports.remove_if(&id, |_, port| port.drained());
    }
}

/// Waiter bookkeeping for one `next_write` call.
///
/// Dropped on resolve and on cancellation alike; when the last sharer of an
/// unsettled signal goes away, the slot is disarmed and the port collected.
struct WaiterGuard<'a> {
    ports: &'a PortManager,
    id: PortId,
    signal: Arc<WriteSignal>,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        if !self.signal.remove_waiter() || self.signal.is_settled() {
            return;
        }
        if let Some(mut port) = self.ports.ports.get_mut(&self.id) {
            let armed = port
                .waiter
                .as_ref()
                .is_some_and(|slot| Arc::ptr_eq(slot, &self.signal));
            if armed {
                port.waiter = None;
            }
        }
        self.ports.collect(self.id);
    }
}

impl Default for PortManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PortManager {
    fn clone(&self) -> Self {
        Self {
            ports: Arc::clone(&self.ports),
            max_ports: self.max_ports,
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_read_returns_sentinel() {
        let ports = PortManager::new();
        assert_eq!(ports.read(1).unwrap(), PortValue::Empty);
        assert_eq!(ports.peek(1).unwrap(), PortValue::Empty);
    }

    #[test]
    fn test_invalid_id_rejected() {
        let ports = PortManager::with_limits(10, 5);
        assert!(ports.read(0).is_err());
        assert!(ports.write(11, 1.0.into()).is_err());
    }

    #[test]
    fn test_write_evicts_oldest_past_capacity() {
        let ports = PortManager::with_limits(10, 5);
        for i in 1..=5 {
            assert_eq!(ports.write(1, f64::from(i).into()).unwrap(), None);
        }
        let evicted = ports.write(1, 6.0.into()).unwrap();
        assert_eq!(evicted, Some(PortValue::Num(1.0)));
        for expect in 2..=6 {
            assert_eq!(ports.read(1).unwrap(), PortValue::Num(f64::from(expect)));
        }
    }

    #[test]
    fn test_try_write_full_leaves_contents() {
        let ports = PortManager::with_limits(10, 5);
        for i in 1..=5 {
            assert!(ports.try_write(1, f64::from(i).into()).unwrap());
        }
        assert!(!ports.try_write(1, 6.0.into()).unwrap());
        assert_eq!(ports.len(1).unwrap(), 5);
        assert_eq!(ports.peek(1).unwrap(), PortValue::Num(1.0));
    }

    #[test]
    fn test_lazy_create_and_drained_removal() {
        let ports = PortManager::new();
        assert_eq!(ports.port_count(), 0);
        ports.write(3, "x".into()).unwrap();
        assert_eq!(ports.port_count(), 1);
        ports.read(3).unwrap();
        assert_eq!(ports.port_count(), 0);
    }

    #[tokio::test]
    async fn test_next_write_woken_by_write() {
        let ports = PortManager::new();
        let waiter = {
            let ports = ports.clone();
            tokio::spawn(async move { ports.next_write(2).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        ports.write(2, 7.0.into()).unwrap();
        waiter.await.unwrap().unwrap();
        assert_eq!(ports.read(2).unwrap(), PortValue::Num(7.0));
    }

    #[tokio::test]
    async fn test_one_write_resolves_every_concurrent_waiter() {
        let ports = PortManager::new();
        let first = {
            let ports = ports.clone();
            tokio::spawn(async move { ports.next_write(1).await })
        };
        let second = {
            let ports = ports.clone();
            tokio::spawn(async move { ports.next_write(1).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        ports.write(1, 1.0.into()).unwrap();
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_abandoned_waiter_disarms_slot() {
        let ports = PortManager::new();
        let waiter = {
            let ports = ports.clone();
            tokio::spawn(async move { ports.next_write(6).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(ports.port_count(), 1);

        waiter.abort();
        let _ = waiter.await;
        // Last sharer gone, nothing queued: the port must leave the table
        assert_eq!(ports.port_count(), 0);
    }

    #[tokio::test]
    async fn test_port_with_waiter_survives_drain() {
        let ports = PortManager::new();
        let waiter = {
            let ports = ports.clone();
            tokio::spawn(async move { ports.next_write(4).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        // Empty read while a waiter is pending must not drop the port
        ports.read(4).unwrap();
        assert_eq!(ports.port_count(), 1);
        ports.write(4, 1.0.into()).unwrap();
        waiter.await.unwrap().unwrap();
    }
}
