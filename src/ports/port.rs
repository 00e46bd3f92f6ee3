/*!
 * Mailbox Port
 * One bounded, numbered FIFO with a single-slot wake notification.
 */

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Value carried through a port
///
/// `Empty` is the fixed empty-read sentinel: read and peek return it on an
/// empty port instead of raising an error. It is never enqueued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Empty,
    Num(f64),
    Str(String),
}

impl PortValue {
    #[inline]
    #[must_use]
    pub const fn is_empty_sentinel(&self) -> bool {
        matches!(self, PortValue::Empty)
    }
}

impl From<f64> for PortValue {
    fn from(n: f64) -> Self {
        PortValue::Num(n)
    }
}

impl From<&str> for PortValue {
    fn from(s: &str) -> Self {
        PortValue::Str(s.to_string())
    }
}

/// Settle-once notification shared by every waiter on one port.
///
/// The next successful write settles the signal; all sharers resolve, and a
/// sharer that arrives after the settle resolves immediately. Settled is
/// terminal, so a slow waiter cannot miss the wake.
pub(super) struct WriteSignal {
    settled: AtomicBool,
    waiters: AtomicUsize,
    notify: Notify,
}

impl WriteSignal {
    pub fn new() -> Self {
        Self {
            settled: AtomicBool::new(false),
            waiters: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    /// Mark the write as having happened and wake every registered waiter
    pub fn settle(&self) {
        self.settled.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    pub fn add_waiter(&self) {
        self.waiters.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns true when this was the last waiter holding the signal
    pub fn remove_waiter(&self) -> bool {
        self.waiters.fetch_sub(1, Ordering::AcqRel) == 1
    }

    /// Resolve once settled. Registers with the notifier before checking the
    /// flag, so a settle between the two cannot be lost.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_settled() {
            return;
        }
        notified.await;
    }
}

/// Port state: bounded value queue plus the waiter slot
pub(super) struct Port {
    pub values: VecDeque<PortValue>,
    pub capacity: usize,
    /// Single-slot next-write signal; armed lazily by the first waiter and
    /// shared by every concurrent one
    pub waiter: Option<Arc<WriteSignal>>,
}

impl Port {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::new(),
            capacity,
            waiter: None,
        }
    }

    /// Push a value, evicting and returning the oldest when over capacity
    pub fn push_evicting(&mut self, value: PortValue) -> Option<PortValue> {
        self.values.push_back(value);
        if self.values.len() > self.capacity {
            self.values.pop_front()
        } else {
            None
        }
    }

    /// Push only if there is room
    pub fn try_push(&mut self, value: PortValue) -> bool {
        if self.values.len() >= self.capacity {
            return false;
        }
        self.values.push_back(value);
        true
    }

    /// Drain the waiter slot, settling the shared signal for every sharer
    pub fn wake(&mut self) {
        if let Some(signal) = self.waiter.take() {
            signal.settle();
        }
    }

    /// Whether the port may be dropped from the table
    pub fn drained(&self) -> bool {
        self.values.is_empty() && self.waiter.is_none()
    }
}
