/*!
 * Job Record
 * Persistent descriptor of one script invocation: file, args, threads,
 * RAM-per-thread, and accumulated stats. Outlives any single execution
 * context and is what gets persisted.
 */

use crate::core::serde::{is_empty_map, is_empty_vec, is_zero_f64};
use crate::core::types::{HostId, Pid, RamGb, ScriptArg};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Canonical `(filename, args)` identity of one run on a host
///
/// Two launches collide under duplicate prevention only when their keys are
/// equal on the same host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptKey(String);

impl ScriptKey {
    #[must_use]
    pub fn new(filename: &str, args: &[ScriptArg]) -> Self {
        let mut key = String::from(filename);
        for arg in args {
            key.push('\u{1f}'); // unit separator: cannot appear in canon forms
            key.push_str(&arg.canon());
        }
        ScriptKey(key)
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Per-host earnings accumulated by one job
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HostEarnings {
    #[serde(skip_serializing_if = "is_zero_f64", default)]
    pub money: f64,
    #[serde(skip_serializing_if = "is_zero_f64", default)]
    pub exp: f64,
}

/// Source snapshot of a script the job depends on (imports included)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScriptSource {
    pub filename: String,
    pub code: String,
}

/// Persistent descriptor of one script invocation
///
/// Created when a script is first launched (explicit run, boot-time autoexec,
/// or restore from save); retired only by explicit removal. The `pid` field
/// points at the execution context currently running it and is meaningless
/// when none is live, so it is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JobRecord {
    pub filename: String,
    pub host: HostId,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub args: Vec<ScriptArg>,
    pub threads: u32,
    pub ram_per_thread: RamGb,

    #[serde(skip_serializing_if = "is_zero_f64", default)]
    pub online_money: f64,
    #[serde(skip_serializing_if = "is_zero_f64", default)]
    pub online_exp: f64,
    #[serde(skip_serializing_if = "is_zero_f64", default)]
    pub offline_money: f64,
    #[serde(skip_serializing_if = "is_zero_f64", default)]
    pub offline_exp: f64,
    #[serde(skip_serializing_if = "is_zero_f64", default)]
    pub online_runtime_secs: f64,
    #[serde(skip_serializing_if = "is_zero_f64", default)]
    pub offline_runtime_secs: f64,

    /// Per-host hacking earnings breakdown
    #[serde(skip_serializing_if = "is_empty_map", default)]
    pub data_map: HashMap<HostId, HostEarnings>,

    /// Bounded ring of log lines, oldest dropped first
    #[serde(default)]
    pub logs: VecDeque<String>,

    /// Source snapshots this run was compiled from
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub dependencies: Vec<ScriptSource>,

    /// Live-run linkage only; rebuilt on every launch
    #[serde(skip, default)]
    pub pid: Pid,

    /// Transient jobs never enter the recently-finished buffer
    #[serde(skip, default)]
    pub transient: bool,
}

impl JobRecord {
    #[must_use]
    pub fn new(filename: &str, host: &str, args: Vec<ScriptArg>, threads: u32) -> Self {
        Self {
            filename: filename.to_string(),
            host: host.to_string(),
            args,
            threads: threads.max(1),
            ram_per_thread: 0.0,
            online_money: 0.0,
            online_exp: 0.0,
            offline_money: 0.0,
            offline_exp: 0.0,
            online_runtime_secs: 0.0,
            offline_runtime_secs: 0.0,
            data_map: HashMap::new(),
            logs: VecDeque::new(),
            dependencies: Vec::new(),
            pid: 0,
            transient: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_ram(mut self, ram_per_thread: RamGb) -> Self {
        self.ram_per_thread = ram_per_thread;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_transient(mut self, transient: bool) -> Self {
        self.transient = transient;
        self
    }

    /// Run identity on its host
    #[inline]
    #[must_use]
    pub fn key(&self) -> ScriptKey {
        ScriptKey::new(&self.filename, &self.args)
    }

    /// Total RAM this run reserves on its host
    #[inline]
    #[must_use]
    pub fn total_ram(&self) -> RamGb {
        self.ram_per_thread * f64::from(self.threads)
    }

    /// Append a log line, dropping the oldest past capacity
    pub fn log(&mut self, line: impl Into<String>) {
        if self.logs.len() >= crate::core::limits::LOG_RING_CAPACITY {
            self.logs.pop_front();
        }
        self.logs.push_back(line.into());
    }

    /// Credit money/exp earned against a target host
    pub fn record_earnings(&mut self, target: &str, money: f64, exp: f64) {
        self.online_money += money;
        self.online_exp += exp;
        let entry = self.data_map.entry(target.to_string()).or_default();
        entry.money += money;
        entry.exp += exp;
    }
}
