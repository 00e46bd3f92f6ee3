/*!
 * Language Front-End Seam
 * The runtime never interprets source text itself: a front-end supplies the
 * static RAM cost of a script and compiles it into an executable entrypoint.
 */

use super::api::ApiHandle;
use crate::core::errors::{EntryError, FrontendError};
use crate::core::types::RamGb;
use ahash::RandomState;
use dashmap::DashMap;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Completion future of one job's top-level work
pub type EntryFuture = BoxFuture<'static, Result<(), EntryError>>;

/// Compiled entrypoint: called once with the exposed API surface
pub type Entrypoint = Box<dyn FnOnce(ApiHandle) -> EntryFuture + Send>;

/// External language front-end / static-cost analyzer
pub trait ScriptFrontend: Send + Sync {
    /// Fixed memory allocation of a script, or `None` for an uncomputable
    /// (e.g. syntax-broken) file. `None` is an admission failure.
    fn resolve_static_ram(&self, filename: &str, source: &str) -> Option<RamGb>;

    /// Compile a script's source into its entrypoint
    fn compile_entrypoint(&self, filename: &str, source: &str)
        -> Result<Entrypoint, FrontendError>;
}

/// Body of one registered script
pub type ScriptBody = Arc<dyn Fn(ApiHandle) -> EntryFuture + Send + Sync>;

/// Table-driven front-end: scripts are registered as (RAM cost, body) pairs
/// keyed by filename. Used for embedding and throughout the test suite;
/// a real interpreter front-end implements `ScriptFrontend` directly.
pub struct TableFrontend {
    scripts: DashMap<String, (RamGb, ScriptBody), RandomState>,
}

impl TableFrontend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scripts: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Register a script body with its declared static RAM
    pub fn register<F>(&self, filename: &str, static_ram: RamGb, body: F)
    where
        F: Fn(ApiHandle) -> EntryFuture + Send + Sync + 'static,
    {
        self.scripts
            .insert(filename.to_string(), (static_ram, Arc::new(body)));
    }
}

impl Default for TableFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptFrontend for TableFrontend {
    fn resolve_static_ram(&self, filename: &str, _source: &str) -> Option<RamGb> {
        self.scripts.get(filename).map(|e| e.value().0)
    }

    fn compile_entrypoint(
        &self,
        filename: &str,
        _source: &str,
    ) -> Result<Entrypoint, FrontendError> {
        let body = self
            .scripts
            .get(filename)
            .map(|e| Arc::clone(&e.value().1))
            .ok_or_else(|| FrontendError::CompileFailed(format!("unknown script {filename}")))?;
        Ok(Box::new(move |api| body(api)))
    }
}
