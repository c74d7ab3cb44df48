//! Namespace-keyed profiler instances shared across a process.

use parking_lot::Mutex;

use std::collections::HashMap;
use std::sync::Arc;

use crate::{Profiler, ProfilerConfig, ProfilerResult};

pub type SharedProfiler = Arc<Mutex<Profiler>>;

/// Owns one profiler per namespace. Owned by the application and passed to
/// whatever needs a profiler, rather than reached through a global.
#[derive(Default)]
pub struct ProfilerRegistry {
    config: ProfilerConfig,
    instances: Mutex<HashMap<String, SharedProfiler>>,
}

impl ProfilerRegistry {
    pub fn new(config: ProfilerConfig) -> Self {
        Self {
            config,
            instances: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Returns the namespace's profiler, creating it with the registry config
    /// on first use.
    pub fn get_or_create(&self, namespace: &str) -> ProfilerResult<SharedProfiler> {
        self.get_or_create_with(namespace, || self.config.clone())
    }

    /// Like `get_or_create`, but a new instance uses the config from `make`.
    /// An existing instance keeps its config.
    pub fn get_or_create_with(
        &self,
        namespace: &str,
        make: impl FnOnce() -> ProfilerConfig,
    ) -> ProfilerResult<SharedProfiler> {
        let mut instances = self.instances.lock();
        if let Some(existing) = instances.get(namespace) {
            return Ok(Arc::clone(existing));
        }
        let created = Arc::new(Mutex::new(Profiler::new(namespace, make())?));
        instances.insert(namespace.to_string(), Arc::clone(&created));
        tracing::debug!("created profiler for namespace {namespace:?}");
        Ok(created)
    }

    /// Replaces the namespace's profiler with a fresh one for the next unit
    /// of work. Holders of the old handle keep the old instance.
    pub fn reset(&self, namespace: &str) -> ProfilerResult<SharedProfiler> {
        let fresh = Arc::new(Mutex::new(Profiler::new(namespace, self.config.clone())?));
        self.instances
            .lock()
            .insert(namespace.to_string(), Arc::clone(&fresh));
        Ok(fresh)
    }

    pub fn remove(&self, namespace: &str) -> Option<SharedProfiler> {
        self.instances.lock().remove(namespace)
    }

    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.instances.lock().keys().cloned().collect();
        names.sort();
        names
    }
}
