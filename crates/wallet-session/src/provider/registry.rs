//! Registry of selectable wallet providers

use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::mock::MockProvider;
use super::timeout::TimeoutAdapter;
use super::traits::ProviderAdapter;
use super::types::ProviderInfo;
use crate::settings::Settings;

struct ProviderEntry {
    info: ProviderInfo,
    adapter: Arc<dyn ProviderAdapter>,
}

/// Static catalog mapping provider ids to metadata and backends.
///
/// Iteration follows registration order, which is the display order.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: IndexMap<String, ProviderEntry>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the demo registry: every configured provider is backed by the
    /// mock wallet, bounded by the configured timeout
    pub fn from_settings(settings: &Settings) -> Self {
        let mut registry = Self::new();
        let timeout = Duration::from_secs(settings.provider_timeout_secs);

        for info in &settings.providers {
            let mock: Arc<dyn ProviderAdapter> = Arc::new(MockProvider::from_settings(&settings.mock));
            registry.register(info.clone(), Arc::new(TimeoutAdapter::new(mock, timeout)));
        }

        info!("Registered {} wallet providers", registry.len());
        registry
    }

    /// Register a provider, replacing any previous entry with the same id
    pub fn register(&mut self, info: ProviderInfo, adapter: Arc<dyn ProviderAdapter>) {
        debug!(
            "Registering provider {} ({} backend)",
            info.id,
            adapter.backend_name()
        );
        self.providers
            .insert(info.id.clone(), ProviderEntry { info, adapter });
    }

    /// Builder-style variant of [`register`](Self::register)
    pub fn with_provider(mut self, info: ProviderInfo, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(info, adapter);
        self
    }

    /// Get the backend for a provider id
    pub fn adapter(&self, id: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.providers.get(id).map(|entry| entry.adapter.clone())
    }

    /// Get the metadata for a provider id
    pub fn info(&self, id: &str) -> Option<&ProviderInfo> {
        self.providers.get(id).map(|entry| &entry.info)
    }

    /// List provider metadata in display order
    pub fn list(&self) -> Vec<ProviderInfo> {
        self.providers.values().map(|e| e.info.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
