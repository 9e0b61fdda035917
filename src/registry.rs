use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::validator::{RegistryError, SchemaRegistry};

/// Table prefix the form builder gives generated form tables.
pub const DEFAULT_TABLE_PREFIX: &str = "app_fd_";

/// Fixed form → table mapping, optionally falling back to `<prefix><form_id>`.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    tables: HashMap<String, String>,
    fallback_prefix: Option<String>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, form_id: impl Into<String>, table: impl Into<String>) -> Self {
        self.tables.insert(form_id.into(), table.into());
        self
    }

    pub fn with_fallback_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.fallback_prefix = Some(prefix.into());
        self
    }
}

#[async_trait]
impl SchemaRegistry for StaticRegistry {
    async fn resolve_table_name(&self, form_id: &str) -> Result<String, RegistryError> {
        if let Some(table) = self.tables.get(form_id) {
            return Ok(table.clone());
        }
        match &self.fallback_prefix {
            Some(prefix) if !form_id.is_empty() => Ok(format!("{prefix}{form_id}")),
            _ => Err(RegistryError::UnknownForm(form_id.to_string())),
        }
    }
}

/// Memoizes another registry. The cache belongs to whoever owns this value,
/// not to any validator, and is dropped with it or by `invalidate`/`clear`.
pub struct CachedRegistry<R> {
    inner: R,
    cache: DashMap<String, String>,
}

impl<R: SchemaRegistry> CachedRegistry<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    pub fn invalidate(&self, form_id: &str) {
        self.cache.remove(form_id);
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl<R: SchemaRegistry> SchemaRegistry for CachedRegistry<R> {
    async fn resolve_table_name(&self, form_id: &str) -> Result<String, RegistryError> {
        if let Some(table) = self.cache.get(form_id) {
            return Ok(table.value().clone());
        }
        let table = self.inner.resolve_table_name(form_id).await?;
        debug!(form_id, table = %table, "cached table name");
        self.cache.insert(form_id.to_string(), table.clone());
        Ok(table)
    }
}
