//! Namespaced cache key generation.
//!
//! Keys have the shape `prefix:type:param1:param2:...`. Parameter tokens
//! are sanitized (lower-cased, non-alphanumerics collapsed to `-`) so
//! that semantically identical queries always produce the same key
//! regardless of incidental formatting differences in their inputs.

use serde::{Deserialize, Serialize};

/// Cache key namespaces, one per data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheNamespace {
    /// Core practice-management database.
    Core,
    /// Instructions database.
    Instructions,
    /// External Clio API responses.
    Clio,
    /// Cross-database aggregated data.
    Unified,
}

impl CacheNamespace {
    /// Short prefix used in stored keys.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Core => "hc",
            Self::Instructions => "inst",
            Self::Clio => "clio",
            Self::Unified => "unified",
        }
    }
}

/// Build a deterministic namespaced cache key.
///
/// Empty parameters are skipped; the rest are sanitized in order.
pub fn generate_cache_key(namespace: CacheNamespace, kind: &str, params: &[&str]) -> String {
    let clean: Vec<String> = params
        .iter()
        .filter(|param| !param.trim().is_empty())
        .map(|param| sanitize_token(param))
        .collect();
    format!("{}:{}:{}", namespace.prefix(), kind, clean.join(":"))
}

fn sanitize_token(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}
