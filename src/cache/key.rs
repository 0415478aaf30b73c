//! Deterministic cache key derivation.
//!
//! Identical logical calls must always hit the same key: the namespace,
//! positional arguments, and keyword arguments are canonicalized (kwargs
//! sorted by name), serialized to JSON, and hashed with SHA-256. The final key
//! is `{prefix}:{namespace}:{hex digest}` so operators can attribute keys to a
//! namespace at a glance.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Positional and keyword arguments identifying one logical cache entry.
#[derive(Debug, Clone, Default)]
pub struct KeyParts {
    args: Vec<Value>,
    kwargs: BTreeMap<String, Value>,
}

impl KeyParts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kw(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }
}

#[derive(Serialize)]
struct Canonical<'a> {
    namespace: &'a str,
    args: &'a [Value],
    // BTreeMap serializes in key order, which gives the sorted-kwargs form.
    kwargs: &'a BTreeMap<String, Value>,
}

/// Derive the storage key for `(namespace, parts)` under `prefix`.
pub fn derive_key(prefix: &str, namespace: &str, parts: &KeyParts) -> String {
    let canonical = Canonical {
        namespace,
        args: &parts.args,
        kwargs: &parts.kwargs,
    };
    // Serializing JSON values back to JSON cannot fail.
    let encoded = serde_json::to_vec(&canonical).expect("canonical key form is valid JSON");
    let digest = Sha256::digest(&encoded);
    format!("{}:{}:{}", prefix, namespace, hex::encode(digest))
}
