//! # Configuration
//!
//! A minimal key/value configuration store. Typed settings (upload limits,
//! retry policy, mail relay) read from a [`ConfigSnapshot`] and fall back to
//! their defaults when a key is missing or does not parse.
//!
//! ```rust
//! use livebus_core::PlannerConfig;
//! let mut config = PlannerConfig::new();
//!
//! config.set("upload.max_files", "10");
//! assert_eq!(config.snapshot().get_usize("upload.max_files"), Some(10));
//! ```
//!
//! Environment overrides use a prefix and `__` as the separator:
//!
//! ```bash
//! export LIVEBUS__UPLOAD__MAX_FILES=5   # → upload.max_files
//! ```

use std::collections::HashMap;

/// Default environment prefix.
pub const ENV_PREFIX: &str = "LIVEBUS__";

#[derive(Debug, Default)]
pub struct PlannerConfig {
    values: HashMap<String, String>,
}

impl PlannerConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Build a store from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::new();
        config.load_env(ENV_PREFIX);
        config
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Copy every `PREFIX…` environment variable into the store.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
            }
        }
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    map: HashMap<String, String>,
}

impl ConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.trim().parse::<u32>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }

    /// Comma-separated list, blanks dropped.
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}
