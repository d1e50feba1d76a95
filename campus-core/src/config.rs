//! # Configuration
//!
//! A minimal string key/value store, in the `app.set()` / `app.get()`
//! style. Binaries layer values from defaults, `.env` files and the
//! environment; the app freezes them into a [`CampusConfigSnapshot`].
//!
//! ```rust
//! use campus_core::CampusConfig;
//! let mut config = CampusConfig::new();
//! config.set("http.port", "3001");
//! assert_eq!(config.get("http.port"), Some("3001"));
//! ```
//!
//! Environment overrides use a prefix and `__` as the path separator:
//!
//! ```bash
//! export CAMPUS__HTTP__PORT=8080   # → http.port
//! ```

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct CampusConfig {
    values: HashMap<String, String>,
}

impl CampusConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Set a key only when it has no value yet.
    pub fn set_default<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> CampusConfigSnapshot {
        CampusConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CampusConfigSnapshot {
    map: HashMap<String, String>,
}

impl CampusConfigSnapshot {
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

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.trim().parse::<u32>().ok())
    }

    /// Comma-separated list, trimmed, empty items dropped.
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|v| {
            v.split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

/// Copy `PREFIX…` variables from an iterator of (key, value) pairs into the
/// config: `CAMPUS__DATABASE__URL` → `database.url`.
pub fn load_env_config<I>(config: &mut CampusConfig, prefix: &str, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        if let Some(stripped) = key.strip_prefix(prefix) {
            let normalized = stripped.to_lowercase().replace("__", ".");
            if !normalized.is_empty() {
                config.set(normalized, value);
            }
        }
    }
}
