// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Global configuration - single source of truth for parcel and dispatch limits.
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: Compile-time constants (buffer ceilings, array ceilings,
//!   wire markers, ashmem bounds, wait-time defaults)
//! - **Level 2 (Dynamic)**: `RuntimeConfig` for dispatcher settings and user keys,
//!   optionally loaded from YAML
//!
//! # Example
//!
//! ```ignore
//! use parcel_rpc::config::*;
//!
//! assert_eq!(MAX_STRING_LEN, 40 * 1024);
//!
//! let config = RuntimeConfig::new();
//! config.set_dispatch(DispatchConfig { worker_threads: 2, ..DispatchConfig::default() });
//! config.set_user("app.trace_requests", "true");
//! ```

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

// =======================================================================
// Parcel buffer limits
// =======================================================================

/// Hard ceiling for parcel capacity (4 GiB - 1).
///
/// Every request past this point fails with `CapacityExceeded` and leaves the
/// parcel untouched.
pub const MAX_PARCEL_CAPACITY: usize = u32::MAX as usize;

/// Minimum capacity step when a write forces the buffer to grow.
pub const MIN_GROWTH_STEP: usize = 64;

/// Alignment applied to grown capacities.
pub const CAPACITY_ALIGNMENT: usize = 8;

/// Alignment of every item written into the parcel.
pub const SLOT_ALIGNMENT: usize = 4;

/// Capacity of the bulk raw-data channel (128 MiB). Fixed per parcel.
pub const RAW_DATA_CAPACITY: usize = 128 * 1024 * 1024;

// =======================================================================
// Element ceilings (counts, not bytes)
// =======================================================================

/// Maximum UTF-16 units in one string or interface token.
pub const MAX_STRING_LEN: usize = 40 * 1024;

/// Maximum elements in a byte array.
pub const MAX_BYTE_ARRAY_LEN: usize = 40 * 1024;

/// Maximum elements in a boolean, char, short or int array.
pub const MAX_SMALL_ARRAY_LEN: usize = 50 * 1024;

/// Maximum elements in a long, float or double array.
pub const MAX_WIDE_ARRAY_LEN: usize = 25 * 1024;

/// Maximum elements in a string array.
pub const MAX_STRING_ARRAY_LEN: usize = 10 * 1024;

/// Maximum elements in a sequenceable or remote-object array.
pub const MAX_OBJECT_ARRAY_LEN: usize = 10 * 1024;

// =======================================================================
// Wire markers
// =======================================================================

const fn pack_chars(c1: u8, c2: u8, c3: u8, c4: u8) -> i32 {
    (((c1 as u32) << 24) | ((c2 as u32) << 16) | ((c3 as u32) << 8) | (c4 as u32)) as i32
}

const TYPE_LARGE: u8 = 0x85;

/// Marker preceding an embedded remote-object handle.
pub const BINDER_MARKER: i32 = pack_chars(b's', b'b', b'*', TYPE_LARGE);

/// Marker preceding an embedded file descriptor.
pub const FD_MARKER: i32 = pack_chars(b'f', b'd', b'*', TYPE_LARGE);

/// Marker preceding an embedded shared-memory region.
pub const ASHMEM_MARKER: i32 = pack_chars(b'a', b's', b'h', TYPE_LARGE);

/// Marker preceding a raw-data block reference.
pub const RAW_DATA_MARKER: i32 = pack_chars(b'r', b'a', b'w', TYPE_LARGE);

/// Strict-mode header written in front of every interface token.
pub const STRICT_MODE_POLICY: i32 = 0x100;

// =======================================================================
// Ashmem bounds
// =======================================================================

/// Exclusive upper bound for an ashmem region size (2 GiB).
pub const ASHMEM_MAX_SIZE: usize = 1 << 31;

/// Maximum ashmem name length in bytes.
pub const ASHMEM_NAME_MAX: usize = 255;

// =======================================================================
// Dispatch timing
// =======================================================================

/// Default synchronous wait time (8 seconds).
pub const DEFAULT_WAIT_TIME: Duration = Duration::from_secs(8);

/// Floor for the wait time; smaller values are raised to it.
pub const MIN_WAIT_TIME: Duration = Duration::from_millis(100);

/// Ceiling for the wait time.
pub const MAX_WAIT_TIME: Duration = Duration::from_secs(3000);

/// Default number of worker threads serving one stub.
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Device id reported for in-process calls when none is configured.
pub const DEFAULT_LOCAL_DEVICE_ID: &str = "local";

// =======================================================================
// Runtime Configuration
// =======================================================================

/// Dispatcher settings read when a stub starts its workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Worker threads per stub (clamped to at least 1).
    pub worker_threads: usize,
    /// Wait time used by `MessageOption::default()`.
    pub default_wait_time: Duration,
    /// Device id reported by `IpcSkeleton::local_device_id()`.
    pub local_device_id: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            worker_threads: DEFAULT_WORKER_THREADS,
            default_wait_time: DEFAULT_WAIT_TIME,
            local_device_id: DEFAULT_LOCAL_DEVICE_ID.to_string(),
        }
    }
}

/// Error raised while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    Io(std::io::Error),
    /// Document could not be parsed.
    Parse(String),
    /// A value is outside its allowed range.
    InvalidValue { key: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read configuration: {}", e),
            Self::Parse(msg) => write!(f, "failed to parse configuration: {}", msg),
            Self::InvalidValue { key, reason } => {
                write!(f, "invalid configuration value for '{}': {}", key, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Shared runtime configuration.
///
/// - `ArcSwap` holds the dispatch settings (atomic replace, lock-free reads)
/// - `DashMap` holds free-form `user.*` / `app.*` keys
///
/// Cloning is cheap (two `Arc` increments) and clones share state.
#[derive(Clone)]
pub struct RuntimeConfig {
    dispatch: Arc<ArcSwap<DispatchConfig>>,
    user: Arc<DashMap<Arc<str>, Arc<str>>>,
}

static GLOBAL_CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

impl RuntimeConfig {
    /// Create a config holding the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dispatch: Arc::new(ArcSwap::from_pointee(DispatchConfig::default())),
            user: Arc::new(DashMap::new()),
        }
    }

    /// Process-wide config used by stubs created without an explicit one.
    pub fn global() -> &'static RuntimeConfig {
        GLOBAL_CONFIG.get_or_init(RuntimeConfig::new)
    }

    /// Snapshot of the dispatch settings.
    #[inline]
    #[must_use]
    pub fn dispatch(&self) -> Arc<DispatchConfig> {
        self.dispatch.load_full()
    }

    /// Replace the dispatch settings. Running workers keep their thread count.
    pub fn set_dispatch(&self, config: DispatchConfig) {
        self.dispatch.store(Arc::new(config));
    }

    /// Set a user-land key. Keys outside `user.*` / `app.*` are logged and skipped.
    pub fn set_user(&self, key: &str, value: &str) {
        if !is_user_key(key) {
            log::error!(
                "[config] user keys must start with 'user.' or 'app.', got '{}'; skipping",
                key
            );
            return;
        }
        self.user.insert(Arc::from(key), Arc::from(value));
    }

    /// Get a user-land key.
    #[must_use]
    pub fn get_user(&self, key: &str) -> Option<Arc<str>> {
        if !is_user_key(key) {
            log::warn!("[config] get_user() called with non-user key '{}'", key);
            return None;
        }
        self.user.get(key).map(|v| Arc::clone(&v))
    }

    /// Remove a user-land key.
    pub fn remove_user(&self, key: &str) -> Option<Arc<str>> {
        if !is_user_key(key) {
            return None;
        }
        self.user.remove(key).map(|(_, v)| v)
    }

    /// All user-land entries starting with `prefix`.
    #[must_use]
    pub fn search_user_prefix(&self, prefix: &str) -> Vec<(Arc<str>, Arc<str>)> {
        self.user
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| (Arc::clone(entry.key()), Arc::clone(entry.value())))
            .collect()
    }

    /// Number of user-land entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.user.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user.is_empty()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn is_user_key(key: &str) -> bool {
    key.starts_with("user.") || key.starts_with("app.")
}

/// Clamp a requested wait time into `[MIN_WAIT_TIME, MAX_WAIT_TIME]`.
#[must_use]
pub fn clamp_wait_time(wait: Duration) -> Duration {
    wait.clamp(MIN_WAIT_TIME, MAX_WAIT_TIME)
}

// =======================================================================
// YAML loader
// =======================================================================

#[cfg(feature = "config-loaders")]
mod yaml {
    use super::{clamp_wait_time, ConfigError, DispatchConfig, RuntimeConfig};
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::path::Path;
    use std::time::Duration;

    /// Root YAML document.
    ///
    /// ```yaml
    /// dispatch:
    ///   worker_threads: 2
    ///   default_wait_time_ms: 500
    ///   local_device_id: "dev-a"
    /// user:
    ///   app.trace_requests: "true"
    /// ```
    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    pub struct YamlConfigDocument {
        pub dispatch: Option<YamlDispatch>,
        pub user: HashMap<String, String>,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    pub struct YamlDispatch {
        pub worker_threads: Option<usize>,
        pub default_wait_time_ms: Option<u64>,
        pub local_device_id: Option<String>,
    }

    impl RuntimeConfig {
        /// Apply a YAML document on top of the current settings.
        pub fn load_yaml_str(&self, yaml_content: &str) -> Result<(), ConfigError> {
            let doc: YamlConfigDocument = serde_yaml::from_str(yaml_content)
                .map_err(|e| ConfigError::Parse(e.to_string()))?;

            if let Some(dispatch) = doc.dispatch {
                let mut next = DispatchConfig::clone(&self.dispatch());
                if let Some(threads) = dispatch.worker_threads {
                    if threads == 0 {
                        return Err(ConfigError::InvalidValue {
                            key: "dispatch.worker_threads".to_string(),
                            reason: "must be at least 1".to_string(),
                        });
                    }
                    next.worker_threads = threads;
                }
                if let Some(ms) = dispatch.default_wait_time_ms {
                    next.default_wait_time = clamp_wait_time(Duration::from_millis(ms));
                }
                if let Some(id) = dispatch.local_device_id {
                    next.local_device_id = id;
                }
                self.set_dispatch(next);
            }

            for (key, value) in &doc.user {
                self.set_user(key, value);
            }
            log::debug!("[config] loaded {} user keys from YAML", doc.user.len());
            Ok(())
        }

        /// Read and apply a YAML file.
        pub fn load_yaml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
            let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
            self.load_yaml_str(&content)
        }
    }
}

#[cfg(feature = "config-loaders")]
pub use yaml::{YamlConfigDocument, YamlDispatch};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_are_distinct() {
        let markers = [BINDER_MARKER, FD_MARKER, ASHMEM_MARKER, RAW_DATA_MARKER];
        for (i, a) in markers.iter().enumerate() {
            for b in &markers[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_ne!(BINDER_MARKER, 0);
    }

    #[test]
    fn user_namespace_is_enforced() {
        let config = RuntimeConfig::new();
        config.set_user("app.mode", "fast");
        config.set_user("dispatch.worker_threads", "9");
        assert_eq!(config.get_user("app.mode").as_deref(), Some("fast"));
        assert!(config.get_user("dispatch.worker_threads").is_none());
        assert_eq!(config.len(), 1);
        assert_eq!(config.remove_user("app.mode").as_deref(), Some("fast"));
        assert!(config.is_empty());
    }

    #[test]
    fn clones_share_dispatch_settings() {
        let config = RuntimeConfig::new();
        let other = config.clone();
        config.set_dispatch(DispatchConfig {
            worker_threads: 1,
            ..DispatchConfig::default()
        });
        assert_eq!(other.dispatch().worker_threads, 1);
    }

    #[test]
    fn wait_time_is_clamped() {
        assert_eq!(clamp_wait_time(Duration::ZERO), MIN_WAIT_TIME);
        assert_eq!(clamp_wait_time(Duration::from_secs(1)), Duration::from_secs(1));
        assert_eq!(clamp_wait_time(Duration::from_secs(100_000)), MAX_WAIT_TIME);
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn yaml_overrides_dispatch_and_user_keys() {
        let config = RuntimeConfig::new();
        config
            .load_yaml_str(
                "dispatch:\n  worker_threads: 2\n  default_wait_time_ms: 10\n  local_device_id: dev-a\nuser:\n  app.trace: \"on\"\n",
            )
            .expect("valid yaml");
        let dispatch = config.dispatch();
        assert_eq!(dispatch.worker_threads, 2);
        assert_eq!(dispatch.default_wait_time, MIN_WAIT_TIME);
        assert_eq!(dispatch.local_device_id, "dev-a");
        assert_eq!(config.get_user("app.trace").as_deref(), Some("on"));
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn yaml_rejects_zero_workers() {
        let config = RuntimeConfig::new();
        let err = config
            .load_yaml_str("dispatch:\n  worker_threads: 0\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(config.dispatch().worker_threads, DEFAULT_WORKER_THREADS);
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn yaml_file_is_loaded() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "user:\n  user.owner: tests").expect("write yaml");
        let config = RuntimeConfig::new();
        config.load_yaml_file(file.path()).expect("load file");
        assert_eq!(config.get_user("user.owner").as_deref(), Some("tests"));
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn yaml_parse_error_is_reported() {
        let config = RuntimeConfig::new();
        let err = config.load_yaml_str("dispatch: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
