// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry of live stubs.
//!
//! Stubs register on creation and unregister when their last strong
//! reference drops. The registry only holds weak references, so it never
//! keeps a stub alive.

use crate::remote::{RemoteProxy, StubCore};
use std::sync::{RwLock, Weak};

/// Metadata about a live stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Process-unique stub id
    pub id: u64,
    /// Interface descriptor (e.g., "rpcTestAbility")
    pub descriptor: String,
    /// Worker threads serving the stub
    pub worker_threads: usize,
}

struct ServiceEntry {
    info: ServiceInfo,
    core: Weak<StubCore>,
}

static SERVICE_REGISTRY: RwLock<Vec<ServiceEntry>> = RwLock::new(Vec::new());

pub(crate) fn register_service(info: ServiceInfo, core: Weak<StubCore>) {
    if let Ok(mut registry) = SERVICE_REGISTRY.write() {
        if !registry.iter().any(|e| e.info.id == info.id) {
            log::debug!(
                "[rpc] registry: registered '{}' (id {})",
                info.descriptor,
                info.id
            );
            registry.push(ServiceEntry { info, core });
        }
    }
}

pub(crate) fn unregister_service(id: u64) {
    if let Ok(mut registry) = SERVICE_REGISTRY.write() {
        let before = registry.len();
        registry.retain(|e| e.info.id != id);
        if registry.len() < before {
            log::debug!("[rpc] registry: unregistered stub id {}", id);
        }
    }
}

/// List all live stubs.
pub fn list_services() -> Vec<ServiceInfo> {
    SERVICE_REGISTRY
        .read()
        .map(|r| r.iter().map(|e| e.info.clone()).collect())
        .unwrap_or_default()
}

/// Proxy to the oldest live stub registered under `descriptor`.
pub fn get_service(descriptor: &str) -> Option<RemoteProxy> {
    // Upgrade outside the lock: dropping the upgraded core may release the
    // stub, and its teardown takes the write lock.
    let candidates: Vec<Weak<StubCore>> = SERVICE_REGISTRY
        .read()
        .ok()?
        .iter()
        .filter(|e| e.info.descriptor == descriptor)
        .map(|e| Weak::clone(&e.core))
        .collect();
    candidates
        .iter()
        .find_map(Weak::upgrade)
        .map(|core| RemoteProxy::from_core(&core))
}
