// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Proxies to stubs.

use super::{DeathRecipient, IRemoteObject, StubCore};
use std::fmt;
use std::sync::{Arc, Weak};

/// Handle to a stub obtained from a parcel or the service registry.
///
/// A proxy never keeps its stub alive. Once the stub is released every
/// request fails with `RemoteUnavailable` and `is_object_dead` is true.
#[derive(Clone)]
pub struct RemoteProxy {
    core: Weak<StubCore>,
    descriptor: String,
}

impl RemoteProxy {
    pub(crate) fn from_core(core: &Arc<StubCore>) -> Self {
        Self {
            core: Arc::downgrade(core),
            descriptor: core.descriptor().to_string(),
        }
    }

    /// True when both proxies (or a proxy and a stub) refer to the same stub.
    pub fn same_target(&self, other: &dyn IRemoteObject) -> bool {
        match (self.core.upgrade(), other.stub_core()) {
            (Some(a), Some(b)) => Arc::ptr_eq(&a, &b),
            _ => false,
        }
    }
}

impl IRemoteObject for RemoteProxy {
    fn descriptor(&self) -> String {
        self.descriptor.clone()
    }

    fn stub_core(&self) -> Option<Arc<StubCore>> {
        self.core.upgrade()
    }

    fn is_object_dead(&self) -> bool {
        self.core.strong_count() == 0
    }

    fn add_death_recipient(&self, recipient: Arc<dyn DeathRecipient>) -> bool {
        match self.core.upgrade() {
            Some(core) => core.death().add(recipient),
            None => false,
        }
    }

    fn remove_death_recipient(&self, recipient: &Arc<dyn DeathRecipient>) -> bool {
        match self.core.upgrade() {
            Some(core) => core.death().remove(recipient),
            None => false,
        }
    }
}

impl fmt::Debug for RemoteProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteProxy")
            .field("descriptor", &self.descriptor)
            .field("dead", &self.is_object_dead())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteObject;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn proxy_observes_death() {
        let stub = RemoteObject::builder("test.proxy.death")
            .worker_threads(1)
            .build()
            .expect("stub should start");
        let proxy = stub.proxy();
        assert!(!proxy.is_object_dead());
        assert!(proxy.same_target(&stub));

        let died = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&died);
        let recipient: Arc<dyn DeathRecipient> = Arc::new(move || {
            flag.store(true, Ordering::SeqCst);
        });
        assert!(proxy.add_death_recipient(Arc::clone(&recipient)));

        drop(stub);
        assert!(proxy.is_object_dead());
        assert!(died.load(Ordering::SeqCst));
        assert!(!proxy.add_death_recipient(recipient));
        assert_eq!(proxy.descriptor(), "test.proxy.death");
    }
}
