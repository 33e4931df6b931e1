// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Death notifications.

use parking_lot::Mutex;
use std::sync::Arc;

/// Notified once when the stub behind a proxy goes away.
pub trait DeathRecipient: Send + Sync {
    fn on_remote_died(&self);
}

impl<F> DeathRecipient for F
where
    F: Fn() + Send + Sync,
{
    fn on_remote_died(&self) {
        self()
    }
}

/// Recipients registered on one stub.
#[derive(Default)]
pub(crate) struct DeathList {
    recipients: Mutex<Vec<Arc<dyn DeathRecipient>>>,
}

impl DeathList {
    /// Add `recipient`; registering the same `Arc` twice is a no-op.
    pub(crate) fn add(&self, recipient: Arc<dyn DeathRecipient>) -> bool {
        let mut recipients = self.recipients.lock();
        if recipients.iter().any(|r| Arc::ptr_eq(r, &recipient)) {
            return true;
        }
        recipients.push(recipient);
        true
    }

    pub(crate) fn remove(&self, recipient: &Arc<dyn DeathRecipient>) -> bool {
        let mut recipients = self.recipients.lock();
        let before = recipients.len();
        recipients.retain(|r| !Arc::ptr_eq(r, recipient));
        recipients.len() < before
    }

    /// Fire and clear all recipients. Callbacks run outside the lock.
    pub(crate) fn notify(&self) {
        let recipients = std::mem::take(&mut *self.recipients.lock());
        for recipient in recipients {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                recipient.on_remote_died();
            }));
            if result.is_err() {
                log::debug!("[remote] death recipient panicked");
            }
        }
    }
}
