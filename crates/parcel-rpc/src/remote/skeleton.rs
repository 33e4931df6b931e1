// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Calling identity of the request being served.
//!
//! Workers install the caller's identity on their thread for the duration of
//! each handler call. Outside a handler every accessor reports this process.
//!
//! Identity tokens returned by [`IpcSkeleton::reset_calling_identity`] have
//! the form `pid:uid:token_id:device_id`.

use crate::config::RuntimeConfig;
use crate::remote::IRemoteObject;
use crate::rpc::{ERR_DEAD_OBJECT, ERR_NONE};
use std::cell::RefCell;

thread_local! {
    static CURRENT: RefCell<Option<CallingIdentity>> = const { RefCell::new(None) };
}

/// Who issued the request being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CallingIdentity {
    pid: i32,
    uid: u32,
    token_id: u32,
    device_id: String,
}

impl CallingIdentity {
    /// Identity of this process on `device_id`.
    pub(crate) fn local(device_id: &str) -> Self {
        Self {
            pid: std::process::id() as i32,
            // SAFETY: getuid() has no preconditions and cannot fail.
            uid: unsafe { libc::getuid() },
            token_id: 0,
            device_id: device_id.to_string(),
        }
    }

    fn encode(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.pid, self.uid, self.token_id, self.device_id
        )
    }

    fn decode(token: &str) -> Option<Self> {
        let mut parts = token.splitn(4, ':');
        let pid = parts.next()?.parse().ok()?;
        let uid = parts.next()?.parse().ok()?;
        let token_id = parts.next()?.parse().ok()?;
        let device_id = parts.next()?;
        if device_id.is_empty() {
            return None;
        }
        Some(Self {
            pid,
            uid,
            token_id,
            device_id: device_id.to_string(),
        })
    }
}

/// Restores the previous identity when dropped.
pub(crate) struct IdentityGuard {
    previous: Option<CallingIdentity>,
}

impl Drop for IdentityGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|c| *c.borrow_mut() = previous);
    }
}

/// Install `identity` on this thread until the guard drops.
pub(crate) fn enter(identity: CallingIdentity) -> IdentityGuard {
    let previous = CURRENT.with(|c| c.borrow_mut().replace(identity));
    IdentityGuard { previous }
}

fn effective() -> CallingIdentity {
    CURRENT
        .with(|c| c.borrow().clone())
        .unwrap_or_else(|| CallingIdentity::local(&IpcSkeleton::local_device_id()))
}

/// Process identity accessors for request handlers.
pub struct IpcSkeleton;

impl IpcSkeleton {
    pub fn calling_pid() -> i32 {
        effective().pid
    }

    pub fn calling_uid() -> u32 {
        effective().uid
    }

    pub fn calling_token_id() -> u32 {
        effective().token_id
    }

    pub fn calling_device_id() -> String {
        effective().device_id
    }

    /// Device id configured for this process.
    pub fn local_device_id() -> String {
        RuntimeConfig::global().dispatch().local_device_id.clone()
    }

    /// True when the caller runs on this device.
    pub fn is_local_calling() -> bool {
        effective().device_id == Self::local_device_id()
    }

    /// Switch to this process's own identity, returning a token for the
    /// previous one.
    pub fn reset_calling_identity() -> String {
        let token = effective().encode();
        let own = CallingIdentity::local(&Self::local_device_id());
        CURRENT.with(|c| *c.borrow_mut() = Some(own));
        token
    }

    /// Restore an identity saved by `reset_calling_identity`.
    pub fn set_calling_identity(token: &str) -> bool {
        match CallingIdentity::decode(token) {
            Some(identity) => {
                CURRENT.with(|c| *c.borrow_mut() = Some(identity));
                true
            }
            None => {
                log::debug!("[remote] rejected calling identity token '{}'", token);
                false
            }
        }
    }

    /// Requests are delivered eagerly, so there is never anything buffered.
    /// Reports `ERR_DEAD_OBJECT` when the target is gone.
    pub fn flush_commands(object: &dyn IRemoteObject) -> i32 {
        if object.is_object_dead() {
            ERR_DEAD_OBJECT
        } else {
            ERR_NONE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_defaults_to_self() {
        assert_eq!(IpcSkeleton::calling_pid(), std::process::id() as i32);
        assert!(IpcSkeleton::is_local_calling());
    }

    #[test]
    fn reset_and_restore() {
        let remote = CallingIdentity {
            pid: 4242,
            uid: 1000,
            token_id: 7,
            device_id: "peer-device".into(),
        };
        let _guard = enter(remote);
        assert_eq!(IpcSkeleton::calling_pid(), 4242);
        assert!(!IpcSkeleton::is_local_calling());

        let token = IpcSkeleton::reset_calling_identity();
        assert_eq!(token, "4242:1000:7:peer-device");
        assert_eq!(IpcSkeleton::calling_pid(), std::process::id() as i32);

        assert!(IpcSkeleton::set_calling_identity(&token));
        assert_eq!(IpcSkeleton::calling_token_id(), 7);
        assert_eq!(IpcSkeleton::calling_device_id(), "peer-device");

        assert!(!IpcSkeleton::set_calling_identity("garbage"));
    }

    #[test]
    fn guard_restores_previous() {
        {
            let _guard = enter(CallingIdentity {
                pid: 1,
                uid: 2,
                token_id: 3,
                device_id: "x".into(),
            });
            assert_eq!(IpcSkeleton::calling_uid(), 2);
        }
        assert_eq!(IpcSkeleton::calling_pid(), std::process::id() as i32);
    }
}
