// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-request call mode.

use crate::config::{clamp_wait_time, RuntimeConfig};
use std::time::Duration;

/// Synchronous call: the caller waits for the reply.
pub const TF_SYNC: i32 = 0x00;
/// One-way call: returns as soon as the request is queued.
pub const TF_ASYNC: i32 = 0x01;
/// The request may carry file descriptors.
pub const TF_ACCEPT_FDS: i32 = 0x10;

/// Call flags plus the synchronous wait time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOption {
    flags: i32,
    wait_time: Duration,
}

impl MessageOption {
    /// Options with `flags` and the configured default wait time.
    pub fn new(flags: i32) -> Self {
        Self {
            flags,
            wait_time: RuntimeConfig::global().dispatch().default_wait_time,
        }
    }

    pub fn with_wait_time(flags: i32, wait_time: Duration) -> Self {
        Self {
            flags,
            wait_time: clamp_wait_time(wait_time),
        }
    }

    pub fn sync() -> Self {
        Self::new(TF_SYNC)
    }

    pub fn one_way() -> Self {
        Self::new(TF_ASYNC)
    }

    pub fn flags(&self) -> i32 {
        self.flags
    }

    pub fn set_flags(&mut self, flags: i32) {
        self.flags = flags;
    }

    pub fn is_async(&self) -> bool {
        self.flags & TF_ASYNC != 0
    }

    pub fn set_async(&mut self, is_async: bool) {
        if is_async {
            self.flags |= TF_ASYNC;
        } else {
            self.flags &= !TF_ASYNC;
        }
    }

    pub fn accepts_fds(&self) -> bool {
        self.flags & TF_ACCEPT_FDS != 0
    }

    pub fn wait_time(&self) -> Duration {
        self.wait_time
    }

    /// Set the wait time, clamped to `[MIN_WAIT_TIME, MAX_WAIT_TIME]`.
    pub fn set_wait_time(&mut self, wait_time: Duration) {
        self.wait_time = clamp_wait_time(wait_time);
    }
}

impl Default for MessageOption {
    fn default() -> Self {
        Self::sync()
    }
}
