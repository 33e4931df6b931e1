// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for request dispatch.

use crate::parcel::ParcelError;
use crate::rpc::types::{ERR_DEAD_OBJECT, ERR_INVALID_DATA, ERR_TIMED_OUT};
use std::fmt;
use std::time::Duration;

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors that can occur while sending a request
#[derive(Debug)]
pub enum RpcError {
    /// Target stub is gone (dead proxy or plain object without a stub)
    RemoteUnavailable(String),

    /// Synchronous request did not complete within the wait time
    Timeout { code: u32, waited: Duration },

    /// Request parcel could not be prepared
    Parcel(ParcelError),

    /// Stub worker pool stopped accepting requests
    Shutdown,

    /// Internal error
    Internal(String),
}

impl RpcError {
    /// Transaction status reported for this error.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::RemoteUnavailable(_) | Self::Shutdown => ERR_DEAD_OBJECT,
            Self::Timeout { .. } => ERR_TIMED_OUT,
            Self::Parcel(_) | Self::Internal(_) => ERR_INVALID_DATA,
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteUnavailable(descriptor) => {
                write!(f, "remote object '{}' is unavailable", descriptor)
            }
            Self::Timeout { code, waited } => {
                write!(f, "request {} timed out after {:?}", code, waited)
            }
            Self::Parcel(e) => write!(f, "parcel error: {}", e),
            Self::Shutdown => write!(f, "stub worker pool shut down"),
            Self::Internal(msg) => write!(f, "internal RPC error: {}", msg),
        }
    }
}

impl std::error::Error for RpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parcel(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParcelError> for RpcError {
    fn from(e: ParcelError) -> Self {
        Self::Parcel(e)
    }
}
