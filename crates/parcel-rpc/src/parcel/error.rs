// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Parcel codec errors.

use crate::ashmem::AshmemError;
use std::fmt;

/// Result type for parcel operations.
pub type ParcelResult<T> = Result<T, ParcelError>;

/// Errors raised while encoding or decoding a parcel.
///
/// Every write that fails with one of these leaves the parcel exactly as it
/// was before the call.
#[derive(Debug)]
pub enum ParcelError {
    /// Runtime value tag does not match the requested wire kind.
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A size, count or length exceeds its ceiling.
    CapacityExceeded { requested: usize, limit: usize },

    /// Object cannot be embedded as a remote handle.
    InvalidHandle(String),

    /// Interface token read from the parcel differs from the expected one.
    DescriptorMismatch { expected: String, found: String },

    /// Reply carried a non-zero exception sentinel.
    RemoteException { code: i32, message: String },

    /// Strict read past the end of the readable data.
    ReadFailed { offset: usize, reason: String },

    /// Shared-memory region could not be embedded or attached.
    Ashmem(AshmemError),
}

impl ParcelError {
    pub(crate) fn capacity(requested: usize, limit: usize) -> Self {
        Self::CapacityExceeded { requested, limit }
    }

    pub(crate) fn short_read(offset: usize, wanted: usize) -> Self {
        Self::ReadFailed {
            offset,
            reason: format!("need {} bytes, end of data reached", wanted),
        }
    }
}

impl fmt::Display for ParcelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            Self::CapacityExceeded { requested, limit } => {
                write!(f, "capacity exceeded: requested {} (limit {})", requested, limit)
            }
            Self::InvalidHandle(reason) => write!(f, "invalid remote handle: {}", reason),
            Self::DescriptorMismatch { expected, found } => write!(
                f,
                "interface descriptor mismatch: expected '{}', found '{}'",
                expected, found
            ),
            Self::RemoteException { code, message } => {
                write!(f, "remote exception {}: {}", code, message)
            }
            Self::ReadFailed { offset, reason } => {
                write!(f, "read failed at offset {}: {}", offset, reason)
            }
            Self::Ashmem(e) => write!(f, "ashmem: {}", e),
        }
    }
}

impl std::error::Error for ParcelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Ashmem(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AshmemError> for ParcelError {
    fn from(e: AshmemError) -> Self {
        Self::Ashmem(e)
    }
}
