// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Status codes, exception codes and completion results.

use crate::parcel::{MessageParcel, ParcelError};

/// Transaction status returned by every request.
///
/// Values mirror negated errno codes so they can travel in the same `i32` as
/// driver-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum TransactionStatus {
    /// Handler ran and returned `Ok(true)`
    #[default]
    Ok = 0,
    /// Handler ran and returned `Ok(false)`
    Failed = -71,
    /// No handler is registered on the target
    UnknownTransaction = -74,
    /// Handler returned an error or panicked; the reply carries an exception
    RemoteException = -121,
    /// Target stub no longer exists
    DeadObject = -32,
    /// Reply did not arrive within the wait time
    TimedOut = -110,
    /// Request could not be encoded or submitted
    InvalidData = -22,
    /// Unrecognized status value
    Unknown = i32::MIN,
}

impl TransactionStatus {
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Ok,
            -71 => Self::Failed,
            -74 => Self::UnknownTransaction,
            -121 => Self::RemoteException,
            -32 => Self::DeadObject,
            -110 => Self::TimedOut,
            -22 => Self::InvalidData,
            _ => Self::Unknown,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

pub const ERR_NONE: i32 = TransactionStatus::Ok as i32;
pub const ERR_TRANSACTION_FAILED: i32 = TransactionStatus::Failed as i32;
pub const ERR_UNKNOWN_TRANSACTION: i32 = TransactionStatus::UnknownTransaction as i32;
pub const ERR_REMOTE_EXCEPTION: i32 = TransactionStatus::RemoteException as i32;
pub const ERR_DEAD_OBJECT: i32 = TransactionStatus::DeadObject as i32;
pub const ERR_TIMED_OUT: i32 = TransactionStatus::TimedOut as i32;
pub const ERR_INVALID_DATA: i32 = TransactionStatus::InvalidData as i32;

/// Exception code written into a reply by `write_exception`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExceptionCode {
    Security = -1,
    BadParcelable = -2,
    IllegalArgument = -3,
    NullPointer = -4,
    IllegalState = -5,
    UnsupportedOperation = -7,
    ServiceSpecific = -8,
}

impl ExceptionCode {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            -1 => Some(Self::Security),
            -2 => Some(Self::BadParcelable),
            -3 => Some(Self::IllegalArgument),
            -4 => Some(Self::NullPointer),
            -5 => Some(Self::IllegalState),
            -7 => Some(Self::UnsupportedOperation),
            -8 => Some(Self::ServiceSpecific),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Exception a handler error is reported as.
    pub fn for_error(error: &ParcelError) -> i32 {
        match error {
            ParcelError::TypeMismatch { .. } | ParcelError::ReadFailed { .. } => {
                Self::BadParcelable.as_i32()
            }
            ParcelError::CapacityExceeded { .. } => Self::IllegalArgument.as_i32(),
            ParcelError::InvalidHandle(_) => Self::NullPointer.as_i32(),
            ParcelError::DescriptorMismatch { .. } => Self::Security.as_i32(),
            // Zero reads back as "no exception" and would contradict the status.
            ParcelError::RemoteException { code: 0, .. } => Self::IllegalState.as_i32(),
            ParcelError::RemoteException { code, .. } => *code,
            ParcelError::Ashmem(_) => Self::IllegalState.as_i32(),
        }
    }
}

/// Outcome of a request, identical for every completion style.
#[derive(Debug)]
pub struct RequestResult {
    /// Transaction status (`ERR_NONE` on success)
    pub err_code: i32,
    /// Request code that was sent
    pub code: u32,
    /// Request parcel, as passed in by the caller
    pub data: MessageParcel,
    /// Handler reply, or the caller's reply parcel untouched when no reply came
    pub reply: MessageParcel,
}

impl RequestResult {
    pub fn is_ok(&self) -> bool {
        self.err_code == ERR_NONE
    }

    pub fn status(&self) -> TransactionStatus {
        TransactionStatus::from_i32(self.err_code)
    }
}
