// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Anonymous shared memory regions.
//!
//! An [`Ashmem`] is a named, fixed-size memory file (Linux `memfd`) that can be
//! mapped with a protection level, read and written at byte offsets, duplicated
//! into independent handles and passed inside a parcel.
//!
//! # Lifecycle
//!
//! 1. `Ashmem::create(name, size)` allocates the region (unmapped)
//! 2. `map_read_write()` / `map_read_only()` / `map(flags)` maps it
//! 3. `write()` / `read()` access the mapping
//! 4. `set_protection()` narrows what later mappings may request
//! 5. `close()` (or drop) unmaps and releases the descriptor
//!
//! ```ignore
//! use parcel_rpc::ashmem::Ashmem;
//!
//! let region = Ashmem::create("frame", 4096)?;
//! region.map_read_write()?;
//! region.write(b"hello", 0)?;
//! assert_eq!(region.read(5, 0)?, b"hello");
//! ```

mod prot;
mod region;

pub use prot::{PROT_EXEC, PROT_MASK, PROT_NONE, PROT_READ, PROT_WRITE};
pub use region::Ashmem;

use std::fmt;
use std::io;

/// Result type for ashmem operations.
pub type AshmemResult<T> = Result<T, AshmemError>;

/// Errors raised by shared-memory regions.
#[derive(Debug)]
pub enum AshmemError {
    /// Memory file creation or sizing failed
    Create(io::Error),

    /// Mapping, remapping or protection change failed
    Mmap(io::Error),

    /// Name too long or not representable as a C string
    InvalidName(String),

    /// Size is zero or not below 2 GiB
    InvalidSize(usize),

    /// Region was closed
    RegionClosed,

    /// Access outside the region, or without a suitable mapping
    RegionInvalid { reason: String },

    /// Requested protection bits are unknown or no longer allowed
    ProtectionDenied { requested: u32, allowed: u32 },
}

impl AshmemError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::RegionInvalid {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for AshmemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create(e) => write!(f, "shared memory creation failed: {e}"),
            Self::Mmap(e) => write!(f, "memory mapping failed: {e}"),
            Self::InvalidName(name) => write!(f, "invalid region name: {name}"),
            Self::InvalidSize(size) => {
                write!(f, "invalid region size {size} (must be in 1..2GiB)")
            }
            Self::RegionClosed => write!(f, "region is closed"),
            Self::RegionInvalid { reason } => write!(f, "invalid region access: {reason}"),
            Self::ProtectionDenied { requested, allowed } => write!(
                f,
                "protection {requested:#x} denied (allowed mask {allowed:#x})"
            ),
        }
    }
}

impl std::error::Error for AshmemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Create(e) | Self::Mmap(e) => Some(e),
            _ => None,
        }
    }
}
