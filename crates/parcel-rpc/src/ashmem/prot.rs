// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Protection flags for [`Ashmem`](super::Ashmem) mappings.

pub const PROT_NONE: u32 = 0;
pub const PROT_READ: u32 = 1;
pub const PROT_WRITE: u32 = 2;
pub const PROT_EXEC: u32 = 4;

/// Every known protection bit.
pub const PROT_MASK: u32 = PROT_READ | PROT_WRITE | PROT_EXEC;

/// True when `flags` only carries known bits.
#[inline]
pub(crate) fn is_known(flags: u32) -> bool {
    flags & !PROT_MASK == 0
}

/// Translate to the `mmap`/`mprotect` representation.
pub(crate) fn to_native(flags: u32) -> libc::c_int {
    let mut native = libc::PROT_NONE;
    if flags & PROT_READ != 0 {
        native |= libc::PROT_READ;
    }
    if flags & PROT_WRITE != 0 {
        native |= libc::PROT_WRITE;
    }
    if flags & PROT_EXEC != 0 {
        native |= libc::PROT_EXEC;
    }
    native
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_bits() {
        assert!(is_known(PROT_NONE));
        assert!(is_known(PROT_READ | PROT_WRITE));
        assert!(!is_known(8));
        assert_eq!(to_native(PROT_READ | PROT_WRITE), libc::PROT_READ | libc::PROT_WRITE);
        assert_eq!(to_native(PROT_NONE), libc::PROT_NONE);
    }
}
