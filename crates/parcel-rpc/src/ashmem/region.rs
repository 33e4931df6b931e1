// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `memfd`-backed shared memory region with protection-gated mappings.

use super::prot::{is_known, to_native, PROT_MASK, PROT_READ, PROT_WRITE};
use super::{AshmemError, AshmemResult};
use crate::config::{ASHMEM_MAX_SIZE, ASHMEM_NAME_MAX};
use parking_lot::Mutex;
use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::ptr;

// Linux refuses memfd names longer than 249 bytes; the full name is kept on
// the handle and only a prefix reaches the kernel.
const MEMFD_NAME_MAX: usize = 200;

/// Live mapping of the whole region.
struct Mapping {
    ptr: *mut u8,
    prot: u32,
}

// SAFETY: the pointer is only dereferenced while the owning `Ashmem` state
// mutex is held, and the mapping is MAP_SHARED memory that stays valid until
// `munmap`, which also happens under that mutex.
unsafe impl Send for Mapping {}

struct State {
    fd: Option<OwnedFd>,
    mapping: Option<Mapping>,
    /// Bits later mappings may request. Only ever narrows.
    allowed: u32,
}

/// Named shared-memory region.
///
/// All operations take `&self`; mapping state is guarded internally so a
/// region can be shared between threads.
pub struct Ashmem {
    name: String,
    size: usize,
    state: Mutex<State>,
}

impl Ashmem {
    /// Create an unmapped region of `size` bytes.
    ///
    /// # Errors
    ///
    /// - `InvalidSize` when `size` is 0 or at least 2 GiB
    /// - `InvalidName` when `name` exceeds 255 bytes or contains NUL
    /// - `Create` when the kernel refuses the memory file
    pub fn create(name: &str, size: usize) -> AshmemResult<Self> {
        if size == 0 || size >= ASHMEM_MAX_SIZE {
            return Err(AshmemError::InvalidSize(size));
        }
        if name.len() > ASHMEM_NAME_MAX {
            return Err(AshmemError::InvalidName(format!(
                "name is {} bytes (max {})",
                name.len(),
                ASHMEM_NAME_MAX
            )));
        }
        let kernel_name = &name.as_bytes()[..name.len().min(MEMFD_NAME_MAX)];
        let c_name =
            CString::new(kernel_name).map_err(|_| AshmemError::InvalidName(name.to_string()))?;

        // SAFETY:
        // - c_name is a valid null-terminated CString created above
        // - MFD_CLOEXEC is a valid flag; memfd_create returns -1 on error (checked below)
        let raw = unsafe { libc::memfd_create(c_name.as_ptr(), libc::MFD_CLOEXEC) };
        if raw < 0 {
            return Err(AshmemError::Create(io::Error::last_os_error()));
        }
        // SAFETY: raw is a freshly created descriptor owned by nobody else.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        // SAFETY:
        // - fd is valid from the successful memfd_create call above
        // - size < 2 GiB so the cast to off_t cannot overflow
        let ret = unsafe { libc::ftruncate(fd.as_raw_fd(), size as libc::off_t) };
        if ret < 0 {
            return Err(AshmemError::Create(io::Error::last_os_error()));
        }

        log::debug!("[ashmem] created '{}' ({} bytes)", name, size);
        Ok(Self {
            name: name.to_string(),
            size,
            state: Mutex::new(State {
                fd: Some(fd),
                mapping: None,
                allowed: PROT_MASK,
            }),
        })
    }

    /// Second handle over the same memory, with its own (absent) mapping.
    pub fn from_existing(other: &Ashmem) -> AshmemResult<Self> {
        let state = other.state.lock();
        let fd = state.fd.as_ref().ok_or(AshmemError::RegionClosed)?;
        let dup = fd.try_clone().map_err(AshmemError::Create)?;
        Ok(Self {
            name: other.name.clone(),
            size: other.size,
            state: Mutex::new(State {
                fd: Some(dup),
                mapping: None,
                allowed: state.allowed,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Protection bits still allowed for mappings.
    pub fn protection(&self) -> u32 {
        self.state.lock().allowed
    }

    pub fn is_mapped(&self) -> bool {
        self.state.lock().mapping.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().fd.is_none()
    }

    /// Underlying descriptor, `None` once closed.
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.state.lock().fd.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// Map the whole region with `flags`, replacing any existing mapping.
    ///
    /// Unknown bits, or bits removed by `set_protection`, fail with
    /// `ProtectionDenied` and leave the current mapping in place.
    pub fn map(&self, flags: u32) -> AshmemResult<()> {
        let mut state = self.state.lock();
        let fd = state
            .fd
            .as_ref()
            .ok_or(AshmemError::RegionClosed)?
            .as_raw_fd();
        if !is_known(flags) || flags & !state.allowed != 0 {
            return Err(AshmemError::ProtectionDenied {
                requested: flags,
                allowed: state.allowed,
            });
        }

        // SAFETY:
        // - null address lets the kernel choose the placement
        // - size matches the ftruncate'd length of the memory file
        // - fd is valid while the state lock is held
        // - mmap returns MAP_FAILED on error (checked below)
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                self.size,
                to_native(flags),
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            let err = io::Error::last_os_error();
            log::warn!("[ashmem] mmap of '{}' failed: {}", self.name, err);
            return Err(AshmemError::Mmap(err));
        }

        if let Some(old) = state.mapping.take() {
            unmap_raw(&old, self.size);
        }
        state.mapping = Some(Mapping {
            ptr: ptr.cast::<u8>(),
            prot: flags,
        });
        Ok(())
    }

    pub fn map_read_only(&self) -> AshmemResult<()> {
        self.map(PROT_READ)
    }

    pub fn map_read_write(&self) -> AshmemResult<()> {
        self.map(PROT_READ | PROT_WRITE)
    }

    /// Drop the current mapping. No-op when unmapped.
    pub fn unmap(&self) -> AshmemResult<()> {
        let mut state = self.state.lock();
        if state.fd.is_none() {
            return Err(AshmemError::RegionClosed);
        }
        if let Some(old) = state.mapping.take() {
            unmap_raw(&old, self.size);
        }
        Ok(())
    }

    /// Narrow the allowed protection to `flags`.
    ///
    /// A live mapping is `mprotect`ed down to the intersection. Bits that were
    /// removed earlier can never be regained.
    pub fn set_protection(&self, flags: u32) -> AshmemResult<()> {
        let mut state = self.state.lock();
        if state.fd.is_none() {
            return Err(AshmemError::RegionClosed);
        }
        if !is_known(flags) || flags & !state.allowed != 0 {
            return Err(AshmemError::ProtectionDenied {
                requested: flags,
                allowed: state.allowed,
            });
        }
        if let Some(mapping) = state.mapping.as_mut() {
            let effective = mapping.prot & flags;
            // SAFETY:
            // - ptr/size describe exactly the live mapping created by map()
            // - mprotect only changes page permissions; access is re-checked
            //   against `prot` before every read or write
            let ret = unsafe {
                libc::mprotect(mapping.ptr.cast::<libc::c_void>(), self.size, to_native(effective))
            };
            if ret < 0 {
                return Err(AshmemError::Mmap(io::Error::last_os_error()));
            }
            mapping.prot = effective;
        }
        state.allowed = flags;
        Ok(())
    }

    /// Copy `len` bytes starting at byte `offset`.
    pub fn read(&self, len: usize, offset: usize) -> AshmemResult<Vec<u8>> {
        let state = self.state.lock();
        let mapping = self.accessible(&state, PROT_READ)?;
        self.check_bounds(len, offset)?;
        let mut out = vec![0u8; len];
        // SAFETY:
        // - offset + len <= size was checked above, so the source range lies in the mapping
        // - the mapping carries PROT_READ (checked by accessible())
        // - out has exactly len bytes and does not overlap shared memory
        unsafe {
            ptr::copy_nonoverlapping(mapping.ptr.add(offset), out.as_mut_ptr(), len);
        }
        Ok(out)
    }

    /// Copy `data` into the region at byte `offset`.
    pub fn write(&self, data: &[u8], offset: usize) -> AshmemResult<()> {
        let state = self.state.lock();
        let mapping = self.accessible(&state, PROT_WRITE)?;
        self.check_bounds(data.len(), offset)?;
        // SAFETY:
        // - offset + data.len() <= size was checked above
        // - the mapping carries PROT_WRITE (checked by accessible())
        // - data is a Rust slice and cannot alias the mapping
        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr(), mapping.ptr.add(offset), data.len());
        }
        Ok(())
    }

    /// Write `size` 32-bit units from `data` at unit `offset`.
    ///
    /// Unit counts are truncated to `i32` and scaled by 4 with wrapping
    /// arithmetic, so an offset of `2^31` units lands on byte 0.
    pub fn write_to_ashmem(&self, data: &[i32], size: i64, offset: i64) -> AshmemResult<()> {
        let (units, byte_offset) = legacy_span(size, offset)?;
        if units > data.len() {
            return Err(AshmemError::invalid(format!(
                "{} units requested but only {} supplied",
                units,
                data.len()
            )));
        }
        let bytes: Vec<u8> = data[..units].iter().flat_map(|v| v.to_le_bytes()).collect();
        self.write(&bytes, byte_offset)
    }

    /// Read `size` 32-bit units starting at unit `offset` (same unit rules as
    /// [`write_to_ashmem`](Self::write_to_ashmem)).
    pub fn read_from_ashmem(&self, size: i64, offset: i64) -> AshmemResult<Vec<i32>> {
        let (units, byte_offset) = legacy_span(size, offset)?;
        let bytes = self.read(units * 4, byte_offset)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Unmap and release the descriptor. Later operations fail with `RegionClosed`.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if let Some(old) = state.mapping.take() {
            unmap_raw(&old, self.size);
        }
        if state.fd.take().is_some() {
            log::debug!("[ashmem] closed '{}'", self.name);
        }
    }

    fn accessible<'s>(&self, state: &'s State, needed: u32) -> AshmemResult<&'s Mapping> {
        if state.fd.is_none() {
            return Err(AshmemError::RegionClosed);
        }
        let mapping = state
            .mapping
            .as_ref()
            .ok_or_else(|| AshmemError::invalid("region is not mapped"))?;
        if mapping.prot & needed != needed {
            return Err(AshmemError::invalid(format!(
                "mapping protection {:#x} lacks {:#x}",
                mapping.prot, needed
            )));
        }
        Ok(mapping)
    }

    fn check_bounds(&self, len: usize, offset: usize) -> AshmemResult<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(AshmemError::invalid(format!(
                "range {}+{} outside region of {} bytes",
                offset, len, self.size
            ))),
        }
    }
}

impl Drop for Ashmem {
    fn drop(&mut self) {
        if let Some(old) = self.state.get_mut().mapping.take() {
            unmap_raw(&old, self.size);
        }
    }
}

impl std::fmt::Debug for Ashmem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Ashmem")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("mapped", &state.mapping.is_some())
            .field("closed", &state.fd.is_none())
            .field("allowed", &state.allowed)
            .finish()
    }
}

fn unmap_raw(mapping: &Mapping, size: usize) {
    // SAFETY:
    // - ptr/size are exactly what a successful mmap returned for this region
    // - the mapping was removed from the state, so no later access uses ptr
    let ret = unsafe { libc::munmap(mapping.ptr.cast::<libc::c_void>(), size) };
    if ret < 0 {
        log::warn!("[ashmem] munmap failed: {}", io::Error::last_os_error());
    }
}

fn legacy_span(size: i64, offset: i64) -> AshmemResult<(usize, usize)> {
    let units = size as i32;
    let byte_len = units.wrapping_mul(4);
    let byte_offset = (offset as i32).wrapping_mul(4);
    if units < 0 || byte_len < 0 || byte_offset < 0 {
        return Err(AshmemError::invalid(format!(
            "negative span (size {}, offset {})",
            size, offset
        )));
    }
    Ok((units as usize, byte_offset as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ashmem::{PROT_EXEC, PROT_NONE};

    #[test]
    fn test_create_rejects_bad_sizes() {
        assert!(matches!(
            Ashmem::create("zero", 0),
            Err(AshmemError::InvalidSize(0))
        ));
        assert!(matches!(
            Ashmem::create("huge", ASHMEM_MAX_SIZE),
            Err(AshmemError::InvalidSize(_))
        ));
    }

    #[test]
    fn test_name_length_limit() {
        let ok = "n".repeat(ASHMEM_NAME_MAX);
        let region = Ashmem::create(&ok, 64).expect("255-byte name should succeed");
        assert_eq!(region.name().len(), ASHMEM_NAME_MAX);
        let too_long = "n".repeat(ASHMEM_NAME_MAX + 1);
        assert!(matches!(
            Ashmem::create(&too_long, 64),
            Err(AshmemError::InvalidName(_))
        ));
    }

    #[test]
    fn test_read_write_within_bounds() {
        let region = Ashmem::create("rw", 4096).expect("create should succeed");
        assert!(matches!(region.read(4, 0), Err(AshmemError::RegionInvalid { .. })));
        region.map_read_write().expect("map should succeed");
        region.write(b"parcel", 10).expect("write should succeed");
        assert_eq!(region.read(6, 10).expect("read should succeed"), b"parcel");
        assert!(region.write(&[0u8; 8], 4090).is_err());
        assert!(region.read(1, 4096).is_err());
    }

    #[test]
    fn test_read_only_mapping_refuses_writes() {
        let region = Ashmem::create("ro", 128).expect("create should succeed");
        region.map_read_only().expect("map should succeed");
        assert!(matches!(
            region.write(b"x", 0),
            Err(AshmemError::RegionInvalid { .. })
        ));
        assert_eq!(region.read(2, 0).expect("read should succeed"), vec![0, 0]);
    }

    #[test]
    fn test_protection_only_narrows() {
        let region = Ashmem::create("prot", 128).expect("create should succeed");
        region.map_read_write().expect("map should succeed");
        region
            .set_protection(PROT_READ)
            .expect("narrowing should succeed");
        assert!(region.write(b"x", 0).is_err());
        assert!(matches!(
            region.set_protection(PROT_READ | PROT_WRITE),
            Err(AshmemError::ProtectionDenied { .. })
        ));
        assert!(matches!(
            region.map_read_write(),
            Err(AshmemError::ProtectionDenied { .. })
        ));
        // Still mapped read-only after the refused remap.
        assert!(region.is_mapped());
        assert!(region.read(1, 0).is_ok());
        assert!(region.map(0x10).is_err());
        region.set_protection(PROT_NONE).expect("narrowing should succeed");
        assert!(region.map(PROT_EXEC).is_err());
    }

    #[test]
    fn test_legacy_units_wrap_offset() {
        let region = Ashmem::create("legacy", 4096).expect("create should succeed");
        region.map_read_write().expect("map should succeed");
        region
            .write_to_ashmem(&[1, 2, 3], 3, 2)
            .expect("write should succeed");
        assert_eq!(
            region.read_from_ashmem(3, 2).expect("read should succeed"),
            vec![1, 2, 3]
        );
        // 2^31 units truncates to i32::MIN, times 4 wraps to byte 0.
        region
            .write_to_ashmem(&[42], 1, 1 << 31)
            .expect("wrapped write should succeed");
        assert_eq!(region.read(4, 0).expect("read should succeed"), 42i32.to_le_bytes());
        assert!(region.write_to_ashmem(&[1], 2, 0).is_err());
        assert!(region.read_from_ashmem(-1, 0).is_err());
    }

    #[test]
    fn test_from_existing_shares_memory() {
        let region = Ashmem::create("shared", 256).expect("create should succeed");
        region.map_read_write().expect("map should succeed");
        region.write(b"abcd", 0).expect("write should succeed");

        let twin = Ashmem::from_existing(&region).expect("dup should succeed");
        assert!(!twin.is_mapped());
        twin.map_read_only().expect("map should succeed");
        assert_eq!(twin.read(4, 0).expect("read should succeed"), b"abcd");
        assert_eq!(twin.size(), 256);
    }

    #[test]
    fn test_close_invalidates_operations() {
        let region = Ashmem::create("closing", 64).expect("create should succeed");
        region.map_read_write().expect("map should succeed");
        region.close();
        assert!(region.is_closed());
        assert!(matches!(region.read(1, 0), Err(AshmemError::RegionClosed)));
        assert!(matches!(region.map_read_only(), Err(AshmemError::RegionClosed)));
        assert!(matches!(
            Ashmem::from_existing(&region),
            Err(AshmemError::RegionClosed)
        ));
        // Idempotent.
        region.close();
    }
}
