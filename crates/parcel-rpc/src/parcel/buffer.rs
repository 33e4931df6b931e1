// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Growable byte store with independent read and write cursors.
//!
//! Capacity is a logical figure: physical bytes are materialized only when
//! written, so a parcel may advertise a large capacity without holding it.
//! Bytes inside `size` that were never written read back as zero.

use super::error::{ParcelError, ParcelResult};
use crate::config::{CAPACITY_ALIGNMENT, MAX_PARCEL_CAPACITY, MIN_GROWTH_STEP, SLOT_ALIGNMENT};

#[inline]
pub(crate) const fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

/// Byte store backing a [`MessageParcel`](super::MessageParcel).
///
/// Invariants: `read_pos <= size <= capacity <= max_capacity` and
/// `write_pos <= size`.
#[derive(Debug, Clone)]
pub struct ParcelBuffer {
    data: Vec<u8>,
    size: usize,
    capacity: usize,
    write_pos: usize,
    read_pos: usize,
    max_capacity: usize,
}

/// Snapshot used to roll a failed composite write back.
#[derive(Debug)]
pub(crate) struct BufferCheckpoint {
    size: usize,
    capacity: usize,
    write_pos: usize,
    read_pos: usize,
    data_len: usize,
    tail: Vec<u8>,
}

impl ParcelBuffer {
    pub fn new() -> Self {
        Self::with_max_capacity(MAX_PARCEL_CAPACITY)
    }

    /// Buffer with a lower hard ceiling than [`MAX_PARCEL_CAPACITY`].
    pub fn with_max_capacity(max_capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            size: 0,
            capacity: 0,
            write_pos: 0,
            read_pos: 0,
            max_capacity: max_capacity.min(MAX_PARCEL_CAPACITY),
        }
    }

    /// Buffer holding `bytes` as readable content.
    pub fn from_bytes(bytes: &[u8]) -> ParcelResult<Self> {
        if bytes.len() > MAX_PARCEL_CAPACITY {
            return Err(ParcelError::capacity(bytes.len(), MAX_PARCEL_CAPACITY));
        }
        let mut buffer = Self::new();
        buffer.data = bytes.to_vec();
        buffer.size = bytes.len();
        buffer.capacity = bytes.len();
        buffer.write_pos = bytes.len();
        Ok(buffer)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    #[inline]
    pub fn write_position(&self) -> usize {
        self.write_pos
    }

    #[inline]
    pub fn read_position(&self) -> usize {
        self.read_pos
    }

    #[inline]
    pub fn writable_bytes(&self) -> usize {
        self.capacity - self.write_pos
    }

    #[inline]
    pub fn readable_bytes(&self) -> usize {
        self.size - self.read_pos
    }

    /// Make room for `n` more bytes at the write cursor.
    ///
    /// Growth takes the largest of 64 bytes, double the current capacity and the
    /// 8-aligned needed size, clamped to the ceiling.
    pub fn ensure_capacity(&mut self, n: usize) -> ParcelResult<()> {
        let needed = self
            .write_pos
            .checked_add(n)
            .ok_or(ParcelError::capacity(usize::MAX, self.max_capacity))?;
        if needed <= self.capacity {
            return Ok(());
        }
        if needed > self.max_capacity {
            log::debug!(
                "[parcel] growth to {} bytes refused (ceiling {})",
                needed,
                self.max_capacity
            );
            return Err(ParcelError::capacity(needed, self.max_capacity));
        }
        let grown = MIN_GROWTH_STEP
            .max(self.capacity.saturating_mul(2))
            .max(align_up(needed, CAPACITY_ALIGNMENT));
        self.capacity = grown.min(self.max_capacity);
        Ok(())
    }

    /// Write `bytes` at the write cursor.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> ParcelResult<()> {
        self.ensure_capacity(bytes.len())?;
        self.put(bytes);
        Ok(())
    }

    /// Write `bytes` followed by zeros up to the next 4-byte boundary.
    pub fn write_padded(&mut self, bytes: &[u8]) -> ParcelResult<()> {
        let padded = align_up(bytes.len(), SLOT_ALIGNMENT);
        self.ensure_capacity(padded)?;
        self.put(bytes);
        self.put(&[0u8; SLOT_ALIGNMENT][..padded - bytes.len()]);
        Ok(())
    }

    // Caller has already reserved capacity.
    fn put(&mut self, bytes: &[u8]) {
        let end = self.write_pos + bytes.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[self.write_pos..end].copy_from_slice(bytes);
        self.write_pos = end;
        if end > self.size {
            self.size = end;
        }
    }

    // Copy `out.len()` bytes starting at `offset`; unmaterialized bytes read as zero.
    fn copy_out(&self, offset: usize, out: &mut [u8]) {
        let physical_end = self.data.len().min(offset + out.len());
        if offset < physical_end {
            let n = physical_end - offset;
            out[..n].copy_from_slice(&self.data[offset..physical_end]);
            out[n..].fill(0);
        } else {
            out.fill(0);
        }
    }

    /// Strict fixed-size read.
    pub fn try_read_array<const N: usize>(&mut self) -> ParcelResult<[u8; N]> {
        if self.readable_bytes() < N {
            return Err(ParcelError::short_read(self.read_pos, N));
        }
        let mut out = [0u8; N];
        self.copy_out(self.read_pos, &mut out);
        self.read_pos += N;
        Ok(out)
    }

    /// Strict variable-size read.
    pub fn try_read_bytes(&mut self, n: usize) -> ParcelResult<Vec<u8>> {
        if self.readable_bytes() < n {
            return Err(ParcelError::short_read(self.read_pos, n));
        }
        let mut out = vec![0u8; n];
        self.copy_out(self.read_pos, &mut out);
        self.read_pos += n;
        Ok(out)
    }

    /// Lenient read: an empty vector and an untouched cursor when fewer than `n`
    /// bytes remain.
    pub fn read_bytes(&mut self, n: usize) -> Vec<u8> {
        self.try_read_bytes(n).unwrap_or_default()
    }

    /// Strict read of `n` bytes plus padding to the next 4-byte boundary.
    pub fn try_read_padded(&mut self, n: usize) -> ParcelResult<Vec<u8>> {
        let padded = align_up(n, SLOT_ALIGNMENT);
        if self.readable_bytes() < padded {
            return Err(ParcelError::short_read(self.read_pos, padded));
        }
        let mut out = vec![0u8; n];
        self.copy_out(self.read_pos, &mut out);
        self.read_pos += padded;
        Ok(out)
    }

    /// Skip `n` readable bytes. Fails without moving when fewer remain.
    pub fn skip(&mut self, n: usize) -> ParcelResult<()> {
        if self.readable_bytes() < n {
            return Err(ParcelError::short_read(self.read_pos, n));
        }
        self.read_pos += n;
        Ok(())
    }

    /// Move the write cursor. `false` (cursor unchanged) when `pos > size`.
    pub fn rewind_write(&mut self, pos: usize) -> bool {
        if pos > self.size {
            return false;
        }
        self.write_pos = pos;
        true
    }

    /// Move the read cursor. `false` (cursor unchanged) when `pos > size`.
    pub fn rewind_read(&mut self, pos: usize) -> bool {
        if pos > self.size {
            return false;
        }
        self.read_pos = pos;
        true
    }

    /// Set the logical capacity. Refused when below `size` or above the ceiling.
    ///
    /// Bytes hidden by an earlier `set_size` shrink are kept.
    pub fn set_capacity(&mut self, n: usize) -> bool {
        if n < self.size || n > self.max_capacity {
            return false;
        }
        self.capacity = n;
        true
    }

    /// Set the logical size. Refused above `capacity`.
    ///
    /// Shrinking clamps both cursors but keeps the bytes, so raising the size
    /// again exposes the old content.
    pub fn set_size(&mut self, n: usize) -> bool {
        if n > self.capacity {
            return false;
        }
        self.size = n;
        self.write_pos = self.write_pos.min(n);
        self.read_pos = self.read_pos.min(n);
        true
    }

    /// Copy of the readable content (`0..size`).
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.size];
        self.copy_out(0, &mut out);
        out
    }

    /// Drop all content and reset the cursors.
    pub fn clear(&mut self) {
        self.data = Vec::new();
        self.size = 0;
        self.capacity = 0;
        self.write_pos = 0;
        self.read_pos = 0;
    }

    pub(crate) fn checkpoint(&self) -> BufferCheckpoint {
        let from = self.write_pos.min(self.data.len());
        BufferCheckpoint {
            size: self.size,
            capacity: self.capacity,
            write_pos: self.write_pos,
            read_pos: self.read_pos,
            data_len: self.data.len(),
            tail: self.data[from..].to_vec(),
        }
    }

    pub(crate) fn restore(&mut self, cp: BufferCheckpoint) {
        let from = cp.data_len - cp.tail.len();
        self.data.truncate(from);
        self.data.extend_from_slice(&cp.tail);
        self.size = cp.size;
        self.capacity = cp.capacity;
        self.write_pos = cp.write_pos;
        self.read_pos = cp.read_pos;
    }
}

impl Default for ParcelBuffer {
    fn default() -> Self {
        Self::new()
    }
}
