// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! User-defined structured values.

use super::error::{ParcelError, ParcelResult};
use super::{MessageParcel, Primitive};
use crate::config::MAX_OBJECT_ARRAY_LEN;

/// Type that knows how to write itself into a parcel and read itself back.
///
/// ```ignore
/// struct Point { x: i32, label: String }
///
/// impl Sequenceable for Point {
///     fn marshalling(&self, parcel: &mut MessageParcel) -> ParcelResult<()> {
///         parcel.write_int(self.x)?;
///         parcel.write_string(&self.label)
///     }
///
///     fn unmarshalling(&mut self, parcel: &mut MessageParcel) -> ParcelResult<()> {
///         self.x = parcel.try_read_int()?;
///         self.label = parcel.try_read_string()?;
///         Ok(())
///     }
/// }
/// ```
pub trait Sequenceable {
    fn marshalling(&self, parcel: &mut MessageParcel) -> ParcelResult<()>;
    fn unmarshalling(&mut self, parcel: &mut MessageParcel) -> ParcelResult<()>;
}

impl MessageParcel {
    /// Marshal `value` at the write cursor. If marshalling fails part-way,
    /// everything it wrote is rolled back and its error is returned.
    pub fn write_sequenceable(&mut self, value: &dyn Sequenceable) -> ParcelResult<()> {
        self.atomic_write(|p| value.marshalling(p))
    }

    /// Unmarshal into the caller-supplied `value`. The read cursor is restored
    /// when unmarshalling fails.
    pub fn read_sequenceable(&mut self, value: &mut dyn Sequenceable) -> ParcelResult<()> {
        self.atomic_read(|p| value.unmarshalling(p))
    }

    /// Count-prefixed array of sequenceables, written atomically.
    pub fn write_sequenceable_array<T: Sequenceable>(&mut self, values: &[T]) -> ParcelResult<()> {
        if values.len() > MAX_OBJECT_ARRAY_LEN {
            return Err(ParcelError::capacity(values.len(), MAX_OBJECT_ARRAY_LEN));
        }
        self.atomic_write(|p| {
            (values.len() as i32).put(&mut p.buffer)?;
            for value in values {
                value.marshalling(p)?;
            }
            Ok(())
        })
    }

    /// Fill `out` positionally from an encoded array and return how many
    /// elements were unmarshalled (`min(count, out.len())`).
    pub fn read_sequenceable_array<T: Sequenceable>(&mut self, out: &mut [T]) -> ParcelResult<usize> {
        self.atomic_read(|p| {
            let count = p.try_read_count(MAX_OBJECT_ARRAY_LEN)?;
            let filled = count.min(out.len());
            for slot in out.iter_mut().take(filled) {
                slot.unmarshalling(p)?;
            }
            Ok(filled)
        })
    }
}
