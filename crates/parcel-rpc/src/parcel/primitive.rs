// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-width wire slots for scalar types.
//!
//! Every scalar occupies a 4-byte or 8-byte little-endian slot regardless of
//! its logical width. Arrays reuse the same slots, except byte arrays which
//! are packed one byte per element and padded to 4.

use super::buffer::ParcelBuffer;
use super::error::ParcelResult;
use crate::config::{MAX_BYTE_ARRAY_LEN, MAX_SMALL_ARRAY_LEN, MAX_WIDE_ARRAY_LEN};

/// Scalar with a fixed slot layout and a per-array element ceiling.
pub trait Primitive: Copy + Default + Sized + 'static {
    /// Wire name used in diagnostics.
    const KIND: &'static str;
    /// Maximum element count for one array of this type.
    const MAX_ARRAY_LEN: usize;

    fn put(self, buf: &mut ParcelBuffer) -> ParcelResult<()>;
    fn get(buf: &mut ParcelBuffer) -> ParcelResult<Self>;

    /// Encode array elements (count already written). Caller rolls back on error.
    fn put_all(items: &[Self], buf: &mut ParcelBuffer) -> ParcelResult<()> {
        for item in items {
            item.put(buf)?;
        }
        Ok(())
    }

    fn get_all(count: usize, buf: &mut ParcelBuffer) -> ParcelResult<Vec<Self>> {
        // The count comes from the wire; cap the reservation by what is readable.
        let mut out = Vec::with_capacity(count.min(buf.readable_bytes() / 4));
        for _ in 0..count {
            out.push(Self::get(buf)?);
        }
        Ok(out)
    }
}

/// Generate an `i32`-slot primitive (4 bytes on the wire).
macro_rules! impl_int_slot {
    ($ty:ty, $kind:expr, $max:expr, |$v:ident| $enc:expr, |$w:ident| $dec:expr) => {
        impl Primitive for $ty {
            const KIND: &'static str = $kind;
            const MAX_ARRAY_LEN: usize = $max;

            fn put(self, buf: &mut ParcelBuffer) -> ParcelResult<()> {
                let $v = self;
                let wire: i32 = $enc;
                buf.write_bytes(&wire.to_le_bytes())
            }

            fn get(buf: &mut ParcelBuffer) -> ParcelResult<Self> {
                let $w = i32::from_le_bytes(buf.try_read_array::<4>()?);
                Ok($dec)
            }
        }
    };
}

impl_int_slot!(i16, "short", MAX_SMALL_ARRAY_LEN, |v| i32::from(v), |w| w as i16);
impl_int_slot!(i32, "int", MAX_SMALL_ARRAY_LEN, |v| v, |w| w);
impl_int_slot!(bool, "boolean", MAX_SMALL_ARRAY_LEN, |v| i32::from(v), |w| w != 0);
impl_int_slot!(u8, "char", MAX_SMALL_ARRAY_LEN, |v| i32::from(v), |w| w as u8);

impl Primitive for i8 {
    const KIND: &'static str = "byte";
    const MAX_ARRAY_LEN: usize = MAX_BYTE_ARRAY_LEN;

    fn put(self, buf: &mut ParcelBuffer) -> ParcelResult<()> {
        buf.write_bytes(&i32::from(self).to_le_bytes())
    }

    fn get(buf: &mut ParcelBuffer) -> ParcelResult<Self> {
        Ok(i32::from_le_bytes(buf.try_read_array::<4>()?) as i8)
    }

    fn put_all(items: &[Self], buf: &mut ParcelBuffer) -> ParcelResult<()> {
        let bytes: Vec<u8> = items.iter().map(|b| *b as u8).collect();
        buf.write_padded(&bytes)
    }

    fn get_all(count: usize, buf: &mut ParcelBuffer) -> ParcelResult<Vec<Self>> {
        let bytes = buf.try_read_padded(count)?;
        Ok(bytes.into_iter().map(|b| b as i8).collect())
    }
}

impl Primitive for i64 {
    const KIND: &'static str = "long";
    const MAX_ARRAY_LEN: usize = MAX_WIDE_ARRAY_LEN;

    fn put(self, buf: &mut ParcelBuffer) -> ParcelResult<()> {
        buf.write_bytes(&self.to_le_bytes())
    }

    fn get(buf: &mut ParcelBuffer) -> ParcelResult<Self> {
        Ok(i64::from_le_bytes(buf.try_read_array::<8>()?))
    }
}

impl Primitive for f64 {
    const KIND: &'static str = "double";
    const MAX_ARRAY_LEN: usize = MAX_WIDE_ARRAY_LEN;

    fn put(self, buf: &mut ParcelBuffer) -> ParcelResult<()> {
        buf.write_bytes(&self.to_bits().to_le_bytes())
    }

    fn get(buf: &mut ParcelBuffer) -> ParcelResult<Self> {
        Ok(f64::from_bits(u64::from_le_bytes(buf.try_read_array::<8>()?)))
    }
}

// Floats travel widened to a double slot.
impl Primitive for f32 {
    const KIND: &'static str = "float";
    const MAX_ARRAY_LEN: usize = MAX_WIDE_ARRAY_LEN;

    fn put(self, buf: &mut ParcelBuffer) -> ParcelResult<()> {
        f64::from(self).put(buf)
    }

    fn get(buf: &mut ParcelBuffer) -> ParcelResult<Self> {
        Ok(f64::get(buf)? as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_widths() {
        let mut buf = ParcelBuffer::new();
        7i8.put(&mut buf).expect("put should succeed");
        assert_eq!(buf.size(), 4);
        true.put(&mut buf).expect("put should succeed");
        b'a'.put(&mut buf).expect("put should succeed");
        assert_eq!(buf.size(), 12);
        1.5f32.put(&mut buf).expect("put should succeed");
        assert_eq!(buf.size(), 20);
        i64::MIN.put(&mut buf).expect("put should succeed");
        assert_eq!(buf.size(), 28);

        assert_eq!(i8::get(&mut buf).expect("get should succeed"), 7);
        assert!(bool::get(&mut buf).expect("get should succeed"));
        assert_eq!(u8::get(&mut buf).expect("get should succeed"), b'a');
        assert_eq!(f32::get(&mut buf).expect("get should succeed"), 1.5);
        assert_eq!(i64::get(&mut buf).expect("get should succeed"), i64::MIN);
    }

    #[test]
    fn test_byte_arrays_are_packed() {
        let mut buf = ParcelBuffer::new();
        i8::put_all(&[1, -2, 3, 4, 5], &mut buf).expect("put should succeed");
        assert_eq!(buf.size(), 8);
        assert_eq!(
            i8::get_all(5, &mut buf).expect("get should succeed"),
            vec![1, -2, 3, 4, 5]
        );
    }
}
