// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed message parcels.
//!
//! A [`MessageParcel`] is a flat little-endian buffer with independent read and
//! write cursors, plus side tables for embedded objects (remote handles, file
//! descriptors, shared memory) and bulk raw data.
//!
//! # Wire conventions
//!
//! | Item                     | Encoding                                             |
//! |--------------------------|------------------------------------------------------|
//! | byte/short/int/bool/char | 4-byte `i32` slot                                    |
//! | long/double              | 8-byte slot                                          |
//! | float                    | 8-byte slot (widened to double)                      |
//! | string                   | `i32` UTF-16 unit count, units, `u16` NUL, pad to 4  |
//! | array                    | `i32` count, then elements (byte arrays packed)      |
//! | interface token          | `i32` 0x100 strict-mode header, then string          |
//! | embedded object          | `i32` marker, `i32` object-table index               |
//!
//! Writes are atomic: a failing write leaves size, capacity and cursors as
//! they were. Reads come in two flavors. `try_read_*` returns `ReadFailed` when
//! data runs out; `read_*` returns the type's default (0, `false`, empty) and
//! leaves the read cursor untouched.
//!
//! # Example
//!
//! ```ignore
//! use parcel_rpc::parcel::MessageParcel;
//!
//! let mut data = MessageParcel::new();
//! data.write_interface_token("rpcTestAbility")?;
//! data.write_int(42)?;
//! data.write_string("constant")?;
//!
//! assert_eq!(data.read_interface_token(), "rpcTestAbility");
//! assert_eq!(data.read_int(), 42);
//! assert_eq!(data.read_string(), "constant");
//! ```

mod buffer;
mod error;
mod object;
mod primitive;
mod sequenceable;
mod value;

pub use buffer::ParcelBuffer;
pub use error::{ParcelError, ParcelResult};
pub use primitive::Primitive;
pub use sequenceable::Sequenceable;
pub use value::{wrap_integer, Kind, Value};

pub(crate) use object::ParcelObject;

use crate::config::{
    MAX_STRING_ARRAY_LEN, MAX_STRING_LEN, RAW_DATA_CAPACITY, RAW_DATA_MARKER, STRICT_MODE_POLICY,
};
use buffer::{align_up, BufferCheckpoint};
use std::fmt;
use std::sync::Arc;

/// Parcel state captured before a composite write.
pub(crate) struct ParcelCheckpoint {
    buffer: BufferCheckpoint,
    objects: usize,
    raw_blocks: usize,
    raw_used: usize,
}

/// Typed message buffer exchanged with remote objects.
#[derive(Clone, Default)]
pub struct MessageParcel {
    buffer: ParcelBuffer,
    objects: Vec<ParcelObject>,
    raw_blocks: Vec<Arc<[u8]>>,
    raw_used: usize,
}

/// Generate the scalar and array accessors for one primitive type.
macro_rules! impl_primitive_accessors {
    ($($ty:ty => $write:ident, $try_read:ident, $read:ident,
        $write_array:ident, $try_read_array:ident, $read_array:ident, $read_array_into:ident;)*) => {
        $(
            pub fn $write(&mut self, value: $ty) -> ParcelResult<()> {
                value.put(&mut self.buffer)
            }

            pub fn $try_read(&mut self) -> ParcelResult<$ty> {
                self.atomic_read(<$ty as GetFrom>::get_from)
            }

            pub fn $read(&mut self) -> $ty {
                self.$try_read().unwrap_or_default()
            }

            pub fn $write_array(&mut self, values: &[$ty]) -> ParcelResult<()> {
                self.write_primitive_array(values)
            }

            pub fn $try_read_array(&mut self) -> ParcelResult<Vec<$ty>> {
                self.try_read_primitive_array::<$ty>()
            }

            pub fn $read_array(&mut self) -> Vec<$ty> {
                self.$try_read_array().unwrap_or_default()
            }

            pub fn $read_array_into(&mut self, out: &mut Vec<$ty>) {
                let items = self.$read_array();
                fill_into(out, items);
            }
        )*
    };
}

impl MessageParcel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parcel whose buffer can never grow beyond `max_capacity` bytes.
    pub fn with_max_capacity(max_capacity: usize) -> Self {
        Self {
            buffer: ParcelBuffer::with_max_capacity(max_capacity),
            ..Self::default()
        }
    }

    /// Parcel holding a copy of `bytes` as readable content. Embedded objects
    /// cannot be resolved from a flat copy.
    pub fn from_bytes(bytes: &[u8]) -> ParcelResult<Self> {
        Ok(Self {
            buffer: ParcelBuffer::from_bytes(bytes)?,
            ..Self::default()
        })
    }

    /// Copy of the flat buffer (`0..size`).
    pub fn data(&self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    /// Release the buffer, embedded objects and raw data.
    pub fn reclaim(&mut self) {
        self.buffer.clear();
        self.objects.clear();
        self.raw_blocks.clear();
        self.raw_used = 0;
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    pub fn size(&self) -> usize {
        self.buffer.size()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn write_position(&self) -> usize {
        self.buffer.write_position()
    }

    pub fn read_position(&self) -> usize {
        self.buffer.read_position()
    }

    pub fn writable_bytes(&self) -> usize {
        self.buffer.writable_bytes()
    }

    pub fn readable_bytes(&self) -> usize {
        self.buffer.readable_bytes()
    }

    /// Fixed ceiling of the raw-data channel.
    pub fn raw_data_capacity(&self) -> usize {
        RAW_DATA_CAPACITY
    }

    pub fn set_size(&mut self, size: usize) -> bool {
        self.buffer.set_size(size)
    }

    pub fn set_capacity(&mut self, capacity: usize) -> bool {
        self.buffer.set_capacity(capacity)
    }

    pub fn rewind_write(&mut self, pos: usize) -> bool {
        self.buffer.rewind_write(pos)
    }

    pub fn rewind_read(&mut self, pos: usize) -> bool {
        self.buffer.rewind_read(pos)
    }

    // ---------------------------------------------------------------------
    // Scalars and arrays
    // ---------------------------------------------------------------------

    impl_primitive_accessors! {
        i8 => write_byte, try_read_byte, read_byte,
            write_byte_array, try_read_byte_array, read_byte_array, read_byte_array_into;
        i16 => write_short, try_read_short, read_short,
            write_short_array, try_read_short_array, read_short_array, read_short_array_into;
        i32 => write_int, try_read_int, read_int,
            write_int_array, try_read_int_array, read_int_array, read_int_array_into;
        i64 => write_long, try_read_long, read_long,
            write_long_array, try_read_long_array, read_long_array, read_long_array_into;
        f32 => write_float, try_read_float, read_float,
            write_float_array, try_read_float_array, read_float_array, read_float_array_into;
        f64 => write_double, try_read_double, read_double,
            write_double_array, try_read_double_array, read_double_array, read_double_array_into;
        bool => write_boolean, try_read_boolean, read_boolean,
            write_boolean_array, try_read_boolean_array, read_boolean_array, read_boolean_array_into;
        u8 => write_char, try_read_char, read_char,
            write_char_array, try_read_char_array, read_char_array, read_char_array_into;
    }

    fn write_primitive_array<T: Primitive>(&mut self, values: &[T]) -> ParcelResult<()> {
        if values.len() > T::MAX_ARRAY_LEN {
            log::debug!(
                "[parcel] {} array of {} elements refused (limit {})",
                T::KIND,
                values.len(),
                T::MAX_ARRAY_LEN
            );
            return Err(ParcelError::capacity(values.len(), T::MAX_ARRAY_LEN));
        }
        self.atomic_write(|p| {
            (values.len() as i32).put(&mut p.buffer)?;
            T::put_all(values, &mut p.buffer)
        })
    }

    fn try_read_primitive_array<T: Primitive>(&mut self) -> ParcelResult<Vec<T>> {
        self.atomic_read(|p| {
            let count = p.try_read_count(T::MAX_ARRAY_LEN)?;
            T::get_all(count, &mut p.buffer)
        })
    }

    /// Read an array length prefix. `-1` (null array) reads as zero.
    fn try_read_count(&mut self, limit: usize) -> ParcelResult<usize> {
        let offset = self.buffer.read_position();
        let count = i32::get(&mut self.buffer)?;
        if count < 0 {
            return Ok(0);
        }
        let count = count as usize;
        if count > limit {
            return Err(ParcelError::ReadFailed {
                offset,
                reason: format!("array length {} exceeds limit {}", count, limit),
            });
        }
        Ok(count)
    }

    // ---------------------------------------------------------------------
    // Strings
    // ---------------------------------------------------------------------

    /// Write a UTF-16 string. More than 40 960 units fails with `CapacityExceeded`.
    pub fn write_string(&mut self, value: &str) -> ParcelResult<()> {
        let encoded = encode_string(value)?;
        self.buffer.write_bytes(&encoded)
    }

    pub fn try_read_string(&mut self) -> ParcelResult<String> {
        self.atomic_read(Self::decode_string)
    }

    /// Lenient string read: empty when data runs out.
    pub fn read_string(&mut self) -> String {
        self.try_read_string().unwrap_or_default()
    }

    fn decode_string(&mut self) -> ParcelResult<String> {
        let offset = self.buffer.read_position();
        let len = i32::get(&mut self.buffer)?;
        if len < 0 {
            return Ok(String::new());
        }
        let len = len as usize;
        if len > MAX_STRING_LEN {
            return Err(ParcelError::ReadFailed {
                offset,
                reason: format!("string length {} exceeds limit {}", len, MAX_STRING_LEN),
            });
        }
        let bytes = self.buffer.try_read_padded((len + 1) * 2)?;
        let units: Vec<u16> = bytes[..len * 2]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Ok(String::from_utf16_lossy(&units))
    }

    pub fn write_string_array<S: AsRef<str>>(&mut self, values: &[S]) -> ParcelResult<()> {
        if values.len() > MAX_STRING_ARRAY_LEN {
            return Err(ParcelError::capacity(values.len(), MAX_STRING_ARRAY_LEN));
        }
        let mut encoded = (values.len() as i32).to_le_bytes().to_vec();
        for value in values {
            encoded.extend_from_slice(&encode_string(value.as_ref())?);
        }
        self.buffer.write_bytes(&encoded)
    }

    pub fn try_read_string_array(&mut self) -> ParcelResult<Vec<String>> {
        self.atomic_read(|p| {
            let count = p.try_read_count(MAX_STRING_ARRAY_LEN)?;
            (0..count).map(|_| p.decode_string()).collect()
        })
    }

    pub fn read_string_array(&mut self) -> Vec<String> {
        self.try_read_string_array().unwrap_or_default()
    }

    pub fn read_string_array_into(&mut self, out: &mut Vec<String>) {
        let items = self.read_string_array();
        fill_into(out, items);
    }

    // ---------------------------------------------------------------------
    // Interface token and exceptions
    // ---------------------------------------------------------------------

    /// Write the strict-mode header followed by `token`.
    pub fn write_interface_token(&mut self, token: &str) -> ParcelResult<()> {
        let mut encoded = STRICT_MODE_POLICY.to_le_bytes().to_vec();
        encoded.extend_from_slice(&encode_string(token)?);
        self.buffer.write_bytes(&encoded)
    }

    pub fn try_read_interface_token(&mut self) -> ParcelResult<String> {
        self.atomic_read(|p| {
            let _policy = i32::get(&mut p.buffer)?;
            p.decode_string()
        })
    }

    /// Lenient token read: empty when absent.
    pub fn read_interface_token(&mut self) -> String {
        self.try_read_interface_token().unwrap_or_default()
    }

    /// Consume the interface token and check it names `expected`.
    pub fn enforce_interface(&mut self, expected: &str) -> ParcelResult<()> {
        let found = self.read_interface_token();
        if found != expected {
            log::warn!(
                "[parcel] interface token mismatch: expected '{}', found '{}'",
                expected,
                found
            );
            return Err(ParcelError::DescriptorMismatch {
                expected: expected.to_string(),
                found,
            });
        }
        Ok(())
    }

    /// Reply header for a successful call. Results follow it.
    pub fn write_no_exception(&mut self) -> ParcelResult<()> {
        self.write_int(0)
    }

    /// Reply header carrying a non-zero exception `code` and `message`.
    /// A zero code is written as "no exception".
    pub fn write_exception(&mut self, code: i32, message: &str) -> ParcelResult<()> {
        if code == 0 {
            return self.write_no_exception();
        }
        let mut encoded = code.to_le_bytes().to_vec();
        encoded.extend_from_slice(&encode_string(message)?);
        self.buffer.write_bytes(&encoded)
    }

    /// Consume the reply header. A missing header reads as "no exception".
    pub fn read_exception(&mut self) -> ParcelResult<()> {
        let code = self.read_int();
        if code == 0 {
            return Ok(());
        }
        let message = self.read_string();
        Err(ParcelError::RemoteException { code, message })
    }

    // ---------------------------------------------------------------------
    // Raw data
    // ---------------------------------------------------------------------

    /// Attach the first `len` bytes of `data` through the raw-data channel.
    ///
    /// The structured buffer only receives a marker, the length and a block
    /// index, so
    /// large payloads are bounded by [`raw_data_capacity`](Self::raw_data_capacity)
    /// rather than the array ceilings.
    pub fn write_raw_data(&mut self, data: &[u8], len: usize) -> ParcelResult<()> {
        if len > data.len() {
            return Err(ParcelError::capacity(len, data.len()));
        }
        let total = self.raw_used + len;
        if total > RAW_DATA_CAPACITY {
            return Err(ParcelError::capacity(total, RAW_DATA_CAPACITY));
        }
        let index = self.raw_blocks.len() as i32;
        let mut header = RAW_DATA_MARKER.to_le_bytes().to_vec();
        header.extend_from_slice(&(len as i32).to_le_bytes());
        header.extend_from_slice(&index.to_le_bytes());
        self.buffer.write_bytes(&header)?;
        self.raw_blocks.push(Arc::from(&data[..len]));
        self.raw_used = total;
        Ok(())
    }

    /// Read `len` bytes from the raw-data channel. Empty when the next item is
    /// not a raw block holding at least `len` bytes.
    pub fn read_raw_data(&mut self, len: usize) -> Vec<u8> {
        self.atomic_read(|p| {
            let offset = p.buffer.read_position();
            let marker = i32::get(&mut p.buffer)?;
            let stored = i32::get(&mut p.buffer)?;
            let index = i32::get(&mut p.buffer)?;
            let block = usize::try_from(index)
                .ok()
                .and_then(|i| p.raw_blocks.get(i))
                .filter(|b| {
                    marker == RAW_DATA_MARKER
                        && stored >= 0
                        && b.len() == stored as usize
                        && len <= b.len()
                })
                .ok_or_else(|| ParcelError::ReadFailed {
                    offset,
                    reason: format!("no raw block of {} bytes", len),
                })?;
            Ok(block[..len].to_vec())
        })
        .unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // Atomicity helpers
    // ---------------------------------------------------------------------

    pub(crate) fn checkpoint(&self) -> ParcelCheckpoint {
        ParcelCheckpoint {
            buffer: self.buffer.checkpoint(),
            objects: self.objects.len(),
            raw_blocks: self.raw_blocks.len(),
            raw_used: self.raw_used,
        }
    }

    pub(crate) fn restore(&mut self, cp: ParcelCheckpoint) {
        self.buffer.restore(cp.buffer);
        self.objects.truncate(cp.objects);
        self.raw_blocks.truncate(cp.raw_blocks);
        self.raw_used = cp.raw_used;
    }

    /// Run a composite write, rolling everything back if it fails.
    pub(crate) fn atomic_write<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParcelResult<T>,
    ) -> ParcelResult<T> {
        let cp = self.checkpoint();
        let result = f(self);
        if result.is_err() {
            self.restore(cp);
        }
        result
    }

    /// Run a composite read, restoring the read cursor if it fails.
    pub(crate) fn atomic_read<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParcelResult<T>,
    ) -> ParcelResult<T> {
        let start = self.buffer.read_position();
        let result = f(self);
        if result.is_err() {
            self.buffer.rewind_read(start);
        }
        result
    }
}

impl fmt::Debug for MessageParcel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageParcel")
            .field("size", &self.buffer.size())
            .field("capacity", &self.buffer.capacity())
            .field("write_position", &self.buffer.write_position())
            .field("read_position", &self.buffer.read_position())
            .field("objects", &self.objects.len())
            .field("raw_bytes", &self.raw_used)
            .finish()
    }
}

// Primitive::get bound to a parcel, for atomic_read.
trait GetFrom: Primitive {
    fn get_from(parcel: &mut MessageParcel) -> ParcelResult<Self> {
        Self::get(&mut parcel.buffer)
    }
}

impl<T: Primitive> GetFrom for T {}

/// Encode a string item without touching any parcel.
fn encode_string(value: &str) -> ParcelResult<Vec<u8>> {
    let units: Vec<u16> = value.encode_utf16().collect();
    if units.len() > MAX_STRING_LEN {
        log::debug!(
            "[parcel] string of {} units refused (limit {})",
            units.len(),
            MAX_STRING_LEN
        );
        return Err(ParcelError::capacity(units.len(), MAX_STRING_LEN));
    }
    let body = (units.len() + 1) * 2;
    let mut out = Vec::with_capacity(4 + align_up(body, 4));
    out.extend_from_slice(&(units.len() as i32).to_le_bytes());
    for unit in &units {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out.extend_from_slice(&[0, 0]);
    out.resize(4 + align_up(body, 4), 0);
    Ok(out)
}

/// Fill an empty vector completely, or overwrite a pre-sized one up to the
/// shorter of the two.
pub(crate) fn fill_into<T>(out: &mut Vec<T>, items: Vec<T>) {
    if out.is_empty() {
        *out = items;
    } else {
        for (slot, item) in out.iter_mut().zip(items) {
            *slot = item;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MAX_BYTE_ARRAY_LEN, MAX_SMALL_ARRAY_LEN, MAX_WIDE_ARRAY_LEN};

    #[test]
    fn test_constant_string_occupies_24_bytes() {
        let mut parcel = MessageParcel::new();
        parcel.write_string("constant").expect("write should succeed");
        assert_eq!(parcel.size(), 24);
        assert_eq!(parcel.capacity(), 64);
        assert_eq!(parcel.read_string(), "constant");
        assert_eq!(parcel.read_position(), 24);
    }

    #[test]
    fn test_string_layout() {
        let mut parcel = MessageParcel::new();
        parcel.write_string("ab").expect("write should succeed");
        assert_eq!(parcel.data(), vec![2, 0, 0, 0, b'a', 0, b'b', 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_string_ceiling_is_atomic() {
        let mut parcel = MessageParcel::new();
        let at_limit = "x".repeat(MAX_STRING_LEN);
        parcel.write_string(&at_limit).expect("write should succeed");
        let size = parcel.size();
        let capacity = parcel.capacity();

        let over = "x".repeat(MAX_STRING_LEN + 1);
        assert!(matches!(
            parcel.write_string(&over),
            Err(ParcelError::CapacityExceeded { .. })
        ));
        assert_eq!(parcel.size(), size);
        assert_eq!(parcel.capacity(), capacity);
        assert_eq!(parcel.read_string().len(), MAX_STRING_LEN);
    }

    #[test]
    fn test_lenient_reads_on_empty_parcel() {
        let mut parcel = MessageParcel::new();
        assert_eq!(parcel.read_int(), 0);
        assert_eq!(parcel.read_long(), 0);
        assert!(!parcel.read_boolean());
        assert_eq!(parcel.read_string(), "");
        assert!(parcel.read_int_array().is_empty());
        assert!(matches!(
            parcel.try_read_int(),
            Err(ParcelError::ReadFailed { offset: 0, .. })
        ));
    }

    #[test]
    fn test_scalar_round_trip() {
        let mut parcel = MessageParcel::new();
        parcel.write_byte(-128).expect("write should succeed");
        parcel.write_short(i16::MAX).expect("write should succeed");
        parcel.write_int(i32::MIN).expect("write should succeed");
        parcel.write_long(i64::MAX).expect("write should succeed");
        parcel.write_float(0.25).expect("write should succeed");
        parcel.write_double(-1e300).expect("write should succeed");
        parcel.write_boolean(true).expect("write should succeed");
        parcel.write_char(255).expect("write should succeed");
        assert_eq!(parcel.size(), 4 + 4 + 4 + 8 + 8 + 8 + 4 + 4);

        assert_eq!(parcel.read_byte(), -128);
        assert_eq!(parcel.read_short(), i16::MAX);
        assert_eq!(parcel.read_int(), i32::MIN);
        assert_eq!(parcel.read_long(), i64::MAX);
        assert_eq!(parcel.read_float(), 0.25);
        assert_eq!(parcel.read_double(), -1e300);
        assert!(parcel.read_boolean());
        assert_eq!(parcel.read_char(), 255);
        assert_eq!(parcel.readable_bytes(), 0);
    }

    #[test]
    fn test_array_ceilings() {
        let mut parcel = MessageParcel::new();
        parcel
            .write_byte_array(&vec![1i8; MAX_BYTE_ARRAY_LEN])
            .expect("byte array at limit should succeed");
        parcel
            .write_short_array(&vec![1i16; MAX_SMALL_ARRAY_LEN])
            .expect("short array at limit should succeed");
        parcel
            .write_double_array(&vec![1.0; MAX_WIDE_ARRAY_LEN])
            .expect("double array at limit should succeed");
        let size = parcel.size();
        let capacity = parcel.capacity();

        assert!(parcel.write_byte_array(&vec![1i8; MAX_BYTE_ARRAY_LEN + 1]).is_err());
        assert!(parcel.write_boolean_array(&vec![true; MAX_SMALL_ARRAY_LEN + 1]).is_err());
        assert!(parcel.write_long_array(&vec![1i64; MAX_WIDE_ARRAY_LEN + 1]).is_err());
        assert!(parcel
            .write_string_array(&vec!["s"; MAX_STRING_ARRAY_LEN + 1])
            .is_err());
        assert_eq!(parcel.size(), size);
        assert_eq!(parcel.capacity(), capacity);

        assert_eq!(parcel.read_byte_array().len(), MAX_BYTE_ARRAY_LEN);
        assert_eq!(parcel.read_short_array().len(), MAX_SMALL_ARRAY_LEN);
        assert_eq!(parcel.read_double_array().len(), MAX_WIDE_ARRAY_LEN);
    }

    #[test]
    fn test_read_array_into_existing_storage() {
        let mut parcel = MessageParcel::new();
        parcel.write_int_array(&[1, 2, 3]).expect("write should succeed");
        parcel.write_int_array(&[4, 5, 6]).expect("write should succeed");
        parcel.write_int_array(&[7]).expect("write should succeed");

        let mut empty = Vec::new();
        parcel.read_int_array_into(&mut empty);
        assert_eq!(empty, vec![1, 2, 3]);

        let mut short = vec![0; 2];
        parcel.read_int_array_into(&mut short);
        assert_eq!(short, vec![4, 5]);

        let mut long = vec![9; 3];
        parcel.read_int_array_into(&mut long);
        assert_eq!(long, vec![7, 9, 9]);
        assert_eq!(parcel.readable_bytes(), 0);
    }

    #[test]
    fn test_interface_token_and_enforce() {
        let mut parcel = MessageParcel::new();
        parcel
            .write_interface_token("rpcTestAbility")
            .expect("write should succeed");
        assert_eq!(parcel.read_int(), STRICT_MODE_POLICY);
        assert!(parcel.rewind_read(0));
        parcel
            .enforce_interface("rpcTestAbility")
            .expect("token should match");
        assert!(parcel.rewind_read(0));
        assert!(matches!(
            parcel.enforce_interface("other"),
            Err(ParcelError::DescriptorMismatch { .. })
        ));
    }

    #[test]
    fn test_exception_header() {
        let mut reply = MessageParcel::new();
        reply.write_no_exception().expect("write should succeed");
        reply.write_int(7).expect("write should succeed");
        reply.read_exception().expect("no exception");
        assert_eq!(reply.read_int(), 7);

        let mut failed = MessageParcel::new();
        failed.write_exception(-3, "bad argument").expect("write should succeed");
        match failed.read_exception() {
            Err(ParcelError::RemoteException { code, message }) => {
                assert_eq!(code, -3);
                assert_eq!(message, "bad argument");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_raw_data_channel() {
        let mut parcel = MessageParcel::new();
        let payload = vec![0xAB; 100_000];
        parcel
            .write_raw_data(&payload, payload.len())
            .expect("write should succeed");
        assert_eq!(parcel.size(), 12);
        assert!(parcel.write_raw_data(&payload, payload.len() + 1).is_err());
        assert_eq!(parcel.raw_data_capacity(), RAW_DATA_CAPACITY);

        assert!(parcel.read_raw_data(payload.len() + 1).is_empty());
        assert_eq!(parcel.read_position(), 0);
        assert_eq!(parcel.read_raw_data(payload.len()), payload);
    }

    #[test]
    fn test_raw_data_requires_marker() {
        let mut parcel = MessageParcel::new();
        parcel.write_raw_data(&[1, 2, 3, 4], 4).expect("write should succeed");
        assert_eq!(parcel.read_int(), RAW_DATA_MARKER);

        // A plain `len, index` pair is not a raw block.
        let mut forged = MessageParcel::new();
        forged.write_raw_data(&[1, 2, 3, 4], 4).expect("write should succeed");
        assert!(forged.rewind_write(0));
        forged.write_int(4).expect("write should succeed");
        forged.write_int(0).expect("write should succeed");
        assert!(forged.read_raw_data(4).is_empty());
        assert_eq!(forged.read_position(), 0);
    }

    #[test]
    fn test_rewind_then_overwrite() {
        let mut parcel = MessageParcel::new();
        parcel.write_int(1).expect("write should succeed");
        parcel.write_int(2).expect("write should succeed");
        assert!(parcel.rewind_write(0));
        parcel.write_int(3).expect("write should succeed");
        assert_eq!(parcel.size(), 8);
        assert_eq!(parcel.read_int(), 3);
        assert_eq!(parcel.read_int(), 2);
        // Reading past the logical end is lenient.
        assert_eq!(parcel.read_int(), 0);
        assert!(!parcel.rewind_write(9));
    }

    #[test]
    fn test_reclaim_releases_everything() {
        let mut parcel = MessageParcel::new();
        parcel.write_string("abc").expect("write should succeed");
        parcel.write_raw_data(&[1, 2, 3], 3).expect("write should succeed");
        parcel.reclaim();
        assert_eq!(parcel.size(), 0);
        assert_eq!(parcel.capacity(), 0);
        assert_eq!(parcel.read_raw_data(3), Vec::<u8>::new());
    }
}
