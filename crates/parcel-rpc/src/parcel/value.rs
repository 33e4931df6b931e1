// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamically typed values and their coercion into wire kinds.
//!
//! Bridges loosely typed callers (scripting front ends, generated stubs
//! reading configuration) to the typed parcel API. The runtime tag of each
//! [`Value`] is checked against the requested [`Kind`] before anything is
//! written; numbers are coerced with two's-complement wraparound.

use super::error::{ParcelError, ParcelResult};
use super::MessageParcel;
use crate::remote::IRemoteObject;
use std::fmt;
use std::sync::Arc;

/// Wire kind requested by a dynamic write or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Char,
    String,
    RemoteObject,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Char => "char",
            Self::String => "string",
            Self::RemoteObject => "remote object",
        }
    }

    fn is_numeric(self) -> bool {
        !matches!(self, Self::Boolean | Self::String | Self::RemoteObject)
    }
}

/// Runtime value with a dynamic type tag.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    /// All numbers share one double-precision representation.
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Remote(Arc<dyn IRemoteObject>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Remote(_) => "remote object",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "Undefined"),
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => write!(f, "Bool({})", b),
            Self::Number(n) => write!(f, "Number({})", n),
            Self::String(s) => write!(f, "String({:?})", s),
            Self::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Self::Remote(obj) => write!(f, "Remote({:?})", obj.descriptor()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Remote(a), Self::Remote(b)) => match (a.stub_core(), b.stub_core()) {
                (Some(x), Some(y)) => Arc::ptr_eq(&x, &y),
                _ => false,
            },
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// Truncate `value` toward zero and wrap it into a signed `bits`-wide integer.
///
/// `wrap_integer(32768.0, 16) == -32768`, `wrap_integer(-2147483649.0, 32) ==
/// 2147483647`. Non-finite inputs become 0.
pub fn wrap_integer(value: f64, bits: u32) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    let modulus = 2f64.powi(bits as i32);
    let wrapped = value.trunc().rem_euclid(modulus);
    let signed = if wrapped >= modulus / 2.0 {
        wrapped - modulus
    } else {
        wrapped
    };
    signed as i64
}

fn wrap_char(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.trunc().rem_euclid(256.0) as u8
}

fn mismatch(kind: Kind, value: &Value) -> ParcelError {
    ParcelError::TypeMismatch {
        expected: kind.as_str(),
        found: value.type_name(),
    }
}

/// Check `value` against `kind` without writing anything.
fn check(kind: Kind, value: &Value) -> ParcelResult<()> {
    match (kind, value) {
        (Kind::RemoteObject, Value::Remote(_)) => Ok(()),
        (Kind::RemoteObject, other) => Err(ParcelError::InvalidHandle(format!(
            "{} is not a remote object",
            other.type_name()
        ))),
        (Kind::Boolean, Value::Bool(_)) | (Kind::String, Value::String(_)) => Ok(()),
        (k, Value::Number(_)) if k.is_numeric() => Ok(()),
        (k, v) => Err(mismatch(k, v)),
    }
}

impl MessageParcel {
    /// Write `value` as `kind`. A tag mismatch fails with `TypeMismatch` (or
    /// `InvalidHandle` for remote objects) before any byte is written.
    pub fn write_value(&mut self, kind: Kind, value: &Value) -> ParcelResult<()> {
        check(kind, value)?;
        match value {
            Value::Number(n) => self.write_number(kind, *n),
            Value::Bool(b) => self.write_boolean(*b),
            Value::String(s) => self.write_string(s),
            Value::Remote(obj) => self.write_remote_object(obj.as_ref()),
            other => Err(mismatch(kind, other)),
        }
    }

    fn write_number(&mut self, kind: Kind, n: f64) -> ParcelResult<()> {
        match kind {
            Kind::Byte => self.write_byte(wrap_integer(n, 8) as i8),
            Kind::Short => self.write_short(wrap_integer(n, 16) as i16),
            Kind::Int => self.write_int(wrap_integer(n, 32) as i32),
            // Saturating conversion: the double has already rounded anything past 2^53.
            Kind::Long => self.write_long(n as i64),
            Kind::Float => self.write_float(n as f32),
            Kind::Double => self.write_double(n),
            Kind::Char => self.write_char(wrap_char(n)),
            Kind::Boolean | Kind::String | Kind::RemoteObject => {
                Err(mismatch(kind, &Value::Number(n)))
            }
        }
    }

    /// Read the next item as `kind`. Lenient: missing data yields the kind's
    /// default (`0`, `false`, `""`) and a missing handle yields `Null`.
    pub fn read_value(&mut self, kind: Kind) -> Value {
        match kind {
            Kind::Byte => Value::Number(f64::from(self.read_byte())),
            Kind::Short => Value::Number(f64::from(self.read_short())),
            Kind::Int => Value::Number(f64::from(self.read_int())),
            Kind::Long => Value::Number(self.read_long() as f64),
            Kind::Float => Value::Number(f64::from(self.read_float())),
            Kind::Double => Value::Number(self.read_double()),
            Kind::Char => Value::Number(f64::from(self.read_char())),
            Kind::Boolean => Value::Bool(self.read_boolean()),
            Kind::String => Value::String(self.read_string()),
            Kind::RemoteObject => match self.read_remote_object() {
                Some(proxy) => Value::Remote(Arc::new(proxy)),
                None => Value::Null,
            },
        }
    }

    /// Write a homogeneous array. Every element is checked before the count is
    /// written, so a single bad element leaves the parcel untouched.
    pub fn write_value_array(&mut self, kind: Kind, values: &[Value]) -> ParcelResult<()> {
        for value in values {
            check(kind, value)?;
        }
        match kind {
            Kind::Byte => self.write_byte_array(&numbers(values, |n| wrap_integer(n, 8) as i8)),
            Kind::Short => {
                self.write_short_array(&numbers(values, |n| wrap_integer(n, 16) as i16))
            }
            Kind::Int => self.write_int_array(&numbers(values, |n| wrap_integer(n, 32) as i32)),
            Kind::Long => self.write_long_array(&numbers(values, |n| n as i64)),
            Kind::Float => self.write_float_array(&numbers(values, |n| n as f32)),
            Kind::Double => self.write_double_array(&numbers(values, |n| n)),
            Kind::Char => self.write_char_array(&numbers(values, wrap_char)),
            Kind::Boolean => {
                let bools: Vec<bool> = values.iter().filter_map(Value::as_bool).collect();
                self.write_boolean_array(&bools)
            }
            Kind::String => {
                let strings: Vec<&str> = values.iter().filter_map(Value::as_str).collect();
                self.write_string_array(&strings)
            }
            Kind::RemoteObject => {
                let objects: Vec<&dyn IRemoteObject> = values
                    .iter()
                    .filter_map(|v| match v {
                        Value::Remote(obj) => Some(obj.as_ref()),
                        _ => None,
                    })
                    .collect();
                self.write_remote_object_array(&objects)
            }
        }
    }

    /// Read a homogeneous array written as `kind`.
    pub fn read_value_array(&mut self, kind: Kind) -> Vec<Value> {
        fn nums<T: Into<f64>>(items: Vec<T>) -> Vec<Value> {
            items.into_iter().map(|v| Value::Number(v.into())).collect()
        }
        match kind {
            Kind::Byte => nums(self.read_byte_array()),
            Kind::Short => nums(self.read_short_array()),
            Kind::Int => nums(self.read_int_array()),
            Kind::Long => self
                .read_long_array()
                .into_iter()
                .map(|v| Value::Number(v as f64))
                .collect(),
            Kind::Float => nums(self.read_float_array()),
            Kind::Double => nums(self.read_double_array()),
            Kind::Char => nums(self.read_char_array()),
            Kind::Boolean => self.read_boolean_array().into_iter().map(Value::Bool).collect(),
            Kind::String => self.read_string_array().into_iter().map(Value::String).collect(),
            Kind::RemoteObject => self
                .read_remote_object_array()
                .into_iter()
                .map(|p| match p {
                    Some(proxy) => Value::Remote(Arc::new(proxy)),
                    None => Value::Null,
                })
                .collect(),
        }
    }
}

fn numbers<T>(values: &[Value], convert: impl Fn(f64) -> T) -> Vec<T> {
    values
        .iter()
        .filter_map(Value::as_number)
        .map(convert)
        .collect()
}
