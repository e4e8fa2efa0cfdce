/*
    Gyre, flight dynamics executive
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use snafu::prelude::*;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

mod manager;
mod node;
mod path;

pub use manager::{PropertyManager, TreeSnapshot};
pub use node::PropertyNode;
pub use path::is_valid_name;

/// Errors raised by the property tree.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PropertyError {
    #[snafu(display("invalid property path `{path}`: {reason}"))]
    InvalidPath { path: String, reason: String },
    #[snafu(display("property `{path}` not found"))]
    NotFound { path: String },
    #[snafu(display("property `{path}` is already tied, keeping the original binding"))]
    AlreadyTied { path: String },
    #[snafu(display("property `{path}` has children and cannot be tied"))]
    NotALeaf { path: String },
    #[snafu(display("property `{path}` is a {actual} value and cannot be accessed as {requested}"))]
    TypeMismatch {
        path: String,
        actual: PropertyKind,
        requested: PropertyKind,
    },
    #[snafu(display("property `{path}` holds no value"))]
    NoValue { path: String },
    #[snafu(display("property `{path}` is read-only"))]
    ReadOnly { path: String },
}

/// The primitive type a property node stores or is tied as.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Bool,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    String,
}

impl PropertyKind {
    pub const fn is_numeric(&self) -> bool {
        !matches!(self, Self::Bool | Self::String)
    }

    /// Returns whether a value of this kind can be converted into `target` without loss of category.
    /// Within the numeric category, only widening conversions are allowed.
    pub const fn widens_to(&self, target: PropertyKind) -> bool {
        use PropertyKind::*;
        matches!(
            (self, target),
            (Bool, Bool)
                | (String, String)
                | (Int16, Int16 | Int32 | Int64 | Float | Double)
                | (Int32, Int32 | Int64 | Double)
                | (Int64, Int64 | Double)
                | (Float, Float | Double)
                | (Double, Double)
        )
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
        };
        write!(f, "{name}")
    }
}

/// A value stored in or exchanged with the property tree.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Bool(_) => PropertyKind::Bool,
            Self::Int16(_) => PropertyKind::Int16,
            Self::Int32(_) => PropertyKind::Int32,
            Self::Int64(_) => PropertyKind::Int64,
            Self::Float(_) => PropertyKind::Float,
            Self::Double(_) => PropertyKind::Double,
            Self::String(_) => PropertyKind::String,
        }
    }

    /// Converts this value into the `target` kind if that is a widening conversion.
    pub fn widen_to(self, target: PropertyKind) -> Option<PropertyValue> {
        if !self.kind().widens_to(target) {
            return None;
        }
        let widened = match (self, target) {
            (v, k) if v.kind() == k => v,
            (Self::Int16(v), PropertyKind::Int32) => Self::Int32(v.into()),
            (Self::Int16(v), PropertyKind::Int64) => Self::Int64(v.into()),
            (Self::Int16(v), PropertyKind::Float) => Self::Float(v.into()),
            (Self::Int16(v), PropertyKind::Double) => Self::Double(v.into()),
            (Self::Int32(v), PropertyKind::Int64) => Self::Int64(v.into()),
            (Self::Int32(v), PropertyKind::Double) => Self::Double(v.into()),
            (Self::Int64(v), PropertyKind::Double) => Self::Double(v as f64),
            (Self::Float(v), PropertyKind::Double) => Self::Double(v.into()),
            _ => return None,
        };
        Some(widened)
    }

    /// Returns this value as a double if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self.clone().widen_to(PropertyKind::Double) {
            Some(Self::Double(v)) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
        }
    }
}

/// A Rust primitive which may be stored in the property tree.
pub trait PropertyType: Sized + Send + Sync + 'static {
    const KIND: PropertyKind;

    fn into_value(self) -> PropertyValue;

    /// Extracts Self from the value, widening numeric types where allowed.
    fn from_value(value: PropertyValue) -> Option<Self>;
}

macro_rules! property_type {
    ($ty:ty, $variant:ident) => {
        impl PropertyType for $ty {
            const KIND: PropertyKind = PropertyKind::$variant;

            fn into_value(self) -> PropertyValue {
                PropertyValue::$variant(self)
            }

            fn from_value(value: PropertyValue) -> Option<Self> {
                match value.widen_to(Self::KIND)? {
                    PropertyValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }

        impl From<$ty> for PropertyValue {
            fn from(value: $ty) -> Self {
                PropertyValue::$variant(value)
            }
        }
    };
}

property_type!(bool, Bool);
property_type!(i16, Int16);
property_type!(i32, Int32);
property_type!(i64, Int64);
property_type!(f32, Float);
property_type!(f64, Double);
property_type!(String, String);

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

/// A reference counted, lockable handle on some state which is exposed through the property tree.
///
/// Model states are wrapped in a `Shared` so that the accessors tied into the tree can read and
/// write them while the model keeps ownership. Lock poisoning is recovered rather than propagated:
/// the simulation state is plain data and remains usable after a panic elsewhere.
#[derive(Debug, Default)]
pub struct Shared<T>(Arc<RwLock<T>>);

impl<T> Shared<T> {
    pub fn new(inner: T) -> Self {
        Self(Arc::new(RwLock::new(inner)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if both handles point to the same state.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Clone> Shared<T> {
    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> T {
        self.read().clone()
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

#[cfg(test)]
mod ut_props {
    use super::*;

    #[test]
    fn numeric_widening_only() {
        assert_eq!(
            PropertyValue::Int32(3).widen_to(PropertyKind::Double),
            Some(PropertyValue::Double(3.0))
        );
        assert_eq!(PropertyValue::Double(3.0).widen_to(PropertyKind::Int32), None);
        assert_eq!(PropertyValue::Bool(true).widen_to(PropertyKind::Double), None);
        assert_eq!(
            PropertyValue::String("1.0".to_string()).widen_to(PropertyKind::Double),
            None
        );
        assert_eq!(i64::from_value(PropertyValue::Int16(-4)), Some(-4));
        assert_eq!(f32::from_value(PropertyValue::Double(1.0)), None);
    }

    #[test]
    fn shared_handles_alias() {
        let a = Shared::new(1.0_f64);
        let b = a.clone();
        *b.write() = 2.0;
        assert_eq!(*a.read(), 2.0);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Shared::new(2.0)));
    }
}
