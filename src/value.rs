//! In-memory value trees: what the decoder produces and the encoder accepts.
//!
//! The schema is a runtime value, so decoded output is dynamic; conformance
//! between a [Value] and its [Schema](crate::Schema) is checked when the tree
//! crosses the codec, not by the type system.

use bytes::Bytes;
use std::collections::BTreeMap;

/// A single decoded (or to-be-encoded) value.
///
/// Sets are exposed as ordered sequences: the wire form of `SET` is identical
/// to `LIST` and neither direction enforces uniqueness.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    Float(f32),
    String(String),
    Binary(Bytes),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(BTreeMap<MapKey, Value>),
    Struct(BTreeMap<String, Value>),
}

/// Keys of a [Value::Map], limited to the types with a natural
/// associative-map representation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    String(String),
    I16(i16),
    I32(i32),
}

macro_rules! impl_scalar_accessor {
    ($(($variant:ident, $fn:ident, $type:ty)),+ $(,)?) => {
        $(
            pub fn $fn(&self) -> Option<$type> {
                match self {
                    Self::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        )+
    };
}

impl Value {
    /// Builds a struct value from name/value pairs.
    pub fn structure<S: Into<String>>(entries: impl IntoIterator<Item = (S, Value)>) -> Self {
        Self::Struct(entries.into_iter().map(|(n, v)| (n.into(), v)).collect())
    }

    /// Looks up an entry of a struct value; `None` for absent entries and
    /// non-struct values.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Struct(entries) => entries.get(name),
            _ => None,
        }
    }

    impl_scalar_accessor! {
        (Bool, as_bool, bool),
        (Byte, as_byte, i8),
        (I16, as_i16, i16),
        (I32, as_i32, i32),
        (I64, as_i64, i64),
        (Double, as_f64, f64),
        (Float, as_f32, f32),
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&[Value]> {
        match self {
            Self::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<MapKey, Value>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Struct(entries) => Some(entries),
            _ => None,
        }
    }

    /// Name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Byte(_) => "byte",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::Double(_) => "double",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Binary(_) => "binary",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Struct(_) => "struct",
        }
    }
}

macro_rules! impl_value_from {
    ($(($type:ty, $variant:ident)),+ $(,)?) => {
        $(
            impl From<$type> for Value {
                fn from(v: $type) -> Self {
                    Self::$variant(v)
                }
            }
        )+
    };
}

impl_value_from! {
    (bool, Bool),
    (i8, Byte),
    (i16, I16),
    (i32, I32),
    (i64, I64),
    (f64, Double),
    (f32, Float),
    (String, String),
    (Bytes, Binary),
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.into())
    }
}

impl MapKey {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
        }
    }
}

impl From<&str> for MapKey {
    fn from(v: &str) -> Self {
        Self::String(v.into())
    }
}

impl From<String> for MapKey {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i16> for MapKey {
    fn from(v: i16) -> Self {
        Self::I16(v)
    }
}

impl From<i32> for MapKey {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}
