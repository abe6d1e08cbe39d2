//! Schema descriptors that drive encoding and decoding.
//!
//! A [Schema] is a purely descriptive, immutable tree: it carries no values.
//! Nested nodes sit behind [`Arc`], so subtrees are cheap to clone and may be
//! shared across threads and across concurrent encode/decode calls.

use crate::Error;
use std::{fmt, sync::Arc};

// ---------- Wire type tags ----------

/// Type tags as they appear on the wire.
///
/// `BoolTrue`/`BoolFalse` double as the *value* of a boolean struct field:
/// the writer folds the boolean into the field header and the reader recovers
/// it from there without consuming further bytes. `Float` is a Facebook
/// extension to the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TType {
    Stop = 0,
    BoolTrue = 1,
    BoolFalse = 2,
    Byte = 3,
    I16 = 4,
    I32 = 5,
    I64 = 6,
    Double = 7,
    Binary = 8,
    List = 9,
    Set = 10,
    Map = 11,
    Struct = 12,
    Float = 13,
}

impl TType {
    /// Parses a 4-bit wire tag.
    pub(crate) fn from_wire(tag: u8) -> Result<Self, Error> {
        Ok(match tag {
            0 => Self::Stop,
            1 => Self::BoolTrue,
            2 => Self::BoolFalse,
            3 => Self::Byte,
            4 => Self::I16,
            5 => Self::I32,
            6 => Self::I64,
            7 => Self::Double,
            8 => Self::Binary,
            9 => Self::List,
            10 => Self::Set,
            11 => Self::Map,
            12 => Self::Struct,
            13 => Self::Float,
            _ => return Err(Error::UnknownType(tag)),
        })
    }

    /// Human-readable tag name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::BoolTrue => "bool-true",
            Self::BoolFalse => "bool-false",
            Self::Byte => "byte",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Double => "double",
            Self::Binary => "binary",
            Self::List => "list",
            Self::Set => "set",
            Self::Map => "map",
            Self::Struct => "struct",
            Self::Float => "float",
        }
    }
}

impl fmt::Display for TType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------- Schema nodes ----------

/// Describes the type of a single value on the wire.
///
/// `String` and `Binary` are indistinguishable on the wire (both carry the
/// [`TType::Binary`] tag); the distinction only selects whether the decoder
/// produces UTF-8 text or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schema {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    Float,
    String,
    Binary,
    List(Arc<Schema>),
    Set(Arc<Schema>),
    Map(KeySchema, Arc<Schema>),
    Struct(StructSchema),
}

impl Schema {
    /// A list of `item` elements.
    pub fn list(item: Schema) -> Self {
        Self::List(Arc::new(item))
    }

    /// A set of `item` elements.
    ///
    /// Sets share the list wire form; neither side enforces or restores
    /// uniqueness.
    pub fn set(item: Schema) -> Self {
        Self::Set(Arc::new(item))
    }

    /// A map from `key` to `value`.
    ///
    /// Keys are restricted to the types with a natural associative-map
    /// representation; anything outside `{String, I16, I32}` panics.
    pub fn map(key: Schema, value: Schema) -> Self {
        let key = match key {
            Schema::String => KeySchema::String,
            Schema::I16 => KeySchema::I16,
            Schema::I32 => KeySchema::I32,
            other => panic!(
                "map keys must be strings or small integers, not {}",
                other.type_name()
            ),
        };
        Self::Map(key, Arc::new(value))
    }

    /// The tag this node carries on the wire.
    ///
    /// Booleans have no single tag (the value selects [`TType::BoolTrue`] or
    /// [`TType::BoolFalse`] in the field header), so asking for one outside a
    /// struct field fails with [`Error::InvalidBooleanContext`].
    pub(crate) fn wire_type(&self) -> Result<TType, Error> {
        Ok(match self {
            Self::Bool => return Err(Error::InvalidBooleanContext),
            Self::Byte => TType::Byte,
            Self::I16 => TType::I16,
            Self::I32 => TType::I32,
            Self::I64 => TType::I64,
            Self::Double => TType::Double,
            Self::Float => TType::Float,
            Self::String | Self::Binary => TType::Binary,
            Self::List(_) => TType::List,
            Self::Set(_) => TType::Set,
            Self::Map(..) => TType::Map,
            Self::Struct(_) => TType::Struct,
        })
    }

    /// Whether a wire tag conforms to this node.
    pub(crate) fn matches(&self, wire: TType) -> bool {
        match self {
            Self::Bool => matches!(wire, TType::BoolTrue | TType::BoolFalse),
            other => other.wire_type().map(|tag| tag == wire).unwrap_or(false),
        }
    }

    /// Name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Double => "double",
            Self::Float => "float",
            Self::String => "string",
            Self::Binary => "binary",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(..) => "map",
            Self::Struct(_) => "struct",
        }
    }
}

impl From<StructSchema> for Schema {
    fn from(shape: StructSchema) -> Self {
        Self::Struct(shape)
    }
}

/// Map key types with a natural associative-map representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySchema {
    String,
    I16,
    I32,
}

impl KeySchema {
    pub(crate) fn wire_type(&self) -> TType {
        match self {
            Self::String => TType::Binary,
            Self::I16 => TType::I16,
            Self::I32 => TType::I32,
        }
    }

    pub(crate) fn matches(&self, wire: TType) -> bool {
        self.wire_type() == wire
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::I16 => "i16",
            Self::I32 => "i32",
        }
    }
}

// ---------- Fields and struct shapes ----------

/// A numbered, optionally optional slot in a struct shape.
///
/// The id is the stable identity of the field on the wire; the name under
/// which the field is registered in a [StructSchema] exists in memory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    id: i16,
    schema: Arc<Schema>,
    optional: bool,
}

impl Field {
    /// Declares a required field. Ids must be positive.
    pub fn new(id: i16, schema: Schema) -> Self {
        assert!(id > 0, "field ids must be positive, got {id}");
        Self {
            id,
            schema: Arc::new(schema),
            optional: false,
        }
    }

    /// Marks the field optional: the corresponding entry may be absent from
    /// decoded output. Wire behavior is unchanged (every field is effectively
    /// optional on the wire), and the encoder already treats absent entries
    /// as not-written regardless of this marker.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn id(&self) -> i16 {
        self.id
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// An ordered, named collection of numbered fields.
///
/// Declaration order is the order the encoder visits fields; lookups during
/// decoding go by id. Construction rejects duplicate names and duplicate ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructSchema {
    fields: Vec<(String, Field)>,
}

impl StructSchema {
    pub fn new<S: Into<String>>(fields: impl IntoIterator<Item = (S, Field)>) -> Self {
        let fields: Vec<(String, Field)> =
            fields.into_iter().map(|(n, f)| (n.into(), f)).collect();
        for (i, (name, field)) in fields.iter().enumerate() {
            for (other_name, other) in &fields[..i] {
                assert!(name != other_name, "duplicate field name {name:?}");
                assert!(
                    field.id != other.id,
                    "field {name:?} reuses id {} of {other_name:?}",
                    field.id
                );
            }
        }
        Self { fields }
    }

    /// Unions two shapes into a new one; the inputs are unchanged.
    ///
    /// `other`'s fields override on name collision, in place, keeping the
    /// original position; fields new to `other` are appended in its order.
    /// An id collision between differently named fields is rejected.
    pub fn merge(&self, other: &StructSchema) -> StructSchema {
        let mut fields = self.fields.clone();
        for (name, field) in &other.fields {
            match fields.iter_mut().find(|(n, _)| n.as_str() == name) {
                Some((_, slot)) => *slot = field.clone(),
                None => fields.push((name.clone(), field.clone())),
            }
        }
        StructSchema::new(fields)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub(crate) fn by_id(&self, id: i16) -> Option<(&str, &Field)> {
        self.fields
            .iter()
            .find(|(_, f)| f.id == id)
            .map(|(n, f)| (n.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_tags() {
        for (tag, expected) in [
            (0u8, TType::Stop),
            (1, TType::BoolTrue),
            (7, TType::Double),
            (11, TType::Map),
            (13, TType::Float),
        ] {
            assert_eq!(TType::from_wire(tag).unwrap(), expected);
            assert_eq!(expected as u8, tag);
        }
        assert!(matches!(TType::from_wire(14), Err(Error::UnknownType(14))));
        assert!(matches!(TType::from_wire(0xFF), Err(Error::UnknownType(0xFF))));
    }

    #[test]
    fn test_bool_matches_both_header_tags() {
        assert!(Schema::Bool.matches(TType::BoolTrue));
        assert!(Schema::Bool.matches(TType::BoolFalse));
        assert!(!Schema::Bool.matches(TType::Byte));
        assert!(!Schema::I32.matches(TType::BoolTrue));
    }

    #[test]
    fn test_string_and_binary_share_wire_tag() {
        assert!(Schema::String.matches(TType::Binary));
        assert!(Schema::Binary.matches(TType::Binary));
        assert_eq!(Schema::String.wire_type().unwrap(), TType::Binary);
    }

    #[test]
    fn test_bool_has_no_wire_type() {
        assert!(matches!(
            Schema::Bool.wire_type(),
            Err(Error::InvalidBooleanContext)
        ));
    }

    #[test]
    #[should_panic(expected = "map keys must be strings or small integers")]
    fn test_map_key_restriction() {
        Schema::map(Schema::Double, Schema::I32);
    }

    #[test]
    #[should_panic(expected = "field ids must be positive")]
    fn test_field_id_must_be_positive() {
        Field::new(0, Schema::I32);
    }

    #[test]
    #[should_panic(expected = "duplicate field name")]
    fn test_duplicate_names_rejected() {
        StructSchema::new([
            ("x", Field::new(1, Schema::I32)),
            ("x", Field::new(2, Schema::I32)),
        ]);
    }

    #[test]
    #[should_panic(expected = "reuses id")]
    fn test_duplicate_ids_rejected() {
        StructSchema::new([
            ("x", Field::new(1, Schema::I32)),
            ("y", Field::new(1, Schema::I64)),
        ]);
    }

    #[test]
    fn test_merge_overrides_by_name() {
        let a = StructSchema::new([
            ("x", Field::new(1, Schema::I32)),
            ("y", Field::new(2, Schema::String)),
        ]);
        let b = StructSchema::new([
            ("y", Field::new(2, Schema::Binary)),
            ("z", Field::new(3, Schema::Bool)),
        ]);

        let merged = a.merge(&b);
        let names: Vec<_> = merged.fields().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, ["x", "y", "z"]);
        assert_eq!(merged.by_id(2).unwrap().1.schema(), &Schema::Binary);

        // Inputs are unchanged.
        assert_eq!(a.by_id(2).unwrap().1.schema(), &Schema::String);
        assert_eq!(a.len(), 2);
    }

    #[test]
    #[should_panic(expected = "reuses id")]
    fn test_merge_rejects_id_collision() {
        let a = StructSchema::new([("x", Field::new(1, Schema::I32))]);
        let b = StructSchema::new([("y", Field::new(1, Schema::I32))]);
        a.merge(&b);
    }

    #[test]
    fn test_schemas_share_subtrees() {
        let inner = Schema::list(Schema::I64);
        let shape = StructSchema::new([
            ("a", Field::new(1, inner.clone())),
            ("b", Field::new(2, inner)),
        ]);
        // Cloning a node clones its Arc handles, so both fields point at the
        // same item allocation rather than structurally equal copies.
        let (Schema::List(a), Schema::List(b)) = (
            shape.by_id(1).unwrap().1.schema(),
            shape.by_id(2).unwrap().1.schema(),
        ) else {
            panic!("expected list schemas");
        };
        assert!(Arc::ptr_eq(a, b));
    }
}
