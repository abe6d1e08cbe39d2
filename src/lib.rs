//! Schema-driven codec for the Apache Thrift Compact Protocol.
//!
//! # Overview
//!
//! A bidirectional codec designed to efficiently and safely:
//! - Encode in-memory value trees into compact protocol buffers
//! - Decode untrusted compact protocol input back into value trees
//!
//! The shape of the data is declared once as an immutable [Schema] tree and
//! drives both directions: the encoder visits fields in declared order and
//! the decoder validates every wire tag against the declaration. Fields
//! present on the wire but absent from the schema are skipped, so old
//! schemas keep decoding payloads produced by newer writers.
//!
//! Also included: the Facebook 32-bit float extension ([`Schema::Float`])
//! and a schema-less diagnostic dump ([`pretty::dump`]).
//!
//! # Example
//!
//! ```
//! use thrift_compact::{decode, encode, Field, Schema, StructSchema, Value};
//!
//! // Describe the payload once. Schemas are immutable and cheap to share.
//! let schema = StructSchema::new([
//!     ("id", Field::new(1, Schema::I64)),
//!     ("name", Field::new(2, Schema::String)),
//!     ("tags", Field::new(3, Schema::list(Schema::String)).optional()),
//! ]);
//!
//! // Encode a conforming value. Absent entries are simply not written.
//! let value = Value::structure([
//!     ("id", Value::I64(7)),
//!     ("name", Value::String("ada".into())),
//! ]);
//! let bytes = encode(&value, &schema).unwrap();
//!
//! // Decoding recovers the same tree.
//! assert_eq!(decode(&bytes[..], &schema).unwrap(), value);
//! ```

pub mod error;
pub mod pretty;
pub mod reader;
pub mod schema;
pub mod value;
pub mod varint;
pub mod writer;

// Re-export main types and entry points
pub use error::Error;
pub use reader::decode;
pub use schema::{Field, KeySchema, Schema, StructSchema, TType};
pub use value::{MapKey, Value};
pub use writer::encode;
