//! Codec error type.

use crate::schema::TType;
use thiserror::Error;

/// Failures raised while encoding or decoding compact protocol data.
///
/// Every failure is fatal to the current call; nothing is retried. Unknown
/// *fields* on the wire are not errors (they are skipped for forward
/// compatibility); unknown *type tags* are.
#[derive(Error, Debug)]
pub enum Error {
    #[error("end of buffer")]
    EndOfBuffer,
    #[error("invalid varint (exceeds {0}-byte width)")]
    InvalidVarint(usize),
    #[error("unknown type tag {0}")]
    UnknownType(u8),
    #[error("type mismatch: schema expects {expected}, wire carries {}", .found.name())]
    TypeMismatch {
        expected: &'static str,
        found: TType,
    },
    #[error("refusing to decode with an empty struct schema")]
    EmptyStructRead,
    #[error("booleans may only appear as struct fields")]
    InvalidBooleanContext,
    #[error("cannot encode {found} where the schema expects {expected}")]
    UnsupportedWrite {
        expected: &'static str,
        found: &'static str,
    },
    #[error("string holds invalid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}
