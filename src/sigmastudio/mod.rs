//! Headers of the packets exchanged with SigmaStudio.
//!
//! A header is a sequence of big-endian integer fields at fixed offsets. The
//! first byte is always the operation key, which decides the layout of the
//! rest of the header for a given DSP family.

mod conversion;
mod field;
mod generator;
mod header;

pub use field::{Field, FieldName};
pub use generator::{Adau14xxHeaders, Adau1x01Headers, HeaderGenerator};
pub use header::PacketHeader;

/// First byte of every SigmaStudio packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum OperationKey {
    Write = 0x09,
    ReadRequest = 0x0A,
    ReadResponse = 0x0B,
}

impl TryFrom<u8> for OperationKey {
    type Error = HeaderError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x09 => Ok(OperationKey::Write),
            0x0A => Ok(OperationKey::ReadRequest),
            0x0B => Ok(OperationKey::ReadResponse),
            other => Err(HeaderError::UnknownOperation(other)),
        }
    }
}

/// Errors from building, filling or decoding a packet header.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum HeaderError {
    #[error("field {name} has invalid size {size}; sizes range from 1 to 8 bytes")]
    #[diagnostic(code(sigmastudio::field_size))]
    InvalidFieldSize { name: FieldName, size: usize },

    #[error("field {name} at offset {offset} runs past the addressable range")]
    #[diagnostic(code(sigmastudio::offset))]
    OffsetOutOfRange { name: FieldName, offset: usize },

    #[error("fields {first} and {second} overlap")]
    #[diagnostic(code(sigmastudio::overlap))]
    Overlap { first: FieldName, second: FieldName },

    #[error("input data needs to be exactly {expected} bytes long, got {actual}")]
    #[diagnostic(code(sigmastudio::length))]
    LengthMismatch { expected: usize, actual: usize },

    #[error("invalid field name {name}; valid names are {valid}")]
    #[diagnostic(code(sigmastudio::unknown_field))]
    UnknownField { name: FieldName, valid: String },

    #[error("value {value:#x} does not fit into the {size}-byte field {name}")]
    #[diagnostic(code(sigmastudio::value_too_wide))]
    ValueTooWide {
        name: FieldName,
        value: u64,
        size: usize,
    },

    #[error("unknown operation key {0:#04x}")]
    #[diagnostic(
        code(sigmastudio::unknown_operation),
        help("valid keys are 0x09 (write), 0x0a (read request), 0x0b (read response)")
    )]
    UnknownOperation(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_keys_match_wire_values() {
        assert_eq!(OperationKey::Write as u8, 0x09);
        assert_eq!(OperationKey::ReadRequest as u8, 0x0A);
        assert_eq!(OperationKey::ReadResponse as u8, 0x0B);
    }

    #[test]
    fn unknown_operation_formats_as_hex() {
        let err = OperationKey::try_from(0x01).unwrap_err();
        assert_eq!(err.to_string(), "unknown operation key 0x01");
    }
}
