use serde::Serialize;

use super::conversion::MAX_FIELD_SIZE;
use super::HeaderError;

/// Names of the fields that can appear in a SigmaStudio packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Operation,
    Safeload,
    Channel,
    TotalLength,
    ChipAddress,
    DataLength,
    Address,
    Success,
    Reserved,
}

impl FieldName {
    pub const ALL: [FieldName; 9] = [
        FieldName::Operation,
        FieldName::Safeload,
        FieldName::Channel,
        FieldName::TotalLength,
        FieldName::ChipAddress,
        FieldName::DataLength,
        FieldName::Address,
        FieldName::Success,
        FieldName::Reserved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Operation => "operation",
            FieldName::Safeload => "safeload",
            FieldName::Channel => "channel",
            FieldName::TotalLength => "total_length",
            FieldName::ChipAddress => "chip_address",
            FieldName::DataLength => "data_length",
            FieldName::Address => "address",
            FieldName::Success => "success",
            FieldName::Reserved => "reserved",
        }
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single header field: a big-endian integer at a fixed byte offset.
///
/// Only built through [`Field::new`], so `size` is always in `1..=8` and
/// the last byte index fits a `usize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub(super) name: FieldName,
    pub(super) offset: usize,
    pub(super) size: usize,
    pub(super) value: u64,
}

impl Field {
    /// Create a zero-valued field.
    ///
    /// Fails if `size` is zero or wider than a `u64`, or if the field would
    /// end past `usize::MAX`.
    pub fn new(name: FieldName, offset: usize, size: usize) -> Result<Self, HeaderError> {
        if size == 0 || size > MAX_FIELD_SIZE {
            return Err(HeaderError::InvalidFieldSize { name, size });
        }
        if offset.checked_add(size).is_none() {
            return Err(HeaderError::OffsetOutOfRange { name, offset });
        }
        Ok(Field {
            name,
            offset,
            size,
            value: 0,
        })
    }

    pub fn name(&self) -> FieldName {
        self.name
    }

    /// Offset in bytes from the start of the header.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Width in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// Index of the last byte occupied by this field.
    pub fn end(&self) -> usize {
        self.offset + self.size - 1
    }
}
