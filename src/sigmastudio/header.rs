use serde::Serialize;

use super::conversion::{bytes_to_int, fits, int_to_bytes};
use super::field::{Field, FieldName};
use super::{HeaderError, OperationKey};

/// An ordered collection of [`Field`]s forming a packet header.
///
/// Fields are kept sorted by offset and never overlap. Names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PacketHeader {
    fields: Vec<Field>,
}

impl PacketHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a header from a list of fields, in any order.
    pub fn from_fields(fields: impl IntoIterator<Item = Field>) -> Result<Self, HeaderError> {
        let mut header = Self::new();
        for field in fields {
            header.add(field)?;
        }
        Ok(header)
    }

    /// Build a header from a fixed `(name, offset, size)` table, with the
    /// `operation` field holding `operation`.
    ///
    /// The table must already be sorted, non-overlapping and use sizes in
    /// `1..=8`; the generators' tests hold every table to that.
    pub(crate) fn from_layout(
        layout: &[(FieldName, usize, usize)],
        operation: OperationKey,
    ) -> Self {
        let fields = layout
            .iter()
            .map(|&(name, offset, size)| Field {
                name,
                offset,
                size,
                value: match name {
                    FieldName::Operation => operation as u64,
                    _ => 0,
                },
            })
            .collect();
        Self { fields }
    }

    /// Add a field. A field whose name is already present is ignored.
    ///
    /// Returns `HeaderError::Overlap` and leaves the header unchanged if the
    /// new field shares bytes with an existing one.
    pub fn add(&mut self, field: Field) -> Result<(), HeaderError> {
        if self.contains(field.name) {
            return Ok(());
        }

        let index = self.fields.partition_point(|f| f.offset <= field.offset);

        if let Some(prev) = index.checked_sub(1).map(|i| &self.fields[i]) {
            if prev.end() >= field.offset {
                return Err(HeaderError::Overlap {
                    first: prev.name,
                    second: field.name,
                });
            }
        }
        if let Some(next) = self.fields.get(index) {
            if field.end() >= next.offset {
                return Err(HeaderError::Overlap {
                    first: field.name,
                    second: next.name,
                });
            }
        }

        self.fields.insert(index, field);
        Ok(())
    }

    /// Total size of the header in bytes, up to and including its last field.
    pub fn size(&self) -> usize {
        self.fields.last().map_or(0, |f| f.end() + 1)
    }

    /// Whether consecutive fields follow each other without gaps.
    pub fn is_continuous(&self) -> bool {
        self.fields
            .windows(2)
            .all(|pair| pair[0].end() + 1 == pair[1].offset)
    }

    /// Encode all field values big-endian at their offsets. Gaps are zero.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = vec![0; self.size()];
        for field in &self.fields {
            int_to_bytes(field.value, &mut buffer, field.offset, field.size);
        }
        buffer
    }

    /// Populate field values from raw header bytes.
    ///
    /// `data` must be exactly [`size`](Self::size) bytes long.
    pub fn parse(&mut self, data: &[u8]) -> Result<(), HeaderError> {
        if data.len() != self.size() {
            return Err(HeaderError::LengthMismatch {
                expected: self.size(),
                actual: data.len(),
            });
        }
        for field in &mut self.fields {
            // In bounds: data.len() covers the last field's end.
            field.value = bytes_to_int(data, field.offset, field.size).unwrap_or_default();
        }
        Ok(())
    }

    pub fn get(&self, name: FieldName) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Value of the named field, if present.
    pub fn value(&self, name: FieldName) -> Option<u64> {
        self.get(name).map(|f| f.value)
    }

    /// Set a field value.
    ///
    /// Fails if the field does not exist or the value does not fit its width.
    pub fn set(&mut self, name: FieldName, value: u64) -> Result<(), HeaderError> {
        let valid = self.names_joined();
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or(HeaderError::UnknownField { name, valid })?;
        if !fits(value, field.size) {
            return Err(HeaderError::ValueTooWide {
                name,
                value,
                size: field.size,
            });
        }
        field.value = value;
        Ok(())
    }

    pub fn contains(&self, name: FieldName) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Field names in offset order.
    pub fn names(&self) -> Vec<FieldName> {
        self.fields.iter().map(|f| f.name).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    /// The operation this header describes, if the key is known.
    pub fn operation(&self) -> Option<OperationKey> {
        self.value(FieldName::Operation)
            .and_then(|v| u8::try_from(v).ok())
            .and_then(|v| OperationKey::try_from(v).ok())
    }

    pub fn is_write_request(&self) -> bool {
        self.operation() == Some(OperationKey::Write)
    }

    pub fn is_read_request(&self) -> bool {
        self.operation() == Some(OperationKey::ReadRequest)
    }

    pub fn is_read_response(&self) -> bool {
        self.operation() == Some(OperationKey::ReadResponse)
    }

    /// Whether this is a write that the DSP applies through software safeload.
    pub fn is_safeload(&self) -> bool {
        self.is_write_request() && self.value(FieldName::Safeload) == Some(1)
    }

    /// Whether a payload follows this header on the wire.
    pub fn carries_payload(&self) -> bool {
        self.is_write_request() || self.is_read_response()
    }

    fn names_joined(&self) -> String {
        self.fields
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<'a> IntoIterator for &'a PacketHeader {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: FieldName, offset: usize, size: usize) -> Field {
        Field::new(name, offset, size).unwrap()
    }

    fn small_header() -> PacketHeader {
        PacketHeader::from_fields([
            field(FieldName::Address, 3, 2),
            field(FieldName::Operation, 0, 1),
            field(FieldName::DataLength, 1, 2),
        ])
        .unwrap()
    }

    #[test]
    fn fields_are_sorted_by_offset() {
        assert_eq!(
            small_header().names(),
            vec![
                FieldName::Operation,
                FieldName::DataLength,
                FieldName::Address
            ]
        );
    }

    #[test]
    fn size_spans_to_last_field() {
        assert_eq!(small_header().size(), 5);
        assert_eq!(PacketHeader::new().size(), 0);
    }

    #[test]
    fn duplicate_name_is_ignored() {
        let mut header = small_header();
        header.add(field(FieldName::Address, 10, 4)).unwrap();
        assert_eq!(header.get(FieldName::Address).unwrap().offset(), 3);
        assert_eq!(header.size(), 5);
    }

    #[test]
    fn overlapping_field_is_rejected() {
        let mut header = small_header();
        let err = header.add(field(FieldName::Channel, 2, 1)).unwrap_err();
        assert!(matches!(
            err,
            HeaderError::Overlap {
                first: FieldName::DataLength,
                second: FieldName::Channel
            }
        ));
        assert!(!header.contains(FieldName::Channel));
    }

    #[test]
    fn field_touching_next_offset_overlaps() {
        let mut header = PacketHeader::new();
        header.add(field(FieldName::Address, 4, 2)).unwrap();
        let err = header.add(field(FieldName::Operation, 0, 5)).unwrap_err();
        assert!(matches!(err, HeaderError::Overlap { .. }));
    }

    #[test]
    fn gap_breaks_continuity() {
        let mut header = small_header();
        assert!(header.is_continuous());
        header.add(field(FieldName::Reserved, 6, 1)).unwrap();
        assert!(!header.is_continuous());
        assert_eq!(header.to_bytes().len(), 7);
    }

    #[test]
    fn to_bytes_encodes_big_endian_at_offsets() {
        let mut header = small_header();
        header.set(FieldName::Operation, 0x09).unwrap();
        header.set(FieldName::DataLength, 0x0102).unwrap();
        header.set(FieldName::Address, 0xABCD).unwrap();
        assert_eq!(header.to_bytes(), [0x09, 0x01, 0x02, 0xAB, 0xCD]);
    }

    #[test]
    fn parse_populates_values() {
        let mut header = small_header();
        header.parse(&[0x0A, 0x00, 0x04, 0x10, 0x00]).unwrap();
        assert_eq!(header.value(FieldName::DataLength), Some(4));
        assert_eq!(header.value(FieldName::Address), Some(0x1000));
        assert!(header.is_read_request());
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let mut header = small_header();
        let err = header.parse(&[0x0A, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            HeaderError::LengthMismatch {
                expected: 5,
                actual: 2
            }
        ));
    }

    #[test]
    fn set_unknown_field_lists_valid_names() {
        let mut header = small_header();
        let err = header.set(FieldName::Success, 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid field name success; valid names are operation, data_length, address"
        );
    }

    #[test]
    fn set_rejects_value_wider_than_field() {
        let mut header = small_header();
        assert!(matches!(
            header.set(FieldName::Operation, 0x100),
            Err(HeaderError::ValueTooWide { size: 1, .. })
        ));
    }

    #[test]
    fn safeload_requires_write_operation() {
        let mut header = PacketHeader::from_fields([
            field(FieldName::Operation, 0, 1),
            field(FieldName::Safeload, 1, 1),
        ])
        .unwrap();
        header.set(FieldName::Safeload, 1).unwrap();
        header.set(FieldName::Operation, OperationKey::ReadRequest as u64).unwrap();
        assert!(!header.is_safeload());
        header.set(FieldName::Operation, OperationKey::Write as u64).unwrap();
        assert!(header.is_safeload());
        assert!(header.carries_payload());
    }

    #[test]
    fn from_layout_fills_operation_only() {
        let header = PacketHeader::from_layout(
            &[(FieldName::Operation, 0, 1), (FieldName::Address, 1, 2)],
            OperationKey::ReadResponse,
        );
        assert_eq!(header.value(FieldName::Operation), Some(0x0B));
        assert_eq!(header.value(FieldName::Address), Some(0));
        assert!(header.is_read_response());
    }

    #[test]
    fn unknown_operation_is_none() {
        let mut header = small_header();
        header.set(FieldName::Operation, 0x42).unwrap();
        assert_eq!(header.operation(), None);
        assert!(!header.carries_payload());
    }
}
