use super::field::FieldName;
use super::header::PacketHeader;
use super::{HeaderError, OperationKey};

use FieldName::*;

/// Produces empty headers for each packet kind of one DSP family.
///
/// Every header comes with its `operation` field already set.
pub trait HeaderGenerator {
    fn new_write_header(&self) -> PacketHeader;

    fn new_read_request_header(&self) -> PacketHeader;

    fn new_read_response_header(&self) -> PacketHeader;

    /// Pick the header layout announced by the first byte of a packet.
    fn new_header_from_operation_byte(&self, byte: u8) -> Result<PacketHeader, HeaderError> {
        match OperationKey::try_from(byte)? {
            OperationKey::Write => Ok(self.new_write_header()),
            OperationKey::ReadRequest => Ok(self.new_read_request_header()),
            OperationKey::ReadResponse => Ok(self.new_read_response_header()),
        }
    }
}

/// Headers for ADAU145x/146x parts, with 32-bit length fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct Adau14xxHeaders;

const ADAU14XX_WRITE: &[(FieldName, usize, usize)] = &[
    (Operation, 0, 1),
    (Safeload, 1, 1),
    (Channel, 2, 1),
    (TotalLength, 3, 4),
    (ChipAddress, 7, 1),
    (DataLength, 8, 4),
    (Address, 12, 2),
];

const ADAU14XX_READ_REQUEST: &[(FieldName, usize, usize)] = &[
    (Operation, 0, 1),
    (TotalLength, 1, 4),
    (ChipAddress, 5, 1),
    (DataLength, 6, 4),
    (Address, 10, 2),
    (Reserved, 12, 2),
];

const ADAU14XX_READ_RESPONSE: &[(FieldName, usize, usize)] = &[
    (Operation, 0, 1),
    (TotalLength, 1, 4),
    (ChipAddress, 5, 1),
    (DataLength, 6, 4),
    (Address, 10, 2),
    (Success, 12, 1),
    (Reserved, 13, 1),
];

impl HeaderGenerator for Adau14xxHeaders {
    fn new_write_header(&self) -> PacketHeader {
        PacketHeader::from_layout(ADAU14XX_WRITE, OperationKey::Write)
    }

    fn new_read_request_header(&self) -> PacketHeader {
        PacketHeader::from_layout(ADAU14XX_READ_REQUEST, OperationKey::ReadRequest)
    }

    fn new_read_response_header(&self) -> PacketHeader {
        PacketHeader::from_layout(ADAU14XX_READ_RESPONSE, OperationKey::ReadResponse)
    }
}

/// Headers for ADAU1701/1401 parts, with 16-bit length fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct Adau1x01Headers;

const ADAU1X01_WRITE: &[(FieldName, usize, usize)] = &[
    (Operation, 0, 1),
    (Safeload, 1, 1),
    (Channel, 2, 1),
    (TotalLength, 3, 2),
    (ChipAddress, 5, 1),
    (DataLength, 6, 2),
    (Address, 8, 2),
];

const ADAU1X01_READ_REQUEST: &[(FieldName, usize, usize)] = &[
    (Operation, 0, 1),
    (TotalLength, 1, 2),
    (ChipAddress, 3, 1),
    (DataLength, 4, 2),
    (Address, 6, 2),
];

const ADAU1X01_READ_RESPONSE: &[(FieldName, usize, usize)] = &[
    (Operation, 0, 1),
    (TotalLength, 1, 2),
    (ChipAddress, 3, 1),
    (DataLength, 4, 2),
    (Address, 6, 2),
    (Success, 8, 1),
    (Reserved, 9, 1),
];

impl HeaderGenerator for Adau1x01Headers {
    fn new_write_header(&self) -> PacketHeader {
        PacketHeader::from_layout(ADAU1X01_WRITE, OperationKey::Write)
    }

    fn new_read_request_header(&self) -> PacketHeader {
        PacketHeader::from_layout(ADAU1X01_READ_REQUEST, OperationKey::ReadRequest)
    }

    fn new_read_response_header(&self) -> PacketHeader {
        PacketHeader::from_layout(ADAU1X01_READ_RESPONSE, OperationKey::ReadResponse)
    }
}
