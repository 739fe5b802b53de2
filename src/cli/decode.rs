use miette::IntoDiagnostic;
use serde::Serialize;

use crate::domain::DspType;
use crate::settings::{InstallSettings, InstallVars};
use crate::sigmastudio::{FieldName, HeaderError, OperationKey, PacketHeader};

/// Errors from turning command-line hex into a packet header.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum DecodeError {
    #[error("no packet bytes given")]
    #[diagnostic(code(decode::empty))]
    Empty,
    #[error("invalid hex {0:?}")]
    #[diagnostic(code(decode::hex), help("write bytes as pairs of hex digits, e.g. 09 01 00"))]
    InvalidHex(String),
    #[error("packet is {actual} bytes long but a {operation:?} header needs {expected}")]
    #[diagnostic(code(decode::truncated))]
    Truncated {
        operation: OperationKey,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    #[diagnostic(transparent)]
    Header(#[from] HeaderError),
}

/// JSON shape printed by `decode-header`.
#[derive(Debug, Serialize)]
struct DecodedPacket<'a> {
    dsp_type: DspType,
    operation: Option<OperationKey>,
    header_size: usize,
    safeload: bool,
    fields: &'a PacketHeader,
    payload_length: usize,
}

pub(super) fn run(dsp_type: Option<DspType>, hex: &str) -> miette::Result<()> {
    let dsp_type = match dsp_type {
        Some(dsp_type) => dsp_type,
        None => {
            let vars = InstallVars::defaults().overlay_process_env();
            InstallSettings::resolve(&vars)?.dsp_type
        }
    };
    let bytes = parse_hex(hex)?;
    let (header, payload_length) = decode(dsp_type, &bytes)?;

    let packet = DecodedPacket {
        dsp_type,
        operation: header.operation(),
        header_size: header.size(),
        safeload: header.is_safeload(),
        fields: &header,
        payload_length,
    };
    let json = serde_json::to_string_pretty(&packet).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

/// Decode the header at the start of `bytes`; returns it with the number of
/// bytes that follow it.
pub(crate) fn decode(dsp_type: DspType, bytes: &[u8]) -> Result<(PacketHeader, usize), DecodeError> {
    let (&operation_byte, _) = bytes.split_first().ok_or(DecodeError::Empty)?;
    let operation = OperationKey::try_from(operation_byte)?;
    let mut header = dsp_type
        .header_generator()
        .new_header_from_operation_byte(operation_byte)?;

    let size = header.size();
    if bytes.len() < size {
        return Err(DecodeError::Truncated {
            operation,
            expected: size,
            actual: bytes.len(),
        });
    }
    header.parse(&bytes[..size])?;

    let payload_length = bytes.len() - size;
    if header.carries_payload() {
        if let Some(declared) = header.value(FieldName::DataLength) {
            if declared != payload_length as u64 {
                log::warn!("header declares {declared} payload bytes, {payload_length} present");
            }
        }
    }
    Ok((header, payload_length))
}

/// Parse hex digit pairs, ignoring whitespace, `:` separators and a leading `0x`.
pub(crate) fn parse_hex(text: &str) -> Result<Vec<u8>, DecodeError> {
    let text = text.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    let digits: Vec<char> = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    if digits.is_empty() {
        return Err(DecodeError::Empty);
    }
    if digits.len() % 2 != 0 {
        return Err(DecodeError::InvalidHex(text.to_string()));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let high = pair[0].to_digit(16);
            let low = pair[1].to_digit(16);
            match (high, low) {
                (Some(h), Some(l)) => Ok((h * 16 + l) as u8),
                _ => Err(DecodeError::InvalidHex(text.to_string())),
            }
        })
        .collect()
}
