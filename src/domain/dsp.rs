use serde::Serialize;

use crate::sigmastudio::{Adau14xxHeaders, Adau1x01Headers, HeaderGenerator};

/// Error from parsing one of the DSP enum values.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}', expected one of: {expected}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// The DSP family, which fixes the SigmaStudio header layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DspType {
    Adau14xx,
    Adau1x01,
}

impl DspType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DspType::Adau14xx => "adau14xx",
            DspType::Adau1x01 => "adau1x01",
        }
    }

    /// Header layouts used by SigmaStudio for this family.
    pub fn header_generator(&self) -> Box<dyn HeaderGenerator> {
        match self {
            DspType::Adau14xx => Box::new(Adau14xxHeaders),
            DspType::Adau1x01 => Box::new(Adau1x01Headers),
        }
    }
}

impl std::str::FromStr for DspType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adau14xx" => Ok(DspType::Adau14xx),
            "adau1x01" => Ok(DspType::Adau1x01),
            _ => Err(UnknownVariant {
                kind: "DSP type",
                value: s.to_string(),
                expected: "adau14xx, adau1x01",
            }),
        }
    }
}

impl std::fmt::Display for DspType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The serial bus used to reach the DSP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Spi,
    I2c,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Spi => "spi",
            Protocol::I2c => "i2c",
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spi" => Ok(Protocol::Spi),
            "i2c" => Ok(Protocol::I2c),
            _ => Err(UnknownVariant {
                kind: "DSP protocol",
                value: s.to_string(),
                expected: "spi, i2c",
            }),
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowest and highest non-reserved 7-bit I2C addresses.
pub const I2C_ADDRESS_RANGE: std::ops::RangeInclusive<u8> = 0x03..=0x77;

/// Parse an unsigned integer written in decimal or with a `0x` prefix.
pub fn parse_number(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    // `from_str_radix` also takes a leading `+`, so check the digits first.
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u64::from_str_radix(hex, 16).ok()
    } else {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        raw.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dsp_type_parses_case_insensitively() {
        assert_eq!("ADAU14xx".parse::<DspType>(), Ok(DspType::Adau14xx));
        assert_eq!(" adau1x01 ".parse::<DspType>(), Ok(DspType::Adau1x01));
    }

    #[test]
    fn dsp_type_unknown_lists_expected_values() {
        let err = "adau1701".parse::<DspType>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown DSP type 'adau1701', expected one of: adau14xx, adau1x01"
        );
    }

    #[test]
    fn protocol_round_trips_through_display() {
        for protocol in [Protocol::Spi, Protocol::I2c] {
            assert_eq!(protocol.to_string().parse::<Protocol>(), Ok(protocol));
        }
    }

    #[test]
    fn protocol_rejects_unknown_bus() {
        assert!("uart".parse::<Protocol>().is_err());
    }

    #[test]
    fn parse_number_accepts_decimal_and_hex() {
        assert_eq!(parse_number("0"), Some(0));
        assert_eq!(parse_number("104"), Some(104));
        assert_eq!(parse_number("0x68"), Some(0x68));
        assert_eq!(parse_number("0X3B"), Some(0x3b));
    }

    #[test]
    fn parse_number_rejects_garbage() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("-1"), None);
        assert_eq!(parse_number("0xZZ"), None);
        assert_eq!(parse_number("one"), None);
    }

    #[test]
    fn parse_number_rejects_signs() {
        assert_eq!(parse_number("+1"), None);
        assert_eq!(parse_number("0x+1"), None);
        assert_eq!(parse_number("0x"), None);
    }
}
