pub mod dsp;
pub mod path;

pub use dsp::{parse_number, DspType, Protocol, UnknownVariant, I2C_ADDRESS_RANGE};
pub use path::{NormalizedPath, PathError};
