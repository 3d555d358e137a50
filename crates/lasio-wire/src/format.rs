use std::fmt;

use crate::error::WireError;
use crate::header::POINT_FORMAT_AT;
use crate::le::u8_at;

/// Byte offset of the version major byte; minor follows at +1.
pub const VERSION_AT: usize = 24;

/// Highest supported version, encoded as `major * 10 + minor`.
pub const MAX_VERSION: u16 = 12;

/// Bit 7 of the point format byte.
pub const COMPRESSION_BIT_7: u8 = 0b1000_0000;

/// Bit 6 of the point format byte.
pub const COMPRESSION_BIT_6: u8 = 0b0100_0000;

/// Mask that strips both compression bits, leaving the true format id.
pub const FORMAT_ID_MASK: u8 = !(COMPRESSION_BIT_7 | COMPRESSION_BIT_6);

/// File format version, `major.minor`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    /// Version as a single comparable number: `major * 10 + minor`.
    #[must_use]
    pub fn as_number(self) -> u16 {
        u16::from(self.major) * 10 + u16::from(self.minor)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// What the first bytes of a file say about how to read the rest.
///
/// Detection only looks at two places:
///
/// ```text
///   offset 24..26  version major, minor
///   offset 104     point format byte
///                    bit 7 ─┐
///                    bit 6 ─┴─ compression flags
///                    bits 0-5  point format id
/// ```
///
/// | bit 7 | bit 6 | meaning                              |
/// |-------|-------|--------------------------------------|
/// | 0     | 0     | uncompressed                         |
/// | 1     | 0     | compressed                           |
/// | 0     | 1     | compressed                           |
/// | 1     | 1     | old style compression, rejected      |
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatInfo {
    pub version: Version,
    pub compressed: bool,
    /// Point format id with bits 6 and 7 cleared.
    pub point_format_id: u8,
}

impl FormatInfo {
    /// Inspect a raw file buffer and pick the encoding variant.
    ///
    /// # Errors
    ///
    /// - [`WireError::UnexpectedEof`] if the buffer ends before the point
    ///   format byte.
    /// - [`WireError::UnsupportedVersion`] if the version is above 1.2.
    /// - [`WireError::UnsupportedCompression`] if both compression bits
    ///   are set.
    pub fn detect(buf: &[u8]) -> Result<Self, WireError> {
        let version = Version {
            major: u8_at(buf, VERSION_AT)?,
            minor: u8_at(buf, VERSION_AT + 1)?,
        };

        if version.as_number() > MAX_VERSION {
            return Err(WireError::UnsupportedVersion {
                major: version.major,
                minor: version.minor,
            });
        }

        let raw = u8_at(buf, POINT_FORMAT_AT)?;
        let bit_7 = raw & COMPRESSION_BIT_7 != 0;
        let bit_6 = raw & COMPRESSION_BIT_6 != 0;

        if bit_7 && bit_6 {
            return Err(WireError::UnsupportedCompression { format_id: raw });
        }

        Ok(Self {
            version,
            compressed: bit_7 || bit_6,
            point_format_id: raw & FORMAT_ID_MASK,
        })
    }
}
