/// Errors raised while interpreting raw LAS bytes.
///
/// Each variant carries the byte offset or raw value that triggered it,
/// since the only useful way to debug a bad file is to go look at the
/// bytes in a hex viewer.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    /// The buffer ended before a field could be read.
    #[error("unexpected end of input: need {needed} bytes at offset {offset}, buffer holds {available}")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// File version is newer than 1.2.
    #[error("unsupported file version {major}.{minor}: only versions <= 1.2 are supported")]
    UnsupportedVersion { major: u8, minor: u8 },

    /// Both compression bits (7 and 6) of the point format byte are set.
    #[error("old style compression not supported (format byte {format_id:#04X})")]
    UnsupportedCompression { format_id: u8 },

    /// Point format id has no record reader.
    #[error("unsupported point format {format_id}")]
    UnsupportedPointFormat { format_id: u8 },

    /// Declared record length cannot hold the fields of its format.
    #[error("point format {format_id} needs {needed}-byte records, header declares {record_len}")]
    RecordTooShort {
        format_id: u8,
        record_len: u16,
        needed: usize,
    },

    /// Point index outside `[0, count)`.
    #[error("point index {index} out of range (count {count})")]
    IndexOutOfRange { index: usize, count: u32 },
}
