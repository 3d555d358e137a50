use lasio_wire::WireError;

/// Errors surfaced by [`LasFile`](crate::LasFile) and its loaders.
///
/// Detection errors (`UnsupportedVersion`, `UnsupportedCompression`, and a
/// buffer too short to detect anything) come back synchronously from
/// [`LasFile::new`](crate::LasFile::new). Everything else arrives through
/// the future of the operation that failed.
///
/// ```text
///   LasError
///   ├── UnsupportedVersion      ← version above 1.2
///   ├── UnsupportedCompression  ← bits 7 and 6 of the format byte both set
///   ├── ModuleUnavailable       ← compressed file, no initialized decoder
///   ├── HeaderNotReady          ← read before the header was fetched
///   ├── UnsupportedOperation    ← non-zero skip
///   ├── IndexOutOfRange         ← point index outside [0, count)
///   ├── Channel(ChannelError)   ← decoder reported an error, went away,
///   │                             timed out, or the buffer was truncated
///   └── Wire(WireError)         ← point format the reader cannot decode
/// ```
#[derive(Debug, thiserror::Error)]
pub enum LasError {
    #[error("unsupported file version {major}.{minor}: only versions <= 1.2 are supported")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("old style compression not supported (format byte {format_id:#04X})")]
    UnsupportedCompression { format_id: u8 },

    /// A compressed file needs the external decoder, and it was either
    /// never supplied or never signalled that it finished loading.
    #[error("decoder module has not been loaded, compressed files are not available")]
    ModuleUnavailable,

    #[error("cannot start reading data till a header request is issued")]
    HeaderNotReady,

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    #[error("point index {index} out of range (count {count})")]
    IndexOutOfRange { index: usize, count: u32 },

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Wire(WireError),
}

/// Failures on the buffer or on the request/response channel to the
/// external decoder.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The decoder answered with `error` set.
    #[error("decoder error: {message}")]
    Remote { message: String },

    /// The decoder endpoint was dropped before answering.
    #[error("decoder channel closed")]
    Closed,

    /// No answer within the configured request timeout.
    #[error("decoder did not answer request {id} in time")]
    Timeout { id: String },

    /// The answer could not be translated into the expected shape.
    #[error("malformed decoder response: {0}")]
    Malformed(String),

    /// The file buffer is shorter than its header or point data needs.
    #[error("buffer truncated: need {needed} bytes, have {available}")]
    Truncated { needed: u64, available: u64 },
}

impl From<WireError> for LasError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::UnsupportedVersion { major, minor } => {
                Self::UnsupportedVersion { major, minor }
            }
            WireError::UnsupportedCompression { format_id } => {
                Self::UnsupportedCompression { format_id }
            }
            WireError::IndexOutOfRange { index, count } => Self::IndexOutOfRange { index, count },
            WireError::UnexpectedEof {
                offset,
                needed,
                available,
            } => Self::Channel(ChannelError::Truncated {
                needed: (offset + needed) as u64,
                available: available as u64,
            }),
            other => Self::Wire(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_errors_map_to_taxonomy() {
        let err: LasError = WireError::UnsupportedVersion { major: 1, minor: 3 }.into();
        assert!(matches!(err, LasError::UnsupportedVersion { major: 1, minor: 3 }));

        let err: LasError = WireError::IndexOutOfRange { index: 9, count: 9 }.into();
        assert!(matches!(err, LasError::IndexOutOfRange { index: 9, count: 9 }));

        let err: LasError = WireError::UnexpectedEof {
            offset: 10,
            needed: 4,
            available: 12,
        }
        .into();
        assert!(matches!(
            err,
            LasError::Channel(ChannelError::Truncated { needed: 14, available: 12 })
        ));

        let err: LasError = WireError::UnsupportedPointFormat { format_id: 7 }.into();
        assert!(matches!(err, LasError::Wire(_)));
    }
}
