use bytes::Bytes;
use lasio_wire::Header;

use crate::error::LasError;
use crate::proxy::CompressedProxy;
use crate::uncompressed::UncompressedLoader;

/// One `read_data` result: raw record bytes plus how many records they
/// hold. Ownership passes to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadChunk {
    pub buffer: Bytes,
    pub count: u32,
    pub has_more_data: bool,
}

/// Capability set shared by every loader variant.
///
/// A loader moves through these states:
///
/// ```text
///   Unopened ──open()──▶ Opened ──get_header()──▶ HeaderKnown
///                                                     │
///                                  read_data() × N ◀──┘
///                                        │
///                                        ▼
///                      Exhausted (has_more_data == false)
/// ```
///
/// Every method is async, including on the in-memory path, so callers
/// cannot come to depend on one variant finishing synchronously. Methods
/// take `&mut self`: reads on one loader are serialized by the borrow
/// checker, and the read cursor belongs to that loader alone.
#[allow(async_fn_in_trait)]
pub trait PointLoader {
    /// Prepare the loader for reading.
    ///
    /// # Errors
    ///
    /// [`LasError::ModuleUnavailable`] on the compressed path when the
    /// external decoder is missing or not initialized; any channel error
    /// the decoder reports.
    async fn open(&mut self) -> Result<(), LasError>;

    /// Produce the file header and remember it for later reads.
    ///
    /// # Errors
    ///
    /// Truncated buffers, decoder errors, or an untranslatable decoder
    /// header.
    async fn get_header(&mut self) -> Result<Header, LasError>;

    /// Read up to `count` records. `skip` must be 0.
    ///
    /// # Errors
    ///
    /// - [`LasError::UnsupportedOperation`] for a non-zero `skip`. Checked
    ///   first, so it wins over every other error.
    /// - [`LasError::HeaderNotReady`] before [`get_header`](Self::get_header)
    ///   has succeeded.
    async fn read_data(&mut self, count: u32, start: u32, skip: u32)
    -> Result<ReadChunk, LasError>;

    /// Header from the last successful [`get_header`](Self::get_header).
    fn header(&self) -> Option<&Header>;
}

/// Message for a strided read.
pub(crate) const SKIP_UNSUPPORTED: &str = "skip != 0 implementation is not available";

/// The loader a [`LasFile`](crate::LasFile) picked at construction.
pub enum Loader {
    Uncompressed(UncompressedLoader),
    Compressed(CompressedProxy),
}

impl PointLoader for Loader {
    async fn open(&mut self) -> Result<(), LasError> {
        match self {
            Self::Uncompressed(l) => l.open().await,
            Self::Compressed(l) => l.open().await,
        }
    }

    async fn get_header(&mut self) -> Result<Header, LasError> {
        match self {
            Self::Uncompressed(l) => l.get_header().await,
            Self::Compressed(l) => l.get_header().await,
        }
    }

    async fn read_data(
        &mut self,
        count: u32,
        start: u32,
        skip: u32,
    ) -> Result<ReadChunk, LasError> {
        match self {
            Self::Uncompressed(l) => l.read_data(count, start, skip).await,
            Self::Compressed(l) => l.read_data(count, start, skip).await,
        }
    }

    fn header(&self) -> Option<&Header> {
        match self {
            Self::Uncompressed(l) => l.header(),
            Self::Compressed(l) => l.header(),
        }
    }
}
