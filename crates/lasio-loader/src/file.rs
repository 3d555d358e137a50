use bytes::Bytes;
use lasio_wire::{FormatInfo, Header, PointDecoder, Version};
use log::debug;

use crate::channel::DecoderChannel;
use crate::config::LoaderConfig;
use crate::error::LasError;
use crate::loader::{Loader, PointLoader, ReadChunk};
use crate::proxy::CompressedProxy;
use crate::uncompressed::UncompressedLoader;

/// An open LAS/LAZ file: the one handle callers use, whatever the
/// encoding.
///
/// Construction inspects the version and compression bits and picks a
/// loader; those checks run synchronously, so a bad file fails before
/// any async work starts. After that every operation is forwarded to the
/// loader.
///
/// ```text
///   raw bytes ──▶ FormatInfo::detect ──┬─▶ UncompressedLoader  (slices buffer)
///                                      └─▶ CompressedProxy     (DecoderChannel)
///
///   open() ─▶ get_header() ─▶ read_data() … ─▶ decoder(&chunk).get_point(i)
/// ```
///
/// # Example
///
/// ```rust,no_run
/// use lasio_loader::LasFile;
///
/// async fn count_ground(bytes: Vec<u8>) -> Result<usize, lasio_loader::LasError> {
///     let mut file = LasFile::new(bytes, None)?;
///     file.open().await?;
///     file.get_header().await?;
///
///     let mut ground = 0;
///     loop {
///         let chunk = file.read_data(10_000, 0, 0).await?;
///         let decoder = file.decoder(&chunk)?;
///         for point in decoder.points() {
///             if point?.classification == 2 {
///                 ground += 1;
///             }
///         }
///         if !chunk.has_more_data {
///             return Ok(ground);
///         }
///     }
/// }
/// ```
pub struct LasFile {
    info: FormatInfo,
    loader: Loader,
}

impl LasFile {
    /// Detect the format of `buffer` and pick a loader, with the default
    /// [`LoaderConfig`].
    ///
    /// `module` is the link to the external decoder; it is only used for
    /// compressed files and may be `None` otherwise.
    ///
    /// # Errors
    ///
    /// - [`LasError::UnsupportedVersion`] for versions above 1.2.
    /// - [`LasError::UnsupportedCompression`] when both compression bits
    ///   are set.
    /// - [`LasError::Channel`] if the buffer is too short to detect.
    pub fn new(buffer: impl Into<Bytes>, module: Option<DecoderChannel>) -> Result<Self, LasError> {
        Self::with_config(buffer, module, LoaderConfig::default())
    }

    /// Same as [`new`](Self::new) with an explicit configuration.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_config(
        buffer: impl Into<Bytes>,
        module: Option<DecoderChannel>,
        config: LoaderConfig,
    ) -> Result<Self, LasError> {
        let buffer = buffer.into();
        let info = FormatInfo::detect(&buffer)?;

        let loader = if info.compressed {
            Loader::Compressed(CompressedProxy::new(buffer, module, config))
        } else {
            Loader::Uncompressed(UncompressedLoader::new(buffer))
        };

        debug!(
            "version {}, point format {}, {}",
            info.version,
            info.point_format_id,
            if info.compressed { "compressed" } else { "uncompressed" }
        );
        Ok(Self { info, loader })
    }

    #[must_use]
    pub fn version(&self) -> Version {
        self.info.version
    }

    /// Version as `"major.minor"`.
    #[must_use]
    pub fn version_string(&self) -> String {
        self.info.version.to_string()
    }

    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.info.compressed
    }

    #[must_use]
    pub fn format_info(&self) -> &FormatInfo {
        &self.info
    }

    /// # Errors
    ///
    /// See [`PointLoader::open`].
    pub async fn open(&mut self) -> Result<(), LasError> {
        self.loader.open().await
    }

    /// # Errors
    ///
    /// See [`PointLoader::get_header`].
    pub async fn get_header(&mut self) -> Result<Header, LasError> {
        self.loader.get_header().await
    }

    /// # Errors
    ///
    /// See [`PointLoader::read_data`].
    pub async fn read_data(
        &mut self,
        count: u32,
        start: u32,
        skip: u32,
    ) -> Result<ReadChunk, LasError> {
        self.loader.read_data(count, start, skip).await
    }

    /// Header fetched by the last successful [`get_header`](Self::get_header).
    #[must_use]
    pub fn header(&self) -> Option<&Header> {
        self.loader.header()
    }

    /// Build a [`PointDecoder`] over the records of `chunk`, using the
    /// format and record size from the header.
    ///
    /// # Errors
    ///
    /// - [`LasError::HeaderNotReady`] before the header has been fetched.
    /// - [`LasError::Wire`] if the header's point format cannot be decoded.
    pub fn decoder<'c>(&self, chunk: &'c ReadChunk) -> Result<PointDecoder<'c>, LasError> {
        let header = self.loader.header().ok_or(LasError::HeaderNotReady)?;
        let decoder = PointDecoder::new(
            &chunk.buffer,
            header.points_format_id,
            header.points_struct_size,
            chunk.count,
        )?;
        Ok(decoder)
    }
}
