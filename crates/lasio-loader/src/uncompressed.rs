use bytes::Bytes;
use lasio_wire::Header;
use log::{debug, trace};

use crate::error::{ChannelError, LasError};
use crate::loader::{PointLoader, ReadChunk, SKIP_UNSUPPORTED};

/// Reads an uncompressed file straight out of its in-memory buffer.
///
/// Records are handed out by slicing the shared buffer, so a chunk costs
/// a reference count bump rather than a copy.
pub struct UncompressedLoader {
    buffer: Bytes,
    header: Option<Header>,
    /// Records already handed out. Only `read_data` on this loader moves
    /// it, and only forward; `open` resets it.
    read_offset: u32,
}

impl UncompressedLoader {
    #[must_use]
    pub fn new(buffer: Bytes) -> Self {
        Self {
            buffer,
            header: None,
            read_offset: 0,
        }
    }

    /// Records already returned by `read_data`.
    #[must_use]
    pub fn read_offset(&self) -> u32 {
        self.read_offset
    }
}

impl PointLoader for UncompressedLoader {
    async fn open(&mut self) -> Result<(), LasError> {
        tokio::task::yield_now().await;
        self.read_offset = 0;
        Ok(())
    }

    async fn get_header(&mut self) -> Result<Header, LasError> {
        tokio::task::yield_now().await;

        let header = Header::read_from(&self.buffer)?;
        let available = self.buffer.len() as u64;
        if header.points_end() > available {
            return Err(ChannelError::Truncated {
                needed: header.points_end(),
                available,
            }
            .into());
        }

        debug!(
            "header: {} points of format {} ({} bytes each) at offset {}",
            header.points_count,
            header.points_format_id,
            header.points_struct_size,
            header.points_offset
        );
        self.header = Some(header);
        Ok(header)
    }

    async fn read_data(
        &mut self,
        count: u32,
        _start: u32,
        skip: u32,
    ) -> Result<ReadChunk, LasError> {
        tokio::task::yield_now().await;

        if skip != 0 {
            return Err(LasError::UnsupportedOperation(SKIP_UNSUPPORTED));
        }
        let header = self.header.ok_or(LasError::HeaderNotReady)?;

        let count = count.min(header.points_count.saturating_sub(self.read_offset));
        let size = usize::from(header.points_struct_size);
        let start = header.points_offset as usize + self.read_offset as usize * size;
        let end = start + count as usize * size;
        trace!("reading {count} records, bytes {start}..{end}");

        let chunk = ReadChunk {
            buffer: self.buffer.slice(start..end),
            count,
            has_more_data: self.read_offset + count < header.points_count,
        };
        self.read_offset += count;
        Ok(chunk)
    }

    fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }
}
