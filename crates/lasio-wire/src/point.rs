use serde::Serialize;

use crate::error::WireError;
use crate::le::{i32_at, u8_at, u16_at};

/// Point record layouts this reader understands.
///
/// All three share the same leading fields; formats 2 and 3 add an RGB
/// triple at different offsets because format 3 carries a GPS time
/// (and format 1's trailing bytes) in front of it.
///
/// ```text
/// ┌────────┬──────────────┬───────────┬────────────────┬──────────────┐
/// │ Format │ position     │ intensity │ classification │ color        │
/// ├────────┼──────────────┼───────────┼────────────────┼──────────────┤
/// │ 1      │ 0, 4, 8 i32  │ 12 u16    │ 16 u8          │ —            │
/// │ 2      │ 0, 4, 8 i32  │ 12 u16    │ 16 u8          │ 20, 22, 24   │
/// │ 3      │ 0, 4, 8 i32  │ 12 u16    │ 16 u8          │ 28, 30, 32   │
/// └────────┴──────────────┴───────────┴────────────────┴──────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PointFormat {
    Format1,
    Format2,
    Format3,
}

impl PointFormat {
    /// Map a (masked) point format id to its layout.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnsupportedPointFormat`] for any id other
    /// than 1, 2 or 3.
    pub fn from_id(format_id: u8) -> Result<Self, WireError> {
        match format_id {
            1 => Ok(Self::Format1),
            2 => Ok(Self::Format2),
            3 => Ok(Self::Format3),
            _ => Err(WireError::UnsupportedPointFormat { format_id }),
        }
    }

    #[must_use]
    pub fn id(self) -> u8 {
        match self {
            Self::Format1 => 1,
            Self::Format2 => 2,
            Self::Format3 => 3,
        }
    }

    /// Offset of the red channel, if this format carries color.
    #[must_use]
    pub fn color_offset(self) -> Option<usize> {
        match self {
            Self::Format1 => None,
            Self::Format2 => Some(20),
            Self::Format3 => Some(28),
        }
    }

    /// Fewest bytes a record must have for every field we read to fit.
    #[must_use]
    pub fn min_record_len(self) -> usize {
        match self.color_offset() {
            Some(at) => at + 6,
            None => 17,
        }
    }
}

/// One decoded point. Positions are raw integer grid units; use
/// [`Header::world_position`](crate::Header::world_position) to get
/// real coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PointRecord {
    pub format: PointFormat,
    pub position: [i32; 3],
    pub intensity: u16,
    pub classification: u8,
    pub color: Option<[u16; 3]>,
}

impl PointRecord {
    /// Decode one record from a slice that starts at the record.
    fn read_from(format: PointFormat, rec: &[u8]) -> Result<Self, WireError> {
        let color = match format.color_offset() {
            Some(at) => Some([u16_at(rec, at)?, u16_at(rec, at + 2)?, u16_at(rec, at + 4)?]),
            None => None,
        };

        Ok(Self {
            format,
            position: [i32_at(rec, 0)?, i32_at(rec, 4)?, i32_at(rec, 8)?],
            intensity: u16_at(rec, 12)?,
            classification: u8_at(rec, 16)?,
            color,
        })
    }
}

/// Decodes fixed-size point records out of a chunk buffer.
///
/// The decoder only borrows the buffer and holds no cursor, so any
/// number of decoders can read the same or different chunks at once.
///
/// # Example
///
/// ```rust
/// use lasio_wire::{PointDecoder, PointFormat};
///
/// let mut rec = [0u8; 20];
/// rec[0..4].copy_from_slice(&42i32.to_le_bytes());
/// rec[16] = 2; // ground
///
/// let decoder = PointDecoder::new(&rec, 1, 20, 1).unwrap();
/// let point = decoder.get_point(0).unwrap();
/// assert_eq!(point.format, PointFormat::Format1);
/// assert_eq!(point.position[0], 42);
/// assert_eq!(point.classification, 2);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct PointDecoder<'a> {
    buf: &'a [u8],
    format: PointFormat,
    record_len: usize,
    count: u32,
}

impl<'a> PointDecoder<'a> {
    /// Build a decoder over `count` records of `record_len` bytes each.
    ///
    /// # Errors
    ///
    /// - [`WireError::UnsupportedPointFormat`] if `format_id` is not 1, 2 or 3.
    /// - [`WireError::RecordTooShort`] if `record_len` cannot hold the
    ///   fields of the format.
    pub fn new(
        buf: &'a [u8],
        format_id: u8,
        record_len: u16,
        count: u32,
    ) -> Result<Self, WireError> {
        let format = PointFormat::from_id(format_id)?;
        let needed = format.min_record_len();
        if usize::from(record_len) < needed {
            return Err(WireError::RecordTooShort {
                format_id,
                record_len,
                needed,
            });
        }

        Ok(Self {
            buf,
            format,
            record_len: usize::from(record_len),
            count,
        })
    }

    #[must_use]
    pub fn format(&self) -> PointFormat {
        self.format
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Decode the record at `index`.
    ///
    /// # Errors
    ///
    /// - [`WireError::IndexOutOfRange`] if `index >= count`.
    /// - [`WireError::UnexpectedEof`] if the buffer is shorter than the
    ///   declared record count implies.
    pub fn get_point(&self, index: usize) -> Result<PointRecord, WireError> {
        if index >= self.count as usize {
            return Err(WireError::IndexOutOfRange {
                index,
                count: self.count,
            });
        }

        let start = index * self.record_len;
        let rec = self
            .buf
            .get(start..start + self.record_len)
            .ok_or(WireError::UnexpectedEof {
                offset: start,
                needed: self.record_len,
                available: self.buf.len(),
            })?;

        PointRecord::read_from(self.format, rec)
    }

    /// Iterate every record in order.
    pub fn points(&self) -> impl Iterator<Item = Result<PointRecord, WireError>> + '_ {
        (0..self.count as usize).map(move |i| self.get_point(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(format: PointFormat, len: usize, color: Option<[u16; 3]>) -> Vec<u8> {
        let mut rec = vec![0u8; len];
        rec[0..4].copy_from_slice(&(-1_234_i32).to_le_bytes());
        rec[4..8].copy_from_slice(&5_678_i32.to_le_bytes());
        rec[8..12].copy_from_slice(&i32::MAX.to_le_bytes());
        rec[12..14].copy_from_slice(&0xBEEF_u16.to_le_bytes());
        rec[16] = 6;
        if let (Some(at), Some(rgb)) = (format.color_offset(), color) {
            for (i, c) in rgb.iter().enumerate() {
                rec[at + i * 2..at + i * 2 + 2].copy_from_slice(&c.to_le_bytes());
            }
        }
        rec
    }

    #[test]
    fn decodes_format_1() {
        let rec = record(PointFormat::Format1, 28, None);
        let p = PointDecoder::new(&rec, 1, 28, 1).unwrap().get_point(0).unwrap();
        assert_eq!(p.position, [-1_234, 5_678, i32::MAX]);
        assert_eq!(p.intensity, 0xBEEF);
        assert_eq!(p.classification, 6);
        assert_eq!(p.color, None);
    }

    #[test]
    fn decodes_format_2_color() {
        let rec = record(PointFormat::Format2, 26, Some([1, 256, 65_535]));
        let p = PointDecoder::new(&rec, 2, 26, 1).unwrap().get_point(0).unwrap();
        assert_eq!(p.color, Some([1, 256, 65_535]));
        assert_eq!(p.classification, 6);
    }

    #[test]
    fn decodes_format_3_color() {
        let rec = record(PointFormat::Format3, 34, Some([7, 8, 9]));
        let p = PointDecoder::new(&rec, 3, 34, 1).unwrap().get_point(0).unwrap();
        assert_eq!(p.color, Some([7, 8, 9]));
        assert_eq!(p.format, PointFormat::Format3);
    }

    #[test]
    fn second_record_uses_stride() {
        let mut buf = record(PointFormat::Format1, 20, None);
        let mut second = vec![0u8; 20];
        second[16] = 9;
        buf.extend_from_slice(&second);

        let decoder = PointDecoder::new(&buf, 1, 20, 2).unwrap();
        assert_eq!(decoder.get_point(1).unwrap().classification, 9);
        assert_eq!(decoder.points().count(), 2);
    }

    #[test]
    fn reject_index_out_of_range() {
        let rec = record(PointFormat::Format1, 20, None);
        let decoder = PointDecoder::new(&rec, 1, 20, 1).unwrap();
        assert_eq!(
            decoder.get_point(1),
            Err(WireError::IndexOutOfRange { index: 1, count: 1 })
        );
    }

    #[test]
    fn reject_unknown_format() {
        assert!(matches!(
            PointDecoder::new(&[], 0, 20, 0),
            Err(WireError::UnsupportedPointFormat { format_id: 0 })
        ));
        assert!(matches!(
            PointDecoder::new(&[], 4, 20, 0),
            Err(WireError::UnsupportedPointFormat { format_id: 4 })
        ));
    }

    #[test]
    fn reject_short_record_len() {
        assert!(matches!(
            PointDecoder::new(&[], 3, 28, 0),
            Err(WireError::RecordTooShort { needed: 34, .. })
        ));
    }

    #[test]
    fn truncated_buffer_is_eof_not_panic() {
        let rec = record(PointFormat::Format1, 20, None);
        let decoder = PointDecoder::new(&rec, 1, 20, 2).unwrap();
        assert!(matches!(
            decoder.get_point(1),
            Err(WireError::UnexpectedEof { offset: 20, .. })
        ));
    }
}
