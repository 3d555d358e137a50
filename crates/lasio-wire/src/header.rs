use serde::Serialize;

use crate::error::WireError;
use crate::le::{f64s_at, u8_at, u16_at, u32_at};
use crate::format::FORMAT_ID_MASK;

/// Byte offset of the point data offset field.
pub const POINTS_OFFSET_AT: usize = 96;

/// Byte offset of the point format id byte (also carries the
/// compression bits, see [`crate::format`]).
pub const POINT_FORMAT_AT: usize = 104;

/// Byte offset of the point record length.
pub const RECORD_LEN_AT: usize = 105;

/// Byte offset of the legacy point count.
pub const POINT_COUNT_AT: usize = 107;

/// Byte offset of the three scale factors.
pub const SCALE_AT: usize = 131;

/// Byte offset of the three coordinate offsets.
pub const OFFSET_AT: usize = 155;

/// Byte offset of the six interleaved bounds (max x, min x, max y, ...).
pub const BOUNDS_AT: usize = 179;

/// Smallest buffer that contains every header field we read.
pub const MIN_HEADER_SIZE: usize = BOUNDS_AT + 6 * 8;

/// LAS public header block, reduced to the fields a point reader needs.
///
/// All multi-byte fields are little-endian.
///
/// ```text
/// ┌────────┬─────────┬──────────────────────────────────────────┐
/// │ Offset │ Size    │ Field                                    │
/// ├────────┼─────────┼──────────────────────────────────────────┤
/// │ 96     │ 4 (u32) │ points_offset                            │
/// │ 104    │ 1 (u8)  │ points_format_id (bits 6/7 = compressed) │
/// │ 105    │ 2 (u16) │ points_struct_size                       │
/// │ 107    │ 4 (u32) │ points_count                             │
/// │ 131    │ 24      │ scale x, y, z (f64)                      │
/// │ 155    │ 24      │ offset x, y, z (f64)                     │
/// │ 179    │ 48      │ max x, min x, max y, min y, max z, min z │
/// └────────┴─────────┴──────────────────────────────────────────┘
/// ```
///
/// Bounds are interleaved per axis on disk; [`Header::read_from`] splits
/// them into `maxs` and `mins`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Header {
    pub points_offset: u32,
    /// Point format with the compression bits already masked off.
    pub points_format_id: u8,
    pub points_struct_size: u16,
    pub points_count: u32,
    pub scale: [f64; 3],
    pub offset: [f64; 3],
    pub mins: [f64; 3],
    pub maxs: [f64; 3],
}

impl Header {
    /// Parse the header fields from the start of a raw file buffer.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if `buf` is shorter than
    /// [`MIN_HEADER_SIZE`].
    pub fn read_from(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < MIN_HEADER_SIZE {
            return Err(WireError::UnexpectedEof {
                offset: 0,
                needed: MIN_HEADER_SIZE,
                available: buf.len(),
            });
        }

        let bounds: [f64; 6] = f64s_at(buf, BOUNDS_AT)?;

        Ok(Self {
            points_offset: u32_at(buf, POINTS_OFFSET_AT)?,
            points_format_id: u8_at(buf, POINT_FORMAT_AT)? & FORMAT_ID_MASK,
            points_struct_size: u16_at(buf, RECORD_LEN_AT)?,
            points_count: u32_at(buf, POINT_COUNT_AT)?,
            scale: f64s_at(buf, SCALE_AT)?,
            offset: f64s_at(buf, OFFSET_AT)?,
            maxs: [bounds[0], bounds[2], bounds[4]],
            mins: [bounds[1], bounds[3], bounds[5]],
        })
    }

    /// Byte length of the point data segment this header describes.
    #[must_use]
    pub fn points_len(&self) -> u64 {
        u64::from(self.points_count) * u64::from(self.points_struct_size)
    }

    /// Byte offset one past the last point record.
    #[must_use]
    pub fn points_end(&self) -> u64 {
        u64::from(self.points_offset) + self.points_len()
    }

    /// Convert a raw grid position into real-world coordinates
    /// (`position * scale + offset`, per axis).
    #[must_use]
    pub fn world_position(&self, position: [i32; 3]) -> [f64; 3] {
        let mut out = [0.0; 3];
        for (axis, slot) in out.iter_mut().enumerate() {
            *slot = f64::from(position[axis]) * self.scale[axis] + self.offset[axis];
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_f64s(buf: &mut [u8], at: usize, values: &[f64]) {
        for (i, v) in values.iter().enumerate() {
            buf[at + i * 8..at + i * 8 + 8].copy_from_slice(&v.to_le_bytes());
        }
    }

    fn crafted() -> Vec<u8> {
        let mut buf = vec![0u8; MIN_HEADER_SIZE];
        buf[96..100].copy_from_slice(&227u32.to_le_bytes());
        buf[104] = 3;
        buf[105..107].copy_from_slice(&34u16.to_le_bytes());
        buf[107..111].copy_from_slice(&1_000u32.to_le_bytes());
        put_f64s(&mut buf, 131, &[0.01, 0.02, 0.001]);
        put_f64s(&mut buf, 155, &[500_000.0, 4_000_000.0, 10.0]);
        put_f64s(&mut buf, 179, &[10.0, -10.0, 20.0, -20.0, 30.0, -30.0]);
        buf
    }

    #[test]
    fn parses_every_field() {
        let header = Header::read_from(&crafted()).unwrap();
        assert_eq!(
            header,
            Header {
                points_offset: 227,
                points_format_id: 3,
                points_struct_size: 34,
                points_count: 1_000,
                scale: [0.01, 0.02, 0.001],
                offset: [500_000.0, 4_000_000.0, 10.0],
                mins: [-10.0, -20.0, -30.0],
                maxs: [10.0, 20.0, 30.0],
            }
        );
    }

    #[test]
    fn bounds_are_deinterleaved() {
        let header = Header::read_from(&crafted()).unwrap();
        assert!(header.maxs.iter().zip(header.mins.iter()).all(|(max, min)| max > min));
    }

    #[test]
    fn compression_bits_are_masked() {
        let mut buf = crafted();
        buf[104] = 0x80 | 2;
        assert_eq!(Header::read_from(&buf).unwrap().points_format_id, 2);
    }

    #[test]
    fn reject_buffer_too_short() {
        let buf = vec![0u8; MIN_HEADER_SIZE - 1];
        let result = Header::read_from(&buf);
        assert!(matches!(
            result,
            Err(WireError::UnexpectedEof {
                needed: MIN_HEADER_SIZE,
                available,
                ..
            }) if available == MIN_HEADER_SIZE - 1
        ));
    }

    #[test]
    fn points_end_does_not_overflow() {
        let mut header = Header::read_from(&crafted()).unwrap();
        header.points_offset = u32::MAX;
        header.points_count = u32::MAX;
        header.points_struct_size = u16::MAX;
        assert!(header.points_end() > u64::from(u32::MAX));
    }

    #[test]
    fn world_position_applies_scale_and_offset() {
        let header = Header::read_from(&crafted()).unwrap();
        let world = header.world_position([100, -50, 2_000]);
        assert!((world[0] - 500_001.0).abs() < 1e-9);
        assert!((world[1] - 3_999_999.0).abs() < 1e-9);
        assert!((world[2] - 12.0).abs() < 1e-9);
    }
}
