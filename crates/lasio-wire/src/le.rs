// Little-endian field readers shared by the header and point layers.
//
// Every reader checks the bounds up front and reports the offset it was
// trying to read, so callers can `?` straight out of a parse.

use crate::error::WireError;

fn field<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], WireError> {
    buf.get(offset..offset.saturating_add(N))
        .and_then(|s| s.try_into().ok())
        .ok_or(WireError::UnexpectedEof {
            offset,
            needed: N,
            available: buf.len(),
        })
}

pub(crate) fn u8_at(buf: &[u8], offset: usize) -> Result<u8, WireError> {
    field::<1>(buf, offset).map(|[b]| b)
}

pub(crate) fn u16_at(buf: &[u8], offset: usize) -> Result<u16, WireError> {
    field(buf, offset).map(u16::from_le_bytes)
}

pub(crate) fn u32_at(buf: &[u8], offset: usize) -> Result<u32, WireError> {
    field(buf, offset).map(u32::from_le_bytes)
}

pub(crate) fn i32_at(buf: &[u8], offset: usize) -> Result<i32, WireError> {
    field(buf, offset).map(i32::from_le_bytes)
}

pub(crate) fn f64_at(buf: &[u8], offset: usize) -> Result<f64, WireError> {
    field(buf, offset).map(f64::from_le_bytes)
}

/// Read `N` consecutive f64 values starting at `offset`.
pub(crate) fn f64s_at<const N: usize>(buf: &[u8], offset: usize) -> Result<[f64; N], WireError> {
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = f64_at(buf, offset + i * 8)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let buf = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(u16_at(&buf, 0).unwrap(), 0x0201);
        assert_eq!(u32_at(&buf, 0).unwrap(), 0x0403_0201);
        assert_eq!(u8_at(&buf, 3).unwrap(), 0x04);
    }

    #[test]
    fn negative_i32() {
        let buf = (-5_i32).to_le_bytes();
        assert_eq!(i32_at(&buf, 0).unwrap(), -5);
    }

    #[test]
    fn out_of_bounds_reports_offset() {
        let buf = [0u8; 6];
        assert_eq!(
            u32_at(&buf, 4),
            Err(WireError::UnexpectedEof {
                offset: 4,
                needed: 4,
                available: 6,
            })
        );
    }
}
