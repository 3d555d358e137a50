use lasio_wire::{PointFormat, PointRecord};

/// Size of the header the builder writes; point data starts right after.
pub const HEADER_LEN: usize = 227;

/// Builds a LAS 1.x file in memory.
///
/// ```rust
/// use lasio_tests::fixture::LasBuilder;
///
/// let bytes = LasBuilder::new(2).with_points(10).build();
/// assert_eq!(bytes.len(), 227 + 10 * 26);
/// ```
#[derive(Clone, Debug)]
pub struct LasBuilder {
    pub version: (u8, u8),
    pub format: PointFormat,
    /// Extra bits OR-ed into the point format byte (bits 6/7).
    pub compression_bits: u8,
    pub record_len: u16,
    pub points: Vec<PointRecord>,
    pub scale: [f64; 3],
    pub offset: [f64; 3],
    pub mins: [f64; 3],
    pub maxs: [f64; 3],
}

impl LasBuilder {
    /// Version 1.2 file of the given point format (1, 2 or 3) with the
    /// smallest record length that format allows.
    ///
    /// # Panics
    ///
    /// If `format_id` is not 1, 2 or 3.
    #[must_use]
    pub fn new(format_id: u8) -> Self {
        let format = PointFormat::from_id(format_id).expect("fixture format must be 1, 2 or 3");
        Self {
            version: (1, 2),
            format,
            compression_bits: 0,
            record_len: u16::try_from(format.min_record_len()).expect("record length fits u16"),
            points: Vec::new(),
            scale: [0.01, 0.01, 0.01],
            offset: [0.0, 0.0, 0.0],
            mins: [0.0, 0.0, 0.0],
            maxs: [0.0, 0.0, 0.0],
        }
    }

    #[must_use]
    pub fn version(mut self, major: u8, minor: u8) -> Self {
        self.version = (major, minor);
        self
    }

    #[must_use]
    pub fn compression_bits(mut self, bits: u8) -> Self {
        self.compression_bits = bits;
        self
    }

    #[must_use]
    pub fn record_len(mut self, len: u16) -> Self {
        self.record_len = len;
        self
    }

    #[must_use]
    pub fn point(mut self, point: PointRecord) -> Self {
        self.points.push(point);
        self
    }

    /// Append `n` generated points (see [`sample_point`]).
    #[must_use]
    pub fn with_points(mut self, n: u32) -> Self {
        let base = u32::try_from(self.points.len()).expect("point count fits u32");
        let format = self.format;
        self.points
            .extend((base..base + n).map(|i| sample_point(format, i)));
        self
    }

    /// Serialize header plus records.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let count = u32::try_from(self.points.len()).expect("point count fits u32");
        let mut buf = vec![0u8; HEADER_LEN];

        buf[0..4].copy_from_slice(b"LASF");
        buf[24] = self.version.0;
        buf[25] = self.version.1;
        buf[94..96].copy_from_slice(&(HEADER_LEN as u16).to_le_bytes());
        buf[96..100].copy_from_slice(&(HEADER_LEN as u32).to_le_bytes());
        buf[104] = self.format.id() | self.compression_bits;
        buf[105..107].copy_from_slice(&self.record_len.to_le_bytes());
        buf[107..111].copy_from_slice(&count.to_le_bytes());
        put_f64s(&mut buf, 131, &self.scale);
        put_f64s(&mut buf, 155, &self.offset);
        let bounds = [
            self.maxs[0], self.mins[0], self.maxs[1], self.mins[1], self.maxs[2], self.mins[2],
        ];
        put_f64s(&mut buf, 179, &bounds);

        for point in &self.points {
            buf.extend_from_slice(&encode_record(point, self.record_len));
        }
        buf
    }
}

/// Lay a point out at the documented offsets of its format.
#[must_use]
pub fn encode_record(point: &PointRecord, record_len: u16) -> Vec<u8> {
    let mut rec = vec![0u8; usize::from(record_len)];
    for (axis, v) in point.position.iter().enumerate() {
        rec[axis * 4..axis * 4 + 4].copy_from_slice(&v.to_le_bytes());
    }
    rec[12..14].copy_from_slice(&point.intensity.to_le_bytes());
    rec[16] = point.classification;
    if let (Some(at), Some(rgb)) = (point.format.color_offset(), point.color) {
        for (i, c) in rgb.iter().enumerate() {
            rec[at + i * 2..at + i * 2 + 2].copy_from_slice(&c.to_le_bytes());
        }
    }
    rec
}

/// Deterministic point number `i`: every field is derived from `i` so a
/// test can tell records apart after a read.
#[must_use]
pub fn sample_point(format: PointFormat, i: u32) -> PointRecord {
    let n = i32::try_from(i).expect("sample index fits i32");
    PointRecord {
        format,
        position: [n, -n, n * 2],
        intensity: (i % 65_536) as u16,
        classification: (i % 32) as u8,
        color: format
            .color_offset()
            .map(|_| [(i % 65_536) as u16, 100, 65_535]),
    }
}

fn put_f64s(buf: &mut [u8], at: usize, values: &[f64]) {
    for (i, v) in values.iter().enumerate() {
        buf[at + i * 8..at + i * 8 + 8].copy_from_slice(&v.to_le_bytes());
    }
}
