/// Implementation of `lasio dump`.
///
/// Streams the file chunk by chunk and prints one point per line:
///
/// ```text
/// x y z intensity classification [r g b]
/// ```
///
/// With `--json`, each line is an object instead.
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use serde::Serialize;

use lasio_wire::{Header, PointRecord};

use crate::DumpArgs;

#[derive(Serialize)]
struct DumpedPoint {
    position: Position,
    intensity: u16,
    classification: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<[u16; 3]>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Position {
    Raw([i32; 3]),
    World([f64; 3]),
}

impl DumpedPoint {
    fn new(point: &PointRecord, header: &Header, world: bool) -> Self {
        let position = if world {
            Position::World(header.world_position(point.position))
        } else {
            Position::Raw(point.position)
        };
        Self {
            position,
            intensity: point.intensity,
            classification: point.classification,
            color: point.color,
        }
    }

    fn write_plain(&self, out: &mut impl Write) -> io::Result<()> {
        match self.position {
            Position::Raw([x, y, z]) => write!(out, "{x} {y} {z}")?,
            Position::World([x, y, z]) => write!(out, "{x:.3} {y:.3} {z:.3}")?,
        }
        write!(out, " {} {}", self.intensity, self.classification)?;
        if let Some([r, g, b]) = self.color {
            write!(out, " {r} {g} {b}")?;
        }
        writeln!(out)
    }
}

/// Run the `lasio dump` command.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read, a record
/// cannot be decoded, or stdout cannot be written.
pub async fn run(args: &DumpArgs) -> Result<()> {
    let mut file = crate::load(&args.file)?;
    file.open().await.context("cannot open file")?;
    let header = file.get_header().await.context("cannot read header")?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let limit = args.limit.unwrap_or(u64::MAX);
    let mut written: u64 = 0;

    'chunks: loop {
        let chunk = file.read_data(args.chunk_size.max(1), 0, 0).await?;
        for point in file.decoder(&chunk)?.points() {
            if written >= limit {
                break 'chunks;
            }
            let dumped = DumpedPoint::new(&point?, &header, args.world);
            if args.json {
                serde_json::to_writer(&mut out, &dumped)?;
                writeln!(out)?;
            } else {
                dumped.write_plain(&mut out)?;
            }
            written += 1;
        }
        if !chunk.has_more_data {
            break;
        }
    }

    out.flush()?;
    log::debug!("dumped {written} points");
    Ok(())
}
