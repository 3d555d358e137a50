/// Implementation of `lasio inspect`.
///
/// # Output format
///
/// ```text
/// Version:      1.2
/// Compressed:   no
/// Point format: 3
/// Record size:  34 bytes
/// Points:       1000 at offset 227
/// Scale:        0.01 0.01 0.01
/// Offset:       0 0 0
/// Min:          -10 -20 -30
/// Max:          10 20 30
/// ```
///
/// The first three lines come from format detection alone, so they are
/// printed even for compressed files this tool cannot open.
use anyhow::{Context, Result};
use serde::Serialize;

use lasio_wire::Header;

use crate::InspectArgs;

#[derive(Serialize)]
struct Report<'a> {
    version: String,
    compressed: bool,
    point_format_id: u8,
    header: &'a Header,
}

/// Run the `lasio inspect` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read, its version or
/// compression scheme is unsupported, or its header is truncated.
pub async fn run(args: &InspectArgs) -> Result<()> {
    let mut file = crate::load(&args.file)?;
    let version = file.version_string();
    let info = *file.format_info();

    if !args.json {
        println!("Version:      {version}");
        println!("Compressed:   {}", if info.compressed { "yes" } else { "no" });
        println!("Point format: {}", info.point_format_id);
    }

    file.open()
        .await
        .with_context(|| format!("cannot open {}", args.file.display()))?;
    let header = file
        .get_header()
        .await
        .with_context(|| format!("cannot read header of {}", args.file.display()))?;

    if args.json {
        let report = Report {
            version,
            compressed: info.compressed,
            point_format_id: info.point_format_id,
            header: &header,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Record size:  {} bytes", header.points_struct_size);
    println!(
        "Points:       {} at offset {}",
        header.points_count, header.points_offset
    );
    println!("Scale:        {}", triple(header.scale));
    println!("Offset:       {}", triple(header.offset));
    println!("Min:          {}", triple(header.mins));
    println!("Max:          {}", triple(header.maxs));
    Ok(())
}

fn triple(v: [f64; 3]) -> String {
    format!("{} {} {}", v[0], v[1], v[2])
}
