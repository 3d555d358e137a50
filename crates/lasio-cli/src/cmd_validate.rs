/// Implementation of `lasio validate`.
///
/// Walks a file the same way a reader would and reports each stage:
///
/// ```text
/// ✓ Format: version 1.2, uncompressed
/// ✓ Header: 1000 points of format 3
/// ✓ Points: 1000 records decoded in 1 chunk
/// ```
///
/// The first failing stage prints a `✗` line and the command exits 1.
use anyhow::{Result, anyhow};

use crate::ValidateArgs;

/// Run the `lasio validate` command.
///
/// # Errors
///
/// Returns an error at the first stage that fails.
pub async fn run(args: &ValidateArgs) -> Result<()> {
    let mut file = match crate::load(&args.file) {
        Ok(file) => file,
        Err(e) => return fail(&e),
    };
    println!(
        "✓ Format: version {}, {}",
        file.version_string(),
        if file.is_compressed() { "compressed" } else { "uncompressed" }
    );

    if let Err(e) = file.open().await {
        return fail(&e.into());
    }
    let header = match file.get_header().await {
        Ok(header) => header,
        Err(e) => return fail(&e.into()),
    };
    println!(
        "✓ Header: {} points of format {}",
        header.points_count, header.points_format_id
    );

    let mut decoded: u64 = 0;
    let mut chunks = 0;
    loop {
        let chunk = match file.read_data(args.chunk_size.max(1), 0, 0).await {
            Ok(chunk) => chunk,
            Err(e) => return fail(&e.into()),
        };
        chunks += 1;
        let decoder = match file.decoder(&chunk) {
            Ok(decoder) => decoder,
            Err(e) => return fail(&e.into()),
        };
        for point in decoder.points() {
            if let Err(e) = point {
                return fail(&anyhow!(e).context(format!("record {decoded}")));
            }
            decoded += 1;
        }
        if !chunk.has_more_data {
            break;
        }
    }

    if decoded != u64::from(header.points_count) {
        return fail(&anyhow!(
            "header declares {} points, read {decoded}",
            header.points_count
        ));
    }
    println!(
        "✓ Points: {decoded} records decoded in {chunks} chunk{}",
        if chunks == 1 { "" } else { "s" }
    );
    Ok(())
}

fn fail(e: &anyhow::Error) -> Result<()> {
    println!("✗ Error: {e:#}");
    Err(anyhow!("validation failed"))
}
