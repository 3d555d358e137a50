/// lasio command-line tool — inspect, validate, and dump LAS point files.
///
/// # Command overview
///
/// ```text
/// lasio <COMMAND> [OPTIONS]
///
/// Commands:
///   inspect    Print the version, compression and header of a file
///   validate   Check that a file's header and point data are readable
///   dump       Print decoded point records, one per line
///   help       Print help information
///
/// Global options:
///   -v, --verbose    Log loader activity (debug level) to stderr
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                 |
/// |------|-----------------------------------------|
/// | 0    | Success                                 |
/// | 1    | Error (I/O failure, invalid file, etc.) |
///
/// Compressed files need an external decoder, which this tool does not
/// ship; they are detected and reported but cannot be read.
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod cmd_dump;
mod cmd_inspect;
mod cmd_validate;

// ── CLI root ──────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "lasio", version, about = "LAS point cloud reader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log loader activity to stderr (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Print the version, compression and header of a file.
    Inspect(InspectArgs),
    /// Check that a file's header and point data are readable.
    Validate(ValidateArgs),
    /// Print decoded point records, one per line.
    Dump(DumpArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `lasio inspect`.
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Path to the `.las` file.
    pub file: PathBuf,

    /// Print the header as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `lasio validate`.
#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Path to the `.las` file.
    pub file: PathBuf,

    /// Records requested per read while walking the point data.
    #[arg(long, default_value_t = 50_000)]
    pub chunk_size: u32,
}

/// Arguments for `lasio dump`.
///
/// ```text
/// ┌──────────────┬────────────────────────────────────────────────────┐
/// │ Flag         │ Effect                                             │
/// ├──────────────┼────────────────────────────────────────────────────┤
/// │ --chunk-size │ records requested per read (default 10000)         │
/// │ --limit N    │ stop after N points                                │
/// │ --world      │ apply header scale/offset to positions             │
/// │ --json       │ one JSON object per line                           │
/// └──────────────┴────────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct DumpArgs {
    /// Path to the `.las` file.
    pub file: PathBuf,

    /// Records requested per read.
    #[arg(long, default_value_t = 10_000)]
    pub chunk_size: u32,

    /// Stop after this many points.
    #[arg(long)]
    pub limit: Option<u64>,

    /// Print real-world coordinates instead of raw grid units.
    #[arg(long)]
    pub world: bool,

    /// Print one JSON object per point.
    #[arg(long)]
    pub json: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = match cli.command {
        Commands::Inspect(args) => cmd_inspect::run(&args).await,
        Commands::Validate(args) => cmd_validate::run(&args).await,
        Commands::Dump(args) => cmd_dump::run(&args).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// Read a file and hand it to [`LasFile::new`](lasio_loader::LasFile::new).
/// No decoder channel is attached, so compressed files fail on `open`.
pub(crate) fn load(path: &std::path::Path) -> anyhow::Result<lasio_loader::LasFile> {
    use anyhow::Context;

    let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    log::debug!("read {} bytes from {}", bytes.len(), path.display());
    lasio_loader::LasFile::new(bytes, None)
        .with_context(|| format!("unsupported file {}", path.display()))
}
