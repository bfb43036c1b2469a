use clap::{Parser, Subcommand};
use sixpack::archive::{list, pack_with_options, unpack_to, PackOptions};
use sixpack::codec::{CodecId, CompressionLevel};
use sixpack::io_stream::EntryStatus;
use sixpack::recovery::scan_file;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, metadata::LevelFilter};
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "6pack", version, about = "Single-file archive container")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack one file into a new archive
    Pack {
        /// Compression level: 1 = fastest, 2 = better ratio
        #[arg(short, long, default_value = "2", value_parser = parse_level)]
        level: CompressionLevel,
        /// Codec: zstd (default), lz4, brotli, lzma
        #[arg(short, long, default_value = "zstd", value_parser = parse_codec)]
        codec: CodecId,
        input: PathBuf,
        archive: PathBuf,
    },
    /// Extract an archive
    Unpack {
        archive: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// List archive contents
    List {
        archive: PathBuf,
    },
    /// Check every chunk without extracting
    Verify {
        archive: PathBuf,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match cli.command {

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { level, codec, input, archive } => {
            let summary = pack_with_options(&input, &archive, &PackOptions { level, codec })?;
            println!(
                "{} -> {} ({} bytes, {} chunk(s))",
                summary.name,
                archive.display(),
                summary.archive_size,
                summary.data_chunks
            );
            if let Some(saved) = summary.saved_percent() {
                println!("{saved:.1}% saved");
            }
        }

        // ── Unpack ───────────────────────────────────────────────────────────
        Commands::Unpack { archive, output_dir } => {
            let summary = unpack_to(&archive, &output_dir)?;
            for entry in &summary.entries {
                match &entry.status {
                    EntryStatus::Extracted    => println!("  extracted  {}", entry.name),
                    EntryStatus::Skipped      => println!("  skipped    {}", entry.name),
                    EntryStatus::Discarded(e) => println!("  discarded  {} ({e})", entry.name),
                }
            }
            if !summary.is_clean() {
                return Ok(ExitCode::FAILURE);
            }
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { archive } => {
            let entries = list(&archive)?;
            println!("Archive: {}", archive.display());
            println!("{:<32} {:>12} {:>12} {:>7}  State", "Name", "Size", "Compressed", "Chunks");
            for e in &entries {
                println!(
                    "{:<32} {:>12} {:>12} {:>7}  {}",
                    e.name,
                    e.original_size,
                    e.compressed_bytes,
                    e.data_chunks,
                    if e.intact { "ok" } else { "damaged" }
                );
            }
        }

        // ── Verify ───────────────────────────────────────────────────────────
        Commands::Verify { archive, json } => {
            let report = scan_file(&archive)?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                println!("{}", report.summary());
                for chunk in report.chunks.iter().filter(|c| !c.health.is_healthy()) {
                    println!("  offset {:>10}  id {:>3}  {:?}", chunk.offset, chunk.id, chunk.health);
                }
            }
            if !report.is_intact() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let subscriber = tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().without_time());
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("cannot set default tracing subscriber");
    }

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn parse_level(s: &str) -> Result<CompressionLevel, String> {
    let level: u8 = s.parse().map_err(|_| format!("'{s}' is not a level"))?;
    CompressionLevel::try_from(level).map_err(|e| e.to_string())
}

fn parse_codec(s: &str) -> Result<CodecId, String> {
    CodecId::from_name(s).ok_or_else(|| format!("unknown codec '{s}' (zstd, lz4, brotli, lzma)"))
}
