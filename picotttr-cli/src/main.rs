//! picotttr CLI: inspect, decode and synthesize PicoQuant TTTR files.
//!
//! Reads `.ptu`/`.pt3` files and writes imaging `.ptu` files from TIFF
//! stacks whose pages are lifetime bins.
#![allow(
    clippy::uninlined_format_args,
    clippy::needless_pass_by_value,
    clippy::too_many_lines
)]

mod stack;

use clap::{Parser, Subcommand};
use picotttr_core::{Event, MarkerLayout};
use picotttr_io::{EncoderConfig, PtuFileReader, PtuFileWriter};
use picotttr_ptu::Header;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    PicotttrIo(#[from] picotttr_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] picotttr_core::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TIFF stack: {0}")]
    InvalidStack(String),
}

/// PicoQuant TTTR (.ptu/.pt3) reader and writer.
#[derive(Parser)]
#[command(name = "picotttr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show header and acquisition information of a PTU/PT3 file
    Info {
        /// Input PTU/PT3 file
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode the record stream to CSV
    Events {
        /// Input PTU/PT3 file
        input: PathBuf,

        /// Output CSV file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop after this many events
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Write a TIFF lifetime stack as an imaging PTU file
    Encode {
        /// Input multi-page TIFF (one page per lifetime bin)
        input: PathBuf,

        /// Output PTU file
        #[arg(short, long)]
        output: PathBuf,

        /// Encoder configuration JSON
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Sync rate in Hz
        #[arg(long)]
        sync_rate: Option<u64>,

        /// Lifetime bin width in ps
        #[arg(long)]
        resolution_ps: Option<f64>,

        /// Pixel size in µm
        #[arg(long)]
        pixel_um: Option<f64>,

        /// Photon channel (0-14)
        #[arg(long)]
        channel: Option<u8>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Info { input, json } => info(&input, json),
        Commands::Events {
            input,
            output,
            limit,
        } => events(&input, output.as_deref(), limit),
        Commands::Encode {
            input,
            output,
            config,
            sync_rate,
            resolution_ps,
            pixel_um,
            channel,
        } => {
            let mut config = match config {
                Some(path) => EncoderConfig::from_file(path)?,
                None => EncoderConfig::default(),
            };
            if let Some(rate) = sync_rate {
                config = config.with_sync_rate_hz(rate);
            }
            if let Some(resolution) = resolution_ps {
                config = config.with_resolution_ps(resolution);
            }
            if let Some(pixel) = pixel_um {
                config = config.with_pixel_resolution_um(pixel);
            }
            if let Some(channel) = channel {
                config = config.with_photon_channel(channel);
            }
            encode(&input, &output, config)
        }
    }
}

fn info(input: &Path, json: bool) -> Result<()> {
    let reader = PtuFileReader::open(input)?;
    let info = reader.info();

    if json {
        let warnings: Vec<String> = reader.warnings().iter().map(ToString::to_string).collect();
        let value = serde_json::json!({
            "file": input.display().to_string(),
            "kind": reader.kind(),
            "info": info,
            "available_records": reader.available_records(),
            "warnings": warnings,
            "header": reader.header(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("File: {}", input.display());
    println!("Container: {:?}", reader.kind());
    println!(
        "Record type: {:?} ({}, {:#010x})",
        info.record_type,
        info.record_type.hardware(),
        info.record_type.code()
    );
    println!("Image: {} x {} pixels", info.width, info.height);
    let MarkerLayout {
        line_start,
        line_stop,
        frame,
    } = info.markers;
    println!(
        "Markers: line start {}, line stop {}, frame {}",
        line_start, line_stop, frame
    );
    match info.declared_records {
        Some(declared) => println!(
            "Records: {} declared, {} present",
            declared,
            reader.available_records()
        ),
        None => println!("Records: {} present", reader.available_records()),
    }
    if let Some(rate) = info.sync_rate_hz {
        println!("Sync rate: {:.0} Hz", rate);
    }
    if let Some(resolution) = info.resolution_s {
        println!("dtime resolution: {:.3} ps", resolution * 1e12);
    }
    for warning in reader.warnings() {
        println!("Warning: {}", warning);
    }

    if let Header::Ptu(table) = reader.header() {
        println!("{:-<65}", "");
        for tag in table.iter() {
            if tag.index < 0 {
                println!("{:<32} {:?}", tag.name, tag.value);
            } else {
                println!("{:<32} {:?}", format!("{}[{}]", tag.name, tag.index), tag.value);
            }
        }
    }
    Ok(())
}

fn events(input: &Path, output: Option<&Path>, limit: Option<usize>) -> Result<()> {
    let reader = PtuFileReader::open(input)?;
    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut sink = BufWriter::new(sink);

    writeln!(sink, "type,channel,dtime,marker,global_sync")?;
    let mut written = 0usize;
    for event in reader.events().take(limit.unwrap_or(usize::MAX)) {
        match event? {
            Event::Photon {
                channel,
                dtime,
                global_sync,
            } => writeln!(sink, "photon,{},{},,{}", channel, dtime, global_sync)?,
            Event::Marker {
                kind,
                code,
                global_sync,
            } => writeln!(sink, "{:?},,,{},{}", kind, code, global_sync)?,
        }
        written += 1;
    }
    sink.flush()?;
    log::info!("wrote {} events", written);
    Ok(())
}

fn encode(input: &Path, output: &Path, config: EncoderConfig) -> Result<()> {
    let start = Instant::now();
    let counts = stack::read_stack(input)?;
    let writer = PtuFileWriter::new(config)?;

    let summary = writer.write_file_with_progress(output, &counts, |done, total| {
        log::debug!("line {}/{}", done, total);
        ControlFlow::Continue(())
    })?;

    println!("Wrote {}", output.display());
    println!(
        "Records: {} ({} photons, {} markers, {} overflows)",
        summary.records(),
        summary.photons,
        summary.markers,
        summary.overflows
    );
    println!("Time: {:.2?}", start.elapsed());
    Ok(())
}
