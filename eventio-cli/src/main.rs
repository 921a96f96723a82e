//! EventIO inspection CLI.
//!
//! Decodes an EventIO simulation file and prints the MC showers it contains.

use anyhow::{Context, Result};
use clap::Parser;
use eventio_core::types::{type_name, DEFAULT_MAX_TELESCOPES};
use eventio_core::{BlockOutcome, EventIoReader, ReaderConfig, Record, ShowerRecord, SyncPolicy};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;

/// EventIO decoder for simulated telescope array data.
///
/// Reads every block of the input file, decodes MC showers, run headers,
/// central trigger events, tracking events, pixel lists and reconstructed
/// showers, and skips everything else.
#[derive(Parser, Debug)]
#[command(name = "eventio")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input EventIO file path
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Fail on bytes between blocks instead of searching for the next sync marker
    #[arg(long)]
    strict: bool,

    /// Largest telescope count accepted in run headers, central events and
    /// reconstructed showers
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_TELESCOPES)]
    max_telescopes: usize,

    /// Print one line per block
    #[arg(short, long)]
    list: bool,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Initialize logging; RUST_LOG overrides the default level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = ReaderConfig {
        sync_policy: if args.strict {
            SyncPolicy::Strict
        } else {
            SyncPolicy::Resync
        },
        max_telescopes: args.max_telescopes,
    };

    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .context("Invalid progress template")?,
        );
        pb
    };

    let start_time = Instant::now();
    progress.set_message(format!(
        "Decoding {:?}...",
        args.input.file_name().unwrap_or_default()
    ));

    let file = File::open(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let mut reader = EventIoReader::with_config(BufReader::new(file), config);

    let mut showers = Vec::new();
    let mut run_headers = 0usize;
    let mut central_events = 0usize;
    let mut track_events = 0usize;
    let mut pixel_lists = 0usize;
    let mut reconstructed = 0usize;
    let mut stream_error = None;

    loop {
        let outcome = match reader.next_block() {
            Ok(Some(outcome)) => outcome,
            Ok(None) => break,
            Err(err) => {
                stream_error = Some(err);
                break;
            }
        };

        if args.list {
            progress.suspend(|| println!("{}", describe(&outcome)));
        }
        if let BlockOutcome::Decoded { record, .. } = outcome {
            match record {
                Record::Shower(shower) => showers.push(shower),
                Record::RunHeader(_) => run_headers += 1,
                Record::CentralEvent(_) => central_events += 1,
                Record::TrackEvent(_) => track_events += 1,
                Record::PixelList(_) => pixel_lists += 1,
                Record::ShowerParameters(_) => reconstructed += 1,
            }
        }

        let stats = reader.stats();
        if stats.blocks_read % 1000 == 0 {
            progress.set_message(format!("{} blocks read", stats.blocks_read));
        }
    }

    let total_duration = start_time.elapsed();
    let stats = reader.stats();
    progress.finish_with_message(format!(
        "Done! Read {} blocks in {:.2}s",
        stats.blocks_read,
        total_duration.as_secs_f64()
    ));

    print_showers(&showers);

    if !args.quiet {
        eprintln!();
        eprintln!("Summary:");
        eprintln!("  Input:          {:?}", args.input);
        eprintln!("  Blocks:         {}", stats.blocks_read);
        eprintln!("  Decoded:        {}", stats.decoded);
        eprintln!("    MC showers:   {}", showers.len());
        eprintln!("    Run headers:  {}", run_headers);
        eprintln!("    Central evts: {}", central_events);
        eprintln!("    Tracking:     {}", track_events);
        eprintln!("    Pixel lists:  {}", pixel_lists);
        eprintln!("    Rec. showers: {}", reconstructed);
        eprintln!("  Unknown:        {}", stats.unknown);
        eprintln!("  Failed:         {}", stats.failed);
        eprintln!("  Skipped bytes:  {}", stats.skipped_bytes);
        eprintln!("  Duration:       {:.3}s", total_duration.as_secs_f64());
    }

    match stream_error {
        Some(err) => Err(err).with_context(|| {
            format!(
                "Stream error after {} bytes of {}",
                reader.position(),
                args.input.display()
            )
        }),
        None => Ok(()),
    }
}

/// One-line description of a block outcome.
fn describe(outcome: &BlockOutcome) -> String {
    let Some(header) = outcome.header() else {
        if let BlockOutcome::Failed { error, .. } = outcome {
            return format!("{:>10}  invalid header: {}", "-", error);
        }
        return String::new();
    };

    let name = type_name(header.type_id).unwrap_or("unknown");
    let frame = format!(
        "{:>10}  type {:>5} v{} id {:>8} len {:>8}  {:<22}",
        header.start_position(),
        header.type_id,
        header.version,
        header.identification,
        header.declared_length,
        name
    );
    match outcome {
        BlockOutcome::Decoded { .. } => format!("{}  ok", frame),
        BlockOutcome::Unknown { .. } => format!("{}  skipped", frame),
        BlockOutcome::Failed { error, .. } => format!("{}  failed: {}", frame, error),
    }
}

fn print_showers(showers: &[ShowerRecord]) {
    if showers.is_empty() {
        return;
    }
    println!(
        "{:>8} {:>8} {:>10} {:>8} {:>8} {:>10} {:>8} {:>5} {:>8}",
        "shower", "primary", "E [TeV]", "az", "alt", "h1 [m]", "xmax", "prof", "weight"
    );
    for s in showers {
        println!(
            "{:>8} {:>8} {:>10.4} {:>8.4} {:>8.4} {:>10.1} {:>8.1} {:>5} {:>8.3}",
            s.shower_num,
            s.primary_id,
            s.energy,
            s.azimuth,
            s.altitude,
            s.h_first_int,
            s.xmax,
            s.profiles.len(),
            s.extra.weight
        );
    }
}
