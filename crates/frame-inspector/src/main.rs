//! Frame Inspector
//!
//! Decodes hex-dumped SIGTRAN and PKI frames, one per line, and prints the
//! field tree of each.

mod input;
mod inspector;

use anyhow::{Context, Result};
use brivas_dissect::sigtran::{M3uaVersion, SuaVersion};
use brivas_dissect::{DissectConfig, Dissection};
use clap::{Parser, ValueEnum};
use inspector::{FrameProtocol, Inspector};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Decode SIGTRAN and PKI frames from hex dumps", long_about = None)]
struct Cli {
    /// Protocol carried by every frame
    #[arg(long, short, value_enum)]
    protocol: FrameProtocol,

    /// Dissector configuration file; `DISSECT__*` variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// M3UA version, overriding the configuration
    #[arg(long)]
    m3ua_version: Option<M3uaVersion>,

    /// SUA version, overriding the configuration
    #[arg(long)]
    sua_version: Option<SuaVersion>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Print run counters to stderr when done
    #[arg(long)]
    stats: bool,

    /// Hex dump file; stdin when absent
    input: Option<PathBuf>,
}

#[derive(Serialize)]
struct FrameRecord<'a> {
    line: usize,
    #[serde(flatten)]
    dissection: &'a Dissection,
}

fn load_config(cli: &Cli) -> Result<DissectConfig> {
    let path = cli.config.as_ref().map(|p| p.to_string_lossy().into_owned());
    let mut config = DissectConfig::load(path.as_deref()).context("loading dissector configuration")?;
    if let Some(version) = cli.m3ua_version {
        config.m3ua.version = version;
    }
    if let Some(version) = cli.sua_version {
        config.sua.version = version;
    }
    Ok(config)
}

fn write_frame(out: &mut impl Write, format: OutputFormat, line: usize, dissection: &Dissection) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "Frame {} [{}] {}", line, dissection.protocol, dissection.info)?;
            if let (Some(src), Some(dst)) = (&dissection.source, &dissection.destination) {
                writeln!(out, "  {} -> {}", src, dst)?;
            }
            write!(out, "{}", dissection.render())?;
            writeln!(out)?;
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &FrameRecord { line, dissection })?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    brivas_telemetry::init("frame-inspector")?;

    let config = load_config(&cli)?;
    let inspector = Inspector::new(cli.protocol, config)?;

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for (line, frame) in input::frames(reader) {
        match frame {
            Ok(frame) => {
                let dissection = inspector.dissect(&frame);
                write_frame(&mut out, cli.format, line, &dissection)?;
            }
            Err(err) => inspector.reject(line, &err),
        }
    }
    out.flush()?;

    let snapshot = inspector.snapshot();
    info!(
        decoded = snapshot.counters.get("frames_decoded").copied().unwrap_or(0),
        malformed = snapshot.counters.get("frames_malformed").copied().unwrap_or(0),
        "input exhausted"
    );
    if cli.stats {
        eprintln!("{}", snapshot.to_json()?);
    }
    Ok(())
}
