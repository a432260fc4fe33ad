//! # Image Transformer - Main Entry Point
//!
//! Questo è il punto di ingresso della command line.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento e validazione della configurazione
//! - Esecuzione delle trasformazioni sul file
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (file, limiti, flag optimize, etc.)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose, o RUST_LOG)
//! 3. Carica la configurazione JSON se specificata
//! 4. Applica resize, width, height e infine optimize
//!
//! ## Esempio di utilizzo:
//! ```bash
//! image-transformer /tmp/upload_7f3a --name avatar.png --width 1024 --optimize --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use image_transformer::utils::format_size;
use image_transformer::{Config, SourceFile, Transformer};

#[derive(Parser, Debug)]
#[command(name = "image-transformer")]
#[command(about = "Validate, optimize and resize an image in place")]
struct Args {
    /// Image file to transform in place
    file: PathBuf,

    /// Display name used in error messages (defaults to the file name)
    #[arg(long)]
    name: Option<String>,

    /// Declared MIME type, rejected unless it matches the content
    #[arg(long)]
    mime_type: Option<String>,

    /// Squash into WIDTHxHEIGHT if either side is exceeded (ratio not kept)
    #[arg(long, value_parser = parse_size)]
    resize: Option<(u32, u32)>,

    /// Maximum width, aspect ratio kept
    #[arg(long)]
    width: Option<u32>,

    /// Maximum height, aspect ratio kept
    #[arg(long)]
    height: Option<u32>,

    /// Losslessly optimize the result with the installed tools
    #[arg(short, long)]
    optimize: bool,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Parse `WIDTHxHEIGHT`
fn parse_size(raw: &str) -> Result<(u32, u32), String> {
    let (width, height) = raw
        .split_once(|c: char| c == 'x' || c == 'X')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", raw))?;

    let width = width
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid width '{}': {}", width, e))?;
    let height = height
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid height '{}': {}", height, e))?;

    Ok((width, height))
}

fn run(args: Args, config: Config) -> Result<()> {
    let mut file = SourceFile::new(&args.file);
    if let Some(name) = args.name {
        file = file.with_original_name(name);
    }
    if let Some(mime_type) = args.mime_type {
        file = file.with_mime_type(mime_type);
    }

    let mut transformer = Transformer::with_config(file, &config)?;
    info!("Transforming {} ({})", args.file.display(), transformer.mime());

    if let Some((width, height)) = args.resize {
        transformer.resize(width, height)?;
    }
    if let Some(width) = args.width {
        transformer.width(width)?;
    }
    if let Some(height) = args.height {
        transformer.height(height)?;
    }
    // last, so nothing re-encodes over the optimized bytes
    if args.optimize {
        transformer.optimize()?;
    }

    let (width, height) = image::image_dimensions(&args.file)?;
    let size = std::fs::metadata(&args.file)?.len();
    info!(
        "Done: {} is {}x{}, {}",
        args.file.display(),
        width,
        height,
        format_size(size)
    );

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if !args.file.is_file() {
        return Err(anyhow::anyhow!("File does not exist: {}", args.file.display()));
    }

    let config = match args.config {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    config.validate()?;

    tokio::task::spawn_blocking(move || run(args, config)).await??;

    Ok(())
}
