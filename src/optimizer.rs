//! # Lossless Optimizer Module
//!
//! Questo modulo comprime le immagini senza perdita di qualità utilizzando
//! esclusivamente tool esterni, lavorando in-place sul path del file.
//!
//! ## Strategia Tool Selection
//!
//! ### JPEG (Priorità decrescente):
//! 1. **jpegtran**: Ottimizzazione Huffman + progressive, lossless
//! 2. **jpegoptim**: Strip metadata + progressive, output su stdout
//!
//! ### PNG (Priorità decrescente):
//! 1. **oxipng**: Veloce, ottima compressione, strip metadata sicuro
//! 2. **optipng**: Compressione aggressiva
//! 3. **pngcrush**: Brute force, più lento ma efficace
//!
//! ### GIF:
//! 1. **gifsicle**: `-O3`
//!
//! ### WebP:
//! 1. **cwebp**: Re-encoding lossless esatto
//!
//! ## Sostituzione del file
//!
//! Ogni tool scrive su un file temporaneo nella stessa directory dell'originale.
//! Il risultato sostituisce l'originale (rename atomico, permessi dell'originale
//! conservati) solo se è più piccolo di `original_size * size_threshold`;
//! altrimenti viene scartato.
//!
//! ## Error Handling
//!
//! - **Tool non disponibili**: Warning e no-op, oppure errore se `require_optimizer`
//! - **Tool falliscono**: Prova tool successivo nella catena
//! - **Tutti i tool falliscono**: Errore

use crate::config::Config;
use crate::error::{Result, TransformError};
use crate::mime::ImageMime;
use crate::tool_resolver::{install_hint, ToolPathResolver};
use crate::utils::{calculate_reduction, format_size, replace_file, scratch_file_for, to_string_vec};
use std::path::Path;
use std::process::Command;
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Compresses an image file in place without changing its pixels
pub trait Optimizer {
    fn optimize(&self, path: &Path, mime: ImageMime) -> Result<()>;
}

/// Where a tool writes its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOutput {
    /// The tool writes the output path passed in its arguments
    File,
    /// The tool writes the optimized image to stdout
    Stdout,
}

/// An external optimizer and how to call it
#[derive(Debug, Clone)]
pub struct OptimizerTool {
    pub name: &'static str,
    pub output: ToolOutput,
    /// Builds the argument list from (input, output)
    pub args: fn(&str, &str) -> Vec<String>,
}

/// Lossless tools for a format, in order of preference
pub fn tools_for(mime: ImageMime) -> Vec<OptimizerTool> {
    match mime {
        ImageMime::Jpeg => vec![
            OptimizerTool {
                name: "jpegtran",
                output: ToolOutput::File,
                args: |input, output| {
                    to_string_vec([
                        "-copy", "none",
                        "-optimize",
                        "-progressive",
                        "-outfile", output,
                        input,
                    ])
                },
            },
            OptimizerTool {
                name: "jpegoptim",
                output: ToolOutput::Stdout,
                args: |input, _output| {
                    to_string_vec(["--strip-all", "--all-progressive", "--quiet", "--stdout", input])
                },
            },
        ],
        ImageMime::Png => vec![
            OptimizerTool {
                name: "oxipng",
                output: ToolOutput::File,
                args: |input, output| {
                    to_string_vec(["-o", "2", "--strip", "safe", "--quiet", "--out", output, input])
                },
            },
            OptimizerTool {
                name: "optipng",
                output: ToolOutput::File,
                args: |input, output| {
                    to_string_vec(["-quiet", "-o2", "-clobber", "-out", output, input])
                },
            },
            OptimizerTool {
                name: "pngcrush",
                output: ToolOutput::File,
                args: |input, output| to_string_vec(["-q", input, output]),
            },
        ],
        ImageMime::Gif => vec![OptimizerTool {
            name: "gifsicle",
            output: ToolOutput::File,
            args: |input, output| to_string_vec(["-O3", input, "-o", output]),
        }],
        ImageMime::WebP => vec![OptimizerTool {
            name: "cwebp",
            output: ToolOutput::File,
            args: |input, output| {
                to_string_vec(["-lossless", "-exact", "-m", "6", "-mt", "-quiet", input, "-o", output])
            },
        }],
    }
}

/// Optimizer driving the external lossless tools
#[derive(Debug, Clone)]
pub struct ToolOptimizer {
    resolver: ToolPathResolver,
    size_threshold: f64,
    require_tool: bool,
}

impl ToolOptimizer {
    pub fn new(resolver: ToolPathResolver, size_threshold: f64, require_tool: bool) -> Self {
        Self {
            resolver,
            size_threshold,
            require_tool,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ToolPathResolver::new(config.tools_dir.as_deref()),
            config.size_threshold,
            config.require_optimizer,
        )
    }

    /// Run a single tool, leaving its result in `scratch`
    fn run_tool(
        &self,
        tool: &OptimizerTool,
        tool_path: &Path,
        input: &Path,
        scratch: &NamedTempFile,
    ) -> Result<()> {
        let input_str = input
            .to_str()
            .ok_or_else(|| TransformError::Optimizer(format!("Invalid input path: {:?}", input)))?;
        let output_str = scratch.path().to_str().ok_or_else(|| {
            TransformError::Optimizer(format!("Invalid scratch path: {:?}", scratch.path()))
        })?;

        let args = (tool.args)(input_str, output_str);
        debug!("Command: {:?} {:?}", tool_path, args);

        let start_time = Instant::now();
        let output = Command::new(tool_path).args(&args).output()?;
        let elapsed = start_time.elapsed();

        if !output.status.success() {
            return Err(TransformError::Optimizer(format!(
                "{} exited with {} after {:?}: {}",
                tool.name,
                output.status,
                elapsed,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        if tool.output == ToolOutput::Stdout {
            std::fs::write(scratch.path(), &output.stdout)?;
        }

        debug!("{} completed successfully in {:?}", tool.name, elapsed);
        Ok(())
    }

    /// Replace `path` with the scratch file if it is worth it
    fn replace_if_smaller(&self, path: &Path, scratch: NamedTempFile) -> Result<()> {
        let original_size = std::fs::metadata(path)?.len();
        let optimized_size = scratch.as_file().metadata()?.len();
        let limit = original_size as f64 * self.size_threshold;

        if optimized_size == 0 || optimized_size as f64 >= limit {
            debug!(
                "Keeping original {} ({} -> {} is not enough)",
                path.display(),
                format_size(original_size),
                format_size(optimized_size)
            );
            return Ok(());
        }

        replace_file(scratch, path)?;

        info!(
            "Optimized {}: {} -> {} ({:.1}% saved)",
            path.display(),
            format_size(original_size),
            format_size(optimized_size),
            calculate_reduction(original_size, optimized_size)
        );
        Ok(())
    }
}

impl Optimizer for ToolOptimizer {
    fn optimize(&self, path: &Path, mime: ImageMime) -> Result<()> {
        let tools = tools_for(mime);

        let mut last_error = None;
        let mut any_tool_available = false;

        for tool in &tools {
            let Some(tool_path) = self.resolver.resolve_tool(tool.name) else {
                continue;
            };
            any_tool_available = true;

            debug!("Attempting {} optimization with {}", mime.label(), tool.name);

            let scratch =
                scratch_file_for(path, ".optimizing-", &format!(".{}", mime.extension()))?;

            match self.run_tool(tool, &tool_path, path, &scratch) {
                Ok(()) => return self.replace_if_smaller(path, scratch),
                Err(e) => {
                    warn!("{} optimization failed with {}, trying next tool: {}", mime.label(), tool.name, e);
                    last_error = Some(e);
                }
            }
        }

        let tool_names: Vec<&str> = tools.iter().map(|tool| tool.name).collect();

        if !any_tool_available {
            if self.require_tool {
                let hints: Vec<String> = tool_names.iter().map(|name| install_hint(name)).collect();
                return Err(TransformError::Optimizer(format!(
                    "No {} optimization tools available. Please install one of: {} ({})",
                    mime.label(),
                    tool_names.join(", "),
                    hints.join("; ")
                )));
            }

            warn!(
                "No {} optimization tools available ({}), leaving {} untouched",
                mime.label(),
                tool_names.join("/"),
                path.display()
            );
            return Ok(());
        }

        Err(TransformError::Optimizer(format!(
            "All {} optimization tools failed for {}: {}",
            mime.label(),
            path.display(),
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}
