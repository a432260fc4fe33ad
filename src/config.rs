//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione del transformer.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri di encoding, resize e ottimizzazione
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `jpeg_quality`: Qualità JPEG al salvataggio (1-100, default: 90)
//! - `filter`: Filtro di resize (default: lanczos)
//! - `size_threshold`: Soglia per sostituire il file ottimizzato (0.0-1.0, default: 1.0)
//! - `require_optimizer`: Errore se nessun tool di ottimizzazione è installato (default: false)
//! - `tools_dir`: Directory con i tool di ottimizzazione (default: None = solo PATH)
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     jpeg_quality: 85,
//!     require_optimizer: true,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Resize filters available to the in-process codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    /// Lanczos - best quality for downscaling
    #[default]
    Lanczos,
    /// Catmull-Rom - good general quality
    Catrom,
    /// Gaussian - soft, fewer ringing artifacts
    Gaussian,
    /// Triangle - fast, acceptable quality
    Triangle,
    /// Point - nearest neighbour, pixel-perfect for pixel art
    Point,
}

impl ResizeFilter {
    pub fn to_filter_type(self) -> FilterType {
        match self {
            ResizeFilter::Lanczos => FilterType::Lanczos3,
            ResizeFilter::Catrom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::Point => FilterType::Nearest,
        }
    }
}

/// Configuration for image transformation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JPEG quality used when re-encoding after a resize (1-100)
    pub jpeg_quality: u8,
    /// Resize filter
    pub filter: ResizeFilter,
    /// Keep the optimized file only if new size < original * threshold
    pub size_threshold: f64,
    /// Fail `optimize` when no optimizer tool is installed for the format
    pub require_optimizer: bool,
    /// Directory searched for optimizer tools before PATH
    pub tools_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            filter: ResizeFilter::default(),
            size_threshold: 1.0,
            require_optimizer: false,
            tools_dir: None,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(anyhow::anyhow!("JPEG quality must be between 1 and 100"));
        }

        if self.size_threshold <= 0.0 || self.size_threshold > 1.0 {
            return Err(anyhow::anyhow!("Size threshold must be between 0.0 and 1.0"));
        }

        if let Some(ref tools_dir) = self.tools_dir {
            if !tools_dir.is_dir() {
                return Err(anyhow::anyhow!(
                    "Tools directory is not a directory: {}",
                    tools_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
