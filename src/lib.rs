//! # Image Transformer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Valida un file immagine caricato (upload valido, MIME in allow-list)
//! - Ottimizza il file senza perdita di qualità tramite tool esterni
//! - Ridimensiona il file in-place rispettando limiti di larghezza/altezza
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom
//! - `source`: Handle del file caricato e sniffing del MIME type
//! - `mime`: Allow-list dei formati supportati (PNG, JPEG, GIF, WebP)
//! - `codec`: Decode/resize/encode tramite il crate `image`
//! - `optimizer`: Ottimizzazione lossless con tool esterni
//! - `tool_resolver`: Ricerca dei tool esterni
//! - `transformer`: Orchestratore validate → optimize → resize → save
//!
//! ## Utilizzo:
//! ```rust,no_run
//! use image_transformer::{SourceFile, Transformer};
//!
//! # fn main() -> Result<(), image_transformer::TransformError> {
//! let file = SourceFile::upload("/tmp/upload_7f3a", "holiday.jpg", true);
//! Transformer::new(file)?.resize(1920, 1080)?.optimize()?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod mime;
pub mod optimizer;
pub mod source;
pub mod tool_resolver;
pub mod transformer;
pub mod utils;

pub use codec::{DecodedImage, ImageCodec, ImageRsCodec};
pub use config::{Config, ResizeFilter};
pub use error::TransformError;
pub use mime::ImageMime;
pub use optimizer::{Optimizer, ToolOptimizer};
pub use source::SourceFile;
pub use transformer::Transformer;
