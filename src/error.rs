//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore della libreria.
//!
//! ## Responsabilità:
//! - Definisce `TransformError` enum per categorizzare tutti gli errori possibili
//! - Distingue errori di validazione (file non valido, tipo non supportato)
//!   da errori di trasformazione (codec, I/O, tool esterni)
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `InvalidFile`: Upload fallito a livello di trasporto
//! - `UnsupportedType`: MIME type fuori dalla allow-list
//! - `MissingDependency`: Nessun backend codec operativo
//! - `InvalidDimension`: Larghezza/altezza richieste pari a zero
//! - `Image` / `Io` / `Optimizer`: Fallimenti durante la trasformazione
//!
//! ## Esempio:
//! ```rust,ignore
//! if !codec.backend_available() {
//!     return Err(TransformError::MissingDependency(MISSING_BACKEND.to_string()));
//! }
//! ```

/// Custom error types for image transformation
#[derive(thiserror::Error, Debug)]
pub enum TransformError {
    #[error("Invalid file {0}")]
    InvalidFile(String),

    #[error("File type not supported for {0}")]
    UnsupportedType(String),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Optimization error: {0}")]
    Optimizer(String),
}

impl TransformError {
    /// True for failures raised by the codec or the optimizer while working on
    /// the file, as opposed to validation and environment errors.
    pub fn is_transformation(&self) -> bool {
        matches!(
            self,
            TransformError::Image(_) | TransformError::Io(_) | TransformError::Optimizer(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
