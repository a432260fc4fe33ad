//! # Image Transformer
//!
//! Questo modulo contiene il cuore della libreria: valida un file caricato e lo
//! trasforma in-place.
//!
//! ## Flusso:
//! 1. **Validazione** (una sola volta, nel costruttore): upload valido + MIME in allow-list
//! 2. **Decode lazy**: il file viene decodificato solo alla prima operazione geometrica
//! 3. **Resize condizionale**: solo se l'immagine supera i limiti richiesti
//! 4. **Salvataggio**: ogni operazione geometrica riscrive il file sullo stesso path
//!
//! ## Esempio:
//! ```rust,no_run
//! use image_transformer::{SourceFile, Transformer};
//!
//! # fn main() -> Result<(), image_transformer::TransformError> {
//! let file = SourceFile::upload("/tmp/upload_7f3a", "avatar.png", true);
//! Transformer::new(file)?
//!     .width(1024)?
//!     .height(768)?
//!     .optimize()?;
//! # Ok(())
//! # }
//! ```

use crate::codec::{target_dimensions, DecodedImage, ImageCodec, ImageRsCodec};
use crate::config::Config;
use crate::error::{Result, TransformError};
use crate::mime::ImageMime;
use crate::optimizer::{Optimizer, ToolOptimizer};
use crate::source::SourceFile;
use tracing::debug;

const MISSING_BACKEND: &str = "No image codec backend available. \
    Build with the png or jpeg codecs of the `image` crate enabled to use the resize functions";

/// Validated image file with chainable, in-place transformations.
///
/// The decoded image is cached after the first geometry call and reused by every
/// following call on the same instance.
pub struct Transformer<C: ImageCodec = ImageRsCodec, O: Optimizer = ToolOptimizer> {
    file: SourceFile,
    mime: ImageMime,
    codec: C,
    optimizer: O,
    image: Option<C::Image>,
}

impl Transformer<ImageRsCodec, ToolOptimizer> {
    /// Validate `file` and wrap it with the default codec and optimizer
    pub fn new(file: SourceFile) -> Result<Self> {
        Self::with_config(file, &Config::default())
    }

    pub fn with_config(file: SourceFile, config: &Config) -> Result<Self> {
        Self::with_backends(
            file,
            ImageRsCodec::from_config(config),
            ToolOptimizer::from_config(config),
        )
    }
}

impl<C: ImageCodec, O: Optimizer> Transformer<C, O> {
    /// Validate `file` and wrap it with the given collaborators
    pub fn with_backends(file: SourceFile, codec: C, optimizer: O) -> Result<Self> {
        let mime = validate(&file)?;

        debug!("Accepted {} as {}", file.original_name(), mime);

        Ok(Self {
            file,
            mime,
            codec,
            optimizer,
            image: None,
        })
    }

    pub fn file(&self) -> &SourceFile {
        &self.file
    }

    pub fn mime(&self) -> ImageMime {
        self.mime
    }

    /// Whether a geometry call already decoded the file
    pub fn is_decoded(&self) -> bool {
        self.image.is_some()
    }

    pub fn into_file(self) -> SourceFile {
        self.file
    }

    /// Losslessly compress the file on disk.
    ///
    /// The cached decode, if any, is left untouched: a geometry call made after
    /// `optimize` on an already decoded instance saves the cached pixels over
    /// the optimized bytes. Call `optimize` last to keep its result.
    pub fn optimize(&mut self) -> Result<&mut Self> {
        self.optimizer.optimize(self.file.path(), self.mime)?;
        Ok(self)
    }

    /// Squash the image into `width` x `height` if it exceeds either bound.
    ///
    /// The aspect ratio is not preserved. The file is re-saved even when no
    /// resize was needed.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<&mut Self> {
        ensure_positive("width", width)?;
        ensure_positive("height", height)?;

        self.transform(|image| {
            if image.width() > width || image.height() > height {
                Some((width, height))
            } else {
                None
            }
        })
    }

    /// Shrink to `max_width`, keeping the aspect ratio, if the image is wider
    pub fn width(&mut self, max_width: u32) -> Result<&mut Self> {
        ensure_positive("width", max_width)?;

        self.transform(|image| {
            (image.width() > max_width).then(|| {
                target_dimensions((image.width(), image.height()), Some(max_width), None)
            })
        })
    }

    /// Shrink to `max_height`, keeping the aspect ratio, if the image is taller
    pub fn height(&mut self, max_height: u32) -> Result<&mut Self> {
        ensure_positive("height", max_height)?;

        self.transform(|image| {
            (image.height() > max_height).then(|| {
                target_dimensions((image.width(), image.height()), None, Some(max_height))
            })
        })
    }

    /// Decode if needed, resize to whatever `plan` returns, then save
    fn transform<F>(&mut self, plan: F) -> Result<&mut Self>
    where
        F: FnOnce(&C::Image) -> Option<(u32, u32)>,
    {
        let decoded = match self.image.take() {
            Some(image) => image,
            None => self.decode()?,
        };
        let image = self.image.insert(decoded);

        match plan(image) {
            Some((width, height)) => {
                debug!(
                    "Resizing {} from {}x{} to {}x{}",
                    self.file.original_name(),
                    image.width(),
                    image.height(),
                    width,
                    height
                );
                image.resize(width, height);
            }
            None => debug!(
                "{} already fits ({}x{})",
                self.file.original_name(),
                image.width(),
                image.height()
            ),
        }

        image.save(self.file.path())?;
        Ok(self)
    }

    fn decode(&self) -> Result<C::Image> {
        if !self.codec.backend_available() {
            return Err(TransformError::MissingDependency(MISSING_BACKEND.to_string()));
        }

        self.codec.decode(self.file.path())
    }
}

/// Check the upload flag and the MIME allow-list.
///
/// The type comes from the file content. A declared type must name the same
/// format as the content.
fn validate(file: &SourceFile) -> Result<ImageMime> {
    if !file.is_valid() {
        return Err(TransformError::InvalidFile(file.original_name().to_string()));
    }

    let unsupported = || TransformError::UnsupportedType(file.original_name().to_string());

    let mime = file
        .mime_type()
        .as_deref()
        .and_then(ImageMime::classify)
        .ok_or_else(unsupported)?;

    if let Some(declared) = file.declared_mime_type() {
        if ImageMime::classify(declared) != Some(mime) {
            debug!(
                "{} declared as {} but its content is {}",
                file.original_name(),
                declared,
                mime
            );
            return Err(unsupported());
        }
    }

    Ok(mime)
}

fn ensure_positive(name: &str, value: u32) -> Result<()> {
    if value == 0 {
        return Err(TransformError::InvalidDimension(format!("{} must be greater than 0", name)));
    }
    Ok(())
}
