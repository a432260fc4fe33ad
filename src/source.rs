//! # Source File Handle
//!
//! `SourceFile` describes the file handed over by the upload layer: where it lives
//! on disk, how it should be named in error messages, which MIME type the upload
//! declared and whether the transfer itself succeeded.

use crate::mime::ImageMime;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Bytes read from the head of the file when sniffing its type
const SNIFF_BYTES: u64 = 64;

/// Handle to an image file awaiting transformation
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    original_name: String,
    mime_type: Option<String>,
    upload_valid: Option<bool>,
}

impl SourceFile {
    /// Wrap a file already on disk. The display name defaults to the file name.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let original_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            path,
            original_name,
            mime_type: None,
            upload_valid: None,
        }
    }

    /// Wrap a file received through an upload, carrying the client's file name
    /// and the transport validity flag.
    pub fn upload(path: impl Into<PathBuf>, original_name: impl Into<String>, valid: bool) -> Self {
        Self {
            original_name: original_name.into(),
            upload_valid: Some(valid),
            ..Self::new(path)
        }
    }

    pub fn with_original_name(mut self, name: impl Into<String>) -> Self {
        self.original_name = name.into();
        self
    }

    /// Record the MIME type the client declared. It must agree with the content.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn declared_mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Files that did not come through an upload are always valid
    pub fn is_valid(&self) -> bool {
        self.upload_valid.unwrap_or(true)
    }

    /// MIME type of the content, from the leading bytes of the file. `None` when
    /// the content cannot be read.
    pub fn mime_type(&self) -> Option<String> {
        match sniff_mime_type(&self.path) {
            Ok(mime) => Some(mime.to_string()),
            Err(e) => {
                debug!("Unable to sniff {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

/// Guess the MIME type of a file from its magic bytes
pub fn sniff_mime_type(path: &Path) -> std::io::Result<&'static str> {
    let mut head = Vec::with_capacity(SNIFF_BYTES as usize);
    File::open(path)?.take(SNIFF_BYTES).read_to_end(&mut head)?;

    let mime = match image::guess_format(&head) {
        Ok(format) => match ImageMime::from_image_format(format) {
            Some(mime) => mime.as_str(),
            None => match format {
                image::ImageFormat::Bmp => "image/bmp",
                image::ImageFormat::Tiff => "image/tiff",
                image::ImageFormat::Ico => "image/x-icon",
                _ => "image/x-unknown",
            },
        },
        Err(_) => "application/octet-stream",
    };

    Ok(mime)
}
