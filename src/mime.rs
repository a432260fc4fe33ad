//! # MIME Classification
//!
//! Maps MIME type strings onto the set of image formats the transformer accepts:
//! `image/png`, `image/jpeg`, `image/gif` and `image/webp`.

use std::fmt;
use std::str::FromStr;

/// Supported image MIME types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageMime {
    Png,
    Jpeg,
    Gif,
    WebP,
}

impl ImageMime {
    pub const ALL: [ImageMime; 4] = [
        ImageMime::Png,
        ImageMime::Jpeg,
        ImageMime::Gif,
        ImageMime::WebP,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Png => "image/png",
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Gif => "image/gif",
            ImageMime::WebP => "image/webp",
        }
    }

    /// Short name used in log lines and error messages
    pub fn label(&self) -> &'static str {
        match self {
            ImageMime::Png => "PNG",
            ImageMime::Jpeg => "JPEG",
            ImageMime::Gif => "GIF",
            ImageMime::WebP => "WebP",
        }
    }

    /// Extension used for temporary files next to the original
    pub fn extension(&self) -> &'static str {
        match self {
            ImageMime::Png => "png",
            ImageMime::Jpeg => "jpg",
            ImageMime::Gif => "gif",
            ImageMime::WebP => "webp",
        }
    }

    /// Classify a raw MIME string.
    ///
    /// Parameters such as `; charset=binary` are ignored and the comparison is
    /// case-insensitive. Returns `None` for anything that is not an image or is an
    /// image type outside the allow-list.
    pub fn classify(raw: &str) -> Option<Self> {
        let essence = raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();

        let (kind, _) = essence.split_once('/')?;
        if kind != "image" {
            return None;
        }

        Self::ALL.into_iter().find(|mime| mime.as_str() == essence)
    }

    pub(crate) fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(ImageMime::Png),
            image::ImageFormat::Jpeg => Some(ImageMime::Jpeg),
            image::ImageFormat::Gif => Some(ImageMime::Gif),
            image::ImageFormat::WebP => Some(ImageMime::WebP),
            _ => None,
        }
    }
}

impl FromStr for ImageMime {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::classify(raw).ok_or_else(|| format!("unsupported MIME type: {}", raw))
    }
}

impl fmt::Display for ImageMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
