//! # Image Codec Module
//!
//! The transformer only needs four things from an imaging engine: decode a file,
//! report its dimensions, resize it to exact dimensions and save it back in the
//! format it was read in. `ImageCodec` and `DecodedImage` capture that contract;
//! `ImageRsCodec` fulfils it with the `image` crate.

use crate::config::{Config, ResizeFilter};
use crate::error::{Result, TransformError};
use crate::utils::{replace_file, scratch_file_for};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat, RgbImage};
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Imaging engine able to decode files into `DecodedImage`s
pub trait ImageCodec {
    type Image: DecodedImage;

    /// Whether the engine can actually decode and encode images in this build
    fn backend_available(&self) -> bool;

    fn decode(&self, path: &Path) -> Result<Self::Image>;
}

/// In-memory image produced by an `ImageCodec`
pub trait DecodedImage {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Resize to exactly `width` x `height`
    fn resize(&mut self, width: u32, height: u32);

    /// Encode to `path` using the format the image was decoded from
    fn save(&self, path: &Path) -> Result<()>;
}

/// Compute the dimensions for an aspect-ratio preserving resize.
///
/// Exactly one of `width`/`height` is normally given; the other side is derived
/// from the current ratio, rounded, and never smaller than one pixel. When both
/// are given they are returned unchanged.
pub fn target_dimensions(
    current: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    let (current_width, current_height) = current;

    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, scale(current_height, w, current_width)),
        (None, Some(h)) => (scale(current_width, h, current_height), h),
        (None, None) => current,
    }
}

/// `len * numerator / denominator`, rounded half up, clamped to at least 1
fn scale(len: u32, numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return len.max(1);
    }

    let scaled = (u64::from(len) * u64::from(numerator) * 2 + u64::from(denominator))
        / (u64::from(denominator) * 2);
    scaled.clamp(1, u64::from(u32::MAX)) as u32
}

/// Codec backed by the `image` crate
#[derive(Debug, Clone)]
pub struct ImageRsCodec {
    filter: FilterType,
    jpeg_quality: u8,
}

impl ImageRsCodec {
    pub fn new(filter: ResizeFilter, jpeg_quality: u8) -> Self {
        Self {
            filter: filter.to_filter_type(),
            jpeg_quality,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.filter, config.jpeg_quality)
    }
}

impl Default for ImageRsCodec {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ImageCodec for ImageRsCodec {
    type Image = ImageRsImage;

    fn backend_available(&self) -> bool {
        static AVAILABLE: OnceLock<bool> = OnceLock::new();
        *AVAILABLE.get_or_init(probe_backend)
    }

    fn decode(&self, path: &Path) -> Result<Self::Image> {
        let reader = image::io::Reader::open(path)?.with_guessed_format()?;
        let format = reader.format().ok_or_else(|| {
            TransformError::Image(image::ImageError::Unsupported(
                image::error::UnsupportedError::from_format_and_kind(
                    image::error::ImageFormatHint::PathExtension(path.to_path_buf()),
                    image::error::UnsupportedErrorKind::Format(
                        image::error::ImageFormatHint::Unknown,
                    ),
                ),
            ))
        })?;
        let image = reader.decode()?;

        debug!(
            "Decoded {} ({:?}, {}x{})",
            path.display(),
            format,
            image.width(),
            image.height()
        );

        Ok(ImageRsImage {
            image,
            format,
            filter: self.filter,
            jpeg_quality: self.jpeg_quality,
        })
    }
}

/// Round-trip a 1x1 image through the PNG and JPEG codecs
fn probe_backend() -> bool {
    let pixel = DynamicImage::ImageRgb8(RgbImage::new(1, 1));

    let probes = [
        (ImageOutputFormat::Png, ImageFormat::Png),
        (ImageOutputFormat::Jpeg(90), ImageFormat::Jpeg),
    ];

    probes.into_iter().any(|(output, input)| {
        let mut buffer = Cursor::new(Vec::new());
        let ok = pixel.write_to(&mut buffer, output).is_ok()
            && image::load_from_memory_with_format(buffer.get_ref(), input).is_ok();
        debug!("Codec probe {:?}: {}", input, if ok { "ok" } else { "unavailable" });
        ok
    })
}

/// Image decoded by `ImageRsCodec`
#[derive(Debug, Clone)]
pub struct ImageRsImage {
    image: DynamicImage,
    format: ImageFormat,
    filter: FilterType,
    jpeg_quality: u8,
}

impl ImageRsImage {
    pub fn format(&self) -> ImageFormat {
        self.format
    }
}

impl DecodedImage for ImageRsImage {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.image = self.image.resize_exact(width, height, self.filter);
    }

    fn save(&self, path: &Path) -> Result<()> {
        // encode next to the original; it is only replaced once encoding succeeded
        let mut scratch = scratch_file_for(path, ".saving-", "")?;

        match self.format {
            // JPEG has no alpha channel, and the quality is ours to pick
            ImageFormat::Jpeg => {
                let rgb = self.image.to_rgb8();
                let mut writer = BufWriter::new(scratch.as_file_mut());
                JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality).encode(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    ColorType::Rgb8,
                )?;
                writer.flush()?;
            }
            // GIF frames are built from RGBA
            ImageFormat::Gif => DynamicImage::ImageRgba8(self.image.to_rgba8())
                .save_with_format(scratch.path(), ImageFormat::Gif)?,
            format => self.image.save_with_format(scratch.path(), format)?,
        }

        replace_file(scratch, path)?;

        debug!("Saved {}x{} image to {}", self.width(), self.height(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_fixture(path: &Path, width: u32, height: u32, format: ImageFormat) {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        }));
        match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
                .save_with_format(path, format)
                .unwrap(),
            _ => img.save_with_format(path, format).unwrap(),
        }
    }

    #[test]
    fn test_target_dimensions_width() {
        assert_eq!(target_dimensions((1000, 500), Some(400), None), (400, 200));
        assert_eq!(target_dimensions((1920, 1080), Some(1280), None), (1280, 720));
    }

    #[test]
    fn test_target_dimensions_height() {
        assert_eq!(target_dimensions((300, 800), None, Some(400)), (150, 400));
    }

    #[test]
    fn test_target_dimensions_rounds_and_clamps() {
        // 333 * 100 / 1000 = 33.3
        assert_eq!(target_dimensions((1000, 333), Some(100), None), (100, 33));
        // 335 * 100 / 1000 = 33.5
        assert_eq!(target_dimensions((1000, 335), Some(100), None), (100, 34));
        // a 1000x1 strip never collapses to zero height
        assert_eq!(target_dimensions((1000, 1), Some(10), None), (10, 1));
    }

    #[test]
    fn test_target_dimensions_exact() {
        assert_eq!(target_dimensions((800, 600), Some(500), Some(500)), (500, 500));
        assert_eq!(target_dimensions((800, 600), None, None), (800, 600));
    }

    #[test]
    fn test_backend_available() {
        assert!(ImageRsCodec::default().backend_available());
    }

    #[test]
    fn test_decode_resize_save_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upload.png");
        write_fixture(&path, 64, 32, ImageFormat::Png);

        let codec = ImageRsCodec::default();
        let mut decoded = codec.decode(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 32));
        assert_eq!(decoded.format(), ImageFormat::Png);

        decoded.resize(16, 16);
        decoded.save(&path).unwrap();

        let reloaded = image::open(&path).unwrap();
        assert_eq!(reloaded.dimensions(), (16, 16));
        assert_eq!(image::ImageFormat::from_path(&path).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_save_keeps_decoded_format_regardless_of_extension() {
        let dir = TempDir::new().unwrap();
        // uploads usually land on disk without a meaningful extension
        let path = dir.path().join("upload_7f3a.tmp");
        write_fixture(&path.with_extension("jpg"), 40, 20, ImageFormat::Jpeg);
        std::fs::rename(path.with_extension("jpg"), &path).unwrap();

        let codec = ImageRsCodec::new(ResizeFilter::Triangle, 75);
        let mut decoded = codec.decode(&path).unwrap();
        assert_eq!(decoded.format(), ImageFormat::Jpeg);

        decoded.resize(20, 10);
        decoded.save(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (20, 10));
    }

    fn leftover_scratch_files(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(".saving-"))
            .count()
    }

    #[test]
    fn test_decode_resize_save_gif() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upload_7f3a");
        write_fixture(&path, 120, 60, ImageFormat::Gif);

        let mut decoded = ImageRsCodec::default().decode(&path).unwrap();
        assert_eq!(decoded.format(), ImageFormat::Gif);

        decoded.resize(40, 20);
        decoded.save(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Gif);
        assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (40, 20));
        assert_eq!(leftover_scratch_files(&dir), 0);
    }

    #[test]
    fn test_decode_resize_save_webp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upload_7f3a");
        write_fixture(&path, 800, 600, ImageFormat::WebP);

        let mut decoded = ImageRsCodec::default().decode(&path).unwrap();
        assert_eq!(decoded.format(), ImageFormat::WebP);

        decoded.resize(500, 500);
        decoded.save(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::WebP);
        assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (500, 500));
        assert_eq!(leftover_scratch_files(&dir), 0);
    }

    #[test]
    fn test_failed_encode_leaves_original_intact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upload_7f3a");
        std::fs::write(&path, b"original bytes").unwrap();

        // wider than a JPEG frame header can describe
        let image = ImageRsImage {
            image: DynamicImage::ImageRgb8(RgbImage::new(70_000, 1)),
            format: ImageFormat::Jpeg,
            filter: FilterType::Triangle,
            jpeg_quality: 80,
        };

        assert!(image.save(&path).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"original bytes");
        assert_eq!(leftover_scratch_files(&dir), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upload.png");
        write_fixture(&path, 32, 32, ImageFormat::Png);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let mut decoded = ImageRsCodec::default().decode(&path).unwrap();
        decoded.resize(8, 8);
        decoded.save(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_decode_garbage_is_transformation_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\nnot really a png").unwrap();

        let err = ImageRsCodec::default().decode(&path).unwrap_err();
        assert!(err.is_transformation());
    }

    #[test]
    fn test_decode_missing_file_is_io_error() {
        let err = ImageRsCodec::default()
            .decode(Path::new("/definitely/not/here.png"))
            .unwrap_err();
        assert!(matches!(err, TransformError::Io(_)));
    }
}
