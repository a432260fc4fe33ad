//! # Utility Functions Module
//!
//! Helpers shared by the codec and the optimizer.

use std::fs;
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;

/// Converts any iterable of string-like items to `Vec<String>`.
///
/// # Example
/// ```rust
/// use image_transformer::utils::to_string_vec;
///
/// let level = 2;
/// let args = to_string_vec(["-o", &level.to_string(), "--strip", "safe"]);
/// assert_eq!(args, vec!["-o", "2", "--strip", "safe"]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Create a scratch file in the same directory as `target`, so it can later be
/// renamed over it
pub fn scratch_file_for(target: &Path, prefix: &str, suffix: &str) -> io::Result<NamedTempFile> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    tempfile::Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(dir)
}

/// Rename `scratch` over `target`.
///
/// The scratch file takes the permissions `target` had, so the swap only changes
/// the bytes.
pub fn replace_file(scratch: NamedTempFile, target: &Path) -> io::Result<()> {
    match fs::metadata(target) {
        Ok(metadata) => fs::set_permissions(scratch.path(), metadata.permissions())?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    scratch.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Human-readable file size
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Percentage saved going from `original_size` to `new_size`
pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
    if original_size == 0 {
        0.0
    } else {
        ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
    }
}
