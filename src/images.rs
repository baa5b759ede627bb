//! Page image classification and dimension probing.

use crate::error::{BookError, Result};
use image::ImageReader;
use std::path::Path;

/// Extensions recognized as page images.
const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

/// Check if an archive entry name is a page image candidate.
pub fn is_image_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Check if an archive entry name denotes a directory.
pub fn is_directory_entry(name: &str) -> bool {
    name.ends_with('/') || name.ends_with('\\')
}

/// Read the pixel dimensions of an image file without decoding its pixels.
///
/// The format is guessed from the content, not the extension. Images reporting
/// a zero width or height are rejected.
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32)> {
    let probe_error = |reason: String| BookError::ImageProbe {
        path: path.to_path_buf(),
        reason,
    };

    let (width, height) = ImageReader::open(path)
        .map_err(|e| probe_error(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| probe_error(e.to_string()))?
        .into_dimensions()
        .map_err(|e| probe_error(e.to_string()))?;

    if width == 0 || height == 0 {
        return Err(probe_error(format!("empty image ({width}x{height})")));
    }

    Ok((width, height))
}
