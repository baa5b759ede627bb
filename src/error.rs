use crate::formats::BookFormat;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for metadata and page extraction.
#[derive(Error, Debug)]
pub enum BookError {
    /// The file extension is not one of the supported book formats.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Page extraction was requested for a metadata-only format.
    #[error("Page extraction is not supported for {0} files")]
    ExtractionUnsupported(BookFormat),

    /// The container could not be opened.
    #[error("Failed to open {}: {reason}", path.display())]
    Open {
        /// Path of the container.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// The container was opened but its entries could not be enumerated.
    #[error("Failed to list entries of {}: {reason}", path.display())]
    List {
        /// Path of the container.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// None of the ComicInfo.xml schema versions matched.
    #[error("Failed to parse ComicInfo.xml: {0}")]
    MetadataParse(String),

    /// The pixel dimensions of an extracted image could not be read.
    #[error("Failed to probe image {}: {reason}", path.display())]
    ImageProbe {
        /// Path of the image on disk.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// A PDF page could not be rendered or encoded.
    #[error("Failed to render page {page}: {reason}")]
    Render {
        /// 1-based page number.
        page: usize,
        /// Underlying cause.
        reason: String,
    },

    /// An output directory or file could not be created or written.
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        /// Path being created or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Image processing error.
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BookError {
    /// Build an [`BookError::Open`] for `path`.
    pub fn open(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        BookError::Open {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`BookError::List`] for `path`.
    pub fn list(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        BookError::List {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`BookError::Filesystem`] for `path`.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BookError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, BookError>;
