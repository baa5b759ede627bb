mod comic;
pub mod comicinfo;
mod epub;
mod pdf;

pub use comic::ComicHandler;
pub use epub::EpubHandler;
pub use pdf::{PdfEngine, PdfHandler};

use crate::book::{BookInfo, ExtractReport, Page};
use crate::config::PdfConfig;
use crate::error::{BookError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Trait for format-specific book handlers.
pub trait FormatHandler {
    /// Extract normalized metadata from a book file.
    fn book_info(&self, path: &Path) -> Result<BookInfo>;

    /// Extract the pages of a book into an existing `output` folder.
    fn extract_pages(&self, path: &Path, output: &Path) -> Result<ExtractReport>;
}

/// Supported book formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookFormat {
    /// CBZ format (Comic Book ZIP archive).
    Cbz,
    /// CBR format (Comic Book RAR archive).
    Cbr,
    /// CB7 format (Comic Book 7-Zip archive).
    Cb7,
    /// CBT format (Comic Book TAR archive).
    Cbt,
    /// PDF format (Portable Document Format).
    Pdf,
    /// EPUB format (Electronic Publication).
    Epub,
}

impl BookFormat {
    /// Try to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "cbz" => Some(BookFormat::Cbz),
            "cbr" => Some(BookFormat::Cbr),
            "cb7" => Some(BookFormat::Cb7),
            "cbt" => Some(BookFormat::Cbt),
            "pdf" => Some(BookFormat::Pdf),
            "epub" => Some(BookFormat::Epub),
            _ => None,
        }
    }

    /// Detect format from a path, failing with the offending extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();

        Self::from_extension(&ext).ok_or_else(|| {
            BookError::UnsupportedFormat(if ext.is_empty() {
                "(none)".to_string()
            } else {
                format!(".{ext}")
            })
        })
    }
}

impl fmt::Display for BookFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookFormat::Cbz => "CBZ",
            BookFormat::Cbr => "CBR",
            BookFormat::Cb7 => "CB7",
            BookFormat::Cbt => "CBT",
            BookFormat::Pdf => "PDF",
            BookFormat::Epub => "EPUB",
        };
        f.write_str(name)
    }
}

/// Check whether a path has one of the supported book extensions.
pub fn is_valid_book_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(BookFormat::from_extension)
        .is_some()
}

/// Extract metadata from a book file with a default, never-bound PDF engine.
///
/// Reading metadata does not render, so this is safe to call from many
/// threads at once.
pub fn get_book_info(path: &Path) -> Result<BookInfo> {
    Bookkeeper::new(&PdfConfig::default()).book_info(path)
}

/// Format dispatcher owning the PDF rendering engine.
pub struct Bookkeeper {
    engine: PdfEngine,
    pdf: PdfConfig,
}

impl Bookkeeper {
    /// Create a dispatcher. pdfium is not bound until the first render.
    pub fn new(config: &PdfConfig) -> Self {
        Self {
            engine: PdfEngine::new(config.library_path.clone()),
            pdf: config.clone(),
        }
    }

    /// Get the appropriate handler for a book format.
    fn handler(&self, format: BookFormat) -> Box<dyn FormatHandler + '_> {
        match format {
            BookFormat::Cbz | BookFormat::Cbr | BookFormat::Cb7 | BookFormat::Cbt => {
                Box::new(ComicHandler)
            }
            BookFormat::Pdf => Box::new(PdfHandler::new(&self.engine, &self.pdf)),
            BookFormat::Epub => Box::new(EpubHandler),
        }
    }

    /// Extract normalized metadata from a book file.
    pub fn book_info(&self, path: &Path) -> Result<BookInfo> {
        let format = BookFormat::from_path(path)?;
        tracing::debug!(path = %path.display(), format = %format, "Reading metadata");
        self.handler(format).book_info(path)
    }

    /// Extract pages into `output`, creating it if missing.
    pub fn extract(&self, input: &Path, output: &Path) -> Result<Vec<Page>> {
        self.extract_with_report(input, output)
            .map(|report| report.pages)
    }

    /// Like [`Bookkeeper::extract`], also reporting how many pages were dropped.
    pub fn extract_with_report(&self, input: &Path, output: &Path) -> Result<ExtractReport> {
        let format = BookFormat::from_path(input)?;
        if format == BookFormat::Epub {
            return Err(BookError::ExtractionUnsupported(format));
        }

        std::fs::create_dir_all(output).map_err(|e| BookError::filesystem(output, e))?;
        self.handler(format).extract_pages(input, output)
    }
}

impl Default for Bookkeeper {
    fn default() -> Self {
        Self::new(&PdfConfig::default())
    }
}
