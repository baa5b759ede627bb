//! PDF format handler.
//!
//! Metadata comes from the document-info dictionary via `lopdf`, which is
//! stateless. Pages are rendered with pdfium through a [`PdfEngine`], an
//! explicitly owned handle that serializes every render.

use crate::book::{BookInfo, ExtractReport, Page, split_comma_delimited};
use crate::config::PdfConfig;
use crate::error::{BookError, Result};
use crate::formats::FormatHandler;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use lopdf::{Dictionary, Document, Object};
use parking_lot::Mutex;
use pdfium_render::prelude::{PdfRenderConfig, Pdfium};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Decode UTF-16 code units; an odd trailing byte is padded with zero.
fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Option<String> {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|chunk| unit([chunk[0], chunk.get(1).copied().unwrap_or(0)]))
        .collect();
    String::from_utf16(&units).ok()
}

/// PDF points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Shared pdfium rendering engine.
///
/// pdfium is not safe for concurrent renders, so the engine behaves as a pool
/// of exactly one worker: the library is bound lazily on first use and every
/// document operation holds the lock for its whole duration. The binding
/// lives as long as the engine, which the binary keeps for the process
/// lifetime.
pub struct PdfEngine {
    library_path: Option<PathBuf>,
    pdfium: Mutex<Option<Pdfium>>,
}

impl PdfEngine {
    /// Create an unbound engine. `library_path` is a directory holding the
    /// pdfium shared library; the system library is used when absent.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self {
            library_path,
            pdfium: Mutex::new(None),
        }
    }

    fn bind(&self) -> Result<Pdfium> {
        let bindings = match &self.library_path {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_system_library().or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            }),
        }
        .map_err(|e| BookError::Pdf(format!("Failed to bind pdfium library: {e}")))?;

        tracing::debug!(library = ?self.library_path, "Bound pdfium library");
        Ok(Pdfium::new(bindings))
    }

    /// Run `f` with exclusive access to pdfium, binding it first if needed.
    pub fn with_pdfium<T>(&self, f: impl FnOnce(&Pdfium) -> Result<T>) -> Result<T> {
        let mut guard = self.pdfium.lock();
        let pdfium = match guard.take() {
            Some(pdfium) => pdfium,
            None => self.bind()?,
        };
        let result = f(&pdfium);
        *guard = Some(pdfium);
        result
    }
}

impl Default for PdfEngine {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Handler for PDF files.
pub struct PdfHandler<'a> {
    engine: &'a PdfEngine,
    dpi: u16,
    jpeg_quality: u8,
}

impl<'a> PdfHandler<'a> {
    /// Create a handler rendering through `engine` with the configured quality.
    pub fn new(engine: &'a PdfEngine, config: &PdfConfig) -> Self {
        Self {
            engine,
            dpi: config.dpi,
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Extract text content from a PDF info dictionary value.
    fn extract_text(obj: &Object) -> Option<String> {
        match obj {
            Object::String(bytes, _) => {
                // UTF-16 with BOM, otherwise UTF-8 (BOM optional) or Latin-1
                if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
                    decode_utf16(utf16, u16::from_be_bytes)
                } else if let Some(utf16) = bytes.strip_prefix(&[0xFF, 0xFE]) {
                    decode_utf16(utf16, u16::from_le_bytes)
                } else {
                    let bytes = bytes
                        .strip_prefix(&[0xEF, 0xBB, 0xBF])
                        .unwrap_or(bytes.as_slice());
                    Some(
                        String::from_utf8(bytes.to_vec())
                            .unwrap_or_else(|_| bytes.iter().map(|&b| b as char).collect()),
                    )
                }
            }
            Object::Name(name) => String::from_utf8(name.clone()).ok(),
            _ => None,
        }
    }

    /// Trimmed, non-empty text value of an info dictionary key.
    ///
    /// Values stored as indirect objects are resolved through `doc`.
    fn info_value(doc: &Document, info: &Dictionary, key: &[u8]) -> Option<String> {
        let (_, value) = doc.dereference(info.get(key).ok()?).ok()?;
        let text = Self::extract_text(value)?;
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Locate the document-info dictionary, direct or referenced.
    fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
        match doc.trailer.get(b"Info").ok()? {
            Object::Reference(id) => doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }
}

impl FormatHandler for PdfHandler<'_> {
    fn book_info(&self, path: &Path) -> Result<BookInfo> {
        let doc = Document::load(path).map_err(|e| BookError::open(path, e))?;

        let mut info = BookInfo::from_path(path);
        info.pages = doc.get_pages().len() as u32;

        if let Some(dict) = Self::info_dictionary(&doc) {
            // Some producers write the file extension as the title
            if let Some(title) = Self::info_value(&doc, dict, b"Title")
                && title != ".pdf"
            {
                info.title = title;
            }

            if let Some(author) = Self::info_value(&doc, dict, b"Author") {
                info.authors = vec![author];
            }

            if let Some(keywords) = Self::info_value(&doc, dict, b"Keywords") {
                info.keywords = split_comma_delimited(&keywords).collect();
            }
        }

        Ok(info)
    }

    fn extract_pages(&self, path: &Path, output: &Path) -> Result<ExtractReport> {
        let scale = f32::from(self.dpi) / POINTS_PER_INCH;

        let pages = self.engine.with_pdfium(|pdfium| {
            let document = pdfium
                .load_pdf_from_file(path, None)
                .map_err(|e| BookError::open(path, e))?;
            let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

            let mut pages = Vec::with_capacity(usize::from(document.pages().len()));
            for (index, page) in document.pages().iter().enumerate() {
                let number = index + 1;
                let render_error = |reason: String| BookError::Render {
                    page: number,
                    reason,
                };

                let bitmap = page
                    .render_with_config(&render_config)
                    .map_err(|e| render_error(e.to_string()))?;
                let rgb = bitmap.as_image().to_rgb8();
                let (width, height) = rgb.dimensions();
                if width == 0 || height == 0 {
                    return Err(render_error(format!("empty raster ({width}x{height})")));
                }

                let filename = format!("page_{number:02}.jpg");
                let target = output.join(&filename);
                let file = File::create(&target).map_err(|e| BookError::filesystem(&target, e))?;
                let mut writer = BufWriter::new(file);

                let encoder = JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality);
                DynamicImage::ImageRgb8(rgb)
                    .write_with_encoder(encoder)
                    .map_err(|e| render_error(e.to_string()))?;
                writer
                    .flush()
                    .map_err(|e| BookError::filesystem(&target, e))?;

                pages.push(Page {
                    path: filename,
                    width,
                    height,
                });
            }
            Ok(pages)
        })?;

        tracing::info!(path = %path.display(), pages = pages.len(), dpi = self.dpi, "Rendered PDF");

        Ok(ExtractReport { pages, dropped: 0 })
    }
}
