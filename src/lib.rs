//! bookkeeper: metadata and page extraction for book files.
//!
//! This crate reads comic book archives (CBZ, CBR, CB7, CBT), PDF documents
//! and EPUB e-books, and produces a normalized [`BookInfo`] record for each.
//! Comic archives and PDFs can also be extracted into a folder of page
//! images, naturally ordered and annotated with their pixel dimensions.
//!
//! # Features
//!
//! - ComicInfo.xml sidecar parsing (schema v1.0, v2.0, v2.1)
//! - EPUB OPF metadata (EPUB 2 and 3, calibre series)
//! - PDF document-info metadata and pdfium page rendering
//! - Container detection by magic bytes (a `.cbr` holding a ZIP still opens)
//! - Directory scanning with one JSON line per file

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Comic archive container backends.
pub mod archive;
/// Book metadata and page models.
pub mod book;
/// Configuration and CLI.
pub mod config;
/// Error types.
pub mod error;
/// Book format handlers and dispatcher.
pub mod formats;
/// Image classification and probing.
pub mod images;
/// Page extraction with a JSON manifest.
pub mod manifest;
/// Natural-order string comparison.
pub mod natsort;
/// Directory scanning.
pub mod scan;

#[cfg(test)]
mod tests;

pub use book::{BookInfo, ExtractReport, Page};
pub use config::{Cli, Command, Config};
pub use error::{BookError, Result};
pub use formats::{BookFormat, Bookkeeper, get_book_info, is_valid_book_file};
