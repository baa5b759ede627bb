//! Comic book archive (CBZ/CBR/CB7/CBT) format handler.

use crate::archive::{self, ArchiveEntry, ComicArchive, clean_entry_path};
use crate::book::{BookInfo, ExtractReport, Page};
use crate::error::{BookError, Result};
use crate::formats::FormatHandler;
use crate::formats::comicinfo::{self, is_comic_info};
use crate::images::{is_directory_entry, is_image_file, probe_dimensions};
use crate::natsort::natord_compare;
use std::path::Path;

/// Handler for comic book archives, whatever their container.
pub struct ComicHandler;

impl ComicHandler {
    /// Check if a listed entry is a page image.
    fn is_page(entry: &ArchiveEntry) -> bool {
        !entry.is_dir && !is_directory_entry(&entry.name) && is_image_file(&entry.name)
    }

    /// Count page images, ignoring directories.
    fn count_pages(entries: &[ArchiveEntry]) -> u32 {
        entries.iter().filter(|e| Self::is_page(e)).count() as u32
    }

    /// Read and parse the first ComicInfo.xml found in the listing.
    ///
    /// Any failure here means "no sidecar metadata", never a failed request.
    fn read_sidecar(
        archive: &mut dyn ComicArchive,
        entries: &[ArchiveEntry],
        path: &Path,
    ) -> Option<BookInfo> {
        let sidecar = entries
            .iter()
            .find(|e| !e.is_dir && is_comic_info(&e.name))?;

        tracing::debug!(path = %path.display(), entry = %sidecar.name, "Found ComicInfo.xml");

        let data = match archive.read_entry(&sidecar.name) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read ComicInfo.xml");
                return None;
            }
        };

        match comicinfo::parse_comic_info(&data) {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unparseable ComicInfo.xml");
                None
            }
        }
    }
}

impl FormatHandler for ComicHandler {
    fn book_info(&self, path: &Path) -> Result<BookInfo> {
        let mut archive = archive::open(path)?;
        let entries = archive.entries()?;

        let mut info = Self::read_sidecar(archive.as_mut(), &entries, path).unwrap_or_default();
        if info.pages == 0 {
            info.pages = Self::count_pages(&entries);
        }
        info.ensure_title(path);

        Ok(info)
    }

    fn extract_pages(&self, path: &Path, output: &Path) -> Result<ExtractReport> {
        if !output.is_dir() {
            return Err(BookError::filesystem(
                output,
                std::io::Error::new(std::io::ErrorKind::NotFound, "output folder does not exist"),
            ));
        }

        let mut archive = archive::open(path)?;
        let entries = archive.entries()?;
        archive.extract_all(output)?;
        drop(archive);

        let mut report = ExtractReport::default();
        for entry in entries.iter().filter(|e| Self::is_page(e)) {
            let Some(relative) = clean_entry_path(&entry.name) else {
                continue;
            };

            match probe_dimensions(&output.join(&relative)) {
                Ok((width, height)) => report.pages.push(Page {
                    path: relative,
                    width,
                    height,
                }),
                Err(e) => {
                    tracing::debug!(entry = %entry.name, error = %e, "Dropping unreadable page");
                    report.dropped += 1;
                }
            }
        }

        // Natural sort (so page2 comes before page10)
        report.pages.sort_by(|a, b| natord_compare(&a.path, &b.path));

        tracing::info!(
            path = %path.display(),
            pages = report.pages.len(),
            dropped = report.dropped,
            "Extracted comic archive"
        );

        Ok(report)
    }
}
