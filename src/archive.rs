//! Comic book container backends.
//!
//! Comic archives are plain containers whose extension often lies about the
//! compression scheme (a `.cbr` is frequently a ZIP), so the backend is
//! chosen from the file's magic bytes and the extension is only a fallback.

mod rar;
mod sevenz;
mod tar;
mod zip;

pub use self::rar::RarArchive;
pub use self::sevenz::SevenZipArchive;
pub use self::tar::TarArchive;
pub use self::zip::ZipBackend;

use crate::error::{BookError, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path};

/// One entry listed from a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry name as stored in the container; directories end with `/`.
    pub name: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// Uniform access to a comic book container.
///
/// Implementations own their file handles; dropping the value releases them.
pub trait ComicArchive {
    /// List every entry in container order.
    fn entries(&mut self) -> Result<Vec<ArchiveEntry>>;

    /// Read the full content of one entry.
    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>>;

    /// Extract the whole container below `dest`, keeping its internal layout.
    fn extract_all(&mut self, dest: &Path) -> Result<()>;
}

/// Container formats understood by [`open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// ZIP (CBZ).
    Zip,
    /// Uncompressed TAR (CBT).
    Tar,
    /// Gzip-compressed TAR.
    TarGz,
    /// 7-Zip (CB7).
    SevenZip,
    /// RAR (CBR).
    Rar,
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
const RAR_MAGIC: &[u8] = b"Rar!\x1a\x07";
const SEVENZ_MAGIC: &[u8] = &[b'7', b'z', 0xBC, 0xAF, 0x27, 0x1C];
const GZIP_MAGIC: &[u8] = &[0x1F, 0x8B];
const TAR_MAGIC_OFFSET: usize = 257;
const TAR_MAGIC: &[u8] = b"ustar";

impl ArchiveKind {
    /// Identify a container from its leading bytes.
    pub fn from_magic(header: &[u8]) -> Option<Self> {
        if header.starts_with(ZIP_MAGIC) || header.starts_with(ZIP_EMPTY_MAGIC) {
            Some(ArchiveKind::Zip)
        } else if header.starts_with(RAR_MAGIC) {
            Some(ArchiveKind::Rar)
        } else if header.starts_with(SEVENZ_MAGIC) {
            Some(ArchiveKind::SevenZip)
        } else if header.starts_with(GZIP_MAGIC) {
            Some(ArchiveKind::TarGz)
        } else if header
            .get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len())
            .is_some_and(|magic| magic == TAR_MAGIC)
        {
            Some(ArchiveKind::Tar)
        } else {
            None
        }
    }

    /// Guess the container from a comic book extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "cbz" | "zip" => Some(ArchiveKind::Zip),
            "cbr" | "rar" => Some(ArchiveKind::Rar),
            "cb7" | "7z" => Some(ArchiveKind::SevenZip),
            "cbt" | "tar" => Some(ArchiveKind::Tar),
            _ => None,
        }
    }

    /// Detect the container kind of a file, sniffing content before extension.
    pub fn detect(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| BookError::open(path, e))?;
        let mut header = Vec::with_capacity(TAR_MAGIC_OFFSET + TAR_MAGIC.len());
        file.by_ref()
            .take((TAR_MAGIC_OFFSET + TAR_MAGIC.len()) as u64)
            .read_to_end(&mut header)
            .map_err(|e| BookError::open(path, e))?;

        if let Some(kind) = Self::from_magic(&header) {
            tracing::debug!(path = %path.display(), kind = ?kind, "Sniffed container kind");
            return Ok(kind);
        }

        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| BookError::open(path, "unrecognized container signature"))
    }
}

/// Open a comic book container with the backend matching its content.
pub fn open(path: &Path) -> Result<Box<dyn ComicArchive>> {
    let archive: Box<dyn ComicArchive> = match ArchiveKind::detect(path)? {
        ArchiveKind::Zip => Box::new(ZipBackend::open(path)?),
        ArchiveKind::Tar => Box::new(TarArchive::open(path, false)?),
        ArchiveKind::TarGz => Box::new(TarArchive::open(path, true)?),
        ArchiveKind::SevenZip => Box::new(SevenZipArchive::open(path)?),
        ArchiveKind::Rar => Box::new(RarArchive::open(path)?),
    };
    Ok(archive)
}

/// Normalize an entry name into a clean relative path.
///
/// Separators are unified to `/`, and empty, `.`, `..` and root components are
/// dropped so the result can never escape the extraction directory. Returns
/// `None` when nothing is left.
pub fn clean_entry_path(name: &str) -> Option<String> {
    let unified = name.replace('\\', "/");
    let parts: Vec<String> = Path::new(&unified)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
