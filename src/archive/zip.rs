//! ZIP container backend (CBZ).

use super::{ArchiveEntry, ComicArchive};
use crate::error::{BookError, Result};
use ::zip::ZipArchive;
use ::zip::result::ZipError;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// ZIP archive opened from disk.
pub struct ZipBackend {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
}

impl ZipBackend {
    /// Open a ZIP archive and read its central directory.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| BookError::open(path, e))?;
        let archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| BookError::open(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }
}

impl ComicArchive for ZipBackend {
    fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let file = self
                .archive
                .by_index_raw(index)
                .map_err(|e| BookError::list(&self.path, e))?;
            entries.push(ArchiveEntry {
                name: file.name().to_string(),
                is_dir: file.is_dir(),
            });
        }
        Ok(entries)
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|e| BookError::open(&self.path, format!("{name}: {e}")))?;

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    fn extract_all(&mut self, dest: &Path) -> Result<()> {
        self.archive.extract(dest).map_err(|e| match e {
            ZipError::Io(source) => BookError::filesystem(dest, source),
            other => BookError::open(&self.path, other),
        })
    }
}
