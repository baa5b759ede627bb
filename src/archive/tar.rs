//! TAR container backend (CBT), optionally gzip-compressed.

use super::{ArchiveEntry, ComicArchive};
use crate::error::{BookError, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// TAR archive on disk.
///
/// TAR is a sequential format, so every operation streams the file from the
/// start with a fresh handle that is dropped when the operation returns.
pub struct TarArchive {
    path: PathBuf,
    gzip: bool,
}

impl TarArchive {
    /// Open a TAR archive, checking that its first header can be read.
    pub fn open(path: &Path, gzip: bool) -> Result<Self> {
        let archive = Self {
            path: path.to_path_buf(),
            gzip,
        };

        let mut reader = archive.reader().map_err(|e| BookError::open(path, e))?;
        reader
            .entries()
            .map_err(|e| BookError::open(path, e))?
            .next()
            .transpose()
            .map_err(|e| BookError::open(path, e))?;

        Ok(archive)
    }

    fn reader(&self) -> std::io::Result<::tar::Archive<Box<dyn Read>>> {
        let file = BufReader::new(File::open(&self.path)?);
        let stream: Box<dyn Read> = if self.gzip {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(::tar::Archive::new(stream))
    }
}

impl ComicArchive for TarArchive {
    fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let list_error = |e: std::io::Error| BookError::list(&self.path, e);

        let mut archive = self.reader().map_err(list_error)?;
        let mut entries = Vec::new();
        for entry in archive.entries().map_err(list_error)? {
            let entry = entry.map_err(list_error)?;
            let is_dir = entry.header().entry_type().is_dir();
            let mut name = entry.path().map_err(list_error)?.to_string_lossy().to_string();
            if is_dir && !name.ends_with('/') {
                name.push('/');
            }
            entries.push(ArchiveEntry { name, is_dir });
        }
        Ok(entries)
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut archive = self.reader()?;
        for entry in archive.entries()? {
            let mut entry = entry?;
            if entry.path()?.to_string_lossy() == name {
                let mut data = Vec::new();
                entry.read_to_end(&mut data)?;
                return Ok(data);
            }
        }

        Err(BookError::open(&self.path, format!("{name}: entry not found")))
    }

    fn extract_all(&mut self, dest: &Path) -> Result<()> {
        let mut archive = self.reader()?;
        archive
            .unpack(dest)
            .map_err(|e| BookError::filesystem(dest, e))
    }
}
