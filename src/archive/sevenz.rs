//! 7-Zip container backend (CB7).

use super::{ArchiveEntry, ComicArchive, clean_entry_path};
use crate::error::{BookError, Result};
use sevenz_rust::{Password, SevenZReader};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// 7z archive on disk.
///
/// Solid 7z blocks must be decoded in order, so every operation walks the
/// archive with its own reader.
pub struct SevenZipArchive {
    path: PathBuf,
}

impl SevenZipArchive {
    /// Open a 7z archive, validating its headers.
    pub fn open(path: &Path) -> Result<Self> {
        let archive = Self {
            path: path.to_path_buf(),
        };
        archive.reader()?;
        Ok(archive)
    }

    fn reader(&self) -> Result<SevenZReader<BufReader<File>>> {
        let file = File::open(&self.path).map_err(|e| BookError::open(&self.path, e))?;
        let len = file
            .metadata()
            .map_err(|e| BookError::open(&self.path, e))?
            .len();

        SevenZReader::new(BufReader::new(file), len, Password::empty())
            .map_err(|e| BookError::open(&self.path, e))
    }
}

impl ComicArchive for SevenZipArchive {
    fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let mut reader = self.reader()?;
        let mut entries = Vec::new();

        reader
            .for_each_entries(|entry, _| {
                let is_dir = entry.is_directory();
                let mut name = entry.name().to_string();
                if is_dir && !name.ends_with('/') {
                    name.push('/');
                }
                entries.push(ArchiveEntry { name, is_dir });
                Ok(true)
            })
            .map_err(|e| BookError::list(&self.path, e))?;

        Ok(entries)
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut reader = self.reader()?;
        let mut found: Option<io::Result<Vec<u8>>> = None;

        reader
            .for_each_entries(|entry, data| {
                if entry.name() != name {
                    return Ok(true);
                }
                let mut content = Vec::new();
                found = Some(data.read_to_end(&mut content).map(|_| content));
                Ok(false)
            })
            .map_err(|e| BookError::open(&self.path, e))?;

        match found {
            Some(content) => Ok(content?),
            None => Err(BookError::open(
                &self.path,
                format!("{name}: entry not found"),
            )),
        }
    }

    fn extract_all(&mut self, dest: &Path) -> Result<()> {
        let mut reader = self.reader()?;
        let mut failure: Option<BookError> = None;

        reader
            .for_each_entries(|entry, data| {
                let Some(relative) = clean_entry_path(entry.name()) else {
                    tracing::debug!(entry = entry.name(), "Skipping entry with empty path");
                    return Ok(true);
                };
                let target = dest.join(relative);

                let written = if entry.is_directory() {
                    fs::create_dir_all(&target)
                } else {
                    target
                        .parent()
                        .map_or(Ok(()), fs::create_dir_all)
                        .and_then(|_| File::create(&target))
                        .and_then(|mut file| io::copy(data, &mut file).map(|_| ()))
                };

                match written {
                    Ok(()) => Ok(true),
                    Err(e) => {
                        failure = Some(BookError::filesystem(&target, e));
                        Ok(false)
                    }
                }
            })
            .map_err(|e| BookError::open(&self.path, e))?;

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
