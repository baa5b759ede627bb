//! RAR container backend (CBR).
//!
//! RAR decoding is delegated to the `lsar`/`unar` tools from The Unarchiver,
//! which handle RAR4 and RAR5 (solid and multi-volume) without licensing
//! restrictions.

use super::{ArchiveEntry, ComicArchive, clean_entry_path};
use crate::error::{BookError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// RAR archive on disk.
pub struct RarArchive {
    path: PathBuf,
}

impl RarArchive {
    /// Open a RAR archive, checking that it exists.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(BookError::open(path, "RAR file not found"));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Run one of the unar tools, mapping spawn and exit failures.
    fn run(&self, mut command: Command) -> std::result::Result<Output, String> {
        let program = command.get_program().to_string_lossy().to_string();
        let output = command.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                format!("{program} command not found (install unar)")
            } else {
                e.to_string()
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("{program} failed: {}", stderr.trim()));
        }
        Ok(output)
    }

    /// Extract into `dest`, optionally limited to the named entries.
    fn unar(&self, dest: &Path, only: Option<&str>) -> std::result::Result<(), String> {
        let mut command = Command::new("unar");
        command
            .arg("-q") // quiet
            .arg("-o")
            .arg(dest)
            .arg("-D") // no containing directory
            .arg("-f") // overwrite
            .arg(&self.path);
        if let Some(name) = only {
            command.arg(name);
        }
        self.run(command).map(|_| ())
    }
}

/// Parse the JSON listing printed by `lsar -j`.
fn parse_listing(json: &str) -> std::result::Result<Vec<ArchiveEntry>, String> {
    let listing: serde_json::Value =
        serde_json::from_str(json).map_err(|e| format!("invalid lsar output: {e}"))?;

    let Some(contents) = listing["lsarContents"].as_array() else {
        return Err("lsar output has no lsarContents".to_string());
    };

    Ok(contents
        .iter()
        .filter_map(|entry| {
            let mut name = entry["XADFileName"].as_str()?.to_string();
            let is_dir = entry["XADIsDirectory"].as_bool().unwrap_or(false)
                || entry["XADIsDirectory"].as_u64() == Some(1)
                || entry["XADFileType"].as_str() == Some("Directory");
            if is_dir && !name.ends_with('/') {
                name.push('/');
            }
            Some(ArchiveEntry { name, is_dir })
        })
        .collect())
}

impl ComicArchive for RarArchive {
    fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let mut command = Command::new("lsar");
        command.arg("-j").arg(&self.path);

        let output = self
            .run(command)
            .map_err(|e| BookError::list(&self.path, e))?;
        parse_listing(&String::from_utf8_lossy(&output.stdout))
            .map_err(|e| BookError::list(&self.path, e))
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let scratch = tempfile::tempdir()?;
        self.unar(scratch.path(), Some(name))
            .map_err(|e| BookError::open(&self.path, e))?;

        let relative = clean_entry_path(name)
            .ok_or_else(|| BookError::open(&self.path, format!("{name}: invalid entry name")))?;
        Ok(std::fs::read(scratch.path().join(relative))?)
    }

    fn extract_all(&mut self, dest: &Path) -> Result<()> {
        self.unar(dest, None)
            .map_err(|e| BookError::open(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::write_zip;

    /// The unar tools read ZIP too, which is enough to drive the backend.
    fn unar_installed() -> bool {
        Command::new("lsar").arg("-h").output().is_ok()
            && Command::new("unar").arg("-h").output().is_ok()
    }

    #[test]
    fn test_round_trip_through_unar() {
        if !unar_installed() {
            eprintln!("skipping: lsar/unar not installed");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.cbr");
        write_zip(
            &path,
            &[
                ("pages/", b"".as_slice()),
                ("pages/01.jpg", b"first".as_slice()),
                ("pages/02.jpg", b"second".as_slice()),
            ],
        );

        let mut archive = RarArchive::open(&path).unwrap();
        let entries = archive.entries().unwrap();
        assert!(entries.iter().any(|e| !e.is_dir && e.name == "pages/01.jpg"));
        assert_eq!(archive.read_entry("pages/02.jpg").unwrap(), b"second");

        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();
        archive.extract_all(&out).unwrap();
        assert_eq!(std::fs::read(out.join("pages/01.jpg")).unwrap(), b"first");
    }

    #[test]
    fn test_parse_listing() {
        let json = r#"{
            "lsarFormatVersion": 2,
            "lsarContents": [
                {"XADFileName": "Comic/", "XADIsDirectory": true},
                {"XADFileName": "Comic/01.jpg", "XADFileSize": 10},
                {"XADFileName": "Comic/ComicInfo.xml"}
            ]
        }"#;

        let entries = parse_listing(json).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_dir);
        assert_eq!(entries[1].name, "Comic/01.jpg");
        assert!(!entries[1].is_dir);
    }

    #[test]
    fn test_parse_listing_marks_directories_with_slash() {
        let json = r#"{"lsarContents": [{"XADFileName": "pages", "XADIsDirectory": 1}]}"#;
        let entries = parse_listing(json).unwrap();
        assert_eq!(entries[0].name, "pages/");
    }

    #[test]
    fn test_parse_listing_rejects_garbage() {
        assert!(parse_listing("not json").is_err());
        assert!(parse_listing("{}").is_err());
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            RarArchive::open(Path::new("/nonexistent/book.cbr")),
            Err(BookError::Open { .. })
        ));
    }
}
