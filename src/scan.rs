//! Directory scanner emitting one JSON record per book file.

use crate::book::BookInfo;
use crate::config::ScanConfig;
use crate::error::{BookError, Result};
use crate::formats::{get_book_info, is_valid_book_file};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Outcome for one scanned file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScanRecord {
    /// Metadata was read.
    Success {
        /// Path relative to the scan root.
        path: String,
        /// File size in bytes.
        size: u64,
        /// Extracted metadata.
        book: BookInfo,
    },
    /// The file (or directory entry) could not be processed.
    Failed {
        /// Path relative to the scan root.
        path: String,
        /// Error message.
        error: String,
    },
}

impl ScanRecord {
    /// Whether this record is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, ScanRecord::Success { .. })
    }
}

/// Totals of a finished scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Files whose metadata was read.
    pub succeeded: usize,
    /// Files or entries that failed.
    pub failed: usize,
}

enum Candidate {
    File(PathBuf),
    WalkError(PathBuf, String),
}

/// Walks a directory tree and reads metadata for every supported book file.
pub struct Scanner {
    workers: usize,
    follow_links: bool,
}

impl Scanner {
    /// Create a scanner from configuration.
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            workers: config.workers.max(1),
            follow_links: config.follow_links,
        }
    }

    /// Override the number of parallel workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Collect book files in walk order; unreadable entries are kept as errors.
    fn candidates(&self, root: &Path) -> Vec<Candidate> {
        walkdir::WalkDir::new(root)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => {
                    let path = entry.path();
                    (entry.file_type().is_file() && is_valid_book_file(path))
                        .then(|| Candidate::File(path.to_path_buf()))
                }
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    Some(Candidate::WalkError(path, e.to_string()))
                }
            })
            .collect()
    }

    /// Scan `root`, returning records in walk order.
    pub fn scan(&self, root: &Path) -> Result<Vec<ScanRecord>> {
        let root = std::path::absolute(root).map_err(|e| BookError::filesystem(root, e))?;
        let candidates = self.candidates(&root);

        tracing::info!(
            root = %root.display(),
            files = candidates.len(),
            workers = self.workers,
            "Scanning"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| BookError::Config(format!("Failed to build scan pool: {e}")))?;

        Ok(pool.install(|| {
            candidates
                .par_iter()
                .map(|candidate| match candidate {
                    Candidate::File(path) => scan_book(&root, path),
                    Candidate::WalkError(path, error) => ScanRecord::Failed {
                        path: relative_path(&root, path),
                        error: error.clone(),
                    },
                })
                .collect()
        }))
    }

    /// Scan `root`, writing one JSON line per record to `out`.
    pub fn scan_to<W: Write>(&self, root: &Path, mut out: W) -> Result<ScanSummary> {
        let mut summary = ScanSummary::default();

        for record in self.scan(root)? {
            if record.is_success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            serde_json::to_writer(&mut out, &record)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Scan complete"
        );
        Ok(summary)
    }
}

/// Read metadata for one file. Failures become records, never errors.
fn scan_book(root: &Path, path: &Path) -> ScanRecord {
    let result = get_book_info(path).and_then(|book| {
        let size = std::fs::metadata(path)
            .map_err(|e| BookError::filesystem(path, e))?
            .len();
        Ok((book, size))
    });

    match result {
        Ok((book, size)) => ScanRecord::Success {
            path: relative_path(root, path),
            size,
            book,
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read book");
            ScanRecord::Failed {
                path: relative_path(root, path),
                error: e.to_string(),
            }
        }
    }
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}
