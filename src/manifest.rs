//! Page extraction with a JSON manifest.
//!
//! The manifest is written next to the extracted pages:
//!
//! ```json
//! {
//!   "pages": [
//!     { "path": "01.jpg", "width": 1200, "height": 1800 }
//!   ]
//! }
//! ```

use crate::book::{ExtractReport, Page};
use crate::error::{BookError, Result};
use crate::formats::Bookkeeper;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default manifest file name.
pub const DEFAULT_MANIFEST_NAME: &str = "pages.json";

/// On-disk manifest document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Extracted pages in reading order.
    pub pages: Vec<Page>,
}

impl Manifest {
    /// Write the manifest as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| BookError::filesystem(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .map_err(|e| BookError::filesystem(path, e))
    }
}

/// Outcome of [`extract_with_manifest`].
#[derive(Debug)]
pub struct Extraction {
    /// Pages and dropped-entry count reported by the format handler.
    pub report: ExtractReport,
    /// Where the manifest was written.
    pub manifest_path: PathBuf,
}

/// Extract the pages of `input` into `output` and write the manifest there.
pub fn extract_with_manifest(
    bookkeeper: &Bookkeeper,
    input: &Path,
    output: &Path,
    manifest_name: &str,
) -> Result<Extraction> {
    let report = bookkeeper.extract_with_report(input, output)?;

    let manifest_path = output.join(manifest_name);
    let manifest = Manifest {
        pages: report.pages.clone(),
    };
    manifest.write(&manifest_path)?;

    tracing::info!(
        input = %input.display(),
        manifest = %manifest_path.display(),
        pages = report.pages.len(),
        dropped = report.dropped,
        "Wrote page manifest"
    );

    Ok(Extraction {
        report,
        manifest_path,
    })
}
