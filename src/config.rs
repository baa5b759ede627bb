use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Book metadata and page extraction for comic archives, PDFs and EPUBs.
#[derive(Parser, Debug, Clone)]
#[command(name = "bookkeeper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "BOOKKEEPER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scan a directory tree and print one JSON line per book file.
    Scan {
        /// Root directory to scan.
        path: PathBuf,

        /// Number of parallel workers (overrides the config file).
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Extract the pages of a book into a folder and write a manifest.
    Extract {
        /// Book file (CBZ, CBR, CB7, CBT or PDF).
        input: PathBuf,

        /// Output folder, created if missing.
        output: PathBuf,
    },

    /// Print the metadata of a single book as JSON.
    Info {
        /// Book file.
        path: PathBuf,
    },

    /// Create a default config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// PDF rendering configuration.
    #[serde(default)]
    pub pdf: PdfConfig,

    /// Page extraction configuration.
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Scan configuration.
    #[serde(default)]
    pub scan: ScanConfig,
}

/// PDF rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Rendering resolution in dots per inch.
    #[serde(default = "default_dpi")]
    pub dpi: u16,

    /// JPEG quality of rendered pages (1-100).
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Directory holding the pdfium shared library (system library if unset).
    #[serde(default)]
    pub library_path: Option<PathBuf>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            jpeg_quality: default_jpeg_quality(),
            library_path: None,
        }
    }
}

fn default_dpi() -> u16 {
    150
}

fn default_jpeg_quality() -> u8 {
    90
}

/// Page extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// File name of the page manifest written into the output folder.
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            manifest_name: default_manifest_name(),
        }
    }
}

fn default_manifest_name() -> String {
    crate::manifest::DEFAULT_MANIFEST_NAME.to_string()
}

/// Scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Number of parallel workers for metadata extraction (1 = sequential).
    /// Keep low for NAS/network storage to avoid saturation.
    #[serde(default = "default_scan_workers")]
    pub workers: usize,

    /// Follow symbolic links while walking.
    #[serde(default = "default_follow_links")]
    pub follow_links: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: default_scan_workers(),
            follow_links: default_follow_links(),
        }
    }
}

fn default_scan_workers() -> usize {
    1 // Sequential by default - safe for NAS/Raspberry Pi
}

fn default_follow_links() -> bool {
    true
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::BookError::Config(format!("Failed to read config file: {}", e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::BookError::Config(format!("Failed to parse config file: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the renderer and scanner cannot work with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.pdf.dpi == 0 {
            return Err(crate::error::BookError::Config(
                "pdf.dpi must be greater than 0".into(),
            ));
        }
        if !(1..=100).contains(&self.pdf.jpeg_quality) {
            return Err(crate::error::BookError::Config(
                "pdf.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if self.extract.manifest_name.trim().is_empty() {
            return Err(crate::error::BookError::Config(
                "extract.manifest_name must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("bookkeeper.toml"),
            PathBuf::from("config.toml"),
            dirs::config_dir()
                .map(|p| p.join("bookkeeper").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/bookkeeper/config.toml"),
        ];

        candidates.into_iter().find(|p| p.is_file())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# bookkeeper configuration

[pdf]
# Rendering resolution for extracted PDF pages
dpi = 150
# JPEG quality of rendered pages (1-100)
jpeg_quality = 90
# Directory holding libpdfium (system library if unset)
# library_path = "/usr/local/lib"

[extract]
# Manifest written next to the extracted pages
manifest_name = "pages.json"

[scan]
# Number of parallel workers for metadata extraction (1 = sequential)
workers = 1
# Follow symbolic links while walking
follow_links = true
"#
        .to_string()
    }
}
