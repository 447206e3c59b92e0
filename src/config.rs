use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::exif::{DEFAULT_MAX_DENOMINATOR, Endian};
use crate::synth::DEFAULT_SOFTWARE;

/// Top-level configuration for the exif-scramble library and binaries.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_scramble::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("exif-scramble.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.output.jpeg_quality = 90;
/// config.seed = Some(42);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where and how output images are written.
    pub output: OutputConfig,
    /// Values that go into the synthetic metadata.
    pub metadata: MetadataConfig,
    /// Which input files are picked up.
    pub filter: FilterConfig,
    /// Upload server settings (used by `exif-scramble-server`).
    pub server: ServerConfig,
    /// Fixed seed for reproducible output. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

/// Output behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the rewritten images.
    pub output_dir: PathBuf,
    /// JPEG quality, 1–100.
    pub jpeg_quality: u8,
}

/// Settings for the synthetic EXIF values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Literal written to the Software tag.
    pub software: String,
    /// Upper bound for the denominator of GPS degree rationals.
    pub max_denominator: u64,
    /// Byte order of the EXIF TIFF structure.
    pub byte_order: Endian,
}

/// Input selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Case-insensitive extensions, without the leading dot.
    pub allowed_extensions: Vec<String>,
    /// Walk directories recursively instead of listing one level.
    pub recursive: bool,
}

/// HTTP upload front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Staging directory for uploaded files.
    pub upload_dir: PathBuf,
    /// Directory receiving processed uploads.
    pub processed_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: OutputConfig::default(),
            metadata: MetadataConfig::default(),
            filter: FilterConfig::default(),
            server: ServerConfig::default(),
            seed: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("processed"),
            jpeg_quality: 75,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            software: DEFAULT_SOFTWARE.to_string(),
            max_denominator: DEFAULT_MAX_DENOMINATOR,
            byte_order: Endian::Big,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: ["png", "jpg", "jpeg", "gif", "bmp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            recursive: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            upload_dir: PathBuf::from("uploads"),
            processed_dir: PathBuf::from("processed"),
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

impl FilterConfig {
    /// Check whether a file name carries an allowed extension.
    ///
    /// Dot-files such as `.jpg` have no extension and are rejected.
    pub fn allows(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.allowed_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

impl Config {
    /// Resolve the config file path next to the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("exif-scramble.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Reject settings that would make every image fail.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.output.jpeg_quality) {
            anyhow::bail!("jpeg_quality must be between 1 and 100, got {}", self.output.jpeg_quality);
        }
        if self.metadata.max_denominator == 0 {
            anyhow::bail!("max_denominator must be at least 1");
        }
        if self.metadata.max_denominator > u64::from(u32::MAX) {
            anyhow::bail!("max_denominator must fit an EXIF RATIONAL (at most {})", u32::MAX);
        }
        if !self.metadata.software.is_ascii() || self.metadata.software.contains('\0') {
            anyhow::bail!("software must be plain ASCII without NUL bytes");
        }
        Ok(())
    }
}
