use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default suffix appended to stripped files (`photo.jpg` → `photo_clean.jpg`).
pub const DEFAULT_SUFFIX: &str = "_clean";

/// Top-level configuration for the exif-remover library.
///
/// Holds the output naming snapshot, processing knobs, and notice settings.
/// Loaded once per run by the caller and passed explicitly into the batch
/// driver; nothing in the library reads settings on its own.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_remover::config::{Config, ConflictRule};
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.output.suffix = "_nometa".into();
/// config.output.conflict_rule = ConflictRule::Skip;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Destination naming and collision behavior.
    pub output: OutputConfiguration,
    /// How images are stripped and how many run at once.
    pub processing: ProcessingConfig,
    /// Notice banner behavior.
    pub notice: NoticeConfig,
}

/// What to do when the computed output path already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictRule {
    /// Append `_1`, `_2`, … until a free name is found.
    #[default]
    AppendIndex,
    /// Replace the existing file.
    Overwrite,
    /// Leave the existing file alone and skip the item.
    Skip,
}

impl ConflictRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppendIndex => "appendIndex",
            Self::Overwrite => "overwrite",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for ConflictRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictRule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "appendIndex" | "append-index" | "append_index" | "append" => Ok(Self::AppendIndex),
            "overwrite" => Ok(Self::Overwrite),
            "skip" => Ok(Self::Skip),
            other => anyhow::bail!(
                "unknown conflict rule '{other}' (expected appendIndex, overwrite or skip)"
            ),
        }
    }
}

/// Destination naming and collision behavior.
///
/// `suffix` is trimmed before use; see [`OutputConfiguration::normalized`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputConfiguration {
    pub suffix: String,
    pub conflict_rule: ConflictRule,
}

impl Default for OutputConfiguration {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            conflict_rule: ConflictRule::AppendIndex,
        }
    }
}

impl OutputConfiguration {
    pub fn new(suffix: impl Into<String>, conflict_rule: ConflictRule) -> Self {
        Self {
            suffix: suffix.into(),
            conflict_rule,
        }
    }

    /// The suffix with surrounding whitespace removed.
    pub fn sanitized_suffix(&self) -> &str {
        self.suffix.trim()
    }

    /// Copy with the suffix trimmed. Idempotent.
    pub fn normalized(&self) -> Self {
        Self {
            suffix: self.sanitized_suffix().to_string(),
            conflict_rule: self.conflict_rule,
        }
    }
}

/// How pixel data is carried into the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StripMode {
    /// Drop metadata blocks at the container level when the format allows it
    /// (JPEG, PNG, still WebP), re-encoding frame 0 otherwise.
    #[default]
    Lossless,
    /// Always decode frame 0 and re-encode it.
    Reencode,
}

impl FromStr for StripMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "lossless" => Ok(Self::Lossless),
            "reencode" | "re-encode" => Ok(Self::Reencode),
            other => anyhow::bail!("unknown strip mode '{other}' (expected lossless or reencode)"),
        }
    }
}

/// Processing knobs for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub mode: StripMode,
    /// Worker threads: `0` uses the global pool, `1` runs sequentially.
    pub jobs: usize,
}

/// Notice banner settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoticeConfig {
    /// Never show a notice banner, whatever the document says.
    pub disabled: bool,
}

impl Config {
    /// Resolve the config file path: same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
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

    /// Restore the output settings to their defaults, leaving the rest untouched.
    pub fn reset_output(&mut self) {
        self.output = OutputConfiguration::default();
    }
}
