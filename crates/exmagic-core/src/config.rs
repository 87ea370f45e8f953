use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ExMagicError, Result};

/// Compiled magic databases shipped by common distributions, in lookup order.
pub const DATABASE_CANDIDATES: &[&str] = &[
    "/usr/share/misc/magic.mgc",
    "/usr/share/file/magic.mgc",
    "/usr/lib/file/magic.mgc",
    "/usr/local/share/misc/magic.mgc",
    "/opt/homebrew/share/misc/magic.mgc",
];

/// Root application configuration, loaded from `~/.config/exmagic/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub magic: MagicConfig,
    pub output: OutputConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MagicConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/exmagic/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("EXMAGIC_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("exmagic")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    // ─── Database discovery ────────────────────────────────

    /// Resolve the magic database to load.
    ///
    /// `explicit` (usually `--database`) wins over the config file, which
    /// wins over `$MAGIC`, which wins over the well-known system locations.
    pub fn resolve_database(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        let configured = explicit
            .map(Path::to_path_buf)
            .or_else(|| self.magic.database_path.as_ref().map(PathBuf::from));
        let env_magic = std::env::var_os("MAGIC").map(PathBuf::from);
        resolve_database_from(configured, env_magic, DATABASE_CANDIDATES)
    }
}

/// Pure lookup behind [`AppConfig::resolve_database`].
///
/// Explicit and `$MAGIC` paths are returned as-is without an existence
/// check; a bad path surfaces later as a database load failure.
pub fn resolve_database_from(
    explicit: Option<PathBuf>,
    env_magic: Option<PathBuf>,
    candidates: &[&str],
) -> Result<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path);
    }
    if let Some(path) = env_magic.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path);
    }

    candidates
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
        .ok_or_else(|| ExMagicError::DatabaseNotFound(candidates.join(", ")))
}

/// First installed system database, if any. Used by tests that need libmagic.
pub fn system_database() -> Option<PathBuf> {
    resolve_database_from(None, None, DATABASE_CANDIDATES).ok()
}
