//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. `$TUTOR_CONFIG` environment variable
//! 2. `~/.config/tutor/config.toml`
//! 3. Built-in defaults (everything is optional)

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use tutor_core::{Matcher, Similarity, DEFAULT_CUTOFF};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub matcher: MatcherConfig,
    pub normalizer: NormalizerConfig,
    pub session: SessionConfig,
}

/// Knowledge base location.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON knowledge base path. Default: platform-specific data dir.
    pub path: Option<String>,
}

/// Fuzzy matching settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum similarity (inclusive) for a stored question to match.
    pub cutoff: f64,
    pub similarity: Similarity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizerKind {
    #[default]
    Lexicon,
    Simple,
}

/// Text normalization settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub kind: NormalizerKind,
    /// External `form<TAB>lemma` dictionary. Default: built-in English list.
    pub lexicon: Option<String>,
}

/// Interactive session settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Extra attempts when saving a learned answer fails.
    pub save_retries: u32,
}

// --- Defaults ---

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
            similarity: Similarity::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { save_retries: 1 }
    }
}

impl Config {
    pub fn matcher(&self) -> Result<Matcher> {
        Matcher::new(self.matcher.cutoff, self.matcher.similarity).context("invalid [matcher]")
    }
}

/// Load config from disk. Returns defaults if no config file exists.
pub fn load_config() -> Result<Config> {
    let path = config_path();

    if let Some(p) = &path {
        if p.exists() {
            let content =
                std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            let config: Config =
                toml::from_str(&content).with_context(|| format!("parsing {}", p.display()))?;
            return Ok(config);
        }
    }

    Ok(Config::default())
}

/// Resolve the config file path.
fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("TUTOR_CONFIG") {
        return Some(PathBuf::from(p));
    }

    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config").join("tutor").join("config.toml"))
}

/// Show the active config path (for `tutor config`).
pub fn show_config_path() -> String {
    match config_path() {
        Some(p) if p.exists() => format!("{} (loaded)", p.display()),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "no config path resolved (using defaults)".into(),
    }
}
