//! # configs
//!
//! Layered settings: built-in defaults, then an optional TOML file, then
//! `PAGE_COMMENTS__*` environment variables (after loading `.env`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat, FileSourceFile};
use domains::CommentPolicy;
use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "PAGE_COMMENTS";
/// Looked up in the working directory as `page-comments.toml` (or any other
/// supported extension) when no explicit path is given.
pub const DEFAULT_CONFIG_NAME: &str = "page-comments";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub storage: StorageSettings,
    pub comments: CommentSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Directory under which every page gets its own comment folder
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentSettings {
    pub size_limit: usize,
    /// Hold new comments for moderation
    pub review: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Settings {
    /// Reads `.env` if present, then resolves all layers.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_sources(path)
    }

    /// Resolves defaults, file and environment without touching `.env`.
    pub fn from_sources(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };
        Self::resolve(Some(file), Some(env_source()))
    }

    /// Layers whichever sources are given over the built-in defaults.
    fn resolve(
        file: Option<File<FileSourceFile, FileFormat>>,
        env: Option<Environment>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("storage.root", "./blog-comments")?
            .set_default("comments.size_limit", 2000)?
            .set_default("comments.review", false)?
            .set_default("log.level", "info")?
            .set_default("log.json", false)?;

        if let Some(file) = file {
            builder = builder.add_source(file);
        }
        if let Some(env) = env {
            builder = builder.add_source(env);
        }

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.comments.size_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "comments.size_limit",
                reason: "must be greater than zero".into(),
            });
        }
        if self.storage.root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "storage.root",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// The creation rules handed to the comment services.
    pub fn policy(&self) -> CommentPolicy {
        CommentPolicy {
            size_limit: self.comments.size_limit,
            review_enabled: self.comments.review,
        }
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
