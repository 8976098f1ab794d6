//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml` (or an explicit
//! file), `config.<env>.toml` and `APP_*` env vars (`__` separates sections,
//! e.g. `APP_RECOMMEND__TOP_K=3`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub const DEFAULT_TOP_K: usize = 5;
/// Output width of all-MiniLM-L6-v2.
pub const DEFAULT_DIM: usize = 384;
pub const DEFAULT_MAX_LEN: usize = 256;
/// Position-embedding table size of BERT-family sentence encoders.
pub const MAX_SEQUENCE_LEN: usize = 512;

pub struct Config {
    figment: Figment,
    env_name: String,
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub metadata_path: PathBuf,
    pub embeddings_path: PathBuf,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            metadata_path: PathBuf::from("data/spotify_sample_with_embeddings.csv"),
            embeddings_path: PathBuf::from("data/lyrics_sample_embeddings.npy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub dir: PathBuf,
    pub dim: usize,
    pub max_len: usize,
    /// Use the hashing encoder instead of loading model weights.
    pub fake: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self { dir: PathBuf::from("models/all-MiniLM-L6-v2"), dim: DEFAULT_DIM, max_len: DEFAULT_MAX_LEN, fake: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendSettings {
    pub top_k: usize,
}

impl Default for RecommendSettings {
    fn default() -> Self { Self { top_k: DEFAULT_TOP_K } }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub catalog: CatalogSettings,
    pub model: ModelSettings,
    pub recommend: RecommendSettings,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(None)
    }

    /// Load with `base` replacing `config.toml` as the first layer.
    ///
    /// Relative paths inside the settings resolve against the directory of
    /// `base` when one is given, and against the working directory otherwise.
    pub fn load_from(base: Option<&Path>) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        figment = match base {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                figment.merge(Toml::file(path))
            }
            None => figment.merge(Toml::file("config.toml")),
        };
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let base_dir = base.and_then(Path::parent).map(Path::to_path_buf);
        let config = Self { figment, env_name, base_dir };
        config.validate_for_env(&config.env_name)?;
        tracing::debug!(env = %config.env_name, "configuration loaded");
        Ok(config)
    }

    pub fn env_name(&self) -> &str { &self.env_name }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed settings with paths expanded and resolved.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.catalog.metadata_path = self.resolve(&settings.catalog.metadata_path);
        settings.catalog.embeddings_path = self.resolve(&settings.catalog.embeddings_path);
        settings.model.dir = self.resolve(&settings.model.dir);
        Ok(settings)
    }

    fn resolve(&self, p: &Path) -> PathBuf {
        let s = p.to_string_lossy();
        match &self.base_dir {
            Some(base) if !base.as_os_str().is_empty() => resolve_with_base(base, s),
            _ => expand_path(s),
        }
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if settings.recommend.top_k == 0 {
            return Err(Error::InvalidConfig("recommend.top_k must be at least 1".into()).into());
        }
        if settings.model.dim == 0 {
            return Err(Error::InvalidConfig("model.dim must be at least 1".into()).into());
        }
        if settings.model.max_len == 0 || settings.model.max_len > MAX_SEQUENCE_LEN {
            return Err(Error::InvalidConfig(format!(
                "model.max_len must be between 1 and {MAX_SEQUENCE_LEN}, got {}",
                settings.model.max_len
            ))
            .into());
        }
        match env {
            "prod" | "production" if settings.model.fake => {
                return Err(Error::InvalidConfig("model.fake is not allowed in production".into()).into());
            }
            _ => {}
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
