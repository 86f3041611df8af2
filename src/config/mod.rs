
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::generation::GenerationParams;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub generation: GenerationParams,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub embedding_model: String,
    pub generation_model: String,
    /// Number of texts embedded per request to the embedding endpoint.
    pub batch_size: usize,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            embedding_model: "nomic-embed-text:latest".to_string(),
            generation_model: "llama3.1:8b".to_string(),
            batch_size: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of nearest neighbors fetched per query.
    pub top_k: usize,
    /// Maximum squared-L2 distance for a hit to count as relevant at all.
    /// Raw model-scale distance; lower is more similar.
    pub threshold: f32,
    /// Maximum allowed gap between a hit's distance and the best hit's
    /// distance for the hit to be kept alongside the best match.
    pub distance_diff_vector: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            threshold: 1.2,
            distance_diff_vector: 0.35,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CorpusConfig {
    /// Minimum word count for a text to be indexed.
    pub min_words: usize,
    /// File name of the initial corpus batch, resolved against `data_dir()`.
    pub initial_batch: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            min_words: 20,
            initial_batch: "corpus.json".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid model name: {0:?} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(usize),
    #[error("Invalid top_k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Invalid threshold: {0} (must be a finite value greater than 0)")]
    InvalidThreshold(f32),
    #[error("Invalid distance_diff_vector: {0} (must be a finite value of at least 0)")]
    InvalidDistanceDiff(f32),
    #[error("Invalid min_words: {0} (must be at least 1)")]
    InvalidMinWords(usize),
    #[error("Invalid initial batch name: {0:?} (cannot be empty)")]
    InvalidInitialBatch(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Default base directory when none is given on the command line.
pub fn default_base_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".corpus-qa"))
}

impl Config {
    /// Load configuration from `<base_dir>/config.toml`, falling back to
    /// defaults when no file exists yet.
    #[inline]
    pub fn load<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config_path = base_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                ollama: OllamaConfig::default(),
                retrieval: RetrievalConfig::default(),
                corpus: CorpusConfig::default(),
                generation: GenerationParams::default(),
                base_dir: base_dir.as_ref().to_path_buf(),
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = base_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.retrieval.validate()?;
        self.corpus.validate()?;
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    /// Directory holding ingestion batches.
    #[inline]
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Directory holding the persisted index and text-store artifacts.
    #[inline]
    pub fn index_dir(&self) -> PathBuf {
        self.base_dir.join("index")
    }

    /// Path of the initial corpus batch used for index bootstrap.
    #[inline]
    pub fn initial_batch_path(&self) -> PathBuf {
        self.data_dir().join(&self.corpus.initial_batch)
    }
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }

        if self.generation_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.generation_model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        Ok(())
    }

    pub fn url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 || self.top_k > 100 {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }

        if !self.distance_diff_vector.is_finite() || self.distance_diff_vector < 0.0 {
            return Err(ConfigError::InvalidDistanceDiff(self.distance_diff_vector));
        }

        Ok(())
    }
}

impl CorpusConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_words == 0 {
            return Err(ConfigError::InvalidMinWords(self.min_words));
        }

        if self.initial_batch.trim().is_empty() {
            return Err(ConfigError::InvalidInitialBatch(self.initial_batch.clone()));
        }

        Ok(())
    }
}
