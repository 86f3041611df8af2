use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::answer::AnswerService;
use crate::config::Config;
use crate::embeddings::OllamaEmbedder;
use crate::generation::OllamaGenerator;
use crate::index::{IndexManager, IndexStore, SearchHit};

/// Bootstrap the index from persisted state or the initial corpus.
#[inline]
pub fn build(config: &Config) -> Result<()> {
    info!("Building index in {}", config.index_dir().display());

    let embedder =
        OllamaEmbedder::new(config).context("Failed to initialize embedding client")?;
    let mut manager = IndexManager::new(config, embedder)?;
    manager.create()?;

    println!("Index ready: {} texts indexed", manager.len());
    Ok(())
}

/// Append the texts of a batch file to the index.
#[inline]
pub fn add(config: &Config, source: &Path) -> Result<()> {
    info!("Adding batch {} to index", source.display());

    let embedder =
        OllamaEmbedder::new(config).context("Failed to initialize embedding client")?;
    let mut manager = IndexManager::new(config, embedder)?;
    let added = manager.add(source)?;

    println!("Added {} texts from {}", added, source.display());
    println!("Index now holds {} texts", manager.len());
    Ok(())
}

/// Print the nearest stored texts for a query.
#[inline]
pub fn search(config: &Config, query: &str) -> Result<()> {
    let embedder =
        OllamaEmbedder::new(config).context("Failed to initialize embedding client")?;
    let mut manager = IndexManager::new(config, embedder)?;
    let hits = manager.search(query)?;

    if hits.is_empty() {
        println!("The index holds no texts.");
        return Ok(());
    }

    println!("Top {} results (squared L2 distance, lower is closer):", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        println!("{:>2}. [{:.4}] {}", i + 1, hit.distance, preview(hit));
    }
    Ok(())
}

/// Answer a question grounded in the indexed corpus.
#[inline]
pub fn ask(config: &Config, query: &str) -> Result<()> {
    let embedder =
        OllamaEmbedder::new(config).context("Failed to initialize embedding client")?;
    let generator =
        OllamaGenerator::new(config).context("Failed to initialize generation client")?;
    let mut service = AnswerService::new(config, embedder, generator)?;

    let answer = service.answer(query)?;

    println!("{}", answer.answer.trim());
    println!();
    println!("Evidence ({} hits):", answer.evidence.len());
    for hit in &answer.evidence {
        println!("  [{:.4}] {}", hit.distance, preview(hit));
    }
    Ok(())
}

/// Delete all persisted index artifacts.
#[inline]
pub fn reset(config: &Config) -> Result<()> {
    let store = IndexStore::new(config.index_dir())?;
    store.clear()?;

    println!(
        "Deleted persisted index artifacts from {}",
        config.index_dir().display()
    );
    println!("The next build will be a full rebuild from the initial corpus.");
    Ok(())
}

/// Report on the persisted artifacts and the Ollama server.
#[inline]
pub fn status(config: &Config) -> Result<()> {
    let store = IndexStore::new(config.index_dir())?;
    match store.load() {
        Ok(Some((index, texts))) => {
            println!(
                "Persisted index: {} vectors / {} texts (dimension {})",
                index.len(),
                texts.len(),
                index.dim()
            );
        }
        Ok(None) => {
            println!("No persisted index; the next build starts from the initial corpus.");
        }
        Err(e) => {
            println!("Persisted state unusable ({e}); the next build will rebuild.");
        }
    }

    let embedder =
        OllamaEmbedder::new(config).context("Failed to initialize embedding client")?;
    match embedder.health_check() {
        Ok(()) => println!(
            "Ollama: reachable, embedding model {} available",
            config.ollama.embedding_model
        ),
        Err(e) => println!("Ollama: unavailable ({e:#})"),
    }

    Ok(())
}

/// Print the effective configuration as TOML.
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    println!("# {}", config.config_file_path().display());
    print!(
        "{}",
        toml::to_string_pretty(config).context("Failed to serialize config")?
    );
    Ok(())
}

/// Write a default config file when none exists yet.
#[inline]
pub fn init_config(config: &Config) -> Result<()> {
    let path = config.config_file_path();
    if path.exists() {
        println!("Config already exists at {}", path.display());
    } else {
        config.save()?;
        println!("Wrote default config to {}", path.display());
    }
    Ok(())
}

fn preview(hit: &SearchHit) -> String {
    const MAX_CHARS: usize = 100;
    let mut out: String = hit.text.chars().take(MAX_CHARS).collect();
    if hit.text.chars().count() > MAX_CHARS {
        out.push('…');
    }
    out
}
