#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! End-to-end pipeline tests over the embedding-provider seam.
//!
//! These tests run the full build/add/search/answer flow against a
//! deterministic in-process embedder, so they exercise persistence and
//! recovery without a live model server.

use std::path::Path;

use corpus_qa::QaError;
use corpus_qa::answer::AnswerService;
use corpus_qa::config::Config;
use corpus_qa::embeddings::EmbeddingProvider;
use corpus_qa::generation::Generator;
use corpus_qa::index::{IndexManager, IndexStore};
use corpus_qa::prompt::ANSWER_MARKER;
use tempfile::TempDir;

/// Deterministic stand-in for the embedding model: same text, same vector.
struct HashEmbedder;

fn vector_for(text: &str) -> Vec<f32> {
    let bytes = text.as_bytes();
    let sum: u32 = bytes.iter().map(|&b| u32::from(b)).sum();
    vec![
        bytes.len() as f32,
        f32::from(bytes.first().copied().unwrap_or(0)),
        f32::from(bytes.last().copied().unwrap_or(0)),
        (sum % 97) as f32,
    ]
}

impl EmbeddingProvider for HashEmbedder {
    fn embed_query(&self, text: &str) -> corpus_qa::Result<Vec<f32>> {
        Ok(vector_for(text))
    }

    fn embed_batch(&self, texts: &[String]) -> corpus_qa::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| vector_for(t)).collect())
    }
}

struct EchoGenerator;

impl Generator for EchoGenerator {
    fn generate(&self, prompt: &str) -> corpus_qa::Result<String> {
        Ok(prompt.to_string())
    }
}

const CORPUS: &[&str] = &[
    "solar panels convert sunlight into electricity",
    "wind turbines harvest kinetic energy from moving air",
    "hydroelectric dams store energy as elevated water",
];

fn write_batch(path: &Path, texts: &[&str]) {
    let rows: Vec<serde_json::Value> = texts
        .iter()
        .enumerate()
        .map(|(i, t)| {
            serde_json::json!({"uid": format!("{}-{}", path.display(), i), "page": "p", "text": t})
        })
        .collect();
    std::fs::create_dir_all(path.parent().expect("batch path has parent"))
        .expect("should create data dir");
    std::fs::write(path, serde_json::to_vec(&rows).expect("rows serialize"))
        .expect("should write batch");
}

fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::load(dir.path()).expect("defaults should load");
    config.corpus.min_words = 1;
    config.retrieval.top_k = 3;
    config.retrieval.threshold = 1e9;
    config.retrieval.distance_diff_vector = 1e9;
    config
}

#[test]
fn build_persist_reload_search_round_trip() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&dir);
    write_batch(&config.initial_batch_path(), CORPUS);

    let mut manager = IndexManager::new(&config, HashEmbedder).expect("manager should build");
    manager.create().expect("create should succeed");
    assert_eq!(manager.len(), 3);
    drop(manager);

    // A new process loads the persisted pair and serves the same corpus.
    let mut reloaded = IndexManager::new(&config, HashEmbedder).expect("manager should build");
    let hits = reloaded.search(CORPUS[0]).expect("search should succeed");

    assert_eq!(hits[0].text, CORPUS[0]);
    assert!(hits[0].distance.abs() < 1e-6);
}

#[test]
fn add_survives_restart_and_preserves_order() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&dir);
    write_batch(&config.initial_batch_path(), CORPUS);

    let mut manager = IndexManager::new(&config, HashEmbedder).expect("manager should build");
    manager.create().expect("create should succeed");

    let batch = config.data_dir().join("added.json");
    write_batch(&batch, &["geothermal plants tap heat from deep rock"]);
    manager.add(&batch).expect("add should succeed");
    assert_eq!(manager.len(), 4);
    assert_eq!(manager.text_count(), 4);
    drop(manager);

    let mut reloaded = IndexManager::new(&config, HashEmbedder).expect("manager should build");
    let hits = reloaded
        .search("geothermal plants tap heat from deep rock")
        .expect("search should succeed");

    assert_eq!(reloaded.len(), 4);
    assert_eq!(hits[0].text, "geothermal plants tap heat from deep rock");
    assert!(hits[0].distance.abs() < 1e-6);
}

#[test]
fn reset_forces_full_rebuild_from_initial_corpus() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&dir);
    write_batch(&config.initial_batch_path(), CORPUS);

    let mut manager = IndexManager::new(&config, HashEmbedder).expect("manager should build");
    manager.create().expect("create should succeed");

    let batch = config.data_dir().join("added.json");
    write_batch(&batch, &["geothermal plants tap heat from deep rock"]);
    manager.add(&batch).expect("add should succeed");

    manager.reset().expect("reset should succeed");
    let store = IndexStore::new(config.index_dir()).expect("store should build");
    assert!(!store.has_artifacts());

    // After reset the added batch is gone: full rebuild from the initial corpus.
    let mut rebuilt = IndexManager::new(&config, HashEmbedder).expect("manager should build");
    rebuilt.create().expect("create should rebuild");
    assert_eq!(rebuilt.len(), 3);
}

#[test]
fn answer_path_grounded_and_fallback() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&dir);
    write_batch(&config.initial_batch_path(), CORPUS);

    let mut service =
        AnswerService::new(&config, HashEmbedder, EchoGenerator).expect("service should build");
    let grounded = service.answer(CORPUS[1]).expect("answer should succeed");
    assert!(grounded.answer.contains("Context:"));
    assert!(grounded.answer.contains(CORPUS[1]));
    assert_eq!(grounded.evidence.len(), 3);

    // Tight threshold: nothing is trustworthy, the fallback form is used.
    let mut strict = test_config(&dir);
    strict.retrieval.threshold = 1e-3;
    let mut service =
        AnswerService::new(&strict, HashEmbedder, EchoGenerator).expect("service should build");
    let fallback = service
        .answer("a question about something else entirely")
        .expect("answer should succeed");
    assert!(fallback.answer.contains(ANSWER_MARKER));
    assert!(!fallback.answer.contains("Context:"));
}

#[test]
fn missing_add_source_fails_before_bootstrap() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&dir);
    write_batch(&config.initial_batch_path(), CORPUS);

    let mut manager = IndexManager::new(&config, HashEmbedder).expect("manager should build");
    let result = manager.add(Path::new("/nonexistent/batch.json"));

    assert!(matches!(result, Err(QaError::NotFound(_))));
    let store = IndexStore::new(config.index_dir()).expect("store should build");
    assert!(!store.has_artifacts());
}
