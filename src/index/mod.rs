//! Vector Index Manager.
//!
//! Owns the nearest-neighbor index and the parallel ordered list of source
//! texts as two halves of one entity. After any completed operation the
//! text store and the index hold the same number of entries, and the i-th
//! stored text corresponds to the i-th vector ever added.


pub mod flat;
pub mod store;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::Config;
use crate::corpus;
use crate::embeddings::EmbeddingProvider;
use crate::{QaError, Result};

pub use flat::FlatIndex;
pub use store::IndexStore;

/// One retrieved passage: raw squared-L2 distance plus the stored text.
/// Distances are unnormalized; lower means more similar.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub distance: f32,
    pub text: String,
}

/// Lifecycle of the in-memory pair. Corrupt persisted state never becomes a
/// state of its own: it is detected on load and resolved by rebuilding.
#[derive(Debug)]
enum IndexState {
    Unloaded,
    Ready {
        index: FlatIndex,
        texts: Vec<String>,
    },
}

pub struct IndexManager<E> {
    embedder: E,
    store: IndexStore,
    initial_batch: PathBuf,
    min_words: usize,
    top_k: usize,
    state: IndexState,
}

impl<E: EmbeddingProvider> IndexManager<E> {
    #[inline]
    pub fn new(config: &Config, embedder: E) -> Result<Self> {
        let store = IndexStore::new(config.index_dir())?;

        Ok(Self {
            embedder,
            store,
            initial_batch: config.initial_batch_path(),
            min_words: config.corpus.min_words,
            top_k: config.retrieval.top_k,
            state: IndexState::Unloaded,
        })
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, IndexState::Ready { .. })
    }

    /// Number of indexed vectors (0 while unloaded).
    #[inline]
    pub fn len(&self) -> usize {
        match &self.state {
            IndexState::Ready { index, .. } => index.len(),
            IndexState::Unloaded => 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored texts (0 while unloaded).
    #[inline]
    pub fn text_count(&self) -> usize {
        match &self.state {
            IndexState::Ready { texts, .. } => texts.len(),
            IndexState::Unloaded => 0,
        }
    }

    /// Idempotent bootstrap. Loads the persisted pair when it is present and
    /// consistent; otherwise rebuilds by embedding either the previously
    /// cleaned text list or the cleaned initial corpus, then persists both
    /// artifacts. Corrupt persisted state is discarded, not truncated.
    #[inline]
    pub fn create(&mut self) -> Result<()> {
        match self.store.load() {
            Ok(Some((index, texts))) => {
                info!(
                    "Loaded persisted index with {} vectors and matching text store",
                    index.len()
                );
                self.state = IndexState::Ready { index, texts };
                return Ok(());
            }
            Ok(None) => {
                info!("No persisted index found, building from scratch");
            }
            Err(QaError::Consistency { texts, vectors }) => {
                warn!(
                    "Persisted state inconsistent ({} texts vs {} vectors), forcing rebuild",
                    texts, vectors
                );
            }
            Err(QaError::Storage(reason)) => {
                warn!("Persisted state unreadable ({}), forcing rebuild", reason);
            }
            Err(e) => return Err(e),
        }

        self.rebuild()
    }

    /// Append a batch of new content to the index.
    ///
    /// The batch is cleaned independently of the already-indexed corpus; no
    /// deduplication is performed across batches. Returns the number of
    /// texts actually indexed.
    #[inline]
    pub fn add(&mut self, batch: &Path) -> Result<usize> {
        if !batch.is_file() {
            return Err(QaError::NotFound(batch.to_path_buf()));
        }

        if !self.is_ready() {
            warn!("Index not initialized, bootstrapping before add");
            self.create()?;
        }

        let records = corpus::load_batch(batch)?;
        let new_texts = corpus::clean(records, self.min_words).into_texts();
        if new_texts.is_empty() {
            warn!(
                "Add batch {} contained no indexable texts",
                batch.display()
            );
            return Ok(0);
        }

        let vectors = self.embedder.embed_batch(&new_texts)?;

        let IndexState::Ready { index, texts } = &mut self.state else {
            return Err(QaError::Index("Index not initialized".to_string()));
        };

        index.add_batch(&vectors)?;
        texts.extend(new_texts);
        let added = vectors.len();

        self.store.commit(index, texts)?;
        info!("Added {} texts to index, now {} total", added, index.len());
        Ok(added)
    }

    /// Top-k nearest stored texts for a query, by ascending raw squared-L2
    /// distance. Returns fewer than k hits when the index holds fewer
    /// vectors. k is the configured `top_k`.
    #[inline]
    pub fn search(&mut self, query: &str) -> Result<Vec<SearchHit>> {
        if !self.is_ready() {
            warn!("Index not initialized, bootstrapping before search");
            self.create().map_err(|e| {
                QaError::Retrieval(format!("Index failed to initialize: {}", e))
            })?;
        }

        let IndexState::Ready { index, texts } = &self.state else {
            return Err(QaError::Retrieval("Index not initialized".to_string()));
        };

        let vector = self.embedder.embed_query(query)?;
        let neighbors = index.search(&vector, self.top_k)?;

        let mut hits = Vec::with_capacity(neighbors.len());
        for (position, distance) in neighbors {
            let text = texts.get(position).cloned().ok_or(QaError::Consistency {
                texts: texts.len(),
                vectors: index.len(),
            })?;
            hits.push(SearchHit { distance, text });
        }

        Ok(hits)
    }

    /// Delete all persisted artifacts. In-memory state is untouched; the
    /// next `create()` performs a full rebuild from the initial corpus.
    #[inline]
    pub fn reset(&self) -> Result<()> {
        self.store.clear()?;
        info!("Deleted persisted index artifacts");
        Ok(())
    }

    fn rebuild(&mut self) -> Result<()> {
        let texts = match self.store.cached_texts() {
            Ok(Some(texts)) => {
                info!("Loaded {} previously cleaned texts", texts.len());
                texts
            }
            Ok(None) => self.clean_initial_corpus()?,
            Err(e) => {
                warn!(
                    "Cached text store unreadable ({}), cleaning initial corpus",
                    e
                );
                self.clean_initial_corpus()?
            }
        };

        if texts.is_empty() {
            return Err(QaError::Ingestion(
                "Initial corpus produced no indexable texts".to_string(),
            ));
        }

        info!("Embedding {} texts for index build", texts.len());
        let vectors = self.embedder.embed_batch(&texts)?;
        let dim = vectors.first().map_or(0, Vec::len);

        let mut index = FlatIndex::new(dim)?;
        index.add_batch(&vectors)?;

        self.store.commit(&index, &texts)?;
        info!(
            "Built index with {} vectors and persisted both artifacts",
            index.len()
        );
        self.state = IndexState::Ready { index, texts };
        Ok(())
    }

    fn clean_initial_corpus(&self) -> Result<Vec<String>> {
        let records = corpus::load_batch(&self.initial_batch)?;
        Ok(corpus::clean(records, self.min_words).into_texts())
    }
}
