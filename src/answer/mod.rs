//! Answer orchestration: retrieve, filter, generate.


use tracing::info;

use crate::Result;
use crate::config::{Config, RetrievalConfig};
use crate::embeddings::EmbeddingProvider;
use crate::generation::Generator;
use crate::index::{IndexManager, SearchHit};
use crate::prompt;

/// Final product of the answer path: the generated text plus the raw search
/// hits kept as auditable evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub query: String,
    pub answer: String,
    pub evidence: Vec<SearchHit>,
}

pub struct AnswerService<E, G> {
    manager: IndexManager<E>,
    generator: G,
    policy: RetrievalConfig,
}

impl<E: EmbeddingProvider, G: Generator> AnswerService<E, G> {
    #[inline]
    pub fn new(config: &Config, embedder: E, generator: G) -> Result<Self> {
        Ok(Self {
            manager: IndexManager::new(config, embedder)?,
            generator,
            policy: config.retrieval.clone(),
        })
    }

    /// Answer a query from the indexed corpus. Retrieval failures and
    /// generation failures propagate unchanged; nothing is retried.
    #[inline]
    pub fn answer(&mut self, query: &str) -> Result<Answer> {
        let hits = self.manager.search(query)?;

        let prompt = prompt::compose(query, &hits, &self.policy);
        if prompt.is_fallback() {
            info!("No trustworthy evidence for query, using fallback prompt");
        }

        let answer = self.generator.generate(&prompt.render())?;

        Ok(Answer {
            query: query.to_string(),
            answer,
            evidence: hits,
        })
    }
}
