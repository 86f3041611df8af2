// Embeddings module
// Text -> fixed-dimension vector, consumed as a black-box function

pub mod ollama;

pub use ollama::OllamaEmbedder;

use crate::Result;

/// Produces fixed-dimension vectors for texts.
/// Deterministic for a fixed model version.
pub trait EmbeddingProvider {
    /// Embed a single query text.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a list of texts, one vector per input, in input order.
    /// Providers apply their configured batch size internally.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
