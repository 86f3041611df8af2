//! Relevance filtering and prompt composition.
//!
//! Decides, from ranked search hits, which retrieved passages are
//! trustworthy enough to ground the answer, and renders the final prompt.
//! This is a hard near/far cutoff, not a soft re-ranking: a hit survives
//! only when it is both under the absolute threshold and within the margin
//! of the best hit.


use tracing::debug;

use crate::config::RetrievalConfig;
use crate::index::SearchHit;

/// Fixed marker the fallback prompt instructs the generator to open with.
pub const ANSWER_MARKER: &str = "Answer:";

/// Finished generator input. Either grounded in accepted context or the
/// explicit no-information fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Grounded { query: String, context: String },
    Fallback { query: String },
}

impl Prompt {
    #[inline]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Prompt::Fallback { .. })
    }

    /// Render the final string consumed by the generation model.
    #[inline]
    pub fn render(&self) -> String {
        match self {
            Prompt::Fallback { query } => format!(
                "Question: {query}\n\
                 \n\
                 Instructions:\n\
                 1. State that the knowledge base holds no information on this question.\n\
                 2. Be as precise and concise as possible.\n\
                 3. Keep the reply clear and friendly.\n\
                 4. Acceptable replies:\n\
                 \x20  \"I could not find information on your request in the available sources.\"\n\
                 \x20  \"Try rephrasing the question or consulting other materials.\"\n\
                 5. Do not offer guesses or approximate answers of your own.\n\
                 6. Do not repeat any part of these instructions in the reply.\n\
                 7. Begin the reply with the word {ANSWER_MARKER}\n"
            ),
            Prompt::Grounded { query, context } => format!(
                "Question: {query}\n\
                 \n\
                 Context:\n\
                 {context}\n\
                 \n\
                 Instructions:\n\
                 1. Answer using only information from the context.\n\
                 2. The first paragraph of the context is the most authoritative.\n\
                 3. Be as precise and concise as possible.\n\
                 4. Keep the reply clear and friendly.\n\
                 5. Do not offer guesses or approximate answers of your own.\n"
            ),
        }
    }
}

/// Apply the two-stage acceptance policy and compose the prompt.
///
/// Stage A: when there are no hits, or even the best distance exceeds the
/// threshold, no relevant evidence exists and the fallback prompt is
/// composed. Stage B: otherwise each hit is kept iff its distance is within
/// the threshold and within the configured margin of the best distance
/// (both comparisons inclusive), in ranked order.
#[inline]
pub fn compose(query: &str, hits: &[SearchHit], policy: &RetrievalConfig) -> Prompt {
    let best = hits
        .iter()
        .map(|h| h.distance)
        .fold(f32::INFINITY, f32::min);

    if hits.is_empty() || best > policy.threshold {
        debug!(
            "No relevant evidence (best distance {best}, threshold {}), composing fallback",
            policy.threshold
        );
        return Prompt::Fallback {
            query: query.to_string(),
        };
    }

    let accepted: Vec<&str> = hits
        .iter()
        .filter(|h| {
            h.distance <= policy.threshold
                && h.distance - best <= policy.distance_diff_vector
        })
        .map(|h| h.text.as_str())
        .collect();

    debug!(
        "Accepted {} of {} hits for grounding context",
        accepted.len(),
        hits.len()
    );

    Prompt::Grounded {
        query: query.to_string(),
        context: accepted.join("\n\n"),
    }
}
