//! Reranker
//!
//! Reorders coarse retrieval candidates by relevance to the query.
//!
//! - `CrossEncoderReranker`: sorts by a `RelevanceScorer`'s pairwise scores
//! - `AgentReranker`: asks an `LlmProvider` for an ordering and parses it,
//!   falling back to retrieval order when the reply is unusable

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use agentic_rag_llm::LlmProvider;

use crate::services::knowledge::scorer::RelevanceScorer;
use crate::utils::error::{AppError, AppResult};

const AGENT_SYSTEM_PROMPT: &str =
    "You are a retrieval reranking agent. Respond only with comma-separated indexes such as: 2,0,3";

/// A retrieved chunk awaiting reranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub chunk_id: usize,
    pub text: String,
    /// Inner product from coarse retrieval
    pub retrieval_score: f32,
}

/// Trait for reranking candidates.
///
/// Implementations return at most `min(top_k, candidates.len())` items,
/// best first. Empty input or `top_k == 0` yields an empty result without
/// touching any backend.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        top_k: usize,
    ) -> AppResult<Vec<Candidate>>;

    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// CrossEncoderReranker
// ---------------------------------------------------------------------------

pub struct CrossEncoderReranker {
    scorer: Arc<dyn RelevanceScorer>,
}

impl CrossEncoderReranker {
    pub fn new(scorer: Arc<dyn RelevanceScorer>) -> Self {
        Self { scorer }
    }
}

#[async_trait]
impl Reranker for CrossEncoderReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        top_k: usize,
    ) -> AppResult<Vec<Candidate>> {
        if candidates.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let passages: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        let scores = self
            .scorer
            .score(query, &passages)
            .await
            .map_err(|e| match e {
                AppError::RerankUnavailable(_) => e,
                other => AppError::rerank(other.to_string()),
            })?;

        if scores.len() != candidates.len() {
            return Err(AppError::rerank(format!(
                "{} returned {} scores for {} candidates",
                self.scorer.name(),
                scores.len(),
                candidates.len()
            )));
        }

        let mut scored: Vec<(Candidate, f32)> = candidates.into_iter().zip(scores).collect();
        // Stable: equal scores keep retrieval order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored.into_iter().map(|(c, _)| c).collect())
    }

    fn name(&self) -> &str {
        "cross_encoder"
    }
}

// ---------------------------------------------------------------------------
// AgentReranker
// ---------------------------------------------------------------------------

pub struct AgentReranker {
    provider: Arc<dyn LlmProvider>,
}

impl AgentReranker {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub fn build_prompt(query: &str, candidates: &[Candidate], top_k: usize) -> String {
        let listing = candidates
            .iter()
            .enumerate()
            .map(|(idx, c)| format!("[{}] retrieval_score={:.4}\n{}", idx, c.retrieval_score, c.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "Rank the candidate chunks for relevance to the query. Return only comma-separated \
             indexes of the best {} chunks in descending order.\n\nQuery:\n{}\n\nCandidates:\n{}",
            top_k, query, listing
        )
    }
}

/// Indices chosen by the agent, in its order.
///
/// Tokens are split on commas and trimmed; anything that is not a plain
/// ASCII number, or is out of range, is skipped. Repeats keep their first
/// position. Stops once `top_k` indices are collected. May be empty.
pub fn parse_ranked_indices(reply: &str, candidate_count: usize, top_k: usize) -> Vec<usize> {
    let mut chosen: Vec<usize> = Vec::new();

    for token in reply.split(',') {
        if chosen.len() >= top_k {
            break;
        }
        let token = token.trim();
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        // Overflowing numbers are out of range too
        let Ok(idx) = token.parse::<usize>() else {
            continue;
        };
        if idx < candidate_count && !chosen.contains(&idx) {
            chosen.push(idx);
        }
    }

    chosen
}

#[async_trait]
impl Reranker for AgentReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        top_k: usize,
    ) -> AppResult<Vec<Candidate>> {
        if candidates.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let prompt = Self::build_prompt(query, &candidates, top_k);
        let reply = self
            .provider
            .generate(AGENT_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| AppError::rerank(format!("{}: {}", self.provider.name(), e)))?;

        let indices = parse_ranked_indices(&reply, candidates.len(), top_k);
        if indices.is_empty() {
            tracing::warn!(
                provider = self.provider.name(),
                reply = %reply.chars().take(200).collect::<String>(),
                "agent reply had no usable indexes, keeping retrieval order"
            );
            let mut fallback = candidates;
            fallback.truncate(top_k);
            return Ok(fallback);
        }

        tracing::debug!(?indices, "agent reranked candidates");
        Ok(indices
            .into_iter()
            .map(|idx| candidates[idx].clone())
            .collect())
    }

    fn name(&self) -> &str {
        "agent"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::knowledge::scorer::LexicalScorer;
    use agentic_rag_llm::{LlmError, MockProvider};

    fn candidates(texts: &[&str]) -> Vec<Candidate> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Candidate {
                chunk_id: i * 10,
                text: t.to_string(),
                retrieval_score: 1.0 - i as f32 * 0.1,
            })
            .collect()
    }

    fn ids(cands: &[Candidate]) -> Vec<usize> {
        cands.iter().map(|c| c.chunk_id).collect()
    }

    /// Returns fixed scores regardless of input.
    struct FixedScorer(Vec<f32>);

    #[async_trait]
    impl RelevanceScorer for FixedScorer {
        async fn score(&self, _query: &str, _passages: &[&str]) -> AppResult<Vec<f32>> {
            Ok(self.0.clone())
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    // ======================================================================
    // Index parsing
    // ======================================================================

    #[test]
    fn parse_plain_list() {
        assert_eq!(parse_ranked_indices("2,0,3", 5, 5), vec![2, 0, 3]);
    }

    #[test]
    fn parse_ignores_noise_duplicates_and_out_of_range() {
        assert_eq!(parse_ranked_indices(" 2 , x, 9, 2, 1 ", 3, 5), vec![2, 1]);
        assert_eq!(parse_ranked_indices("-1,+2,1.5,0", 3, 5), vec![0]);
    }

    #[test]
    fn parse_stops_at_top_k() {
        assert_eq!(parse_ranked_indices("3,2,1,0", 4, 2), vec![3, 2]);
    }

    #[test]
    fn parse_garbage_is_empty() {
        assert!(parse_ranked_indices("not,a,list", 3, 2).is_empty());
        assert!(parse_ranked_indices("", 3, 2).is_empty());
        assert!(parse_ranked_indices("99999999999999999999999", 3, 2).is_empty());
    }

    #[test]
    fn prompt_lists_candidates_with_scores() {
        let prompt = AgentReranker::build_prompt("what?", &candidates(&["first", "second"]), 2);
        assert!(prompt.contains("best 2 chunks"));
        assert!(prompt.contains("Query:\nwhat?"));
        assert!(prompt.contains("[0] retrieval_score=1.0000\nfirst"));
        assert!(prompt.contains("[1] retrieval_score=0.9000\nsecond"));
    }

    // ======================================================================
    // CrossEncoderReranker
    // ======================================================================

    #[tokio::test]
    async fn cross_encoder_sorts_by_score() {
        let reranker = CrossEncoderReranker::new(Arc::new(FixedScorer(vec![0.1, 0.9, 0.5])));
        let out = reranker
            .rerank("q", candidates(&["a", "b", "c"]), 2)
            .await
            .unwrap();
        assert_eq!(ids(&out), vec![10, 20]);
    }

    #[tokio::test]
    async fn cross_encoder_ties_keep_retrieval_order() {
        let reranker = CrossEncoderReranker::new(Arc::new(FixedScorer(vec![0.5, 0.5, 0.5])));
        let out = reranker
            .rerank("q", candidates(&["a", "b", "c"]), 3)
            .await
            .unwrap();
        assert_eq!(ids(&out), vec![0, 10, 20]);
    }

    #[tokio::test]
    async fn cross_encoder_empty_input() {
        let reranker = CrossEncoderReranker::new(Arc::new(LexicalScorer));
        assert!(reranker.rerank("q", Vec::new(), 5).await.unwrap().is_empty());
        assert!(reranker
            .rerank("q", candidates(&["a"]), 0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn cross_encoder_wrong_score_count_fails() {
        let reranker = CrossEncoderReranker::new(Arc::new(FixedScorer(vec![0.5])));
        let err = reranker
            .rerank("q", candidates(&["a", "b"]), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RerankUnavailable(_)));
    }

    #[tokio::test]
    async fn cross_encoder_with_lexical_scorer() {
        let reranker = CrossEncoderReranker::new(Arc::new(LexicalScorer));
        let out = reranker
            .rerank(
                "Rust programming language",
                candidates(&[
                    "The weather is nice today",
                    "Rust ownership model prevents bugs",
                    "Rust programming language is fast",
                ]),
                1,
            )
            .await
            .unwrap();
        assert_eq!(out[0].text, "Rust programming language is fast");
    }

    // ======================================================================
    // AgentReranker
    // ======================================================================

    #[tokio::test]
    async fn agent_follows_reply_order() {
        let provider = Arc::new(MockProvider::with_reply("2, 0"));
        let reranker = AgentReranker::new(provider.clone());
        let out = reranker
            .rerank("q", candidates(&["a", "b", "c"]), 2)
            .await
            .unwrap();
        assert_eq!(ids(&out), vec![20, 0]);

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system, AGENT_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn agent_falls_back_on_unparseable_reply() {
        let reranker = AgentReranker::new(Arc::new(MockProvider::with_reply("not,a,list")));
        let out = reranker
            .rerank("q", candidates(&["a", "b", "c"]), 2)
            .await
            .unwrap();
        assert_eq!(ids(&out), vec![0, 10]);
    }

    #[tokio::test]
    async fn agent_never_calls_backend_for_empty_input() {
        let provider = Arc::new(MockProvider::with_reply("0"));
        let reranker = AgentReranker::new(provider.clone());
        assert!(reranker.rerank("q", Vec::new(), 3).await.unwrap().is_empty());
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn agent_backend_failure_is_rerank_error() {
        let reranker = AgentReranker::new(Arc::new(MockProvider::failing(
            LlmError::NetworkError {
                message: "down".to_string(),
            },
        )));
        let err = reranker
            .rerank("q", candidates(&["a"]), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RerankUnavailable(_)));
    }
}
