//! Reranker Integration Tests
//!
//! Agent and cross-encoder reranking driven through the pipeline.

use std::sync::Arc;

use agentic_rag::services::knowledge::reranker::parse_ranked_indices;
use agentic_rag::services::knowledge::{AgentReranker, Candidate, Reranker};
use agentic_rag::AppError;
use agentic_rag_llm::{LlmError, MockProvider};

use crate::support::local_pipeline;

fn doc(source: &str, content: &str) -> (String, String) {
    (source.to_string(), content.to_string())
}

fn candidates(n: usize) -> Vec<Candidate> {
    (0..n)
        .map(|i| Candidate {
            chunk_id: 100 + i,
            text: format!("candidate text {}", i),
            retrieval_score: 0.9 - i as f32 * 0.1,
        })
        .collect()
}

// ============================================================================
// Agent reply parsing
// ============================================================================

#[test]
fn test_parse_examples() {
    assert_eq!(parse_ranked_indices("2,0,3", 4, 3), vec![2, 0, 3]);
    assert_eq!(parse_ranked_indices("1, 1, 0", 2, 2), vec![1, 0]);
    assert_eq!(parse_ranked_indices("Answer: 1, 0", 2, 2), vec![0]);
    assert!(parse_ranked_indices("not,a,list", 3, 2).is_empty());
}

#[tokio::test]
async fn test_agent_fallback_keeps_retrieval_order() {
    let reranker = AgentReranker::new(Arc::new(MockProvider::with_reply("not,a,list")));
    let out = reranker.rerank("q", candidates(5), 3).await.unwrap();
    let ids: Vec<_> = out.iter().map(|c| c.chunk_id).collect();
    assert_eq!(ids, vec![100, 101, 102]);
}

#[tokio::test]
async fn test_agent_partial_reply_is_not_padded() {
    let reranker = AgentReranker::new(Arc::new(MockProvider::with_reply("4")));
    let out = reranker.rerank("q", candidates(5), 3).await.unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].chunk_id, 104);
}

#[tokio::test]
async fn test_agent_prompt_carries_query_and_candidates() {
    let provider = Arc::new(MockProvider::with_reply("0"));
    let reranker = AgentReranker::new(provider.clone());
    reranker
        .rerank("which candidate?", candidates(2), 1)
        .await
        .unwrap();

    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].system.contains("comma-separated indexes"));
    assert!(calls[0].prompt.contains("which candidate?"));
    assert!(calls[0].prompt.contains("[1] retrieval_score=0.8000\ncandidate text 1"));
}

// ============================================================================
// Through the pipeline
// ============================================================================

#[tokio::test]
async fn test_pipeline_agent_reorders_results() {
    let provider = Arc::new(MockProvider::with_reply("2,1,0"));
    let pipeline =
        local_pipeline().with_agent_reranker(Arc::new(AgentReranker::new(provider.clone())));
    pipeline
        .ingest_documents(vec![
            doc("a", "alpha alpha alpha"),
            doc("b", "alpha and beta"),
            doc("c", "gamma only"),
        ])
        .await
        .unwrap();

    let numeric = pipeline.query("alpha", 3, false).await.unwrap();
    assert_eq!(numeric.len(), 3);
    assert_eq!(numeric[2].source, "c");
    assert!(provider.calls().is_empty());

    // Coarse order is a, b, c; the agent reverses it
    let agent = pipeline.query("alpha", 3, true).await.unwrap();
    let sources: Vec<_> = agent.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(sources, vec!["c", "b", "a"]);
    assert_eq!(provider.calls().len(), 1);
}

#[tokio::test]
async fn test_pipeline_agent_failure_is_rerank_error() {
    let provider = MockProvider::failing(LlmError::NetworkError {
        message: "unreachable".to_string(),
    });
    let pipeline =
        local_pipeline().with_agent_reranker(Arc::new(AgentReranker::new(Arc::new(provider))));
    pipeline
        .ingest_documents(vec![doc("a", "alpha")])
        .await
        .unwrap();

    let err = pipeline.query("alpha", 1, true).await.unwrap_err();
    assert!(matches!(err, AppError::RerankUnavailable(_)));

    // The numeric path is unaffected
    assert_eq!(pipeline.query("alpha", 1, false).await.unwrap().len(), 1);
}
