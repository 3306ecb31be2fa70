//! Retrieval Pipeline Integration Tests

use std::fs;
use std::sync::Arc;

use agentic_rag::models::knowledge::{IngestStats, QueryRequest};
use agentic_rag::services::embedding::HashingEmbeddingProvider;
use agentic_rag::{AppConfig, AppError, RetrievalPipeline};
use agentic_rag_llm::MockProvider;

use crate::support::{
    lexical_reranker, local_pipeline, recording_factory, small_settings, ShapeShiftingEmbedder,
    UnavailableEmbedder,
};

fn doc(source: &str, content: &str) -> (String, String) {
    (source.to_string(), content.to_string())
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn test_alpha_beta_files_numeric_reranker() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, "alpha document about the first letter").unwrap();
    fs::write(&b, "beta document about the second letter").unwrap();

    let mut config = AppConfig::default();
    config.rag.enable_agent_reranker = false;
    let pipeline = RetrievalPipeline::from_config(&config, None).unwrap();

    let stats = pipeline.ingest_paths(&[a.clone(), b]).await.unwrap();
    assert_eq!(stats.documents, 2);
    assert_eq!(stats.chunks, 2);

    let results = pipeline.query("alpha", 1, false).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].source, a.display().to_string());
    assert!(results[0].text.contains("alpha"));
}

#[tokio::test]
async fn test_handle_query_echoes_query() {
    let pipeline = local_pipeline();
    pipeline
        .ingest_documents(vec![doc("notes", "tokio runtime and async tasks")])
        .await
        .unwrap();

    let response = pipeline
        .handle_query(QueryRequest::new("tokio tasks", 3))
        .await
        .unwrap();
    assert_eq!(response.query, "tokio tasks");
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].source, "notes");
}

#[tokio::test]
async fn test_result_length_bounded_by_index_and_top_k() {
    let pipeline = local_pipeline();
    pipeline
        .ingest_documents(vec![doc("one", "first"), doc("two", "second")])
        .await
        .unwrap();

    assert_eq!(pipeline.query("first", 10, false).await.unwrap().len(), 2);
    assert_eq!(pipeline.query("first", 1, false).await.unwrap().len(), 1);
    assert!(pipeline.query("first", 0, false).await.unwrap().is_empty());
}

// ============================================================================
// Chunk identity
// ============================================================================

#[tokio::test]
async fn test_chunk_ids_stable_across_ingestions() {
    let pipeline = local_pipeline();
    let long_text = "lorem ipsum dolor sit amet ".repeat(20);
    pipeline
        .ingest_documents(vec![doc("long", &long_text)])
        .await
        .unwrap();

    let before = pipeline.indexed_chunks().await;
    assert!(before > 1);
    let snapshot: Vec<_> = {
        let mut records = Vec::new();
        for id in 0..before {
            records.push(pipeline.get_chunk(id).await.unwrap());
        }
        records
    };

    pipeline
        .ingest_documents(vec![doc("later", "a later document")])
        .await
        .unwrap();

    for (id, record) in snapshot.iter().enumerate() {
        assert_eq!(record.chunk_id, id);
        assert_eq!(pipeline.get_chunk(id).await.as_ref(), Some(record));
    }
    let newest = pipeline.get_chunk(before).await.unwrap();
    assert_eq!(newest.source, "later");
    assert!(pipeline.get_chunk(before + 1).await.is_none());
}

#[tokio::test]
async fn test_concurrent_ingests_keep_registry_consistent() {
    let pipeline = Arc::new(local_pipeline());

    let mut handles = Vec::new();
    for i in 0..8 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            pipeline
                .ingest_documents(vec![(format!("doc-{}", i), format!("content number {}", i))])
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(pipeline.indexed_chunks().await, 8);
    let mut sources = Vec::new();
    for id in 0..8 {
        let record = pipeline.get_chunk(id).await.unwrap();
        assert_eq!(record.chunk_id, id);
        sources.push(record.source);
    }
    sources.sort();
    sources.dedup();
    assert_eq!(sources.len(), 8);
}

// ============================================================================
// Over-fetch
// ============================================================================

#[tokio::test]
async fn test_coarse_retrieval_overfetches() {
    let (factory, requested) = recording_factory();
    let pipeline = local_pipeline().with_index_factory(factory);
    let docs = (0..10)
        .map(|i| doc(&format!("d{}", i), &format!("shared words plus item {}", i)))
        .collect();
    pipeline.ingest_documents(docs).await.unwrap();

    let results = pipeline.query("shared words", 2, false).await.unwrap();
    assert_eq!(results.len(), 2);

    let asked = requested.lock().unwrap().clone();
    assert_eq!(asked.len(), 1);
    assert!(asked[0] >= 6, "coarse retrieval asked for {}", asked[0]);
}

#[tokio::test]
async fn test_overfetch_factor_one_fetches_top_k() {
    let (factory, requested) = recording_factory();
    let mut settings = small_settings();
    settings.overfetch_factor = 1;
    let pipeline = RetrievalPipeline::new(
        Arc::new(HashingEmbeddingProvider::new(32).unwrap()),
        lexical_reranker(),
        settings,
    )
    .unwrap()
    .with_index_factory(factory);

    pipeline
        .ingest_documents(vec![doc("a", "alpha"), doc("b", "beta")])
        .await
        .unwrap();
    pipeline.query("alpha", 2, false).await.unwrap();
    assert_eq!(requested.lock().unwrap().as_slice(), &[2]);
}

// ============================================================================
// Atomic ingestion
// ============================================================================

#[tokio::test]
async fn test_dimension_mismatch_within_call_commits_nothing() {
    let pipeline =
        RetrievalPipeline::new(Arc::new(ShapeShiftingEmbedder), lexical_reranker(), small_settings())
            .unwrap();

    let err = pipeline
        .ingest_documents(vec![doc("narrow", "narrow text"), doc("wide", "wide text")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::DimensionMismatch {
            expected: 4,
            actual: 5
        }
    ));
    assert_eq!(pipeline.indexed_chunks().await, 0);
    assert_eq!(pipeline.dimension().await, None);

    let stats = pipeline
        .ingest_documents(vec![doc("narrow", "narrow text")])
        .await
        .unwrap();
    assert_eq!(
        stats,
        IngestStats {
            documents: 1,
            chunks: 1,
            index_size: 1
        }
    );
    assert_eq!(pipeline.dimension().await, Some(4));
}

#[tokio::test]
async fn test_dimension_fixed_by_first_commit() {
    let pipeline =
        RetrievalPipeline::new(Arc::new(ShapeShiftingEmbedder), lexical_reranker(), small_settings())
            .unwrap();
    pipeline
        .ingest_documents(vec![doc("narrow", "narrow text")])
        .await
        .unwrap();

    let err = pipeline
        .ingest_documents(vec![doc("wide", "wide text")])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DimensionMismatch { .. }));
    assert_eq!(pipeline.indexed_chunks().await, 1);
}

#[tokio::test]
async fn test_embedding_outage_surfaces_as_unavailable() {
    let pipeline =
        RetrievalPipeline::new(Arc::new(UnavailableEmbedder), lexical_reranker(), small_settings())
            .unwrap();

    let err = pipeline
        .ingest_documents(vec![doc("x", "some text")])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmbeddingUnavailable(_)));
    assert_eq!(pipeline.indexed_chunks().await, 0);

    // Empty pipeline never reaches the embedder on query
    assert!(pipeline.query("x", 3, false).await.unwrap().is_empty());
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn test_from_config_with_injected_agent() {
    // Retrieval puts "b" first; the agent picks the other one
    let provider = Arc::new(MockProvider::with_reply("1"));
    let pipeline = RetrievalPipeline::from_config(&AppConfig::default(), Some(provider.clone()))
        .unwrap();
    assert!(pipeline.has_agent_reranker());
    assert_eq!(pipeline.settings().overfetch_factor, 3);

    pipeline
        .ingest_documents(vec![doc("a", "alpha"), doc("b", "beta")])
        .await
        .unwrap();
    let results = pipeline.query("beta", 1, true).await.unwrap();
    assert_eq!(results[0].source, "a");
    assert_eq!(provider.calls().len(), 1);
}

#[test]
fn test_from_config_rejects_bad_chunking() {
    let mut config = AppConfig::default();
    config.rag.chunk_overlap = config.rag.chunk_size;
    assert!(matches!(
        RetrievalPipeline::from_config(&config, None),
        Err(AppError::Config(_))
    ));
}
