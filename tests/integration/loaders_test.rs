//! Document Ingestion Integration Tests
//!
//! Files, directories and inline documents flowing into the pipeline.

use std::fs;

use agentic_rag::models::knowledge::{DocumentFormat, InlineDocument};
use agentic_rag::services::knowledge::loaders::collect_document_paths;
use agentic_rag::AppError;

use crate::support::local_pipeline;

// ============================================================================
// Directories
// ============================================================================

#[tokio::test]
async fn test_directory_ingested_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b_notes.txt"), "plain notes about ferris").unwrap();
    fs::write(dir.path().join("a_data.json"), r#"{"crab":"ferris"}"#).unwrap();
    fs::write(dir.path().join("c_table.csv"), "name,kind\nferris,crab\n").unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested").join("skip.txt"), "ignored").unwrap();

    let pipeline = local_pipeline();
    let stats = pipeline.ingest_directory(dir.path()).await.unwrap();
    assert_eq!(stats.documents, 3);
    assert_eq!(stats.chunks, 3);

    let first = pipeline.get_chunk(0).await.unwrap();
    assert!(first.source.ends_with("a_data.json"));
    assert_eq!(first.text, r#"{ "crab": "ferris" }"#);

    let third = pipeline.get_chunk(2).await.unwrap();
    assert!(third.source.ends_with("c_table.csv"));
    assert_eq!(third.text, "name: ferris | kind: crab");
}

#[tokio::test]
async fn test_missing_directory_is_not_found() {
    let err = local_pipeline()
        .ingest_directory(std::path::Path::new("/no/such/dir"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn test_collect_skips_subdirectories() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("only_a_dir")).unwrap();
    assert!(collect_document_paths(dir.path()).unwrap().is_empty());
}

// ============================================================================
// Paths
// ============================================================================

#[tokio::test]
async fn test_load_failure_aborts_whole_call() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.txt");
    let bad = dir.path().join("bad.json");
    fs::write(&good, "valid text").unwrap();
    fs::write(&bad, "{ broken").unwrap();

    let pipeline = local_pipeline();
    let err = pipeline.ingest_paths(&[good, bad]).await.unwrap_err();
    assert!(matches!(err, AppError::DocumentLoad(_)));
    assert_eq!(pipeline.indexed_chunks().await, 0);
}

#[tokio::test]
async fn test_paths_mix_directories_and_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b_second.txt"), "second listed file").unwrap();
    fs::write(dir.path().join("a_first.txt"), "first listed file").unwrap();
    let other = tempfile::tempdir().unwrap();
    let loose = other.path().join("loose.txt");
    fs::write(&loose, "a loose file").unwrap();

    let pipeline = local_pipeline();
    let stats = pipeline
        .ingest_paths(&[dir.path().to_path_buf(), loose])
        .await
        .unwrap();
    assert_eq!(stats.documents, 3);

    let mut sources = Vec::new();
    for id in 0..3 {
        sources.push(pipeline.get_chunk(id).await.unwrap().source);
    }
    assert!(sources[0].ends_with("a_first.txt"));
    assert!(sources[1].ends_with("b_second.txt"));
    assert!(sources[2].ends_with("loose.txt"));
}

#[tokio::test]
async fn test_missing_file_aborts_whole_call() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.txt");
    fs::write(&good, "valid text").unwrap();

    let pipeline = local_pipeline();
    let err = pipeline
        .ingest_paths(&[good, dir.path().join("missing.txt")])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(pipeline.indexed_chunks().await, 0);
}

// ============================================================================
// Inline documents
// ============================================================================

#[tokio::test]
async fn test_inline_documents_with_and_without_hints() {
    let pipeline = local_pipeline();
    let stats = pipeline
        .ingest_inline(vec![
            InlineDocument::text("pasted", "  some   pasted\ntext "),
            InlineDocument {
                source: "report.json".to_string(),
                content: br#"[1,2]"#.to_vec(),
                format: None,
            },
            InlineDocument {
                source: "untitled".to_string(),
                content: b"k,v\nx,1\n".to_vec(),
                format: Some(DocumentFormat::Csv),
            },
        ])
        .await
        .unwrap();
    assert_eq!(stats.chunks, 3);

    assert_eq!(pipeline.get_chunk(0).await.unwrap().text, "some pasted text");
    assert_eq!(pipeline.get_chunk(1).await.unwrap().text, "[ 1, 2 ]");
    assert_eq!(pipeline.get_chunk(2).await.unwrap().text, "k: x | v: 1");
}

#[tokio::test]
async fn test_inline_decode_failure_commits_nothing() {
    let pipeline = local_pipeline();
    let err = pipeline
        .ingest_inline(vec![
            InlineDocument::text("ok", "fine"),
            InlineDocument {
                source: "blob".to_string(),
                content: vec![0xff, 0xfe],
                format: Some(DocumentFormat::PlainText),
            },
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DocumentLoad(_)));
    assert_eq!(pipeline.indexed_chunks().await, 0);
}
