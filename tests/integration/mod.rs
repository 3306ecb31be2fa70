//! Integration Tests Module
//!
//! End-to-end tests of the retrieval core through its public API. Every
//! backend is local (feature hashing, lexical scoring, mock generation) so
//! nothing here touches the network.

// Shared stub capabilities
mod support;

// Ingestion, chunk identity, over-fetch and atomic commit
mod pipeline_test;

// Cross-encoder and agent reranking through the pipeline
mod reranker_test;

// File, directory and inline document ingestion
mod loaders_test;
