//! Agentic RAG Core
//!
//! Foundational types shared by the Agentic RAG workspace crates. Nothing in
//! here knows about embeddings, indexes or providers.
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `proxy` - Proxy configuration shared by HTTP-using backends

pub mod error;
pub mod proxy;

pub use error::{CoreError, CoreResult};
pub use proxy::{ProxyConfig, ProxyProtocol};
