//! Storage Layer
//!
//! JSON configuration persistence. The vector index itself is in-memory only.

pub mod config;

pub use config::*;
