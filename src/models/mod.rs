//! Data Models
//!
//! Configuration, pipeline records and command responses.

pub mod knowledge;
pub mod response;
pub mod settings;

pub use knowledge::*;
pub use response::*;
pub use settings::*;
