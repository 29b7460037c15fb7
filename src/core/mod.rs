pub mod build;
pub mod config;
pub mod deploy;
pub mod error;
pub mod git;
pub mod preflight;
pub mod publish;
pub mod version;

// Re-export common types for convenience
pub use error::{Error, ErrorCategory, ErrorCode, Result};
