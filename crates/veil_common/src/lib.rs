//! Shared types and logic for the veil sanitizer.
//!
//! The daemon (`veild`) owns process management and HTTP; everything that can be
//! exercised without a socket or a child process lives here.

pub mod backend;
pub mod config;
pub mod prompt;
pub mod recovery;
pub mod types;

pub use backend::{BackendError, CompletionBackend, FakeBackend, OllamaClient};
pub use config::{Config, OllamaConfig, SanitizeConfig, ServerConfig};
pub use recovery::recover;
pub use types::{RequestProblem, SanitizeRequest, SanitizeResult};

/// Crate version, reported by the daemon at startup.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
