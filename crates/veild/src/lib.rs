//! veil daemon library - exposes modules for testing.

pub mod cli;
pub mod error;
pub mod guard;
pub mod pipeline;
pub mod routes;
pub mod server;
pub mod supervisor;
