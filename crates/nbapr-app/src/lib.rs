// Library root: re-exports all modules so integration tests and the binary
// share the crate's public API.

pub mod config;
pub mod fetch;
pub mod output;
pub mod stats;
