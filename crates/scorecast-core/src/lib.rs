// Library root: re-exports all modules so the CLI and integration tests
// can reach the crate's public API.

pub mod api;
pub mod config;
pub mod error;
pub mod flow_index;
pub mod model;
pub mod odds;
pub mod prefs;
pub mod sections;
pub mod sync;
pub mod timeline;
