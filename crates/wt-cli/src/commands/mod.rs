//! CLI subcommand implementations.

pub mod cache;
pub mod series;
pub mod timeline;
pub mod util;
