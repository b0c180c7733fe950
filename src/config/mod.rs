//! Configuration loading
//!
//! Settings come from a TOML file merged with `KAGAMI_`-prefixed environment
//! variables; the environment wins. A missing file is not fatal, so a
//! container can run on environment variables alone.

mod loader;
mod types;

pub use loader::load_config;
pub use types::{Config, DatabaseConfig};
