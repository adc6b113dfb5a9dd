//! Configuration loading
//!
//! Layered `.embatch/` YAML files and `EMBATCH_*` environment overrides are
//! merged with figment, then checked by [`ConfigLoader::validate`].

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
