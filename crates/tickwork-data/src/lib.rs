//! Data-driven node configuration for Tickwork.
//!
//! Loads named machine, unloader and generator tunables from a
//! `machines.{ron,toml,json}` file and validates them.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, MachineCatalog, load_catalog};
