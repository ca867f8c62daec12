//! Serde data file structs for node tunables.
//!
//! One `machines.{ron,toml,json}` file lists named machine, unloader and
//! generator configurations. Omitted fields take the core defaults.

use serde::Deserialize;
use tickwork_core::config::{GeneratorConfig, MachineConfig, UnloaderConfig};

/// Top-level contents of a machines data file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub machines: Vec<MachineData>,
    #[serde(default)]
    pub unloaders: Vec<UnloaderData>,
    #[serde(default)]
    pub generators: Vec<GeneratorData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MachineData {
    pub name: String,
    #[serde(default)]
    pub config: MachineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnloaderData {
    pub name: String,
    #[serde(default)]
    pub config: UnloaderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorData {
    pub name: String,
    #[serde(default)]
    pub config: GeneratorConfig,
}
