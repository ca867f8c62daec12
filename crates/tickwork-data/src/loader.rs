//! Loading pipeline: finds the machines data file, deserializes it, checks
//! names and values, and builds a [`MachineCatalog`].
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers used by [`load_catalog`].

use crate::schema::CatalogData;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tickwork_core::config::{GeneratorConfig, MachineConfig, UnloaderConfig};
use tickwork_core::energy::config_value;

/// Base name of the catalog file.
pub const MACHINES_FILE: &str = "machines";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// A value is outside its allowed range.
    #[error("invalid {kind} '{name}' in {file}: {reason}")]
    Invalid {
        file: PathBuf,
        kind: &'static str,
        name: String,
        reason: String,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for `{base_name}.ron`, `.toml` or `.json`.
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but a missing file is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let parse_error = |detail: String| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    };

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
    }
}

// ===========================================================================
// Validation
// ===========================================================================

fn check_rate(what: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        Err(format!("{what} must be a non-negative number (got {value})"))
    } else if config_value("rate", value).is_err() {
        Err(format!("{what} is too large (got {value})"))
    } else {
        Ok(())
    }
}

fn check_capacity(value: f64) -> Result<(), String> {
    if !value.is_finite() || value <= 0.0 {
        Err(format!("capacity must be greater than zero (got {value})"))
    } else if config_value("capacity", value).is_err() {
        Err(format!("capacity is too large (got {value})"))
    } else {
        Ok(())
    }
}

pub fn validate_machine(config: &MachineConfig) -> Result<(), String> {
    check_capacity(config.capacity)?;
    check_rate("max_extract", config.max_extract)?;
    check_rate("max_insert", config.max_insert)?;
    if let Some(drain) = config.slow_discharge {
        if drain.interval == 0 {
            return Err("slow_discharge.interval must be at least 1".to_string());
        }
        check_rate("slow_discharge.amount", drain.amount)?;
    }
    Ok(())
}

pub fn validate_unloader(config: &UnloaderConfig) -> Result<(), String> {
    if config.reserved_slots >= config.slot_count {
        return Err(format!(
            "reserved_slots ({}) must be less than slot_count ({})",
            config.reserved_slots, config.slot_count
        ));
    }
    if config.pull_batch == 0 {
        return Err("pull_batch must be at least 1".to_string());
    }
    if config.rescan_interval == 0 {
        return Err("rescan_interval must be at least 1".to_string());
    }
    if config.confirm_interval == 0 {
        return Err("confirm_interval must be at least 1".to_string());
    }
    if let Some(power) = &config.power {
        validate_machine(power).map_err(|reason| format!("power: {reason}"))?;
    }
    Ok(())
}

pub fn validate_generator(config: &GeneratorConfig) -> Result<(), String> {
    check_capacity(config.capacity)?;
    check_rate("max_extract", config.max_extract)?;
    check_rate("max_insert", config.max_insert)?;
    check_rate("output_per_tick", config.output_per_tick)
}

// ===========================================================================
// Catalog
// ===========================================================================

/// Validated node configurations keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MachineCatalog {
    pub machines: BTreeMap<String, MachineConfig>,
    pub unloaders: BTreeMap<String, UnloaderConfig>,
    pub generators: BTreeMap<String, GeneratorConfig>,
}

impl MachineCatalog {
    pub fn machine(&self, name: &str) -> Option<&MachineConfig> {
        self.machines.get(name)
    }

    pub fn unloader(&self, name: &str) -> Option<&UnloaderConfig> {
        self.unloaders.get(name)
    }

    pub fn generator(&self, name: &str) -> Option<&GeneratorConfig> {
        self.generators.get(name)
    }

    pub fn len(&self) -> usize {
        self.machines.len() + self.unloaders.len() + self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Insert `config` under `name`, rejecting duplicates and invalid values.
fn insert_checked<C>(
    map: &mut BTreeMap<String, C>,
    file: &Path,
    kind: &'static str,
    name: String,
    config: C,
    validate: fn(&C) -> Result<(), String>,
) -> Result<(), DataLoadError> {
    if map.contains_key(&name) {
        return Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name,
        });
    }
    if let Err(reason) = validate(&config) {
        return Err(DataLoadError::Invalid {
            file: file.to_path_buf(),
            kind,
            name,
            reason,
        });
    }
    map.insert(name, config);
    Ok(())
}

/// Build a catalog from already-deserialized data. `file` is used in errors.
pub fn build_catalog(data: CatalogData, file: &Path) -> Result<MachineCatalog, DataLoadError> {
    let mut catalog = MachineCatalog::default();
    for entry in data.machines {
        insert_checked(
            &mut catalog.machines,
            file,
            "machine",
            entry.name,
            entry.config,
            validate_machine,
        )?;
    }
    for entry in data.unloaders {
        insert_checked(
            &mut catalog.unloaders,
            file,
            "unloader",
            entry.name,
            entry.config,
            validate_unloader,
        )?;
    }
    for entry in data.generators {
        insert_checked(
            &mut catalog.generators,
            file,
            "generator",
            entry.name,
            entry.config,
            validate_generator,
        )?;
    }
    Ok(catalog)
}

/// Load `machines.{ron,toml,json}` from `dir`.
pub fn load_catalog(dir: &Path) -> Result<MachineCatalog, DataLoadError> {
    let path = require_data_file(dir, MACHINES_FILE)?;
    let data: CatalogData = deserialize_file(&path)?;
    let catalog = build_catalog(data, &path)?;
    tracing::debug!(
        file = %path.display(),
        machines = catalog.machines.len(),
        unloaders = catalog.unloaders.len(),
        generators = catalog.generators.len(),
        "machine catalog loaded"
    );
    Ok(catalog)
}

// ===========================================================================
// Tests
// ===========================================================================
