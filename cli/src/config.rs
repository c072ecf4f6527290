use std::fmt;
use std::path::Path;

use serde::Deserialize;

use pyblocks::Catalog;
use pyblocks::block::kind::{CatalogError, KindSpec};

/// A TOML file of custom block kinds, each under a `[[kind]]` table.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogFile {
    #[serde(default, rename = "kind")]
    pub kinds: Vec<KindSpec>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: String, error: std::io::Error },
    Toml { path: String, error: toml::de::Error },
    Catalog { path: String, error: CatalogError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, error } => write!(f, "cannot read '{}': {}", path, error),
            ConfigError::Toml { path, error } => write!(f, "'{}' is not a valid catalog: {}", path, error),
            ConfigError::Catalog { path, error } => write!(f, "in '{}': {}", path, error),
        }
    }
}

impl std::error::Error for ConfigError {}

/// The built-in Python kinds plus the custom kinds of `path`, if any.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog, ConfigError> {
    let mut catalog = Catalog::python();
    let Some(path) = path else {
        return Ok(catalog);
    };
    let display = path.display().to_string();
    let source = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
        path: display.clone(),
        error,
    })?;
    let file: CatalogFile = toml::from_str(&source).map_err(|error| ConfigError::Toml {
        path: display.clone(),
        error,
    })?;
    register_all(&mut catalog, file.kinds).map_err(|error| ConfigError::Catalog { path: display, error })?;
    Ok(catalog)
}

pub fn register_all(catalog: &mut Catalog, kinds: Vec<KindSpec>) -> Result<(), CatalogError> {
    for spec in kinds {
        catalog.register(spec)?;
    }
    Ok(())
}
