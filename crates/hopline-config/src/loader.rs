//! Configuration file loading and error types.

use std::fs;
use std::path::{Path, PathBuf};

use crate::Config;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("unsupported config format {:?}, expected toml, json, jsonc or yaml", path.display())]
    UnsupportedFormat { path: PathBuf },
    #[error("validation: {0}")]
    Validation(String),
}

/// Syntax error from the format-specific parser.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Load a config file, picking the format from its extension.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let format = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    if !matches!(format, "json" | "jsonc" | "yaml" | "yml" | "toml") {
        return Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }

    let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(format, &data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse(format: &str, data: &str) -> Result<Config, ParseError> {
    match format {
        "json" | "jsonc" => {
            let stripped = json_comments::StripComments::new(data.as_bytes());
            Ok(serde_json::from_reader(stripped)?)
        }
        "yaml" | "yml" => Ok(serde_yaml::from_str(data)?),
        _ => Ok(toml::from_str(data)?),
    }
}
