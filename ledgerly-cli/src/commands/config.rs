use std::{fs, path::PathBuf};

use anyhow::{Context, Result, bail};
use shared::config::Config;

/// Generates a configuration file with the default settings in the current directory.
///
/// # Arguments
/// * `format` - `yaml`, `json` or `toml`.
///
/// # Errors
/// Returns an error if the format is unsupported or if writing the file fails.
pub fn generate_config(format: &str) -> Result<PathBuf> {
    let config = Config::with_defaults();
    let (file_name, serialized) = match format {
        "yaml" | "yml" => ("config.yaml", serde_yml::to_string(&config)?),
        "json" => ("config.json", serde_json::to_string_pretty(&config)?),
        "toml" => ("config.toml", toml::to_string_pretty(&config)?),
        other => bail!("unsupported format `{other}`; use yaml, json or toml"),
    };

    let path = PathBuf::from(file_name);
    fs::write(&path, serialized).with_context(|| format!("failed to write {file_name}"))?;

    println!("Configuration file '{file_name}' generated successfully.");
    Ok(path)
}
