//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success};
use hdc_core::config::{self, ClientConfig};

fn resolve(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path)
}

/// Show the configuration in effect, defaults filled in
pub fn config_show(config_path: Option<&Path>) -> Result<()> {
    let path = resolve(config_path);

    let effective = if path.exists() {
        print_info(&format!("Configuration file: {:?}", path));
        config::load_client_config(Some(path.as_path()))
            .with_context(|| format!("Failed to load config file: {:?}", path))?
    } else {
        print_info(&format!("No configuration file at {:?}, showing defaults", path));
        ClientConfig::default()
    };
    println!();
    println!("{}", toml::to_string_pretty(&effective)?);

    Ok(())
}

/// Show config file path
pub fn config_path(config_path: Option<&Path>) -> Result<()> {
    println!("{}", resolve(config_path).display());
    Ok(())
}

/// Initialize default configuration
pub fn config_init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = resolve(config_path);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    config::save_config(&path, &ClientConfig::default())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;
    print_success(&format!("Created configuration file: {:?}", path));

    Ok(())
}
