use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

const DEV_ENV_FILES: [&str; 3] = ["config/common.env", "config/dev.env", ".secrets.env"];
const PROD_ENV_FILES: [&str; 3] = ["config/common.env", "config/prod.env", ".secrets.env"];

/// Loads the env files for the active Rocket profile. Later files override
/// earlier ones; missing files are skipped.
pub fn load_environment() -> Result<()> {
    let profile = dotenvy::var("ROCKET_PROFILE").unwrap_or_else(|_| "debug".to_string());

    let env_files = if profile == "release" || profile == "production" {
        PROD_ENV_FILES
    } else {
        DEV_ENV_FILES
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<()> {
    if !Path::new(path).exists() {
        debug!(path, "Environment file not found, skipping");
        return Ok(());
    }

    dotenvy::from_filename_override(path)
        .with_context(|| format!("Failed to load environment file {}", path))?;
    info!(path, "Loaded environment file");
    Ok(())
}
