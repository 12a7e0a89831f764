use crate::commands::Out;
use crate::config::InitOptions;
use crate::{Config, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What `meterbill init` created.
#[derive(Debug, Clone, Serialize)]
pub struct InitSummary {
    pub config: PathBuf,
    pub last_reading: PathBuf,
    pub database: PathBuf,
    pub static_dir: PathBuf,
}

/// Creates the home directory, its subdirectories and:
/// - Creates an initial `config.json` file using `options`
/// - Creates the store files with `initial_reading` as the last meter reading and no bills
///
/// # Arguments
/// - `home` - The directory that will be the root of data directory, e.g. `$HOME/meterbill`
/// - `initial_reading` - The meter reading that the first bill will be measured from.
/// - `options` - The per-unit rate and port to write into `config.json`.
///
/// # Errors
/// - Returns an error if the directory was already initialized or any file operations fail.
pub async fn init(
    home: &Path,
    initial_reading: f64,
    options: InitOptions,
) -> Result<Out<InitSummary>> {
    let config = Config::create(home, initial_reading, options).await?;
    let summary = InitSummary {
        config: config.config_path().to_path_buf(),
        last_reading: config.store_paths().last_reading().to_path_buf(),
        database: config.store_paths().database().to_path_buf(),
        static_dir: config.static_dir(),
    };
    Ok(Out::new(
        format!(
            "Successfully created the meterbill directory at {}. Put the web client files in {}",
            config.root().display(),
            summary.static_dir.display()
        ),
        summary,
    ))
}
