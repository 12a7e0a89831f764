//! The flat-file store: `lastmr.txt` holds the last reading as decimal text and `database.json`
//! holds the bills as a JSON object keyed by `MMYYYY`.

use crate::error::{ErrorType, IntoResult, Res};
use crate::model::{Bills, BillingRecord, DateKey};
use crate::store::Store;
use crate::{utils, Result};
use anyhow::{anyhow, Context};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const LAST_READING_FILE: &str = "lastmr.txt";
const DATABASE_FILE: &str = "database.json";
const STAGING_SUFFIX: &str = "tmp";

/// The locations of the two store files.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StorePaths {
    last_reading: PathBuf,
    database: PathBuf,
}

impl StorePaths {
    /// The standard file names inside `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            last_reading: dir.join(LAST_READING_FILE),
            database: dir.join(DATABASE_FILE),
        }
    }

    pub fn last_reading(&self) -> &Path {
        &self.last_reading
    }

    pub fn database(&self) -> &Path {
        &self.database
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    paths: StorePaths,
}

impl FileStore {
    /// Creates a store for `paths` without checking that the files exist. Prefer
    /// [`FileStore::open`], which fails early.
    pub fn new(paths: StorePaths) -> Self {
        Self { paths }
    }

    /// Creates both store files: the last reading set to `initial_reading` and an empty set of
    /// bills. Existing files are never overwritten; if either exists this fails.
    pub async fn init(paths: StorePaths, initial_reading: f64) -> Result<Self> {
        for path in [paths.last_reading(), paths.database()] {
            if utils::exists(path).await.pub_result(ErrorType::Storage)? {
                return Err(anyhow!(
                    "Refusing to overwrite existing store file '{}'",
                    path.display()
                ))
                .pub_result(ErrorType::Storage);
            }
        }
        if let Some(parent) = paths.database().parent() {
            utils::make_dir(parent).await.pub_result(ErrorType::Storage)?;
        }
        utils::write_new(paths.last_reading(), format_reading(initial_reading))
            .await
            .pub_result(ErrorType::Storage)?;
        utils::write_new(paths.database(), to_json(&Bills::new()).pub_result(ErrorType::Storage)?)
            .await
            .pub_result(ErrorType::Storage)?;
        debug!("Initialized store files in {}", paths.database().display());
        Ok(Self { paths })
    }

    /// Opens an existing store. Both files must exist and parse, otherwise this fails with an
    /// `Uninitialized` or `Storage` error respectively.
    pub async fn open(paths: StorePaths) -> Result<Self> {
        let store = Self::new(paths);
        let _ = store.last_reading().await?;
        let _ = store.bills().await?;
        Ok(store)
    }

    /// Writes both new files next to the originals and then renames them into place, the bills
    /// first. If staging fails, the originals are untouched.
    async fn replace(&self, reading: f64, bills: &Bills) -> Res<()> {
        let reading_stage = staging_path(self.paths.last_reading());
        let database_stage = staging_path(self.paths.database());
        let staged = self
            .stage(&reading_stage, reading, &database_stage, bills)
            .await;
        if let Err(e) = staged {
            discard(&reading_stage).await;
            discard(&database_stage).await;
            return Err(e);
        }
        utils::rename(&database_stage, self.paths.database()).await?;
        utils::rename(&reading_stage, self.paths.last_reading())
            .await
            .context("The bill was saved but the last reading was not updated")?;
        Ok(())
    }

    async fn stage(
        &self,
        reading_stage: &Path,
        reading: f64,
        database_stage: &Path,
        bills: &Bills,
    ) -> Res<()> {
        // Left over from an interrupted commit.
        discard(reading_stage).await;
        discard(database_stage).await;
        utils::write_new(database_stage, to_json(bills)?).await?;
        utils::write_new(reading_stage, format_reading(reading)).await
    }
}

#[async_trait::async_trait]
impl Store for FileStore {
    async fn last_reading(&self) -> Result<f64> {
        let path = self.paths.last_reading();
        let text = read_store_file(path).await?;
        text.trim()
            .parse::<f64>()
            .with_context(|| {
                format!(
                    "The last reading file '{}' does not contain a number",
                    path.display()
                )
            })
            .pub_result(ErrorType::Storage)
    }

    async fn bills(&self) -> Result<Bills> {
        let path = self.paths.database();
        let text = read_store_file(path).await?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse the bills in '{}'", path.display()))
            .pub_result(ErrorType::Storage)
    }

    async fn commit(&self, key: &DateKey, record: &BillingRecord) -> Result<()> {
        let mut bills = self.bills().await?;
        bills.insert(key.to_string(), record.clone());
        self.replace(record.current_reading, &bills)
            .await
            .pub_result(ErrorType::Storage)
    }
}

async fn read_store_file(path: &Path) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(e)
            .with_context(|| {
                format!(
                    "The store file '{}' does not exist, run 'meterbill init' first",
                    path.display()
                )
            })
            .pub_result(ErrorType::Uninitialized),
        Err(e) => Err(e)
            .with_context(|| format!("Unable to read the store file '{}'", path.display()))
            .pub_result(ErrorType::Storage),
    }
}

/// Pretty-prints with four-space indentation, matching files written by earlier versions.
fn to_json<T: Serialize>(value: &T) -> Res<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value
        .serialize(&mut serializer)
        .context("Unable to serialize the bills")?;
    Ok(out)
}

/// `{:?}` keeps a trailing `.0` on whole numbers, e.g. `150.0`.
fn format_reading(reading: f64) -> String {
    format!("{reading:?}")
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(STAGING_SUFFIX);
    path.with_file_name(name)
}

async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed staging file {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Unable to remove staging file {}: {e}", path.display()),
    }
}
