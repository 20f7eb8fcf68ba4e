// src/store/mod.rs
use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod gcs;
pub mod local;

pub use gcs::GcsStore;
pub use local::LocalStore;

/// MIME type of the consolidated spreadsheet.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A file found in a remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Store-specific handle (object path, local path, ...).
    pub id: String,
    pub name: String,
    pub size: Option<u64>,
}

/// Remote file storage keyed by file name.
#[async_trait]
pub trait RemoteStore {
    /// Look up a file by name. `Ok(None)` when it does not exist.
    async fn find(&self, name: &str) -> Result<Option<RemoteFile>>;

    /// Copy `file` into `dest_dir`, returning the local path.
    async fn download(&self, file: &RemoteFile, dest_dir: &Path) -> Result<PathBuf>;

    /// Store `local` under `name`, deleting any existing file of that name
    /// first. Not versioned.
    async fn upload(&self, local: &Path, name: &str) -> Result<()>;
}
