//! Local folder connector

use crate::error::{Error, Result, require};
use crate::source::{DataSource, DateRange, ItemStream, Paging, RetrievedItem, stop_on_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file read from disk.
#[derive(Debug, Clone)]
pub struct FileItem {
    key: String,
    path: PathBuf,
    modified: Option<DateTime<Utc>>,
    content: Vec<u8>,
}

impl FileItem {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    #[must_use]
    pub fn into_content(self) -> Vec<u8> {
        self.content
    }
}

impl RetrievedItem for FileItem {
    type Key = str;

    fn key(&self) -> &str {
        &self.key
    }

    fn content(&self) -> &[u8] {
        &self.content
    }
}

impl fmt::Display for FileItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Files directly inside one local folder.
///
/// Sub-directories are not descended into. Listing order is whatever
/// the operating system returns.
#[derive(Debug, Clone)]
pub struct FileDataSource {
    name: String,
    local_folder: PathBuf,
}

impl FileDataSource {
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] when `name` or
    /// `local_folder` is blank.
    pub fn new(name: impl Into<String>, local_folder: impl Into<PathBuf>) -> Result<Self> {
        let name = name.into();
        let local_folder = local_folder.into();
        require(&name, "name")?;
        require(&local_folder.to_string_lossy(), "local_folder")?;
        Ok(Self { name, local_folder })
    }

    #[must_use]
    pub fn local_folder(&self) -> &Path {
        &self.local_folder
    }

    /// Regular files of the folder with their modification times.
    async fn list_files(&self) -> Result<Vec<(PathBuf, DateTime<Utc>)>> {
        let mut entries = tokio::fs::read_dir(&self.local_folder).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                files.push((entry.path(), metadata.modified()?.into()));
            }
        }
        Ok(files)
    }
}

/// Read `path` fully into a [`FileItem`].
async fn read_file(path: &Path) -> Result<FileItem> {
    let full_path = std::path::absolute(path)?;
    let content = tokio::fs::read(&full_path).await?;
    let modified = tokio::fs::metadata(&full_path)
        .await?
        .modified()
        .ok()
        .map(DateTime::<Utc>::from);
    debug!("Read {} ({} bytes)", full_path.display(), content.len());

    Ok(FileItem {
        key: full_path.to_string_lossy().into_owned(),
        path: full_path,
        modified,
        content,
    })
}

#[async_trait]
impl DataSource for FileDataSource {
    type Item = FileItem;

    fn name(&self) -> &str {
        &self.name
    }

    async fn get_item(&self, key: &str) -> Result<FileItem> {
        require(key, "key")?;
        read_file(Path::new(key)).await
    }

    fn get_items(
        &self,
        range: Option<DateRange>,
        paging: Option<Paging>,
    ) -> ItemStream<'_, FileItem> {
        let items = stream::once(async move {
            let range = range.unwrap_or_default();
            let matching = self
                .list_files()
                .await?
                .into_iter()
                .filter(|(_, modified)| range.contains(*modified))
                .map(|(path, _)| path);

            let selected: Vec<PathBuf> = match paging {
                Some(paging) => paging.apply(matching).collect(),
                None => matching.collect(),
            };
            debug!(
                "Selected {} file(s) in {}",
                selected.len(),
                self.local_folder.display()
            );

            let reads = stream::iter(selected)
                .then(|path| async move { read_file(&path).await });
            Ok::<_, Error>(reads)
        })
        .try_flatten();

        stop_on_error(items)
    }

    async fn test_authentication(&self) -> Result<()> {
        tokio::fs::read_dir(&self.local_folder).await?;
        Ok(())
    }
}
