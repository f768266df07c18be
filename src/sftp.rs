//! Remote file server connector
//!
//! The SSH/SFTP session itself is supplied by the caller through
//! [`SftpConnector`]. Every top-level operation opens its own session
//! and disconnects it before returning, whether the operation
//! succeeded or not. Sessions are never shared between calls.

use crate::config::SftpConfig;
use crate::error::{Error, Result, require};
use crate::source::{DataSource, DateRange, ItemStream, Paging, RetrievedItem, stop_on_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{TryStreamExt, stream};
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, info, warn};

/// Directory entry on the remote server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Absolute remote path.
    pub full_name: String,
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
    pub last_write_time: DateTime<Utc>,
}

/// Opens authenticated SFTP sessions.
#[async_trait]
pub trait SftpConnector: Send + Sync {
    type Session: SftpSession;

    async fn connect(&self, config: &SftpConfig) -> Result<Self::Session>;
}

/// One open SFTP session.
///
/// Implementations must also release the connection when dropped, so
/// a stream abandoned by its consumer does not leak it.
#[async_trait]
pub trait SftpSession: Send {
    /// Entries of `path`, in server order.
    async fn list_directory(&mut self, path: &str) -> Result<Vec<RemoteFile>>;

    async fn stat(&mut self, path: &str) -> Result<RemoteFile>;

    async fn download(&mut self, path: &str) -> Result<Vec<u8>>;

    async fn disconnect(self) -> Result<()>
    where
        Self: Sized;
}

/// A downloaded remote file.
#[derive(Debug, Clone)]
pub struct SftpItem {
    file: RemoteFile,
    content: Vec<u8>,
}

impl SftpItem {
    #[must_use]
    pub const fn file(&self) -> &RemoteFile {
        &self.file
    }

    #[must_use]
    pub fn into_content(self) -> Vec<u8> {
        self.content
    }
}

impl RetrievedItem for SftpItem {
    type Key = str;

    fn key(&self) -> &str {
        &self.file.full_name
    }

    fn content(&self) -> &[u8] {
        &self.content
    }
}

impl fmt::Display for SftpItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file.full_name)
    }
}

/// Files directly inside one remote folder.
pub struct SftpDataSource<C> {
    config: SftpConfig,
    connector: C,
}

impl<C: SftpConnector> SftpDataSource<C> {
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] naming the first blank
    /// required field.
    pub fn new(config: SftpConfig, connector: C) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, connector })
    }

    #[must_use]
    pub const fn config(&self) -> &SftpConfig {
        &self.config
    }

    async fn open(&self) -> Result<C::Session> {
        debug!(
            "Connecting to SFTP server at {}:{}",
            self.config.host, self.config.port
        );
        self.connector.connect(&self.config).await
    }
}

/// Disconnect `session`, keeping the first error of `result` and the
/// disconnect.
async fn release<S: SftpSession, T>(session: S, result: Result<T>) -> Result<T> {
    let closed = session.disconnect().await;
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!("SFTP disconnect after failure also failed: {}", close_err);
            }
            Err(e)
        }
        (Ok(_), Err(e)) => Err(e),
    }
}

async fn download<S: SftpSession>(session: &mut S, file: RemoteFile) -> Result<SftpItem> {
    let content = session.download(&file.full_name).await?;
    debug!("Downloaded {} ({} bytes)", file.full_name, content.len());
    Ok(SftpItem { file, content })
}

/// Pending downloads of one `get_items` call, owning its session.
struct Downloads<S> {
    session: Option<S>,
    files: VecDeque<RemoteFile>,
}

impl<S: SftpSession> Downloads<S> {
    async fn next(mut self) -> Result<Option<(SftpItem, Self)>> {
        let Some(mut session) = self.session.take() else {
            return Ok(None);
        };

        let Some(file) = self.files.pop_front() else {
            session.disconnect().await?;
            return Ok(None);
        };

        match download(&mut session, file).await {
            Ok(item) => {
                self.session = Some(session);
                Ok(Some((item, self)))
            }
            Err(e) => release(session, Err(e)).await,
        }
    }
}

#[async_trait]
impl<C: SftpConnector> DataSource for SftpDataSource<C> {
    type Item = SftpItem;

    fn name(&self) -> &str {
        &self.config.name
    }

    async fn get_item(&self, key: &str) -> Result<SftpItem> {
        require(key, "key")?;

        let mut session = self.open().await?;
        let result = match session.stat(key).await {
            Ok(file) => download(&mut session, file).await,
            Err(e) => Err(e),
        };
        release(session, result).await
    }

    fn get_items(
        &self,
        range: Option<DateRange>,
        paging: Option<Paging>,
    ) -> ItemStream<'_, SftpItem> {
        let items = stream::once(async move {
            let mut session = self.open().await?;
            let listing = match session.list_directory(&self.config.remote_folder).await {
                Ok(listing) => listing,
                Err(e) => return release(session, Err(e)).await,
            };

            let range = range.unwrap_or_default();
            let matching = listing
                .into_iter()
                .filter(|file| !file.is_directory && range.contains(file.last_write_time));
            let files: VecDeque<RemoteFile> = match paging {
                Some(paging) => paging.apply(matching).collect(),
                None => matching.collect(),
            };
            debug!(
                "Selected {} file(s) in {}",
                files.len(),
                self.config.remote_folder
            );

            let downloads = Downloads {
                session: Some(session),
                files,
            };
            Ok::<_, Error>(stream::try_unfold(downloads, Downloads::next))
        })
        .try_flatten();

        stop_on_error(items)
    }

    async fn test_authentication(&self) -> Result<()> {
        let session = self.open().await?;
        release(session, Ok(())).await?;
        info!("SFTP server {} is reachable", self.config.host);
        Ok(())
    }
}
