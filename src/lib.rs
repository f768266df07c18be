//! Incremental item retrieval from heterogeneous sources
//!
//! Every connector implements [`DataSource`]: fetch one item by key,
//! enumerate items inside an exclusive [`DateRange`] one [`Paging`]
//! page at a time, and probe credentials. Three connectors are
//! provided:
//!
//! - [`MailboxDataSource`] exposes mail attachments, plus one
//!   synthetic body attachment per message, through the Graph mail API.
//! - [`SftpDataSource`] exposes the files of a remote folder over a
//!   caller supplied [`SftpConnector`].
//! - [`FileDataSource`] exposes the files of a local folder.
//!
//! Enumeration is lazy: items are fetched as the returned stream is
//! polled, and the first error ends the stream.

mod config;
mod error;
mod file;
pub mod mailbox;
mod sftp;
mod source;

pub use config::{GRAPH_API_BASE, GraphCredentials, MailboxConfig, SftpConfig};
pub use error::{Error, Result};
pub use file::{FileDataSource, FileItem};
pub use mailbox::MailboxDataSource;
pub use mailbox::api::MailApi;
pub use mailbox::attachment::AttachmentCandidate;
pub use mailbox::folder::FolderPath;
pub use mailbox::graph::GraphClient;
pub use mailbox::item::{AttachmentItem, AttachmentKey};
pub use sftp::{RemoteFile, SftpConnector, SftpDataSource, SftpItem, SftpSession};
pub use source::{DataSource, DateRange, ItemStream, Paging, RetrievedItem};
