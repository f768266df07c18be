//! Error types for data-sources

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A required constructor or call argument was blank or missing.
    #[error("Invalid argument: {0} is missing")]
    InvalidArgument(&'static str),

    #[error("Child folder '{0}' does not exist")]
    FolderNotFound(String),

    #[error("Child folder '{0}' matches more than one folder")]
    AmbiguousFolder(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail API error: status {status}: {body}")]
    MailApi { status: u16, body: String },

    #[error("SFTP error: {0}")]
    Sftp(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Fail with [`Error::InvalidArgument`] when `value` is empty or
/// whitespace only.
pub(crate) fn require(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(field));
    }
    Ok(())
}
