//! Mail folder paths and their resolution
//!
//! A [`FolderPath`] is the human readable `Inbox/Projects/2024` form
//! configured by the caller. The server only addresses nested folders
//! by id, so [`FolderResolver`] walks the path one level at a time and
//! yields a [`FolderHandle`].

use super::api::MailApi;
use crate::error::{Error, Result, require};
use std::fmt;
use tracing::debug;

/// A `/` or `\` separated mail folder path.
///
/// The first segment names a folder at the mailbox root; the rest name
/// child folders below it.
///
/// # Examples
///
/// ```
/// use data_sources::FolderPath;
///
/// let path = FolderPath::from("Inbox\\Invoices/2024");
/// assert_eq!(path.root(), "Inbox");
/// assert_eq!(path.children(), ["Invoices", "2024"]);
/// assert_eq!(path.to_string(), "Inbox/Invoices/2024");
///
/// assert_eq!(FolderPath::default().to_string(), "Inbox");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderPath {
    segments: Vec<String>,
}

impl FolderPath {
    /// Root folder used when no path is configured.
    pub const INBOX: &'static str = "Inbox";

    /// Parse a configured path, rejecting a blank one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when `path` is blank.
    pub fn parse(path: &str) -> Result<Self> {
        require(path, "mail_folder")?;
        Ok(Self::from(path))
    }

    /// The root folder name.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    /// Child folder names below the root, outermost first.
    #[must_use]
    pub fn children(&self) -> &[String] {
        &self.segments[1..]
    }
}

impl Default for FolderPath {
    fn default() -> Self {
        Self {
            segments: vec![Self::INBOX.to_string()],
        }
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl From<&str> for FolderPath {
    fn from(s: &str) -> Self {
        Self {
            segments: s.replace('\\', "/").split('/').map(str::to_string).collect(),
        }
    }
}

impl From<String> for FolderPath {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

/// Server-side reference to a resolved folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    id: String,
}

impl FolderHandle {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Walks a [`FolderPath`] down to a [`FolderHandle`].
pub struct FolderResolver<'a, A: ?Sized> {
    api: &'a A,
    user: &'a str,
}

impl<'a, A: MailApi + ?Sized> FolderResolver<'a, A> {
    pub const fn new(api: &'a A, user: &'a str) -> Self {
        Self { api, user }
    }

    /// Resolve `path` segment by segment.
    ///
    /// The root is addressed by name without a lookup. Each child
    /// segment must match exactly one child display name; the walk
    /// stops at the first segment that matches none or several.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FolderNotFound`] naming the missing segment,
    /// [`Error::AmbiguousFolder`] when siblings share the name, or the
    /// API error of a failed child listing.
    pub async fn resolve(&self, path: &FolderPath) -> Result<FolderHandle> {
        let mut handle = FolderHandle::new(path.root());

        for segment in path.children() {
            let children = self.api.child_folders(self.user, &handle.id).await?;
            let mut matching = children
                .into_iter()
                .filter(|folder| folder.display_name == *segment);
            let child = matching
                .next()
                .ok_or_else(|| Error::FolderNotFound(segment.clone()))?;
            if matching.next().is_some() {
                return Err(Error::AmbiguousFolder(segment.clone()));
            }
            debug!("Resolved folder segment '{}' to {}", segment, child.id);
            handle = FolderHandle::new(child.id);
        }

        Ok(handle)
    }
}
