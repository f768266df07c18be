//! The retrieval contract shared by every connector
//!
//! A connector fetches one item by key, enumerates items inside a
//! date range one page at a time, and probes its credentials. Items
//! are produced through a lazy [`ItemStream`]: each step performs at
//! most one remote round trip, and dropping the stream stops any
//! further calls (a request already in flight is not aborted).

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, future};
use std::fmt;

/// Forward-only, single-pass stream of retrieved items.
///
/// The first error ends the stream; nothing after it is yielded.
pub type ItemStream<'a, T> = BoxStream<'a, Result<T>>;

/// Box `stream` and end it right after its first error.
pub(crate) fn stop_on_error<'a, T: Send + 'a>(
    stream: impl Stream<Item = Result<T>> + Send + 'a,
) -> ItemStream<'a, T> {
    stream
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        })
        .boxed()
}

/// A content-bearing unit produced by a connector.
pub trait RetrievedItem {
    type Key: ?Sized + Sync;

    /// The key that retrieves this item again through
    /// [`DataSource::get_item`].
    fn key(&self) -> &Self::Key;

    /// Raw bytes, fully buffered.
    fn content(&self) -> &[u8];
}

/// Uniform connector contract, parameterised by item and key type.
#[async_trait]
pub trait DataSource: Send + Sync {
    type Item: RetrievedItem + Send;

    /// Human readable connector name.
    fn name(&self) -> &str;

    /// Fetch a single item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a blank key before any
    /// remote access, otherwise whatever the backend raises.
    async fn get_item(
        &self,
        key: &<Self::Item as RetrievedItem>::Key,
    ) -> Result<Self::Item>;

    /// Enumerate items modified or received strictly inside `range`,
    /// restricted to one page when `paging` is given.
    fn get_items(
        &self,
        range: Option<DateRange>,
        paging: Option<Paging>,
    ) -> ItemStream<'_, Self::Item>;

    /// Probe connectivity and credentials.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the probe fails.
    async fn test_authentication(&self) -> Result<()>;
}

/// Optional lower and upper bounds on an item timestamp.
///
/// Both bounds are exclusive. `from <= to` is not checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    #[must_use]
    pub const fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Strict containment test used by the file-like connectors.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at > from) && self.to.is_none_or(|to| at < to)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            self.from.map(|from| format!("From {from}")),
            self.to.map(|to| format!("To {to}")),
        ]
        .into_iter()
        .flatten()
        .collect();
        f.write_str(&parts.join(" "))
    }
}

/// A zero-based page over a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    page: usize,
    page_size: usize,
}

impl Paging {
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when `page_size` is zero.
    pub fn new(page: usize, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::InvalidArgument("page_size"));
        }
        Ok(Self { page, page_size })
    }

    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of leading items to skip.
    #[must_use]
    pub const fn skip(&self) -> usize {
        self.page.saturating_mul(self.page_size)
    }

    /// Maximum number of items in the page.
    #[must_use]
    pub const fn take(&self) -> usize {
        self.page_size
    }

    /// Apply this page to an in-memory listing.
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> impl Iterator<Item = T> {
        items.into_iter().skip(self.skip()).take(self.take())
    }
}
