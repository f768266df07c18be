//! Mailbox connector
//!
//! Exposes the file attachments of a mail folder, plus one synthetic
//! attachment per message carrying its body, through the
//! [`DataSource`] contract.

pub mod api;
pub mod attachment;
pub mod filter;
pub mod folder;
pub mod graph;
pub mod item;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::MailboxConfig;
use crate::error::{Error, Result, require};
use crate::source::{DataSource, DateRange, ItemStream, Paging, stop_on_error};
use api::{MailApi, Message, MessageQuery};
use async_trait::async_trait;
use attachment::{AttachmentCandidate, AttachmentEnumerator, BodyAttachment, body_attachment_id};
use folder::{FolderHandle, FolderPath, FolderResolver};
use futures::{Stream, StreamExt, TryStreamExt, stream};
use graph::GraphClient;
use item::{AttachmentItem, AttachmentKey, materialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Attachments and bodies of the messages in one mail folder.
///
/// The folder path is resolved to a server handle on first use and
/// cached for the lifetime of the connector; concurrent first callers
/// share a single resolution.
pub struct MailboxDataSource<A = GraphClient> {
    name: String,
    username: String,
    mail_folder: FolderPath,
    folder: OnceCell<FolderHandle>,
    api: A,
}

impl MailboxDataSource<GraphClient> {
    /// Build a connector talking to the Graph mail API.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] naming the first blank
    /// required field.
    pub fn new(config: MailboxConfig) -> Result<Self> {
        require(&config.name, "name")?;
        config.credentials.validate()?;
        require(&config.username, "username")?;

        let api = GraphClient::new(config.credentials)?;
        Self::with_api(config.name, config.username, config.mail_folder.as_deref(), api)
    }
}

impl<A: MailApi> MailboxDataSource<A> {
    /// Build a connector over any [`MailApi`] implementation.
    ///
    /// `mail_folder` defaults to `Inbox`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when `name`, `username` or a
    /// given `mail_folder` is blank.
    pub fn with_api(
        name: impl Into<String>,
        username: impl Into<String>,
        mail_folder: Option<&str>,
        api: A,
    ) -> Result<Self> {
        let name = name.into();
        let username = username.into();
        require(&name, "name")?;
        require(&username, "username")?;
        let mail_folder = mail_folder.map_or_else(|| Ok(FolderPath::default()), FolderPath::parse)?;

        Ok(Self {
            name,
            username,
            mail_folder,
            folder: OnceCell::new(),
            api,
        })
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub const fn mail_folder(&self) -> &FolderPath {
        &self.mail_folder
    }

    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// The resolved folder handle, resolving it on first call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FolderNotFound`] or the API error of the walk.
    /// A failed resolution is retried by the next call.
    pub async fn folder(&self) -> Result<&FolderHandle> {
        self.folder
            .get_or_try_init(|| async {
                info!("Resolving mail folder '{}'", self.mail_folder);
                FolderResolver::new(&self.api, &self.username)
                    .resolve(&self.mail_folder)
                    .await
            })
            .await
    }

    /// All items of one known message: its file attachments followed
    /// by its body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] immediately when
    /// `message_id` is blank. Remote errors surface through the
    /// stream.
    pub fn get_message_items(&self, message_id: &str) -> Result<ItemStream<'_, AttachmentItem>> {
        require(message_id, "message_id")?;
        let message_id = message_id.to_string();

        let items = stream::once(async move {
            let folder = self.folder().await?;
            let message = self
                .api
                .get_message(&self.username, folder.id(), &message_id)
                .await?;
            Ok::<_, Error>(self.expand(folder, stream::iter([Ok(message)])))
        })
        .try_flatten();

        Ok(stop_on_error(items))
    }

    /// Messages → candidates → materialized items, one request at a
    /// time as the consumer pulls.
    fn expand<'a, S>(
        &'a self,
        folder: &'a FolderHandle,
        messages: S,
    ) -> impl Stream<Item = Result<AttachmentItem>> + Send + 'a
    where
        S: Stream<Item = Result<Message>> + Send + 'a,
    {
        AttachmentEnumerator::new(&self.api, &self.username, folder)
            .enumerate(messages)
            .map_ok(|batch| stream::iter(batch.into_iter().map(Ok)))
            .try_flatten()
            .and_then(move |(message, candidate)| {
                materialize(&self.api, &self.username, message, candidate)
            })
    }
}

#[async_trait]
impl<A: MailApi> DataSource for MailboxDataSource<A> {
    type Item = AttachmentItem;

    fn name(&self) -> &str {
        &self.name
    }

    /// Fetch one attachment, or the body when the attachment id is the
    /// message's synthetic body id.
    async fn get_item(&self, key: &AttachmentKey) -> Result<AttachmentItem> {
        key.validate()?;
        let folder = self.folder().await?;

        let message = self
            .api
            .get_message(&self.username, folder.id(), &key.message_id)
            .await?;

        let candidate = if key.attachment_id == body_attachment_id(&message.id) {
            AttachmentCandidate::Body(BodyAttachment::from_message(&message))
        } else {
            AttachmentCandidate::Real(
                self.api
                    .get_attachment(
                        &self.username,
                        folder.id(),
                        &key.message_id,
                        &key.attachment_id,
                    )
                    .await?,
            )
        };

        materialize(&self.api, &self.username, Arc::new(message), candidate).await
    }

    fn get_items(
        &self,
        range: Option<DateRange>,
        paging: Option<Paging>,
    ) -> ItemStream<'_, AttachmentItem> {
        let query = MessageQuery::received(range.as_ref(), paging);

        let items = stream::once(async move {
            let folder = self.folder().await?;
            let messages = self
                .api
                .list_messages(&self.username, folder.id(), &query)
                .await?;
            debug!(
                "Listed {} message(s) in '{}' (filter: {:?})",
                messages.len(),
                self.mail_folder,
                query.filter
            );
            Ok::<_, Error>(self.expand(folder, stream::iter(messages.into_iter().map(Ok))))
        })
        .try_flatten();

        stop_on_error(items)
    }

    async fn test_authentication(&self) -> Result<()> {
        let folder = self.folder().await?;
        self.api
            .list_messages(&self.username, folder.id(), &MessageQuery::probe())
            .await?;
        info!("Mailbox '{}' is reachable", self.name);
        Ok(())
    }
}
