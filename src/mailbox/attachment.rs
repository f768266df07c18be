//! Attachment candidates for a batch of messages
//!
//! Every message contributes its real file attachments followed by one
//! synthetic attachment holding the message body, so the body can be
//! consumed through the same path as any attached file.

use super::api::{Attachment, BodyType, MailApi, Message};
use super::folder::FolderHandle;
use crate::error::Result;
use chrono::{DateTime, Utc};
use futures::{Stream, TryStreamExt};
use std::sync::Arc;
use tracing::debug;

/// Content type reported for the synthetic body attachment.
pub const BODY_CONTENT_TYPE: &str = "email-body";

const BODY_ID_SUFFIX: &str = "-email-body";

/// Id of the synthetic body attachment of `message_id`.
#[must_use]
pub fn body_attachment_id(message_id: &str) -> String {
    format!("{message_id}{BODY_ID_SUFFIX}")
}

/// A message body presented as an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyAttachment {
    pub id: String,
    /// `EmailBody.html` or `EmailBody.txt`.
    pub name: String,
    /// UTF-8 bytes of the body.
    pub content: Vec<u8>,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl BodyAttachment {
    #[must_use]
    pub fn from_message(message: &Message) -> Self {
        let (body_type, text) = message
            .body
            .as_ref()
            .map_or((BodyType::Text, ""), |body| (body.content_type, body.content.as_str()));

        let name = match body_type {
            BodyType::Html => "EmailBody.html",
            BodyType::Text => "EmailBody.txt",
        };
        let content = text.as_bytes().to_vec();

        Self {
            id: body_attachment_id(&message.id),
            name: name.to_string(),
            size: content.len() as u64,
            content,
            last_modified: message.received_date_time,
        }
    }
}

/// Something retrievable from a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentCandidate {
    /// A file attachment stored on the server.
    Real(Attachment),
    /// The message body, already in memory.
    Body(BodyAttachment),
}

impl AttachmentCandidate {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Real(attachment) => &attachment.id,
            Self::Body(body) => &body.id,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Real(attachment) => &attachment.name,
            Self::Body(body) => &body.name,
        }
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::Real(attachment) => attachment.content_type.as_deref(),
            Self::Body(_) => Some(BODY_CONTENT_TYPE),
        }
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        match self {
            Self::Real(attachment) => attachment.size,
            Self::Body(body) => body.size,
        }
    }

    #[must_use]
    pub const fn last_modified(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Real(attachment) => attachment.last_modified_date_time,
            Self::Body(body) => body.last_modified,
        }
    }
}

/// A candidate together with the message that owns it.
pub type Candidate = (Arc<Message>, AttachmentCandidate);

/// Pair `message` with its retrievable attachments and its body.
///
/// Inline and non-file attachments are dropped here because the
/// server cannot filter on either property.
#[must_use]
pub fn candidates(message: &Arc<Message>, attachments: Vec<Attachment>) -> Vec<Candidate> {
    attachments
        .into_iter()
        .filter(Attachment::is_retrievable_file)
        .map(AttachmentCandidate::Real)
        .chain(std::iter::once(AttachmentCandidate::Body(
            BodyAttachment::from_message(message),
        )))
        .map(|candidate| (Arc::clone(message), candidate))
        .collect()
}

/// Expands messages into their candidates, one attachment listing per
/// message.
pub struct AttachmentEnumerator<'a, A: ?Sized> {
    api: &'a A,
    user: &'a str,
    folder: &'a FolderHandle,
}

impl<A: ?Sized> Clone for AttachmentEnumerator<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: ?Sized> Copy for AttachmentEnumerator<'_, A> {}

impl<'a, A: MailApi + ?Sized> AttachmentEnumerator<'a, A> {
    pub const fn new(api: &'a A, user: &'a str, folder: &'a FolderHandle) -> Self {
        Self { api, user, folder }
    }

    /// One element per input message, in input order. The attachment
    /// listing of a message is only requested when its element is
    /// polled.
    pub fn enumerate<S>(
        self,
        messages: S,
    ) -> impl Stream<Item = Result<Vec<Candidate>>> + Send + 'a
    where
        S: Stream<Item = Result<Message>> + Send + 'a,
    {
        messages.and_then(move |message| self.expand(message))
    }

    /// Candidates of a single message.
    ///
    /// # Errors
    ///
    /// Returns the API error of the attachment listing.
    pub async fn expand(self, message: Message) -> Result<Vec<Candidate>> {
        let attachments = self
            .api
            .list_attachments(self.user, self.folder.id(), &message.id)
            .await?;
        debug!(
            "Message {} lists {} attachment(s)",
            message.id,
            attachments.len()
        );
        Ok(candidates(&Arc::new(message), attachments))
    }
}
