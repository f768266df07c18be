//! Materialized mailbox items

use super::api::{MailApi, Message};
use super::attachment::AttachmentCandidate;
use crate::error::{Result, require};
use crate::source::RetrievedItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Compound key of a mailbox item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentKey {
    pub message_id: String,
    pub attachment_id: String,
}

impl AttachmentKey {
    #[must_use]
    pub fn new(message_id: impl Into<String>, attachment_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            attachment_id: attachment_id.into(),
        }
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] when either id is blank.
    pub fn validate(&self) -> Result<()> {
        require(&self.message_id, "message_id")?;
        require(&self.attachment_id, "attachment_id")?;
        Ok(())
    }
}

/// An attachment (or message body) with its bytes.
#[derive(Debug, Clone)]
pub struct AttachmentItem {
    key: AttachmentKey,
    message: Arc<Message>,
    attachment: AttachmentCandidate,
    content: Vec<u8>,
}

impl AttachmentItem {
    #[must_use]
    pub fn message(&self) -> &Message {
        &self.message
    }

    #[must_use]
    pub const fn attachment(&self) -> &AttachmentCandidate {
        &self.attachment
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        self.message.subject.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn sender(&self) -> &str {
        self.message.sender()
    }

    #[must_use]
    pub fn received(&self) -> Option<DateTime<Utc>> {
        self.message.received_date_time
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        self.attachment.name()
    }

    /// Whether this item is the synthetic body attachment.
    #[must_use]
    pub const fn is_body(&self) -> bool {
        matches!(self.attachment, AttachmentCandidate::Body(_))
    }

    #[must_use]
    pub fn into_content(self) -> Vec<u8> {
        self.content
    }
}

impl RetrievedItem for AttachmentItem {
    type Key = AttachmentKey;

    fn key(&self) -> &AttachmentKey {
        &self.key
    }

    fn content(&self) -> &[u8] {
        &self.content
    }
}

impl fmt::Display for AttachmentItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' from '{}' on ", self.subject(), self.sender())?;
        match self.received() {
            Some(received) => write!(f, "{}", received.format("%Y-%m-%d %H:%M:%S"))?,
            None => f.write_str("-")?,
        }
        write!(f, " -> '{}'", self.file_name())
    }
}

/// Turn a candidate into an item holding its bytes.
///
/// A body candidate is wrapped as is. A real attachment costs one
/// download request, buffered in full before returning.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidArgument`] when an id needed to
/// address the download is blank, or the API error of the download.
pub async fn materialize<A: MailApi + ?Sized>(
    api: &A,
    user: &str,
    message: Arc<Message>,
    candidate: AttachmentCandidate,
) -> Result<AttachmentItem> {
    let key = AttachmentKey::new(message.id.clone(), candidate.id());
    key.validate()?;

    let content = match &candidate {
        AttachmentCandidate::Body(body) => body.content.clone(),
        AttachmentCandidate::Real(attachment) => {
            let bytes = api
                .download_attachment(user, &message.id, &attachment.id)
                .await?;
            debug!(
                "Downloaded attachment '{}' ({} bytes) of message {}",
                attachment.name,
                bytes.len(),
                message.id
            );
            bytes
        }
    };

    Ok(AttachmentItem {
        key,
        message,
        attachment: candidate,
        content,
    })
}
