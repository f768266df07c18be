//! Mail API surface consumed by the mailbox connector
//!
//! [`MailApi`] is the narrow set of operations the connector needs
//! from a cloud mail service. The model types mirror the JSON shapes
//! of the Graph mail resources so a transport can deserialize straight
//! into them.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OData type tag carried by plain file attachments.
pub const FILE_ATTACHMENT_TYPE: &str = "#microsoft.graph.fileAttachment";

/// Remote mail operations, addressed by mailbox owner and ids.
///
/// Folder ids may also be well-known folder names such as `Inbox`.
#[async_trait]
pub trait MailApi: Send + Sync {
    /// Immediate child folders of `folder_id`.
    async fn child_folders(&self, user: &str, folder_id: &str) -> Result<Vec<MailFolder>>;

    /// Messages in `folder_id`. Without `query.top` every server page
    /// is followed; with it only that single page is returned.
    async fn list_messages(
        &self,
        user: &str,
        folder_id: &str,
        query: &MessageQuery,
    ) -> Result<Vec<Message>>;

    async fn get_message(&self, user: &str, folder_id: &str, message_id: &str) -> Result<Message>;

    /// Attachment metadata of a message, in server order.
    async fn list_attachments(
        &self,
        user: &str,
        folder_id: &str,
        message_id: &str,
    ) -> Result<Vec<Attachment>>;

    async fn get_attachment(
        &self,
        user: &str,
        folder_id: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Attachment>;

    /// Raw bytes of a file attachment.
    async fn download_attachment(
        &self,
        user: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Vec<u8>>;
}

/// Server-side filter and paging parameters for a message listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageQuery {
    /// `$filter` expression; never `Some("")`.
    pub filter: Option<String>,
    pub skip: Option<usize>,
    pub top: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailFolder {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub from: Option<Recipient>,
    #[serde(default)]
    pub received_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub body: Option<ItemBody>,
}

impl Message {
    /// Sender address, empty when the message has none.
    #[must_use]
    pub fn sender(&self) -> &str {
        self.from
            .as_ref()
            .and_then(|from| from.email_address.address.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email_address: EmailAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    pub content_type: BodyType,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    Text,
    Html,
}

/// Attachment metadata as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(rename = "@odata.type", default)]
    pub odata_type: Option<String>,
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub is_inline: Option<bool>,
    #[serde(default)]
    pub last_modified_date_time: Option<DateTime<Utc>>,
}

impl Attachment {
    /// Inline parts (signatures, embedded images) and non-file
    /// attachments such as embedded mail items are not retrievable
    /// as files.
    #[must_use]
    pub fn is_retrievable_file(&self) -> bool {
        !self.is_inline.unwrap_or(false)
            && self.odata_type.as_deref() == Some(FILE_ATTACHMENT_TYPE)
    }
}
