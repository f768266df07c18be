//! In-memory [`MailApi`] for unit tests
//!
//! Records every call as a short string (`"list_attachments m1"`) so
//! tests can assert exactly which remote requests were issued.

use super::api::{
    Attachment, BodyType, EmailAddress, FILE_ATTACHMENT_TYPE, ItemBody, MailApi, MailFolder,
    Message, MessageQuery, Recipient,
};
use super::folder::FolderHandle;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeMailApi {
    children: HashMap<String, Vec<MailFolder>>,
    messages: HashMap<String, Vec<Message>>,
    attachments: HashMap<String, Vec<Attachment>>,
    contents: HashMap<String, Vec<u8>>,
    failing_downloads: HashSet<String>,
    calls: Mutex<Vec<String>>,
    queries: Mutex<Vec<MessageQuery>>,
}

impl FakeMailApi {
    pub fn with_children(mut self, folder_id: &str, children: Vec<MailFolder>) -> Self {
        self.children.insert(folder_id.to_string(), children);
        self
    }

    pub fn with_messages(mut self, folder_id: &str, messages: Vec<Message>) -> Self {
        self.messages.insert(folder_id.to_string(), messages);
        self
    }

    pub fn with_attachments(mut self, message_id: &str, attachments: Vec<Attachment>) -> Self {
        self.attachments.insert(message_id.to_string(), attachments);
        self
    }

    pub fn with_content(mut self, attachment_id: &str, content: &[u8]) -> Self {
        self.contents.insert(attachment_id.to_string(), content.to_vec());
        self
    }

    pub fn failing_download(mut self, attachment_id: &str) -> Self {
        self.failing_downloads.insert(attachment_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<MessageQuery> {
        self.queries.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn not_found(what: &str) -> Error {
    Error::MailApi {
        status: 404,
        body: format!("{what} not found"),
    }
}

#[async_trait]
impl MailApi for FakeMailApi {
    async fn child_folders(&self, _user: &str, folder_id: &str) -> Result<Vec<MailFolder>> {
        self.record(format!("child_folders {folder_id}"));
        Ok(self.children.get(folder_id).cloned().unwrap_or_default())
    }

    async fn list_messages(
        &self,
        _user: &str,
        folder_id: &str,
        query: &MessageQuery,
    ) -> Result<Vec<Message>> {
        self.record(format!("list_messages {folder_id}"));
        self.queries.lock().unwrap().push(query.clone());
        let all = self.messages.get(folder_id).cloned().unwrap_or_default();
        Ok(all
            .into_iter()
            .skip(query.skip.unwrap_or(0))
            .take(query.top.unwrap_or(usize::MAX))
            .collect())
    }

    async fn get_message(&self, _user: &str, folder_id: &str, message_id: &str) -> Result<Message> {
        self.record(format!("get_message {message_id}"));
        self.messages
            .get(folder_id)
            .and_then(|messages| messages.iter().find(|m| m.id == message_id))
            .cloned()
            .ok_or_else(|| not_found(message_id))
    }

    async fn list_attachments(
        &self,
        _user: &str,
        _folder_id: &str,
        message_id: &str,
    ) -> Result<Vec<Attachment>> {
        self.record(format!("list_attachments {message_id}"));
        Ok(self.attachments.get(message_id).cloned().unwrap_or_default())
    }

    async fn get_attachment(
        &self,
        _user: &str,
        _folder_id: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Attachment> {
        self.record(format!("get_attachment {message_id} {attachment_id}"));
        self.attachments
            .get(message_id)
            .and_then(|attachments| attachments.iter().find(|a| a.id == attachment_id))
            .cloned()
            .ok_or_else(|| not_found(attachment_id))
    }

    async fn download_attachment(
        &self,
        _user: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Vec<u8>> {
        self.record(format!("download_attachment {message_id} {attachment_id}"));
        if self.failing_downloads.contains(attachment_id) {
            return Err(Error::MailApi {
                status: 503,
                body: "service unavailable".into(),
            });
        }
        self.contents
            .get(attachment_id)
            .cloned()
            .ok_or_else(|| not_found(attachment_id))
    }
}

pub fn folder(id: &str, display_name: &str) -> MailFolder {
    MailFolder {
        id: id.to_string(),
        display_name: display_name.to_string(),
    }
}

pub fn handle(id: &str) -> FolderHandle {
    FolderHandle::new(id)
}

/// A message with subject `Subject <id>`, sender `<id>@example.com`,
/// received 2024-01-15 09:00 UTC.
pub fn message(id: &str, body_type: BodyType, body: &str) -> Message {
    Message {
        id: id.to_string(),
        subject: Some(format!("Subject {id}")),
        from: Some(Recipient {
            email_address: EmailAddress {
                name: None,
                address: Some(format!("{id}@example.com")),
            },
        }),
        received_date_time: Some(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()),
        body: Some(ItemBody {
            content_type: body_type,
            content: body.to_string(),
        }),
    }
}

pub fn file_attachment(id: &str, name: &str) -> Attachment {
    Attachment {
        odata_type: Some(FILE_ATTACHMENT_TYPE.to_string()),
        id: id.to_string(),
        name: name.to_string(),
        content_type: Some("application/octet-stream".to_string()),
        size: 8,
        is_inline: Some(false),
        last_modified_date_time: None,
    }
}

pub fn inline_image(id: &str) -> Attachment {
    Attachment {
        name: format!("{id}.png"),
        content_type: Some("image/png".to_string()),
        is_inline: Some(true),
        ..file_attachment(id, "")
    }
}

pub fn item_attachment(id: &str) -> Attachment {
    Attachment {
        odata_type: Some("#microsoft.graph.itemAttachment".to_string()),
        name: "Forwarded message".to_string(),
        ..file_attachment(id, "")
    }
}
