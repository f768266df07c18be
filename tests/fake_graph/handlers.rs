//! Resource handlers for the fake Graph server.
//!
//! Each handler answers one Graph resource from a snapshot of the
//! [`Mailbox`]. Collections come back as `{"value": [...]}` and are
//! split into pages when the mailbox sets a page limit.

use super::mailbox::Mailbox;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde_json::{Value, json};
use std::collections::HashMap;

/// Bearer token handed out by the token endpoint.
pub const ACCESS_TOKEN: &str = "fake-graph-token";

pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    pub fn json(status: u16, value: &Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: value.to_string().into_bytes(),
        }
    }

    pub fn bytes(content: &[u8]) -> Self {
        Self {
            status: 200,
            content_type: "application/octet-stream",
            body: content.to_vec(),
        }
    }

    /// Graph's error envelope.
    pub fn error(status: u16, code: &str, message: &str) -> Self {
        Self::json(
            status,
            &json!({ "error": { "code": code, "message": message } }),
        )
    }

    pub fn not_found(what: &str) -> Self {
        Self::error(404, "ErrorItemNotFound", &format!("{what} not found"))
    }
}

/// `POST /token` with a client-credentials form body.
pub fn handle_token(mailbox: &Mailbox, form: &HashMap<String, String>) -> Response {
    if form.get("grant_type").map(String::as_str) != Some("client_credentials") {
        return Response::json(400, &json!({ "error": "unsupported_grant_type" }));
    }
    if mailbox.reject_credentials {
        return Response::json(
            401,
            &json!({ "error": "invalid_client", "error_description": "bad secret" }),
        );
    }
    Response::json(
        200,
        &json!({ "token_type": "Bearer", "expires_in": 3600, "access_token": ACCESS_TOKEN }),
    )
}

pub fn handle_child_folders(
    mailbox: &Mailbox,
    folder_id: &str,
    query: &HashMap<String, String>,
    self_url: &str,
) -> Response {
    let children: Vec<Value> = mailbox
        .children(folder_id)
        .into_iter()
        .map(super::mailbox::Folder::to_json)
        .collect();
    Response::json(200, &paged(mailbox, children, query, self_url))
}

/// Messages of a folder, honouring `$filter` on `receivedDateTime`,
/// `$skip` and `$top`. Without `$top` the listing is split by the
/// mailbox page limit like any other collection.
pub fn handle_messages(
    mailbox: &Mailbox,
    folder_id: &str,
    query: &HashMap<String, String>,
    self_url: &str,
) -> Response {
    let Some(folder) = mailbox.folder(folder_id) else {
        return Response::not_found("Folder");
    };

    let skip = query
        .get("$skip")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let matching = folder
        .messages
        .iter()
        .filter(|m| {
            query
                .get("$filter")
                .is_none_or(|filter| matches_filter(m.received, filter))
        })
        .skip(skip);

    match query.get("$top").and_then(|v| v.parse().ok()) {
        Some(top) => {
            let messages: Vec<Value> = matching
                .take(top)
                .map(super::mailbox::TestMessage::to_json)
                .collect();
            Response::json(200, &json!({ "value": messages }))
        }
        None => {
            let messages = matching
                .map(super::mailbox::TestMessage::to_json)
                .collect();
            Response::json(200, &paged(mailbox, messages, query, self_url))
        }
    }
}

pub fn handle_message(mailbox: &Mailbox, folder_id: &str, message_id: &str) -> Response {
    mailbox
        .folder(folder_id)
        .and_then(|f| f.messages.iter().find(|m| m.id == message_id))
        .map_or_else(
            || Response::not_found("Message"),
            |m| Response::json(200, &m.to_json()),
        )
}

pub fn handle_attachments(
    mailbox: &Mailbox,
    message_id: &str,
    query: &HashMap<String, String>,
    self_url: &str,
) -> Response {
    let Some(message) = mailbox.message(message_id) else {
        return Response::not_found("Message");
    };
    let attachments = message
        .attachments
        .iter()
        .map(super::mailbox::TestAttachment::to_json)
        .collect();
    Response::json(200, &paged(mailbox, attachments, query, self_url))
}

pub fn handle_attachment(mailbox: &Mailbox, message_id: &str, attachment_id: &str) -> Response {
    mailbox
        .message(message_id)
        .and_then(|m| m.attachment(attachment_id))
        .map_or_else(
            || Response::not_found("Attachment"),
            |a| Response::json(200, &a.to_json()),
        )
}

/// Raw bytes of `/messages/{id}/attachments/{id}/$value`.
pub fn handle_attachment_value(
    mailbox: &Mailbox,
    message_id: &str,
    attachment_id: &str,
) -> Response {
    mailbox
        .message(message_id)
        .and_then(|m| m.attachment(attachment_id))
        .map_or_else(
            || Response::not_found("Attachment"),
            |a| Response::bytes(&a.content),
        )
}

/// One page of `values`, linking to the next through
/// `@odata.nextLink` when the mailbox has a page limit. The link keeps
/// the original query so a filtered listing stays filtered.
fn paged(
    mailbox: &Mailbox,
    values: Vec<Value>,
    query: &HashMap<String, String>,
    self_url: &str,
) -> Value {
    let Some(limit) = mailbox.page_limit else {
        return json!({ "value": values });
    };

    let start: usize = query
        .get("$skiptoken")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let end = (start + limit).min(values.len());
    let page: Vec<Value> = values
        .get(start..end)
        .map(<[Value]>::to_vec)
        .unwrap_or_default();

    if end < values.len() {
        json!({ "value": page, "@odata.nextLink": next_link(self_url, query, end) })
    } else {
        json!({ "value": page })
    }
}

fn next_link(self_url: &str, query: &HashMap<String, String>, skiptoken: usize) -> String {
    let mut url = Url::parse(self_url).expect("request URL");
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query.iter().filter(|(key, _)| *key != "$skiptoken") {
            pairs.append_pair(key, value);
        }
        pairs.append_pair("$skiptoken", &skiptoken.to_string());
    }
    url.into()
}

/// Evaluate `receivedDateTime gt X and receivedDateTime lt Y` style
/// filters. Unknown clauses match everything.
fn matches_filter(received: DateTime<Utc>, filter: &str) -> bool {
    filter.split(" and ").all(|clause| {
        let parts: Vec<&str> = clause.split_whitespace().collect();
        let [field, op, value] = parts.as_slice() else {
            return true;
        };
        let Ok(bound) = value.parse::<DateTime<Utc>>() else {
            return true;
        };
        match (*field, *op) {
            ("receivedDateTime", "gt") => received > bound,
            ("receivedDateTime", "lt") => received < bound,
            _ => true,
        }
    })
}
