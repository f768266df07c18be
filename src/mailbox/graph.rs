//! Graph mail API over HTTPS
//!
//! Authenticates with the OAuth2 client-credentials flow and caches the
//! access token until shortly before it expires. Failed responses are
//! surfaced as [`Error::MailApi`] with the status and body untouched.

use super::api::{Attachment, MailApi, MailFolder, Message, MessageQuery};
use crate::config::GraphCredentials;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Response, Url, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info};

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tokens are refreshed this long before the server-side expiry.
const TOKEN_EXPIRY_SKEW_SECONDS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// [`MailApi`] backed by Microsoft Graph.
pub struct GraphClient {
    http: Client,
    credentials: GraphCredentials,
    token: Mutex<Option<AccessToken>>,
}

impl GraphClient {
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for blank credentials and
    /// [`Error::Config`] for an unparsable API base URL.
    pub fn new(credentials: GraphCredentials) -> Result<Self> {
        credentials.validate()?;
        Url::parse(&credentials.api_base)
            .map_err(|e| Error::Config(format!("Invalid Graph API base: {e}")))?;

        Ok(Self {
            http: Client::new(),
            credentials,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Utc::now()) {
            return Ok(token.value.clone());
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        let token_url = self.credentials.token_url();
        debug!("Requesting Graph access token from {}", token_url);

        let response = self
            .http
            .post(&token_url)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("scope", GRAPH_SCOPE),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let payload: TokenResponse = decode(check(response).await?).await?;
        info!("Obtained Graph access token");

        Ok(AccessToken {
            value: payload.access_token,
            expires_at: Utc::now()
                + Duration::seconds(payload.expires_in.saturating_sub(TOKEN_EXPIRY_SKEW_SECONDS)),
        })
    }

    /// `<api_base>/users/<user>/<segments...>`, each segment escaped.
    fn user_url(&self, user: &str, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.credentials.api_base)
            .map_err(|e| Error::Config(format!("Invalid Graph API base: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| Error::Config("Graph API base cannot hold a path".into()))?
            .pop_if_empty()
            .push("users")
            .push(user)
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<Response> {
        debug!("GET {}", url);
        let token = self.access_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        check(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        decode(self.get(url).await?).await
    }

    /// Every element of a collection, following `@odata.nextLink`.
    async fn get_all<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(url);

        while let Some(url) = next.take() {
            let page: Page<T> = self.get_json(url).await?;
            items.extend(page.value);
            next = page
                .next_link
                .map(|link| Url::parse(&link))
                .transpose()
                .map_err(|e| Error::Parse(format!("Invalid @odata.nextLink: {e}")))?;
        }

        Ok(items)
    }
}

/// Pass successful responses through; turn the rest into
/// [`Error::MailApi`].
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::MailApi {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| Error::Parse(e.to_string()))
}

#[async_trait]
impl MailApi for GraphClient {
    async fn child_folders(&self, user: &str, folder_id: &str) -> Result<Vec<MailFolder>> {
        let url = self.user_url(user, &["mailFolders", folder_id, "childFolders"])?;
        self.get_all(url).await
    }

    async fn list_messages(
        &self,
        user: &str,
        folder_id: &str,
        query: &MessageQuery,
    ) -> Result<Vec<Message>> {
        let mut url = self.user_url(user, &["mailFolders", folder_id, "messages"])?;
        if let Some(filter) = &query.filter {
            url.query_pairs_mut().append_pair("$filter", filter);
        }
        if let Some(skip) = query.skip {
            url.query_pairs_mut().append_pair("$skip", &skip.to_string());
        }
        let Some(top) = query.top else {
            return self.get_all(url).await;
        };
        url.query_pairs_mut().append_pair("$top", &top.to_string());

        let page: Page<Message> = self.get_json(url).await?;
        Ok(page.value)
    }

    async fn get_message(&self, user: &str, folder_id: &str, message_id: &str) -> Result<Message> {
        let url = self.user_url(user, &["mailFolders", folder_id, "messages", message_id])?;
        self.get_json(url).await
    }

    async fn list_attachments(
        &self,
        user: &str,
        folder_id: &str,
        message_id: &str,
    ) -> Result<Vec<Attachment>> {
        let url = self.user_url(
            user,
            &["mailFolders", folder_id, "messages", message_id, "attachments"],
        )?;
        self.get_all(url).await
    }

    async fn get_attachment(
        &self,
        user: &str,
        folder_id: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Attachment> {
        let url = self.user_url(
            user,
            &[
                "mailFolders",
                folder_id,
                "messages",
                message_id,
                "attachments",
                attachment_id,
            ],
        )?;
        self.get_json(url).await
    }

    async fn download_attachment(
        &self,
        user: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Vec<u8>> {
        let url = self.user_url(
            user,
            &["messages", message_id, "attachments", attachment_id, "$value"],
        )?;
        let bytes = self.get(url).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
