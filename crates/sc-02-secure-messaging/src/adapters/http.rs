//! reqwest adapter for the REST API.
//!
//! Responses are JSON:API documents; the record lives under
//! `data.attributes` (or `data[].attributes` for collections). The bearer
//! token is read from the credential provider on every request so a rotated
//! or cleared token takes effect immediately.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_types::CredentialProvider;
use tracing::debug;

use crate::config::MessagingConfig;
use crate::domain::{Message, MessageId, NewMessage, UserId};
use crate::error::MessagingError;
use crate::ports::{KeyDirectory, MessageApi};

const MESSAGES_PATH: &str = "/api/v1/messages";
const USERS_PATH: &str = "/api/v1/users";

/// Longest error body quoted in [`MessagingError::Status`].
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Deserialize)]
struct Document<T> {
    data: Resource<T>,
}

#[derive(Debug, Deserialize)]
struct Collection<T> {
    data: Vec<Resource<T>>,
}

#[derive(Debug, Deserialize)]
struct Resource<T> {
    #[serde(default)]
    id: Option<serde_json::Value>,
    attributes: T,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    message: &'a NewMessage,
}

#[derive(Debug, Deserialize)]
struct UserAttributes {
    #[serde(default)]
    public_key: Option<String>,
}

/// HTTP client for messages and user keys.
pub struct HttpMessageApi {
    client: Client,
    config: MessagingConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpMessageApi {
    pub fn new(
        config: MessagingConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, MessagingError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(MessagingError::Http)?;

        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    /// Authorize, send and check the status of a request.
    async fn execute(&self, request: RequestBuilder) -> Result<Response, MessagingError> {
        let token = self
            .credentials
            .token()
            .ok_or(MessagingError::MissingCredential("session token"))?;

        let response = request.bearer_auth(token).send().await.map_err(|e| {
            if e.is_connect() {
                MessagingError::Connection(format!("Cannot connect to {}", self.config.api_base_url))
            } else {
                MessagingError::Http(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(MessagingError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MessagingError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }
        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, MessagingError> {
        response
            .json()
            .await
            .map_err(|e| MessagingError::Parse(e.to_string()))
    }

    async fn message(&self, request: RequestBuilder) -> Result<Message, MessagingError> {
        let document: Document<Message> = Self::parse(self.execute(request).await?).await?;
        Ok(into_message(document.data))
    }
}

#[async_trait]
impl MessageApi for HttpMessageApi {
    async fn send(&self, message: &NewMessage) -> Result<Message, MessagingError> {
        let url = self.config.endpoint(MESSAGES_PATH);
        debug!(recipient_id = message.recipient_id, "POST {}", MESSAGES_PATH);
        self.message(self.client.post(url).json(&SendRequest { message }))
            .await
    }

    async fn fetch(&self) -> Result<Vec<Message>, MessagingError> {
        let url = self.config.endpoint(MESSAGES_PATH);
        let response = self.execute(self.client.get(url)).await?;
        let collection: Collection<Message> = Self::parse(response).await?;
        Ok(collection.data.into_iter().map(into_message).collect())
    }

    async fn mark_as_read(&self, id: MessageId) -> Result<Message, MessagingError> {
        let url = self
            .config
            .endpoint(&format!("{MESSAGES_PATH}/{id}/mark_as_read"));
        self.message(self.client.post(url)).await
    }

    async fn revoke(&self, id: MessageId) -> Result<(), MessagingError> {
        let url = self.config.endpoint(&format!("{MESSAGES_PATH}/{id}/revoke"));
        self.execute(self.client.post(url)).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyDirectory for HttpMessageApi {
    async fn public_key(&self, user_id: UserId) -> Result<[u8; 32], MessagingError> {
        let url = self.config.endpoint(&format!("{USERS_PATH}/{user_id}"));
        let response = match self.execute(self.client.get(url)).await {
            Ok(response) => response,
            Err(MessagingError::Status { status: 404, .. }) => {
                return Err(MessagingError::UserNotFound(user_id))
            }
            Err(e) => return Err(e),
        };
        let document: Document<UserAttributes> = Self::parse(response).await?;
        let encoded = document
            .data
            .attributes
            .public_key
            .ok_or_else(|| MessagingError::InvalidPublicKey {
                user_id,
                reason: "no public key published".into(),
            })?;
        decode_public_key(user_id, &encoded)
    }
}

impl std::fmt::Debug for HttpMessageApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMessageApi")
            .field("api_base_url", &self.config.api_base_url)
            .finish()
    }
}

/// Records sometimes carry their id only at the resource level.
fn into_message(resource: Resource<Message>) -> Message {
    let mut message = resource.attributes;
    if message.id == 0 {
        let resource_id = resource.id.and_then(|id| match id {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        });
        if let Some(id) = resource_id {
            message.id = id;
        }
    }
    message
}

pub(crate) fn decode_public_key(user_id: UserId, encoded: &str) -> Result<[u8; 32], MessagingError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| MessagingError::InvalidPublicKey {
            user_id,
            reason: e.to_string(),
        })?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| MessagingError::InvalidPublicKey {
        user_id,
        reason: format!("expected 32 bytes, got {}", bytes.len()),
    })
}

/// Prefer the API's `{"error": "..."}` text over the raw body.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
            return error.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status.canonical_reason().unwrap_or("error").to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}
