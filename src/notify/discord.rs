//! Discord REST client
//!
//! Implements [`NotificationSurface`] over the Discord HTTP API. Only the
//! calls needed for channel renames and message posts are covered; the
//! gateway connection is not used.

use super::types::{Destination, DestinationKind, DispatchError, Embed, Identity, OutgoingMessage};
use super::NotificationSurface;
use crate::config::DiscordConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

/// Discord REST API base URL
pub const DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// Configuration for the Discord client
#[derive(Debug, Clone)]
pub struct DiscordClientConfig {
    /// Base URL for the REST API
    pub api_base: String,
    /// Bot token, sent as `Authorization: Bot <token>`
    pub token: String,
    /// Request timeout
    pub timeout: Duration,
}

impl DiscordClientConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_base: DISCORD_API_URL.to_string(),
            token: token.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn from_config(config: &DiscordConfig, token: impl Into<String>) -> Self {
        Self {
            api_base: config.api_base.clone(),
            token: token.into(),
            timeout: config.timeout(),
        }
    }
}

/// Client for the Discord REST API
pub struct DiscordClient {
    config: DiscordClientConfig,
    client: Client,
}

impl DiscordClient {
    pub fn new(config: DiscordClientConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(
                "DiscordBot (",
                env!("CARGO_PKG_NAME"),
                ", ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("Authorization", format!("Bot {}", self.config.token))
    }

    /// Send a request and map non-success statuses for destination `id`
    async fn send(&self, builder: RequestBuilder, id: &str) -> Result<Response, DispatchError> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body, id))
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, DispatchError> {
        response
            .json()
            .await
            .map_err(|e| DispatchError::Transport(format!("Invalid response body: {}", e)))
    }
}

#[async_trait]
impl NotificationSurface for DiscordClient {
    async fn ready(&self) -> Result<Identity, DispatchError> {
        let response = self
            .send(self.client.get(self.url("/users/@me")), "@me")
            .await?;
        let user: UserResponse = Self::json(response).await?;

        Ok(Identity {
            id: user.id,
            username: user.username,
        })
    }

    async fn fetch_destination(&self, id: &str) -> Result<Destination, DispatchError> {
        let url = self.url(&format!("/channels/{}", id));
        let response = self.send(self.client.get(url), id).await?;
        let channel: ChannelResponse = Self::json(response).await?;

        Ok(Destination {
            id: channel.id,
            name: channel.name.unwrap_or_default(),
            kind: DestinationKind::from_discord_type(channel.kind),
        })
    }

    async fn rename(&self, destination: &Destination, name: &str) -> Result<(), DispatchError> {
        let url = self.url(&format!("/channels/{}", destination.id));
        self.send(
            self.client.patch(url).json(&ModifyChannel { name }),
            &destination.id,
        )
        .await?;
        Ok(())
    }

    async fn send_message(
        &self,
        destination: &Destination,
        message: &OutgoingMessage,
    ) -> Result<(), DispatchError> {
        let url = self.url(&format!("/channels/{}/messages", destination.id));
        self.send(
            self.client.post(url).json(&CreateMessage::from(message)),
            &destination.id,
        )
        .await?;
        Ok(())
    }
}

/// Map a failed response to a dispatch error
fn classify_status(status: StatusCode, body: &str, id: &str) -> DispatchError {
    match status {
        StatusCode::NOT_FOUND => DispatchError::NotFound(id.to_string()),
        StatusCode::FORBIDDEN => DispatchError::Forbidden(id.to_string()),
        StatusCode::UNAUTHORIZED => DispatchError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => DispatchError::RateLimited,
        other => DispatchError::Http {
            status: other.as_u16(),
            body: body.chars().take(200).collect(),
        },
    }
}

/// `GET /users/@me` response
#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    username: String,
}

/// `GET /channels/{id}` response
#[derive(Debug, Deserialize)]
struct ChannelResponse {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    /// Absent for DM channels
    #[serde(default)]
    name: Option<String>,
}

/// `PATCH /channels/{id}` body
#[derive(Debug, Serialize)]
struct ModifyChannel<'a> {
    name: &'a str,
}

/// `POST /channels/{id}/messages` body
#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    embeds: Option<[&'a Embed; 1]>,
}

impl<'a> From<&'a OutgoingMessage> for CreateMessage<'a> {
    fn from(message: &'a OutgoingMessage) -> Self {
        match message {
            OutgoingMessage::Plain(text) => Self {
                content: Some(text.as_str()),
                embeds: None,
            },
            OutgoingMessage::Embed(embed) => Self {
                content: None,
                embeds: Some([embed]),
            },
        }
    }
}
