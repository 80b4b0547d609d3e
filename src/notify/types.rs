//! Notification surface types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Channel kinds as reported by Discord
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    Text,
    Voice,
    Category,
    Announcement,
    Stage,
    Other(u8),
}

impl DestinationKind {
    /// Map Discord's numeric channel type
    pub fn from_discord_type(value: u8) -> Self {
        match value {
            0 => DestinationKind::Text,
            2 => DestinationKind::Voice,
            4 => DestinationKind::Category,
            5 => DestinationKind::Announcement,
            13 => DestinationKind::Stage,
            other => DestinationKind::Other(other),
        }
    }

    /// Only voice channels are used as price displays
    pub fn supports_rename(&self) -> bool {
        matches!(self, DestinationKind::Voice)
    }

    pub fn supports_post(&self) -> bool {
        !matches!(self, DestinationKind::Category)
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationKind::Text => write!(f, "text"),
            DestinationKind::Voice => write!(f, "voice"),
            DestinationKind::Category => write!(f, "category"),
            DestinationKind::Announcement => write!(f, "announcement"),
            DestinationKind::Stage => write!(f, "stage"),
            DestinationKind::Other(t) => write!(f, "type {}", t),
        }
    }
}

/// A resolved destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub id: String,
    /// Current display name
    pub name: String,
    pub kind: DestinationKind,
}

/// Bot identity returned by the ready handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub username: String,
}

/// Rich message presentation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub timestamp: DateTime<Utc>,
}

/// A message to post
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingMessage {
    Plain(String),
    Embed(Embed),
}

/// Failure to resolve or update a destination
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Destination {0} not found")]
    NotFound(String),
    #[error("Missing permission for destination {0}")]
    Forbidden(String),
    #[error("Bot token rejected")]
    Unauthorized,
    #[error("Cannot {operation} destination {id} of kind {kind}")]
    UnsupportedOperation {
        id: String,
        operation: &'static str,
        kind: DestinationKind,
    },
    #[error("Rate limited by notification surface")]
    RateLimited,
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Transport error: {0}")]
    Transport(String),
}

impl DispatchError {
    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::NotFound(_) => "not_found",
            DispatchError::Forbidden(_) => "forbidden",
            DispatchError::Unauthorized => "unauthorized",
            DispatchError::UnsupportedOperation { .. } => "unsupported_operation",
            DispatchError::RateLimited => "rate_limited",
            DispatchError::Http { .. } => "http",
            DispatchError::Transport(_) => "transport",
        }
    }
}

/// Where an instruction failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStage {
    /// Looking up the destination
    Resolve,
    /// Renaming or posting
    Apply,
}

/// Result of applying one instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied,
    /// Destination already shows this text; nothing sent
    Unchanged,
    Failed {
        stage: DispatchStage,
        error: DispatchError,
    },
}

impl DispatchOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, DispatchOutcome::Failed { .. })
    }
}
