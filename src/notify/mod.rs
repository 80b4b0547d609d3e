//! Notification module
//!
//! Applies update instructions to Discord channels

mod discord;
mod dispatcher;
mod types;

pub use discord::{DiscordClient, DiscordClientConfig, DISCORD_API_URL};
pub use dispatcher::{MessageStyle, TargetDispatcher};
pub use types::{
    Destination, DestinationKind, DispatchError, DispatchOutcome, DispatchStage, Embed, Identity,
    OutgoingMessage,
};

use async_trait::async_trait;

/// Trait for notification surface implementations
#[async_trait]
pub trait NotificationSurface: Send + Sync {
    /// Establish the bot identity; must succeed before any update
    async fn ready(&self) -> Result<Identity, DispatchError>;
    /// Look up a destination by id
    async fn fetch_destination(&self, id: &str) -> Result<Destination, DispatchError>;
    /// Set the destination's display name
    async fn rename(&self, destination: &Destination, name: &str) -> Result<(), DispatchError>;
    /// Post a message to the destination
    async fn send_message(
        &self,
        destination: &Destination,
        message: &OutgoingMessage,
    ) -> Result<(), DispatchError>;
}

#[async_trait]
impl<T: NotificationSurface + ?Sized> NotificationSurface for std::sync::Arc<T> {
    async fn ready(&self) -> Result<Identity, DispatchError> {
        (**self).ready().await
    }

    async fn fetch_destination(&self, id: &str) -> Result<Destination, DispatchError> {
        (**self).fetch_destination(id).await
    }

    async fn rename(&self, destination: &Destination, name: &str) -> Result<(), DispatchError> {
        (**self).rename(destination, name).await
    }

    async fn send_message(
        &self,
        destination: &Destination,
        message: &OutgoingMessage,
    ) -> Result<(), DispatchError> {
        (**self).send_message(destination, message).await
    }
}
