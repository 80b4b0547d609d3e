//! Target dispatcher
//!
//! Applies instructions one by one. A failing target is recorded and the
//! batch moves on; every outcome is returned to the caller.

use super::types::{
    Destination, DispatchError, DispatchOutcome, DispatchStage, Embed, Identity, OutgoingMessage,
};
use super::NotificationSurface;
use crate::config::{DiscordConfig, MessageFormat, TargetKind};
use crate::plan::UpdateInstruction;
use crate::price::{Sleeper, TokioSleeper};
use crate::telemetry::{self, CounterMetric};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Presentation used for `post` targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageStyle {
    pub format: MessageFormat,
    pub title: String,
    pub color: u32,
}

impl Default for MessageStyle {
    fn default() -> Self {
        Self {
            format: MessageFormat::Plain,
            title: "Price update".to_string(),
            color: 0xF1C40F,
        }
    }
}

impl From<&DiscordConfig> for MessageStyle {
    fn from(config: &DiscordConfig) -> Self {
        Self {
            format: config.message_format,
            title: config.embed_title.clone(),
            color: config.embed_color,
        }
    }
}

impl MessageStyle {
    fn message(&self, text: &str) -> OutgoingMessage {
        match self.format {
            MessageFormat::Plain => OutgoingMessage::Plain(text.to_string()),
            MessageFormat::Embed => OutgoingMessage::Embed(Embed {
                title: self.title.clone(),
                description: text.to_string(),
                color: self.color,
                timestamp: Utc::now(),
            }),
        }
    }
}

/// Applies update instructions against a notification surface
pub struct TargetDispatcher<S> {
    surface: S,
    style: MessageStyle,
    pause_between: Duration,
    sleeper: Arc<dyn Sleeper>,
    dedupe_posts: bool,
    /// Last text successfully posted, per (target id, token id)
    last_posted: Mutex<HashMap<(String, String), String>>,
}

impl<S: NotificationSurface> TargetDispatcher<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            style: MessageStyle::default(),
            pause_between: Duration::ZERO,
            sleeper: Arc::new(TokioSleeper),
            dedupe_posts: true,
            last_posted: Mutex::new(HashMap::new()),
        }
    }

    /// Create a dispatcher using the `[discord]` settings
    pub fn from_config(surface: S, config: &DiscordConfig) -> Self {
        Self::new(surface)
            .with_style(MessageStyle::from(config))
            .with_pause(config.pause_between())
            .with_dedupe(config.dedupe_posts)
    }

    pub fn with_style(mut self, style: MessageStyle) -> Self {
        self.style = style;
        self
    }

    /// Pause between consecutive instructions
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause_between = pause;
        self
    }

    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe_posts = dedupe;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Wait for the surface's ready handshake
    pub async fn ready(&self) -> Result<Identity, DispatchError> {
        self.surface.ready().await
    }

    /// Apply every instruction in order, returning one outcome per instruction
    pub async fn dispatch(&self, instructions: &[UpdateInstruction]) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::with_capacity(instructions.len());
        let mut wrote_last = false;

        for instruction in instructions {
            // Pause only after a call that changed something remotely
            if wrote_last && !self.pause_between.is_zero() {
                self.sleeper.sleep(self.pause_between).await;
            }

            let outcome = self.apply(instruction).await;
            report(instruction, &outcome);
            wrote_last = sent_write(&outcome);
            outcomes.push(outcome);
        }

        outcomes
    }

    async fn apply(&self, instruction: &UpdateInstruction) -> DispatchOutcome {
        let target = &instruction.target;

        if target.kind == TargetKind::Post && self.is_duplicate_post(instruction).await {
            return DispatchOutcome::Unchanged;
        }

        let destination = match self.surface.fetch_destination(&target.id).await {
            Ok(destination) => destination,
            Err(error) => {
                return DispatchOutcome::Failed {
                    stage: DispatchStage::Resolve,
                    error,
                }
            }
        };

        let result = match target.kind {
            TargetKind::Rename => self.rename(&destination, &instruction.text).await,
            TargetKind::Post => self.post(&destination, instruction).await,
        };

        match result {
            Ok(outcome) => outcome,
            Err(error) => DispatchOutcome::Failed {
                stage: DispatchStage::Apply,
                error,
            },
        }
    }

    async fn rename(
        &self,
        destination: &Destination,
        text: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        if !destination.kind.supports_rename() {
            return Err(DispatchError::UnsupportedOperation {
                id: destination.id.clone(),
                operation: "rename",
                kind: destination.kind,
            });
        }

        if destination.name == text {
            return Ok(DispatchOutcome::Unchanged);
        }

        self.surface.rename(destination, text).await?;
        Ok(DispatchOutcome::Applied)
    }

    async fn post(
        &self,
        destination: &Destination,
        instruction: &UpdateInstruction,
    ) -> Result<DispatchOutcome, DispatchError> {
        if !destination.kind.supports_post() {
            return Err(DispatchError::UnsupportedOperation {
                id: destination.id.clone(),
                operation: "post to",
                kind: destination.kind,
            });
        }

        let message = self.style.message(&instruction.text);
        self.surface.send_message(destination, &message).await?;

        if self.dedupe_posts {
            self.last_posted
                .lock()
                .await
                .insert(post_key(instruction), instruction.text.clone());
        }

        Ok(DispatchOutcome::Applied)
    }

    async fn is_duplicate_post(&self, instruction: &UpdateInstruction) -> bool {
        if !self.dedupe_posts {
            return false;
        }

        let last_posted = self.last_posted.lock().await;
        last_posted.get(&post_key(instruction)) == Some(&instruction.text)
    }
}

/// Dedupe key: one channel may carry several tokens in broadcast mode
fn post_key(instruction: &UpdateInstruction) -> (String, String) {
    (
        instruction.target.id.clone(),
        instruction.token_id.clone(),
    )
}

/// Whether applying the instruction sent a rename or post call
fn sent_write(outcome: &DispatchOutcome) -> bool {
    match outcome {
        DispatchOutcome::Applied => true,
        DispatchOutcome::Unchanged => false,
        DispatchOutcome::Failed { stage, error } => {
            *stage == DispatchStage::Apply
                && !matches!(error, DispatchError::UnsupportedOperation { .. })
        }
    }
}

fn report(instruction: &UpdateInstruction, outcome: &DispatchOutcome) {
    let target = instruction.target.id.as_str();
    let token = instruction.token_id.as_str();

    match outcome {
        DispatchOutcome::Applied => {
            telemetry::increment(CounterMetric::DispatchApplied);
            tracing::info!(
                target_id = target,
                token,
                kind = ?instruction.target.kind,
                text = %instruction.text,
                "Target updated"
            );
        }
        DispatchOutcome::Unchanged => {
            telemetry::increment(CounterMetric::DispatchUnchanged);
            tracing::debug!(target_id = target, token, "Target already up to date");
        }
        DispatchOutcome::Failed { stage, error } => {
            telemetry::increment(CounterMetric::DispatchFailed);
            tracing::warn!(
                target_id = target,
                token,
                ?stage,
                kind = error.kind(),
                error = %error,
                "Target update failed"
            );
        }
    }
}
