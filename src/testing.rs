//! In-memory fakes shared by unit tests

use crate::notify::{
    Destination, DestinationKind, DispatchError, Identity, NotificationSurface, OutgoingMessage,
};
use crate::price::{PriceSource, RawPrices, Sleeper, SourceError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Records requested sleeps without waiting
#[derive(Default)]
pub(crate) struct RecordingSleeper {
    pub(crate) slept: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

/// Replays scripted responses and records requested id lists
///
/// Once the script runs out, `fallback` is returned for every request.
pub(crate) struct ScriptedSource {
    pub(crate) responses: Mutex<VecDeque<Result<RawPrices, SourceError>>>,
    pub(crate) fallback: Result<RawPrices, SourceError>,
    pub(crate) requests: Mutex<Vec<Vec<String>>>,
}

impl ScriptedSource {
    pub(crate) fn new(responses: Vec<Result<RawPrices, SourceError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: Err(SourceError::Upstream("script exhausted".into())),
            requests: Mutex::default(),
        }
    }

    /// Answer every request with the same response
    pub(crate) fn always(response: Result<RawPrices, SourceError>) -> Self {
        Self {
            fallback: response,
            ..Self::new(vec![])
        }
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PriceSource for ScriptedSource {
    async fn simple_price(&self, ids: &[String]) -> Result<RawPrices, SourceError> {
        self.requests.lock().unwrap().push(ids.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Build a raw price body from JSON
pub(crate) fn raw(value: serde_json::Value) -> RawPrices {
    serde_json::from_value(value).unwrap()
}

/// In-memory surface recording every call
#[derive(Default)]
pub(crate) struct FakeSurface {
    pub(crate) destinations: Mutex<HashMap<String, Destination>>,
    pub(crate) failing_renames: Vec<String>,
    pub(crate) not_ready: bool,
    /// Simulated duration of each rename
    pub(crate) rename_delay: Duration,
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) posts: Mutex<Vec<(String, OutgoingMessage)>>,
    pub(crate) in_flight: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
}

impl FakeSurface {
    pub(crate) fn with(mut self, id: &str, name: &str, kind: DestinationKind) -> Self {
        self.destinations.get_mut().unwrap().insert(
            id.to_string(),
            Destination {
                id: id.to_string(),
                name: name.to_string(),
                kind,
            },
        );
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn name_of(&self, id: &str) -> String {
        self.destinations.lock().unwrap()[id].name.clone()
    }

    pub(crate) fn renames(&self) -> usize {
        self.calls().iter().filter(|c| c.starts_with("rename")).count()
    }
}

#[async_trait]
impl NotificationSurface for FakeSurface {
    async fn ready(&self) -> Result<Identity, DispatchError> {
        if self.not_ready {
            return Err(DispatchError::Unauthorized);
        }
        Ok(Identity {
            id: "1".to_string(),
            username: "ticker".to_string(),
        })
    }

    async fn fetch_destination(&self, id: &str) -> Result<Destination, DispatchError> {
        self.calls.lock().unwrap().push(format!("fetch {}", id));
        self.destinations
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| DispatchError::NotFound(id.to_string()))
    }

    async fn rename(&self, destination: &Destination, name: &str) -> Result<(), DispatchError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("rename {}", destination.id));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.rename_delay.is_zero() {
            tokio::time::sleep(self.rename_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_renames.contains(&destination.id) {
            return Err(DispatchError::Forbidden(destination.id.clone()));
        }
        if let Some(d) = self.destinations.lock().unwrap().get_mut(&destination.id) {
            d.name = name.to_string();
        }
        Ok(())
    }

    async fn send_message(
        &self,
        destination: &Destination,
        message: &OutgoingMessage,
    ) -> Result<(), DispatchError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("post {}", destination.id));
        self.posts
            .lock()
            .unwrap()
            .push((destination.id.clone(), message.clone()));
        Ok(())
    }
}
