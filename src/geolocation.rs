//! One-shot device location requests with a deadline
//!
//! A request subscribes to a [`LocationProvider`], waits for the first
//! position, and unsubscribes again on every exit path. Updates arriving
//! after the request settled are dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::GeolocationConfig;
use crate::models::Position;
use crate::{Result, SkycastError};

/// Something the platform location stream reports
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationEvent {
    Position(Position),
    /// Whether the platform can currently deliver positions
    Availability(bool),
}

/// Handle of an active provider subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Platform location stream
pub trait LocationProvider: Send + Sync {
    /// Start delivering events to `events` roughly every `interval`
    fn start_updates(
        &self,
        interval: Duration,
        events: mpsc::UnboundedSender<LocationEvent>,
    ) -> Result<SubscriptionId>;

    fn stop_updates(&self, id: SubscriptionId);
}

/// Unsubscribes when dropped
struct Subscription {
    provider: Arc<dyn LocationProvider>,
    id: SubscriptionId,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!("Stopping location updates for {:?}", self.id);
        self.provider.stop_updates(self.id);
    }
}

/// Lifecycle of a location request
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GeolocationState {
    #[default]
    Idle,
    Requesting,
    Resolved(Position),
    Unavailable,
    TimedOut,
}

impl GeolocationState {
    /// Position of a resolved request, otherwise why there is none
    pub fn into_position(self) -> Result<Position> {
        match self {
            GeolocationState::Resolved(position) => Ok(position),
            GeolocationState::TimedOut => Err(SkycastError::timeout(
                "No location update arrived before the deadline",
            )),
            GeolocationState::Unavailable => Err(SkycastError::unavailable(
                "Location services are off or no provider is running",
            )),
            GeolocationState::Idle | GeolocationState::Requesting => {
                Err(SkycastError::validation("Location request has not finished"))
            }
        }
    }
}

/// Issues one-shot location requests against a provider
#[derive(Clone)]
pub struct GeolocationRequester {
    provider: Arc<dyn LocationProvider>,
    interval: Duration,
    default_timeout: Duration,
    state: Arc<watch::Sender<GeolocationState>>,
}

impl GeolocationRequester {
    pub fn new(provider: Arc<dyn LocationProvider>, config: &GeolocationConfig) -> Self {
        Self {
            provider,
            interval: config.interval(),
            default_timeout: config.timeout(),
            state: Arc::new(watch::Sender::new(GeolocationState::Idle)),
        }
    }

    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn subscribe(&self) -> watch::Receiver<GeolocationState> {
        self.state.subscribe()
    }

    /// First position within `timeout`, or `None` when unavailable or timed out
    pub async fn request(&self, timeout: Duration) -> Option<Position> {
        match self.request_outcome(timeout).await.into_position() {
            Ok(position) => Some(position),
            Err(e) => {
                info!("No device position: {}", e);
                None
            }
        }
    }

    /// Like [`request`](Self::request) but returns the terminal state
    pub async fn request_outcome(&self, timeout: Duration) -> GeolocationState {
        self.state.send_replace(GeolocationState::Requesting);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = match self.provider.start_updates(self.interval, tx) {
            Ok(id) => {
                let subscription = Subscription {
                    provider: Arc::clone(&self.provider),
                    id,
                };
                let outcome = match tokio::time::timeout(timeout, first_position(&mut rx)).await {
                    Ok(Some(position)) => GeolocationState::Resolved(position),
                    Ok(None) => GeolocationState::Unavailable,
                    Err(_) => GeolocationState::TimedOut,
                };
                drop(subscription);
                outcome
            }
            Err(e) => {
                warn!("Failed to start location updates: {}", e);
                GeolocationState::Unavailable
            }
        };

        match outcome {
            GeolocationState::Resolved(position) => {
                debug!("Location resolved to {}", position.coordinates);
            }
            GeolocationState::TimedOut => {
                warn!("Location request timed out after {}ms", timeout.as_millis());
            }
            _ => warn!("Location became unavailable before a position arrived"),
        }
        self.state.send_replace(outcome);
        outcome
    }

    /// Run a request on a spawned task and hand the outcome to `callback`
    pub fn spawn_request<F>(&self, timeout: Duration, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Option<Position>) + Send + 'static,
    {
        let requester = self.clone();
        tokio::spawn(async move {
            let position = requester.request(timeout).await;
            callback(position);
        })
    }
}

/// Waits for the first position; `None` once availability is lost or the stream ends
async fn first_position(events: &mut mpsc::UnboundedReceiver<LocationEvent>) -> Option<Position> {
    while let Some(event) = events.recv().await {
        match event {
            LocationEvent::Position(position) => return Some(position),
            LocationEvent::Availability(false) => return None,
            LocationEvent::Availability(true) => {}
        }
    }
    None
}
