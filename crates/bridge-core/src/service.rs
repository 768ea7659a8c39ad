//! Transport to the external decision service.
//!
//! Calls never block the game tick. Each request runs as a task on the runtime handle the
//! service was built with; the tick starts it and later collects the result from a
//! [`PendingPoll`].

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::agent::snapshot::SnapshotDocument;
use crate::agent::wire::PollResponse;
use crate::world::Progress;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {0}")]
    Status(StatusCode),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request task ended without a result")]
    Dropped,
}

/// Body of `POST /game/win`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WinNotice {
    pub event: String,
    pub ante: i64,
    pub round: i64,
    pub seed: String,
}

impl WinNotice {
    pub fn from_progress(progress: &Progress) -> Self {
        Self {
            event: "game_won".to_string(),
            ante: progress.ante,
            round: progress.round,
            seed: progress.seed.clone(),
        }
    }
}

/// A poll that was started on one tick and is collected on a later one.
#[derive(Debug)]
pub struct PendingPoll {
    rx: oneshot::Receiver<Result<PollResponse, TransportError>>,
}

impl PendingPoll {
    pub fn channel() -> (
        oneshot::Sender<Result<PollResponse, TransportError>>,
        PendingPoll,
    ) {
        let (tx, rx) = oneshot::channel();
        (tx, PendingPoll { rx })
    }

    /// A poll whose result is already known.
    pub fn ready(result: Result<PollResponse, TransportError>) -> PendingPoll {
        let (tx, poll) = Self::channel();
        let _ = tx.send(result);
        poll
    }

    /// Returns the result once the request finished. Never waits.
    pub fn try_take(&mut self) -> Option<Result<PollResponse, TransportError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(TransportError::Dropped)),
        }
    }
}

pub trait DecisionService: Send + Sync {
    /// Fire-and-forget `POST /state`. Failures are logged, not returned.
    fn publish_state(&self, document: &SnapshotDocument);

    /// Fire-and-forget `POST /game/win`.
    fn notify_win(&self, notice: &WinNotice);

    /// Starts one `GET /action`.
    fn request_action(&self) -> PendingPoll;
}

/// [`DecisionService`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpDecisionService {
    client: Client,
    base_url: String,
    runtime: Handle,
}

impl HttpDecisionService {
    pub fn new(base_url: &str, timeout: Duration, runtime: Handle) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            runtime,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn spawn_post(&self, path: &'static str, body: serde_json::Value) {
        let client = self.client.clone();
        let url = self.url(path);
        self.runtime.spawn(async move {
            match post_json(&client, &url, &body).await {
                Ok(()) => tracing::debug!(target: "bridge.service", path, "post delivered"),
                Err(err) => {
                    tracing::warn!(target: "bridge.service", path, error = %err, "post failed")
                }
            }
        });
    }
}

async fn post_json(client: &Client, url: &str, body: &serde_json::Value) -> Result<(), TransportError> {
    let res = client.post(url).json(body).send().await?;
    if !res.status().is_success() {
        return Err(TransportError::Status(res.status()));
    }
    Ok(())
}

async fn fetch_action(client: &Client, url: &str) -> Result<PollResponse, TransportError> {
    let res = client.get(url).send().await?;
    if res.status() != StatusCode::OK {
        return Err(TransportError::Status(res.status()));
    }
    let bytes = res.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

impl DecisionService for HttpDecisionService {
    fn publish_state(&self, document: &SnapshotDocument) {
        match serde_json::to_value(document) {
            Ok(body) => self.spawn_post("/state", body),
            Err(err) => {
                tracing::warn!(target: "bridge.service", error = %err, "state serialization failed")
            }
        }
    }

    fn notify_win(&self, notice: &WinNotice) {
        match serde_json::to_value(notice) {
            Ok(body) => self.spawn_post("/game/win", body),
            Err(err) => {
                tracing::warn!(target: "bridge.service", error = %err, "win serialization failed")
            }
        }
    }

    fn request_action(&self) -> PendingPoll {
        let (tx, poll) = PendingPoll::channel();
        let client = self.client.clone();
        let url = self.url("/action");
        self.runtime.spawn(async move {
            let _ = tx.send(fetch_action(&client, &url).await);
        });
        poll
    }
}
