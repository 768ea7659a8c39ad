#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::time::sleep;

use bridge_core::agent::PollResponse;
use bridge_core::service::{PendingPoll, TransportError};

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve_router(router: Router) -> (String, tokio::task::JoinHandle<()>) {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let actual_addr = listener.local_addr().unwrap();
    let base_url = format!("http://{actual_addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .unwrap();
    });

    sleep(Duration::from_millis(50)).await;
    (base_url, handle)
}

pub async fn wait_for(poll: &mut PendingPoll) -> Result<PollResponse, TransportError> {
    for _ in 0..200 {
        if let Some(result) = poll.try_take() {
            return result;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("poll never completed");
}
