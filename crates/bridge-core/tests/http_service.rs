mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::runtime::Handle;
use tokio::time::sleep;

use bridge_core::agent::{Decision, PollResponse};
use bridge_core::service::{DecisionService, HttpDecisionService, TransportError, WinNotice};
use bridge_core::world::Progress;

use common::{serve_router, wait_for};

fn service(base_url: &str) -> HttpDecisionService {
    HttpDecisionService::new(base_url, Duration::from_secs(2), Handle::current()).unwrap()
}

#[tokio::test]
async fn poll_reports_pending_then_ready() {
    let counter = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/action",
            get(|State(counter): State<Arc<AtomicUsize>>| async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Json(json!({ "status": "pending" }))
                } else {
                    Json(json!({ "status": "ready", "action": "discard", "positions": [2, 4] }))
                }
            }),
        )
        .with_state(counter.clone());
    let (base_url, handle) = serve_router(router).await;
    let service = service(&base_url);

    let mut first = service.request_action();
    assert_eq!(wait_for(&mut first).await.unwrap(), PollResponse::Pending);

    let mut second = service.request_action();
    assert_eq!(
        wait_for(&mut second).await.unwrap(),
        PollResponse::Ready(Decision::new("discard", vec![2, 4]))
    );
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    handle.abort();
}

#[tokio::test]
async fn non_ok_status_and_bad_json_are_transport_errors() {
    let router =
        Router::new().route("/action", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
    let (base_url, handle) = serve_router(router).await;
    let mut poll = service(&base_url).request_action();
    assert!(matches!(
        wait_for(&mut poll).await,
        Err(TransportError::Status(status)) if status.as_u16() == 503
    ));
    handle.abort();

    let router = Router::new().route("/action", get(|| async { "not json" }));
    let (base_url, handle) = serve_router(router).await;
    let mut poll = service(&base_url).request_action();
    assert!(matches!(
        wait_for(&mut poll).await,
        Err(TransportError::Decode(_))
    ));
    handle.abort();
}

#[tokio::test]
async fn unreachable_service_fails_without_blocking() {
    let service = service("http://127.0.0.1:9");
    let mut poll = service.request_action();
    assert!(poll.try_take().is_none());
    assert!(matches!(
        wait_for(&mut poll).await,
        Err(TransportError::Reqwest(_))
    ));
}

#[tokio::test]
async fn win_notice_is_posted_as_json() {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
    let router = Router::new()
        .route(
            "/game/win",
            post(
                |State(seen): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                    seen.lock().unwrap().push(body);
                    StatusCode::OK
                },
            ),
        )
        .with_state(seen.clone());
    let (base_url, handle) = serve_router(router).await;

    let progress = Progress {
        ante: 8,
        round: 24,
        seed: "7LB2WVPK".to_string(),
        won: true,
        ..Progress::default()
    };
    service(&format!("{base_url}/")).notify_win(&WinNotice::from_progress(&progress));

    for _ in 0..200 {
        if !seen.lock().unwrap().is_empty() {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        &[json!({ "event": "game_won", "ante": 8, "round": 24, "seed": "7LB2WVPK" })]
    );
    handle.abort();
}
