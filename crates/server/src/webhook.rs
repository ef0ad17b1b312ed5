use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use chatrelay_telegram::events::{correlation_id, parse_update};
use chatrelay_telegram::UpdateDispatcher;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::health::{health, HealthState};

pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Counts relay tasks still running so shutdown can wait for them.
#[derive(Clone, Default)]
pub struct InFlight {
    count: Arc<AtomicUsize>,
}

pub struct InFlightGuard {
    count: Arc<AtomicUsize>,
}

impl InFlight {
    pub fn enter(&self) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard { count: Arc::clone(&self.count) }
    }

    pub fn current(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Waits until no task is in flight or `limit` elapses; returns the
    /// number of tasks abandoned.
    pub async fn drain(&self, limit: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + limit;
        while self.current() > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.current()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct WebhookState {
    pub dispatcher: Arc<UpdateDispatcher>,
    pub secret_token: Option<SecretString>,
    pub in_flight: InFlight,
}

pub fn router(state: WebhookState, webhook_path: &str) -> Router {
    let health_state = HealthState { runtime: Arc::clone(state.dispatcher.runtime()) };
    Router::new()
        .route(webhook_path, post(receive_update))
        .with_state(state)
        .merge(Router::new().route("/health", get(health)).with_state(health_state))
}

/// Acknowledges every authenticated delivery immediately and relays it on
/// a background task. Telegram retries non-2xx answers, so undecodable
/// bodies are acknowledged as well.
pub async fn receive_update(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if !secret_matches(state.secret_token.as_ref(), &headers) {
        warn!(
            event_name = "telegram.webhook.unauthorized",
            correlation_id = "webhook",
            "rejecting webhook call with missing or wrong secret token"
        );
        return StatusCode::UNAUTHORIZED;
    }

    let update = match parse_update(&body) {
        Ok(update) => update,
        Err(error) => {
            warn!(
                event_name = "telegram.webhook.undecodable",
                correlation_id = %uuid::Uuid::new_v4(),
                body_bytes = body.len(),
                error = %error,
                "acknowledging undecodable update"
            );
            return StatusCode::OK;
        }
    };

    debug!(
        event_name = "telegram.webhook.received",
        correlation_id = %correlation_id(&update),
        "update accepted"
    );

    let guard = state.in_flight.enter();
    let dispatcher = Arc::clone(&state.dispatcher);
    tokio::spawn(async move {
        let _guard = guard;
        let outcome = dispatcher.dispatch(&update).await;
        info!(
            event_name = "telegram.webhook.dispatched",
            correlation_id = %correlation_id(&update),
            outcome = ?outcome,
            "update processed"
        );
    });

    StatusCode::OK
}

fn secret_matches(expected: Option<&SecretString>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    let Some(provided) = headers.get(SECRET_TOKEN_HEADER) else {
        return false;
    };
    constant_time_eq(expected.expose_secret().as_bytes(), provided.as_bytes())
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter().zip(right).fold(0_u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chatrelay_core::ConversationKey;
    use tower::ServiceExt;

    use super::{router, InFlight, WebhookState, SECRET_TOKEN_HEADER};
    use crate::test_support::{dispatcher, RecordingSink};

    fn state(sink: Arc<RecordingSink>, secret: Option<&str>) -> WebhookState {
        WebhookState {
            dispatcher: Arc::new(dispatcher(sink)),
            secret_token: secret.map(|value| value.to_owned().into()),
            in_flight: InFlight::default(),
        }
    }

    fn update_body(text: &str) -> String {
        serde_json::json!({
            "update_id": 900,
            "message": {
                "message_id": 12,
                "from": {"id": 33, "is_bot": false, "first_name": "Kim"},
                "chat": {"id": 33, "type": "private"},
                "text": text
            }
        })
        .to_string()
    }

    fn post(body: String, secret: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json");
        if let Some(secret) = secret {
            builder = builder.header(SECRET_TOKEN_HEADER, secret);
        }
        builder.body(Body::from(body)).expect("request builds")
    }

    async fn wait_for_sends(sink: &RecordingSink, expected: usize) -> Vec<(ConversationKey, String)> {
        for _ in 0..200 {
            let sent = sink.sent.lock().await.clone();
            if sent.len() >= expected {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        sink.sent.lock().await.clone()
    }

    #[tokio::test]
    async fn update_is_acknowledged_and_relayed_in_background() {
        let sink = Arc::new(RecordingSink::default());
        let app = router(state(sink.clone(), None), "/webhook");

        let response =
            app.oneshot(post(update_body("hello there"), None)).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let sent = wait_for_sends(&sink, 1).await;
        assert_eq!(sent, vec![(ConversationKey::from(33), "Keep pushing.".to_owned())]);
    }

    #[tokio::test]
    async fn wrong_or_missing_secret_is_unauthorized() {
        let sink = Arc::new(RecordingSink::default());
        let app = router(state(sink.clone(), Some("s3cret")), "/webhook");

        let missing = app.clone().oneshot(post(update_body("hi"), None)).await.expect("response");
        let wrong =
            app.clone().oneshot(post(update_body("hi"), Some("guess"))).await.expect("response");
        let right = app.oneshot(post(update_body("hi"), Some("s3cret"))).await.expect("response");

        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(right.status(), StatusCode::OK);
        assert_eq!(wait_for_sends(&sink, 1).await.len(), 1);
    }

    #[tokio::test]
    async fn undecodable_body_is_acknowledged_and_dropped() {
        let sink = Arc::new(RecordingSink::default());
        let app = router(state(sink.clone(), None), "/webhook");

        let response = app.oneshot(post("{\"nope\":".to_owned(), None)).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sink.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn health_route_is_served_alongside_webhook() {
        let sink = Arc::new(RecordingSink::default());
        let app = router(state(sink, None), "/webhook");

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_waits_for_in_flight_tasks_up_to_limit() {
        let in_flight = InFlight::default();
        let guard = in_flight.enter();
        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(guard);
        });

        assert_eq!(in_flight.drain(Duration::from_secs(5)).await, 0);
        release.await.expect("release task");

        let _stuck = in_flight.enter();
        assert_eq!(in_flight.drain(Duration::from_secs(1)).await, 1);
    }
}
