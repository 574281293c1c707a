use super::*;
use crate::controller::EventStateController;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response as AxumResponse},
    routing::{delete, get, post, put},
    Json, Router,
};
use shared::{
    domain::Session,
    error::{ApiError, ErrorCode},
};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct MockApiState {
    event: Arc<Mutex<Option<EventDetails>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockApiState {
    async fn record(&self, request: String) {
        self.requests.lock().await.push(request);
    }
}

fn not_found(message: &str) -> AxumResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::new(ErrorCode::NotFound, message)),
    )
        .into_response()
}

async fn handle_get_event(
    State(state): State<MockApiState>,
    Path(event_id): Path<String>,
) -> AxumResponse {
    state.record(format!("GET /events/{event_id}")).await;
    match event_id.as_str() {
        "broken" => (StatusCode::OK, "{\"id\": 42").into_response(),
        "crash" => (StatusCode::INTERNAL_SERVER_ERROR, "upstream crashed").into_response(),
        _ => match state.event.lock().await.clone() {
            Some(event) if event.id.as_str() == event_id => Json(event).into_response(),
            _ => not_found("event not found"),
        },
    }
}

async fn handle_update_session(
    State(state): State<MockApiState>,
    Path(session_id): Path<String>,
    Json(request): Json<UpdateSessionTimesRequest>,
) -> AxumResponse {
    state.record(format!("PUT /sessions/{session_id}")).await;
    let mut event = state.event.lock().await;
    let session = event
        .as_mut()
        .and_then(|event| event.sessions.iter_mut().find(|s| s.id.as_str() == session_id));
    match session {
        Some(session) => {
            session.start_time = request.start_time;
            session.end_time = request.end_time;
            StatusCode::NO_CONTENT.into_response()
        }
        None => not_found("session not found"),
    }
}

async fn handle_add_attendee(
    State(state): State<MockApiState>,
    Path(event_id): Path<String>,
    Json(attendee): Json<Attendee>,
) -> AxumResponse {
    state.record(format!("POST /events/{event_id}/attendees")).await;
    if let Some(event) = state.event.lock().await.as_mut() {
        event.attendees.push(attendee.clone());
    }
    (StatusCode::CREATED, Json(attendee)).into_response()
}

async fn handle_remove_attendee(
    State(state): State<MockApiState>,
    Path((event_id, attendee_id)): Path<(String, String)>,
) -> AxumResponse {
    state
        .record(format!("DELETE /events/{event_id}/attendees/{attendee_id}"))
        .await;
    let mut event = state.event.lock().await;
    let Some(event) = event.as_mut() else {
        return not_found("event not found");
    };
    let before = event.attendees.len();
    event.attendees.retain(|a| a.id.as_str() != attendee_id);
    if event.attendees.len() == before {
        return not_found("attendee not found");
    }
    StatusCode::NO_CONTENT.into_response()
}

fn mock_router(state: MockApiState) -> Router {
    Router::new()
        .route("/events/:event_id", get(handle_get_event))
        .route("/sessions/:session_id", put(handle_update_session))
        .route("/events/:event_id/attendees", post(handle_add_attendee))
        .route(
            "/events/:event_id/attendees/:attendee_id",
            delete(handle_remove_attendee),
        )
        .with_state(state)
}

async fn spawn_event_api(prefix: &str) -> anyhow::Result<(ApiConfig, MockApiState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = MockApiState::default();
    *state.event.lock().await = Some(sample_event());
    let app = if prefix.is_empty() {
        mock_router(state.clone())
    } else {
        Router::new().nest(prefix, mock_router(state.clone()))
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let config = ApiConfig::new(&format!("http://{addr}{prefix}"))?;
    Ok((config, state))
}

fn sample_event() -> EventDetails {
    EventDetails {
        id: EventId::from("e1"),
        name: "RustConf".into(),
        sessions: vec![Session {
            id: SessionId::from("s1"),
            start_time: "2024-09-10T09:00:00Z".into(),
            end_time: "2024-09-10T10:00:00Z".into(),
        }],
        attendees: vec![
            Attendee::new(AttendeeId::from("a1"), "Ann", "ann@example.com"),
            Attendee::new(AttendeeId::from("a2"), "Bob", "bob@example.com"),
        ],
    }
}

fn client_error<T>(result: Result<T>) -> ControllerError {
    match result {
        Ok(_) => panic!("expected request to fail"),
        Err(err) => ControllerError::from(err),
    }
}

#[tokio::test]
async fn fetch_event_returns_server_payload() {
    let (config, _state) = spawn_event_api("").await.expect("spawn api");
    let api = HttpEventApi::new(config).expect("client");

    let details = api.fetch_event(&EventId::from("e1")).await.expect("fetch");
    assert_eq!(details, sample_event());
}

#[tokio::test]
async fn requests_respect_base_url_path_prefix() {
    let (config, state) = spawn_event_api("/api/v1").await.expect("spawn api");
    let api = HttpEventApi::new(config).expect("client");

    api.fetch_event(&EventId::from("e1")).await.expect("fetch");
    assert_eq!(*state.requests.lock().await, vec!["GET /events/e1"]);
}

#[tokio::test]
async fn not_found_surfaces_server_message() {
    let (config, _state) = spawn_event_api("").await.expect("spawn api");
    let api = HttpEventApi::new(config).expect("client");

    let err = client_error(api.fetch_event(&EventId::from("missing")).await);
    assert_eq!(
        err,
        ControllerError::Http {
            status: 404,
            message: Some("event not found".into())
        }
    );
}

#[tokio::test]
async fn plain_text_failure_is_generic() {
    let (config, _state) = spawn_event_api("").await.expect("spawn api");
    let api = HttpEventApi::new(config).expect("client");

    let err = client_error(api.fetch_event(&EventId::from("crash")).await);
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.message(), "request failed");
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let (config, _state) = spawn_event_api("").await.expect("spawn api");
    let api = HttpEventApi::new(config).expect("client");

    let err = client_error(api.fetch_event(&EventId::from("broken")).await);
    assert!(matches!(err, ControllerError::Decode(_)), "got {err:?}");
    assert!(!err.message().is_empty());
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let api = HttpEventApi::new(ApiConfig::new(&format!("http://{addr}")).expect("config"))
        .expect("client");

    let err = client_error(api.fetch_event(&EventId::from("e1")).await);
    assert!(matches!(err, ControllerError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn controller_round_trips_mutations_through_http() {
    let (config, state) = spawn_event_api("").await.expect("spawn api");
    let controller = EventStateController::open_http(config, "e1")
        .await
        .expect("controller");
    assert_eq!(controller.version(), 1);

    controller
        .update_session_times(
            &SessionId::from("s1"),
            "2024-09-10T11:00:00Z",
            "2024-09-10T12:00:00Z",
        )
        .await
        .expect("update");
    assert_eq!(
        controller
            .filter_sessions_by_time("2024-09-10T11:00:00Z")
            .len(),
        1
    );

    let carol = Attendee::new(AttendeeId::from("a3"), "Carol", "carol@example.com");
    controller.add_attendee(&carol).await.expect("add");
    controller
        .remove_attendee(&AttendeeId::from("a1"))
        .await
        .expect("remove");

    let details = controller.details().expect("details");
    assert_eq!(
        details
            .attendees
            .iter()
            .map(|a| a.id.as_str())
            .collect::<Vec<_>>(),
        vec!["a2", "a3"]
    );
    assert_eq!(controller.error(), None);
    assert_eq!(
        *state.requests.lock().await,
        vec![
            "GET /events/e1",
            "PUT /sessions/s1",
            "GET /events/e1",
            "POST /events/e1/attendees",
            "GET /events/e1",
            "DELETE /events/e1/attendees/a1",
            "GET /events/e1",
        ]
    );
}

#[tokio::test]
async fn controller_keeps_snapshot_when_removal_is_rejected() {
    let (config, _state) = spawn_event_api("").await.expect("spawn api");
    let controller = EventStateController::open_http(config, "e1")
        .await
        .expect("controller");

    let result = controller.remove_attendee(&AttendeeId::from("ghost")).await;

    assert!(result.is_err());
    assert_eq!(controller.error().as_deref(), Some("attendee not found"));
    assert_eq!(controller.details().expect("details").attendees.len(), 2);
    assert!(!controller.is_loading());
}
