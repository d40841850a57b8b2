use super::*;
use axum::{body, body::Body, http::Request, response::Response};
use tower::ServiceExt;

fn test_app() -> Router {
    let api = ApiContext::new(ReadingLimits::default(), Celsius(30.0));
    let (events, _) = broadcast::channel(32);
    build_router(Arc::new(AppState { api, events }))
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

async fn create_session(app: &Router) -> SessionSummary {
    let request = Request::post("/sessions")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await
}

async fn post_reading(app: &Router, session_id: SessionId, value: f64) -> Response {
    let request = Request::post(format!("/sessions/{session_id}/readings"))
        .header("content-type", "application/json")
        .body(Body::from(format!("{{\"value\":{value}}}")))
        .expect("request");
    app.clone().oneshot(request).await.expect("response")
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = test_app();
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn new_sessions_start_with_the_three_builtin_observers() {
    let app = test_app();
    let session = create_session(&app).await;
    assert_eq!(session.observers, vec!["display", "logger", "alarm"]);
    assert_eq!(session.current_value, Celsius(0.0));
}

#[tokio::test]
async fn readings_build_history_and_raise_the_alarm_above_threshold() {
    let app = test_app();
    let session = create_session(&app).await;

    let response = post_reading(&app, session.session_id, 25.0).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report: ReadingReport = json_body(response).await;
    assert_eq!(report.reactions.len(), 2);
    assert!(!report.alarm_raised());

    let response = post_reading(&app, session.session_id, 35.0).await;
    let report: ReadingReport = json_body(response).await;
    assert!(report.alarm_raised());

    let request = Request::get(format!("/sessions/{}/history", session.session_id))
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let history: Vec<LogEntry> = json_body(response).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].value, Celsius(25.0));
    assert_eq!(history[1].value, Celsius(35.0));
}

#[tokio::test]
async fn out_of_range_readings_are_rejected_with_bad_request() {
    let app = test_app();
    let session = create_session(&app).await;

    let response = post_reading(&app, session.session_id, 140.0).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ApiError = json_body(response).await;
    assert_eq!(error.code, ErrorCode::Validation);
}

#[tokio::test]
async fn detaching_the_alarm_twice_returns_not_found() {
    let app = test_app();
    let session = create_session(&app).await;

    let detach = |app: &Router| {
        let request = Request::delete(format!(
            "/sessions/{}/observers/alarm",
            session.session_id
        ))
        .body(Body::empty())
        .expect("request");
        app.clone().oneshot(request)
    };

    let response = detach(&app).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let summary: SessionSummary = json_body(response).await;
    assert_eq!(summary.observers, vec!["display", "logger"]);

    let response = detach(&app).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reattaching_an_observer_appends_it_to_the_order() {
    let app = test_app();
    let session = create_session(&app).await;

    let request = Request::delete(format!(
        "/sessions/{}/observers/display",
        session.session_id
    ))
    .body(Body::empty())
    .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::post(format!("/sessions/{}/observers", session.session_id))
        .header("content-type", "application/json")
        .body(Body::from("{\"kind\":\"display\"}"))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let summary: SessionSummary = json_body(response).await;
    assert_eq!(summary.observers, vec!["logger", "alarm", "display"]);
}

#[tokio::test]
async fn unknown_observer_kinds_are_a_validation_error() {
    let app = test_app();
    let session = create_session(&app).await;

    let request = Request::delete(format!(
        "/sessions/{}/observers/furnace",
        session.session_id
    ))
    .body(Body::empty())
    .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_sessions_return_not_found() {
    let app = test_app();
    let missing = SessionId::generate();

    let request = Request::get(format!("/sessions/{missing}"))
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_reading(&app, missing, 20.0).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dropped_sessions_disappear_from_the_registry() {
    let app = test_app();
    let session = create_session(&app).await;

    let request = Request::delete(format!("/sessions/{}", session.session_id))
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let request = Request::get("/sessions").body(Body::empty()).expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let sessions: Vec<SessionSummary> = json_body(response).await;
    assert!(sessions.is_empty());
}
