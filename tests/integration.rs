use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;
use van_dispatch::api::rest::router;
use van_dispatch::state::AppState;

/// Terminal clock set so it reads about noon right now, keeping local
/// midnight (and a change of "today") hours away from any test run.
fn new_state() -> Arc<AppState> {
    let seconds_since_utc_midnight = Utc::now().num_seconds_from_midnight() as i32;
    let offset = FixedOffset::east_opt(12 * 3600 - seconds_since_utc_midnight).unwrap();
    Arc::new(AppState::new(1024, offset))
}

fn setup() -> (axum::Router, Arc<AppState>) {
    let state = new_state();
    (router(state.clone()), state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn create_operator(app: &axum::Router, plate: &str, firstname: &str) -> String {
    let (status, driver) = send(
        app,
        json_request(
            "POST",
            "/drivers",
            json!({ "firstname": firstname, "lastname": "Dela Cruz", "contact": "0917" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, van) = send(app, json_request("POST", "/vans", json!({ "plate_number": plate }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, operator) = send(
        app,
        json_request(
            "POST",
            "/operators",
            json!({ "van_id": van["id"], "driver_id": driver["id"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    operator["id"].as_str().unwrap().to_string()
}

async fn create_todays_schedule(app: &axum::Router, state: &AppState) -> String {
    let today = state.local_date(Utc::now());
    let (status, schedule) = send(
        app,
        json_request(
            "POST",
            "/schedules",
            json!({ "date": today.to_string(), "start_time": "05:00:00", "end_time": "19:00:00" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    schedule["id"].as_str().unwrap().to_string()
}

/// Today's schedule with `count` idle vans at terminal1; returns assignment ids.
async fn fleet_at_terminal1(app: &axum::Router, state: &AppState, count: usize) -> Vec<String> {
    let schedule_id = create_todays_schedule(app, state).await;

    let mut operator_ids = Vec::new();
    for i in 0..count {
        operator_ids.push(create_operator(app, &format!("LAB-{i:03}"), &format!("Driver{i}")).await);
    }

    let (status, created) = send(
        app,
        json_request(
            "POST",
            &format!("/schedules/{schedule_id}/assignments"),
            json!({ "van_driver_operator_ids": operator_ids, "terminal": "terminal1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    created
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap().to_string())
        .collect()
}

async fn put_status(app: &axum::Router, id: &str, status: &str, terminal: &str) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            "PUT",
            "/scheduling",
            json!({ "id": id, "status": status, "terminal": terminal }),
        ),
    )
    .await
}

fn timestamp(value: &Value) -> DateTime<Utc> {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn terminal_clock_keeps_local_midnight_away() {
    let state = new_state();
    let local = Utc::now().with_timezone(&state.terminal_utc_offset);

    assert!((11..=12).contains(&local.hour()));
    assert_eq!(state.local_date(Utc::now() + Duration::hours(10)), local.date_naive());
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["schedules"], 0);
    assert_eq!(body["assignments"], 0);
    assert_eq!(body["history"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("queue_length"));
}

#[tokio::test]
async fn create_driver_empty_name_returns_400() {
    let (app, _state) = setup();
    let (status, body) = send(
        &app,
        json_request("POST", "/drivers", json!({ "firstname": " ", "lastname": "Reyes" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("cannot be empty"));
}

#[tokio::test]
async fn duplicate_plate_number_returns_409() {
    let (app, _state) = setup();
    let (status, van) = send(&app, json_request("POST", "/vans", json!({ "plate_number": "abc 123" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(van["plate_number"], "ABC 123");

    let (status, _) = send(&app, json_request("POST", "/vans", json!({ "plate_number": "ABC 123" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn operator_requires_existing_van() {
    let (app, _state) = setup();
    let (_, driver) = send(
        &app,
        json_request("POST", "/drivers", json!({ "firstname": "Ana", "lastname": "Lim" })),
    )
    .await;

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/operators",
            json!({ "van_id": "00000000-0000-0000-0000-000000000000", "driver_id": driver["id"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn schedule_rejects_duplicate_date_and_bad_window() {
    let (app, state) = setup();
    create_todays_schedule(&app, &state).await;

    let today = state.local_date(Utc::now()).to_string();
    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/schedules",
            json!({ "date": today, "start_time": "06:00:00", "end_time": "18:00:00" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/schedules",
            json!({ "date": "2031-01-01", "start_time": "18:00:00", "end_time": "06:00:00" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn assigning_same_operator_twice_returns_409() {
    let (app, state) = setup();
    let schedule_id = create_todays_schedule(&app, &state).await;
    let operator_id = create_operator(&app, "LAB-900", "Ben").await;

    let request = || {
        json_request(
            "POST",
            &format!("/schedules/{schedule_id}/assignments"),
            json!({ "van_driver_operator_ids": [operator_id], "terminal": "terminal2" }),
        )
    };

    let (status, created) = send(&app, request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created[0]["status"], "idle");
    assert_eq!(created[0]["order"], 0);
    assert_eq!(created[0]["operator"]["van"]["plate_number"], "LAB-900");

    let (status, _) = send(&app, request()).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn listing_without_terminal_returns_400() {
    let (app, _state) = setup();
    let (status, body) = send(&app, get_request("/scheduling")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Valid terminal parameter is required");
}

#[tokio::test]
async fn scheduling_without_todays_schedule_returns_404() {
    let (app, _state) = setup();
    let (status, body) = send(&app, get_request("/scheduling?terminal=terminal1")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No schedule found for today");
}

#[tokio::test]
async fn queueing_assigns_consecutive_orders_and_etas() {
    let (app, state) = setup();
    let ids = fleet_at_terminal1(&app, &state, 3).await;

    for (i, id) in ids.iter().enumerate() {
        let (status, body) = put_status(&app, id, "queued", "terminal1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Updated successfully");
        assert_eq!(body["assignment"]["order"], i as u64 + 1);

        let eta = &body["assignment"]["eta"];
        let departure = timestamp(&eta["estimated_departure_time"]);
        let arrival = timestamp(&eta["estimated_arrival_time"]);
        let queued_at = timestamp(&body["assignment"]["queued_at"]);
        assert_eq!(arrival - departure, Duration::hours(3));
        assert_eq!(departure - queued_at, Duration::minutes(30) * (i as i32 + 1));
    }

    let (status, queue) = send(&app, get_request("/scheduling?terminal=terminal1&status=queued")).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<u64> = queue
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["order"].as_u64().unwrap())
        .collect();
    assert_eq!(orders, vec![1, 2, 3]);
    assert_eq!(queue[0]["destination"], "Gensan Terminal");
}

#[tokio::test]
async fn only_first_in_queue_departs_and_queue_recalculates() {
    let (app, state) = setup();
    let ids = fleet_at_terminal1(&app, &state, 3).await;

    let (status, queued) = send(
        &app,
        json_request("POST", "/scheduling/queue", json!({ "ids": ids, "terminal": "terminal1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queued.as_array().unwrap().len(), 3);

    let (status, body) = put_status(&app, &ids[2], "departed", "terminal1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Only the first van in the queue can be marked as departed."
    );

    let (status, body) = put_status(&app, &ids[0], "departed", "terminal1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assignment"]["status"], "departed");
    assert_eq!(body["assignment"]["terminal"], "terminal2");
    assert!(body["assignment"]["departure_time"].is_string());

    let (_, queue) = send(&app, get_request("/scheduling?terminal=terminal1&status=queued")).await;
    let queue = queue.as_array().unwrap();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0]["id"], ids[1].as_str());
    assert_eq!(queue[0]["order"], 1);
    assert_eq!(queue[1]["id"], ids[2].as_str());
    assert_eq!(queue[1]["order"], 2);

    let (_, travelling) = send(&app, get_request("/scheduling?terminal=terminal2&status=departed")).await;
    assert_eq!(travelling.as_array().unwrap().len(), 1);
    assert_eq!(travelling[0]["destination"], "Palimbang Terminal");
}

#[tokio::test]
async fn arrival_and_idle_confirmation_complete_the_cycle() {
    let (app, state) = setup();
    let ids = fleet_at_terminal1(&app, &state, 1).await;
    let id = &ids[0];

    put_status(&app, id, "queued", "terminal1").await;
    put_status(&app, id, "departed", "terminal1").await;

    let (status, body) = put_status(&app, id, "arrived", "terminal1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assignment"]["status"], "arrived");
    assert_eq!(body["assignment"]["terminal"], "terminal2");
    assert!(body["assignment"]["arrival_time"].is_string());

    let (status, body) = put_status(&app, id, "idle", "terminal1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assignment"]["status"], "idle");
    assert!(body["assignment"]["eta"].is_null());

    let (_, idle) = send(&app, get_request("/scheduling?terminal=terminal2&status=idle")).await;
    assert_eq!(idle.as_array().unwrap().len(), 1);

    assert_eq!(state.history.len(), 4);
}

#[tokio::test]
async fn skipping_a_lifecycle_step_returns_409() {
    let (app, state) = setup();
    let ids = fleet_at_terminal1(&app, &state, 1).await;

    let (status, body) = put_status(&app, &ids[0], "arrived", "terminal2").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("idle"));
    assert_eq!(state.history.len(), 0);
}

#[tokio::test]
async fn patch_queues_out_of_order_at_front() {
    let (app, state) = setup();
    let ids = fleet_at_terminal1(&app, &state, 3).await;

    send(
        &app,
        json_request(
            "POST",
            "/scheduling/queue",
            json!({ "ids": [ids[0], ids[1]], "terminal": "terminal1" }),
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            "/scheduling",
            json!({ "id": ids[2], "status": "queued", "terminal": "terminal1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assignment"]["order"], 1);

    let (_, queue) = send(&app, get_request("/scheduling?terminal=terminal1&status=queued")).await;
    let listed: Vec<&str> = queue
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap())
        .collect();
    assert_eq!(listed, vec![ids[2].as_str(), ids[0].as_str(), ids[1].as_str()]);

    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            "/scheduling",
            json!({ "id": ids[2], "status": "departed", "terminal": "terminal1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn operator_history_report_counts_round_trips() {
    let (app, state) = setup();
    let ids = fleet_at_terminal1(&app, &state, 1).await;
    let id = &ids[0];

    put_status(&app, id, "queued", "terminal1").await;
    put_status(&app, id, "departed", "terminal1").await;
    put_status(&app, id, "arrived", "terminal1").await;

    let (_, operators) = send(&app, get_request("/reports/operators")).await;
    let operator_id = operators[0]["id"].as_str().unwrap().to_string();

    let (status, report) = send(
        &app,
        get_request(&format!("/reports/history?operator_id={operator_id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let events: Vec<&str> = report["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["event"].as_str().unwrap())
        .collect();
    assert_eq!(events, vec!["queued", "departed", "arrived"]);
    assert_eq!(report["summary"]["round_trips"], 1);
    assert_eq!(report["operator"]["driver"]["firstname"], "Driver0");
}

#[tokio::test]
async fn terminal_report_groups_history_by_terminal() {
    let (app, state) = setup();
    let ids = fleet_at_terminal1(&app, &state, 2).await;

    send(
        &app,
        json_request("POST", "/scheduling/queue", json!({ "ids": ids, "terminal": "terminal1" })),
    )
    .await;
    put_status(&app, &ids[0], "departed", "terminal1").await;

    let (status, stats) = send(&app, get_request("/reports/terminals")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats[0]["terminal"], "terminal1");
    assert_eq!(stats[0]["count"], 2);
    assert_eq!(stats[1]["terminal"], "terminal2");
    assert_eq!(stats[1]["count"], 1);

    let (_, departed_only) = send(&app, get_request("/reports/terminals?status=departed")).await;
    assert_eq!(departed_only.as_array().unwrap().len(), 1);
    assert_eq!(departed_only[0]["terminal"], "terminal2");

    let (status, _) = send(
        &app,
        get_request("/reports/terminals?start_date=2024-06-02&end_date=2024-06-01"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_schedule_cascades_but_keeps_history() {
    let (app, state) = setup();
    let ids = fleet_at_terminal1(&app, &state, 2).await;
    put_status(&app, &ids[0], "queued", "terminal1").await;

    let (_, schedules) = send(&app, get_request("/schedules")).await;
    let schedule_id = schedules[0]["id"].as_str().unwrap().to_string();
    assert_eq!(schedules[0]["assignments"].as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/schedules/{schedule_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["removed_assignments"], 2);

    assert_eq!(state.assignments.len(), 0);
    assert_eq!(state.history.len(), 1);

    let (status, _) = send(&app, get_request(&format!("/schedules/{schedule_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, recent) = send(&app, get_request("/reports/recent-drivers")).await;
    assert_eq!(recent.as_array().unwrap().len(), 1);
    assert_eq!(recent[0]["event"], "queued");
}

#[tokio::test]
async fn transitions_are_broadcast_to_subscribers() {
    let (app, state) = setup();
    let ids = fleet_at_terminal1(&app, &state, 1).await;
    let mut rx = state.history_events_tx.subscribe();

    put_status(&app, &ids[0], "queued", "terminal1").await;

    let record = rx.try_recv().unwrap();
    assert_eq!(record.assignment_id.to_string(), ids[0]);
    assert_eq!(record.event.as_str(), "queued");
}
