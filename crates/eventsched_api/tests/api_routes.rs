use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use eventsched_api::{ApiRequest, ApiResponse, EventApi};
use eventsched_core::{EventStore, ManualClock, SqliteSnapshotStore};
use serde_json::{json, Value};
use std::sync::Arc;

const FMT: &str = "%Y-%m-%dT%H:%M:%S";

fn base_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
}

fn api() -> EventApi {
    let clock = Arc::new(ManualClock::new(base_now()));
    let snapshots = SqliteSnapshotStore::open_in_memory().unwrap();
    EventApi::new(Arc::new(EventStore::open(Box::new(snapshots), clock)))
}

fn at(offset: Duration) -> String {
    (base_now() + offset)
        .with_timezone(&Local)
        .format(FMT)
        .to_string()
}

fn standup_body() -> Value {
    json!({
        "title": "Standup",
        "description": "Daily sync",
        "start_time": "2024-01-01T09:00:00",
        "end_time": "2024-01-01T09:15:00",
        "recurring": "weekdays"
    })
}

fn create(api: &EventApi, body: Value) -> ApiResponse {
    api.handle(&ApiRequest::post("/api/events", body))
}

fn created_id(response: &ApiResponse) -> String {
    assert_eq!(response.status, 201, "unexpected body: {}", response.body);
    response.body["event"]["id"].as_str().unwrap().to_string()
}

fn event_titles(response: &ApiResponse) -> Vec<String> {
    response.body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|event| event["title"].as_str().unwrap().to_string())
        .collect()
}

fn event_count(api: &EventApi) -> usize {
    let response = api.handle(&ApiRequest::get("/api/events"));
    assert_eq!(response.status, 200);
    response.body["events"].as_array().unwrap().len()
}

#[test]
fn standup_lifecycle() {
    let api = api();

    let created = create(&api, standup_body());
    let id = created_id(&created);
    assert_eq!(created.body["success"], true);
    assert_eq!(created.body["event"]["title"], "Standup");
    assert_eq!(created.body["event"]["recurring"], "weekdays");
    assert_eq!(created.body["event"]["start_time"], "2024-01-01T09:00:00");
    assert_eq!(created.body["event"]["created_at"], "2024-01-01T08:00:00Z");

    let fetched = api.handle(&ApiRequest::get(format!("/api/events/{id}")));
    assert_eq!(fetched.status, 200);
    assert_eq!(fetched.body["event"], created.body["event"]);

    let renamed = api.handle(&ApiRequest::put(
        format!("/api/events/{id}"),
        json!({ "title": "Daily Standup" }),
    ));
    assert_eq!(renamed.status, 200);
    assert_eq!(renamed.body["event"]["title"], "Daily Standup");
    assert_eq!(renamed.body["event"]["description"], "Daily sync");
    assert_eq!(
        renamed.body["event"]["created_at"],
        created.body["event"]["created_at"]
    );

    let deleted = api.handle(&ApiRequest::delete(format!("/api/events/{id}")));
    assert_eq!(deleted.status, 200);
    assert_eq!(deleted.body["message"], "Event deleted successfully");

    let gone = api.handle(&ApiRequest::get(format!("/api/events/{id}")));
    assert_eq!(gone.status, 404);
    assert_eq!(gone.body["success"], false);
    assert_eq!(gone.error_message(), Some("Event not found"));

    let deleted_again = api.handle(&ApiRequest::delete(format!("/api/events/{id}")));
    assert_eq!(deleted_again.status, 404);
}

#[test]
fn reversed_window_is_rejected_without_side_effects() {
    let api = api();
    created_id(&create(&api, standup_body()));

    let response = create(
        &api,
        json!({
            "title": "Backwards",
            "description": "",
            "start_time": "2024-01-02T10:00:00",
            "end_time": "2024-01-02T09:00:00"
        }),
    );
    assert_eq!(response.status, 400);
    assert_eq!(
        response.error_message(),
        Some("Start time must be before end time")
    );
    assert_eq!(event_count(&api), 1);
}

#[test]
fn create_reports_first_missing_field() {
    let api = api();

    let response = create(
        &api,
        json!({ "title": "No times", "description": "x", "end_time": "2024-01-01T10:00:00" }),
    );
    assert_eq!(response.status, 400);
    assert_eq!(
        response.error_message(),
        Some("Missing required field: start_time")
    );

    let response = create(
        &api,
        json!({ "title": "No description", "start_time": "2024-01-01T09:00:00" }),
    );
    assert_eq!(
        response.error_message(),
        Some("Missing required field: description")
    );

    let response = create(
        &api,
        json!({
            "title": "   ",
            "description": "",
            "start_time": "2024-01-01T09:00:00",
            "end_time": "2024-01-01T10:00:00"
        }),
    );
    assert_eq!(response.status, 400);
    assert_eq!(response.error_message(), Some("Missing required field: title"));
    assert_eq!(event_count(&api), 0);
}

#[test]
fn create_accepts_empty_description_and_rejects_bad_times() {
    let api = api();

    let ok = create(
        &api,
        json!({
            "title": "Focus",
            "description": "",
            "start_time": "January 5, 2024 9:30 AM",
            "end_time": "2024-01-05T11:00:00"
        }),
    );
    created_id(&ok);
    assert_eq!(ok.body["event"]["description"], "");
    assert_eq!(ok.body["event"]["recurring"], Value::Null);

    let bad = create(
        &api,
        json!({
            "title": "Broken",
            "description": "",
            "start_time": "half past never",
            "end_time": "2024-01-05T11:00:00"
        }),
    );
    assert_eq!(bad.status, 400);
    assert_eq!(bad.error_message(), Some("Invalid datetime format"));

    let typed = create(
        &api,
        json!({
            "title": 42,
            "description": "",
            "start_time": "2024-01-05T09:00:00",
            "end_time": "2024-01-05T11:00:00"
        }),
    );
    assert_eq!(typed.status, 400);
    assert_eq!(event_count(&api), 1);
}

#[test]
fn non_object_bodies_are_rejected() {
    let api = api();
    assert_eq!(create(&api, json!(["not", "an", "object"])).status, 400);
    assert_eq!(
        api.handle(&ApiRequest::new("POST", "/api/events")).status,
        400
    );

    let id = created_id(&create(&api, standup_body()));
    let response = api.handle(&ApiRequest::put(format!("/api/events/{id}"), json!("title")));
    assert_eq!(response.status, 400);
}

#[test]
fn list_is_sorted_by_start_time() {
    let api = api();
    for (title, start, end) in [
        ("third", "2024-01-03T09:00:00", "2024-01-03T10:00:00"),
        ("first", "2024-01-01T09:00:00", "2024-01-01T10:00:00"),
        ("second", "2024-01-02T09:00:00+01:00", "2024-01-02T10:00:00+01:00"),
    ] {
        created_id(&create(
            &api,
            json!({ "title": title, "description": "", "start_time": start, "end_time": end }),
        ));
    }

    let listed = api.handle(&ApiRequest::get("/events"));
    assert_eq!(listed.status, 200);
    assert_eq!(event_titles(&listed), vec!["first", "second", "third"]);
}

#[test]
fn update_validates_times_and_ignores_unknown_keys() {
    let api = api();
    let id = created_id(&create(&api, standup_body()));
    let path = format!("/api/events/{id}");

    let bad_start = api.handle(&ApiRequest::put(&path, json!({ "start_time": "whenever" })));
    assert_eq!(bad_start.status, 400);
    assert_eq!(bad_start.error_message(), Some("Invalid start_time format"));

    let bad_end = api.handle(&ApiRequest::put(&path, json!({ "end_time": 12 })));
    assert_eq!(bad_end.error_message(), Some("Invalid end_time format"));

    let reversed = api.handle(&ApiRequest::put(
        &path,
        json!({ "end_time": "2024-01-01T08:00:00" }),
    ));
    assert_eq!(reversed.status, 400);
    assert_eq!(
        reversed.error_message(),
        Some("Start time must be before end time")
    );

    let sneaky = api.handle(&ApiRequest::put(
        &path,
        json!({
            "id": "11111111-2222-4333-8444-555555555555",
            "created_at": "1999-01-01T00:00:00",
            "colour": "red",
            "recurring": null
        }),
    ));
    assert_eq!(sneaky.status, 200);
    assert_eq!(sneaky.body["event"]["id"], id.as_str());
    assert_eq!(sneaky.body["event"]["created_at"], "2024-01-01T08:00:00Z");
    assert_eq!(sneaky.body["event"]["recurring"], Value::Null);
    assert!(sneaky.body["event"].get("colour").is_none());
}

#[test]
fn update_unknown_or_malformed_id_is_not_found() {
    let api = api();

    let unknown = api.handle(&ApiRequest::put(
        format!("/api/events/{}", uuid::Uuid::new_v4()),
        json!({ "title": "ghost" }),
    ));
    assert_eq!(unknown.status, 404);

    let malformed = api.handle(&ApiRequest::put(
        "/api/events/not-a-uuid",
        json!({ "title": "ghost" }),
    ));
    assert_eq!(malformed.status, 404);
    assert_eq!(
        api.handle(&ApiRequest::get("/api/events/not-a-uuid")).status,
        404
    );

    let bad_time_first = api.handle(&ApiRequest::put(
        "/api/events/not-a-uuid",
        json!({ "start_time": "nope" }),
    ));
    assert_eq!(bad_time_first.status, 400);
}

#[test]
fn search_is_case_insensitive_and_requires_query() {
    let api = api();
    created_id(&create(&api, standup_body()));
    created_id(&create(
        &api,
        json!({
            "title": "Test Meeting",
            "description": "planning",
            "start_time": "2024-01-02T09:00:00",
            "end_time": "2024-01-02T10:00:00"
        }),
    ));

    let by_title = api.handle(&ApiRequest::get("/api/events/search").with_query("q", "standup"));
    assert_eq!(by_title.status, 200);
    assert_eq!(event_titles(&by_title), vec!["Standup"]);

    let inline = api.handle(&ApiRequest::get("/api/events/search?q=TEST+MEETING"));
    assert_eq!(event_titles(&inline), vec!["Test Meeting"]);

    let none = api.handle(&ApiRequest::get("/api/events/search?q=nonexistent-zzz"));
    assert_eq!(none.status, 200);
    assert!(event_titles(&none).is_empty());

    for request in [
        ApiRequest::get("/api/events/search"),
        ApiRequest::get("/api/events/search?q="),
        ApiRequest::get("/api/events/search").with_query("q", "   "),
    ] {
        let response = api.handle(&request);
        assert_eq!(response.status, 400);
        assert_eq!(response.error_message(), Some("Search query is required"));
    }
}

#[test]
fn upcoming_uses_hours_window() {
    let api = api();
    for (title, offset) in [
        ("soon", Duration::minutes(30)),
        ("started", Duration::minutes(-1)),
        ("later", Duration::minutes(150)),
    ] {
        created_id(&create(
            &api,
            json!({
                "title": title,
                "description": "",
                "start_time": at(offset),
                "end_time": at(offset + Duration::minutes(15))
            }),
        ));
    }

    let default_window = api.handle(&ApiRequest::get("/api/events/upcoming"));
    assert_eq!(default_window.status, 200);
    assert_eq!(event_titles(&default_window), vec!["soon"]);

    let wide = api.handle(&ApiRequest::get("/api/events/upcoming?hours=3"));
    assert_eq!(event_titles(&wide), vec!["soon", "later"]);

    let fractional = api.handle(&ApiRequest::get("/api/events/upcoming").with_query("hours", "0.25"));
    assert!(event_titles(&fractional).is_empty());

    for raw in ["-1", "soon", "NaN"] {
        let response = api.handle(&ApiRequest::get("/api/events/upcoming").with_query("hours", raw));
        assert_eq!(response.status, 400, "hours `{raw}`");
        assert_eq!(response.body["success"], false);
    }
}

#[test]
fn health_reports_running() {
    let api = api();
    for path in ["/api/health", "/health"] {
        let response = api.handle(&ApiRequest::get(path));
        assert_eq!(response.status, 200);
        assert_eq!(response.body["success"], true);
        assert_eq!(response.body["status"], "healthy");
        assert_eq!(response.body["message"], "Event Scheduler API is running");
    }
}

#[test]
fn unknown_routes_and_methods() {
    let api = api();

    let missing = api.handle(&ApiRequest::get("/api/calendar"));
    assert_eq!(missing.status, 404);
    assert_eq!(missing.body["success"], false);

    let wrong_method = api.handle(&ApiRequest::delete("/api/events"));
    assert_eq!(wrong_method.status, 405);

    let patch = api.handle(&ApiRequest::new("PATCH", "/api/health"));
    assert_eq!(patch.status, 405);

    let lowercase = api.handle(&ApiRequest::new("get", "/api/events/"));
    assert_eq!(lowercase.status, 200);
}

#[test]
fn requests_from_json_lines_are_handled() {
    let api = api();
    let request: ApiRequest = serde_json::from_value(json!({
        "method": "POST",
        "path": "/api/events",
        "body": standup_body()
    }))
    .unwrap();

    let response = api.handle(&request);
    assert_eq!(response.status, 201);

    let encoded = serde_json::to_value(&response).unwrap();
    assert_eq!(encoded["status"], 201);
    assert_eq!(encoded["body"]["event"]["title"], "Standup");
}
