//! Request dispatch for the event scheduler.
//!
//! # Responsibility
//! - Map method + path + query + JSON body onto [`EventStore`] operations.
//! - Translate core results into status codes and response envelopes.
//!
//! # Invariants
//! - [`EventApi::handle`] never panics; handler panics become 500 responses.
//! - Paths are accepted with or without the `/api` prefix.
//! - Log lines carry ids and counts only, never request bodies.

use crate::envelope::{ApiRequest, ApiResponse};
use eventsched_core::{
    parse_event_time, EventId, EventPatch, EventStore, EventValidationError, NewEvent,
};
use log::{debug, error, warn};
use serde_json::{Map, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

const API_PREFIX: &str = "/api";
const REQUIRED_CREATE_FIELDS: [&str; 4] = ["title", "description", "start_time", "end_time"];
const DEFAULT_UPCOMING_HOURS: f64 = 1.0;
const MAX_UPCOMING_HOURS: f64 = 1_000_000.0;
const MILLIS_PER_HOUR: f64 = 3_600_000.0;

const MSG_NOT_FOUND: &str = "Event not found";
const MSG_INVALID_DATETIME: &str = "Invalid datetime format";
const MSG_INVALID_WINDOW: &str = "Start time must be before end time";
const MSG_SEARCH_REQUIRED: &str = "Search query is required";
const MSG_INVALID_HOURS: &str = "Invalid hours parameter";
const MSG_BODY_REQUIRED: &str = "Request body must be a JSON object";
const MSG_INTERNAL: &str = "Internal server error";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route<'a> {
    Health,
    Events,
    Search,
    Upcoming,
    Event(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
    Other,
}

impl Method {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            _ => Self::Other,
        }
    }
}

/// Request handler over a shared event store.
#[derive(Clone)]
pub struct EventApi {
    store: Arc<EventStore>,
}

impl EventApi {
    pub fn new(store: Arc<EventStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    /// Handles one request.
    ///
    /// # Contract
    /// - Never panics.
    /// - Always returns an envelope with `success` set.
    pub fn handle(&self, request: &ApiRequest) -> ApiResponse {
        match catch_unwind(AssertUnwindSafe(|| self.dispatch(request))) {
            Ok(response) => {
                debug!(
                    "event=api_request module=api status={} method={} route={}",
                    response.status,
                    request.method,
                    route_label(&request.path)
                );
                response
            }
            Err(_) => {
                error!(
                    "event=api_request module=api status=error method={} route={} error_code=handler_panicked",
                    request.method,
                    route_label(&request.path)
                );
                ApiResponse::error(500, MSG_INTERNAL)
            }
        }
    }

    fn dispatch(&self, request: &ApiRequest) -> ApiResponse {
        let (path, inline_query) = split_path(&request.path);
        let Some(route) = match_route(path) else {
            return ApiResponse::error(404, "Not found");
        };
        let method = Method::parse(&request.method);
        let query = QueryParams::new(inline_query, &request.query);

        match (route, method) {
            (Route::Health, Method::Get) => health(),
            (Route::Events, Method::Get) => ApiResponse::events(&self.store.list_all()),
            (Route::Events, Method::Post) => self.create(request.body.as_ref()),
            (Route::Search, Method::Get) => self.search(&query),
            (Route::Upcoming, Method::Get) => self.upcoming(&query),
            (Route::Event(raw_id), Method::Get) => self.get(raw_id),
            (Route::Event(raw_id), Method::Put) => self.update(raw_id, request.body.as_ref()),
            (Route::Event(raw_id), Method::Delete) => self.delete(raw_id),
            _ => ApiResponse::error(405, "Method not allowed"),
        }
    }

    fn create(&self, body: Option<&Value>) -> ApiResponse {
        let Some(fields) = body.and_then(Value::as_object) else {
            return ApiResponse::error(400, MSG_BODY_REQUIRED);
        };
        let input = match new_event_from_json(fields) {
            Ok(input) => input,
            Err(response) => return response,
        };

        match self.store.create(&input) {
            Ok(event) => ApiResponse::event(201, &event),
            Err(err) => {
                warn!(
                    "event=api_create module=api status=rejected error_code={}",
                    err.error_code()
                );
                ApiResponse::error(400, create_error_message(&err))
            }
        }
    }

    fn get(&self, raw_id: &str) -> ApiResponse {
        match parse_event_id(raw_id).and_then(|id| self.store.get(id)) {
            Some(event) => ApiResponse::event(200, &event),
            None => ApiResponse::error(404, MSG_NOT_FOUND),
        }
    }

    fn update(&self, raw_id: &str, body: Option<&Value>) -> ApiResponse {
        let Some(fields) = body.and_then(Value::as_object) else {
            return ApiResponse::error(400, MSG_BODY_REQUIRED);
        };
        if let Some(response) = precheck_patch_times(fields) {
            return response;
        }
        log_ignored_patch_keys(fields);

        let patch = match serde_json::from_value::<EventPatch>(Value::Object(fields.clone())) {
            Ok(patch) => patch,
            Err(err) => return ApiResponse::error(400, format!("Invalid event data: {err}")),
        };
        let Some(id) = parse_event_id(raw_id) else {
            return ApiResponse::error(404, MSG_NOT_FOUND);
        };

        match self.store.update(id, &patch) {
            Ok(Some(event)) => ApiResponse::event(200, &event),
            Ok(None) => ApiResponse::error(404, MSG_NOT_FOUND),
            Err(err) => {
                warn!(
                    "event=api_update module=api status=rejected event_id={} error_code={}",
                    id,
                    err.error_code()
                );
                ApiResponse::error(400, update_error_message(&err))
            }
        }
    }

    fn delete(&self, raw_id: &str) -> ApiResponse {
        let deleted = parse_event_id(raw_id).is_some_and(|id| self.store.delete(id));
        if deleted {
            ApiResponse::message("Event deleted successfully")
        } else {
            ApiResponse::error(404, MSG_NOT_FOUND)
        }
    }

    fn search(&self, query: &QueryParams) -> ApiResponse {
        let needle = query.get("q").unwrap_or_default();
        if needle.trim().is_empty() {
            return ApiResponse::error(400, MSG_SEARCH_REQUIRED);
        }
        ApiResponse::events(&self.store.search(&needle))
    }

    fn upcoming(&self, query: &QueryParams) -> ApiResponse {
        let hours = match query.get("hours") {
            None => DEFAULT_UPCOMING_HOURS,
            Some(raw) => match parse_hours(&raw) {
                Some(hours) => hours,
                None => return ApiResponse::error(400, MSG_INVALID_HOURS),
            },
        };
        let lookahead = chrono::Duration::milliseconds((hours * MILLIS_PER_HOUR).round() as i64);
        ApiResponse::events(&self.store.upcoming(lookahead))
    }
}

fn health() -> ApiResponse {
    ApiResponse {
        status: 200,
        body: serde_json::json!({
            "success": true,
            "status": "healthy",
            "message": "Event Scheduler API is running",
            "version": env!("CARGO_PKG_VERSION"),
        }),
    }
}

fn new_event_from_json(fields: &Map<String, Value>) -> Result<NewEvent, ApiResponse> {
    let [title, description, start_time, end_time] =
        REQUIRED_CREATE_FIELDS.map(|field| required_string(fields, field));
    let mut input = NewEvent::new(title?, description?, start_time?, end_time?);

    input.recurring = match fields.get("recurring") {
        None | Some(Value::Null) => None,
        Some(Value::String(tag)) => Some(tag.clone()),
        Some(_) => {
            return Err(ApiResponse::error(
                400,
                "Field recurring must be a string or null",
            ))
        }
    };
    Ok(input)
}

fn required_string(fields: &Map<String, Value>, field: &str) -> Result<String, ApiResponse> {
    match fields.get(field) {
        None | Some(Value::Null) => Err(ApiResponse::error(
            400,
            format!("Missing required field: {field}"),
        )),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(ApiResponse::error(
            400,
            format!("Field {field} must be a string"),
        )),
    }
}

/// Rejects unparseable provided times before any lookup, so a bad time is a
/// 400 even for an unknown id.
fn precheck_patch_times(fields: &Map<String, Value>) -> Option<ApiResponse> {
    for field in ["start_time", "end_time"] {
        let Some(value) = fields.get(field) else {
            continue;
        };
        let parses = value
            .as_str()
            .is_some_and(|text| parse_event_time(text).is_ok());
        if !parses {
            return Some(ApiResponse::error(400, format!("Invalid {field} format")));
        }
    }
    None
}

fn log_ignored_patch_keys(fields: &Map<String, Value>) {
    let ignored = fields
        .keys()
        .filter(|key| !EventPatch::MUTABLE_FIELDS.contains(&key.as_str()))
        .map(String::as_str)
        .collect::<Vec<_>>();
    if !ignored.is_empty() {
        debug!(
            "event=api_update module=api status=ignored_keys keys={}",
            ignored.join(",")
        );
    }
}

fn create_error_message(err: &EventValidationError) -> String {
    match err {
        EventValidationError::MissingField(field) => format!("Missing required field: {field}"),
        EventValidationError::InvalidTime { .. } => MSG_INVALID_DATETIME.to_string(),
        EventValidationError::InvalidWindow { .. } => MSG_INVALID_WINDOW.to_string(),
        other => other.to_string(),
    }
}

fn update_error_message(err: &EventValidationError) -> String {
    match err {
        EventValidationError::InvalidTime { field, .. } => format!("Invalid {field} format"),
        EventValidationError::InvalidWindow { .. } => MSG_INVALID_WINDOW.to_string(),
        other => other.to_string(),
    }
}

fn parse_event_id(raw: &str) -> Option<EventId> {
    EventId::parse_str(raw.trim()).ok()
}

fn parse_hours(raw: &str) -> Option<f64> {
    let hours = raw.trim().parse::<f64>().ok()?;
    (hours.is_finite() && (0.0..=MAX_UPCOMING_HOURS).contains(&hours)).then_some(hours)
}

fn split_path(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (raw, None),
    }
}

fn match_route(path: &str) -> Option<Route<'_>> {
    let path = path.trim();
    let path = path.strip_prefix(API_PREFIX).unwrap_or(path);
    let segments = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();

    match segments.as_slice() {
        ["health"] => Some(Route::Health),
        ["events"] => Some(Route::Events),
        ["events", "search"] => Some(Route::Search),
        ["events", "upcoming"] => Some(Route::Upcoming),
        ["events", id] => Some(Route::Event(id)),
        _ => None,
    }
}

fn route_label(raw_path: &str) -> &'static str {
    let (path, _) = split_path(raw_path);
    match match_route(path) {
        Some(Route::Health) => "health",
        Some(Route::Events) => "events",
        Some(Route::Search) => "events_search",
        Some(Route::Upcoming) => "events_upcoming",
        Some(Route::Event(_)) => "event_by_id",
        None => "unknown",
    }
}

/// Query pairs from the path's `?` part followed by the request's own pairs.
/// The first occurrence of a key wins.
struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    fn new(inline: Option<&str>, extra: &[(String, String)]) -> Self {
        let mut pairs = inline
            .map(|raw| {
                raw.split('&')
                    .filter(|pair| !pair.is_empty())
                    .map(|pair| match pair.split_once('=') {
                        Some((key, value)) => (decode_component(key), decode_component(value)),
                        None => (decode_component(pair), String::new()),
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        pairs.extend(extra.iter().cloned());
        Self { pairs }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.pairs
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.clone())
    }
}

/// Decodes `+` and `%XX` escapes; undecodable input is kept as written.
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
