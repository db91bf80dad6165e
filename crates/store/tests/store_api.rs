//! Store operations against an in-process fake of the REST API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use policy::{BlockedCategories, Category, INFRA_NOISE_REASON};
use serde_json::{json, Value};
use store::{blocking_log, rules, StoreError};
use supabase_client::{Session, SupabaseClient, SupabaseConfig, SupabaseError, User};

const TOKEN: &str = "user-token";

type Params = HashMap<String, String>;

#[derive(Clone, Default)]
struct FakeBackend {
    rules: Arc<Mutex<Vec<Value>>>,
    upserts: Arc<Mutex<Vec<(Params, Option<String>, Value)>>>,
    logs: Arc<Vec<Value>>,
    log_queries: Arc<Mutex<Vec<Params>>>,
}

impl FakeBackend {
    fn visible_logs(&self, params: &Params) -> Vec<Value> {
        let wanted = params.get("user_id").cloned().unwrap_or_default();
        self.logs
            .iter()
            .filter(|row| format!("eq.{}", row["user_id"].as_str().unwrap_or("")) == wanted)
            .filter(|row| !params.contains_key("or") || row["reason"] != INFRA_NOISE_REASON)
            .cloned()
            .collect()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    bearer == Some(&format!("Bearer {}", TOKEN)) && headers.contains_key("apikey")
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"code": "PGRST301", "message": "JWT expired"})),
    )
        .into_response()
}

async fn get_rules(
    State(backend): State<FakeBackend>,
    Query(params): Query<Params>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let wanted = params.get("user_id").cloned().unwrap_or_default();
    let rows: Vec<Value> = backend
        .rules
        .lock()
        .unwrap()
        .iter()
        .filter(|row| format!("eq.{}", row["user_id"].as_str().unwrap_or("")) == wanted)
        .cloned()
        .collect();
    Json(rows).into_response()
}

async fn post_rules(
    State(backend): State<FakeBackend>,
    Query(params): Query<Params>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let prefer = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    backend.upserts.lock().unwrap().push((params, prefer, body));
    StatusCode::CREATED.into_response()
}

async fn list_logs(
    State(backend): State<FakeBackend>,
    Query(params): Query<Params>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    backend.log_queries.lock().unwrap().push(params.clone());

    let offset: usize = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit: usize = params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(usize::MAX);
    let rows: Vec<Value> = backend
        .visible_logs(&params)
        .into_iter()
        .skip(offset)
        .take(limit)
        .collect();
    Json(rows).into_response()
}

async fn count_logs(
    State(backend): State<FakeBackend>,
    Query(params): Query<Params>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let total = backend.visible_logs(&params).len();
    (
        StatusCode::OK,
        [(header::CONTENT_RANGE, format!("*/{}", total))],
    )
        .into_response()
}

async fn spawn_backend(backend: FakeBackend) -> SupabaseClient {
    let app = Router::new()
        .route("/rest/v1/rules", get(get_rules).post(post_rules))
        .route("/rest/v1/blocking_log", get(list_logs).head(count_logs))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = SupabaseConfig::new(format!("http://{}", addr), "anon-key");
    SupabaseClient::new(config).unwrap()
}

fn session_with_token(token: &str) -> Session {
    let user = User {
        id: "user-1".to_string(),
        email: Some("me@example.com".to_string()),
        email_confirmed_at: None,
    };
    Session::new(token, "refresh", None, user)
}

fn log_row(id: i64, user_id: &str, minute: u32, reason: &str) -> Value {
    json!({
        "id": id,
        "user_id": user_id,
        "decision": "BLOCK",
        "url": format!("https://www.youtube.com/shorts/{}", id),
        "domain": "youtube.com",
        "page_title": null,
        "reason": reason,
        "created_at": format!("2026-10-19T09:{:02}:00Z", minute),
    })
}

#[tokio::test]
async fn test_first_time_user_gets_default_policy() {
    let client = spawn_backend(FakeBackend::default()).await;
    let session = session_with_token(TOKEN);

    assert!(rules::get_rules(&client, &session).await.unwrap().is_none());

    let policy = rules::load_policy(&client, &session).await.unwrap();
    assert_eq!(policy.user_id, "user-1");
    assert!(policy.prompt.is_empty());
    assert!(policy.api_key.is_none());
    assert!(policy.block_list.is_empty());
}

#[tokio::test]
async fn test_existing_policy_is_loaded() {
    let backend = FakeBackend::default();
    backend.rules.lock().unwrap().push(json!({
        "user_id": "user-1",
        "prompt": "Only work sites",
        "api_key": "abcdefghijklmnopqrstuvwxyz012345",
        "blocked_categories": {"games": true},
        "allow_list": ["github.com"],
        "block_list": ["youtube.com", "reddit.com"],
        "last_seen": "2026-10-19T09:55:00+00:00"
    }));
    backend.rules.lock().unwrap().push(json!({
        "user_id": "someone-else",
        "prompt": "Not mine"
    }));
    let client = spawn_backend(backend).await;

    let policy = rules::load_policy(&client, &session_with_token(TOKEN))
        .await
        .unwrap();
    assert_eq!(policy.prompt, "Only work sites");
    assert!(policy.blocked_categories.is_blocked(Category::Games));
    assert_eq!(policy.block_list.as_slice(), ["reddit.com", "youtube.com"]);
    assert!(policy.last_seen.is_some());
}

#[tokio::test]
async fn test_save_prompt_is_a_partial_upsert() {
    let backend = FakeBackend::default();
    let client = spawn_backend(backend.clone()).await;
    let session = session_with_token(TOKEN);

    rules::save_prompt(&client, &session, "Block short videos")
        .await
        .unwrap();

    let upserts = backend.upserts.lock().unwrap();
    assert_eq!(upserts.len(), 1);
    let (params, prefer, body) = &upserts[0];
    assert_eq!(params.get("on_conflict").map(String::as_str), Some("user_id"));
    assert!(prefer
        .as_deref()
        .unwrap_or_default()
        .contains("resolution=merge-duplicates"));
    assert_eq!(
        body,
        &json!({"user_id": "user-1", "prompt": "Block short videos"})
    );
}

#[tokio::test]
async fn test_save_categories_writes_full_map() {
    let backend = FakeBackend::default();
    let client = spawn_backend(backend.clone()).await;

    let categories = BlockedCategories::from_checked([Category::Social, Category::Mature]);
    rules::save_categories(&client, &session_with_token(TOKEN), &categories)
        .await
        .unwrap();

    let upserts = backend.upserts.lock().unwrap();
    let body = &upserts[0].2;
    assert_eq!(body["blocked_categories"]["social"], true);
    assert_eq!(body["blocked_categories"]["mature"], true);
    assert_eq!(body["blocked_categories"]["news"], false);
    assert!(body.get("prompt").is_none());
}

#[tokio::test]
async fn test_recent_entries_exclude_noise_and_other_users() {
    let backend = FakeBackend {
        logs: Arc::new(vec![
            log_row(4, "user-1", 4, "Short-form video"),
            log_row(3, "user-1", 3, INFRA_NOISE_REASON),
            log_row(2, "user-2", 2, "Short-form video"),
            log_row(1, "user-1", 1, "Gaming"),
        ]),
        ..FakeBackend::default()
    };
    let client = spawn_backend(backend.clone()).await;

    let entries = blocking_log::recent_entries(&client, &session_with_token(TOKEN), 20)
        .await
        .unwrap();

    let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["4", "1"]);

    let queries = backend.log_queries.lock().unwrap();
    assert_eq!(queries[0].get("order").map(String::as_str), Some("created_at.desc"));
    assert_eq!(queries[0].get("limit").map(String::as_str), Some("20"));
}

#[tokio::test]
async fn test_history_page_with_total() {
    let logs = (1..=5)
        .rev()
        .map(|i| log_row(i, "user-1", i as u32, "Distracting"))
        .chain(std::iter::once(log_row(99, "user-1", 30, INFRA_NOISE_REASON)))
        .collect();
    let backend = FakeBackend {
        logs: Arc::new(logs),
        ..FakeBackend::default()
    };
    let client = spawn_backend(backend).await;
    let session = session_with_token(TOKEN);

    assert_eq!(blocking_log::count_entries(&client, &session).await.unwrap(), 5);

    let (entries, window) = blocking_log::page(&client, &session, 1, 2).await.unwrap();
    let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["3", "2"]);
    assert_eq!(window.total, 5);
    assert_eq!(window.total_pages(), 3);
    assert!(window.has_previous());
    assert!(window.has_next());
}

#[tokio::test]
async fn test_rejected_token_surfaces_api_error() {
    let client = spawn_backend(FakeBackend::default()).await;

    let result = rules::load_policy(&client, &session_with_token("stale-token")).await;
    match result {
        Err(StoreError::Supabase(err @ SupabaseError::Api { .. })) => {
            assert!(err.is_unauthorized());
            assert!(err.to_string().contains("JWT expired"));
        }
        other => panic!("expected an API error, got {:?}", other),
    }
}
