use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Collections served under `GET /{collection}`.
pub const COLLECTIONS: &[&str] = &[
    "organisations",
    "persons",
    "placements",
    "duties",
    "groups",
    "programmes",
    "studyplans",
    "syllabuses",
    "schoolUnitOfferings",
    "activities",
    "calendarEvents",
    "attendances",
    "attendanceEvents",
    "attendanceSchedules",
    "aggregatedAttendance",
    "grades",
    "resources",
    "rooms",
];

/// Query keys that control paging rather than filter entities.
const CONTROL_KEYS: &[&str] = &["limit", "pageToken", "sortkey", "expandReferenceNames", "expand"];

pub const SUBSCRIPTION_EXPIRES: &str = "2030-01-01T00:00:00+00:00";

pub struct MockState {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    subscriptions: RwLock<Vec<Value>>,
    reports: RwLock<Vec<Value>>,
    token: Option<String>,
}

pub type Db = Arc<MockState>;

impl MockState {
    /// Fresh seeded state; pass it to `router` to share it with a test.
    pub fn seeded(token: Option<String>) -> Db {
        let mut collections: HashMap<String, Vec<Value>> = COLLECTIONS
            .iter()
            .map(|name| (name.to_string(), Vec::new()))
            .collect();
        collections.insert("organisations".to_string(), seed_organisations());
        collections.insert("persons".to_string(), seed_persons());
        Arc::new(Self {
            collections: RwLock::new(collections),
            subscriptions: RwLock::new(Vec::new()),
            reports: RwLock::new(Vec::new()),
            token,
        })
    }

    /// Bodies posted to `/log` and `/statistics`, oldest first.
    pub async fn reports(&self) -> Vec<Value> {
        self.reports.read().await.clone()
    }
}

/// Stable id for seeded entity `n`.
pub fn seed_id(n: u128) -> String {
    Uuid::from_u128(n).to_string()
}

fn seed_organisations() -> Vec<Value> {
    vec![
        json!({"id": seed_id(1), "displayName": "Ekskolan", "type": "Skolenhet", "schoolUnitCode": "10000001"}),
        json!({"id": seed_id(2), "displayName": "Björkskolan", "type": "Skolenhet", "schoolUnitCode": "10000002"}),
        json!({"id": seed_id(3), "displayName": "Lunds kommun", "type": "Huvudman"}),
    ]
}

fn seed_persons() -> Vec<Value> {
    ["Anna", "Bo", "Cecilia", "David", "Elin"]
        .iter()
        .enumerate()
        .map(|(i, given)| {
            json!({
                "id": seed_id(100 + i as u128),
                "givenName": given,
                "familyName": "Svensson",
                "eduPersonPrincipalName": format!("{}@school.test", given.to_lowercase()),
            })
        })
        .collect()
}

/// Router without authentication.
pub fn app() -> Router {
    router(MockState::seeded(None))
}

/// Router that rejects requests lacking `Authorization: Bearer {token}`.
pub fn app_with_token(token: impl Into<String>) -> Router {
    router(MockState::seeded(Some(token.into())))
}

pub fn router(db: Db) -> Router {
    Router::new()
        .route("/subscriptions", get(list_subscriptions).post(create_subscription))
        .route(
            "/subscriptions/{id}",
            get(get_subscription)
                .patch(update_subscription)
                .delete(delete_subscription),
        )
        .route("/deletedEntities", get(deleted_entities))
        .route("/log", post(post_report))
        .route("/statistics", post(post_report))
        .route("/{collection}", get(list_collection))
        .route("/{collection}/lookup", post(lookup))
        .route("/{collection}/{id}", get(get_entity))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await
}

fn error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    let message: String = message.into();
    (status, Json(json!({"code": code, "message": message}))).into_response()
}

fn authorize(db: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(token) = &db.token else {
        return Ok(());
    };
    let expected = format!("Bearer {token}");
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(error(StatusCode::UNAUTHORIZED, "Unauthorized", "missing or invalid bearer token")),
    }
}

/// Decode a raw query string, keeping repeated keys in order.
pub fn parse_query(raw: &str) -> Vec<(String, String)> {
    let decode = |s: &str| {
        urlencoding::decode(s)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| s.to_string())
    };
    raw.split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (k, v) = part.split_once('=').unwrap_or((part, ""));
            (decode(k), decode(v))
        })
        .collect()
}

fn first<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

/// Offset-based paging; the page token is the offset of the next item.
fn paginate(items: Vec<Value>, params: &[(String, String)]) -> Result<Value, Response> {
    let offset = match first(params, "pageToken") {
        Some(token) => token
            .parse::<usize>()
            .map_err(|_| error(StatusCode::BAD_REQUEST, "InvalidPageToken", format!("bad pageToken {token:?}")))?,
        None => 0,
    };
    let limit = match first(params, "limit") {
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|l| *l > 0)
            .ok_or_else(|| error(StatusCode::BAD_REQUEST, "InvalidLimit", format!("bad limit {raw:?}")))?,
        None => usize::MAX,
    };

    let total = items.len();
    let data: Vec<Value> = items.into_iter().skip(offset).take(limit).collect();
    let next = offset.saturating_add(limit);
    let mut body = Map::new();
    body.insert("data".to_string(), Value::Array(data));
    if next < total {
        body.insert("pageToken".to_string(), Value::String(next.to_string()));
    }
    Ok(Value::Object(body))
}

/// Keep entities whose top-level string field matches one of the values given
/// for that key. Repeated keys are alternatives.
fn matches_filters(entity: &Value, params: &[(String, String)]) -> bool {
    let mut by_key: HashMap<&str, Vec<&str>> = HashMap::new();
    for (k, v) in params {
        if !CONTROL_KEYS.contains(&k.as_str()) {
            by_key.entry(k.as_str()).or_default().push(v.as_str());
        }
    }
    by_key.iter().all(|(key, wanted)| {
        entity
            .get(*key)
            .and_then(Value::as_str)
            .is_some_and(|actual| wanted.contains(&actual))
    })
}

async fn list_collection(
    State(db): State<Db>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>, Response> {
    authorize(&db, &headers)?;
    let params = parse_query(query.as_deref().unwrap_or(""));
    tracing::debug!(%collection, ?params, "list");
    let collections = db.collections.read().await;
    let items = collections
        .get(&collection)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "NotFound", format!("unknown collection {collection}")))?;
    let filtered = items
        .iter()
        .filter(|e| matches_filters(e, &params))
        .cloned()
        .collect();
    paginate(filtered, &params).map(Json)
}

async fn get_entity(
    State(db): State<Db>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Value>, Response> {
    authorize(&db, &headers)?;
    let collections = db.collections.read().await;
    collections
        .get(&collection)
        .and_then(|items| items.iter().find(|e| e["id"] == id.as_str()))
        .cloned()
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "NotFound", format!("{collection}/{id} does not exist")))
}

#[derive(Deserialize)]
pub struct LookupRequest {
    #[serde(default)]
    pub ids: Vec<String>,
}

async fn lookup(
    State(db): State<Db>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    Json(input): Json<LookupRequest>,
) -> Result<Json<Vec<Value>>, Response> {
    authorize(&db, &headers)?;
    let collections = db.collections.read().await;
    let items = collections
        .get(&collection)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "NotFound", format!("unknown collection {collection}")))?;
    Ok(Json(
        items
            .iter()
            .filter(|e| input.ids.iter().any(|id| e["id"] == id.as_str()))
            .cloned()
            .collect(),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscription {
    pub name: String,
    pub target: String,
    #[serde(default)]
    pub resource_types: Vec<Value>,
}

#[derive(Deserialize)]
pub struct UpdateSubscription {
    pub expires: String,
}

async fn list_subscriptions(
    State(db): State<Db>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>, Response> {
    authorize(&db, &headers)?;
    let params = parse_query(query.as_deref().unwrap_or(""));
    let subscriptions = db.subscriptions.read().await.clone();
    paginate(subscriptions, &params).map(Json)
}

async fn create_subscription(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateSubscription>,
) -> Result<(StatusCode, Json<Value>), Response> {
    authorize(&db, &headers)?;
    if !input.target.starts_with("https://") && !input.target.starts_with("http://") {
        return Err(error(StatusCode::BAD_REQUEST, "InvalidTarget", "target must be an absolute URL"));
    }
    let subscription = json!({
        "id": Uuid::new_v4().to_string(),
        "name": input.name,
        "target": input.target,
        "expires": SUBSCRIPTION_EXPIRES,
        "resourceTypes": input.resource_types,
    });
    db.subscriptions.write().await.push(subscription.clone());
    Ok((StatusCode::CREATED, Json(subscription)))
}

async fn get_subscription(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, Response> {
    authorize(&db, &headers)?;
    let subscriptions = db.subscriptions.read().await;
    subscriptions
        .iter()
        .find(|s| s["id"] == id.as_str())
        .cloned()
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "NotFound", format!("subscription {id} does not exist")))
}

async fn update_subscription(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<UpdateSubscription>,
) -> Result<Json<Value>, Response> {
    authorize(&db, &headers)?;
    let mut subscriptions = db.subscriptions.write().await;
    let subscription = subscriptions
        .iter_mut()
        .find(|s| s["id"] == id.as_str())
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "NotFound", format!("subscription {id} does not exist")))?;
    subscription["expires"] = Value::String(input.expires);
    Ok(Json(subscription.clone()))
}

async fn delete_subscription(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, Response> {
    authorize(&db, &headers)?;
    let mut subscriptions = db.subscriptions.write().await;
    let before = subscriptions.len();
    subscriptions.retain(|s| s["id"] != id.as_str());
    if subscriptions.len() == before {
        return Err(error(StatusCode::NOT_FOUND, "NotFound", format!("subscription {id} does not exist")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn deleted_entities(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, Response> {
    authorize(&db, &headers)?;
    Ok(Json(json!({"data": {"persons": [], "organisations": [], "groups": []}})))
}

async fn post_report(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(entries): Json<Value>,
) -> Result<StatusCode, Response> {
    authorize(&db, &headers)?;
    db.reports.write().await.push(entries);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_keeps_repeats_in_order() {
        let params = parse_query("type=Skolenhet&type=Huvudman&limit=2");
        assert_eq!(
            params,
            vec![
                ("type".to_string(), "Skolenhet".to_string()),
                ("type".to_string(), "Huvudman".to_string()),
                ("limit".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn parse_query_decodes_components() {
        let params = parse_query("meta.modified.after=2024-01-01T00%3A00%3A00%2B01%3A00");
        assert_eq!(params[0].1, "2024-01-01T00:00:00+01:00");
    }

    #[test]
    fn paginate_emits_token_until_last_page() {
        let items: Vec<Value> = (0..5).map(|i| json!({"n": i})).collect();
        let params = vec![("limit".to_string(), "2".to_string())];
        let page = paginate(items.clone(), &params).unwrap();
        assert_eq!(page["data"].as_array().unwrap().len(), 2);
        assert_eq!(page["pageToken"], "2");

        let params = vec![
            ("limit".to_string(), "2".to_string()),
            ("pageToken".to_string(), "4".to_string()),
        ];
        let page = paginate(items, &params).unwrap();
        assert_eq!(page["data"], json!([{"n": 4}]));
        assert!(page.get("pageToken").is_none());
    }

    #[test]
    fn filters_ignore_control_keys() {
        let entity = json!({"type": "Skolenhet"});
        let params = vec![
            ("type".to_string(), "Huvudman".to_string()),
            ("type".to_string(), "Skolenhet".to_string()),
            ("limit".to_string(), "1".to_string()),
        ];
        assert!(matches_filters(&entity, &params));
        assert!(!matches_filters(&entity, &[("type".to_string(), "Huvudman".to_string())]));
    }

    #[test]
    fn seeded_ids_are_stable() {
        assert_eq!(seed_id(1), "00000000-0000-0000-0000-000000000001");
    }
}
