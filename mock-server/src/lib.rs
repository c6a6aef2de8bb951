//! Target-origin API that relay documents call on behalf of embedding pages.
//!
//! Serves a small token-guarded item store plus an `/echo` endpoint that
//! reflects the method, token and body it received, so tests can check what
//! actually crossed the relay.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Header every write to the item store must carry.
pub const TOKEN_HEADER: &str = "x-token";

/// Header reporting how many items a listing returned.
pub const COUNT_HEADER: &str = "x-item-count";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateItem {
    pub name: String,
}

/// What `/echo` saw.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Echo {
    pub method: String,
    pub token: Option<String>,
    pub body: String,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Item>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/{id}", get(get_item).delete(delete_item))
        .route("/echo", any(echo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn list_items(State(db): State<Db>) -> impl IntoResponse {
    let items: Vec<Item> = db.read().await.values().cloned().collect();
    let count = items.len().to_string();
    ([(COUNT_HEADER, count)], Json(items))
}

async fn create_item(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateItem>,
) -> Result<(StatusCode, Json<Item>), (StatusCode, &'static str)> {
    if token(&headers).is_none() {
        tracing::debug!("rejecting item creation without token");
        return Err((StatusCode::UNAUTHORIZED, "missing X-Token"));
    }
    let item = Item {
        id: Uuid::new_v4(),
        name: input.name,
    };
    db.write().await.insert(item.id, item.clone());
    tracing::debug!(id = %item.id, "item created");
    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_item(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<Item>, StatusCode> {
    let items = db.read().await;
    items.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn delete_item(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let mut items = db.write().await;
    items.remove(&id).map(|_| StatusCode::NO_CONTENT).ok_or(StatusCode::NOT_FOUND)
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Echo> {
    Json(Echo {
        method: method.to_string(),
        token: token(&headers),
        body,
    })
}
