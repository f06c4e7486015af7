use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::error::{AppError, AppResult};
use super::state::AppState;
use crate::feed::{codec, render_rss};
use crate::storage::{FeedMetadata, Item, StorageError};
use crate::util::item_key_for;

const RSS_CONTENT_TYPE: &str = "application/rss+xml";

/// Body returned after an item is created: the key it is stored under.
#[derive(Debug, Serialize)]
pub struct CreatedItem {
    pub key: String,
}

/// `GET /feeds`: metadata of every readable feed, keyed by feed name.
pub async fn list_feeds(
    State(state): State<AppState>,
) -> AppResult<Json<BTreeMap<String, FeedMetadata>>> {
    let listing = state.store.list_feeds().await?;
    Ok(Json(listing.into_map()))
}

/// `POST /feeds/{feed}`: create a feed from a metadata JSON body.
pub async fn create_feed(
    State(state): State<AppState>,
    Path(feed): Path<String>,
    body: Bytes,
) -> AppResult<StatusCode> {
    state.store.create_feed(&feed, &body).await?;
    tracing::info!(feed = %feed, "Created feed");
    Ok(StatusCode::CREATED)
}

/// `GET /feeds/{feed}`: RSS by default, JSON with decoded descriptions on
/// `Accept: application/json`.
pub async fn get_feed(
    State(state): State<AppState>,
    Path(feed): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let loaded = state.store.load_feed(&feed).await?;

    if wants_json(&headers) {
        return Ok(Json(codec::decode_descriptions(loaded)).into_response());
    }

    let xml = render_rss(&loaded)
        .map_err(|e| AppError::internal(format!("Cannot render feed {feed}: {e:#}")))?;
    Ok(([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], xml).into_response())
}

/// `GET /feeds/{feed}/items`: every readable item, keyed by item key.
pub async fn list_items(
    State(state): State<AppState>,
    Path(feed): Path<String>,
) -> AppResult<Json<BTreeMap<String, Item>>> {
    let listing = state.store.load_feed_items(&feed).await?;
    Ok(Json(listing.into_map()))
}

/// `POST /feeds/{feed}/items`: store an item under its sanitized title.
pub async fn create_item(
    State(state): State<AppState>,
    Path(feed): Path<String>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<CreatedItem>)> {
    if !state.store.feed_exists(&feed).await {
        return Err(StorageError::FeedNotFound(feed).into());
    }

    let item = codec::decode_item(&body)
        .map_err(|e| AppError::bad_request(format!("Cannot create item: {e}")))?;
    let key = item_key_for(&item.title)?;

    state.store.create_item(&feed, &key, &body).await?;
    tracing::info!(feed = %feed, item = %key, "Created item");
    Ok((StatusCode::CREATED, Json(CreatedItem { key })))
}

/// `GET /feeds/{feed}/items/{item}`: a single item as stored.
pub async fn get_item(
    State(state): State<AppState>,
    Path((feed, item)): Path<(String, String)>,
) -> AppResult<Json<Item>> {
    let loaded = state.store.load_item(&feed, &item).await?;
    Ok(Json(loaded))
}

/// Only an exact `application/json` selects JSON; anything else gets RSS.
fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("application/json"))
}
