use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;

use convene_core::{EventDetails, EventDraft, EventFilter, NewImage};
use convene_shared::{EventId, EventImageId};
use convene_store::{Category, Event, EventImage};

use super::{with_engine, Actor, AppState};
use crate::error::ServerError;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub(super) struct NewCategory {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

pub(super) async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ServerError> {
    with_engine(&state, |engine| engine.list_categories())
        .await
        .map(Json)
}

pub(super) async fn create_category(
    State(state): State<AppState>,
    Json(new): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>), ServerError> {
    let category = with_engine(&state, move |engine| {
        engine.create_category(&new.name, &new.description, &new.icon)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Image upload entry.  `data` is base64, optionally as a `data:` URL.
#[derive(Deserialize)]
#[serde(untagged)]
pub(super) enum ImagePayload {
    Bare(String),
    WithCaption {
        data: String,
        #[serde(default)]
        caption: String,
    },
}

#[derive(Deserialize)]
pub(super) struct CreateEvent {
    #[serde(flatten)]
    draft: EventDraft,
    #[serde(default)]
    images: Vec<ImagePayload>,
}

#[derive(Deserialize)]
pub(super) struct AttachImages {
    images: Vec<ImagePayload>,
}

fn decode_images(payloads: Vec<ImagePayload>) -> Result<Vec<NewImage>, ServerError> {
    payloads
        .into_iter()
        .enumerate()
        .map(|(idx, payload)| {
            let (raw, caption) = match payload {
                ImagePayload::Bare(data) => (data, String::new()),
                ImagePayload::WithCaption { data, caption } => (data, caption),
            };
            // Strip a `data:image/png;base64,` style prefix.
            let encoded = raw.split_once(',').map_or(raw.as_str(), |(_, data)| data);
            let data = STANDARD
                .decode(encoded.trim())
                .map_err(|e| ServerError::BadRequest(format!("image {idx}: invalid base64: {e}")))?;
            Ok(NewImage { data, caption })
        })
        .collect()
}

pub(super) async fn list(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Result<Json<Vec<EventDetails>>, ServerError> {
    with_engine(&state, move |engine| engine.list_events(&filter))
        .await
        .map(Json)
}

/// Create an event together with any images sent along with it.
pub(super) async fn create(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<CreateEvent>,
) -> Result<(StatusCode, Json<EventDetails>), ServerError> {
    let images = decode_images(body.images)?;
    let draft = body.draft;

    let details = with_engine(&state, move |engine| {
        engine.create_event_with_images(actor, draft, images)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(details)))
}

pub(super) async fn get(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<Json<EventDetails>, ServerError> {
    with_engine(&state, move |engine| engine.get_event(id))
        .await
        .map(Json)
}

pub(super) async fn update(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<EventId>,
    Json(draft): Json<EventDraft>,
) -> Result<Json<Event>, ServerError> {
    with_engine(&state, move |engine| engine.update_event(id, actor, draft))
        .await
        .map(Json)
}

pub(super) async fn toggle_active(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<EventId>,
) -> Result<Json<Event>, ServerError> {
    with_engine(&state, move |engine| engine.toggle_event_active(id, actor))
        .await
        .map(Json)
}

pub(super) async fn deactivate(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<EventId>,
) -> Result<Json<Event>, ServerError> {
    with_engine(&state, move |engine| engine.deactivate_event(id, actor))
        .await
        .map(Json)
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

pub(super) async fn images(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<Json<Vec<EventImage>>, ServerError> {
    with_engine(&state, move |engine| engine.event_images(id))
        .await
        .map(Json)
}

pub(super) async fn attach_images(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<EventId>,
    Json(body): Json<AttachImages>,
) -> Result<(StatusCode, Json<Vec<EventImage>>), ServerError> {
    let images = decode_images(body.images)?;
    let stored = with_engine(&state, move |engine| engine.attach_images(id, actor, images)).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub(super) async fn image_data(
    State(state): State<AppState>,
    Path((id, image_id)): Path<(EventId, EventImageId)>,
) -> Result<impl IntoResponse, ServerError> {
    let data = with_engine(&state, move |engine| engine.event_image_data(id, image_id)).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data))
}
