use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use convene_core::ReviewUpdate;
use convene_shared::{EventId, ReviewId, UserId};
use convene_store::{RatingStats, Review};

use super::{with_engine, Actor, AppState};
use crate::error::ServerError;

#[derive(Deserialize)]
pub(super) struct NewReview {
    event_id: EventId,
    rating: u8,
    #[serde(default)]
    comment: String,
}

pub(super) async fn create(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<NewReview>,
) -> Result<(StatusCode, Json<Review>), ServerError> {
    let review = with_engine(&state, move |engine| {
        engine.create_review(body.event_id, actor, body.rating, &body.comment)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub(super) async fn update(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<ReviewId>,
    Json(update): Json<ReviewUpdate>,
) -> Result<Json<Review>, ServerError> {
    with_engine(&state, move |engine| engine.update_review(id, actor, update))
        .await
        .map(Json)
}

pub(super) async fn delete(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode, ServerError> {
    with_engine(&state, move |engine| engine.delete_review(id, actor)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn for_event(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<Json<Vec<Review>>, ServerError> {
    with_engine(&state, move |engine| engine.reviews_for_event(id))
        .await
        .map(Json)
}

pub(super) async fn for_host(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<Vec<Review>>, ServerError> {
    with_engine(&state, move |engine| engine.reviews_for_host(id))
        .await
        .map(Json)
}

pub(super) async fn event_stats(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<Json<RatingStats>, ServerError> {
    with_engine(&state, move |engine| engine.event_rating_stats(id))
        .await
        .map(Json)
}

pub(super) async fn host_stats(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<RatingStats>, ServerError> {
    with_engine(&state, move |engine| engine.host_rating_stats(id))
        .await
        .map(Json)
}

#[derive(Serialize)]
pub(super) struct CanReviewResponse {
    can_review: bool,
}

pub(super) async fn can_review(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<EventId>,
) -> Result<Json<CanReviewResponse>, ServerError> {
    let can_review = with_engine(&state, move |engine| engine.can_review(id, actor)).await?;
    Ok(Json(CanReviewResponse { can_review }))
}
