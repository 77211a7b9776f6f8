use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use convene_core::{NewUser, ProfileUpdate};
use convene_shared::UserId;
use convene_store::User;

use super::{with_engine, Actor, AppState};
use crate::error::ServerError;

pub(super) async fn register(
    State(state): State<AppState>,
    Json(new): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ServerError> {
    let user = with_engine(&state, move |engine| engine.register_user(new)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(super) async fn get(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<User>, ServerError> {
    with_engine(&state, move |engine| engine.get_user(id))
        .await
        .map(Json)
}

#[derive(Deserialize)]
pub(super) struct EmailQuery {
    email: String,
}

pub(super) async fn find_by_email(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<User>, ServerError> {
    with_engine(&state, move |engine| engine.find_user_by_email(&query.email))
        .await
        .map(Json)
}

pub(super) async fn update_profile(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<UserId>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>, ServerError> {
    with_engine(&state, move |engine| engine.update_profile(id, actor, update))
        .await
        .map(Json)
}

#[derive(Deserialize)]
pub(super) struct PasswordChange {
    password_hash: String,
}

pub(super) async fn change_password(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<UserId>,
    Json(change): Json<PasswordChange>,
) -> Result<StatusCode, ServerError> {
    with_engine(&state, move |engine| {
        engine.change_password(id, actor, &change.password_hash)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
