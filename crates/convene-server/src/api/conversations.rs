use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use convene_core::{
    ConfirmedEvent, ConversationSummary, EventConversations, Thread, TransitionOutcome,
};
use convene_shared::{ConversationId, ConversationStatus, EventId, UserId};
use convene_store::{ConversationOverview, Message};

use super::{with_engine, Actor, AppState};
use crate::error::ServerError;

#[derive(Deserialize)]
pub(super) struct SubmitRequest {
    event_id: EventId,
    message: String,
}

#[derive(Serialize)]
pub(super) struct SubmitResponse {
    conversation_id: ConversationId,
    event_id: EventId,
    user_id: UserId,
    host_id: UserId,
    message_count: u32,
    is_new_conversation: bool,
}

/// Open a request thread or append to the caller's existing one.  Answers
/// 201 when a thread was opened and 200 otherwise.
pub(super) async fn submit(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ServerError> {
    let outcome = with_engine(&state, move |engine| {
        engine.submit_request(req.event_id, actor, &req.message)
    })
    .await?;

    let status = if outcome.is_new_conversation {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let c = outcome.conversation;
    Ok((
        status,
        Json(SubmitResponse {
            conversation_id: c.id,
            event_id: c.event_id,
            user_id: c.user_id,
            host_id: c.host_id,
            message_count: outcome.message_count,
            is_new_conversation: outcome.is_new_conversation,
        }),
    ))
}

#[derive(Deserialize)]
pub(super) struct StatusChange {
    status: String,
}

pub(super) async fn transition(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<ConversationId>,
    Json(change): Json<StatusChange>,
) -> Result<Json<TransitionOutcome>, ServerError> {
    let status: ConversationStatus = change
        .status
        .parse()
        .map_err(|e: convene_shared::ParseError| ServerError::BadRequest(e.to_string()))?;

    with_engine(&state, move |engine| engine.transition_status(id, actor, status))
        .await
        .map(Json)
}

pub(super) async fn thread(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
) -> Result<Json<Thread>, ServerError> {
    with_engine(&state, move |engine| engine.get_thread(id))
        .await
        .map(Json)
}

pub(super) async fn for_user(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> Result<Json<Vec<ConversationSummary>>, ServerError> {
    with_engine(&state, move |engine| engine.list_for_user(actor))
        .await
        .map(Json)
}

pub(super) async fn for_event(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<EventId>,
) -> Result<Json<EventConversations>, ServerError> {
    with_engine(&state, move |engine| engine.list_for_event(id, actor))
        .await
        .map(Json)
}

pub(super) async fn mine_for_event(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<EventId>,
) -> Result<Json<Option<ConversationOverview>>, ServerError> {
    with_engine(&state, move |engine| engine.find_for_event(id, actor))
        .await
        .map(Json)
}

pub(super) async fn confirmed_events(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<Vec<ConfirmedEvent>>, ServerError> {
    with_engine(&state, move |engine| engine.confirmed_events_for_user(id))
        .await
        .map(Json)
}

#[derive(Deserialize)]
pub(super) struct NewMessage {
    text: String,
}

pub(super) async fn append(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<ConversationId>,
    Json(body): Json<NewMessage>,
) -> Result<(StatusCode, Json<Message>), ServerError> {
    let message =
        with_engine(&state, move |engine| engine.append_message(id, actor, &body.text)).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Serialize)]
pub(super) struct MarkReadResponse {
    marked_count: usize,
}

pub(super) async fn mark_read(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<ConversationId>,
) -> Result<Json<MarkReadResponse>, ServerError> {
    let marked_count = with_engine(&state, move |engine| engine.mark_read(id, actor)).await?;
    Ok(Json(MarkReadResponse { marked_count }))
}
