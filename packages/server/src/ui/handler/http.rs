//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    domain::{ChatId, RepositoryError, StoredMessage, Topic, TopicKind, Username},
    infrastructure::dto::http::{
        CreateUserRequest, DeletedPrivateChatDto, IdentityDto, MessageHistoryItemDto,
        OpenPrivateChatRequest, PrivateChatDto, TopicSummaryDto, ViewerQuery,
    },
    ui::state::AppState,
};

use super::websocket::connect_error_status;

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Active topic groups and their subscriber counts
pub async fn list_topics(State(state): State<Arc<AppState>>) -> Json<Vec<TopicSummaryDto>> {
    let topics = state
        .registry
        .topics()
        .await
        .into_iter()
        .map(|summary| TopicSummaryDto {
            topic: summary.topic.group_name(),
            kind: match summary.topic.kind() {
                TopicKind::Room => "room".to_string(),
                TopicKind::Private => "private".to_string(),
            },
            subscribers: summary.subscribers,
            active_since: summary.active_since.to_wire_string(),
        })
        .collect();

    Json(topics)
}

/// Get or create a user
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<IdentityDto>, StatusCode> {
    let username = Username::new(request.username).map_err(|_| StatusCode::BAD_REQUEST)?;
    let identity = state
        .identities
        .resolve_or_create(&username)
        .await
        .map_err(|e| repository_error_status(&e))?;

    Ok(Json(IdentityDto {
        id: identity.id.value(),
        username: identity.username.into_string(),
    }))
}

/// Room message history in persistence order
pub async fn room_history(
    State(state): State<Arc<AppState>>,
    Path(room_name): Path<String>,
) -> Result<Json<Vec<MessageHistoryItemDto>>, StatusCode> {
    let topic = Topic::room_from_route(&room_name).map_err(|_| StatusCode::BAD_REQUEST)?;
    history(&state, &topic).await
}

/// Get or create the private chat between two users
pub async fn open_private_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OpenPrivateChatRequest>,
) -> Result<Json<PrivateChatDto>, StatusCode> {
    let initiator = Username::new(request.initiator).map_err(|_| StatusCode::BAD_REQUEST)?;
    let target = Username::new(request.target).map_err(|_| StatusCode::BAD_REQUEST)?;

    let initiator = state
        .identities
        .resolve_strict(&initiator)
        .await
        .map_err(|e| repository_error_status(&e))?;
    let target = state
        .identities
        .resolve_strict(&target)
        .await
        .map_err(|e| repository_error_status(&e))?;

    let chat_id = state
        .private_chats
        .open_between(&initiator, &target)
        .await
        .map_err(|e| repository_error_status(&e))?;

    Ok(Json(PrivateChatDto {
        chat_id: chat_id.value(),
    }))
}

/// Private chats of one user, in chat id order
pub async fn list_private_chats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<Vec<PrivateChatDto>>, StatusCode> {
    let username = query
        .username
        .ok_or(StatusCode::BAD_REQUEST)
        .and_then(|raw| Username::new(raw).map_err(|_| StatusCode::BAD_REQUEST))?;

    let identity = state
        .identities
        .resolve_strict(&username)
        .await
        .map_err(|e| repository_error_status(&e))?;
    let chats = state
        .private_chats
        .list_for(&identity)
        .await
        .map_err(|e| repository_error_status(&e))?;

    Ok(Json(
        chats
            .into_iter()
            .map(|chat_id| PrivateChatDto {
                chat_id: chat_id.value(),
            })
            .collect(),
    ))
}

/// Delete a private chat; live sessions on it are closed
pub async fn delete_private_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<DeletedPrivateChatDto>, StatusCode> {
    let chat_id = ChatId::parse(&chat_id).map_err(|_| StatusCode::BAD_REQUEST)?;
    let requester = query.username.and_then(|raw| Username::new(raw).ok());

    let deleted = state
        .delete_private_chat_usecase()
        .execute(chat_id, requester.as_ref())
        .await
        .map_err(|e| {
            tracing::warn!("Refused to delete private chat {}: {}", chat_id, e);
            connect_error_status(&e)
        })?;

    Ok(Json(DeletedPrivateChatDto {
        chat_id: deleted.chat_id.value(),
        closed_sessions: deleted.closed_sessions,
        deleted_messages: deleted.deleted_messages,
    }))
}

/// Private chat history, visible to participants only
pub async fn private_chat_history(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<Vec<MessageHistoryItemDto>>, StatusCode> {
    let topic = Topic::private_from_route(&chat_id).map_err(|_| StatusCode::BAD_REQUEST)?;
    let viewer = query.username.and_then(|raw| Username::new(raw).ok());

    state
        .open_session_usecase()
        .authorize(&topic, viewer.as_ref())
        .await
        .map_err(|e| {
            tracing::warn!("Denied history of '{}': {}", topic, e);
            connect_error_status(&e)
        })?;

    history(&state, &topic).await
}

async fn history(
    state: &AppState,
    topic: &Topic,
) -> Result<Json<Vec<MessageHistoryItemDto>>, StatusCode> {
    let messages = state
        .messages
        .history(topic)
        .await
        .map_err(|e| repository_error_status(&e))?;

    Ok(Json(messages.iter().map(history_item).collect()))
}

fn history_item(message: &StoredMessage) -> MessageHistoryItemDto {
    MessageHistoryItemDto {
        id: message.id,
        sender: message.author.username.as_str().to_string(),
        body: message.body.as_str().to_string(),
        created_at: message.created_at.to_wire_string(),
    }
}

fn repository_error_status(error: &RepositoryError) -> StatusCode {
    match error {
        RepositoryError::IdentityNotFound(_) | RepositoryError::ChatNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        RepositoryError::InvalidParticipants => StatusCode::BAD_REQUEST,
        RepositoryError::Unavailable(reason) => {
            tracing::error!("Store unavailable: {}", reason);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
