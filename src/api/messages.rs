use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::messaging::{
    ConversationListResponse, MessageListResponse, MessagePayload, MessageResponse, SendMessageRequest,
};
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Invalid ID format".into()))
}

/// Sends a message to a recipient, optionally scoped to a student.
///
/// # Errors
/// Returns `AppError::BadRequest` on missing or malformed input.
/// Returns `AppError::Forbidden` or `AppError::NotFound` per the relationship
/// checks in the message service.
pub async fn send_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<SendMessageRequest>,
) -> Result<impl IntoResponse> {
    let (Some(receiver_id), Some(content)) = (body.receiver_id, body.content) else {
        return Err(AppError::BadRequest("Receiver ID and message content are required.".into()));
    };

    let receiver_id = parse_id(&receiver_id)?;
    let student_id = body.student_id.as_deref().map(parse_id).transpose()?;

    let enriched = state
        .message_service
        .send_message(auth_user.principal, receiver_id, &content, student_id, body.attachments)
        .await?;

    Ok((StatusCode::CREATED, Json(MessageResponse { success: true, data: enriched.into() })))
}

/// Fetches the caller's full thread across all counterparts.
pub async fn get_messages(auth_user: AuthUser, State(state): State<AppState>) -> Result<impl IntoResponse> {
    thread_response(&state, auth_user, None).await
}

/// Fetches the caller's thread scoped to a student or counterpart.
pub async fn get_messages_scoped(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(scope_id): Path<String>,
) -> Result<impl IntoResponse> {
    let scope_id = parse_id(&scope_id)?;
    thread_response(&state, auth_user, Some(scope_id)).await
}

async fn thread_response(state: &AppState, auth_user: AuthUser, scope_id: Option<Uuid>) -> Result<Json<MessageListResponse>> {
    let messages = state.message_service.get_thread(auth_user.principal, scope_id).await?;
    let data: Vec<MessagePayload> = messages.into_iter().map(MessagePayload::from).collect();

    Ok(Json(MessageListResponse { success: true, count: data.len(), data }))
}

/// Lists the caller's conversations, most recently active first.
pub async fn get_conversations(auth_user: AuthUser, State(state): State<AppState>) -> Result<impl IntoResponse> {
    let summaries = state.conversation_service.list(auth_user.principal).await?;
    let data: Vec<_> = summaries.into_iter().map(Into::into).collect();

    Ok(Json(ConversationListResponse { success: true, count: data.len(), data }))
}
