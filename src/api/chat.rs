use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::chat::{StartConversationRequest, StartConversationResponse};
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

/// Starts a conversation with an available teacher.
///
/// # Errors
/// Returns `AppError::TeacherUnavailable` with alternative contacts when the
/// target teacher is unavailable, and `AppError::NoTeachersAvailable` when no
/// teacher can be reached at all.
pub async fn start_conversation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<StartConversationRequest>,
) -> Result<impl IntoResponse> {
    let (Some(recipient_id), Some(content)) = (body.recipient_id, body.content) else {
        return Err(AppError::BadRequest("Recipient and message content are required.".into()));
    };

    let recipient_id =
        Uuid::parse_str(&recipient_id).map_err(|_| AppError::BadRequest("Invalid ID format".into()))?;

    let enriched = state.message_service.start_conversation(auth_user.principal, recipient_id, &content).await?;

    Ok((
        StatusCode::CREATED,
        Json(StartConversationResponse {
            success: true,
            message: "Conversation started successfully",
            data: enriched.into(),
        }),
    ))
}
