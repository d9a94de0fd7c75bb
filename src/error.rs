use crate::domain::user::TeacherContact;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Authentication failed")]
    AuthError,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Selected teacher is not available")]
    TeacherUnavailable { available: Vec<TeacherContact> },
    #[error("No teachers available")]
    NoTeachersAvailable,
    #[error("Internal server error")]
    Internal,
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Machine-readable branch code carried alongside the error message.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::TeacherUnavailable { .. } => Some("TEACHER_UNAVAILABLE"),
            Self::NoTeachersAvailable => Some("NO_TEACHERS"),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            Self::AuthError => {
                tracing::debug!("Authentication failed");
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            Self::Forbidden(msg) => {
                tracing::debug!(message = %msg, "Forbidden");
                (StatusCode::FORBIDDEN, msg.clone())
            }
            Self::NotFound(what) => {
                tracing::debug!(entity = %what, "Resource not found");
                (StatusCode::NOT_FOUND, format!("{what} not found"))
            }
            Self::BadRequest(msg) => {
                tracing::debug!(message = %msg, "Bad request");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::TeacherUnavailable { .. } => {
                tracing::debug!("Requested teacher unavailable");
                (StatusCode::LOCKED, "Selected teacher is not available".to_string())
            }
            Self::NoTeachersAvailable => {
                tracing::debug!("No teachers available");
                (StatusCode::SERVICE_UNAVAILABLE, "No teachers available".to_string())
            }
            Self::Internal => {
                tracing::error!("Internal server error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let mut body = json!({
            "success": false,
            "error": message,
        });

        if let Some(code) = code
            && let Some(obj) = body.as_object_mut()
        {
            obj.insert("code".into(), json!(code));
        }

        match self {
            Self::TeacherUnavailable { available } => {
                if let Some(obj) = body.as_object_mut() {
                    obj.insert("availableTeachers".into(), json!(available));
                    obj.insert("suggestion".into(), json!("Please select from available teachers"));
                }
            }
            Self::NoTeachersAvailable => {
                if let Some(obj) = body.as_object_mut() {
                    obj.insert("availableTeachers".into(), json!([]));
                    obj.insert("suggestion".into(), json!("Please contact administration"));
                }
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}
