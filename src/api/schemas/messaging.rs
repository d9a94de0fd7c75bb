use crate::domain::conversation::ConversationSummary;
use crate::domain::message::{Attachment, EnrichedMessage};
use crate::domain::student::StudentSummary;
use crate::domain::user::{Role, UserProfile};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: Option<String>,
    /// Accepts both `content` and the legacy `message` key.
    #[serde(default, alias = "message")]
    pub content: Option<String>,
    pub student_id: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A message participant on the wire: always carries the id, plus public
/// profile fields when enrichment succeeded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyPayload {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl PartyPayload {
    fn new(id: Uuid, profile: Option<UserProfile>) -> Self {
        profile.map_or(Self { id, name: None, role: None, avatar: None }, |p| Self {
            id: p.id,
            name: Some(p.name),
            role: Some(p.role),
            avatar: p.avatar,
        })
    }
}

/// Wire shape of a persisted message. `status` and the `read`/`readAt` pair
/// are projections of the same single lifecycle state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub id: Uuid,
    pub sender: PartyPayload,
    pub receiver: PartyPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentSummary>,
    pub content: String,
    pub status: &'static str,
    pub read: bool,
    #[serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub read_at: Option<OffsetDateTime>,
    pub attachments: Vec<Attachment>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<EnrichedMessage> for MessagePayload {
    fn from(enriched: EnrichedMessage) -> Self {
        let message = enriched.message;
        Self {
            id: message.id,
            sender: PartyPayload::new(message.sender_id, enriched.sender),
            receiver: PartyPayload::new(message.receiver_id, enriched.receiver),
            student: enriched.student,
            content: message.content,
            status: message.status.as_str(),
            read: message.status.is_read(),
            read_at: message.status.read_at(),
            attachments: message.attachments,
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub data: MessagePayload,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<MessagePayload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPayload {
    pub user: PartyPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentSummary>,
    pub last_message: MessagePayload,
    pub unread_count: u64,
}

impl From<ConversationSummary> for ConversationPayload {
    fn from(summary: ConversationSummary) -> Self {
        Self {
            user: PartyPayload::new(summary.counterpart.id, Some(summary.counterpart)),
            student: summary.student,
            last_message: EnrichedMessage::bare(summary.last_message).into(),
            unread_count: summary.unread_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<ConversationPayload>,
}
