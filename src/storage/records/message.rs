use crate::domain::message::{Attachment, MessageStatus};
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub(crate) struct MessageRecord {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub student_id: Option<Uuid>,
    pub content: String,
    pub status: String,
    pub read_at: Option<OffsetDateTime>,
    pub attachments: Json<Vec<Attachment>>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<MessageRecord> for crate::domain::message::Message {
    fn from(record: MessageRecord) -> Self {
        let status = MessageStatus::from_stored(&record.status, record.read_at, record.updated_at);
        Self {
            id: record.id,
            sender_id: record.sender_id,
            receiver_id: record.receiver_id,
            student_id: record.student_id,
            content: record.content,
            status,
            attachments: record.attachments.0,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
