use crate::domain::student::StudentSummary;
use crate::domain::user::UserProfile;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Message lifecycle. The transition is one-way: a message starts `Sent` and
/// may move to `Read` exactly once; it never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Sent,
    Read { at: OffsetDateTime },
}

impl MessageStatus {
    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(self, Self::Read { .. })
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Read { .. } => "read",
        }
    }

    #[must_use]
    pub const fn read_at(self) -> Option<OffsetDateTime> {
        match self {
            Self::Sent => None,
            Self::Read { at } => Some(at),
        }
    }

    /// Rebuilds the tagged state from its stored projection. A `read` row
    /// without a timestamp falls back to `updated_at` so the variant is
    /// always fully populated.
    #[must_use]
    pub fn from_stored(status: &str, read_at: Option<OffsetDateTime>, updated_at: OffsetDateTime) -> Self {
        if status == "read" { Self::Read { at: read_at.unwrap_or(updated_at) } } else { Self::Sent }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub student_id: Option<Uuid>,
    pub content: String,
    pub status: MessageStatus,
    pub attachments: Vec<Attachment>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Message {
    /// The party on the other side of this message relative to `user_id`.
    #[must_use]
    pub fn counterpart_of(&self, user_id: Uuid) -> Uuid {
        if self.sender_id == user_id { self.receiver_id } else { self.sender_id }
    }

    /// True when this message sits unread in `user_id`'s inbox.
    #[must_use]
    pub fn is_unread_for(&self, user_id: Uuid) -> bool {
        self.receiver_id == user_id && !self.status.is_read()
    }
}

/// A persisted message joined with the public profiles of its participants.
/// Enrichment is best-effort: profile fields may be absent when a follow-up
/// lookup failed, but the message itself is always the durable record.
#[derive(Debug, Clone)]
pub struct EnrichedMessage {
    pub message: Message,
    pub sender: Option<UserProfile>,
    pub receiver: Option<UserProfile>,
    pub student: Option<StudentSummary>,
}

impl EnrichedMessage {
    #[must_use]
    pub const fn bare(message: Message) -> Self {
        Self { message, sender: None, receiver: None, student: None }
    }
}
