use crate::domain::message::Message;
use crate::domain::student::StudentSummary;
use crate::domain::user::UserProfile;

/// Derived, non-persisted view of a message thread grouped by counterpart.
/// Recomputed from the message log on every request; there is no stored
/// conversation entity.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub counterpart: UserProfile,
    pub student: Option<StudentSummary>,
    pub last_message: Message,
    pub unread_count: u64,
}
