use crate::domain::conversation::ConversationSummary;
use crate::domain::message::Message;
use crate::domain::student::StudentSummary;
use crate::domain::user::{Principal, UserProfile};
use crate::error::Result;
use crate::storage::DbPool;
use crate::storage::message_repo::MessageRepository;
use crate::storage::student_repo::StudentRepository;
use crate::storage::user_repo::UserRepository;
use opentelemetry::{
    global,
    metrics::Histogram,
};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    scan_size: Histogram<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("parentline-server");
        Self {
            scan_size: meter
                .u64_histogram("conversation_scan_size")
                .with_description("Messages scanned per conversation-list request")
                .build(),
        }
    }
}

/// One conversation derived from the flat message log, before profile joins.
#[derive(Debug, Clone)]
pub(crate) struct ConversationGroup {
    pub counterpart_id: Uuid,
    pub student_id: Option<Uuid>,
    pub last_message: Message,
    pub unread_count: u64,
}

/// Pure read-side projection over the message log. Holds no state of its own;
/// every listing is recomputed from scratch.
#[derive(Clone, Debug)]
pub struct ConversationService {
    pool: DbPool,
    messages: MessageRepository,
    users: UserRepository,
    students: StudentRepository,
    metrics: Metrics,
}

impl ConversationService {
    #[must_use]
    pub fn new(pool: DbPool, messages: MessageRepository, users: UserRepository, students: StudentRepository) -> Self {
        Self { pool, messages, users, students, metrics: Metrics::new() }
    }

    /// Lists the principal's conversations, most recently active first, each
    /// summarized by its last message and the count of messages still unread
    /// by the principal.
    ///
    /// # Errors
    /// Returns `AppError::Database` if any query fails.
    #[tracing::instrument(err(level = "warn"), skip(self, principal), fields(user_id = %principal.id))]
    pub async fn list(&self, principal: Principal) -> Result<Vec<ConversationSummary>> {
        let mut conn = self.pool.acquire().await?;
        let messages = self.messages.fetch_all_involving(&mut conn, principal.id).await?;
        self.metrics.scan_size.record(messages.len() as u64, &[]);

        let groups = aggregate(principal.id, messages);

        let counterpart_ids: Vec<Uuid> = groups.iter().map(|g| g.counterpart_id).collect();
        let mut student_ids: Vec<Uuid> = Vec::new();
        for group in &groups {
            if let Some(id) = group.student_id
                && !student_ids.contains(&id)
            {
                student_ids.push(id);
            }
        }

        let profiles: HashMap<Uuid, UserProfile> =
            self.users.find_profiles(&mut conn, &counterpart_ids).await?.into_iter().map(|p| (p.id, p)).collect();
        let students: HashMap<Uuid, StudentSummary> = if student_ids.is_empty() {
            HashMap::new()
        } else {
            self.students.find_summaries(&mut conn, &student_ids).await?.into_iter().map(|s| (s.id, s)).collect()
        };

        // Counterparts whose user row has vanished are dropped rather than
        // rendered as half-empty cards.
        Ok(groups
            .into_iter()
            .filter_map(|group| {
                let counterpart = profiles.get(&group.counterpart_id).cloned()?;
                Some(ConversationSummary {
                    counterpart,
                    student: group.student_id.and_then(|id| students.get(&id).cloned()),
                    last_message: group.last_message,
                    unread_count: group.unread_count,
                })
            })
            .collect())
    }
}

/// Groups a principal's messages by counterpart. Input order does not matter;
/// the output is sorted by last-message recency, newest first, with the
/// message id (UUIDv7, time-ordered) breaking timestamp ties.
pub(crate) fn aggregate(principal_id: Uuid, messages: Vec<Message>) -> Vec<ConversationGroup> {
    let mut groups: HashMap<Uuid, ConversationGroup> = HashMap::new();
    // Recency of the newest scoped message seen per counterpart, so the
    // subject tracks the most recent scoped message under any input order.
    let mut scoped_marks: HashMap<Uuid, (time::OffsetDateTime, Uuid)> = HashMap::new();

    for message in messages {
        let counterpart_id = message.counterpart_of(principal_id);
        let unread = u64::from(message.is_unread_for(principal_id));
        let mark = (message.created_at, message.id);

        let scoped_newer = message.student_id.is_some()
            && scoped_marks.get(&counterpart_id).is_none_or(|existing| mark > *existing);
        if scoped_newer {
            scoped_marks.insert(counterpart_id, mark);
        }

        match groups.entry(counterpart_id) {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                let group = entry.get_mut();
                group.unread_count += unread;
                if scoped_newer {
                    group.student_id = message.student_id;
                }
                if mark > (group.last_message.created_at, group.last_message.id) {
                    group.last_message = message;
                }
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(ConversationGroup {
                    counterpart_id,
                    student_id: message.student_id,
                    last_message: message,
                    unread_count: unread,
                });
            }
        }
    }

    let mut groups: Vec<ConversationGroup> = groups.into_values().collect();
    groups.sort_by(|a, b| {
        (b.last_message.created_at, b.last_message.id).cmp(&(a.last_message.created_at, a.last_message.id))
    });
    groups
}
