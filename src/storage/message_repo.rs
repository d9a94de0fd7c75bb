use crate::domain::message::{Attachment, Message};
use crate::error::Result;
use crate::storage::records::message::MessageRecord;
use sqlx::PgConnection;
use sqlx::types::Json;
use uuid::Uuid;

/// Which slice of a principal's message log to operate on.
#[derive(Debug, Clone, Copy)]
pub enum ThreadScope {
    /// Every message the principal sent or received.
    All,
    /// Messages scoped to a specific student.
    Student(Uuid),
    /// Messages exchanged with a specific counterpart.
    Counterpart(Uuid),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MessageRepository;

impl MessageRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Persists a new message with `status = 'sent'`. Ids are UUIDv7, giving
    /// a stable time-ordered tiebreak next to `created_at`.
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        sender_id: Uuid,
        receiver_id: Uuid,
        student_id: Option<Uuid>,
        content: &str,
        attachments: &[Attachment],
    ) -> Result<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r"
            INSERT INTO messages (id, sender_id, receiver_id, student_id, content, attachments)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, sender_id, receiver_id, student_id, content, status, read_at,
                      attachments, created_at, updated_at
            ",
        )
        .bind(Uuid::now_v7())
        .bind(sender_id)
        .bind(receiver_id)
        .bind(student_id)
        .bind(content)
        .bind(Json(attachments))
        .fetch_one(conn)
        .await?;

        Ok(record.into())
    }

    /// Fetches a thread in chat-rendering order: oldest first, id as tiebreak.
    pub async fn fetch_thread(&self, conn: &mut PgConnection, user_id: Uuid, scope: ThreadScope) -> Result<Vec<Message>> {
        let records = match scope {
            ThreadScope::All => {
                sqlx::query_as::<_, MessageRecord>(
                    r"
                    SELECT id, sender_id, receiver_id, student_id, content, status, read_at,
                           attachments, created_at, updated_at
                    FROM messages
                    WHERE sender_id = $1 OR receiver_id = $1
                    ORDER BY created_at ASC, id ASC
                    ",
                )
                .bind(user_id)
                .fetch_all(conn)
                .await?
            }
            ThreadScope::Student(student_id) => {
                sqlx::query_as::<_, MessageRecord>(
                    r"
                    SELECT id, sender_id, receiver_id, student_id, content, status, read_at,
                           attachments, created_at, updated_at
                    FROM messages
                    WHERE (sender_id = $1 OR receiver_id = $1) AND student_id = $2
                    ORDER BY created_at ASC, id ASC
                    ",
                )
                .bind(user_id)
                .bind(student_id)
                .fetch_all(conn)
                .await?
            }
            ThreadScope::Counterpart(other_id) => {
                sqlx::query_as::<_, MessageRecord>(
                    r"
                    SELECT id, sender_id, receiver_id, student_id, content, status, read_at,
                           attachments, created_at, updated_at
                    FROM messages
                    WHERE (sender_id = $1 AND receiver_id = $2)
                       OR (sender_id = $2 AND receiver_id = $1)
                    ORDER BY created_at ASC, id ASC
                    ",
                )
                .bind(user_id)
                .bind(other_id)
                .fetch_all(conn)
                .await?
            }
        };

        Ok(records.into_iter().map(Message::from).collect())
    }

    /// Marks every unread message addressed to `reader_id` within the scope as
    /// read. A single conditional bulk update, so concurrent repetitions are
    /// idempotent: already-read rows never match the predicate again.
    pub async fn mark_thread_read(&self, conn: &mut PgConnection, reader_id: Uuid, scope: ThreadScope) -> Result<u64> {
        let result = match scope {
            ThreadScope::All => {
                sqlx::query(
                    r"
                    UPDATE messages
                    SET status = 'read', read_at = NOW(), updated_at = NOW()
                    WHERE receiver_id = $1 AND status <> 'read'
                    ",
                )
                .bind(reader_id)
                .execute(conn)
                .await?
            }
            ThreadScope::Student(student_id) => {
                sqlx::query(
                    r"
                    UPDATE messages
                    SET status = 'read', read_at = NOW(), updated_at = NOW()
                    WHERE receiver_id = $1 AND status <> 'read' AND student_id = $2
                    ",
                )
                .bind(reader_id)
                .bind(student_id)
                .execute(conn)
                .await?
            }
            ThreadScope::Counterpart(other_id) => {
                sqlx::query(
                    r"
                    UPDATE messages
                    SET status = 'read', read_at = NOW(), updated_at = NOW()
                    WHERE receiver_id = $1 AND status <> 'read' AND sender_id = $2
                    ",
                )
                .bind(reader_id)
                .bind(other_id)
                .execute(conn)
                .await?
            }
        };

        Ok(result.rows_affected())
    }

    /// Fetches every message involving the user, newest first. Feeds the
    /// in-process conversation aggregation.
    pub async fn fetch_all_involving(&self, conn: &mut PgConnection, user_id: Uuid) -> Result<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r"
            SELECT id, sender_id, receiver_id, student_id, content, status, read_at,
                   attachments, created_at, updated_at
            FROM messages
            WHERE sender_id = $1 OR receiver_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Message::from).collect())
    }
}
