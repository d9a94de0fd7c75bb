use crate::domain::user::{User, UserProfile};
use crate::error::Result;
use crate::storage::records::user::UserRecord;
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default)]
pub struct UserRepository;

impl UserRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    pub async fn find_by_id(&self, conn: &mut PgConnection, id: Uuid) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            r"
            SELECT id, name, email, role, avatar, phone, is_available
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(record.map(User::from))
    }

    /// Batched public-profile lookup for response enrichment.
    pub async fn find_profiles(&self, conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<UserProfile>> {
        let records = sqlx::query_as::<_, UserRecord>(
            r"
            SELECT id, name, email, role, avatar, phone, is_available
            FROM users
            WHERE id = ANY($1)
            ",
        )
        .bind(ids)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(|r| User::from(r).profile()).collect())
    }

    pub async fn find_available_teachers(&self, conn: &mut PgConnection) -> Result<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(
            r"
            SELECT id, name, email, role, avatar, phone, is_available
            FROM users
            WHERE role = 'teacher' AND is_available
            ORDER BY name ASC
            ",
        )
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(User::from).collect())
    }

    /// Loads a teacher row under `FOR UPDATE` so an availability flip cannot
    /// land between the check and a message insert in the same transaction.
    pub async fn find_teacher_for_update(&self, conn: &mut PgConnection, id: Uuid) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            r"
            SELECT id, name, email, role, avatar, phone, is_available
            FROM users
            WHERE id = $1 AND role = 'teacher'
            FOR UPDATE
            ",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(record.map(User::from))
    }
}
