use crate::domain::user::Role;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub(crate) struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub avatar: Option<String>,
    pub phone: Option<String>,
    pub is_available: bool,
}

impl From<UserRecord> for crate::domain::user::User {
    fn from(record: UserRecord) -> Self {
        // The column carries a CHECK constraint; 'parent' matches the schema default.
        let role = Role::parse(&record.role).unwrap_or(Role::Parent);
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            role,
            avatar: record.avatar,
            phone: record.phone,
            is_available: record.is_available,
        }
    }
}
