use crate::domain::user::{TeacherContact, User, UserProfile};
use crate::error::Result;
use crate::storage::student_repo::StudentRepository;
use crate::storage::user_repo::UserRepository;
use crate::storage::DbPool;
use uuid::Uuid;

/// Resolves who may talk to whom: guardianship, teacher assignment, and
/// teacher availability. All relationship checks for the messaging core go
/// through here.
#[derive(Clone, Debug)]
pub struct ParticipantDirectory {
    pool: DbPool,
    users: UserRepository,
    students: StudentRepository,
}

impl ParticipantDirectory {
    #[must_use]
    pub const fn new(pool: DbPool, users: UserRepository, students: StudentRepository) -> Self {
        Self { pool, users, students }
    }

    /// True when the student belongs to this parent.
    pub async fn guardian_of(&self, parent_id: Uuid, student_id: Uuid) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        self.students.is_guardian(&mut conn, parent_id, student_id).await
    }

    /// True when the student is assigned to this teacher.
    pub async fn assigned_to(&self, teacher_id: Uuid, student_id: Uuid) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        self.students.is_assigned_teacher(&mut conn, teacher_id, student_id).await
    }

    pub async fn find_participant(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        let mut conn = self.pool.acquire().await?;
        Ok(self.users.find_by_id(&mut conn, user_id).await?.map(|u| u.profile()))
    }

    pub async fn available_teachers(&self) -> Result<Vec<TeacherContact>> {
        let mut conn = self.pool.acquire().await?;
        let teachers = self.users.find_available_teachers(&mut conn).await?;
        Ok(teachers.into_iter().map(contact_of).collect())
    }
}

pub(crate) fn contact_of(user: User) -> TeacherContact {
    TeacherContact { id: user.id, name: user.name, email: user.email }
}
