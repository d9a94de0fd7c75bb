use crate::domain::student::{Student, StudentSummary};
use crate::error::Result;
use crate::storage::records::student::StudentRecord;
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default)]
pub struct StudentRepository;

impl StudentRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    pub async fn find_by_id(&self, conn: &mut PgConnection, id: Uuid) -> Result<Option<Student>> {
        let record = sqlx::query_as::<_, StudentRecord>(
            r"
            SELECT id, name, class_level, parent_id, teacher_id
            FROM students
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(record.map(Student::from))
    }

    pub async fn find_summaries(&self, conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<StudentSummary>> {
        let records = sqlx::query_as::<_, StudentRecord>(
            r"
            SELECT id, name, class_level, parent_id, teacher_id
            FROM students
            WHERE id = ANY($1)
            ",
        )
        .bind(ids)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(|r| Student::from(r).summary()).collect())
    }

    pub async fn is_guardian(&self, conn: &mut PgConnection, parent_id: Uuid, student_id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM students WHERE id = $1 AND parent_id = $2)")
                .bind(student_id)
                .bind(parent_id)
                .fetch_one(conn)
                .await?;

        Ok(exists)
    }

    pub async fn is_assigned_teacher(&self, conn: &mut PgConnection, teacher_id: Uuid, student_id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM students WHERE id = $1 AND teacher_id = $2)")
                .bind(student_id)
                .bind(teacher_id)
                .fetch_one(conn)
                .await?;

        Ok(exists)
    }
}
