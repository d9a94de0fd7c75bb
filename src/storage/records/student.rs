use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub(crate) struct StudentRecord {
    pub id: Uuid,
    pub name: String,
    pub class_level: String,
    pub parent_id: Uuid,
    pub teacher_id: Uuid,
}

impl From<StudentRecord> for crate::domain::student::Student {
    fn from(record: StudentRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            class_level: record.class_level,
            parent_id: record.parent_id,
            teacher_id: record.teacher_id,
        }
    }
}
