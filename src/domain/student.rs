use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub class_level: String,
    pub parent_id: Uuid,
    pub teacher_id: Uuid,
}

impl Student {
    #[must_use]
    pub fn summary(&self) -> StudentSummary {
        StudentSummary { id: self.id, name: self.name.clone(), class_level: self.class_level.clone() }
    }
}

/// Compact student view embedded in message and conversation payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: Uuid,
    pub name: String,
    pub class_level: String,
}
