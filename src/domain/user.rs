use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parent,
    Teacher,
    Admin,
    Student,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
            Self::Student => "student",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "parent" => Some(Self::Parent),
            "teacher" => Some(Self::Teacher),
            "admin" => Some(Self::Admin),
            "student" => Some(Self::Student),
            _ => None,
        }
    }
}

/// The authenticated actor behind a request.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub phone: Option<String>,
    pub is_available: bool,
}

impl User {
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile { id: self.id, name: self.name.clone(), role: self.role, avatar: self.avatar.clone() }
    }
}

/// Public profile fields, safe to embed in responses and realtime payloads.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub avatar: Option<String>,
}

/// Contact card offered as an alternative when a chat target is unavailable.
#[derive(Debug, Clone, Serialize)]
pub struct TeacherContact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}
