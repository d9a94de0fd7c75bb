use crate::domain::user::{Principal, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bearer token claims issued by the identity service. This crate only
/// verifies tokens; issuance lives elsewhere in the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    #[must_use]
    pub const fn new(sub: Uuid, role: Role, exp: usize) -> Self {
        Self { sub, role, exp }
    }

    #[must_use]
    pub const fn principal(&self) -> Principal {
        Principal { id: self.sub, role: self.role }
    }
}
