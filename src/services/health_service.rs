use crate::error::Result;
use crate::storage::DbPool;

/// Readiness checks for the management endpoints.
#[derive(Clone, Debug)]
pub struct HealthService {
    pool: DbPool,
}

impl HealthService {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Verifies the database connection is usable.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the ping fails.
    pub async fn ping_database(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
