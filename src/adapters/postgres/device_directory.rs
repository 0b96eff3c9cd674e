//! PostgreSQL implementation of DeviceDirectory.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::DeviceDirectory;

/// Looks devices up in the `devices` table.
pub struct PostgresDeviceDirectory {
    pool: PgPool,
}

impl PostgresDeviceDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceDirectory for PostgresDeviceDirectory {
    async fn owner_of(&self, device_id: &str) -> Result<Option<UserId>, DomainError> {
        let owner: Option<String> =
            sqlx::query_scalar("SELECT user_id FROM devices WHERE device_id = $1")
                .bind(device_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(ErrorCode::DatabaseError, format!("Failed to look up device: {}", e))
                })?;

        // A blank owner column is an unclaimed device.
        Ok(owner.and_then(|id| UserId::new(id).ok()))
    }
}
