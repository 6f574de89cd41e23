//! PostgreSQL Repository Implementation
//!
//! The `users` table (`id UUID`, `image TEXT`, `banner TEXT`) is owned by the
//! account service; this crate only overwrites the two image columns.

use kernel::id::UserId;
use sqlx::PgPool;

use crate::domain::repository::ProfileImageRepository;
use crate::domain::value_objects::UploadKind;
use crate::error::MediaResult;

#[derive(Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ProfileImageRepository for PgProfileRepository {
    async fn set_profile_image(
        &self,
        user_id: UserId,
        kind: UploadKind,
        data_url: &str,
    ) -> MediaResult<bool> {
        let query = match kind {
            UploadKind::Avatar => "UPDATE users SET image = $1 WHERE id = $2",
            UploadKind::Banner => "UPDATE users SET banner = $1 WHERE id = $2",
        };

        let rows = sqlx::query(query)
            .bind(data_url)
            .bind(user_id.into_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            tracing::warn!(user_id = %user_id, kind = %kind, "Profile image update matched no user");
        }
        Ok(rows > 0)
    }
}
