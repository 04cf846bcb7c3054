//! Profile lookups backing role resolution.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    models::user::{Profile, UserRole},
    repositories::common::StoreResult,
    types::UserId,
};

const PROFILE_COLUMNS: &str =
    "user_id, username, firstname, lastname, email, LOWER(role) AS role, created_at";

/// Read-only directory of user profiles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Role for a user id, or `None` when no profile row exists.
    async fn get_role(&self, user_id: UserId) -> StoreResult<Option<UserRole>>;

    async fn find_profile(&self, user_id: UserId) -> StoreResult<Option<Profile>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Profile>>;
}

#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn get_role(&self, user_id: UserId) -> StoreResult<Option<UserRole>> {
        let role = sqlx::query_scalar::<_, UserRole>(
            "SELECT LOWER(role) FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn find_profile(&self, user_id: UserId) -> StoreResult<Option<Profile>> {
        let query = format!("SELECT {} FROM profiles WHERE user_id = $1", PROFILE_COLUMNS);
        let profile = sqlx::query_as::<_, Profile>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Profile>> {
        let query = format!(
            "SELECT {} FROM profiles WHERE LOWER(email) = LOWER($1)",
            PROFILE_COLUMNS
        );
        let profile = sqlx::query_as::<_, Profile>(&query)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }
}

/// Inserts a profile row. Profiles are normally created by the sign-up flow; this is used by
/// seeding tools and tests.
pub async fn insert_profile(pool: &PgPool, profile: &Profile) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO profiles (user_id, username, firstname, lastname, email, role, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(profile.user_id)
    .bind(&profile.username)
    .bind(&profile.firstname)
    .bind(&profile.lastname)
    .bind(&profile.email)
    .bind(profile.role.as_str())
    .bind(profile.created_at)
    .execute(pool)
    .await?;
    Ok(())
}
