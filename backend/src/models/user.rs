//! Models that represent user profiles and role metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::UserId;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Profile row keyed by the authenticated user's id.
pub struct Profile {
    #[schema(value_type = String)]
    pub user_id: UserId,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    /// Role that decides which dashboard and route prefix the user may reach.
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(
        user_id: UserId,
        username: String,
        firstname: String,
        lastname: String,
        email: String,
        role: UserRole,
    ) -> Self {
        Self {
            user_id,
            username,
            firstname,
            lastname,
            email,
            role,
            created_at: Utc::now(),
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// Roles stored on a profile.
pub enum UserRole {
    Student,
    Teacher,
}

impl UserRole {
    /// Returns the canonical snake_case representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Teacher => "teacher",
        }
    }
}

impl Serialize for UserRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "student" => Ok(UserRole::Student),
            "teacher" => Ok(UserRole::Teacher),
            // tolerate common legacy casings
            "Student" | "STUDENT" => Ok(UserRole::Student),
            "Teacher" | "TEACHER" => Ok(UserRole::Teacher),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["student", "teacher"],
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Student display info attached to attendance and enrollment responses.
pub struct StudentSummary {
    #[schema(value_type = String)]
    pub user_id: UserId,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
}

impl From<Profile> for StudentSummary {
    fn from(profile: Profile) -> Self {
        Self {
            user_id: profile.user_id,
            username: profile.username,
            firstname: profile.firstname,
            lastname: profile.lastname,
            email: profile.email,
        }
    }
}
