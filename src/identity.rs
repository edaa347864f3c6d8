//! Acting-principal resolution.
//!
//! The session cookie is the narrow interface to the identity system;
//! registration, login and token issuance live outside this service.

use crate::orm::users;
use actix_session::Session;
use sea_orm::{entity::*, DatabaseConnection};
use serde::{Deserialize, Serialize};

/// Session key holding the authenticated user id.
pub const SESSION_USER_KEY: &str = "uid";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Staff,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Staff => "staff",
        }
    }

    /// Unknown role strings resolve to the least privileged role.
    pub fn from_str(value: &str) -> Self {
        match value {
            "staff" => Role::Staff,
            _ => Role::Student,
        }
    }
}

/// The authenticated caller of one request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub id: i32,
    pub role: Role,
}

impl Principal {
    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }
}

/// Resolves the acting principal from the session cookie, if any.
pub async fn authenticate_by_session(
    session: &Session,
    db: &DatabaseConnection,
) -> Option<Principal> {
    let user_id = session.get::<i32>(SESSION_USER_KEY).ok().flatten()?;

    match users::Entity::find_by_id(user_id).one(db).await {
        Ok(Some(user)) => Some(Principal {
            id: user.id,
            role: Role::from_str(&user.role),
        }),
        Ok(None) => None,
        Err(err) => {
            log::error!("identity lookup failed for user {}: {}", user_id, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::from_str("staff"), Role::Staff);
        assert_eq!(Role::from_str("student"), Role::Student);
    }

    #[test]
    fn test_unknown_role_is_student() {
        assert_eq!(Role::from_str("superuser"), Role::Student);
        assert_eq!(Role::from_str(""), Role::Student);
    }
}
