use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityKind};
use crate::role::Role;
use crate::time::Timestamp;

/// An account as stored, including the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

fn default_active() -> bool {
    true
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> &str {
        &self.id
    }
}

/// The public view of a [`User`]; never carries credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            phone: user.phone.clone(),
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_omits_password_hash() {
        let now = Timestamp::now();
        let user = User {
            id: "u1".into(),
            name: "Dana".into(),
            email: "dana@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::Doctor,
            phone: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(UserProfile::from(&user)).unwrap();
        assert!(value.get("passwordHash").is_none());
        assert_eq!(value["role"], "doctor");
        assert_eq!(value["isActive"], true);
    }

    #[test]
    fn stored_document_defaults() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "name": "Dana",
            "email": "dana@example.com",
            "passwordHash": "x",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(user.role, Role::Patient);
        assert!(user.is_active);
    }
}
