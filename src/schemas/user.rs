use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::User;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserLogin {
    #[validate(length(min = 1, max = 150, message = "username must not be empty"))]
    pub(crate) username: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub(crate) password: String,
}

/// Account fields shared by the student and teacher create payloads.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AccountCreate {
    #[validate(length(min = 1, max = 150, message = "username must be 1-150 characters"))]
    pub(crate) username: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters long"))]
    pub(crate) password: String,
    #[serde(alias = "firstName")]
    #[validate(length(min = 1, max = 150, message = "first_name must be 1-150 characters"))]
    pub(crate) first_name: String,
    #[serde(alias = "lastName")]
    #[validate(length(min = 1, max = 150, message = "last_name must be 1-150 characters"))]
    pub(crate) last_name: String,
    #[serde(default)]
    #[validate(email(message = "email is not valid"))]
    pub(crate) email: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct AccountUpdate {
    #[serde(default)]
    #[serde(alias = "firstName")]
    #[validate(length(min = 1, max = 150, message = "first_name must be 1-150 characters"))]
    pub(crate) first_name: Option<String>,
    #[serde(default)]
    #[serde(alias = "lastName")]
    #[validate(length(min = 1, max = 150, message = "last_name must be 1-150 characters"))]
    pub(crate) last_name: Option<String>,
    #[serde(default)]
    #[validate(email(message = "email is not valid"))]
    pub(crate) email: Option<String>,
    #[serde(default)]
    #[validate(length(min = 8, message = "password must be at least 8 characters long"))]
    pub(crate) password: Option<String>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    pub(crate) is_active: Option<bool>,
}

impl AccountUpdate {
    pub(crate) fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) is_staff: bool,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            full_name: user.full_name(),
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            is_staff: user.is_staff,
            is_active: user.is_active,
            created_at: format_primitive(user.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_passwords_are_rejected() {
        let payload: AccountCreate = serde_json::from_value(serde_json::json!({
            "username": "jane",
            "password": "short",
            "firstName": "Jane",
            "lastName": "Doe"
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(AccountUpdate::default().is_empty());
        let update = AccountUpdate { is_active: Some(false), ..Default::default() };
        assert!(!update.is_empty());
    }
}
