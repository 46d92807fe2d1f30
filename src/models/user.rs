use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::double_option;
use super::enums::{UserGender, UserRole};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub email: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub gender: Option<UserGender>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

impl UserPublic {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("N/A")
    }
}

/// Administrative user creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub role: UserRole,
    pub gender: UserGender,
    pub full_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub password: String,
}

/// Administrative partial update. `None` fields are not sent and
/// `Some(None)` clears the field; a `None` password keeps the current one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_superuser: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<UserGender>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn apply_to(&self, user: &mut UserPublic) {
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(active) = self.is_active {
            user.is_active = active;
        }
        if let Some(superuser) = self.is_superuser {
            user.is_superuser = superuser;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(gender) = self.gender {
            user.gender = Some(gender);
        }
        if let Some(name) = &self.full_name {
            user.full_name = name.clone();
        }
        if let Some(date) = self.birth_date {
            user.birth_date = date;
        }
    }
}

/// Self-service profile update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdateMe {
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<UserGender>,
}

impl UserUpdateMe {
    pub fn apply_to(&self, user: &mut UserPublic) {
        UserUpdate {
            email: self.email.clone(),
            gender: self.gender,
            full_name: self.full_name.clone(),
            birth_date: self.birth_date,
            ..Default::default()
        }
        .apply_to(user);
    }
}

/// Self-registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRegister {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: UserGender,
}

/// Query parameters of `readUsers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserQuery {
    pub skip: u64,
    pub limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_public_defaults() {
        let user: UserPublic = serde_json::from_value(serde_json::json!({
            "id": "0b7e4a9c-1111-4c35-9a7b-2f33c0d5e001",
            "email": "ivan@clinic.ru"
        }))
        .unwrap();
        assert!(user.is_active);
        assert!(!user.is_superuser);
        assert_eq!(user.role, UserRole::Patient);
        assert_eq!(user.display_name(), "N/A");
    }

    #[test]
    fn blank_password_is_not_sent() {
        let update = UserUpdate {
            email: Some("a@b.cd".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("full_name").is_none());
        assert_eq!(json["email"], "a@b.cd");
    }

    #[test]
    fn cleared_fields_are_sent_as_null() {
        let update = UserUpdateMe {
            full_name: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert!(json["full_name"].is_null());
        assert!(json.get("email").is_none());

        let back: UserUpdateMe = serde_json::from_value(json).unwrap();
        assert_eq!(back.full_name, Some(None));

        let mut user: UserPublic = serde_json::from_value(serde_json::json!({
            "id": "0b7e4a9c-1111-4c35-9a7b-2f33c0d5e001",
            "email": "ivan@clinic.ru",
            "full_name": "Ivan Petrov"
        }))
        .unwrap();
        update.apply_to(&mut user);
        assert_eq!(user.full_name, None);
    }
}
