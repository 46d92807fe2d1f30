use serde::{Deserialize, Serialize};

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Response of `loginAccessToken`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

/// Form body of `loginAccessToken`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of `resetPassword`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPassword {
    pub token: String,
    pub new_password: String,
}

/// Body of `updatePasswordMe`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePassword {
    pub current_password: String,
    pub new_password: String,
}
