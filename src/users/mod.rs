//! User administration and self-service account settings.

pub mod admin;
pub mod settings;

pub use admin::{delete_user, UserForm, UserRow, UserSearch, UsersTable};
pub use settings::{delete_account, PasswordForm, ProfileForm};

pub const MSG_NAME_TOO_LONG: &str = "Имя не должно превышать 30 символов";
pub const MAX_NAME_LEN: usize = 30;
