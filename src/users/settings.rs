//! Self-service settings: profile, password, account deletion.

use chrono::NaiveDate;

use super::{MAX_NAME_LEN, MSG_NAME_TOO_LONG};
use crate::context::AppContext;
use crate::models::{UpdatePassword, UserGender, UserPublic, UserUpdateMe};
use crate::notify::handle_error;
use crate::routes::Route;
use crate::session::{Session, TokenStore};
use crate::validation::{self, empty_to_null, FieldErrors, FormError};

pub const MSG_PROFILE_UPDATED: &str = "Пользовательские данные обновлены.";
pub const MSG_PASSWORD_UPDATED: &str = "Пароль успешно обновлен.";
pub const MSG_ACCOUNT_DELETED: &str = "Ваш аккаунт был успешно удален";
pub const MSG_CURRENT_PASSWORD_REQUIRED: &str = "Требуется текущий пароль";

// ═══════════════════════════════════════════════════════════
// Profile
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct ProfileForm {
    editing: bool,
    pub full_name: String,
    pub email: String,
    pub birth_date: String,
    pub gender: UserGender,
    errors: FieldErrors,
}

impl ProfileForm {
    pub fn new(user: &UserPublic) -> Self {
        Self {
            editing: false,
            full_name: user.full_name.clone().unwrap_or_default(),
            email: user.email.clone(),
            birth_date: user
                .birth_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            gender: user.gender.unwrap_or_default(),
            errors: FieldErrors::new(),
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn begin_edit(&mut self) {
        self.editing = true;
    }

    /// Leave edit mode with the session's current values.
    pub fn cancel(&mut self, session: &Session) {
        *self = Self::new(session.user());
    }

    pub fn submit(
        &mut self,
        ctx: &AppContext<'_>,
        session: &mut Session,
        today: NaiveDate,
    ) -> Result<UserPublic, FormError> {
        if !self.editing {
            return Err(FormError::InvalidTransition("profile is not being edited"));
        }
        let mut errors = FieldErrors::new();
        errors.check(
            "full_name",
            validation::max_len(&self.full_name, MAX_NAME_LEN, MSG_NAME_TOO_LONG),
        );
        errors.check("email", validation::email(&self.email));
        let birth_date = errors
            .check("birth_date", validation::birth_date(&self.birth_date, true, today))
            .flatten();
        self.errors = errors.clone();
        errors.into_result()?;

        let body = UserUpdateMe {
            full_name: Some(empty_to_null(&self.full_name)),
            email: Some(self.email.trim().to_string()),
            birth_date: Some(birth_date),
            gender: Some(self.gender),
        };
        let result = ctx.backend.update_user_me(&body);
        ctx.queries.invalidate_all();

        let user = result.inspect_err(|err| handle_error(ctx.notifier, err))?;
        tracing::info!(user_id = %user.id, "Profile updated");
        ctx.notifier.success(MSG_PROFILE_UPDATED);
        session.replace_user(user.clone());
        *self = Self::new(&user);
        Ok(user)
    }
}

// ═══════════════════════════════════════════════════════════
// Password
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct PasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
    errors: FieldErrors,
}

impl PasswordForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn submit(&mut self, ctx: &AppContext<'_>) -> Result<(), FormError> {
        let mut errors = FieldErrors::new();
        errors.check(
            "current_password",
            validation::required(&self.current_password, MSG_CURRENT_PASSWORD_REQUIRED),
        );
        errors.check("new_password", validation::password(&self.new_password, true));
        let sibling = validation::sibling_password(None, Some(&self.new_password));
        errors.check(
            "confirm_password",
            validation::confirm_password(&self.confirm_password, sibling, true),
        );
        self.errors = errors.clone();
        errors.into_result()?;

        let body = UpdatePassword {
            current_password: self.current_password.clone(),
            new_password: self.new_password.clone(),
        };
        ctx.backend
            .update_password_me(&body)
            .inspect_err(|err| handle_error(ctx.notifier, err))?;
        tracing::info!("Password changed");
        ctx.notifier.success(MSG_PASSWORD_UPDATED);
        *self = Self::default();
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// Account deletion
// ═══════════════════════════════════════════════════════════

/// Delete the caller's account, then log out.
pub fn delete_account(
    ctx: &AppContext<'_>,
    store: &dyn TokenStore,
    session: Session,
) -> Result<Route, FormError> {
    let result = ctx.backend.delete_user_me();
    ctx.queries.invalidate_all();
    if let Err(err) = result {
        handle_error(ctx.notifier, &err);
        return Err(err.into());
    }
    tracing::info!(user_id = %session.user().id, "Account deleted");
    ctx.notifier.success(MSG_ACCOUNT_DELETED);
    crate::auth::logout(ctx.backend, store, session)
}
