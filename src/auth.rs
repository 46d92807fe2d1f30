//! Login, sign-up, password recovery and logout flows.
//!
//! Key properties:
//! - A successful login stores the token before fetching the current user
//! - A stored token the backend rejects is discarded on restore
//! - Logout always clears both the store and the backend's auth header

use chrono::NaiveDate;

use crate::api::Backend;
use crate::context::AppContext;
use crate::models::{LoginCredentials, Message, NewPassword, UserGender, UserRegister};
use crate::notify::handle_error;
use crate::routes::Route;
use crate::session::{AccessToken, Session, TokenStore};
use crate::users::{MAX_NAME_LEN, MSG_NAME_TOO_LONG};
use crate::validation::{self, empty_to_null, FieldErrors, FormError};

pub const MSG_FULL_NAME_REQUIRED: &str = "Требуется полное имя";
pub const MSG_FULL_NAME_SHORT: &str = "Имя должно содержать не менее 3 символов";
pub const MSG_RECOVERY_SENT: &str = "Письмо для восстановления пароля отправлено.";
pub const MSG_PASSWORD_RESET: &str = "Пароль успешно обновлен.";
pub const MIN_FULL_NAME_LEN: usize = 3;

// ═══════════════════════════════════════════════════════════
// Session lifecycle
// ═══════════════════════════════════════════════════════════

/// Rebuild the session from a stored token, if the backend still accepts it.
pub fn restore_session(
    backend: &dyn Backend,
    store: &dyn TokenStore,
) -> Result<Option<Session>, FormError> {
    let Some(token) = store.load()? else {
        return Ok(None);
    };
    backend.set_access_token(Some(token.clone()));
    match backend.read_user_me() {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "Session restored");
            Ok(Some(Session::new(user, token)))
        }
        Err(err) if err.is_unauthorized() => {
            tracing::info!("Stored token rejected, logging out");
            backend.set_access_token(None);
            store.clear()?;
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Forget the token everywhere. Consumes the session.
pub fn logout(
    backend: &dyn Backend,
    store: &dyn TokenStore,
    session: Session,
) -> Result<Route, FormError> {
    tracing::info!(user_id = %session.user().id, "Logging out");
    backend.set_access_token(None);
    store.clear()?;
    drop(session);
    Ok(Route::Login)
}

// ═══════════════════════════════════════════════════════════
// Login
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    errors: FieldErrors,
    last_error: Option<String>,
}

impl LoginForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Message of the last failed attempt, shown under the form.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn submit(
        &mut self,
        ctx: &AppContext<'_>,
        store: &dyn TokenStore,
    ) -> Result<(Session, Route), FormError> {
        let mut errors = FieldErrors::new();
        errors.check("username", validation::email(&self.username));
        errors.check(
            "password",
            validation::required(&self.password, validation::MSG_PASSWORD_REQUIRED),
        );
        self.errors = errors.clone();
        errors.into_result()?;

        let credentials = LoginCredentials {
            username: self.username.trim().to_string(),
            password: self.password.clone(),
        };
        match self.login(ctx, store, &credentials) {
            Ok(session) => {
                self.last_error = None;
                self.password.clear();
                tracing::info!(user_id = %session.user().id, "Logged in");
                Ok((session, Route::Dashboard))
            }
            Err(err) => {
                if let FormError::Api(api) = &err {
                    handle_error(ctx.notifier, api);
                    self.last_error = Some(api.user_message());
                }
                Err(err)
            }
        }
    }

    fn login(
        &self,
        ctx: &AppContext<'_>,
        store: &dyn TokenStore,
        credentials: &LoginCredentials,
    ) -> Result<Session, FormError> {
        let token = ctx.backend.login_access_token(credentials)?;
        let token = AccessToken::new(token.access_token);
        store.save(&token)?;
        ctx.backend.set_access_token(Some(token.clone()));
        let user = match ctx.backend.read_user_me() {
            Ok(user) => user,
            Err(err) => {
                ctx.backend.set_access_token(None);
                store.clear()?;
                return Err(err.into());
            }
        };
        ctx.queries.set(&crate::query::QueryKey::current_user(), user.clone());
        Ok(Session::new(user, token))
    }
}

// ═══════════════════════════════════════════════════════════
// Sign-up
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub full_name: String,
    pub gender: UserGender,
    pub birth_date: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    errors: FieldErrors,
}

impl SignUpForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn submit(&mut self, ctx: &AppContext<'_>, today: NaiveDate) -> Result<Route, FormError> {
        let mut errors = FieldErrors::new();
        errors.check(
            "full_name",
            validation::required(&self.full_name, MSG_FULL_NAME_REQUIRED)
                .and_then(|()| {
                    validation::min_len(&self.full_name, MIN_FULL_NAME_LEN, MSG_FULL_NAME_SHORT)
                })
                .and_then(|()| {
                    validation::max_len(&self.full_name, MAX_NAME_LEN, MSG_NAME_TOO_LONG)
                }),
        );
        let birth_date = errors
            .check("birth_date", validation::birth_date(&self.birth_date, true, today))
            .flatten();
        errors.check("email", validation::email(&self.email));
        errors.check("password", validation::password(&self.password, true));
        let sibling = validation::sibling_password(Some(&self.password), None);
        errors.check(
            "confirm_password",
            validation::confirm_password(&self.confirm_password, sibling, true),
        );
        self.errors = errors.clone();
        errors.into_result()?;

        let body = UserRegister {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            full_name: empty_to_null(self.full_name.trim()),
            birth_date,
            gender: self.gender,
        };
        let user = ctx
            .backend
            .register_user(&body)
            .inspect_err(|err| handle_error(ctx.notifier, err))?;
        tracing::info!(user_id = %user.id, "Account registered");
        Ok(Route::Login)
    }
}

// ═══════════════════════════════════════════════════════════
// Password recovery
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct RecoverPasswordForm {
    pub email: String,
    errors: FieldErrors,
}

impl RecoverPasswordForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn submit(&mut self, ctx: &AppContext<'_>) -> Result<Message, FormError> {
        let mut errors = FieldErrors::new();
        errors.check("email", validation::email(&self.email));
        self.errors = errors.clone();
        errors.into_result()?;

        let message = ctx
            .backend
            .recover_password(self.email.trim())
            .inspect_err(|err| handle_error(ctx.notifier, err))?;
        ctx.notifier.success(MSG_RECOVERY_SENT);
        self.email.clear();
        Ok(message)
    }
}

/// Form behind the reset link; the token comes from `?token=`.
#[derive(Debug, Clone, Default)]
pub struct ResetPasswordForm {
    token: Option<String>,
    pub new_password: String,
    pub confirm_password: String,
    errors: FieldErrors,
}

impl ResetPasswordForm {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token,
            ..Self::default()
        }
    }

    pub fn for_route(route: &Route) -> Option<Self> {
        match route {
            Route::ResetPassword { token } => Some(Self::new(token.clone())),
            _ => None,
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Without a token nothing is sent and `Ok(None)` is returned.
    pub fn submit(&mut self, ctx: &AppContext<'_>) -> Result<Option<Route>, FormError> {
        let mut errors = FieldErrors::new();
        errors.check("new_password", validation::password(&self.new_password, true));
        let sibling = validation::sibling_password(None, Some(&self.new_password));
        errors.check(
            "confirm_password",
            validation::confirm_password(&self.confirm_password, sibling, true),
        );
        self.errors = errors.clone();
        errors.into_result()?;

        let Some(token) = self.token.clone() else {
            tracing::debug!("Reset submitted without a token");
            return Ok(None);
        };
        let body = NewPassword {
            token,
            new_password: self.new_password.clone(),
        };
        ctx.backend
            .reset_password(&body)
            .inspect_err(|err| handle_error(ctx.notifier, err))?;
        ctx.notifier.success(MSG_PASSWORD_RESET);
        Ok(Some(Route::Login))
    }
}
