//! Form validation rules.
//!
//! Every rule is a pure function returning `Result<_, FieldError>`.
//! Forms run the rules they need through `FieldErrors::check`, then turn
//! the collected map into a `FormError::Invalid` before any backend call.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::api::ApiError;
use crate::session::SessionError;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("valid email pattern")
});

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\sÀ-ſ]{1,30}$").expect("valid name pattern"));

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"));

pub const MIN_PASSWORD_LEN: usize = 8;

pub const MSG_INVALID_EMAIL: &str = "Недопустимый email";
pub const MSG_EMAIL_REQUIRED: &str = "Требуется email";
pub const MSG_PASSWORD_REQUIRED: &str = "Требуется пароль";
pub const MSG_PASSWORD_SHORT: &str = "Пароль должен содержать не менее 8 символов";
pub const MSG_CONFIRM_REQUIRED: &str = "Требуется подтверждение пароля";
pub const MSG_PASSWORDS_DIFFER: &str = "Пароли не совпадают";
pub const MSG_BIRTH_DATE_REQUIRED: &str = "Требуется дата рождения";
pub const MSG_BIRTH_DATE_FORMAT: &str = "Неверный формат даты (ГГГГ-ММ-ДД)";
pub const MSG_BIRTH_DATE_FUTURE: &str = "Дата рождения не может быть в будущем";
pub const MSG_INVALID_NAME: &str = "Недопустимое имя";

/// A single failed rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FieldError {
    pub message: &'static str,
}

impl FieldError {
    pub const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

/// Failures collected for one form, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<&'static str, FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the failure of `result` under `field`; the first failure
    /// for a field is kept.
    pub fn check<T>(&mut self, field: &'static str, result: Result<T, FieldError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.errors.entry(field).or_insert(err);
                None
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&'static str> {
        self.errors.get(field).map(|e| e.message)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.errors.keys().copied()
    }

    pub fn into_result(self) -> Result<(), FormError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(FormError::Invalid(self))
        }
    }
}

/// Why a form operation did not complete.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("Form has {} invalid field(s)", .0.len())]
    Invalid(FieldErrors),
    #[error("Field {0} is read-only in the current mode")]
    LockedField(&'static str),
    #[error("Nothing changed")]
    Pristine,
    #[error("Invalid transition: {0}")]
    InvalidTransition(&'static str),
    #[error("Not logged in")]
    NotLoggedIn,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl FormError {
    /// Field errors when this is a validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Rules
// ═══════════════════════════════════════════════════════════

pub fn required(value: &str, message: &'static str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        Err(FieldError::new(message))
    } else {
        Ok(())
    }
}

pub fn email(value: &str) -> Result<(), FieldError> {
    required(value, MSG_EMAIL_REQUIRED)?;
    if EMAIL_RE.is_match(value.trim()) {
        Ok(())
    } else {
        Err(FieldError::new(MSG_INVALID_EMAIL))
    }
}

/// Password rule. An optional blank password passes (no change).
pub fn password(value: &str, is_required: bool) -> Result<(), FieldError> {
    if value.is_empty() {
        return if is_required {
            Err(FieldError::new(MSG_PASSWORD_REQUIRED))
        } else {
            Ok(())
        };
    }
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(FieldError::new(MSG_PASSWORD_SHORT));
    }
    Ok(())
}

/// The sibling a confirm field is compared against: `password` when the
/// form has one, else `new_password`.
pub fn sibling_password<'a>(password: Option<&'a str>, new_password: Option<&'a str>) -> &'a str {
    password.or(new_password).unwrap_or_default()
}

pub fn confirm_password(value: &str, sibling: &str, is_required: bool) -> Result<(), FieldError> {
    if value.is_empty() {
        if is_required {
            return Err(FieldError::new(MSG_CONFIRM_REQUIRED));
        }
        if sibling.is_empty() {
            return Ok(());
        }
    }
    if value == sibling {
        Ok(())
    } else {
        Err(FieldError::new(MSG_PASSWORDS_DIFFER))
    }
}

/// Parse a `YYYY-MM-DD` birth date that is not after `today`.
/// Blank input is `Ok(None)` when optional.
pub fn birth_date(
    value: &str,
    is_required: bool,
    today: NaiveDate,
) -> Result<Option<NaiveDate>, FieldError> {
    let value = value.trim();
    if value.is_empty() {
        return if is_required {
            Err(FieldError::new(MSG_BIRTH_DATE_REQUIRED))
        } else {
            Ok(None)
        };
    }
    if !DATE_RE.is_match(value) {
        return Err(FieldError::new(MSG_BIRTH_DATE_FORMAT));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| FieldError::new(MSG_BIRTH_DATE_FORMAT))?;
    if date > today {
        return Err(FieldError::new(MSG_BIRTH_DATE_FUTURE));
    }
    Ok(Some(date))
}

/// Latin letters (with accents) and spaces, 1 to 30 characters.
pub fn name(value: &str) -> Result<(), FieldError> {
    if NAME_RE.is_match(value) {
        Ok(())
    } else {
        Err(FieldError::new(MSG_INVALID_NAME))
    }
}

pub fn min_len(value: &str, min: usize, message: &'static str) -> Result<(), FieldError> {
    if value.trim().chars().count() < min {
        Err(FieldError::new(message))
    } else {
        Ok(())
    }
}

pub fn max_len(value: &str, max: usize, message: &'static str) -> Result<(), FieldError> {
    if value.chars().count() > max {
        Err(FieldError::new(message))
    } else {
        Ok(())
    }
}

/// Whitespace-only text becomes `None`; anything else is kept as typed.
pub fn empty_to_null(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
