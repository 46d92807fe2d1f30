//! Administration page: user table, add/edit forms, deletion, search.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::capabilities::Capability;
use crate::config::{USERS_PER_PAGE, USER_SEARCH_LIMIT};
use crate::context::AppContext;
use crate::models::{
    Message, Page, UserCreate, UserGender, UserPublic, UserQuery, UserRole, UserUpdate,
};
use crate::notify::handle_error;
use crate::query::QueryKey;
use crate::session::Session;
use crate::validation::{self, empty_to_null, FieldErrors, FormError};

pub const MSG_USER_ADDED: &str = "Пользователь успешно добавлен.";
pub const MSG_USER_UPDATED: &str = "Пользователь успешно обновлен.";
pub const MSG_USER_DELETED: &str = "Пользователь был успешно удален";
pub const MSG_DELETE_FAILED: &str = "При удалении пользователя произошла ошибка";
pub const MARK_YOU: &str = "Вы";

// ═══════════════════════════════════════════════════════════
// Add / edit form
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    New,
    Existing(Uuid),
}

/// Raw values of the add/edit user dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFormValues {
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub gender: UserGender,
    pub birth_date: String,
    pub password: String,
    pub confirm_password: String,
    pub is_superuser: bool,
    pub is_active: bool,
}

impl Default for UserFormValues {
    fn default() -> Self {
        Self {
            email: String::new(),
            full_name: String::new(),
            role: UserRole::Patient,
            gender: UserGender::Male,
            birth_date: String::new(),
            password: String::new(),
            confirm_password: String::new(),
            is_superuser: false,
            is_active: true,
        }
    }
}

impl UserFormValues {
    pub fn from_user(user: &UserPublic) -> Self {
        Self {
            email: user.email.clone(),
            full_name: user.full_name.clone().unwrap_or_default(),
            role: user.role,
            gender: user.gender.unwrap_or_default(),
            birth_date: user
                .birth_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            is_superuser: user.is_superuser,
            is_active: user.is_active,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserForm {
    target: Target,
    allowed_roles: &'static [UserRole],
    can_grant_superuser: bool,
    pub values: UserFormValues,
    errors: FieldErrors,
}

impl UserForm {
    /// Blank "add user" dialog for the caller in `session`.
    pub fn add(session: &Session) -> Self {
        let caps = session.capabilities();
        Self {
            target: Target::New,
            allowed_roles: caps.assignable_roles(),
            can_grant_superuser: caps.has(Capability::GrantSuperuser),
            values: UserFormValues::default(),
            errors: FieldErrors::new(),
        }
    }

    /// "Edit user" dialog prefilled from `user`.
    pub fn edit(session: &Session, user: &UserPublic) -> Self {
        Self {
            target: Target::Existing(user.id),
            values: UserFormValues::from_user(user),
            ..Self::add(session)
        }
    }

    pub fn is_edit(&self) -> bool {
        matches!(self.target, Target::Existing(_))
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Roles offered in the role selector.
    pub fn role_options(&self) -> &'static [UserRole] {
        self.allowed_roles
    }

    pub fn shows_superuser_toggle(&self) -> bool {
        self.can_grant_superuser
    }

    pub fn set_role(&mut self, role: UserRole) -> Result<(), FormError> {
        if !self.allowed_roles.contains(&role) {
            return Err(FormError::LockedField("role"));
        }
        self.values.role = role;
        Ok(())
    }

    pub fn set_superuser(&mut self, is_superuser: bool) -> Result<(), FormError> {
        if !self.can_grant_superuser {
            return Err(FormError::LockedField("is_superuser"));
        }
        self.values.is_superuser = is_superuser;
        Ok(())
    }

    fn validate(&mut self, today: NaiveDate) -> Result<Option<NaiveDate>, FormError> {
        let is_new = !self.is_edit();
        let v = &self.values;
        let mut errors = FieldErrors::new();
        errors.check("email", validation::email(&v.email));
        let birth_date = errors
            .check("birth_date", validation::birth_date(&v.birth_date, true, today))
            .flatten();
        errors.check("password", validation::password(&v.password, is_new));
        errors.check(
            "confirm_password",
            validation::confirm_password(&v.confirm_password, &v.password, is_new),
        );
        self.errors = errors.clone();
        errors.into_result()?;
        Ok(birth_date)
    }

    pub fn submit(&mut self, ctx: &AppContext<'_>, today: NaiveDate) -> Result<UserPublic, FormError> {
        let birth_date = self.validate(today)?;
        let v = &self.values;
        if !self.allowed_roles.contains(&v.role) {
            return Err(FormError::LockedField("role"));
        }
        let is_superuser = v.is_superuser && self.can_grant_superuser;

        let (result, message) = match self.target {
            Target::New => {
                let body = UserCreate {
                    email: v.email.trim().to_string(),
                    is_active: v.is_active,
                    is_superuser,
                    role: v.role,
                    gender: v.gender,
                    full_name: empty_to_null(&v.full_name),
                    birth_date,
                    password: v.password.clone(),
                };
                (ctx.backend.create_user(&body), MSG_USER_ADDED)
            }
            Target::Existing(id) => {
                let body = UserUpdate {
                    email: Some(v.email.trim().to_string()),
                    is_active: Some(v.is_active),
                    is_superuser: self.can_grant_superuser.then_some(is_superuser),
                    role: Some(v.role),
                    gender: Some(v.gender),
                    full_name: Some(empty_to_null(&v.full_name)),
                    birth_date: Some(birth_date),
                    // Blank keeps the current password
                    password: (!v.password.is_empty()).then(|| v.password.clone()),
                };
                (ctx.backend.update_user(id, &body), MSG_USER_UPDATED)
            }
        };
        ctx.queries.invalidate(&QueryKey::users());

        let user = result.inspect_err(|err| handle_error(ctx.notifier, err))?;
        tracing::info!(user_id = %user.id, "User saved");
        ctx.notifier.success(message);
        if !self.is_edit() {
            self.values = UserFormValues::default();
        }
        Ok(user)
    }
}

// ═══════════════════════════════════════════════════════════
// Deletion
// ═══════════════════════════════════════════════════════════

/// Delete another user. Failures show a fixed message.
pub fn delete_user(
    ctx: &AppContext<'_>,
    session: &Session,
    user_id: Uuid,
) -> Result<Message, FormError> {
    if session.is_current(user_id) {
        return Err(FormError::InvalidTransition("cannot delete your own row"));
    }
    let result = ctx.backend.delete_user(user_id);
    ctx.queries.invalidate_all();
    match result {
        Ok(message) => {
            tracing::info!(%user_id, "User deleted");
            ctx.notifier.success(MSG_USER_DELETED);
            Ok(message)
        }
        Err(err) => {
            tracing::warn!(%user_id, error = %err, "User deletion failed");
            ctx.notifier.error(MSG_DELETE_FAILED);
            Err(err.into())
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Table
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: Uuid,
    pub full_name: String,
    pub you_marker: Option<&'static str>,
    pub email: String,
    pub role_label: &'static str,
    pub birth_date: String,
    pub actions_enabled: bool,
}

impl UserRow {
    pub fn new(user: &UserPublic, session: &Session) -> Self {
        let is_you = session.is_current(user.id);
        Self {
            id: user.id,
            full_name: user.display_name().to_string(),
            you_marker: is_you.then_some(MARK_YOU),
            email: user.email.clone(),
            role_label: user.role.label(),
            birth_date: user
                .birth_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            actions_enabled: !is_you,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UsersTable {
    page: u32,
    result: Page<UserPublic>,
}

impl UsersTable {
    pub fn new(page: u32) -> Self {
        Self {
            page: page.max(1),
            result: Page::empty(),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn query(&self) -> UserQuery {
        UserQuery {
            skip: u64::from(self.page - 1) * USERS_PER_PAGE,
            limit: USERS_PER_PAGE,
            search: None,
        }
    }

    pub fn load(&mut self, ctx: &AppContext<'_>) -> Result<(), FormError> {
        let query = self.query();
        self.result = ctx
            .queries
            .fetch(&QueryKey::users_page(self.page), || ctx.backend.read_users(&query))
            .inspect_err(|err| handle_error(ctx.notifier, err))?;
        Ok(())
    }

    pub fn rows(&self, session: &Session) -> Vec<UserRow> {
        self.result
            .data
            .iter()
            .map(|u| UserRow::new(u, session))
            .collect()
    }

    pub fn users(&self) -> &[UserPublic] {
        &self.result.data
    }

    pub fn page_count(&self) -> u64 {
        self.result.page_count(USERS_PER_PAGE)
    }
}

// ═══════════════════════════════════════════════════════════
// Search
// ═══════════════════════════════════════════════════════════

/// Combobox over `readUsers`; results are never cached.
#[derive(Debug, Clone, Default)]
pub struct UserSearch {
    input: String,
    results: Vec<UserPublic>,
    selected: Option<Uuid>,
}

impl UserSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(&mut self, ctx: &AppContext<'_>, input: &str) -> Result<&[UserPublic], FormError> {
        self.input = input.to_string();
        let query = UserQuery {
            skip: 0,
            limit: USER_SEARCH_LIMIT,
            search: Some(self.input.clone()).filter(|s| !s.is_empty()),
        };
        self.results = ctx
            .backend
            .read_users(&query)
            .inspect_err(|err| handle_error(ctx.notifier, err))?
            .data;
        Ok(&self.results)
    }

    /// Items shown as `(id, email)`.
    pub fn options(&self) -> Vec<(Uuid, &str)> {
        self.results.iter().map(|u| (u.id, u.email.as_str())).collect()
    }

    /// Pick one of the current results.
    pub fn select(&mut self, id: Uuid) -> Option<Uuid> {
        self.selected = self.results.iter().any(|u| u.id == id).then_some(id);
        self.selected
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn selected(&self) -> Option<Uuid> {
        self.selected
    }
}
