//! Route table and guards.

use std::fmt;

use uuid::Uuid;

use crate::capabilities::Capability;
use crate::session::Session;

pub const FORBIDDEN_TITLE: &str = "Доступ запрещён";
pub const FORBIDDEN_DESCRIPTION: &str = "У вас нет прав для просмотра этой страницы.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    CreateAppointment,
    Appointment(Uuid),
    Settings,
    Users { page: u32 },
    Login,
    Signup,
    RecoverPassword,
    ResetPassword { token: Option<String> },
    NotFound,
}

/// What a guarded navigation ends up showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Render(Route),
    Redirect(Route),
    Forbidden,
}

impl Route {
    /// Parse a path with optional query string. Unknown paths are `NotFound`.
    pub fn parse(url: &str) -> Self {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let path = path.trim_end_matches('/');
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Self::Dashboard,
            ["appointments", "create"] => Self::CreateAppointment,
            ["appointments", id] => Uuid::parse_str(id)
                .map(Self::Appointment)
                .unwrap_or(Self::NotFound),
            ["settings"] => Self::Settings,
            ["users"] => Self::Users {
                page: query_param(query, "page")
                    .and_then(|p| p.parse().ok())
                    .filter(|p| *p >= 1)
                    .unwrap_or(1),
            },
            ["login"] => Self::Login,
            ["signup"] => Self::Signup,
            ["recover-password"] => Self::RecoverPassword,
            ["reset-password"] => Self::ResetPassword {
                token: query_param(query, "token")
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
            },
            _ => Self::NotFound,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Dashboard => "/".to_string(),
            Self::CreateAppointment => "/appointments/create".to_string(),
            Self::Appointment(id) => format!("/appointments/{id}"),
            Self::Settings => "/settings".to_string(),
            Self::Users { page } => format!("/users?page={page}"),
            Self::Login => "/login".to_string(),
            Self::Signup => "/signup".to_string(),
            Self::RecoverPassword => "/recover-password".to_string(),
            Self::ResetPassword { token: Some(token) } => format!("/reset-password?token={token}"),
            Self::ResetPassword { token: None } => "/reset-password".to_string(),
            Self::NotFound => "/404".to_string(),
        }
    }

    /// Routes rendered inside the authenticated layout.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::Dashboard
                | Self::CreateAppointment
                | Self::Appointment(_)
                | Self::Settings
                | Self::Users { .. }
        )
    }

    /// Auth pages that bounce a logged-in user to the dashboard.
    pub fn is_guest_only(&self) -> bool {
        matches!(
            self,
            Self::Login | Self::Signup | Self::RecoverPassword | Self::ResetPassword { .. }
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Apply the login and capability guards to `route`.
pub fn resolve(route: Route, session: Option<&Session>) -> Resolution {
    match session {
        None if route.requires_login() => Resolution::Redirect(Route::Login),
        Some(_) if route.is_guest_only() => Resolution::Redirect(Route::Dashboard),
        Some(session) if matches!(route, Route::Users { .. }) => {
            match session.capabilities().require(Capability::ManageUsers) {
                Ok(()) => Resolution::Render(route),
                Err(_) => Resolution::Forbidden,
            }
        }
        _ => Resolution::Render(route),
    }
}
