//! Toast notifications shown after user actions.

use std::cell::RefCell;

use crate::api::ApiError;

pub const SUCCESS_TITLE: &str = "Успешно";
pub const ERROR_TITLE: &str = "Что-то пошло не так...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: String,
    pub description: String,
}

impl Toast {
    pub fn success(description: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            title: SUCCESS_TITLE.to_string(),
            description: description.into(),
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            title: ERROR_TITLE.to_string(),
            description: description.into(),
        }
    }
}

/// Sink for toasts. UI layers implement `show`.
pub trait Notifier {
    fn show(&self, toast: Toast);

    fn success(&self, description: &str) {
        self.show(Toast::success(description));
    }

    fn error(&self, description: &str) {
        self.show(Toast::error(description));
    }
}

/// Writes toasts to the log. Used by the CLI.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show(&self, toast: Toast) {
        match toast.kind {
            ToastKind::Success => tracing::info!(title = %toast.title, "{}", toast.description),
            ToastKind::Error => tracing::warn!(title = %toast.title, "{}", toast.description),
        }
    }
}

/// Keeps every toast for later inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    toasts: RefCell<Vec<Toast>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.borrow().clone()
    }

    pub fn last(&self) -> Option<Toast> {
        self.toasts.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.toasts.borrow_mut().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, toast: Toast) {
        tracing::debug!(kind = ?toast.kind, "{}", toast.description);
        self.toasts.borrow_mut().push(toast);
    }
}

/// Shared failure path for backend calls: error toast with the best
/// message the response carries.
pub fn handle_error(notifier: &dyn Notifier, err: &ApiError) {
    tracing::warn!(error = %err, "Backend call failed");
    notifier.error(&err.user_message());
}
