//! Collaborators shared by every controller operation.

use crate::api::Backend;
use crate::notify::Notifier;
use crate::query::QueryClient;

/// Backend, toast sink and query cache, borrowed for one interaction.
#[derive(Clone, Copy)]
pub struct AppContext<'a> {
    pub backend: &'a dyn Backend,
    pub notifier: &'a dyn Notifier,
    pub queries: &'a QueryClient,
}

impl<'a> AppContext<'a> {
    pub fn new(
        backend: &'a dyn Backend,
        notifier: &'a dyn Notifier,
        queries: &'a QueryClient,
    ) -> Self {
        Self {
            backend,
            notifier,
            queries,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::api::MemoryBackend;
    use crate::models::{UserGender, UserPublic, UserRole};
    use crate::notify::RecordingNotifier;
    use crate::session::Session;
    use chrono::NaiveDate;

    /// Memory backend plus recording notifier and a fresh cache.
    pub struct Harness {
        pub backend: MemoryBackend,
        pub notifier: RecordingNotifier,
        pub queries: QueryClient,
    }

    impl Harness {
        pub fn new() -> Self {
            Self {
                backend: MemoryBackend::new(),
                notifier: RecordingNotifier::new(),
                queries: QueryClient::new(),
            }
        }

        pub fn ctx(&self) -> AppContext<'_> {
            AppContext::new(&self.backend, &self.notifier, &self.queries)
        }

        /// Create a user and log in as them.
        pub fn login_as(&self, email: &str, role: UserRole, is_superuser: bool) -> Session {
            let user = self.backend.add_user(email, "password123", role, is_superuser);
            let token = self.backend.act_as(user.id);
            Session::new(user, token)
        }

        pub fn add_patient(
            &self,
            email: &str,
            gender: UserGender,
            birth_date: Option<NaiveDate>,
        ) -> UserPublic {
            let mut user = self.backend.add_user(email, "password123", UserRole::Patient, false);
            user.gender = Some(gender);
            user.birth_date = birth_date;
            user.full_name = Some("Anna Petrova".into());
            self.backend.insert_user(user.clone(), "password123");
            user
        }

        pub fn last_toast(&self) -> String {
            self.notifier
                .last()
                .map(|t| t.description)
                .unwrap_or_default()
        }
    }
}
