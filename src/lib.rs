pub mod api; // Backend operations: HTTP client, in-memory backend, errors
pub mod appointment; // Appointment dialog, doctor page, inference, dashboard
pub mod auth;
pub mod capabilities;
pub mod config;
pub mod context;
pub mod models;
pub mod notify;
pub mod query;
pub mod routes;
pub mod session;
pub mod users; // Administration + self-service settings
pub mod validation;

use tracing_subscriber::EnvFilter;

use crate::api::HttpBackend;
use crate::appointment::AppointmentList;
use crate::config::ClientConfig;
use crate::context::AppContext;
use crate::notify::TracingNotifier;
use crate::query::QueryClient;
use crate::session::FileTokenStore;

/// Install the global subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

pub fn run() {
    init_tracing();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ClientConfig::from_env();
    let backend = match HttpBackend::new(config) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!(error = %e, "HTTP client could not be built");
            return;
        }
    };
    let store = match FileTokenStore::default_location() {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "No place to keep the access token");
            return;
        }
    };

    let session = match auth::restore_session(&backend, &store) {
        Ok(Some(session)) => session,
        Ok(None) => {
            println!("Not logged in. Token file: {}", store.path().display());
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "Session could not be restored");
            return;
        }
    };

    let notifier = TracingNotifier;
    let queries = QueryClient::new();
    let ctx = AppContext::new(&backend, &notifier, &queries);

    let user = session.user();
    println!("{} ({})", user.display_name(), user.email);

    let mut list = AppointmentList::new(1);
    if list.load(&ctx).is_err() {
        return;
    }
    if let Some(empty) = list.empty_state() {
        println!("{empty}");
        return;
    }
    for card in list.cards() {
        println!(
            "[{}] {} | Врач: {} | Пациент: {} | {}",
            card.status_label, card.updated, card.doctor, card.patient, card.complaints
        );
    }
    println!("Страница {} из {}", list.page(), list.page_count());
}
