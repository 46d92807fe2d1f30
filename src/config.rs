use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Medconsult";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backend used when `MEDCONSULT_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";
/// REST prefix shared by every backend route.
pub const API_PREFIX: &str = "/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Dashboard appointment cards per page.
pub const APPOINTMENTS_PER_PAGE: u64 = 6;
/// Rows per page on the user administration table.
pub const USERS_PER_PAGE: u64 = 5;
/// Suggestions returned by the user search box.
pub const USER_SEARCH_LIMIT: u64 = 10;

/// Inference defaults when the patient is unknown or has no birth date.
pub const DEFAULT_INFERENCE_AGE: u32 = 20;
pub const EMPTY_COMPLAINTS_PLACEHOLDER: &str = "нет описания";

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "medconsult=info,medconsult_lib=info,warn"
}

/// Get the application data directory
/// ~/.medconsult/ on all platforms. `None` when no home directory exists.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".medconsult"))
}

/// Where the access token is persisted between runs.
pub fn token_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("access_token"))
}

/// Connection settings for the REST backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_base_url: &str, timeout_secs: u64) -> Self {
        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Read `MEDCONSULT_API_URL` and `MEDCONSULT_TIMEOUT_SECS`.
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let url = std::env::var("MEDCONSULT_API_URL").ok();
        let timeout = std::env::var("MEDCONSULT_TIMEOUT_SECS").ok();
        Self::from_values(url.as_deref(), timeout.as_deref())
    }

    fn from_values(url: Option<&str>, timeout_secs: Option<&str>) -> Self {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_API_URL);
        let timeout_secs = match timeout_secs.map(|t| t.trim().parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => secs,
            Some(_) => {
                tracing::warn!("Ignoring invalid MEDCONSULT_TIMEOUT_SECS");
                DEFAULT_TIMEOUT_SECS
            }
            None => DEFAULT_TIMEOUT_SECS,
        };
        Self::new(url, timeout_secs)
    }

    /// Absolute URL of a backend route, e.g. `endpoint("/users/me")`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.api_base_url, API_PREFIX, path)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir().unwrap();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with(".medconsult"));
    }

    #[test]
    fn token_path_under_app_data() {
        let token = token_path().unwrap();
        assert!(token.starts_with(app_data_dir().unwrap()));
        assert!(token.ends_with("access_token"));
    }

    #[test]
    fn app_name_is_medconsult() {
        assert_eq!(APP_NAME, "Medconsult");
    }

    #[test]
    fn defaults_when_env_missing() {
        let config = ClientConfig::from_values(None, None);
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn invalid_timeout_falls_back() {
        let config = ClientConfig::from_values(Some("http://api.local"), Some("soon"));
        assert_eq!(config.api_base_url, "http://api.local");
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let zero = ClientConfig::from_values(None, Some("0"));
        assert_eq!(zero.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn endpoint_joins_prefix_and_trims_slash() {
        let config = ClientConfig::new("http://api.local:8000/", 5);
        assert_eq!(
            config.endpoint("/appointments/"),
            "http://api.local:8000/api/v1/appointments/"
        );
    }
}
