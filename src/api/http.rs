use std::sync::RwLock;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::{ApiError, AppointmentsApi, InferenceApi, LoginApi, UsersApi};
use crate::config::ClientConfig;
use crate::models::{
    Appointment, AppointmentCreateDoctor, AppointmentCreatePatient, AppointmentQuery,
    AppointmentUpdate, InferenceRequest, InferenceResponse, LoginCredentials, Message,
    NewPassword, Page, Token, UpdatePassword, UserCreate, UserPublic, UserQuery, UserRegister,
    UserUpdate, UserUpdateMe,
};
use crate::session::AccessToken;

/// Blocking HTTP client for the appointment REST backend.
pub struct HttpBackend {
    config: ClientConfig,
    client: Client,
    token: RwLock<Option<AccessToken>>,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::HttpClient(e.to_string()))?;

        Ok(Self {
            config,
            client,
            token: RwLock::new(None),
        })
    }

    /// Client configured from `MEDCONSULT_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.config.endpoint(path);
        tracing::debug!(%method, path, "Backend request");
        self.authorize(self.client.request(method, url))
    }

    /// `path` with `segment` appended as one percent-encoded path segment.
    fn segment_url(&self, path: &str, segment: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.config.endpoint(path))
            .map_err(|e| ApiError::HttpClient(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::HttpClient("base URL cannot take path segments".into()))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token.read() {
            Ok(guard) => match guard.as_ref() {
                Some(token) => builder.bearer_auth(token.expose()),
                None => builder,
            },
            Err(_) => builder,
        }
    }

    fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.send().map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let err = ApiError::from_response(status.as_u16(), &body);
            tracing::warn!(
                status = status.as_u16(),
                message = %err.user_message(),
                "Backend request failed"
            );
            return Err(err);
        }

        response
            .json()
            .map_err(|e| ApiError::ResponseParsing(e.to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_connect() {
            ApiError::Connection(self.config.api_base_url.clone())
        } else if e.is_timeout() {
            ApiError::Timeout(self.config.timeout.as_secs())
        } else {
            ApiError::HttpClient(e.to_string())
        }
    }
}

impl AppointmentsApi for HttpBackend {
    fn read_appointments(&self, query: &AppointmentQuery) -> Result<Page<Appointment>, ApiError> {
        self.send(self.request(Method::GET, "/appointments/").query(query))
    }

    fn read_appointment(&self, id: Uuid) -> Result<Appointment, ApiError> {
        self.send(self.request(Method::GET, &format!("/appointments/{id}")))
    }

    fn create_appointment_patient(
        &self,
        body: &AppointmentCreatePatient,
    ) -> Result<Appointment, ApiError> {
        self.send(self.request(Method::POST, "/appointments/patient").json(body))
    }

    fn create_appointment_doctor(
        &self,
        body: &AppointmentCreateDoctor,
    ) -> Result<Appointment, ApiError> {
        self.send(self.request(Method::POST, "/appointments/doctor").json(body))
    }

    fn update_appointment(
        &self,
        id: Uuid,
        body: &AppointmentUpdate,
    ) -> Result<Appointment, ApiError> {
        self.send(
            self.request(Method::PUT, &format!("/appointments/{id}"))
                .json(body),
        )
    }

    fn delete_appointment(&self, id: Uuid) -> Result<Message, ApiError> {
        self.send(self.request(Method::DELETE, &format!("/appointments/{id}")))
    }
}

impl InferenceApi for HttpBackend {
    fn run_inference(&self, request: &InferenceRequest) -> Result<InferenceResponse, ApiError> {
        self.send(self.request(Method::POST, "/inference/run").json(request))
    }
}

impl UsersApi for HttpBackend {
    fn create_user(&self, body: &UserCreate) -> Result<UserPublic, ApiError> {
        self.send(self.request(Method::POST, "/users/").json(body))
    }

    fn read_users(&self, query: &UserQuery) -> Result<Page<UserPublic>, ApiError> {
        self.send(self.request(Method::GET, "/users/").query(query))
    }

    fn read_user_by_id(&self, id: Uuid) -> Result<UserPublic, ApiError> {
        self.send(self.request(Method::GET, &format!("/users/{id}")))
    }

    fn update_user(&self, id: Uuid, body: &UserUpdate) -> Result<UserPublic, ApiError> {
        self.send(self.request(Method::PATCH, &format!("/users/{id}")).json(body))
    }

    fn delete_user(&self, id: Uuid) -> Result<Message, ApiError> {
        self.send(self.request(Method::DELETE, &format!("/users/{id}")))
    }

    fn read_user_me(&self) -> Result<UserPublic, ApiError> {
        self.send(self.request(Method::GET, "/users/me"))
    }

    fn update_user_me(&self, body: &UserUpdateMe) -> Result<UserPublic, ApiError> {
        self.send(self.request(Method::PATCH, "/users/me").json(body))
    }

    fn delete_user_me(&self) -> Result<Message, ApiError> {
        self.send(self.request(Method::DELETE, "/users/me"))
    }

    fn update_password_me(&self, body: &UpdatePassword) -> Result<Message, ApiError> {
        self.send(self.request(Method::PATCH, "/users/me/password").json(body))
    }

    fn register_user(&self, body: &UserRegister) -> Result<UserPublic, ApiError> {
        self.send(self.request(Method::POST, "/users/signup").json(body))
    }
}

impl LoginApi for HttpBackend {
    fn login_access_token(&self, credentials: &LoginCredentials) -> Result<Token, ApiError> {
        self.send(
            self.request(Method::POST, "/login/access-token")
                .form(credentials),
        )
    }

    fn test_token(&self) -> Result<UserPublic, ApiError> {
        self.send(self.request(Method::POST, "/login/test-token"))
    }

    fn recover_password(&self, email: &str) -> Result<Message, ApiError> {
        let url = self.segment_url("/password-recovery/", email)?;
        tracing::debug!(method = %Method::POST, path = url.path(), "Backend request");
        self.send(self.authorize(self.client.post(url)))
    }

    fn reset_password(&self, body: &NewPassword) -> Result<Message, ApiError> {
        self.send(self.request(Method::POST, "/reset-password/").json(body))
    }

    fn set_access_token(&self, token: Option<AccessToken>) {
        if let Ok(mut current) = self.token.write() {
            *current = token;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, RawQuery, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post, put};
    use axum::{Form, Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::models::SortOrder;

    const APPOINTMENT_ID: &str = "6f1c2a4e-58f0-4c35-9a7b-2f33c0d5e001";

    #[derive(Clone, Default)]
    struct Seen {
        requests: Arc<Mutex<Vec<(Option<String>, Option<String>)>>>,
    }

    fn appointment_json() -> Value {
        json!({
            "id": APPOINTMENT_ID,
            "patient_id": null,
            "doctor_id": null,
            "complaints": "headache",
            "status": "pending",
            "created_at": "2025-03-01T10:00:00Z",
            "updated_at": "2025-03-01T10:00:00Z",
            "patient": null,
            "doctor": null
        })
    }

    async fn list_appointments(
        State(seen): State<Seen>,
        headers: HeaderMap,
        RawQuery(query): RawQuery,
    ) -> Json<Value> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        seen.requests.lock().unwrap().push((auth, query));
        Json(json!({ "data": [appointment_json()], "count": 7 }))
    }

    async fn login(Form(form): Form<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
        if form.get("username").map(String::as_str) == Some("doc@clinic.ru")
            && form.get("password").map(String::as_str) == Some("password123")
        {
            (
                StatusCode::OK,
                Json(json!({ "access_token": "jwt-token", "token_type": "bearer" })),
            )
        } else {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "detail": "Incorrect email or password" })),
            )
        }
    }

    async fn update_appointment(
        Path(_id): Path<String>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if body.get("complaints").is_some_and(Value::is_null) {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": [
                    { "loc": ["body", "complaints"], "msg": "complaints cannot be cleared", "type": "value_error" }
                ]})),
            );
        }
        (StatusCode::OK, Json(appointment_json()))
    }

    async fn recover(Path(email): Path<String>) -> Json<Value> {
        Json(json!({ "message": email }))
    }

        fn spawn_server(seen: Seen) -> String {
        let app = Router::new()
            .route("/api/v1/appointments/", get(list_appointments))
            .route("/api/v1/appointments/:id", put(update_appointment))
            .route("/api/v1/login/access-token", post(login))
            .route("/api/v1/password-recovery/:email", post(recover))
            .with_state(seen);

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });
        let addr = rx.recv().unwrap();
        format!("http://{addr}")
    }

    fn backend(base_url: &str) -> HttpBackend {
        HttpBackend::new(ClientConfig::new(base_url, 5)).unwrap()
    }

    #[test]
    fn list_sends_bearer_and_query() {
        let seen = Seen::default();
        let client = backend(&spawn_server(seen.clone()));
        client.set_access_token(Some(AccessToken::new("jwt-token")));

        let page = client
            .read_appointments(&AppointmentQuery {
                skip: 6,
                limit: 6,
                order: Some(SortOrder::Asc),
                search: Some("headache".into()),
            })
            .unwrap();
        assert_eq!(page.count, 7);
        assert_eq!(page.data[0].complaints.as_deref(), Some("headache"));

        let requests = seen.requests.lock().unwrap();
        let (auth, query) = &requests[0];
        assert_eq!(auth.as_deref(), Some("Bearer jwt-token"));
        let query = query.as_deref().unwrap();
        assert!(query.contains("skip=6"));
        assert!(query.contains("limit=6"));
        assert!(query.contains("order=asc"));
        assert!(query.contains("search=headache"));
    }

    #[test]
    fn logged_out_requests_carry_no_auth() {
        let seen = Seen::default();
        let client = backend(&spawn_server(seen.clone()));
        client.set_access_token(Some(AccessToken::new("old")));
        client.set_access_token(None);

        client.read_appointments(&AppointmentQuery::default()).unwrap();
        let requests = seen.requests.lock().unwrap();
        assert!(requests[0].0.is_none());
        assert!(!requests[0].1.as_deref().unwrap().contains("order"));
    }

    #[test]
    fn login_posts_form_fields() {
        let client = backend(&spawn_server(Seen::default()));
        let token = client
            .login_access_token(&LoginCredentials {
                username: "doc@clinic.ru".into(),
                password: "password123".into(),
            })
            .unwrap();
        assert_eq!(token.access_token, "jwt-token");

        let err = client
            .login_access_token(&LoginCredentials {
                username: "doc@clinic.ru".into(),
                password: "wrong-pass".into(),
            })
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.user_message(), "Incorrect email or password");
    }

    #[test]
    fn validation_detail_is_decoded() {
        let client = backend(&spawn_server(Seen::default()));
        let id: Uuid = APPOINTMENT_ID.parse().unwrap();

        let err = client
            .update_appointment(
                id,
                &AppointmentUpdate {
                    complaints: Some(None),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.user_message(), "complaints cannot be cleared");

        let ok = client
            .update_appointment(
                id,
                &AppointmentUpdate {
                    complaints: Some(Some("fever".into())),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(ok.id, id);
    }

    #[test]
    fn recovery_email_is_one_path_segment() {
        let client = backend(&spawn_server(Seen::default()));
        for email in ["a%2F@x.io", "ivan+clinic@x.io", "o/k@x.io"] {
            let echoed = client.recover_password(email).unwrap();
            assert_eq!(echoed.message, email);
        }
    }

        #[test]
    fn unknown_route_is_status_error() {
        let client = backend(&spawn_server(Seen::default()));
        let err = client.read_user_me().unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn unreachable_backend_is_connection_error() {
        let client = backend("http://127.0.0.1:1");
        let err = client.read_user_me().unwrap_err();
        assert_eq!(err, ApiError::Connection("http://127.0.0.1:1".into()));
    }
}
