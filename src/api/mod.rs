//! Backend operations consumed by the client.
//!
//! One trait per backend area; `Backend` bundles them so controllers can
//! take a single `&dyn Backend`. `HttpBackend` talks to the real REST
//! service, `MemoryBackend` reproduces its rules in-process for tests and
//! offline demos.

pub mod error;
pub mod http;
pub mod memory;

pub use error::*;
pub use http::HttpBackend;
pub use memory::MemoryBackend;

use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentCreateDoctor, AppointmentCreatePatient, AppointmentQuery,
    AppointmentUpdate, InferenceRequest, InferenceResponse, LoginCredentials, Message,
    NewPassword, Page, Token, UpdatePassword, UserCreate, UserPublic, UserQuery, UserRegister,
    UserUpdate, UserUpdateMe,
};
use crate::session::AccessToken;

pub trait AppointmentsApi {
    fn read_appointments(&self, query: &AppointmentQuery) -> Result<Page<Appointment>, ApiError>;
    fn read_appointment(&self, id: Uuid) -> Result<Appointment, ApiError>;
    fn create_appointment_patient(
        &self,
        body: &AppointmentCreatePatient,
    ) -> Result<Appointment, ApiError>;
    fn create_appointment_doctor(
        &self,
        body: &AppointmentCreateDoctor,
    ) -> Result<Appointment, ApiError>;
    fn update_appointment(
        &self,
        id: Uuid,
        body: &AppointmentUpdate,
    ) -> Result<Appointment, ApiError>;
    fn delete_appointment(&self, id: Uuid) -> Result<Message, ApiError>;
}

pub trait InferenceApi {
    fn run_inference(&self, request: &InferenceRequest) -> Result<InferenceResponse, ApiError>;
}

pub trait UsersApi {
    fn create_user(&self, body: &UserCreate) -> Result<UserPublic, ApiError>;
    fn read_users(&self, query: &UserQuery) -> Result<Page<UserPublic>, ApiError>;
    fn read_user_by_id(&self, id: Uuid) -> Result<UserPublic, ApiError>;
    fn update_user(&self, id: Uuid, body: &UserUpdate) -> Result<UserPublic, ApiError>;
    fn delete_user(&self, id: Uuid) -> Result<Message, ApiError>;
    fn read_user_me(&self) -> Result<UserPublic, ApiError>;
    fn update_user_me(&self, body: &UserUpdateMe) -> Result<UserPublic, ApiError>;
    fn delete_user_me(&self) -> Result<Message, ApiError>;
    fn update_password_me(&self, body: &UpdatePassword) -> Result<Message, ApiError>;
    fn register_user(&self, body: &UserRegister) -> Result<UserPublic, ApiError>;
}

pub trait LoginApi {
    fn login_access_token(&self, credentials: &LoginCredentials) -> Result<Token, ApiError>;
    fn test_token(&self) -> Result<UserPublic, ApiError>;
    fn recover_password(&self, email: &str) -> Result<Message, ApiError>;
    fn reset_password(&self, body: &NewPassword) -> Result<Message, ApiError>;

    /// Token attached to subsequent authenticated calls; `None` logs out.
    fn set_access_token(&self, token: Option<AccessToken>);
}

/// Every operation the client needs from the backend.
pub trait Backend: AppointmentsApi + UsersApi + LoginApi + InferenceApi {}

impl<T> Backend for T where T: AppointmentsApi + UsersApi + LoginApi + InferenceApi {}
