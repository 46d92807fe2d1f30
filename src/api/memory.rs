//! In-process backend that follows the REST service's rules.
//!
//! Used by controller tests and offline demos:
//! - Role filtering on appointment lists (superuser all, doctor assigned, patient own)
//! - Patient-created records start `pending`, doctor-created ones `completed`
//! - Bearer tokens map to users; calls without one fail with 401
//! - `fail_next` / `fail_after` inject a one-shot error to exercise failure paths

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use super::{ApiError, AppointmentsApi, InferenceApi, LoginApi, UsersApi};
use crate::models::{
    Appointment, AppointmentCreateDoctor, AppointmentCreatePatient, AppointmentQuery,
    AppointmentStatus, AppointmentUpdate, AppointmentUser, InferenceRequest, InferenceResponse,
    LoginCredentials, Message, NewPassword, Page, SortOrder, Token, UpdatePassword, UserCreate,
    UserGender, UserPublic, UserQuery, UserRegister, UserRole, UserUpdate, UserUpdateMe,
};
use crate::session::AccessToken;

struct StoredUser {
    user: UserPublic,
    password: String,
}

#[derive(Default)]
struct State {
    users: Vec<StoredUser>,
    appointments: Vec<Appointment>,
    tokens: HashMap<String, Uuid>,
    reset_tokens: HashMap<String, Uuid>,
    current_token: Option<AccessToken>,
    inference_response: Option<InferenceResponse>,
    inference_requests: Vec<InferenceRequest>,
    /// Calls still allowed through, then the error to return.
    fail_next: Option<(usize, ApiError)>,
}

/// Backend held entirely in memory.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Seeding and inspection ──────────────────────────────

    /// Register a user directly, bypassing permission checks.
    pub fn add_user(
        &self,
        email: &str,
        password: &str,
        role: UserRole,
        is_superuser: bool,
    ) -> UserPublic {
        let user = UserPublic {
            id: Uuid::new_v4(),
            email: email.to_string(),
            is_active: true,
            is_superuser,
            role,
            gender: Some(UserGender::Male),
            full_name: None,
            birth_date: None,
        };
        self.insert_user(user.clone(), password);
        user
    }

    /// Insert a fully specified user record.
    pub fn insert_user(&self, user: UserPublic, password: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.users.retain(|u| u.user.id != user.id);
            state.users.push(StoredUser {
                user,
                password: password.to_string(),
            });
        }
    }

    /// Issue a token for `user_id` as if they had logged in.
    pub fn issue_token(&self, user_id: Uuid) -> AccessToken {
        let token = format!("token-{}", Uuid::new_v4());
        if let Ok(mut state) = self.state.lock() {
            state.tokens.insert(token.clone(), user_id);
        }
        AccessToken::new(token)
    }

    /// Log in as `user_id` for subsequent calls.
    pub fn act_as(&self, user_id: Uuid) -> AccessToken {
        let token = self.issue_token(user_id);
        self.set_access_token(Some(token.clone()));
        token
    }

    pub fn insert_appointment(&self, appointment: Appointment) {
        if let Ok(mut state) = self.state.lock() {
            state.appointments.retain(|a| a.id != appointment.id);
            state.appointments.push(appointment);
        }
    }

    pub fn appointment(&self, id: Uuid) -> Option<Appointment> {
        let state = self.state.lock().ok()?;
        state.appointments.iter().find(|a| a.id == id).cloned()
    }

    pub fn appointment_count(&self) -> usize {
        self.state.lock().map(|s| s.appointments.len()).unwrap_or(0)
    }

    pub fn user(&self, id: Uuid) -> Option<UserPublic> {
        let state = self.state.lock().ok()?;
        state.users.iter().find(|u| u.user.id == id).map(|u| u.user.clone())
    }

    pub fn set_inference_response(&self, diagnosis: &str, recommendations: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.inference_response = Some(InferenceResponse {
                diagnosis: diagnosis.to_string(),
                recommendations: recommendations.to_string(),
            });
        }
    }

    /// Every inference request received, oldest first.
    pub fn inference_requests(&self) -> Vec<InferenceRequest> {
        self.state
            .lock()
            .map(|s| s.inference_requests.clone())
            .unwrap_or_default()
    }

    /// Reset token that `recover_password` issued for `email`.
    pub fn reset_token_for(&self, email: &str) -> Option<String> {
        let state = self.state.lock().ok()?;
        let id = state.users.iter().find(|u| u.user.email == email)?.user.id;
        state
            .reset_tokens
            .iter()
            .find(|(_, user_id)| **user_id == id)
            .map(|(token, _)| token.clone())
    }

    /// Make the next backend call fail with `error`.
    pub fn fail_next(&self, error: ApiError) {
        self.fail_after(0, error);
    }

    /// Let `calls` backend calls succeed, then fail the next one with `error`.
    pub fn fail_after(&self, calls: usize, error: ApiError) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next = Some((calls, error));
        }
    }

    // ── Internal ────────────────────────────────────────────

    fn lock(&self) -> Result<MutexGuard<'_, State>, ApiError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ApiError::HttpClient("memory backend lock poisoned".into()))?;
        match state.fail_next.take() {
            Some((0, err)) => return Err(err),
            Some((left, err)) => state.fail_next = Some((left - 1, err)),
            None => {}
        }
        Ok(state)
    }
}

impl State {
    fn caller(&self) -> Result<UserPublic, ApiError> {
        let token = self
            .current_token
            .as_ref()
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;
        let id = self
            .tokens
            .get(token.expose())
            .ok_or_else(|| ApiError::forbidden("Could not validate credentials"))?;
        let user = self
            .find_user(*id)
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        if !user.is_active {
            return Err(ApiError::bad_request("Inactive user"));
        }
        Ok(user.clone())
    }

    fn find_user(&self, id: Uuid) -> Option<&UserPublic> {
        self.users.iter().find(|u| u.user.id == id).map(|u| &u.user)
    }

    fn find_stored_mut(&mut self, id: Uuid) -> Option<&mut StoredUser> {
        self.users.iter_mut().find(|u| u.user.id == id)
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .iter()
            .any(|u| u.user.email.eq_ignore_ascii_case(email) && Some(u.user.id) != except)
    }

    fn summary(&self, id: Option<Uuid>) -> Option<AppointmentUser> {
        let user = self.find_user(id?)?;
        Some(AppointmentUser {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            birth_date: user.birth_date,
            gender: user.gender,
        })
    }

    /// Re-embed patient/doctor summaries so reads reflect current users.
    fn expand(&self, mut appointment: Appointment) -> Appointment {
        appointment.patient = self.summary(appointment.patient_id);
        appointment.doctor = self.summary(appointment.doctor_id);
        appointment
    }

    fn can_read(caller: &UserPublic, appointment: &Appointment) -> bool {
        if caller.is_superuser {
            return true;
        }
        match caller.role {
            UserRole::Doctor => appointment.doctor_id == Some(caller.id),
            UserRole::Patient => appointment.patient_id == Some(caller.id),
        }
    }

    fn insert_new_user(&mut self, user: UserPublic, password: &str) -> Result<UserPublic, ApiError> {
        if self.email_taken(&user.email, None) {
            return Err(ApiError::bad_request(
                "The user with this email already exists in the system.",
            ));
        }
        self.users.push(StoredUser {
            user: user.clone(),
            password: password.to_string(),
        });
        Ok(user)
    }

    fn new_appointment(&self) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: Uuid::new_v4(),
            patient_id: None,
            doctor_id: None,
            complaints: None,
            doctor_diagnosis: None,
            doctor_recommendations: None,
            nlp_diagnosis: None,
            nlp_recommendations: None,
            status: AppointmentStatus::Pending,
            created_at: now,
            updated_at: now,
            patient: None,
            doctor: None,
        }
    }
}

fn contains_ci(field: Option<&str>, needle: &str) -> bool {
    field.is_some_and(|f| f.to_lowercase().contains(needle))
}

fn paginate<T: Clone>(items: &[T], skip: u64, limit: u64) -> Vec<T> {
    items
        .iter()
        .skip(skip as usize)
        .take(limit as usize)
        .cloned()
        .collect()
}

impl AppointmentsApi for MemoryBackend {
    fn read_appointments(&self, query: &AppointmentQuery) -> Result<Page<Appointment>, ApiError> {
        let state = self.lock()?;
        let caller = state.caller()?;
        let needle = query
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut matching: Vec<Appointment> = state
            .appointments
            .iter()
            .filter(|a| State::can_read(&caller, a))
            .filter(|a| match &needle {
                Some(n) => {
                    contains_ci(a.complaints.as_deref(), n)
                        || contains_ci(a.doctor_diagnosis.as_deref(), n)
                        || contains_ci(a.doctor_recommendations.as_deref(), n)
                }
                None => true,
            })
            .cloned()
            .collect();

        match query.order.unwrap_or_default() {
            SortOrder::Asc => matching.sort_by_key(|a| a.updated_at),
            SortOrder::Desc => matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
        }

        let data = paginate(&matching, query.skip, query.limit)
            .into_iter()
            .map(|a| state.expand(a))
            .collect();
        Ok(Page {
            data,
            count: matching.len() as u64,
        })
    }

    fn read_appointment(&self, id: Uuid) -> Result<Appointment, ApiError> {
        let state = self.lock()?;
        let caller = state.caller()?;
        let appointment = state
            .appointments
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| ApiError::not_found("Appointment not found"))?;
        if !State::can_read(&caller, appointment) {
            return Err(ApiError::forbidden("Forbidden"));
        }
        Ok(state.expand(appointment.clone()))
    }

    fn create_appointment_patient(
        &self,
        body: &AppointmentCreatePatient,
    ) -> Result<Appointment, ApiError> {
        let mut state = self.lock()?;
        let caller = state.caller()?;
        if caller.role != UserRole::Patient && !caller.is_superuser {
            return Err(ApiError::forbidden(
                "Только пациенты могут создавать приёмы здесь",
            ));
        }
        if let Some(doctor_id) = body.doctor_id {
            if state.find_user(doctor_id).is_none() {
                return Err(ApiError::not_found("Doctor not found"));
            }
        }

        let mut appointment = state.new_appointment();
        appointment.patient_id = Some(caller.id);
        appointment.doctor_id = body.doctor_id;
        appointment.complaints = Some(body.complaints.clone());
        appointment.status = AppointmentStatus::Pending;
        state.appointments.push(appointment.clone());
        Ok(state.expand(appointment))
    }

    fn create_appointment_doctor(
        &self,
        body: &AppointmentCreateDoctor,
    ) -> Result<Appointment, ApiError> {
        let mut state = self.lock()?;
        let caller = state.caller()?;
        if caller.role != UserRole::Doctor && !caller.is_superuser {
            return Err(ApiError::bad_request("Not enough permissions"));
        }
        if state.find_user(body.patient_id).is_none() {
            return Err(ApiError::not_found("Patient not found"));
        }

        let mut appointment = state.new_appointment();
        appointment.patient_id = Some(body.patient_id);
        appointment.doctor_id = Some(caller.id);
        appointment.complaints = body.complaints.clone();
        appointment.doctor_diagnosis = body.doctor_diagnosis.clone();
        appointment.doctor_recommendations = body.doctor_recommendations.clone();
        appointment.nlp_diagnosis = body.nlp_diagnosis.clone();
        appointment.nlp_recommendations = body.nlp_recommendations.clone();
        appointment.status = AppointmentStatus::Completed;
        state.appointments.push(appointment.clone());
        Ok(state.expand(appointment))
    }

    fn update_appointment(
        &self,
        id: Uuid,
        body: &AppointmentUpdate,
    ) -> Result<Appointment, ApiError> {
        let mut state = self.lock()?;
        let caller = state.caller()?;
        let appointment = state
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ApiError::not_found("Appointment not found"))?;

        let allowed = caller.is_superuser
            || match caller.role {
                UserRole::Doctor => appointment.doctor_id.map_or(true, |d| d == caller.id),
                // The patient dialog edits its own pending requests
                UserRole::Patient => {
                    appointment.patient_id == Some(caller.id) && appointment.status.is_pending()
                }
            };
        if !allowed {
            return Err(ApiError::bad_request("Not enough permissions"));
        }

        body.apply_to(appointment);
        appointment.updated_at = Utc::now();
        let updated = appointment.clone();
        Ok(state.expand(updated))
    }

    fn delete_appointment(&self, id: Uuid) -> Result<Message, ApiError> {
        let mut state = self.lock()?;
        let caller = state.caller()?;
        let appointment = state
            .appointments
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| ApiError::not_found("Appointment not found"))?;
        if !caller.is_superuser && appointment.patient_id != Some(caller.id) {
            return Err(ApiError::bad_request("Not enough permissions"));
        }
        state.appointments.retain(|a| a.id != id);
        Ok(Message::new("Appointment deleted successfully"))
    }
}

impl InferenceApi for MemoryBackend {
    fn run_inference(&self, request: &InferenceRequest) -> Result<InferenceResponse, ApiError> {
        let mut state = self.lock()?;
        state.inference_requests.push(request.clone());
        if request.complaints.trim().is_empty() {
            return Err(ApiError::bad_request("Input text cannot be empty"));
        }
        state
            .inference_response
            .clone()
            .ok_or_else(|| ApiError::bad_request("ML service error: no model loaded"))
    }
}

impl UsersApi for MemoryBackend {
    fn create_user(&self, body: &UserCreate) -> Result<UserPublic, ApiError> {
        let mut state = self.lock()?;
        let caller = state.caller()?;
        let allowed = caller.is_superuser
            || (caller.role == UserRole::Doctor
                && body.role == UserRole::Patient
                && !body.is_superuser);
        if !allowed {
            return Err(ApiError::forbidden("The user doesn't have enough privileges"));
        }
        let user = UserPublic {
            id: Uuid::new_v4(),
            email: body.email.clone(),
            is_active: body.is_active,
            is_superuser: body.is_superuser,
            role: body.role,
            gender: Some(body.gender),
            full_name: body.full_name.clone(),
            birth_date: body.birth_date,
        };
        state.insert_new_user(user, &body.password)
    }

    fn read_users(&self, query: &UserQuery) -> Result<Page<UserPublic>, ApiError> {
        let state = self.lock()?;
        // Patients search for doctors through this listing
        state.caller()?;
        let needle = query
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let matching: Vec<UserPublic> = state
            .users
            .iter()
            .map(|u| &u.user)
            .filter(|u| match &needle {
                Some(n) => contains_ci(u.full_name.as_deref(), n) || contains_ci(Some(u.email.as_str()), n),
                None => true,
            })
            .cloned()
            .collect();
        Ok(Page {
            data: paginate(&matching, query.skip, query.limit),
            count: matching.len() as u64,
        })
    }

    fn read_user_by_id(&self, id: Uuid) -> Result<UserPublic, ApiError> {
        let state = self.lock()?;
        let caller = state.caller()?;
        if caller.id != id && !caller.is_superuser && caller.role != UserRole::Doctor {
            return Err(ApiError::forbidden("The user doesn't have enough privileges"));
        }
        state
            .find_user(id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    fn update_user(&self, id: Uuid, body: &UserUpdate) -> Result<UserPublic, ApiError> {
        let mut state = self.lock()?;
        let caller = state.caller()?;
        let target = state
            .find_user(id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("The user with this id does not exist in the system"))?;
        let allowed = caller.is_superuser
            || (caller.role == UserRole::Doctor
                && target.role == UserRole::Patient
                && body.role.map_or(true, |r| r == UserRole::Patient)
                && body.is_superuser != Some(true));
        if !allowed {
            return Err(ApiError::forbidden("The user doesn't have enough privileges"));
        }
        if let Some(email) = &body.email {
            if state.email_taken(email, Some(id)) {
                return Err(ApiError::conflict("User with this email already exists"));
            }
        }
        let stored = state
            .find_stored_mut(id)
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        body.apply_to(&mut stored.user);
        if let Some(password) = &body.password {
            stored.password = password.clone();
        }
        Ok(stored.user.clone())
    }

    fn delete_user(&self, id: Uuid) -> Result<Message, ApiError> {
        let mut state = self.lock()?;
        let caller = state.caller()?;
        if !caller.is_superuser {
            return Err(ApiError::forbidden("The user doesn't have enough privileges"));
        }
        if caller.id == id {
            return Err(ApiError::forbidden(
                "Super users are not allowed to delete themselves",
            ));
        }
        if state.find_user(id).is_none() {
            return Err(ApiError::not_found("User not found"));
        }
        state.users.retain(|u| u.user.id != id);
        state.appointments.retain(|a| a.patient_id != Some(id));
        Ok(Message::new("User deleted successfully"))
    }

    fn read_user_me(&self) -> Result<UserPublic, ApiError> {
        self.lock()?.caller()
    }

    fn update_user_me(&self, body: &UserUpdateMe) -> Result<UserPublic, ApiError> {
        let mut state = self.lock()?;
        let caller = state.caller()?;
        if let Some(email) = &body.email {
            if state.email_taken(email, Some(caller.id)) {
                return Err(ApiError::conflict("User with this email already exists"));
            }
        }
        let stored = state
            .find_stored_mut(caller.id)
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        body.apply_to(&mut stored.user);
        Ok(stored.user.clone())
    }

    fn delete_user_me(&self) -> Result<Message, ApiError> {
        let mut state = self.lock()?;
        let caller = state.caller()?;
        if caller.is_superuser {
            return Err(ApiError::forbidden(
                "Super users are not allowed to delete themselves",
            ));
        }
        state.users.retain(|u| u.user.id != caller.id);
        state.appointments.retain(|a| a.patient_id != Some(caller.id));
        state.tokens.retain(|_, id| *id != caller.id);
        Ok(Message::new("User deleted successfully"))
    }

    fn update_password_me(&self, body: &UpdatePassword) -> Result<Message, ApiError> {
        let mut state = self.lock()?;
        let caller = state.caller()?;
        let stored = state
            .find_stored_mut(caller.id)
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        if stored.password != body.current_password {
            return Err(ApiError::bad_request("Incorrect password"));
        }
        if body.current_password == body.new_password {
            return Err(ApiError::bad_request(
                "New password cannot be the same as the current one",
            ));
        }
        stored.password = body.new_password.clone();
        Ok(Message::new("Password updated successfully"))
    }

    fn register_user(&self, body: &UserRegister) -> Result<UserPublic, ApiError> {
        let mut state = self.lock()?;
        let user = UserPublic {
            id: Uuid::new_v4(),
            email: body.email.clone(),
            is_active: true,
            is_superuser: false,
            role: UserRole::Patient,
            gender: Some(body.gender),
            full_name: body.full_name.clone(),
            birth_date: body.birth_date,
        };
        state.insert_new_user(user, &body.password)
    }
}

impl LoginApi for MemoryBackend {
    fn login_access_token(&self, credentials: &LoginCredentials) -> Result<Token, ApiError> {
        let mut state = self.lock()?;
        let user = state
            .users
            .iter()
            .find(|u| {
                u.user.email.eq_ignore_ascii_case(&credentials.username)
                    && u.password == credentials.password
            })
            .map(|u| u.user.clone())
            .ok_or_else(|| ApiError::bad_request("Incorrect email or password"))?;
        if !user.is_active {
            return Err(ApiError::bad_request("Inactive user"));
        }
        let token = format!("token-{}", Uuid::new_v4());
        state.tokens.insert(token.clone(), user.id);
        Ok(Token {
            access_token: token,
            token_type: "bearer".to_string(),
        })
    }

    fn test_token(&self) -> Result<UserPublic, ApiError> {
        self.lock()?.caller()
    }

    fn recover_password(&self, email: &str) -> Result<Message, ApiError> {
        let mut state = self.lock()?;
        let id = state
            .users
            .iter()
            .find(|u| u.user.email.eq_ignore_ascii_case(email))
            .map(|u| u.user.id)
            .ok_or_else(|| {
                ApiError::not_found("The user with this email does not exist in the system.")
            })?;
        state.reset_tokens.insert(format!("reset-{}", Uuid::new_v4()), id);
        Ok(Message::new("Password recovery email sent"))
    }

    fn reset_password(&self, body: &NewPassword) -> Result<Message, ApiError> {
        let mut state = self.lock()?;
        let id = state
            .reset_tokens
            .remove(&body.token)
            .ok_or_else(|| ApiError::bad_request("Invalid token"))?;
        let stored = state
            .find_stored_mut(id)
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        stored.password = body.new_password.clone();
        Ok(Message::new("Password updated successfully"))
    }

    fn set_access_token(&self, token: Option<AccessToken>) {
        if let Ok(mut state) = self.state.lock() {
            state.current_token = token;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_with_roles() -> (MemoryBackend, UserPublic, UserPublic, UserPublic) {
        let backend = MemoryBackend::new();
        let patient = backend.add_user("pat@clinic.ru", "password123", UserRole::Patient, false);
        let doctor = backend.add_user("doc@clinic.ru", "password123", UserRole::Doctor, false);
        let admin = backend.add_user("admin@clinic.ru", "password123", UserRole::Doctor, true);
        (backend, patient, doctor, admin)
    }

    #[test]
    fn unauthenticated_calls_fail() {
        let (backend, ..) = backend_with_roles();
        let err = backend.read_user_me().unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn patient_creation_is_pending_and_owned() {
        let (backend, patient, ..) = backend_with_roles();
        backend.act_as(patient.id);
        let appt = backend
            .create_appointment_patient(&AppointmentCreatePatient {
                complaints: "headache".into(),
                doctor_id: None,
            })
            .unwrap();
        assert_eq!(appt.status, AppointmentStatus::Pending);
        assert_eq!(appt.patient_id, Some(patient.id));
        assert!(appt.doctor_id.is_none());
    }

    #[test]
    fn doctor_creation_is_completed() {
        let (backend, patient, doctor, _) = backend_with_roles();
        backend.act_as(doctor.id);
        let appt = backend
            .create_appointment_doctor(&AppointmentCreateDoctor {
                patient_id: patient.id,
                complaints: Some("cough".into()),
                doctor_diagnosis: Some("bronchitis".into()),
                doctor_recommendations: None,
                nlp_diagnosis: None,
                nlp_recommendations: None,
            })
            .unwrap();
        assert_eq!(appt.status, AppointmentStatus::Completed);
        assert_eq!(appt.doctor_id, Some(doctor.id));
        assert_eq!(appt.patient.unwrap().email, "pat@clinic.ru");
    }

    #[test]
    fn patients_cannot_use_doctor_creation() {
        let (backend, patient, ..) = backend_with_roles();
        backend.act_as(patient.id);
        let err = backend
            .create_appointment_doctor(&AppointmentCreateDoctor {
                patient_id: patient.id,
                complaints: None,
                doctor_diagnosis: None,
                doctor_recommendations: None,
                nlp_diagnosis: None,
                nlp_recommendations: None,
            })
            .unwrap_err();
        assert_eq!(err.user_message(), "Not enough permissions");
    }

    #[test]
    fn lists_are_filtered_by_role_and_searched() {
        let (backend, patient, doctor, admin) = backend_with_roles();
        backend.act_as(patient.id);
        for complaints in ["headache", "fever", "Sore throat"] {
            backend
                .create_appointment_patient(&AppointmentCreatePatient {
                    complaints: complaints.into(),
                    doctor_id: Some(doctor.id),
                })
                .unwrap();
        }

        backend.act_as(doctor.id);
        let all = backend.read_appointments(&AppointmentQuery::default()).unwrap();
        assert_eq!(all.count, 3);

        let searched = backend
            .read_appointments(&AppointmentQuery {
                search: Some("THROAT".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(searched.count, 1);

        let other_doctor = backend.add_user("doc2@clinic.ru", "password123", UserRole::Doctor, false);
        backend.act_as(other_doctor.id);
        assert_eq!(backend.read_appointments(&AppointmentQuery::default()).unwrap().count, 0);

        backend.act_as(admin.id);
        let page = backend
            .read_appointments(&AppointmentQuery {
                skip: 2,
                limit: 2,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.data.len(), 1);
    }

    #[test]
    fn patient_may_only_update_pending_own_records() {
        let (backend, patient, doctor, _) = backend_with_roles();
        backend.act_as(patient.id);
        let appt = backend
            .create_appointment_patient(&AppointmentCreatePatient {
                complaints: "headache".into(),
                doctor_id: Some(doctor.id),
            })
            .unwrap();
        let update = AppointmentUpdate {
            complaints: Some(Some("migraine".into())),
            ..Default::default()
        };
        assert!(backend.update_appointment(appt.id, &update).is_ok());

        backend.act_as(doctor.id);
        backend
            .update_appointment(
                appt.id,
                &AppointmentUpdate {
                    status: Some(Some(AppointmentStatus::Completed)),
                    ..Default::default()
                },
            )
            .unwrap();

        backend.act_as(patient.id);
        assert!(backend.update_appointment(appt.id, &update).is_err());
    }

    #[test]
    fn fail_next_is_one_shot() {
        let (backend, patient, ..) = backend_with_roles();
        backend.act_as(patient.id);
        backend.fail_next(ApiError::bad_request("boom"));
        assert_eq!(backend.read_user_me().unwrap_err().user_message(), "boom");
        assert!(backend.read_user_me().is_ok());
    }

    #[test]
    fn fail_after_skips_calls() {
        let (backend, patient, ..) = backend_with_roles();
        backend.act_as(patient.id);
        backend.fail_after(1, ApiError::bad_request("later"));
        assert!(backend.read_user_me().is_ok());
        assert_eq!(backend.read_user_me().unwrap_err().user_message(), "later");
        assert!(backend.read_user_me().is_ok());
    }

    #[test]
    fn login_and_password_reset() {
        let (backend, ..) = backend_with_roles();
        let err = backend
            .login_access_token(&LoginCredentials {
                username: "pat@clinic.ru".into(),
                password: "nope".into(),
            })
            .unwrap_err();
        assert_eq!(err.user_message(), "Incorrect email or password");

        backend.recover_password("pat@clinic.ru").unwrap();
        let token = backend.reset_token_for("pat@clinic.ru").unwrap();
        backend
            .reset_password(&NewPassword {
                token: token.clone(),
                new_password: "fresh-password".into(),
            })
            .unwrap();
        assert!(backend
            .reset_password(&NewPassword {
                token,
                new_password: "again-password".into(),
            })
            .is_err());

        let login = backend
            .login_access_token(&LoginCredentials {
                username: "pat@clinic.ru".into(),
                password: "fresh-password".into(),
            })
            .unwrap();
        backend.set_access_token(Some(AccessToken::new(login.access_token)));
        assert_eq!(backend.test_token().unwrap().email, "pat@clinic.ru");
    }

    #[test]
    fn deleting_user_removes_their_appointments() {
        let (backend, patient, _, admin) = backend_with_roles();
        backend.act_as(patient.id);
        backend
            .create_appointment_patient(&AppointmentCreatePatient {
                complaints: "headache".into(),
                doctor_id: None,
            })
            .unwrap();
        assert_eq!(backend.appointment_count(), 1);

        backend.act_as(admin.id);
        backend.delete_user(patient.id).unwrap();
        assert_eq!(backend.appointment_count(), 0);
        assert!(backend.delete_user(admin.id).is_err());
    }
}
