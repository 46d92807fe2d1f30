//! "New appointment" dialog for patients.

use uuid::Uuid;

use super::MSG_COMPLAINTS_REQUIRED;
use crate::context::AppContext;
use crate::models::{Appointment, AppointmentCreatePatient};
use crate::notify::handle_error;
use crate::query::QueryKey;
use crate::validation::{required, FieldErrors, FormError};

pub const MSG_REQUEST_CREATED: &str = "Запись создана успешна.";

#[derive(Debug, Clone, Default)]
pub struct NewRequestDialog {
    open: bool,
    complaints: String,
    doctor_id: Option<Uuid>,
    errors: FieldErrors,
}

impl NewRequestDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Close and drop whatever was typed.
    pub fn close(&mut self) {
        *self = Self::default();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn complaints(&self) -> &str {
        &self.complaints
    }

    pub fn doctor_id(&self) -> Option<Uuid> {
        self.doctor_id
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn set_complaints(&mut self, value: &str) {
        self.complaints = value.to_string();
    }

    pub fn select_doctor(&mut self, doctor_id: Option<Uuid>) {
        self.doctor_id = doctor_id;
    }

    pub fn submit(&mut self, ctx: &AppContext<'_>) -> Result<Appointment, FormError> {
        let mut errors = FieldErrors::new();
        errors.check("complaints", required(&self.complaints, MSG_COMPLAINTS_REQUIRED));
        self.errors = errors.clone();
        errors.into_result()?;

        let body = AppointmentCreatePatient {
            complaints: self.complaints.clone(),
            doctor_id: self.doctor_id,
        };
        let result = ctx.backend.create_appointment_patient(&body);
        ctx.queries.invalidate(&QueryKey::appointments());

        let created = result.inspect_err(|err| handle_error(ctx.notifier, err))?;
        tracing::info!(appointment_id = %created.id, "Appointment requested");
        ctx.notifier.success(MSG_REQUEST_CREATED);
        self.close();
        Ok(created)
    }
}
