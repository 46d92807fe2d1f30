//! Appointment edit/view controllers.
//!
//! Two presenters share one field model:
//! - `PatientDialog`: view ↔ edit, edit only while `pending`
//! - `DoctorForm`: create → view ↔ edit, not status-gated
//!
//! Which fields a mode may change is decided by the access tables below;
//! setters consult them and refuse locked fields with `FormError::LockedField`.

pub mod doctor_form;
pub mod inference;
pub mod list;
pub mod new_request;
pub mod patient_dialog;

pub use doctor_form::{DoctorForm, PageState};
pub use list::{AppointmentCard, AppointmentList};
pub use new_request::NewRequestDialog;
pub use patient_dialog::PatientDialog;

use uuid::Uuid;

use crate::models::Appointment;
use crate::validation::{empty_to_null, FormError};

pub const MSG_COMPLAINTS_REQUIRED: &str = "Жалобы обязательны";
pub const MSG_COMPLAINTS_NEEDED: &str = "Требуются жалобы";
pub const MSG_DIAGNOSIS_NEEDED: &str = "Требуется диагноз врача";
pub const MSG_PATIENT_NEEDED: &str = "Укажите пациента";
pub const MSG_NOT_FOUND_TITLE: &str = "Приём не найден";
pub const MSG_NOT_FOUND_HINT: &str = "Создайте новый, чтобы начать работу";
pub const MSG_NO_COMPLAINTS: &str = "Не указаны";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    View,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppointmentField {
    Patient,
    Complaints,
    DoctorDiagnosis,
    DoctorRecommendations,
    NlpDiagnosis,
    NlpRecommendations,
    Status,
}

impl AppointmentField {
    pub fn name(self) -> &'static str {
        match self {
            Self::Patient => "patient_id",
            Self::Complaints => "complaints",
            Self::DoctorDiagnosis => "doctor_diagnosis",
            Self::DoctorRecommendations => "doctor_recommendations",
            Self::NlpDiagnosis => "nlp_diagnosis",
            Self::NlpRecommendations => "nlp_recommendations",
            Self::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccess {
    Editable,
    ReadOnly,
    Hidden,
}

impl FieldAccess {
    pub fn is_editable(self) -> bool {
        self == Self::Editable
    }
}

// ═══════════════════════════════════════════════════════════
// Access tables
// ═══════════════════════════════════════════════════════════

/// Field mutability on the doctor/admin page.
pub fn doctor_field_access(mode: Mode, field: AppointmentField) -> FieldAccess {
    use AppointmentField::*;
    use FieldAccess::*;
    match (mode, field) {
        (Mode::View, _) => ReadOnly,
        (Mode::Create, Patient) => Editable,
        (Mode::Edit, Patient) => Hidden,
        (_, Complaints) | (_, DoctorDiagnosis) | (_, DoctorRecommendations) => Editable,
        // Written by the inference flow only
        (_, NlpDiagnosis) | (_, NlpRecommendations) => ReadOnly,
        (_, Status) => Hidden,
    }
}

/// Field mutability in the patient dialog. `Create` does not occur there.
pub fn patient_field_access(mode: Mode, field: AppointmentField) -> FieldAccess {
    use AppointmentField::*;
    match (mode, field) {
        (_, Patient) => FieldAccess::Hidden,
        (Mode::Edit, Complaints | DoctorDiagnosis | DoctorRecommendations) => FieldAccess::Editable,
        _ => FieldAccess::ReadOnly,
    }
}

// ═══════════════════════════════════════════════════════════
// Draft — form values being edited
// ═══════════════════════════════════════════════════════════

/// Raw text of an appointment form. Absent values are empty strings
/// until submit turns them back into nulls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentDraft {
    pub patient_id: Option<Uuid>,
    pub complaints: String,
    pub doctor_diagnosis: String,
    pub doctor_recommendations: String,
    pub nlp_diagnosis: String,
    pub nlp_recommendations: String,
}

impl AppointmentDraft {
    pub fn from_appointment(appointment: &Appointment) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            patient_id: appointment.patient_id,
            complaints: text(&appointment.complaints),
            doctor_diagnosis: text(&appointment.doctor_diagnosis),
            doctor_recommendations: text(&appointment.doctor_recommendations),
            nlp_diagnosis: text(&appointment.nlp_diagnosis),
            nlp_recommendations: text(&appointment.nlp_recommendations),
        }
    }

    /// Text value of `field`; `Patient` and `Status` have none.
    pub fn get(&self, field: AppointmentField) -> Option<&str> {
        use AppointmentField::*;
        match field {
            Complaints => Some(&self.complaints),
            DoctorDiagnosis => Some(&self.doctor_diagnosis),
            DoctorRecommendations => Some(&self.doctor_recommendations),
            NlpDiagnosis => Some(&self.nlp_diagnosis),
            NlpRecommendations => Some(&self.nlp_recommendations),
            Patient | Status => None,
        }
    }

    fn slot(&mut self, field: AppointmentField) -> Result<&mut String, FormError> {
        use AppointmentField::*;
        match field {
            Complaints => Ok(&mut self.complaints),
            DoctorDiagnosis => Ok(&mut self.doctor_diagnosis),
            DoctorRecommendations => Ok(&mut self.doctor_recommendations),
            NlpDiagnosis => Ok(&mut self.nlp_diagnosis),
            NlpRecommendations => Ok(&mut self.nlp_recommendations),
            Patient | Status => Err(FormError::LockedField(field.name())),
        }
    }

    /// Write a text field when `access` allows it.
    pub(crate) fn set(
        &mut self,
        field: AppointmentField,
        value: &str,
        access: FieldAccess,
    ) -> Result<(), FormError> {
        if !access.is_editable() {
            tracing::debug!(field = field.name(), ?access, "Refusing write to locked field");
            return Err(FormError::LockedField(field.name()));
        }
        *self.slot(field)? = value.to_string();
        Ok(())
    }

    pub(crate) fn normalized(&self, field: AppointmentField) -> Option<String> {
        self.get(field).and_then(empty_to_null)
    }
}
