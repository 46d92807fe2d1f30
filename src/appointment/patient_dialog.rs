//! Appointment dialog opened from a patient's dashboard card.

use super::{patient_field_access, AppointmentDraft, AppointmentField, Mode, MSG_COMPLAINTS_REQUIRED};
use crate::context::AppContext;
use crate::models::{Appointment, AppointmentUpdate};
use crate::notify::handle_error;
use crate::query::QueryKey;
use crate::validation::{required, FieldErrors, FormError};

pub const MSG_CHANGES_SAVED: &str = "Изменения сохранены";
pub const TITLE_VIEW: &str = "Информация о приёме";
pub const TITLE_EDIT: &str = "Редактировать приём";

#[derive(Debug, Clone)]
pub struct PatientDialog {
    appointment: Appointment,
    draft: AppointmentDraft,
    mode: Mode,
    open: bool,
    errors: FieldErrors,
}

impl PatientDialog {
    /// A closed dialog in view mode for `appointment`.
    pub fn new(appointment: Appointment) -> Self {
        let draft = AppointmentDraft::from_appointment(&appointment);
        Self {
            appointment,
            draft,
            mode: Mode::View,
            open: false,
            errors: FieldErrors::new(),
        }
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Close from either mode: back to view with the original values.
    pub fn close(&mut self) {
        self.open = false;
        self.reset();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn appointment(&self) -> &Appointment {
        &self.appointment
    }

    pub fn draft(&self) -> &AppointmentDraft {
        &self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            Mode::Edit => TITLE_EDIT,
            _ => TITLE_VIEW,
        }
    }

    pub fn doctor_name(&self) -> &str {
        self.appointment.doctor_name()
    }

    pub fn can_edit(&self) -> bool {
        self.appointment.status.is_pending()
    }

    pub fn begin_edit(&mut self) -> Result<(), FormError> {
        if self.mode == Mode::Edit {
            return Ok(());
        }
        if !self.can_edit() {
            return Err(FormError::InvalidTransition(
                "only pending appointments can be edited",
            ));
        }
        self.mode = Mode::Edit;
        Ok(())
    }

    /// Discard edits and return to view.
    pub fn cancel(&mut self) {
        self.reset();
    }

    pub fn set_field(&mut self, field: AppointmentField, value: &str) -> Result<(), FormError> {
        self.draft
            .set(field, value, patient_field_access(self.mode, field))
    }

    /// Send the edited fields. Whitespace-only text is sent as `null`.
    pub fn save(&mut self, ctx: &AppContext<'_>) -> Result<&Appointment, FormError> {
        if self.mode != Mode::Edit {
            return Err(FormError::InvalidTransition("save requires edit mode"));
        }

        let mut errors = FieldErrors::new();
        errors.check(
            "complaints",
            required(&self.draft.complaints, MSG_COMPLAINTS_REQUIRED),
        );
        self.errors = errors.clone();
        errors.into_result()?;

        let update = AppointmentUpdate {
            complaints: Some(self.draft.normalized(AppointmentField::Complaints)),
            doctor_diagnosis: Some(self.draft.normalized(AppointmentField::DoctorDiagnosis)),
            doctor_recommendations: Some(
                self.draft.normalized(AppointmentField::DoctorRecommendations),
            ),
            ..Default::default()
        };

        let id = self.appointment.id;
        let updated = ctx
            .backend
            .update_appointment(id, &update)
            .inspect_err(|err| handle_error(ctx.notifier, err))?;

        tracing::info!(appointment_id = %id, "Patient updated appointment");
        ctx.notifier.success(MSG_CHANGES_SAVED);
        ctx.queries.invalidate(&QueryKey::appointment(id));
        self.appointment = updated;
        self.reset();
        Ok(&self.appointment)
    }

    fn reset(&mut self) {
        self.draft = AppointmentDraft::from_appointment(&self.appointment);
        self.mode = Mode::View;
        self.errors = FieldErrors::new();
    }
}
