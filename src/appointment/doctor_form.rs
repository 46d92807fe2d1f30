//! Full-page appointment form used by doctors and administrators.
//!
//! Lifecycle:
//! 1. `DoctorForm::create()` — blank form, mode `Create`
//! 2. `DoctorForm::open(id)` + `load` — `Loading`, then `Ready` or `NotFound`
//! 3. `begin_edit` / `cancel` toggle view ↔ edit on a loaded record
//! 4. `submit` creates or updates, depending on the mode
//!
//! Submission is refused while the draft equals its baseline.

use chrono::NaiveDate;
use uuid::Uuid;

use super::inference;
use super::{
    doctor_field_access, AppointmentDraft, AppointmentField, FieldAccess, Mode,
    MSG_COMPLAINTS_NEEDED, MSG_DIAGNOSIS_NEEDED, MSG_NOT_FOUND_HINT, MSG_NOT_FOUND_TITLE,
    MSG_PATIENT_NEEDED,
};
use crate::context::AppContext;
use crate::models::{Appointment, AppointmentCreateDoctor, AppointmentUpdate, InferenceResponse};
use crate::notify::handle_error;
use crate::query::QueryKey;
use crate::routes::Route;
use crate::validation::{required, FieldError, FieldErrors, FormError};

pub const MSG_CREATED: &str = "Приём успешно создан";
pub const MSG_UPDATED: &str = "Информация о приёме обновлена";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Loading,
    Ready,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct DoctorForm {
    id: Option<Uuid>,
    state: PageState,
    mode: Mode,
    appointment: Option<Appointment>,
    baseline: AppointmentDraft,
    draft: AppointmentDraft,
    errors: FieldErrors,
    inferring: bool,
}

impl DoctorForm {
    /// Blank form for a new record.
    pub fn create() -> Self {
        Self {
            id: None,
            state: PageState::Ready,
            mode: Mode::Create,
            appointment: None,
            baseline: AppointmentDraft::default(),
            draft: AppointmentDraft::default(),
            errors: FieldErrors::new(),
            inferring: false,
        }
    }

    /// Page for an existing record; call `load` next.
    pub fn open(id: Uuid) -> Self {
        Self {
            id: Some(id),
            state: PageState::Loading,
            mode: Mode::View,
            ..Self::create()
        }
    }

    /// Form for the route, if it is an appointment page.
    pub fn for_route(route: &Route) -> Option<Self> {
        match route {
            Route::CreateAppointment => Some(Self::create()),
            Route::Appointment(id) => Some(Self::open(*id)),
            _ => None,
        }
    }

    /// Fetch the record. A failed fetch shows the not-found state, without a toast.
    pub fn load(&mut self, ctx: &AppContext<'_>) {
        let Some(id) = self.id else {
            return;
        };
        let result = ctx
            .queries
            .fetch(&QueryKey::appointment(id), || ctx.backend.read_appointment(id));
        match result {
            Ok(appointment) => self.show(appointment),
            Err(err) => {
                tracing::warn!(appointment_id = %id, error = %err, "Appointment not loaded");
                self.state = PageState::NotFound;
                self.appointment = None;
            }
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn appointment(&self) -> Option<&Appointment> {
        self.appointment.as_ref()
    }

    pub fn draft(&self) -> &AppointmentDraft {
        &self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn is_inferring(&self) -> bool {
        self.inferring
    }

    /// Title and hint of the empty state, when the record was not found.
    pub fn empty_state(&self) -> Option<(&'static str, &'static str)> {
        (self.state == PageState::NotFound).then_some((MSG_NOT_FOUND_TITLE, MSG_NOT_FOUND_HINT))
    }

    pub fn access(&self, field: AppointmentField) -> FieldAccess {
        doctor_field_access(self.mode, field)
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.baseline
    }

    pub fn can_submit(&self) -> bool {
        self.state == PageState::Ready && self.mode != Mode::View && self.is_dirty()
    }

    /// Inference is offered while composing.
    pub fn can_infer(&self) -> bool {
        self.state == PageState::Ready && self.mode != Mode::View && !self.inferring
    }

    pub fn begin_edit(&mut self) -> Result<(), FormError> {
        match (self.mode, self.state) {
            (Mode::Edit, _) => Ok(()),
            (Mode::View, PageState::Ready) if self.id.is_some() => {
                self.mode = Mode::Edit;
                Ok(())
            }
            _ => Err(FormError::InvalidTransition("no loaded appointment to edit")),
        }
    }

    /// Leave edit mode and restore the loaded values.
    pub fn cancel(&mut self) {
        if self.mode == Mode::Edit {
            self.draft = self.baseline.clone();
            self.errors = FieldErrors::new();
            self.mode = Mode::View;
        }
    }

    pub fn set_field(&mut self, field: AppointmentField, value: &str) -> Result<(), FormError> {
        self.draft.set(field, value, self.access(field))
    }

    /// Choose the patient of a new record (from the user search).
    pub fn select_patient(&mut self, patient_id: Option<Uuid>) -> Result<(), FormError> {
        if !self.access(AppointmentField::Patient).is_editable() {
            return Err(FormError::LockedField(AppointmentField::Patient.name()));
        }
        self.draft.patient_id = patient_id;
        Ok(())
    }

    /// Fill the NLP fields from the inference service.
    pub fn request_suggestions(
        &mut self,
        ctx: &AppContext<'_>,
        today: NaiveDate,
    ) -> Result<InferenceResponse, FormError> {
        if !self.can_infer() {
            return Err(FormError::InvalidTransition(
                "suggestions are available while composing",
            ));
        }
        self.inferring = true;
        let result = inference::suggest(ctx, &mut self.draft, today);
        self.inferring = false;
        result
    }

    /// Create or update, depending on the mode. A create returns the
    /// route of the new record.
    pub fn submit(&mut self, ctx: &AppContext<'_>) -> Result<Option<Route>, FormError> {
        if self.mode == Mode::View {
            return Err(FormError::InvalidTransition("nothing to submit in view mode"));
        }
        if !self.is_dirty() {
            return Err(FormError::Pristine);
        }
        self.validate()?;

        let result = match self.mode {
            Mode::Create => self.submit_create(ctx).map(Some),
            _ => self.submit_update(ctx).map(|()| None),
        };
        ctx.queries.invalidate(&QueryKey::appointments_page(1));
        result
    }

    fn validate(&mut self) -> Result<(), FormError> {
        let mut errors = FieldErrors::new();
        errors.check(
            "complaints",
            required(&self.draft.complaints, MSG_COMPLAINTS_NEEDED),
        );
        errors.check(
            "doctor_diagnosis",
            required(&self.draft.doctor_diagnosis, MSG_DIAGNOSIS_NEEDED),
        );
        if self.mode == Mode::Create && self.draft.patient_id.is_none() {
            errors.check("patient_id", Err::<(), _>(FieldError::new(MSG_PATIENT_NEEDED)));
        }
        self.errors = errors.clone();
        errors.into_result()
    }

    fn submit_create(&mut self, ctx: &AppContext<'_>) -> Result<Route, FormError> {
        let patient_id = self
            .draft
            .patient_id
            .ok_or(FormError::InvalidTransition("patient not selected"))?;
        let body = AppointmentCreateDoctor {
            patient_id,
            complaints: self.draft.normalized(AppointmentField::Complaints),
            doctor_diagnosis: self.draft.normalized(AppointmentField::DoctorDiagnosis),
            doctor_recommendations: self.draft.normalized(AppointmentField::DoctorRecommendations),
            nlp_diagnosis: self.draft.normalized(AppointmentField::NlpDiagnosis),
            nlp_recommendations: self.draft.normalized(AppointmentField::NlpRecommendations),
        };
        let created = ctx
            .backend
            .create_appointment_doctor(&body)
            .inspect_err(|err| handle_error(ctx.notifier, err))?;

        tracing::info!(appointment_id = %created.id, "Appointment created");
        ctx.notifier.success(MSG_CREATED);
        ctx.queries.set(&QueryKey::appointment(created.id), created.clone());
        self.id = Some(created.id);
        let route = Route::Appointment(created.id);
        self.show(created);
        Ok(route)
    }

    fn submit_update(&mut self, ctx: &AppContext<'_>) -> Result<(), FormError> {
        let id = self
            .id
            .ok_or(FormError::InvalidTransition("no appointment to update"))?;
        let update = AppointmentUpdate {
            complaints: Some(self.draft.normalized(AppointmentField::Complaints)),
            doctor_diagnosis: Some(self.draft.normalized(AppointmentField::DoctorDiagnosis)),
            doctor_recommendations: Some(
                self.draft.normalized(AppointmentField::DoctorRecommendations),
            ),
            nlp_diagnosis: Some(self.draft.normalized(AppointmentField::NlpDiagnosis)),
            nlp_recommendations: Some(self.draft.normalized(AppointmentField::NlpRecommendations)),
            status: None,
        };
        let updated = ctx
            .backend
            .update_appointment(id, &update)
            .inspect_err(|err| handle_error(ctx.notifier, err))?;

        tracing::info!(appointment_id = %id, "Appointment updated");
        ctx.notifier.success(MSG_UPDATED);
        ctx.queries.invalidate(&QueryKey::appointment(id));
        self.show(updated);
        Ok(())
    }

    fn show(&mut self, appointment: Appointment) {
        self.baseline = AppointmentDraft::from_appointment(&appointment);
        self.draft = self.baseline.clone();
        self.appointment = Some(appointment);
        self.errors = FieldErrors::new();
        self.state = PageState::Ready;
        self.mode = Mode::View;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, AppointmentsApi};
    use crate::context::testing::Harness;
    use crate::models::{AppointmentCreatePatient, AppointmentStatus, UserGender, UserRole};
    use AppointmentField::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn doctor_with_record(h: &Harness) -> Appointment {
        let patient = h.add_patient("anna@clinic.ru", UserGender::Female, None);
        h.login_as("doc@clinic.ru", UserRole::Doctor, false);
        h.backend
            .create_appointment_doctor(&AppointmentCreateDoctor {
                patient_id: patient.id,
                complaints: Some("cough".into()),
                doctor_diagnosis: Some("bronchitis".into()),
                doctor_recommendations: None,
                nlp_diagnosis: None,
                nlp_recommendations: None,
            })
            .unwrap()
    }

    #[test]
    fn create_flow_navigates_to_new_record() {
        let h = Harness::new();
        let patient = h.add_patient("anna@clinic.ru", UserGender::Female, None);
        h.login_as("doc@clinic.ru", UserRole::Doctor, false);

        let mut form = DoctorForm::create();
        assert!(!form.can_submit());
        assert!(matches!(form.submit(&h.ctx()), Err(FormError::Pristine)));

        form.select_patient(Some(patient.id)).unwrap();
        form.set_field(Complaints, "fever").unwrap();
        form.set_field(DoctorDiagnosis, "flu").unwrap();
        form.set_field(DoctorRecommendations, "  ").unwrap();
        assert!(form.set_field(NlpDiagnosis, "typed").is_err());

        let route = form.submit(&h.ctx()).unwrap().unwrap();
        let id = form.id().unwrap();
        assert_eq!(route, Route::Appointment(id));
        assert_eq!(form.mode(), Mode::View);
        assert_eq!(h.last_toast(), MSG_CREATED);
        assert!(h.queries.was_invalidated(&QueryKey::appointments_page(1)));

        let stored = h.backend.appointment(id).unwrap();
        assert_eq!(stored.status, AppointmentStatus::Completed);
        assert_eq!(stored.doctor_recommendations, None);
    }

    #[test]
    fn create_requires_patient_complaints_and_diagnosis() {
        let h = Harness::new();
        h.login_as("doc@clinic.ru", UserRole::Doctor, false);
        let mut form = DoctorForm::create();
        form.set_field(DoctorRecommendations, "rest").unwrap();
        let err = form.submit(&h.ctx()).unwrap_err();
        let errors = err.field_errors().unwrap();
        assert_eq!(errors.get("complaints"), Some(MSG_COMPLAINTS_NEEDED));
        assert_eq!(errors.get("doctor_diagnosis"), Some(MSG_DIAGNOSIS_NEEDED));
        assert_eq!(errors.get("patient_id"), Some(MSG_PATIENT_NEEDED));
        assert_eq!(h.backend.appointment_count(), 0);
    }

    #[test]
    fn load_then_edit_and_update() {
        let h = Harness::new();
        let record = doctor_with_record(&h);
        let mut form = DoctorForm::open(record.id);
        assert_eq!(form.state(), PageState::Loading);
        form.load(&h.ctx());
        assert_eq!(form.state(), PageState::Ready);
        assert_eq!(form.draft().complaints, "cough");

        assert!(form.set_field(Complaints, "x").is_err());
        form.begin_edit().unwrap();
        assert!(form.select_patient(None).is_err());
        form.set_field(DoctorDiagnosis, "pneumonia").unwrap();
        form.set_field(Complaints, "dry cough").unwrap();

        assert_eq!(form.submit(&h.ctx()).unwrap(), None);
        assert_eq!(h.last_toast(), MSG_UPDATED);
        assert_eq!(form.mode(), Mode::View);
        assert!(h.queries.was_invalidated(&QueryKey::appointment(record.id)));
        assert_eq!(
            h.backend.appointment(record.id).unwrap().complaints.as_deref(),
            Some("dry cough")
        );
        assert_eq!(
            h.backend.appointment(record.id).unwrap().doctor_diagnosis.as_deref(),
            Some("pneumonia")
        );
    }

    #[test]
    fn doctor_records_diagnosis_on_patient_request() {
        let h = Harness::new();
        let doctor = h.backend.add_user("doc@clinic.ru", "password123", UserRole::Doctor, false);
        h.login_as("anna@clinic.ru", UserRole::Patient, false);
        let request = h
            .backend
            .create_appointment_patient(&AppointmentCreatePatient {
                complaints: "headache".into(),
                doctor_id: Some(doctor.id),
            })
            .unwrap();
        assert_eq!(request.doctor_diagnosis, None);

        h.backend.act_as(doctor.id);
        let mut form = DoctorForm::open(request.id);
        form.load(&h.ctx());
        form.begin_edit().unwrap();
        form.set_field(DoctorDiagnosis, "migraine").unwrap();

        assert_eq!(form.submit(&h.ctx()).unwrap(), None);
        assert_eq!(h.last_toast(), MSG_UPDATED);
        let stored = h.backend.appointment(request.id).unwrap();
        assert_eq!(stored.doctor_diagnosis.as_deref(), Some("migraine"));
        assert_eq!(stored.complaints.as_deref(), Some("headache"));
    }

    #[test]
    fn edit_is_not_status_gated() {
        let h = Harness::new();
        let record = doctor_with_record(&h);
        assert_eq!(record.status, AppointmentStatus::Completed);
        let mut form = DoctorForm::open(record.id);
        form.load(&h.ctx());
        assert!(form.begin_edit().is_ok());
    }

    #[test]
    fn cancel_restores_loaded_values() {
        let h = Harness::new();
        let record = doctor_with_record(&h);
        let mut form = DoctorForm::open(record.id);
        form.load(&h.ctx());
        form.begin_edit().unwrap();
        form.set_field(Complaints, "changed").unwrap();
        assert!(form.is_dirty());
        form.cancel();
        assert!(!form.is_dirty());
        assert_eq!(form.mode(), Mode::View);
    }

    #[test]
    fn missing_record_shows_empty_state() {
        let h = Harness::new();
        h.login_as("doc@clinic.ru", UserRole::Doctor, false);
        let mut form = DoctorForm::open(Uuid::new_v4());
        form.load(&h.ctx());
        assert_eq!(form.state(), PageState::NotFound);
        assert_eq!(form.empty_state(), Some((MSG_NOT_FOUND_TITLE, MSG_NOT_FOUND_HINT)));
        assert!(h.notifier.toasts().is_empty());
        assert!(form.begin_edit().is_err());
    }

    #[test]
    fn failed_update_settles_and_toasts() {
        let h = Harness::new();
        let record = doctor_with_record(&h);
        let mut form = DoctorForm::open(record.id);
        form.load(&h.ctx());
        form.begin_edit().unwrap();
        form.set_field(Complaints, "new").unwrap();
        h.backend.fail_next(ApiError::unprocessable("complaints", "field required"));
        assert!(matches!(form.submit(&h.ctx()), Err(FormError::Api(_))));
        assert_eq!(h.last_toast(), "field required");
        assert_eq!(form.mode(), Mode::Edit);
        assert!(h.queries.was_invalidated(&QueryKey::appointments_page(1)));
    }

    #[test]
    fn suggestions_only_while_composing() {
        let h = Harness::new();
        let patient = h.add_patient(
            "anna@clinic.ru",
            UserGender::Female,
            NaiveDate::from_ymd_opt(2005, 6, 15),
        );
        h.login_as("doc@clinic.ru", UserRole::Doctor, false);
        h.backend.set_inference_response("Грипп", "Обильное питьё");

        let mut form = DoctorForm::create();
        form.select_patient(Some(patient.id)).unwrap();
        form.set_field(Complaints, "fever").unwrap();
        form.request_suggestions(&h.ctx(), today()).unwrap();
        assert!(!form.is_inferring());
        assert_eq!(form.draft().nlp_diagnosis, "Грипп");
        let sent = &h.backend.inference_requests()[0];
        assert_eq!((sent.gender, sent.age), (UserGender::Female, 20));

        let record = doctor_with_record(&h);
        let mut viewing = DoctorForm::open(record.id);
        viewing.load(&h.ctx());
        assert!(viewing.request_suggestions(&h.ctx(), today()).is_err());
    }
}
