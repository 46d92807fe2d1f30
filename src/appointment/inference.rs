//! Diagnosis suggestions from the inference service.
//!
//! Flow: resolve the patient's gender and age, send the complaints,
//! write the answer into the draft's NLP fields. Nothing is persisted;
//! the suggestions are saved only with the next submit.

use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use super::AppointmentDraft;
use crate::api::{ApiError, Backend};
use crate::config::{DEFAULT_INFERENCE_AGE, EMPTY_COMPLAINTS_PLACEHOLDER};
use crate::context::AppContext;
use crate::models::{InferenceRequest, InferenceResponse, UserGender, UserPublic};
use crate::notify::handle_error;
use crate::validation::FormError;

pub const MSG_SUGGESTIONS_RECEIVED: &str = "Рекомендации получены";

/// Full years between `birth` and `today`. Zero for dates after `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> u32 {
    if birth > today {
        return 0;
    }
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}

/// Gender and age sent with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    pub gender: UserGender,
    pub age: u32,
}

impl Default for Subject {
    fn default() -> Self {
        Self {
            gender: UserGender::Male,
            age: DEFAULT_INFERENCE_AGE,
        }
    }
}

impl Subject {
    pub fn of(patient: &UserPublic, today: NaiveDate) -> Self {
        let defaults = Self::default();
        Self {
            gender: patient.gender.unwrap_or(defaults.gender),
            age: patient
                .birth_date
                .map_or(defaults.age, |birth| age_on(birth, today)),
        }
    }
}

/// Look up the selected patient, or fall back to defaults when none is.
pub fn resolve_subject(
    backend: &dyn Backend,
    patient_id: Option<Uuid>,
    today: NaiveDate,
) -> Result<Subject, ApiError> {
    match patient_id {
        Some(id) => backend
            .read_user_by_id(id)
            .map(|patient| Subject::of(&patient, today)),
        None => Ok(Subject::default()),
    }
}

pub fn build_request(subject: Subject, complaints: &str) -> InferenceRequest {
    let complaints = if complaints.trim().is_empty() {
        EMPTY_COMPLAINTS_PLACEHOLDER.to_string()
    } else {
        complaints.to_string()
    };
    InferenceRequest {
        gender: subject.gender,
        age: subject.age,
        complaints,
    }
}

/// Run the whole flow against `draft`. On failure the NLP fields are
/// left as they were and an error toast is shown.
pub fn suggest(
    ctx: &AppContext<'_>,
    draft: &mut AppointmentDraft,
    today: NaiveDate,
) -> Result<InferenceResponse, FormError> {
    let response = resolve_subject(ctx.backend, draft.patient_id, today)
        .and_then(|subject| {
            let request = build_request(subject, &draft.complaints);
            tracing::debug!(gender = %request.gender, age = request.age, "Requesting inference");
            ctx.backend.run_inference(&request)
        })
        .inspect_err(|err| handle_error(ctx.notifier, err))?;

    draft.nlp_diagnosis = response.diagnosis.clone();
    draft.nlp_recommendations = response.recommendations.clone();
    ctx.notifier.success(MSG_SUGGESTIONS_RECEIVED);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::Harness;
    use crate::models::UserRole;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_counts_full_years() {
        let today = date(2025, 6, 15);
        assert_eq!(age_on(date(2005, 6, 15), today), 20);
        assert_eq!(age_on(date(2005, 6, 16), today), 19);
        assert_eq!(age_on(date(2000, 2, 29), date(2025, 2, 28)), 24);
        assert_eq!(age_on(date(2030, 1, 1), today), 0);
    }

    #[test]
    fn blank_complaints_use_placeholder() {
        let request = build_request(Subject::default(), "  ");
        assert_eq!(request.complaints, "нет описания");
        assert_eq!(request.age, 20);
        assert_eq!(request.gender, UserGender::Male);
    }

    #[test]
    fn patient_gender_and_age_reach_the_service() {
        let h = Harness::new();
        let today = date(2025, 6, 15);
        h.login_as("doc@clinic.ru", UserRole::Doctor, false);
        let patient = h.add_patient("anna@clinic.ru", UserGender::Female, Some(date(2005, 6, 15)));
        h.backend.set_inference_response("ОРВИ", "Постельный режим");

        let mut draft = AppointmentDraft {
            patient_id: Some(patient.id),
            complaints: "fever".into(),
            ..Default::default()
        };
        suggest(&h.ctx(), &mut draft, today).unwrap();

        let sent = h.backend.inference_requests();
        assert_eq!(
            sent,
            vec![InferenceRequest {
                gender: UserGender::Female,
                age: 20,
                complaints: "fever".into(),
            }]
        );
        assert_eq!(draft.nlp_diagnosis, "ОРВИ");
        assert_eq!(draft.nlp_recommendations, "Постельный режим");
        assert_eq!(h.last_toast(), MSG_SUGGESTIONS_RECEIVED);
    }

    #[test]
    fn no_patient_uses_defaults() {
        let h = Harness::new();
        h.login_as("doc@clinic.ru", UserRole::Doctor, false);
        h.backend.set_inference_response("Мигрень", "");
        let mut draft = AppointmentDraft::default();
        suggest(&h.ctx(), &mut draft, date(2025, 6, 15)).unwrap();
        let sent = &h.backend.inference_requests()[0];
        assert_eq!((sent.gender, sent.age), (UserGender::Male, 20));
        assert_eq!(sent.complaints, "нет описания");
    }

    #[test]
    fn failure_keeps_previous_suggestions() {
        let h = Harness::new();
        h.login_as("doc@clinic.ru", UserRole::Doctor, false);
        h.backend.fail_next(ApiError::bad_request("ML service error"));
        let mut draft = AppointmentDraft {
            nlp_diagnosis: "old".into(),
            ..Default::default()
        };
        assert!(suggest(&h.ctx(), &mut draft, date(2025, 6, 15)).is_err());
        assert_eq!(draft.nlp_diagnosis, "old");
        assert_eq!(h.last_toast(), "ML service error");
    }
}
