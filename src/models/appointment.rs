use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::double_option;
use super::enums::{AppointmentStatus, SortOrder, UserGender};

/// Patient or doctor summary embedded in an appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentUser {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<UserGender>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    #[serde(default)]
    pub complaints: Option<String>,
    #[serde(default)]
    pub doctor_diagnosis: Option<String>,
    #[serde(default)]
    pub doctor_recommendations: Option<String>,
    #[serde(default)]
    pub nlp_diagnosis: Option<String>,
    #[serde(default)]
    pub nlp_recommendations: Option<String>,
    #[serde(default)]
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub patient: Option<AppointmentUser>,
    #[serde(default)]
    pub doctor: Option<AppointmentUser>,
}

impl Appointment {
    pub fn doctor_name(&self) -> &str {
        self.doctor
            .as_ref()
            .and_then(|d| d.full_name.as_deref())
            .filter(|n| !n.is_empty())
            .unwrap_or("N/A")
    }

    /// Patient name, falling back to the bare id, then "N/A".
    pub fn patient_label(&self) -> String {
        if let Some(name) = self.patient.as_ref().and_then(|p| p.full_name.as_deref()) {
            return name.to_string();
        }
        match self.patient_id {
            Some(id) => format!("ID: {id}"),
            None => "N/A".to_string(),
        }
    }
}

/// Body of `createAppointmentPatient`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentCreatePatient {
    pub complaints: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<Uuid>,
}

/// Body of `createAppointmentDoctor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentCreateDoctor {
    pub patient_id: Uuid,
    #[serde(default)]
    pub complaints: Option<String>,
    #[serde(default)]
    pub doctor_diagnosis: Option<String>,
    #[serde(default)]
    pub doctor_recommendations: Option<String>,
    #[serde(default)]
    pub nlp_diagnosis: Option<String>,
    #[serde(default)]
    pub nlp_recommendations: Option<String>,
}

/// Partial update. Outer `None` leaves the field untouched,
/// `Some(None)` clears it (sent as `null`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub complaints: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub doctor_diagnosis: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub doctor_recommendations: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub nlp_diagnosis: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub nlp_recommendations: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub status: Option<Option<AppointmentStatus>>,
}

impl AppointmentUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply every present field to `appointment`.
    pub fn apply_to(&self, appointment: &mut Appointment) {
        if let Some(v) = &self.complaints {
            appointment.complaints = v.clone();
        }
        if let Some(v) = &self.doctor_diagnosis {
            appointment.doctor_diagnosis = v.clone();
        }
        if let Some(v) = &self.doctor_recommendations {
            appointment.doctor_recommendations = v.clone();
        }
        if let Some(v) = &self.nlp_diagnosis {
            appointment.nlp_diagnosis = v.clone();
        }
        if let Some(v) = &self.nlp_recommendations {
            appointment.nlp_recommendations = v.clone();
        }
        if let Some(Some(status)) = self.status {
            appointment.status = status;
        }
    }
}

/// Query parameters of `readAppointments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentQuery {
    pub skip: u64,
    pub limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for AppointmentQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
            order: None,
            search: None,
        }
    }
}
