//! Dashboard list of appointment cards.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::MSG_NO_COMPLAINTS;
use crate::capabilities::{AppointmentPresenter, CapabilitySet, CreateAction};
use crate::config::APPOINTMENTS_PER_PAGE;
use crate::context::AppContext;
use crate::models::{Appointment, AppointmentQuery, AppointmentStatus, Page, SortOrder};
use crate::notify::handle_error;
use crate::query::QueryKey;
use crate::routes::Route;
use crate::validation::FormError;

pub const MSG_EMPTY_LIST: &str = "У вас пока нет приёмов";

/// `DD.MM.YYYY HH:MM` in UTC.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%d.%m.%Y %H:%M").to_string()
}

/// One rendered card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentCard {
    pub id: Uuid,
    pub status: AppointmentStatus,
    pub status_label: &'static str,
    pub doctor: String,
    pub patient: String,
    pub complaints: String,
    pub updated: String,
}

impl AppointmentCard {
    pub fn from_appointment(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id,
            status: appointment.status,
            status_label: appointment.status.label(),
            doctor: appointment.doctor_name().to_string(),
            patient: appointment.patient_label(),
            complaints: appointment
                .complaints
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| MSG_NO_COMPLAINTS.to_string()),
            updated: format_timestamp(&appointment.updated_at),
        }
    }
}

/// What opening a card leads to.
#[derive(Debug, Clone, PartialEq)]
pub enum CardAction {
    /// Show the record in a `PatientDialog`.
    OpenDialog(Box<Appointment>),
    Navigate(Route),
}

#[derive(Debug, Clone)]
pub struct AppointmentList {
    page: u32,
    search: Option<String>,
    order: SortOrder,
    result: Page<Appointment>,
    loaded: bool,
}

impl Default for AppointmentList {
    fn default() -> Self {
        Self::new(1)
    }
}

impl AppointmentList {
    /// List starting at `page` (1-based; zero is treated as 1).
    pub fn new(page: u32) -> Self {
        Self {
            page: page.max(1),
            search: None,
            order: SortOrder::Desc,
            result: Page::empty(),
            loaded: false,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn query(&self) -> AppointmentQuery {
        let page_size = APPOINTMENTS_PER_PAGE;
        AppointmentQuery {
            skip: u64::from(self.page - 1) * page_size,
            limit: page_size,
            order: Some(self.order),
            search: self.search.clone(),
        }
    }

    /// Query key of the current page. Search and order are part of it.
    pub fn key(&self) -> QueryKey {
        let mut segments: Vec<String> = QueryKey::appointments_page(self.page)
            .segments()
            .to_vec();
        segments.push(format!("order={}", self.order));
        if let Some(search) = &self.search {
            segments.push(format!("search={search}"));
        }
        QueryKey::new(segments)
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
        self.loaded = false;
    }

    /// New search text; blank clears it. Goes back to the first page.
    pub fn set_search(&mut self, search: &str) {
        let search = search.trim();
        self.search = (!search.is_empty()).then(|| search.to_string());
        self.set_page(1);
    }

    pub fn set_order(&mut self, order: SortOrder) {
        self.order = order;
        self.set_page(1);
    }

    pub fn load(&mut self, ctx: &AppContext<'_>) -> Result<(), FormError> {
        let query = self.query();
        let page = ctx
            .queries
            .fetch(&self.key(), || ctx.backend.read_appointments(&query))
            .inspect_err(|err| handle_error(ctx.notifier, err))?;
        tracing::debug!(page = self.page, count = page.count, "Appointments loaded");
        self.result = page;
        self.loaded = true;
        Ok(())
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.result.data
    }

    pub fn cards(&self) -> Vec<AppointmentCard> {
        self.result
            .data
            .iter()
            .map(AppointmentCard::from_appointment)
            .collect()
    }

    pub fn total(&self) -> u64 {
        self.result.count
    }

    pub fn page_count(&self) -> u64 {
        self.result.page_count(APPOINTMENTS_PER_PAGE)
    }

    /// Empty-state text for a loaded page with no cards.
    pub fn empty_state(&self) -> Option<&'static str> {
        (self.loaded && self.result.is_empty()).then_some(MSG_EMPTY_LIST)
    }

    /// Open the card with `id`, presented according to `capabilities`.
    pub fn open_card(&self, id: Uuid, capabilities: &CapabilitySet) -> Option<CardAction> {
        let appointment = self.result.data.iter().find(|a| a.id == id)?;
        Some(match capabilities.presenter() {
            AppointmentPresenter::PatientDialog => {
                CardAction::OpenDialog(Box::new(appointment.clone()))
            }
            AppointmentPresenter::DoctorPage => CardAction::Navigate(Route::Appointment(id)),
        })
    }

    pub fn create_action(capabilities: &CapabilitySet) -> CreateAction {
        capabilities.create_action()
    }
}
