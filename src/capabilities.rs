//! Role → capability mapping and view selection.
//!
//! Resolution order:
//! 1. Superuser flag → `Viewer::Superuser`, whatever the role
//! 2. Role `doctor` → `Viewer::Doctor`
//! 3. Otherwise → `Viewer::Patient`
//!
//! Screens ask for capabilities, never for roles.

use crate::models::{UserPublic, UserRole};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Viewer {
    Patient,
    Doctor,
    Superuser,
}

impl Viewer {
    pub fn of(user: &UserPublic) -> Self {
        if user.is_superuser {
            Self::Superuser
        } else {
            match user.role {
                UserRole::Doctor => Self::Doctor,
                UserRole::Patient => Self::Patient,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Submit a new appointment request with complaints.
    RequestAppointment,
    /// Create and edit full appointment records.
    AuthorAppointments,
    /// Open the user administration page.
    ManageUsers,
    /// Set the superuser flag on other accounts.
    GrantSuperuser,
    /// Edit complaints/diagnosis/recommendations of a pending record.
    EditPendingAsPatient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySet {
    viewer: Viewer,
    granted: Vec<Capability>,
}

impl CapabilitySet {
    pub fn for_viewer(viewer: Viewer) -> Self {
        use Capability::*;
        let granted = match viewer {
            Viewer::Patient => vec![RequestAppointment, EditPendingAsPatient],
            Viewer::Doctor => vec![AuthorAppointments, ManageUsers],
            Viewer::Superuser => vec![AuthorAppointments, ManageUsers, GrantSuperuser],
        };
        Self { viewer, granted }
    }

    pub fn viewer(&self) -> Viewer {
        self.viewer
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.granted.contains(&capability)
    }

    /// `Ok` when granted, else the capability that was missing.
    pub fn require(&self, capability: Capability) -> Result<(), Capability> {
        if self.has(capability) {
            Ok(())
        } else {
            tracing::debug!(viewer = ?self.viewer, ?capability, "Capability denied");
            Err(capability)
        }
    }

    /// How an appointment card opens.
    pub fn presenter(&self) -> AppointmentPresenter {
        if self.has(Capability::AuthorAppointments) {
            AppointmentPresenter::DoctorPage
        } else {
            AppointmentPresenter::PatientDialog
        }
    }

    /// What the dashboard's "new appointment" action does.
    pub fn create_action(&self) -> CreateAction {
        if self.has(Capability::AuthorAppointments) {
            CreateAction::NavigateToCreatePage
        } else if self.has(Capability::RequestAppointment) {
            CreateAction::OpenRequestDialog
        } else {
            CreateAction::Unavailable
        }
    }

    /// Roles this viewer may give to a user it creates or edits.
    pub fn assignable_roles(&self) -> &'static [UserRole] {
        match self.viewer {
            Viewer::Superuser => &[UserRole::Patient, UserRole::Doctor],
            Viewer::Doctor => &[UserRole::Patient],
            Viewer::Patient => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentPresenter {
    PatientDialog,
    DoctorPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateAction {
    OpenRequestDialog,
    NavigateToCreatePage,
    Unavailable,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(role: UserRole, is_superuser: bool) -> UserPublic {
        UserPublic {
            id: Uuid::new_v4(),
            email: "u@clinic.ru".into(),
            is_active: true,
            is_superuser,
            role,
            gender: None,
            full_name: None,
            birth_date: None,
        }
    }

    #[test]
    fn superuser_wins_over_role() {
        assert_eq!(Viewer::of(&user(UserRole::Patient, true)), Viewer::Superuser);
        assert_eq!(Viewer::of(&user(UserRole::Doctor, false)), Viewer::Doctor);
        assert_eq!(Viewer::of(&user(UserRole::Patient, false)), Viewer::Patient);
    }

    #[test]
    fn patient_capabilities() {
        let caps = CapabilitySet::for_viewer(Viewer::Patient);
        assert!(caps.has(Capability::RequestAppointment));
        assert!(caps.has(Capability::EditPendingAsPatient));
        assert_eq!(caps.require(Capability::ManageUsers), Err(Capability::ManageUsers));
        assert_eq!(caps.presenter(), AppointmentPresenter::PatientDialog);
        assert_eq!(caps.create_action(), CreateAction::OpenRequestDialog);
        assert!(caps.assignable_roles().is_empty());
    }

    #[test]
    fn doctor_and_superuser_capabilities() {
        let doctor = CapabilitySet::for_viewer(Viewer::Doctor);
        assert_eq!(doctor.presenter(), AppointmentPresenter::DoctorPage);
        assert_eq!(doctor.create_action(), CreateAction::NavigateToCreatePage);
        assert!(doctor.require(Capability::ManageUsers).is_ok());
        assert!(!doctor.has(Capability::GrantSuperuser));
        assert_eq!(doctor.assignable_roles(), &[UserRole::Patient]);

        let admin = CapabilitySet::for_viewer(Viewer::Superuser);
        assert!(admin.has(Capability::GrantSuperuser));
        assert_eq!(admin.assignable_roles(), &[UserRole::Patient, UserRole::Doctor]);
    }
}
