use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form doubles as the serde wire name.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(AppointmentStatus {
    Pending => "pending",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(UserRole {
    Patient => "patient",
    Doctor => "doctor",
});

str_enum!(UserGender {
    Male => "male",
    Female => "female",
});

str_enum!(SortOrder {
    Asc => "asc",
    Desc => "desc",
});

impl Default for AppointmentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl AppointmentStatus {
    /// Badge label shown on appointment cards.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "В ожидании",
            Self::Completed => "Принят",
            Self::Cancelled => "Отклонен",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Patient
    }
}

impl UserRole {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Patient => "Пациент",
            Self::Doctor => "Врач",
        }
    }
}

impl Default for UserGender {
    fn default() -> Self {
        Self::Male
    }
}

impl UserGender {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Male => "Мужчина",
            Self::Female => "Женщина",
        }
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::Desc
    }
}
