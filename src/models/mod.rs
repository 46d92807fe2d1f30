//! Wire types exchanged with the appointment backend.

pub mod appointment;
pub mod auth;
pub mod enums;
pub mod inference;
pub mod user;

pub use appointment::*;
pub use auth::*;
pub use enums::*;
pub use inference::*;
pub use user::*;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid {field} value: {value:?}")]
    InvalidEnum { field: String, value: String },
}

/// One page of a list operation: `{data, count}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub count: u64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of pages needed to show `count` items, `page_size` at a time.
    pub fn page_count(&self, page_size: u64) -> u64 {
        if page_size == 0 {
            return 0;
        }
        self.count.div_ceil(page_size)
    }
}

/// Deserialize a present field (value or `null`) as `Some(..)`.
///
/// Paired with `#[serde(default)]` so an absent field stays `None`,
/// keeping "unset" distinct from "cleared".
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
