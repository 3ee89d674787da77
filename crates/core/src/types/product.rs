//! Product kinds sold through the intake form.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown [`ProductKind`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid product kind: {0}")]
pub struct UnknownProductKind(pub String);

/// Kind of product on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProductKind {
    #[default]
    #[serde(rename = "smart watch")]
    SmartWatch,
    #[serde(rename = "airtag")]
    AirTag,
}

impl ProductKind {
    /// All kinds in form order.
    pub const ALL: [Self; 2] = [Self::SmartWatch, Self::AirTag];

    /// Stored and displayed label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SmartWatch => "smart watch",
            Self::AirTag => "airtag",
        }
    }
}

impl std::fmt::Display for ProductKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ProductKind {
    type Err = UnknownProductKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownProductKind(s.to_owned()))
    }
}
