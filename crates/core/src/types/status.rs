//! Status and page enums.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown [`OrderStatus`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid order status: {0}")]
pub struct UnknownStatus(pub String);

/// Error returned when parsing an unknown [`Page`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid page: {0}")]
pub struct UnknownPage(pub String);

/// Order workflow status.
///
/// Orders start as `Pending` and move to `Completed` or `Delivered`, or are
/// diverted to `Notification` when they need follow-up. Stored in the record
/// store under exactly these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Delivered,
    Notification,
}

impl OrderStatus {
    /// All statuses in tab order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Completed,
        Self::Delivered,
        Self::Notification,
    ];

    /// Stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
            Self::Delivered => "Delivered",
            Self::Notification => "Notification",
        }
    }

    /// Lowercase slug used in URLs (`?tab=pending`).
    #[must_use]
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Delivered => "delivered",
            Self::Notification => "notification",
        }
    }

    /// Parse a URL slug.
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.slug() == slug)
    }

    /// The status the Pending/Completed toggle moves to.
    ///
    /// Completed goes back to Pending; everything else becomes Completed.
    #[must_use]
    pub const fn toggled(&self) -> Self {
        match self {
            Self::Completed => Self::Pending,
            Self::Pending | Self::Delivered | Self::Notification => Self::Completed,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownStatus(s.to_owned()))
    }
}

/// A page of the dashboard, used as the unit of permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Page {
    Home,
    Orders,
    Search,
    Dashboard,
    Settings,
}

impl Page {
    /// All pages in menu order.
    pub const ALL: [Self; 5] = [
        Self::Home,
        Self::Orders,
        Self::Search,
        Self::Dashboard,
        Self::Settings,
    ];

    /// Pages granted to a new user unless chosen otherwise.
    pub const DEFAULT_GRANTS: [Self; 4] = [Self::Home, Self::Orders, Self::Search, Self::Dashboard];

    /// Name as stored in the permission map.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Orders => "Orders",
            Self::Search => "Search",
            Self::Dashboard => "Dashboard",
            Self::Settings => "Settings",
        }
    }

    /// Route path of the page.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Home => "/home",
            Self::Orders => "/orders",
            Self::Search => "/search",
            Self::Dashboard => "/dashboard",
            Self::Settings => "/settings",
        }
    }
}

impl std::fmt::Display for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Page {
    type Err = UnknownPage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|page| page.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownPage(s.to_owned()))
    }
}
