//! Registry user records.

use std::collections::BTreeMap;

use order_desk_core::Page;
use serde::{Deserialize, Serialize};

/// Name of the account that always exists and cannot be deleted.
pub const ADMIN_USERNAME: &str = "admin";

/// Access code given to a synthesized admin account.
pub const DEFAULT_ADMIN_CODE: &str = "admin123";

/// One user as stored in the registry file.
///
/// The permission map is keyed by page name. Names that are not a known
/// [`Page`] are kept as they are so the file round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Plaintext access code.
    pub code: String,
    /// Manager flag, set when the user is created.
    #[serde(default)]
    pub is_manager: bool,
    /// Device labels recorded at login.
    #[serde(default)]
    pub devices: Vec<String>,
    /// Page name to granted flag.
    #[serde(default)]
    pub permissions: BTreeMap<String, bool>,
}

impl UserRecord {
    /// A new user granted exactly `pages`.
    #[must_use]
    pub fn new(code: impl Into<String>, is_manager: bool, pages: &[Page]) -> Self {
        Self {
            code: code.into(),
            is_manager,
            devices: Vec::new(),
            permissions: grants(pages),
        }
    }

    /// The account synthesized when the registry has no admin.
    #[must_use]
    pub fn default_admin() -> Self {
        Self::new(DEFAULT_ADMIN_CODE, true, &Page::ALL)
    }

    /// Whether `page` is granted. Missing entries are denied.
    #[must_use]
    pub fn can_access(&self, page: Page) -> bool {
        self.permissions.get(page.as_str()).copied().unwrap_or(false)
    }

    /// Granted pages in menu order.
    #[must_use]
    pub fn permitted_pages(&self) -> Vec<Page> {
        Page::ALL
            .into_iter()
            .filter(|page| self.can_access(*page))
            .collect()
    }
}

/// Permission map granting exactly `pages`.
#[must_use]
pub fn grants(pages: &[Page]) -> BTreeMap<String, bool> {
    pages
        .iter()
        .map(|page| (page.as_str().to_string(), true))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_permissions() {
        let user: UserRecord =
            serde_json::from_str(r#"{"code":"1234","permissions":{"Home":true}}"#).unwrap();
        assert!(user.can_access(Page::Home));
        assert!(!user.can_access(Page::Orders));
        assert!(!user.is_manager);
        assert!(user.devices.is_empty());
    }

    #[test]
    fn test_false_entry_denies() {
        let user: UserRecord = serde_json::from_str(
            r#"{"code":"1","permissions":{"Home":true,"Search":false,"Reports":true}}"#,
        )
        .unwrap();
        assert_eq!(user.permitted_pages(), vec![Page::Home]);
    }

    #[test]
    fn test_unknown_pages_round_trip() {
        let json = r#"{"code":"1","is_manager":false,"devices":[],"permissions":{"Home":true,"Reports":true}}"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        let back = serde_json::to_string(&user).unwrap();
        assert!(back.contains("\"Reports\":true"));
    }

    #[test]
    fn test_default_admin_has_everything() {
        let admin = UserRecord::default_admin();
        assert_eq!(admin.code, DEFAULT_ADMIN_CODE);
        assert!(admin.is_manager);
        assert_eq!(admin.permitted_pages(), Page::ALL.to_vec());
    }
}
