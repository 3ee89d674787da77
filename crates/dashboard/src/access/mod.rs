//! Access control over the local user registry file.
//!
//! The registry is a single JSON document mapping username to
//! [`UserRecord`]. It is read once at startup and rewritten whole after
//! every change. The `admin` account always exists.

mod user;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use order_desk_core::Page;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

pub use user::{ADMIN_USERNAME, DEFAULT_ADMIN_CODE, UserRecord, grants};

/// Label recorded for logins that send no `User-Agent`.
pub const UNKNOWN_DEVICE: &str = "unknown device";

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The username is already taken.
    #[error("User '{0}' already exists")]
    UserExists(String),

    /// No such user.
    #[error("User '{0}' does not exist")]
    UnknownUser(String),

    /// The user cannot be deleted.
    #[error("User '{0}' cannot be deleted")]
    ProtectedUser(String),

    /// The current access code did not match.
    #[error("Current access code is incorrect")]
    WrongCode,

    /// New code and confirmation differ.
    #[error("New access codes do not match")]
    ConfirmMismatch,

    /// A required field was blank.
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    /// Reading or writing the registry file failed.
    #[error("Registry file error: {0}")]
    Io(#[from] std::io::Error),

    /// The registry file is not valid JSON.
    #[error("Registry file {path} is malformed: {source}")]
    Corrupt {
        /// File path.
        path: PathBuf,
        /// Parse error.
        source: serde_json::Error,
    },
}

/// Result of a successful login check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authenticated {
    /// Whether the user is a manager.
    pub is_manager: bool,
}

/// Shared handle to the user registry.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    path: PathBuf,
    users: RwLock<BTreeMap<String, UserRecord>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Open the registry at `path`.
    ///
    /// A missing or blank file is an empty registry. If there is no `admin`
    /// account one is created and the file is written straight away.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::Corrupt` if the file is not valid JSON, or
    /// `AccessError::Io` if it cannot be read or written.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AccessError> {
        let path = path.as_ref().to_path_buf();

        let users = match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| AccessError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Registry file not found, starting empty");
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        let registry = Self {
            inner: Arc::new(RegistryInner {
                path,
                users: RwLock::new(users),
            }),
        };

        {
            let mut users = registry.inner.users.write().await;
            if !users.contains_key(ADMIN_USERNAME) {
                warn!("No admin account in registry, creating the default one");
                users.insert(ADMIN_USERNAME.to_string(), UserRecord::default_admin());
                registry.persist(&users).await?;
            }
        }

        info!(users = registry.inner.users.read().await.len(), "Registry loaded");
        Ok(registry)
    }

    /// Path of the registry file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Whether the registry file can currently be read.
    pub async fn is_readable(&self) -> bool {
        tokio::fs::metadata(&self.inner.path).await.is_ok()
    }

    /// Write the whole document via a temp file in the same directory.
    async fn persist(&self, users: &BTreeMap<String, UserRecord>) -> Result<(), AccessError> {
        let json = serde_json::to_vec_pretty(users).map_err(std::io::Error::other)?;
        let path = self.inner.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &json))
            .await
            .map_err(std::io::Error::other)??;
        Ok(())
    }

    /// Check a username and access code.
    ///
    /// Returns `None` for an unknown user or a wrong code.
    pub async fn authenticate(&self, username: &str, code: &str) -> Option<Authenticated> {
        let users = self.inner.users.read().await;
        users
            .get(username)
            .filter(|user| user.code == code)
            .map(|user| Authenticated {
                is_manager: user.is_manager,
            })
    }

    /// Whether `username` may open `page`. Unknown users may not.
    pub async fn permission(&self, username: &str, page: Page) -> bool {
        self.inner
            .users
            .read()
            .await
            .get(username)
            .is_some_and(|user| user.can_access(page))
    }

    /// Pages `username` may open, in menu order.
    pub async fn permitted_pages(&self, username: &str) -> Vec<Page> {
        self.inner
            .users
            .read()
            .await
            .get(username)
            .map(UserRecord::permitted_pages)
            .unwrap_or_default()
    }

    /// A copy of one user.
    pub async fn user(&self, username: &str) -> Option<UserRecord> {
        self.inner.users.read().await.get(username).cloned()
    }

    /// A copy of every user, ordered by name.
    pub async fn users(&self) -> BTreeMap<String, UserRecord> {
        self.inner.users.read().await.clone()
    }

    /// Create a user granted exactly `pages`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyField` for a blank username or code, `UserExists` if the
    /// name is taken, or `Io` if the file cannot be written.
    #[instrument(skip(self, code, pages))]
    pub async fn add_user(
        &self,
        username: &str,
        code: &str,
        is_manager: bool,
        pages: &[Page],
    ) -> Result<(), AccessError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AccessError::EmptyField("Username"));
        }
        if code.trim().is_empty() {
            return Err(AccessError::EmptyField("Access code"));
        }

        let mut users = self.inner.users.write().await;
        if users.contains_key(username) {
            return Err(AccessError::UserExists(username.to_string()));
        }
        users.insert(
            username.to_string(),
            UserRecord::new(code.trim(), is_manager, pages),
        );
        self.persist(&users).await?;

        info!(username, is_manager, "User added");
        Ok(())
    }

    /// Replace a user's permissions with exactly `pages`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownUser` or `Io`.
    #[instrument(skip(self))]
    pub async fn update_permissions(&self, username: &str, pages: &[Page]) -> Result<(), AccessError> {
        let mut users = self.inner.users.write().await;
        let user = users
            .get_mut(username)
            .ok_or_else(|| AccessError::UnknownUser(username.to_string()))?;
        user.permissions = grants(pages);
        self.persist(&users).await?;

        info!(username, "Permissions updated");
        Ok(())
    }

    /// Change a user's access code.
    ///
    /// # Errors
    ///
    /// Returns `WrongCode` if `current` does not match, `ConfirmMismatch` if
    /// `new` and `confirm` differ, `EmptyField` for a blank new code,
    /// `UnknownUser`, or `Io`.
    #[instrument(skip(self, current, new, confirm))]
    pub async fn change_password(
        &self,
        username: &str,
        current: &str,
        new: &str,
        confirm: &str,
    ) -> Result<(), AccessError> {
        let mut users = self.inner.users.write().await;
        let user = users
            .get_mut(username)
            .ok_or_else(|| AccessError::UnknownUser(username.to_string()))?;

        if user.code != current {
            return Err(AccessError::WrongCode);
        }
        if new != confirm {
            return Err(AccessError::ConfirmMismatch);
        }
        if new.trim().is_empty() {
            return Err(AccessError::EmptyField("New access code"));
        }

        user.code = new.to_string();
        self.persist(&users).await?;

        info!(username, "Access code changed");
        Ok(())
    }

    /// Set a user's access code without knowing the current one.
    ///
    /// Operator reset for a forgotten code.
    ///
    /// # Errors
    ///
    /// Returns `EmptyField` for a blank code, `UnknownUser`, or `Io`.
    #[instrument(skip(self, code))]
    pub async fn reset_code(&self, username: &str, code: &str) -> Result<(), AccessError> {
        if code.trim().is_empty() {
            return Err(AccessError::EmptyField("Access code"));
        }

        let mut users = self.inner.users.write().await;
        let user = users
            .get_mut(username)
            .ok_or_else(|| AccessError::UnknownUser(username.to_string()))?;
        user.code = code.trim().to_string();
        self.persist(&users).await?;

        info!(username, "Access code reset");
        Ok(())
    }

    /// Remove a user.
    ///
    /// # Errors
    ///
    /// Returns `ProtectedUser` for the admin account, `UnknownUser`, or `Io`.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, username: &str) -> Result<(), AccessError> {
        if username == ADMIN_USERNAME {
            return Err(AccessError::ProtectedUser(username.to_string()));
        }

        let mut users = self.inner.users.write().await;
        if users.remove(username).is_none() {
            return Err(AccessError::UnknownUser(username.to_string()));
        }
        self.persist(&users).await?;

        info!(username, "User deleted");
        Ok(())
    }

    /// Remember the device a user logged in from.
    ///
    /// # Errors
    ///
    /// Returns `UnknownUser` or `Io`.
    pub async fn record_device(&self, username: &str, label: &str) -> Result<(), AccessError> {
        let label = match label.trim() {
            "" => UNKNOWN_DEVICE,
            trimmed => trimmed,
        };

        let mut users = self.inner.users.write().await;
        let user = users
            .get_mut(username)
            .ok_or_else(|| AccessError::UnknownUser(username.to_string()))?;
        if user.devices.iter().any(|d| d == label) {
            return Ok(());
        }
        user.devices.push(label.to_string());
        self.persist(&users).await
    }

    /// Forget every device recorded for a user.
    ///
    /// # Errors
    ///
    /// Returns `UnknownUser` or `Io`.
    #[instrument(skip(self))]
    pub async fn logout_devices(&self, username: &str) -> Result<(), AccessError> {
        let mut users = self.inner.users.write().await;
        let user = users
            .get_mut(username)
            .ok_or_else(|| AccessError::UnknownUser(username.to_string()))?;
        user.devices.clear();
        self.persist(&users).await?;

        info!(username, "Devices cleared");
        Ok(())
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.write_all(b"\n")?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
