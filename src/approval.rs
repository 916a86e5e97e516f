//! Who may see and use their image directory.
//!
//! The store only asks one question, [`ApprovalPolicy::is_approved`]. The
//! bundled [`ApprovedUsers`] registry answers it from an in-memory map that is
//! persisted as a flat JSON object (`{"email": true|false}`). Emails that are
//! queried but unknown are recorded as not approved so that an administrator
//! can see who asked.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ApprovalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decides whether an authenticated email may access the store.
pub trait ApprovalPolicy: Sync {
    fn is_approved(&self, email: &str) -> bool;
}

impl<F> ApprovalPolicy for F
where
    F: Fn(&str) -> bool + Sync,
{
    fn is_approved(&self, email: &str) -> bool {
        self(email)
    }
}

/// Thread-safe approval registry.
#[derive(Debug, Default)]
pub struct ApprovedUsers {
    users: RwLock<HashMap<String, bool>>,
}

impl ApprovedUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the registry from `path`, forcing `admin_email` to approved.
    ///
    /// A missing or unreadable file yields an admin-only registry. A file
    /// that exists but is not a JSON object of booleans is an error.
    pub fn load(path: &Path, admin_email: Option<&str>) -> Result<Self, ApprovalError> {
        let registry = Self::new();

        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "approved users unreadable, starting with admin only");
                if let Some(admin) = admin_email {
                    registry.approve(admin);
                }
                return Ok(registry);
            }
        };

        let stored: HashMap<String, bool> = serde_json::from_str(&content)?;
        {
            let mut users = registry.write();
            users.extend(stored);
            if let Some(admin) = admin_email {
                users.insert(admin.to_string(), true);
            }
        }
        info!(count = registry.len(), "loaded approved users");
        Ok(registry)
    }

    /// Write the registry to `path` as a sorted JSON object.
    ///
    /// The map is copied out first so the lock is not held across the write.
    pub fn save(&self, path: &Path) -> Result<(), ApprovalError> {
        let snapshot: BTreeMap<String, Value> = self
            .snapshot()
            .into_iter()
            .map(|(email, approved)| (email, Value::Bool(approved)))
            .collect();
        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn approve(&self, email: &str) {
        self.write().insert(email.to_string(), true);
    }

    pub fn disapprove(&self, email: &str) {
        self.write().insert(email.to_string(), false);
    }

    /// Copy of every known email and its status, sorted by email.
    pub fn snapshot(&self) -> BTreeMap<String, bool> {
        self.read()
            .iter()
            .map(|(email, approved)| (email.clone(), *approved))
            .collect()
    }

    /// Emails that have asked for access but are not approved.
    pub fn pending(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter(|(_, approved)| !approved)
            .map(|(email, _)| email)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, bool>> {
        self.users.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, bool>> {
        self.users.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ApprovalPolicy for ApprovedUsers {
    fn is_approved(&self, email: &str) -> bool {
        if let Some(approved) = self.read().get(email) {
            return *approved;
        }
        *self.write().entry(email.to_string()).or_insert(false)
    }
}
