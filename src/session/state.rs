//! Per-visit session state.

use crate::fs::{FileEntry, StorageInfo};

/// Capacity shown before the server reports one.
pub const DEFAULT_STORAGE_LIMIT: &str = "500MB";
/// Usage shown before the server reports one.
pub const DEFAULT_STORAGE_USED: &str = "0MB";

/// Where the visitor is in the register / confirm / login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    PendingConfirmation,
    Authenticated,
}

/// Identity and cached metadata of the logged-in volume.
///
/// Everything except `identity` is only meaningful while `identity` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Volume name, `None` when logged out
    pub identity: Option<String>,
    /// Display-formatted capacity, e.g. "500MB"
    pub storage_limit: String,
    /// Display-formatted usage, e.g. "12MB"
    pub storage_used: String,
    /// Last storage snapshot received
    pub storage: Option<StorageInfo>,
    /// Validated file listing
    pub files: Vec<FileEntry>,
    /// Contact address of the volume
    pub email: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            identity: None,
            storage_limit: DEFAULT_STORAGE_LIMIT.to_string(),
            storage_used: DEFAULT_STORAGE_USED.to_string(),
            storage: None,
            files: Vec::new(),
            email: None,
        }
    }
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Back to the logged-out state, all fields at once.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Start a fresh visit for a volume returned by login.
    pub(crate) fn begin(
        &mut self,
        identity: String,
        storage_limit: Option<String>,
        email: Option<String>,
    ) {
        self.reset();
        self.identity = Some(identity);
        if let Some(limit) = storage_limit.filter(|l| !l.trim().is_empty()) {
            self.storage_limit = limit;
        }
        self.email = email;
    }

    pub(crate) fn apply_storage(&mut self, info: StorageInfo) {
        self.storage_used = info.used_display();
        self.storage = Some(info);
    }

    pub fn file_count_label(&self) -> String {
        match self.files.len() {
            1 => "1 file".to_string(),
            n => format!("{} files", n),
        }
    }
}
