//! Interface to the hierarchical object store holding the tree being migrated.

pub mod memory;
pub mod query;

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

pub use query::{OwnerPredicate, OwnershipFilter, Query};

/// Errors reported by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The referenced item or folder does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request contradicts the current state of the tree.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backend failed to carry out the request.
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum NodeKind {
    Item,
    Folder,
}

/// Metadata of an item or folder as reported by the backend. Viewer and editor lists only
/// contain grants made directly on the entry, never inherited ones, and never the owner.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Entry {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub owner: String,
    pub viewers: Vec<String>,
    pub editors: Vec<String>,
    pub url: String,
}

impl Display for Entry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "`{}` ({})", self.name, self.id)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Role {
    Reader,
    Writer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reader => "reader",
            Self::Writer => "writer",
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PrincipalType {
    User,
}

/// A single permission grant request, as accepted by the backend's grant API.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PermissionRequest {
    pub role: Role,
    pub principal_type: PrincipalType,
    pub principal: String,
    pub send_notification_emails: bool,
}

pub trait Storage {
    /// The principal all mutations are carried out as.
    fn current_principal(&self) -> &str;

    fn folder(&self, id: &str) -> StorageResult<Entry>;

    fn item(&self, id: &str) -> StorageResult<Entry>;

    /// Items directly inside `folder_id` matching `query`, in enumeration order.
    fn search_items(&self, folder_id: &str, query: &Query) -> StorageResult<Vec<Entry>>;

    /// Folders directly inside `folder_id` matching `query`, in enumeration order.
    fn search_folders(&self, folder_id: &str, query: &Query) -> StorageResult<Vec<Entry>>;

    fn child_items(&self, folder_id: &str) -> StorageResult<Vec<Entry>>;

    fn child_folders(&self, folder_id: &str) -> StorageResult<Vec<Entry>>;

    /// Creates a folder owned by the current principal inside `parent_id`.
    fn create_folder(&mut self, parent_id: &str, name: &str) -> StorageResult<Entry>;

    /// Copies an item under the ownership of the current principal. The copy is placed next to
    /// the original and carries exactly `name`.
    fn copy_item(&mut self, item_id: &str, name: &str) -> StorageResult<Entry>;

    fn rename(&mut self, id: &str, name: &str) -> StorageResult<()>;

    fn add_item_to_folder(&mut self, folder_id: &str, item_id: &str) -> StorageResult<()>;

    fn remove_item_from_folder(&mut self, folder_id: &str, item_id: &str) -> StorageResult<()>;

    fn add_folder_to_folder(&mut self, folder_id: &str, child_id: &str) -> StorageResult<()>;

    fn remove_folder_from_folder(&mut self, folder_id: &str, child_id: &str)
    -> StorageResult<()>;

    fn insert_permission(
        &mut self,
        target_id: &str,
        request: &PermissionRequest,
    ) -> StorageResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_match_grant_api() {
        assert_eq!(Role::Reader.as_str(), "reader");
        assert_eq!(Role::Writer.as_str(), "writer");
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            StorageError::NotFound("Folder n4".into()).to_string(),
            "not found: Folder n4"
        );
        assert_eq!(
            StorageError::Conflict("n5 is not inside folder n1".into()).to_string(),
            "conflict: n5 is not inside folder n1"
        );
        assert_eq!(
            StorageError::Backend("quota exceeded".into()).to_string(),
            "storage backend error: quota exceeded"
        );
    }

    #[test]
    fn entry_display() {
        let entry = Entry {
            id: "n7".into(),
            name: "Budget 2024".into(),
            kind: NodeKind::Item,
            owner: "alice@x.com".into(),
            viewers: vec![],
            editors: vec![],
            url: "memory://items/n7".into(),
        };
        assert_eq!(entry.to_string(), "`Budget 2024` (n7)");
    }
}
