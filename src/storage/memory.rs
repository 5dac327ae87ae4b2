//! In-memory storage tree. Backs snapshot-based runs and serves as the test double for the
//! migration passes.

use super::{
    Entry, NodeKind, PermissionRequest, Query, Role, Storage, StorageError, StorageResult,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    pub owner: String,
    pub parents: Vec<String>,
    #[serde(default)]
    pub viewers: Vec<String>,
    #[serde(default)]
    pub editors: Vec<String>,
}

/// Serializable state of a [`MemoryStorage`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Tree {
    pub principal: String,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub next_id: u64,
}

pub struct MemoryStorage {
    tree: Tree,
    index: HashMap<String, usize>,
    permission_requests: Vec<(String, PermissionRequest)>,
}

impl MemoryStorage {
    pub fn new(principal: &str) -> Self {
        Self::from_tree(Tree {
            principal: principal.into(),
            nodes: vec![],
            next_id: 0,
        })
    }

    pub fn from_tree(tree: Tree) -> Self {
        let index = tree
            .nodes
            .iter()
            .enumerate()
            .map(|(position, node)| (node.id.clone(), position))
            .collect();
        Self {
            tree,
            index,
            permission_requests: vec![],
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.tree.nodes.iter()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|position| &self.tree.nodes[*position])
    }

    /// Every grant request received so far, together with its target.
    pub fn permission_requests(&self) -> &[(String, PermissionRequest)] {
        &self.permission_requests
    }

    /// Adds a folder owned by `owner`. A folder without parent is a top-level folder.
    pub fn add_folder(&mut self, parent: Option<&str>, name: &str, owner: &str) -> String {
        self.insert(NodeKind::Folder, parent, name, owner)
    }

    pub fn add_item(&mut self, parent: &str, name: &str, owner: &str) -> String {
        self.insert(NodeKind::Item, Some(parent), name, owner)
    }

    /// Grants `role` directly, bypassing the grant API bookkeeping.
    pub fn share(&mut self, id: &str, role: Role, principal: &str) {
        if let Ok(node) = self.node_mut(id) {
            apply_grant(node, role, principal);
        }
    }

    fn insert(&mut self, kind: NodeKind, parent: Option<&str>, name: &str, owner: &str) -> String {
        let id = self.fresh_id();
        self.index.insert(id.clone(), self.tree.nodes.len());
        self.tree.nodes.push(Node {
            id: id.clone(),
            kind,
            name: name.into(),
            owner: owner.into(),
            parents: parent.map(|parent| vec![parent.to_string()]).unwrap_or_default(),
            viewers: vec![],
            editors: vec![],
        });
        id
    }

    fn fresh_id(&mut self) -> String {
        loop {
            self.tree.next_id += 1;
            let id = format!("n{}", self.tree.next_id);
            if !self.index.contains_key(&id) {
                return id;
            }
        }
    }

    fn node_of_kind(&self, id: &str, kind: NodeKind) -> StorageResult<&Node> {
        match self.node(id) {
            Some(node) if node.kind == kind => Ok(node),
            _ => Err(StorageError::NotFound(format!("{kind:?} {id}"))),
        }
    }

    fn node_mut(&mut self, id: &str) -> StorageResult<&mut Node> {
        match self.index.get(id) {
            Some(position) => Ok(&mut self.tree.nodes[*position]),
            None => Err(StorageError::NotFound(id.into())),
        }
    }

    fn children(&self, folder_id: &str, kind: NodeKind) -> StorageResult<Vec<Entry>> {
        self.node_of_kind(folder_id, NodeKind::Folder)?;
        Ok(self
            .tree
            .nodes
            .iter()
            .filter(|node| node.kind == kind && node.parents.iter().any(|p| p == folder_id))
            .map(entry)
            .collect())
    }

    fn search(&self, folder_id: &str, kind: NodeKind, query: &Query) -> StorageResult<Vec<Entry>> {
        Ok(self
            .children(folder_id, kind)?
            .into_iter()
            .filter(|entry| query.matches(&entry.name, &entry.owner))
            .collect())
    }

    fn link(&mut self, folder_id: &str, child_id: &str, kind: NodeKind) -> StorageResult<()> {
        self.node_of_kind(folder_id, NodeKind::Folder)?;
        self.node_of_kind(child_id, kind)?;
        if folder_id == child_id {
            return Err(StorageError::Conflict(format!(
                "cannot place folder {folder_id} inside itself"
            )));
        }
        let node = self.node_mut(child_id)?;
        if !node.parents.iter().any(|parent| parent == folder_id) {
            node.parents.push(folder_id.into());
        }
        Ok(())
    }

    fn unlink(&mut self, folder_id: &str, child_id: &str, kind: NodeKind) -> StorageResult<()> {
        self.node_of_kind(folder_id, NodeKind::Folder)?;
        self.node_of_kind(child_id, kind)?;
        let node = self.node_mut(child_id)?;
        let parent_count = node.parents.len();
        node.parents.retain(|parent| parent != folder_id);
        if node.parents.len() == parent_count {
            return Err(StorageError::Conflict(format!(
                "{child_id} is not inside folder {folder_id}"
            )));
        }
        Ok(())
    }
}

fn entry(node: &Node) -> Entry {
    Entry {
        id: node.id.clone(),
        name: node.name.clone(),
        kind: node.kind,
        owner: node.owner.clone(),
        viewers: node.viewers.clone(),
        editors: node.editors.clone(),
        url: match node.kind {
            NodeKind::Item => format!("memory://items/{}", node.id),
            NodeKind::Folder => format!("memory://folders/{}", node.id),
        },
    }
}

// Writer access dominates reader access; the owner never appears in either list.
fn apply_grant(node: &mut Node, role: Role, principal: &str) {
    if node.owner == principal || node.editors.iter().any(|editor| editor == principal) {
        return;
    }
    match role {
        Role::Writer => {
            node.viewers.retain(|viewer| viewer != principal);
            node.editors.push(principal.into());
        }
        Role::Reader => {
            if !node.viewers.iter().any(|viewer| viewer == principal) {
                node.viewers.push(principal.into());
            }
        }
    }
}

impl Storage for MemoryStorage {
    fn current_principal(&self) -> &str {
        &self.tree.principal
    }

    fn folder(&self, id: &str) -> StorageResult<Entry> {
        self.node_of_kind(id, NodeKind::Folder).map(entry)
    }

    fn item(&self, id: &str) -> StorageResult<Entry> {
        self.node_of_kind(id, NodeKind::Item).map(entry)
    }

    fn search_items(&self, folder_id: &str, query: &Query) -> StorageResult<Vec<Entry>> {
        self.search(folder_id, NodeKind::Item, query)
    }

    fn search_folders(&self, folder_id: &str, query: &Query) -> StorageResult<Vec<Entry>> {
        self.search(folder_id, NodeKind::Folder, query)
    }

    fn child_items(&self, folder_id: &str) -> StorageResult<Vec<Entry>> {
        self.children(folder_id, NodeKind::Item)
    }

    fn child_folders(&self, folder_id: &str) -> StorageResult<Vec<Entry>> {
        self.children(folder_id, NodeKind::Folder)
    }

    fn create_folder(&mut self, parent_id: &str, name: &str) -> StorageResult<Entry> {
        self.node_of_kind(parent_id, NodeKind::Folder)?;
        let owner = self.tree.principal.clone();
        let id = self.add_folder(Some(parent_id), name, &owner);
        self.folder(&id)
    }

    fn copy_item(&mut self, item_id: &str, name: &str) -> StorageResult<Entry> {
        let parents = self.node_of_kind(item_id, NodeKind::Item)?.parents.clone();
        let id = self.fresh_id();
        self.index.insert(id.clone(), self.tree.nodes.len());
        self.tree.nodes.push(Node {
            id: id.clone(),
            kind: NodeKind::Item,
            name: name.into(),
            owner: self.tree.principal.clone(),
            parents,
            viewers: vec![],
            editors: vec![],
        });
        self.item(&id)
    }

    fn rename(&mut self, id: &str, name: &str) -> StorageResult<()> {
        self.node_mut(id)?.name = name.into();
        Ok(())
    }

    fn add_item_to_folder(&mut self, folder_id: &str, item_id: &str) -> StorageResult<()> {
        self.link(folder_id, item_id, NodeKind::Item)
    }

    fn remove_item_from_folder(&mut self, folder_id: &str, item_id: &str) -> StorageResult<()> {
        self.unlink(folder_id, item_id, NodeKind::Item)
    }

    fn add_folder_to_folder(&mut self, folder_id: &str, child_id: &str) -> StorageResult<()> {
        self.link(folder_id, child_id, NodeKind::Folder)
    }

    fn remove_folder_from_folder(
        &mut self,
        folder_id: &str,
        child_id: &str,
    ) -> StorageResult<()> {
        self.unlink(folder_id, child_id, NodeKind::Folder)
    }

    fn insert_permission(
        &mut self,
        target_id: &str,
        request: &PermissionRequest,
    ) -> StorageResult<()> {
        apply_grant(self.node_mut(target_id)?, request.role, &request.principal);
        self.permission_requests
            .push((target_id.into(), request.clone()));
        Ok(())
    }
}
