use crate::storage::Entry;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
}

impl From<&Entry> for FolderRef {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
        }
    }
}

/// Pre-order snapshot of the folders to inspect. Each slot holds the live handle of the folder
/// discovered at that position; replacing a folder redirects its slot, keyed by the id the
/// folder had at discovery time.
#[derive(Debug, Default)]
pub struct WorkList {
    slots: Vec<FolderRef>,
    positions: HashMap<String, usize>,
}

impl WorkList {
    pub fn push(&mut self, folder: FolderRef) {
        self.positions.insert(folder.id.clone(), self.slots.len());
        self.slots.push(folder);
    }

    /// Whether the folder originally discovered as `id` has a slot.
    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&FolderRef> {
        self.slots.get(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FolderRef> {
        self.slots.iter()
    }

    /// Points the slot of the folder originally discovered as `original_id` at `replacement`.
    /// Returns false if that folder was never discovered.
    pub fn replace(&mut self, original_id: &str, replacement: FolderRef) -> bool {
        match self.positions.get(original_id) {
            Some(slot) => {
                self.slots[*slot] = replacement;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(id: &str) -> FolderRef {
        FolderRef {
            id: id.into(),
            name: format!("folder {id}"),
        }
    }

    fn ids(work_list: &WorkList) -> Vec<&str> {
        work_list.iter().map(|folder| folder.id.as_str()).collect()
    }

    #[test]
    fn replace_keeps_position() {
        let mut work_list = WorkList::default();
        for id in ["root", "a", "b"] {
            work_list.push(folder(id));
        }
        assert!(work_list.replace("a", folder("a2")));
        assert_eq!(ids(&work_list), vec!["root", "a2", "b"]);
    }

    #[test]
    fn replace_is_keyed_by_original_id() {
        let mut work_list = WorkList::default();
        work_list.push(folder("root"));
        work_list.push(folder("a"));
        assert!(work_list.replace("a", folder("a2")));
        assert!(!work_list.replace("a2", folder("a3")));
        assert!(work_list.replace("a", folder("a3")));
        assert_eq!(ids(&work_list), vec!["root", "a3"]);
    }

    #[test]
    fn contains_original_ids_only() {
        let mut work_list = WorkList::default();
        work_list.push(folder("root"));
        work_list.push(folder("a"));
        work_list.replace("a", folder("a2"));
        assert!(work_list.contains("a"));
        assert!(!work_list.contains("a2"));
        assert!(!work_list.contains("b"));
    }

    #[test]
    fn replace_unknown_folder() {
        let mut work_list = WorkList::default();
        work_list.push(folder("root"));
        assert!(!work_list.replace("elsewhere", folder("x")));
        assert_eq!(ids(&work_list), vec!["root"]);
        assert_eq!(work_list.len(), 1);
    }
}
