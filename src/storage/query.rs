use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

#[derive(Clone, Debug, PartialEq)]
pub enum OwnerPredicate {
    OwnedBy(String),
    NotOwnedBy(String),
}

impl OwnerPredicate {
    pub fn matches(&self, owner: &str) -> bool {
        match self {
            Self::OwnedBy(principal) => owner == principal,
            Self::NotOwnedBy(principal) => owner != principal,
        }
    }
}

/// Search predicate for the children of a folder. Rendered through `Display` in the query
/// language of the storage service.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub title: Option<String>,
    pub owner: OwnerPredicate,
}

impl Query {
    pub fn owner(owner: OwnerPredicate) -> Self {
        Self { title: None, owner }
    }

    pub fn titled(title: &str, owner: OwnerPredicate) -> Self {
        Self {
            title: Some(title.into()),
            owner,
        }
    }

    pub fn matches(&self, name: &str, owner: &str) -> bool {
        self.title.as_deref().is_none_or(|title| title == name) && self.owner.matches(owner)
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if let Some(title) = &self.title {
            write!(f, "title = '{}' and ", escape(title))?;
        }
        match &self.owner {
            OwnerPredicate::OwnedBy(principal) => write!(f, "'{}' in owners", escape(principal)),
            OwnerPredicate::NotOwnedBy(principal) => {
                write!(f, "not '{}' in owners", escape(principal))
            }
        }
    }
}

fn escape(literal: &str) -> String {
    literal.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Selects the objects to migrate: those owned by a specific principal if one is configured,
/// otherwise everything not owned by the principal running the migration.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct OwnershipFilter {
    pub target_owner: Option<String>,
}

impl OwnershipFilter {
    pub fn predicate(&self, current_principal: &str) -> OwnerPredicate {
        match &self.target_owner {
            Some(target) => OwnerPredicate::OwnedBy(target.clone()),
            None => OwnerPredicate::NotOwnedBy(current_principal.into()),
        }
    }
}
