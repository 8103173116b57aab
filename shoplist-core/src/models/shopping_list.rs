use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::Queryable;
use crate::sync::{Entity, SyncError};

/// A named shopping list owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShoppingList {
    /// Store-assigned identifier
    pub id: String,
    /// Owner of the list
    pub user_id: String,
    /// Display title (trimmed, never empty)
    pub title: String,
}

impl ShoppingList {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            title: title.into(),
        }
    }
}

impl fmt::Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Lists owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserScope(pub String);

impl UserScope {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self(user_id.into())
    }

    pub fn user_id(&self) -> &str {
        &self.0
    }
}

impl Entity for ShoppingList {
    type Scope = UserScope;

    fn id(&self) -> &str {
        &self.id
    }

    fn same_content(&self, other: &Self) -> bool {
        self.title == other.title
    }
}

impl Queryable for ShoppingList {
    fn in_scope(&self, scope: &UserScope) -> bool {
        self.user_id == scope.0
    }

    fn listen_cmp(&self, other: &Self) -> Ordering {
        self.title
            .cmp(&other.title)
            .then_with(|| self.id.cmp(&other.id))
    }

    fn search_cmp(&self, other: &Self) -> Ordering {
        self.listen_cmp(other)
    }

    fn search_key(&self) -> &str {
        &self.title
    }
}

/// Trims a list title, rejecting one that ends up empty.
pub fn clean_title(title: &str) -> Result<String, SyncError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(SyncError::Validation(
            "List title must not be empty".to_string(),
        ));
    }
    Ok(title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_title_trims() {
        assert_eq!(clean_title("  Groceries ").unwrap(), "Groceries");
    }

    #[test]
    fn test_clean_title_rejects_blank() {
        let err = clean_title("   ").unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[test]
    fn test_only_title_is_fingerprinted() {
        let a = ShoppingList::new("1", "alice", "Groceries");
        let mut b = a.clone();
        b.user_id = "bob".to_string();
        assert!(a.same_content(&b));

        b.title = "Hardware".to_string();
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_listen_order_is_title_then_id() {
        let mut lists = vec![
            ShoppingList::new("b", "u", "Pharmacy"),
            ShoppingList::new("c", "u", "Groceries"),
            ShoppingList::new("a", "u", "Groceries"),
        ];
        lists.sort_by(|x, y| x.listen_cmp(y));
        let ids: Vec<&str> = lists.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_scope_is_owner() {
        let list = ShoppingList::new("1", "alice", "Groceries");
        assert!(list.in_scope(&UserScope::new("alice")));
        assert!(!list.in_scope(&UserScope::new("bob")));
    }

    #[test]
    fn test_serializes_as_plain_fields() {
        let list = ShoppingList::new("1", "alice", "Groceries");
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["title"], "Groceries");
        assert_eq!(json["user_id"], "alice");
    }
}
