//! Domain records and the orderings the store applies to them.

mod item;
mod shopping_list;

use std::cmp::Ordering;

use crate::sync::Entity;

pub use item::{Item, ItemChanges, ListScope, NewItem, DEFAULT_CATEGORY};
pub use shopping_list::{clean_title, ShoppingList, UserScope};

/// Upper bound appended to a search prefix to form its range.
pub const PREFIX_END: char = '\u{f8ff}';

/// Store-facing behaviour of an entity: which feed it belongs to and how
/// feeds of it are ordered and searched.
pub trait Queryable: Entity {
    /// Whether this record is a member of `scope`.
    fn in_scope(&self, scope: &Self::Scope) -> bool;

    /// Order of realtime snapshots.
    fn listen_cmp(&self, other: &Self) -> Ordering;

    /// Order of one-shot search results.
    fn search_cmp(&self, other: &Self) -> Ordering;

    /// Field a search prefix is matched against.
    fn search_key(&self) -> &str;
}

/// True when `key` falls within `[prefix, prefix + U+F8FF]`.
///
/// Compared as raw strings, the way a document store compares them, so
/// this is slightly wider than `starts_with`.
pub fn matches_prefix(key: &str, prefix: &str) -> bool {
    if key < prefix {
        return false;
    }
    let mut upper = String::with_capacity(prefix.len() + PREFIX_END.len_utf8());
    upper.push_str(prefix);
    upper.push(PREFIX_END);
    key <= upper.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_prefix() {
        assert!(matches_prefix("Groceries", "Gro"));
        assert!(matches_prefix("Gro", "Gro"));
        assert!(!matches_prefix("Gr", "Gro"));
        assert!(!matches_prefix("Hardware", "Gro"));
        // case-sensitive like the store
        assert!(!matches_prefix("groceries", "Gro"));
    }

    #[test]
    fn test_empty_prefix_matches_everything_below_bound() {
        assert!(matches_prefix("", ""));
        assert!(matches_prefix("anything", ""));
    }
}
