use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::Queryable;
use crate::sync::{Entity, SyncError};

/// Category used when none is given.
pub const DEFAULT_CATEGORY: &str = "Other";

/// One entry on a shopping list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    /// Store-assigned identifier
    pub id: String,
    /// List this item belongs to
    pub list_id: String,
    pub name: String,
    /// Always at least 1
    pub quantity: u32,
    /// Unit of the quantity (e.g., "kg", "packs")
    pub unit: String,
    pub category: String,
    /// Whether the item has been bought
    #[serde(default)]
    pub purchased: bool,
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let check = if self.purchased { "[x]" } else { "[ ]" };
        write!(
            f,
            "{} {:<20} {} {} ({})",
            check, self.name, self.quantity, self.unit, self.category
        )
    }
}

/// Items of one list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListScope(pub String);

impl ListScope {
    pub fn new(list_id: impl Into<String>) -> Self {
        Self(list_id.into())
    }

    pub fn list_id(&self) -> &str {
        &self.0
    }
}

impl Entity for Item {
    type Scope = ListScope;

    fn id(&self) -> &str {
        &self.id
    }

    fn same_content(&self, other: &Self) -> bool {
        self.name == other.name
            && self.quantity == other.quantity
            && self.unit == other.unit
            && self.category == other.category
            && self.purchased == other.purchased
    }
}

impl Queryable for Item {
    fn in_scope(&self, scope: &ListScope) -> bool {
        self.list_id == scope.0
    }

    fn listen_cmp(&self, other: &Self) -> Ordering {
        self.category
            .cmp(&other.category)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.id.cmp(&other.id))
    }

    fn search_cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.id.cmp(&other.id))
    }

    fn search_key(&self) -> &str {
        &self.name
    }
}

/// Fields of an item about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub quantity: u32,
    pub unit: String,
    pub category: String,
}

impl NewItem {
    /// Create an item of quantity 1 in the default category.
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: 1,
            unit: unit.into(),
            category: DEFAULT_CATEGORY.to_string(),
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Trims text fields and checks every constraint.
    ///
    /// A blank category falls back to [`DEFAULT_CATEGORY`].
    pub fn normalized(&self) -> Result<NewItem, SyncError> {
        let name = required("Item name", &self.name)?;
        let unit = required("Unit", &self.unit)?;
        if self.quantity == 0 {
            return Err(SyncError::Validation(
                "Quantity must be greater than zero".to_string(),
            ));
        }
        let category = match self.category.trim() {
            "" => DEFAULT_CATEGORY.to_string(),
            c => c.to_string(),
        };

        Ok(NewItem {
            name,
            quantity: self.quantity,
            unit,
            category,
        })
    }

    /// Builds the stored record. Expects normalized fields.
    pub fn into_item(self, id: impl Into<String>, list_id: impl Into<String>) -> Item {
        Item {
            id: id.into(),
            list_id: list_id.into(),
            name: self.name,
            quantity: self.quantity,
            unit: self.unit,
            category: self.category,
            purchased: false,
        }
    }
}

/// Partial edit of an existing item. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub quantity: Option<u32>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub purchased: Option<bool>,
}

impl ItemChanges {
    pub fn is_empty(&self) -> bool {
        *self == ItemChanges::default()
    }

    /// Returns `item` with the changes applied and validated.
    pub fn apply(&self, item: &Item) -> Result<Item, SyncError> {
        let fields = NewItem {
            name: self.name.clone().unwrap_or_else(|| item.name.clone()),
            quantity: self.quantity.unwrap_or(item.quantity),
            unit: self.unit.clone().unwrap_or_else(|| item.unit.clone()),
            category: self
                .category
                .clone()
                .unwrap_or_else(|| item.category.clone()),
        }
        .normalized()?;

        let mut updated = fields.into_item(item.id.clone(), item.list_id.clone());
        updated.purchased = self.purchased.unwrap_or(item.purchased);
        Ok(updated)
    }
}

fn required(field: &str, value: &str) -> Result<String, SyncError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SyncError::Validation(format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn milk() -> Item {
        NewItem::new("Milk", "l")
            .with_quantity(2)
            .with_category("Dairy")
            .into_item("i1", "l1")
    }

    #[test]
    fn test_normalized_trims_fields() {
        let item = NewItem::new("  Milk ", " l ")
            .with_category("  ")
            .normalized()
            .unwrap();
        assert_eq!(item.name, "Milk");
        assert_eq!(item.unit, "l");
        assert_eq!(item.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_normalized_rejects_blank_name_and_unit() {
        assert!(NewItem::new(" ", "kg").normalized().is_err());
        assert!(NewItem::new("Rice", "").normalized().is_err());
    }

    #[test]
    fn test_normalized_rejects_zero_quantity() {
        let err = NewItem::new("Rice", "kg")
            .with_quantity(0)
            .normalized()
            .unwrap_err();
        assert_eq!(err.to_string(), "Quantity must be greater than zero");
    }

    #[test]
    fn test_fingerprint_covers_purchased() {
        let a = milk();
        let mut b = a.clone();
        assert!(a.same_content(&b));
        b.purchased = true;
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_listen_and_search_orders_differ() {
        let bread = NewItem::new("Bread", "loaf")
            .with_category("Bakery")
            .into_item("i2", "l1");
        let apples = NewItem::new("Apples", "kg")
            .with_category("Produce")
            .into_item("i3", "l1");

        assert_eq!(bread.listen_cmp(&apples), Ordering::Less);
        assert_eq!(bread.search_cmp(&apples), Ordering::Greater);
    }

    #[test]
    fn test_changes_apply_partially() {
        let changes = ItemChanges {
            quantity: Some(3),
            purchased: Some(true),
            ..Default::default()
        };
        let updated = changes.apply(&milk()).unwrap();
        assert_eq!(updated.name, "Milk");
        assert_eq!(updated.quantity, 3);
        assert!(updated.purchased);
        assert_eq!(updated.id, "i1");
    }

    #[test]
    fn test_changes_are_validated() {
        let changes = ItemChanges {
            name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(changes.apply(&milk()).is_err());
        assert!(ItemChanges::default().is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            milk().to_string(),
            format!("[ ] {:<20} 2 l (Dairy)", "Milk")
        );
    }
}
