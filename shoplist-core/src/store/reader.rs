//! Readers that turn the shopping document back into records.
//!
//! Layout:
//! - `root["lists"][list_id]` holds `{user_id, title}`
//! - `root["items"][list_id][item_id]` holds `{name, quantity, unit, category, purchased}`
//!
//! Entries missing a required field are skipped.

use automerge::{AutoCommit, ObjId, ObjType, ReadDoc, Value, ROOT};

use super::StoreError;
use crate::models::{Item, ShoppingList, DEFAULT_CATEGORY};

pub(crate) const LISTS: &str = "lists";
pub(crate) const ITEMS: &str = "items";

/// Every list in the document, unordered.
pub fn read_lists(doc: &AutoCommit) -> Result<Vec<ShoppingList>, StoreError> {
    let mut lists = Vec::new();
    let Some(lists_id) = get_map(doc, &ROOT, LISTS)? else {
        return Ok(lists);
    };

    for key in doc.keys(&lists_id) {
        if let Some(list) = read_list_by_id(doc, &key)? {
            lists.push(list);
        }
    }
    Ok(lists)
}

pub fn read_list_by_id(doc: &AutoCommit, list_id: &str) -> Result<Option<ShoppingList>, StoreError> {
    let Some(lists_id) = get_map(doc, &ROOT, LISTS)? else {
        return Ok(None);
    };
    let Some(obj_id) = get_map(doc, &lists_id, list_id)? else {
        return Ok(None);
    };

    let (Some(user_id), Some(title)) = (
        get_string(doc, &obj_id, "user_id")?,
        get_string(doc, &obj_id, "title")?,
    ) else {
        return Ok(None);
    };

    Ok(Some(ShoppingList {
        id: list_id.to_string(),
        user_id,
        title,
    }))
}

/// Every item of one list, unordered.
pub fn read_items(doc: &AutoCommit, list_id: &str) -> Result<Vec<Item>, StoreError> {
    let mut items = Vec::new();
    let Some(list_items) = items_map(doc, list_id)? else {
        return Ok(items);
    };

    for key in doc.keys(&list_items) {
        if let Some(obj_id) = get_map(doc, &list_items, &key)? {
            if let Some(item) = read_item(doc, &obj_id, list_id, &key)? {
                items.push(item);
            }
        }
    }
    Ok(items)
}

pub fn read_item_by_id(
    doc: &AutoCommit,
    list_id: &str,
    item_id: &str,
) -> Result<Option<Item>, StoreError> {
    let Some(list_items) = items_map(doc, list_id)? else {
        return Ok(None);
    };
    match get_map(doc, &list_items, item_id)? {
        Some(obj_id) => read_item(doc, &obj_id, list_id, item_id),
        None => Ok(None),
    }
}

fn read_item(
    doc: &AutoCommit,
    obj_id: &ObjId,
    list_id: &str,
    item_id: &str,
) -> Result<Option<Item>, StoreError> {
    let name = match get_string(doc, obj_id, "name")? {
        Some(n) => n,
        None => return Ok(None),
    };

    let quantity = get_i64(doc, obj_id, "quantity")?
        .and_then(|q| u32::try_from(q).ok())
        .unwrap_or(1);
    let unit = get_string(doc, obj_id, "unit")?.unwrap_or_default();
    let category = get_string(doc, obj_id, "category")?
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let purchased = get_bool(doc, obj_id, "purchased")?.unwrap_or(false);

    Ok(Some(Item {
        id: item_id.to_string(),
        list_id: list_id.to_string(),
        name,
        quantity,
        unit,
        category,
        purchased,
    }))
}

pub(crate) fn items_map(doc: &AutoCommit, list_id: &str) -> Result<Option<ObjId>, StoreError> {
    match get_map(doc, &ROOT, ITEMS)? {
        Some(items_id) => get_map(doc, &items_id, list_id),
        None => Ok(None),
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub(crate) fn get_map(
    doc: &AutoCommit,
    obj_id: &ObjId,
    key: &str,
) -> Result<Option<ObjId>, StoreError> {
    match doc.get(obj_id, key)? {
        Some((Value::Object(ObjType::Map), id)) => Ok(Some(id)),
        _ => Ok(None),
    }
}

fn get_string(doc: &AutoCommit, obj_id: &ObjId, key: &str) -> Result<Option<String>, StoreError> {
    if let Some((value, _)) = doc.get(obj_id, key)? {
        Ok(value.into_string().ok())
    } else {
        Ok(None)
    }
}

fn get_i64(doc: &AutoCommit, obj_id: &ObjId, key: &str) -> Result<Option<i64>, StoreError> {
    if let Some((value, _)) = doc.get(obj_id, key)? {
        Ok(value.to_i64())
    } else {
        Ok(None)
    }
}

fn get_bool(doc: &AutoCommit, obj_id: &ObjId, key: &str) -> Result<Option<bool>, StoreError> {
    if let Some((value, _)) = doc.get(obj_id, key)? {
        Ok(value.to_bool())
    } else {
        Ok(None)
    }
}
