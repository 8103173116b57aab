//! Writers for storing records in the shopping document.

use automerge::{transaction::Transactable, AutoCommit, ObjId, ObjType, ROOT};

use super::reader::{get_map, items_map, ITEMS, LISTS};
use super::StoreError;
use crate::models::{Item, ShoppingList};

/// Creates the top-level maps if the document lacks them.
pub fn init_document(doc: &mut AutoCommit) -> Result<(), StoreError> {
    ensure_map(doc, &ROOT, LISTS)?;
    ensure_map(doc, &ROOT, ITEMS)?;
    Ok(())
}

/// Writes a list at `root["lists"][list.id]`, replacing any previous one.
pub fn write_list(doc: &mut AutoCommit, list: &ShoppingList) -> Result<(), StoreError> {
    let lists_id = ensure_map(doc, &ROOT, LISTS)?;
    let list_id = ensure_map(doc, &lists_id, &list.id)?;

    doc.put(&list_id, "user_id", list.user_id.as_str())?;
    doc.put(&list_id, "title", list.title.as_str())?;
    Ok(())
}

/// Deletes a list and every item stored under it.
pub fn delete_list(doc: &mut AutoCommit, list_id: &str) -> Result<(), StoreError> {
    if let Some(lists_id) = get_map(doc, &ROOT, LISTS)? {
        doc.delete(&lists_id, list_id)?;
    }
    if let Some(items_id) = get_map(doc, &ROOT, ITEMS)? {
        if get_map(doc, &items_id, list_id)?.is_some() {
            doc.delete(&items_id, list_id)?;
        }
    }
    Ok(())
}

/// Writes an item at `root["items"][item.list_id][item.id]`.
pub fn write_item(doc: &mut AutoCommit, item: &Item) -> Result<(), StoreError> {
    let items_id = ensure_map(doc, &ROOT, ITEMS)?;
    let list_items = ensure_map(doc, &items_id, &item.list_id)?;
    let item_id = ensure_map(doc, &list_items, &item.id)?;

    doc.put(&item_id, "name", item.name.as_str())?;
    doc.put(&item_id, "quantity", i64::from(item.quantity))?;
    doc.put(&item_id, "unit", item.unit.as_str())?;
    doc.put(&item_id, "category", item.category.as_str())?;
    doc.put(&item_id, "purchased", item.purchased)?;
    Ok(())
}

pub fn delete_item(doc: &mut AutoCommit, list_id: &str, item_id: &str) -> Result<(), StoreError> {
    if let Some(list_items) = items_map(doc, list_id)? {
        doc.delete(&list_items, item_id)?;
    }
    Ok(())
}

/// Returns the map at `parent[key]`, creating it when absent.
///
/// Existing maps are reused so concurrent edits to sibling fields merge.
fn ensure_map(doc: &mut AutoCommit, parent: &ObjId, key: &str) -> Result<ObjId, StoreError> {
    if let Some(id) = get_map(doc, parent, key)? {
        return Ok(id);
    }
    Ok(doc.put_object(parent, key, ObjType::Map)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewItem;
    use crate::store::reader::{read_item_by_id, read_items, read_list_by_id, read_lists};

    fn list(id: &str, title: &str) -> ShoppingList {
        ShoppingList::new(id, "alice", title)
    }

    #[test]
    fn test_write_and_read_list() {
        let mut doc = AutoCommit::new();
        write_list(&mut doc, &list("l1", "Groceries")).unwrap();

        let read = read_list_by_id(&doc, "l1").unwrap().unwrap();
        assert_eq!(read, list("l1", "Groceries"));
    }

    #[test]
    fn test_rewrite_keeps_single_entry() {
        let mut doc = AutoCommit::new();
        write_list(&mut doc, &list("l1", "Groceries")).unwrap();
        write_list(&mut doc, &list("l1", "Market")).unwrap();

        let lists = read_lists(&doc).unwrap();
        assert_eq!(lists, vec![list("l1", "Market")]);
    }

    #[test]
    fn test_write_and_read_item() {
        let mut doc = AutoCommit::new();
        let mut item = NewItem::new("Milk", "l")
            .with_quantity(2)
            .into_item("i1", "l1");
        item.purchased = true;
        write_item(&mut doc, &item).unwrap();

        assert_eq!(read_item_by_id(&doc, "l1", "i1").unwrap(), Some(item));
        assert!(read_items(&doc, "other").unwrap().is_empty());
    }

    #[test]
    fn test_delete_list_cascades_items() {
        let mut doc = AutoCommit::new();
        init_document(&mut doc).unwrap();
        write_list(&mut doc, &list("l1", "Groceries")).unwrap();
        write_item(&mut doc, &NewItem::new("Milk", "l").into_item("i1", "l1")).unwrap();
        write_item(&mut doc, &NewItem::new("Eggs", "dozen").into_item("i2", "l1")).unwrap();

        delete_list(&mut doc, "l1").unwrap();

        assert!(read_lists(&doc).unwrap().is_empty());
        assert!(read_items(&doc, "l1").unwrap().is_empty());
    }

    #[test]
    fn test_delete_item() {
        let mut doc = AutoCommit::new();
        write_item(&mut doc, &NewItem::new("Milk", "l").into_item("i1", "l1")).unwrap();
        write_item(&mut doc, &NewItem::new("Eggs", "dozen").into_item("i2", "l1")).unwrap();

        delete_item(&mut doc, "l1", "i1").unwrap();

        let names: Vec<String> = read_items(&doc, "l1")
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Eggs".to_string()]);
    }

    #[test]
    fn test_concurrent_edits_merge() {
        let mut base = AutoCommit::new();
        init_document(&mut base).unwrap();
        write_list(&mut base, &list("l1", "Groceries")).unwrap();

        let mut other = base.fork();
        write_item(&mut other, &NewItem::new("Milk", "l").into_item("i1", "l1")).unwrap();
        write_list(&mut base, &list("l2", "Hardware")).unwrap();

        base.merge(&mut other).unwrap();
        assert_eq!(read_lists(&base).unwrap().len(), 2);
        assert_eq!(read_items(&base, "l1").unwrap().len(), 1);
    }
}
