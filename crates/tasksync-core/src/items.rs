use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::cache::EntityCache;
use crate::client::{require_id, require_ids, Client};
use crate::command::{
    Command, CommandArgs, IdArgs, IdsArgs, ItemCompleteArgs, ItemMoveArgs, ItemUncompleteArgs,
};
use crate::error::{Error, Result};
use crate::id::Id;
use crate::model::Item;

impl EntityCache<Item> {
    /// Items whose content contains `needle`.
    pub fn find_by_content(&self, needle: &str) -> Vec<&Item> {
        self.find(|item| item.content.contains(needle))
    }

    pub fn find_by_project_ids(&self, project_ids: &[Id]) -> Vec<&Item> {
        self.find(|item| project_ids.contains(&item.project_id))
    }

    /// Items with a parseable due date strictly before `deadline`.
    pub fn find_due_before(&self, deadline: DateTime<Utc>) -> Vec<&Item> {
        self.find(|item| item.due_at().is_some_and(|due| due < deadline))
    }
}

pub struct Items<'a> {
    client: &'a mut Client,
}

impl<'a> Items<'a> {
    pub(crate) fn new(client: &'a mut Client) -> Self {
        Self { client }
    }

    /// Stores the item under a fresh temp id and queues `item_add`. The
    /// returned copy carries the temp id.
    pub fn add(&mut self, mut item: Item) -> Result<Item> {
        if item.content.trim().is_empty() {
            return Err(Error::validation("New item requires a content"));
        }
        let temp_id = Id::generate_temp();
        item.id = temp_id.clone();
        item.is_deleted = false;
        self.client.mirror_mut().items.store(item.clone());
        self.client
            .enqueue(Command::create(CommandArgs::ItemAdd(item.clone()), temp_id));
        Ok(item)
    }

    pub fn update(&mut self, item: Item) -> Result<Item> {
        require_id(&item.id)?;
        self.client
            .enqueue(Command::new(CommandArgs::ItemUpdate(item.clone())));
        Ok(item)
    }

    pub fn delete(&mut self, ids: &[Id]) -> Result<()> {
        require_ids(ids)?;
        self.client
            .enqueue(Command::new(CommandArgs::ItemDelete(IdsArgs::new(ids))));
        Ok(())
    }

    /// Queues `item_move` with an explicit source project -> items map.
    pub fn move_to(
        &mut self,
        project_items: BTreeMap<Id, Vec<Id>>,
        to_project: Id,
    ) -> Result<()> {
        require_id(&to_project)?;
        if project_items.is_empty() {
            return Err(Error::validation("Nothing to move"));
        }
        for (project_id, ids) in &project_items {
            require_id(project_id)?;
            require_ids(ids)?;
        }
        self.client.enqueue(Command::new(CommandArgs::ItemMove(ItemMoveArgs {
            project_items,
            to_project,
        })));
        Ok(())
    }

    /// Like [`Items::move_to`], grouping `ids` by the project each item has in
    /// the mirror. Every item must be cached.
    pub fn move_items(&mut self, ids: &[Id], to_project: Id) -> Result<()> {
        require_ids(ids)?;
        let mut project_items: BTreeMap<Id, Vec<Id>> = BTreeMap::new();
        for id in ids {
            let item = self
                .client
                .state()
                .items
                .resolve(id)
                .ok_or_else(|| Error::validation(format!("Unknown item: {id}")))?;
            project_items
                .entry(item.project_id.clone())
                .or_default()
                .push(id.clone());
        }
        self.move_to(project_items, to_project)
    }

    pub fn complete(&mut self, ids: &[Id], force_history: bool) -> Result<()> {
        require_ids(ids)?;
        self.client
            .enqueue(Command::new(CommandArgs::ItemComplete(ItemCompleteArgs {
                ids: ids.to_vec(),
                force_history,
            })));
        Ok(())
    }

    pub fn uncomplete(
        &mut self,
        ids: &[Id],
        update_item_orders: bool,
        restore_state: BTreeMap<Id, Vec<String>>,
    ) -> Result<()> {
        require_ids(ids)?;
        self.client
            .enqueue(Command::new(CommandArgs::ItemUncomplete(ItemUncompleteArgs {
                ids: ids.to_vec(),
                update_item_orders,
                restore_state,
            })));
        Ok(())
    }

    /// Completes a task the way the official clients do: recurring tasks move
    /// to their next date, others are archived.
    pub fn close(&mut self, id: &Id) -> Result<()> {
        require_id(id)?;
        self.client
            .enqueue(Command::new(CommandArgs::ItemClose(IdArgs { id: id.clone() })));
        Ok(())
    }

    pub fn get_all(&self) -> &[Item] {
        self.client.state().items.get_all()
    }

    pub fn resolve(&self, id: &Id) -> Option<&Item> {
        self.client.state().items.resolve(id)
    }

    pub fn find_by_content(&self, needle: &str) -> Vec<&Item> {
        self.client.state().items.find_by_content(needle)
    }

    pub fn find_by_project_ids(&self, project_ids: &[Id]) -> Vec<&Item> {
        self.client.state().items.find_by_project_ids(project_ids)
    }

    pub fn find_due_before(&self, deadline: DateTime<Utc>) -> Vec<&Item> {
        self.client.state().items.find_due_before(deadline)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::model::Due;

    fn item(id: &str, project: &str, content: &str) -> Item {
        Item {
            id: Id::new(id).expect("id"),
            project_id: Id::new(project).expect("project id"),
            content: content.to_string(),
            ..Item::default()
        }
    }

    #[test]
    fn content_and_project_lookups() {
        let mut cache = EntityCache::default();
        cache.store(item("1", "10", "Buy milk"));
        cache.store(item("2", "20", "Buy bread"));
        cache.store(item("3", "30", "Call mom"));

        assert_eq!(cache.find_by_content("Buy").len(), 2);
        assert!(cache.find_by_content("buy").is_empty());

        let ids: Vec<&str> = cache
            .find_by_project_ids(&[Id::new("20").expect("id"), Id::new("30").expect("id")])
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn due_before_skips_undated_items() {
        let mut cache = EntityCache::default();
        cache.store(Item {
            due: Some(Due {
                date: "2024-01-01T09:00:00Z".to_string(),
                ..Due::default()
            }),
            ..item("1", "10", "early")
        });
        cache.store(Item {
            due: Some(Due {
                date: "2024-03-01T09:00:00Z".to_string(),
                ..Due::default()
            }),
            ..item("2", "10", "late")
        });
        cache.store(item("3", "10", "someday"));

        let deadline = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let found: Vec<&str> = cache
            .find_due_before(deadline)
            .iter()
            .map(|item| item.content.as_str())
            .collect();
        assert_eq!(found, vec!["early"]);
    }
}
