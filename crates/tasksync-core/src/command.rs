use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::id::{new_uuid, Id};
use crate::model::{Filter, Item, Label, Note, Project};
use crate::serde_util::int_bool;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdArgs {
    pub id: Id,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdsArgs {
    pub ids: Vec<Id>,
}

impl IdsArgs {
    pub fn new(ids: &[Id]) -> Self {
        Self { ids: ids.to_vec() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemMoveArgs {
    /// Source project id -> item ids to move out of it.
    pub project_items: BTreeMap<Id, Vec<Id>>,
    pub to_project: Id,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemCompleteArgs {
    pub ids: Vec<Id>,
    #[serde(with = "int_bool")]
    pub force_history: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemUncompleteArgs {
    pub ids: Vec<Id>,
    #[serde(with = "int_bool")]
    pub update_item_orders: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub restore_state: BTreeMap<Id, Vec<String>>,
}

/// Payload of a queued command, one variant per command type.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandArgs {
    ProjectAdd(Project),
    ProjectUpdate(Project),
    ProjectDelete(IdsArgs),
    ProjectArchive(IdsArgs),
    ProjectUnarchive(IdsArgs),
    ItemAdd(Item),
    ItemUpdate(Item),
    ItemDelete(IdsArgs),
    ItemMove(ItemMoveArgs),
    ItemComplete(ItemCompleteArgs),
    ItemUncomplete(ItemUncompleteArgs),
    ItemClose(IdArgs),
    LabelAdd(Label),
    LabelUpdate(Label),
    LabelDelete(IdArgs),
    FilterAdd(Filter),
    FilterUpdate(Filter),
    FilterDelete(IdArgs),
    NoteAdd(Note),
    NoteUpdate(Note),
    NoteDelete(IdArgs),
}

impl CommandArgs {
    /// Wire name sent in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            CommandArgs::ProjectAdd(_) => "project_add",
            CommandArgs::ProjectUpdate(_) => "project_update",
            CommandArgs::ProjectDelete(_) => "project_delete",
            CommandArgs::ProjectArchive(_) => "project_archive",
            CommandArgs::ProjectUnarchive(_) => "project_unarchive",
            CommandArgs::ItemAdd(_) => "item_add",
            CommandArgs::ItemUpdate(_) => "item_update",
            CommandArgs::ItemDelete(_) => "item_delete",
            CommandArgs::ItemMove(_) => "item_move",
            CommandArgs::ItemComplete(_) => "item_complete",
            CommandArgs::ItemUncomplete(_) => "item_uncomplete",
            CommandArgs::ItemClose(_) => "item_close",
            CommandArgs::LabelAdd(_) => "label_add",
            CommandArgs::LabelUpdate(_) => "label_update",
            CommandArgs::LabelDelete(_) => "label_delete",
            CommandArgs::FilterAdd(_) => "filter_add",
            CommandArgs::FilterUpdate(_) => "filter_update",
            CommandArgs::FilterDelete(_) => "filter_delete",
            CommandArgs::NoteAdd(_) => "note_add",
            CommandArgs::NoteUpdate(_) => "note_update",
            CommandArgs::NoteDelete(_) => "note_delete",
        }
    }

    fn serialize_payload<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        match self {
            CommandArgs::ProjectAdd(project) | CommandArgs::ProjectUpdate(project) => {
                map.serialize_entry("args", project)
            }
            CommandArgs::ProjectDelete(args)
            | CommandArgs::ProjectArchive(args)
            | CommandArgs::ProjectUnarchive(args)
            | CommandArgs::ItemDelete(args) => map.serialize_entry("args", args),
            CommandArgs::ItemAdd(item) | CommandArgs::ItemUpdate(item) => {
                map.serialize_entry("args", item)
            }
            CommandArgs::ItemMove(args) => map.serialize_entry("args", args),
            CommandArgs::ItemComplete(args) => map.serialize_entry("args", args),
            CommandArgs::ItemUncomplete(args) => map.serialize_entry("args", args),
            CommandArgs::ItemClose(args)
            | CommandArgs::LabelDelete(args)
            | CommandArgs::FilterDelete(args)
            | CommandArgs::NoteDelete(args) => map.serialize_entry("args", args),
            CommandArgs::LabelAdd(label) | CommandArgs::LabelUpdate(label) => {
                map.serialize_entry("args", label)
            }
            CommandArgs::FilterAdd(filter) | CommandArgs::FilterUpdate(filter) => {
                map.serialize_entry("args", filter)
            }
            CommandArgs::NoteAdd(note) | CommandArgs::NoteUpdate(note) => {
                map.serialize_entry("args", note)
            }
        }
    }
}

/// A single mutation waiting to be sent to the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Idempotency key for the mutation itself.
    pub uuid: Uuid,
    /// Placeholder id of the created entity; only set for `*_add` commands.
    pub temp_id: Option<Id>,
    pub args: CommandArgs,
}

impl Command {
    pub fn new(args: CommandArgs) -> Self {
        Self {
            uuid: new_uuid(),
            temp_id: None,
            args,
        }
    }

    pub fn create(args: CommandArgs, temp_id: Id) -> Self {
        Self {
            uuid: new_uuid(),
            temp_id: Some(temp_id),
            args,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.args.kind()
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.temp_id.is_some() { 4 } else { 3 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("type", self.kind())?;
        self.args.serialize_payload(&mut map)?;
        map.serialize_entry("uuid", &self.uuid)?;
        if let Some(temp_id) = &self.temp_id {
            map.serialize_entry("temp_id", temp_id)?;
        }
        map.end()
    }
}

/// Pending commands in enqueue order.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    commands: Vec<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Hands over every pending command and leaves the queue empty.
    pub fn drain(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Puts an unsent batch back in front of anything enqueued since.
    pub fn restore(&mut self, mut batch: Vec<Command>) {
        batch.append(&mut self.commands);
        self.commands = batch;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn add_command_carries_temp_id() {
        let temp = Id::generate_temp();
        let label = Label {
            id: temp.clone(),
            name: "errand".to_string(),
            ..Label::default()
        };
        let command = Command::create(CommandArgs::LabelAdd(label), temp.clone());
        let value = serde_json::to_value(&command).expect("json");
        assert_eq!(value["type"], "label_add");
        assert_eq!(value["temp_id"], temp.as_str());
        assert_eq!(value["args"]["name"], "errand");
        assert_eq!(value["uuid"], command.uuid.to_string());
    }

    #[test]
    fn non_add_commands_omit_temp_id() {
        let command = Command::new(CommandArgs::ItemComplete(ItemCompleteArgs {
            ids: vec![Id::new("7").expect("id")],
            force_history: true,
        }));
        let value = serde_json::to_value(&command).expect("json");
        assert_eq!(value["type"], "item_complete");
        assert_eq!(value["args"], json!({"ids": [7], "force_history": 1}));
        assert!(value.get("temp_id").is_none());
    }

    #[test]
    fn move_args_key_by_source_project() {
        let args = ItemMoveArgs {
            project_items: BTreeMap::from([(
                Id::new("1").expect("id"),
                vec![Id::new("10").expect("id")],
            )]),
            to_project: Id::new("2").expect("id"),
        };
        let value = serde_json::to_value(Command::new(CommandArgs::ItemMove(args))).expect("json");
        assert_eq!(
            value["args"],
            json!({"project_items": {"1": [10]}, "to_project": 2})
        );
    }

    #[test]
    fn queue_drains_in_order_and_restores_in_front() {
        let mut queue = CommandQueue::new();
        let first = Command::new(CommandArgs::LabelDelete(IdArgs {
            id: Id::new("1").expect("id"),
        }));
        let second = Command::new(CommandArgs::FilterDelete(IdArgs {
            id: Id::new("2").expect("id"),
        }));
        queue.enqueue(first.clone());
        queue.enqueue(second.clone());

        let batch = queue.drain();
        assert!(queue.is_empty());
        assert_eq!(batch, vec![first.clone(), second.clone()]);

        let third = Command::new(CommandArgs::NoteDelete(IdArgs {
            id: Id::new("3").expect("id"),
        }));
        queue.enqueue(third.clone());
        queue.restore(batch);
        let kinds: Vec<&str> = queue.iter().map(Command::kind).collect();
        assert_eq!(kinds, vec!["label_delete", "filter_delete", "note_delete"]);
    }
}
