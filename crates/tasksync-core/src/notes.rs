use crate::cache::EntityCache;
use crate::client::{require_id, Client};
use crate::command::{Command, CommandArgs, IdArgs};
use crate::error::{Error, Result};
use crate::id::Id;
use crate::model::Note;

impl EntityCache<Note> {
    pub fn for_item(&self, item_id: &Id) -> Vec<&Note> {
        self.find(|note| &note.item_id == item_id)
    }

    /// Notes attached to the project itself, not to one of its items.
    pub fn for_project(&self, project_id: &Id) -> Vec<&Note> {
        self.find(|note| &note.project_id == project_id && note.item_id.is_zero())
    }
}

pub struct Notes<'a> {
    client: &'a mut Client,
}

impl<'a> Notes<'a> {
    pub(crate) fn new(client: &'a mut Client) -> Self {
        Self { client }
    }

    pub fn add(&mut self, mut note: Note) -> Result<Note> {
        if note.item_id.is_zero() || note.content.trim().is_empty() {
            return Err(Error::validation(
                "New note requires an item id and a content",
            ));
        }
        let temp_id = Id::generate_temp();
        note.id = temp_id.clone();
        note.is_deleted = false;
        self.client.mirror_mut().notes.store(note.clone());
        self.client
            .enqueue(Command::create(CommandArgs::NoteAdd(note.clone()), temp_id));
        Ok(note)
    }

    pub fn update(&mut self, note: Note) -> Result<Note> {
        require_id(&note.id)?;
        self.client
            .enqueue(Command::new(CommandArgs::NoteUpdate(note.clone())));
        Ok(note)
    }

    pub fn delete(&mut self, id: &Id) -> Result<()> {
        require_id(id)?;
        self.client
            .enqueue(Command::new(CommandArgs::NoteDelete(IdArgs { id: id.clone() })));
        Ok(())
    }

    pub fn get_all(&self) -> &[Note] {
        self.client.state().notes.get_all()
    }

    pub fn resolve(&self, id: &Id) -> Option<&Note> {
        self.client.state().notes.resolve(id)
    }

    pub fn for_item(&self, item_id: &Id) -> Vec<&Note> {
        self.client.state().notes.for_item(item_id)
    }

    pub fn for_project(&self, project_id: &Id) -> Vec<&Note> {
        self.client.state().notes.for_project(project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_notes_exclude_item_notes() {
        let mut cache = EntityCache::default();
        cache.store(Note {
            id: Id::new("1").expect("id"),
            project_id: Id::new("10").expect("id"),
            content: "project note".to_string(),
            ..Note::default()
        });
        cache.store(Note {
            id: Id::new("2").expect("id"),
            project_id: Id::new("10").expect("id"),
            item_id: Id::new("100").expect("id"),
            content: "item note".to_string(),
            ..Note::default()
        });

        let project = Id::new("10").expect("id");
        let contents: Vec<&str> = cache
            .for_project(&project)
            .iter()
            .map(|note| note.content.as_str())
            .collect();
        assert_eq!(contents, vec!["project note"]);
        assert_eq!(cache.for_item(&Id::new("100").expect("id")).len(), 1);
    }
}
