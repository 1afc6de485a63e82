use crate::cache::EntityCache;
use crate::client::{require_id, Client};
use crate::command::{Command, CommandArgs, IdArgs};
use crate::error::{Error, Result};
use crate::id::Id;
use crate::model::Label;

impl EntityCache<Label> {
    /// Labels whose name contains `needle`; a leading `@` is ignored.
    pub fn find_by_name(&self, needle: &str) -> Vec<&Label> {
        let needle = needle.strip_prefix('@').unwrap_or(needle);
        self.find(|label| label.name.contains(needle))
    }

    pub fn find_one_by_name(&self, needle: &str) -> Option<&Label> {
        let bare = needle.strip_prefix('@').unwrap_or(needle);
        let matches = self.find_by_name(bare);
        matches
            .iter()
            .find(|label| label.name == bare)
            .or_else(|| matches.first())
            .copied()
    }
}

pub struct Labels<'a> {
    client: &'a mut Client,
}

impl<'a> Labels<'a> {
    pub(crate) fn new(client: &'a mut Client) -> Self {
        Self { client }
    }

    pub fn add(&mut self, mut label: Label) -> Result<Label> {
        if label.name.trim().is_empty() {
            return Err(Error::validation("New label requires a name"));
        }
        let temp_id = Id::generate_temp();
        label.id = temp_id.clone();
        label.is_deleted = false;
        self.client.mirror_mut().labels.store(label.clone());
        self.client
            .enqueue(Command::create(CommandArgs::LabelAdd(label.clone()), temp_id));
        Ok(label)
    }

    pub fn update(&mut self, label: Label) -> Result<Label> {
        require_id(&label.id)?;
        self.client
            .enqueue(Command::new(CommandArgs::LabelUpdate(label.clone())));
        Ok(label)
    }

    pub fn delete(&mut self, id: &Id) -> Result<()> {
        require_id(id)?;
        self.client
            .enqueue(Command::new(CommandArgs::LabelDelete(IdArgs { id: id.clone() })));
        Ok(())
    }

    pub fn get_all(&self) -> &[Label] {
        self.client.state().labels.get_all()
    }

    pub fn resolve(&self, id: &Id) -> Option<&Label> {
        self.client.state().labels.resolve(id)
    }

    pub fn find_by_name(&self, needle: &str) -> Vec<&Label> {
        self.client.state().labels.find_by_name(needle)
    }

    pub fn find_one_by_name(&self, needle: &str) -> Option<&Label> {
        self.client.state().labels.find_one_by_name(needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(id: &str, name: &str) -> Label {
        Label {
            id: Id::new(id).expect("id"),
            name: name.to_string(),
            ..Label::default()
        }
    }

    #[test]
    fn at_prefix_is_ignored() {
        let mut cache = EntityCache::default();
        cache.store(label("1", "errands"));
        cache.store(label("2", "errand"));
        assert_eq!(cache.find_by_name("@errand").len(), 2);
        assert_eq!(
            cache.find_one_by_name("@errand").map(|l| l.id.as_str()),
            Some("2")
        );
        assert_eq!(
            cache.find_one_by_name("err").map(|l| l.id.as_str()),
            Some("1")
        );
    }
}
