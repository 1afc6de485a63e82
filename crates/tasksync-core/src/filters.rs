use crate::cache::EntityCache;
use crate::client::{require_id, Client};
use crate::command::{Command, CommandArgs, IdArgs};
use crate::error::{Error, Result};
use crate::id::Id;
use crate::model::Filter;

impl EntityCache<Filter> {
    pub fn find_by_name(&self, needle: &str) -> Vec<&Filter> {
        self.find(|filter| filter.name.contains(needle))
    }
}

pub struct Filters<'a> {
    client: &'a mut Client,
}

impl<'a> Filters<'a> {
    pub(crate) fn new(client: &'a mut Client) -> Self {
        Self { client }
    }

    pub fn add(&mut self, mut filter: Filter) -> Result<Filter> {
        if filter.name.trim().is_empty() {
            return Err(Error::validation("New filter requires a name"));
        }
        if filter.query.trim().is_empty() {
            return Err(Error::validation("New filter requires a query"));
        }
        let temp_id = Id::generate_temp();
        filter.id = temp_id.clone();
        filter.is_deleted = false;
        self.client.mirror_mut().filters.store(filter.clone());
        self.client
            .enqueue(Command::create(CommandArgs::FilterAdd(filter.clone()), temp_id));
        Ok(filter)
    }

    pub fn update(&mut self, filter: Filter) -> Result<Filter> {
        require_id(&filter.id)?;
        self.client
            .enqueue(Command::new(CommandArgs::FilterUpdate(filter.clone())));
        Ok(filter)
    }

    pub fn delete(&mut self, id: &Id) -> Result<()> {
        require_id(id)?;
        self.client
            .enqueue(Command::new(CommandArgs::FilterDelete(IdArgs { id: id.clone() })));
        Ok(())
    }

    pub fn get_all(&self) -> &[Filter] {
        self.client.state().filters.get_all()
    }

    pub fn resolve(&self, id: &Id) -> Option<&Filter> {
        self.client.state().filters.resolve(id)
    }

    pub fn find_by_name(&self, needle: &str) -> Vec<&Filter> {
        self.client.state().filters.find_by_name(needle)
    }
}
