use crate::cache::EntityCache;
use crate::client::{require_id, require_ids, Client};
use crate::command::{Command, CommandArgs, IdsArgs};
use crate::error::{Error, Result};
use crate::id::Id;
use crate::model::Project;

impl EntityCache<Project> {
    /// Projects whose name contains `needle`.
    pub fn find_by_name(&self, needle: &str) -> Vec<&Project> {
        self.find(|project| project.name.contains(needle))
    }

    /// Exact name match first, otherwise the first partial match.
    pub fn find_one_by_name(&self, needle: &str) -> Option<&Project> {
        let matches = self.find_by_name(needle);
        matches
            .iter()
            .find(|project| project.name == needle)
            .or_else(|| matches.first())
            .copied()
    }

    pub fn inbox(&self) -> Option<&Project> {
        self.get_all().iter().find(|project| project.inbox_project)
    }
}

pub struct Projects<'a> {
    client: &'a mut Client,
}

impl<'a> Projects<'a> {
    pub(crate) fn new(client: &'a mut Client) -> Self {
        Self { client }
    }

    /// Stores the project under a fresh temp id and queues `project_add`.
    pub fn add(&mut self, mut project: Project) -> Result<Project> {
        if project.name.trim().is_empty() {
            return Err(Error::validation("New project requires a name"));
        }
        let temp_id = Id::generate_temp();
        project.id = temp_id.clone();
        project.is_deleted = false;
        self.client.mirror_mut().projects.store(project.clone());
        self.client.enqueue(Command::create(
            CommandArgs::ProjectAdd(project.clone()),
            temp_id,
        ));
        Ok(project)
    }

    pub fn update(&mut self, project: Project) -> Result<Project> {
        require_id(&project.id)?;
        self.client
            .enqueue(Command::new(CommandArgs::ProjectUpdate(project.clone())));
        Ok(project)
    }

    pub fn delete(&mut self, ids: &[Id]) -> Result<()> {
        require_ids(ids)?;
        self.client
            .enqueue(Command::new(CommandArgs::ProjectDelete(IdsArgs::new(ids))));
        Ok(())
    }

    pub fn archive(&mut self, ids: &[Id]) -> Result<()> {
        require_ids(ids)?;
        self.client
            .enqueue(Command::new(CommandArgs::ProjectArchive(IdsArgs::new(ids))));
        Ok(())
    }

    pub fn unarchive(&mut self, ids: &[Id]) -> Result<()> {
        require_ids(ids)?;
        self.client
            .enqueue(Command::new(CommandArgs::ProjectUnarchive(IdsArgs::new(ids))));
        Ok(())
    }

    pub fn get_all(&self) -> &[Project] {
        self.client.state().projects.get_all()
    }

    pub fn resolve(&self, id: &Id) -> Option<&Project> {
        self.client.state().projects.resolve(id)
    }

    pub fn find_by_name(&self, needle: &str) -> Vec<&Project> {
        self.client.state().projects.find_by_name(needle)
    }

    pub fn find_one_by_name(&self, needle: &str) -> Option<&Project> {
        self.client.state().projects.find_one_by_name(needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: &str, name: &str) -> Project {
        Project {
            id: Id::new(id).expect("id"),
            name: name.to_string(),
            ..Project::default()
        }
    }

    #[test]
    fn find_one_prefers_exact_name() {
        let mut cache = EntityCache::default();
        cache.store(project("1", "Work stuff"));
        cache.store(project("2", "Work"));
        cache.store(project("3", "Home"));
        assert_eq!(cache.find_by_name("Work").len(), 2);
        assert_eq!(
            cache.find_one_by_name("Work").map(|p| p.id.as_str()),
            Some("2")
        );
        assert_eq!(
            cache.find_one_by_name("stuff").map(|p| p.id.as_str()),
            Some("1")
        );
        assert!(cache.find_one_by_name("Garden").is_none());
    }

    #[test]
    fn inbox_is_flagged_project() {
        let mut cache = EntityCache::default();
        cache.store(project("1", "Work"));
        cache.store(Project {
            inbox_project: true,
            ..project("2", "Inbox")
        });
        assert_eq!(cache.inbox().map(|p| p.name.as_str()), Some("Inbox"));
    }
}
