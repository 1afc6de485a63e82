use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::id::Id;
use crate::model::{Filter, Item, Label, Note, Project, Reminder, SyncState};
use crate::serde_util::null_default;

/// Capability shared by every entity kind the mirror tracks.
pub trait Identifiable {
    fn id(&self) -> &Id;
    fn set_id(&mut self, id: Id);
    fn is_deleted(&self) -> bool;

    fn same_id(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Rewrites weak references (project, label, parent...) from temp to
    /// real ids. Kinds without references keep the default no-op.
    fn remap_references(&mut self, _mapping: &HashMap<Id, Id>) {}
}

pub(crate) fn remap_id(id: &mut Id, mapping: &HashMap<Id, Id>) {
    if let Some(real) = mapping.get(id) {
        *id = real.clone();
    }
}

/// In-memory mirror of one entity kind, keyed by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityCache<T> {
    entries: Vec<T>,
}

impl<T> Default for EntityCache<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Identifiable> EntityCache<T> {
    pub fn get_all(&self) -> &[T] {
        &self.entries
    }

    pub fn resolve(&self, id: &Id) -> Option<&T> {
        self.entries.iter().find(|entity| entity.id() == id)
    }

    pub fn find<P>(&self, predicate: P) -> Vec<&T>
    where
        P: Fn(&T) -> bool,
    {
        self.entries.iter().filter(|&entity| predicate(entity)).collect()
    }

    /// Merge-on-write. The server never resends deleted entities, so a
    /// deletion marker drops the cached copy instead of keeping a tombstone.
    pub fn store(&mut self, entity: T) {
        let position = self
            .entries
            .iter()
            .position(|existing| existing.same_id(&entity));
        match position {
            Some(index) if entity.is_deleted() => {
                self.entries.remove(index);
            }
            Some(index) => self.entries[index] = entity,
            None if entity.is_deleted() => {}
            None => self.entries.push(entity),
        }
    }

    pub fn remove(&mut self, entity: &T) {
        self.entries.retain(|existing| !existing.same_id(entity));
    }

    /// Renames temp-id placeholders to their confirmed ids. A placeholder whose
    /// real id is already cached is dropped in favor of the cached entity.
    pub fn apply_temp_mapping(&mut self, mapping: &HashMap<Id, Id>) {
        if mapping.is_empty() {
            return;
        }
        let existing: HashSet<Id> = self
            .entries
            .iter()
            .map(|entity| entity.id().clone())
            .collect();
        self.entries.retain(|entity| match mapping.get(entity.id()) {
            Some(real) => !existing.contains(real),
            None => true,
        });
        for entity in &mut self.entries {
            if let Some(real) = mapping.get(entity.id()).cloned() {
                entity.set_id(real);
            }
            entity.remap_references(mapping);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Every cached entity kind; this is what the snapshot store persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mirror {
    #[serde(default, deserialize_with = "null_default")]
    pub projects: EntityCache<Project>,
    #[serde(default, deserialize_with = "null_default")]
    pub items: EntityCache<Item>,
    #[serde(default, deserialize_with = "null_default")]
    pub labels: EntityCache<Label>,
    #[serde(default, deserialize_with = "null_default")]
    pub filters: EntityCache<Filter>,
    #[serde(default, deserialize_with = "null_default")]
    pub notes: EntityCache<Note>,
    #[serde(default, deserialize_with = "null_default")]
    pub reminders: EntityCache<Reminder>,
}

impl Mirror {
    /// Folds a sync response into every cache, entity by entity. A full
    /// snapshot replaces the mirror outright, dropping unconfirmed placeholders
    /// and anything deleted while the cursor was stale.
    pub fn merge(&mut self, state: SyncState) {
        if state.full_sync {
            self.clear();
        }
        self.apply_temp_mapping(&state.temp_id_mapping);
        for project in state.projects {
            self.projects.store(project);
        }
        for item in state.items {
            self.items.store(item);
        }
        for label in state.labels {
            self.labels.store(label);
        }
        for filter in state.filters {
            self.filters.store(filter);
        }
        for note in state.notes.into_iter().chain(state.project_notes) {
            self.notes.store(note);
        }
        for reminder in state.reminders {
            self.reminders.store(reminder);
        }
    }

    pub fn apply_temp_mapping(&mut self, mapping: &HashMap<Id, Id>) {
        self.projects.apply_temp_mapping(mapping);
        self.items.apply_temp_mapping(mapping);
        self.labels.apply_temp_mapping(mapping);
        self.filters.apply_temp_mapping(mapping);
        self.notes.apply_temp_mapping(mapping);
        self.reminders.apply_temp_mapping(mapping);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn entity_count(&self) -> usize {
        self.projects.len()
            + self.items.len()
            + self.labels.len()
            + self.filters.len()
            + self.notes.len()
            + self.reminders.len()
    }
}
