use std::collections::HashMap;

use crate::cache::Mirror;
use crate::id::Id;
use crate::model::{Item, Label, Project};

/// Projects and labels referenced by a set of items, keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemRelations {
    pub projects: HashMap<Id, Project>,
    pub labels: HashMap<Id, Label>,
}

impl ItemRelations {
    pub fn project_for(&self, item: &Item) -> Option<&Project> {
        self.projects.get(&item.project_id)
    }

    /// Resolved labels of `item` in its own order; dangling ids are skipped.
    pub fn labels_for(&self, item: &Item) -> Vec<&Label> {
        item.labels
            .iter()
            .filter_map(|id| self.labels.get(id))
            .collect()
    }
}

/// Resolves weak references from the mirror. References the mirror does not
/// know about are left out.
pub fn item_relations(mirror: &Mirror, items: &[Item]) -> ItemRelations {
    let mut relations = ItemRelations::default();
    for item in items {
        if !relations.projects.contains_key(&item.project_id) {
            if let Some(project) = mirror.projects.resolve(&item.project_id) {
                relations
                    .projects
                    .insert(item.project_id.clone(), project.clone());
            }
        }
        for label_id in &item.labels {
            if relations.labels.contains_key(label_id) {
                continue;
            }
            if let Some(label) = mirror.labels.resolve(label_id) {
                relations.labels.insert(label_id.clone(), label.clone());
            }
        }
    }
    relations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangling_references_are_skipped() {
        let mut mirror = Mirror::default();
        mirror.projects.store(Project {
            id: Id::new("1").expect("id"),
            name: "Inbox".to_string(),
            ..Project::default()
        });
        mirror.labels.store(Label {
            id: Id::new("5").expect("id"),
            name: "errand".to_string(),
            ..Label::default()
        });
        let items = vec![
            Item {
                id: Id::new("10").expect("id"),
                project_id: Id::new("1").expect("id"),
                labels: vec![Id::new("5").expect("id"), Id::new("6").expect("id")],
                ..Item::default()
            },
            Item {
                id: Id::new("11").expect("id"),
                project_id: Id::new("2").expect("id"),
                ..Item::default()
            },
        ];

        let relations = item_relations(&mirror, &items);
        assert_eq!(relations.projects.len(), 1);
        assert_eq!(relations.labels.len(), 1);
        assert_eq!(
            relations.project_for(&items[0]).map(|p| p.name.as_str()),
            Some("Inbox")
        );
        assert!(relations.project_for(&items[1]).is_none());
        let names: Vec<&str> = relations
            .labels_for(&items[0])
            .iter()
            .map(|label| label.name.as_str())
            .collect();
        assert_eq!(names, vec!["errand"]);
    }
}
