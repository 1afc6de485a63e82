use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{remap_id, Identifiable};
use crate::id::Id;
use crate::serde_util::{int_bool, is_false, is_zero, null_default};
use crate::time::{is_full_day, parse_due_date};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub id: Id,
    #[serde(default, skip_serializing_if = "is_false", with = "int_bool")]
    pub is_deleted: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: i64,
    #[serde(default)]
    pub indent: i64,
    #[serde(default)]
    pub item_order: i64,
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub parent_id: Id,
    #[serde(default, with = "int_bool")]
    pub collapsed: bool,
    #[serde(default)]
    pub shared: bool,
    #[serde(default, with = "int_bool")]
    pub is_archived: bool,
    #[serde(default)]
    pub inbox_project: bool,
    #[serde(default)]
    pub team_inbox: bool,
}

impl Project {
    /// `#name`, indented by nesting level.
    pub fn display_name(&self) -> String {
        let depth = usize::try_from(self.indent.max(1) - 1).unwrap_or(0);
        format!("{}#{}", " ".repeat(depth), self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Due {
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default)]
    pub string: String,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub is_recurring: bool,
}

impl Due {
    /// Due text in the service's natural-language form, e.g. "every monday".
    pub fn from_text(text: &str) -> Self {
        Self {
            string: text.to_string(),
            ..Self::default()
        }
    }

    pub fn date_time(&self) -> Option<DateTime<Utc>> {
        if self.date.trim().is_empty() {
            return None;
        }
        parse_due_date(&self.date).ok()
    }

    pub fn is_full_day(&self) -> bool {
        is_full_day(&self.date)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub id: Id,
    #[serde(default, skip_serializing_if = "is_false", with = "int_bool")]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub user_id: Id,
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub project_id: Id,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<Due>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub indent: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub item_order: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub day_order: i64,
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub parent_id: Id,
    #[serde(default, skip_serializing_if = "is_false", with = "int_bool")]
    pub collapsed: bool,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub labels: Vec<Id>,
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub assigned_by_uid: Id,
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub responsible_uid: Id,
    #[serde(default, skip_serializing_if = "is_false", with = "int_bool")]
    pub checked: bool,
    #[serde(default, skip_serializing_if = "is_false", with = "int_bool")]
    pub in_history: bool,
    #[serde(default, skip_serializing_if = "is_false", with = "int_bool")]
    pub is_archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<String>,
    #[serde(
        default,
        alias = "completed_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_completed: Option<String>,
}

impl Item {
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.due.as_ref().and_then(Due::date_time)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_at().is_some_and(|due| due < now)
    }

    pub fn added_at(&self) -> Option<DateTime<Utc>> {
        self.date_added
            .as_deref()
            .and_then(|value| parse_due_date(value).ok())
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.date_completed
            .as_deref()
            .and_then(|value| parse_due_date(value).ok())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Label {
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub id: Id,
    #[serde(default, skip_serializing_if = "is_false", with = "int_bool")]
    pub is_deleted: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: i64,
    #[serde(default)]
    pub item_order: i64,
}

impl Label {
    pub fn display_name(&self) -> String {
        format!("@{}", self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub id: Id,
    #[serde(default, skip_serializing_if = "is_false", with = "int_bool")]
    pub is_deleted: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub color: i64,
    #[serde(default)]
    pub item_order: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAttachment {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub upload_state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub id: Id,
    #[serde(default, skip_serializing_if = "is_false", with = "int_bool")]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub posted_uid: Id,
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub item_id: Id,
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub project_id: Id,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_attachment: Option<FileAttachment>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub uids_to_notify: Vec<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub reactions: BTreeMap<String, Vec<Id>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub id: Id,
    #[serde(default, skip_serializing_if = "is_false", with = "int_bool")]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub notify_uid: Id,
    #[serde(default, skip_serializing_if = "Id::is_zero")]
    pub item_id: Id,
    #[serde(default)]
    pub service: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<Due>,
    #[serde(default)]
    pub mm_offset: i64,
}

/// Body of a sync response: either a full snapshot (`full_sync`) or the
/// entities changed since the cursor that was sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    pub sync_token: String,
    #[serde(default)]
    pub full_sync: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub projects: Vec<Project>,
    #[serde(default, deserialize_with = "null_default")]
    pub items: Vec<Item>,
    #[serde(default, deserialize_with = "null_default")]
    pub labels: Vec<Label>,
    #[serde(default, deserialize_with = "null_default")]
    pub filters: Vec<Filter>,
    #[serde(default, deserialize_with = "null_default")]
    pub notes: Vec<Note>,
    #[serde(default, deserialize_with = "null_default")]
    pub project_notes: Vec<Note>,
    #[serde(default, deserialize_with = "null_default")]
    pub reminders: Vec<Reminder>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub temp_id_mapping: HashMap<Id, Id>,
}

impl SyncState {
    pub fn entity_count(&self) -> usize {
        self.projects.len()
            + self.items.len()
            + self.labels.len()
            + self.filters.len()
            + self.notes.len()
            + self.project_notes.len()
            + self.reminders.len()
    }
}

impl Identifiable for Project {
    fn id(&self) -> &Id {
        &self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn remap_references(&mut self, mapping: &HashMap<Id, Id>) {
        remap_id(&mut self.parent_id, mapping);
    }
}

impl Identifiable for Item {
    fn id(&self) -> &Id {
        &self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn remap_references(&mut self, mapping: &HashMap<Id, Id>) {
        remap_id(&mut self.project_id, mapping);
        remap_id(&mut self.parent_id, mapping);
        for label in &mut self.labels {
            remap_id(label, mapping);
        }
    }
}

impl Identifiable for Label {
    fn id(&self) -> &Id {
        &self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }
}

impl Identifiable for Filter {
    fn id(&self) -> &Id {
        &self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }
}

impl Identifiable for Note {
    fn id(&self) -> &Id {
        &self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn remap_references(&mut self, mapping: &HashMap<Id, Id>) {
        remap_id(&mut self.item_id, mapping);
        remap_id(&mut self.project_id, mapping);
    }
}

impl Identifiable for Reminder {
    fn id(&self) -> &Id {
        &self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn remap_references(&mut self, mapping: &HashMap<Id, Id>) {
        remap_id(&mut self.item_id, mapping);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn decodes_a_sync_response() {
        let body = r#"{
            "sync_token": "abc123",
            "full_sync": true,
            "projects": [{"id": 1, "name": "Inbox", "inbox_project": true, "collapsed": 0}],
            "items": [{
                "id": 10,
                "project_id": 1,
                "content": "Buy milk",
                "labels": [5],
                "checked": 0,
                "due": {"date": "2024-05-01", "string": "may 1", "lang": "en", "is_recurring": false}
            }],
            "labels": [{"id": 5, "name": "errand", "is_deleted": 1}],
            "filters": null,
            "notes": [],
            "reminders": [{"id": 7, "item_id": 10, "type": "relative", "mm_offset": 30}],
            "temp_id_mapping": {"c0afd2be-7576-4fc4-8b3c-696c4c6cf794": 10}
        }"#;
        let state: SyncState = serde_json::from_str(body).expect("decode");
        assert_eq!(state.sync_token, "abc123");
        assert!(state.full_sync);
        assert_eq!(state.projects[0].name, "Inbox");
        assert!(state.projects[0].inbox_project);
        let item = &state.items[0];
        assert_eq!(item.project_id, Id::new("1").expect("id"));
        assert_eq!(item.labels, vec![Id::new("5").expect("id")]);
        assert!(item.due.as_ref().is_some_and(Due::is_full_day));
        assert!(state.labels[0].is_deleted);
        assert!(state.filters.is_empty());
        assert_eq!(state.reminders[0].kind, "relative");
        assert_eq!(
            state
                .temp_id_mapping
                .get(&Id::new("c0afd2be-7576-4fc4-8b3c-696c4c6cf794").expect("temp")),
            Some(&Id::new("10").expect("id"))
        );
    }

    #[test]
    fn item_payload_omits_empty_fields() {
        let item = Item {
            id: Id::new("c0afd2be-7576-4fc4-8b3c-696c4c6cf794").expect("temp"),
            content: "Buy milk".to_string(),
            project_id: Id::new("42").expect("id"),
            ..Item::default()
        };
        let value = serde_json::to_value(&item).expect("json");
        assert_eq!(value["id"], "c0afd2be-7576-4fc4-8b3c-696c4c6cf794");
        assert_eq!(value["project_id"], 42);
        for field in [
            "priority",
            "indent",
            "item_order",
            "day_order",
            "collapsed",
            "checked",
            "in_history",
            "is_archived",
            "is_deleted",
        ] {
            assert!(value.get(field).is_none(), "{field} should be omitted");
        }
        assert!(value.get("labels").is_none());
        assert!(value.get("due").is_none());
    }

    #[test]
    fn item_payload_keeps_set_flags_and_counters() {
        let item = Item {
            content: "Buy milk".to_string(),
            priority: 4,
            checked: true,
            ..Item::default()
        };
        let value = serde_json::to_value(&item).expect("json");
        assert_eq!(value["priority"], 4);
        assert_eq!(value["checked"], 1);
        assert!(value.get("indent").is_none());
    }

    #[test]
    fn project_display_name_follows_indent() {
        let project = Project {
            name: "Work".to_string(),
            indent: 2,
            ..Project::default()
        };
        assert_eq!(project.display_name(), " #Work");
        let label = Label {
            name: "errand".to_string(),
            ..Label::default()
        };
        assert_eq!(label.display_name(), "@errand");
    }

    #[test]
    fn overdue_uses_due_date() {
        let item = Item {
            due: Some(Due {
                date: "2000-01-01T00:00:00Z".to_string(),
                ..Due::default()
            }),
            ..Item::default()
        };
        assert!(item.is_overdue(Utc::now()));
        assert!(!Item::default().is_overdue(Utc::now()));
    }
}
