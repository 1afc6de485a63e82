//! Server-side reads that the sync mirror does not carry: completed items,
//! productivity stats and single-item details. Nothing here touches the
//! mirror or the command queue.

use std::collections::{BTreeMap, HashMap};

use chrono::Local;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::Mirror;
use crate::client::require_id;
use crate::error::Result;
use crate::id::Id;
use crate::model::{Item, Note, Project};
use crate::relation::{item_relations, ItemRelations};
use crate::serde_util::null_default;
use crate::transport::{ApiRequest, SyncTransport, TransportError};

const DAY_LAYOUT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletedOrder {
    #[default]
    Time,
    Project,
}

/// Answer of `completed/get_all`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletedItems {
    #[serde(default, deserialize_with = "null_default")]
    pub items: Vec<Item>,
    #[serde(default, deserialize_with = "null_default")]
    pub projects: HashMap<Id, Project>,
}

impl CompletedItems {
    /// Oldest completion first. `Project` keeps that order within a project.
    pub fn sort(&mut self, order: CompletedOrder) {
        self.items.sort_by_key(Item::completed_at);
        if order == CompletedOrder::Project {
            self.items
                .sort_by_key(|item| item.project_id.as_str().parse::<i64>().unwrap_or(i64::MAX));
        }
    }

    /// Items keyed by their local completion day. Items without a readable
    /// completion date are left out.
    pub fn group_by_completed_date(&self) -> BTreeMap<String, Vec<&Item>> {
        let mut groups: BTreeMap<String, Vec<&Item>> = BTreeMap::new();
        for item in &self.items {
            if let Some(done) = item.completed_at() {
                let day = done.with_timezone(&Local).format(DAY_LAYOUT).to_string();
                groups.entry(day).or_default().push(item);
            }
        }
        groups
    }

    /// Relations from the mirror, topped up with the projects the response
    /// carried (archived projects are often missing from the mirror).
    pub fn relations(&self, mirror: &Mirror) -> ItemRelations {
        let mut relations = item_relations(mirror, &self.items);
        for item in &self.items {
            if relations.projects.contains_key(&item.project_id) {
                continue;
            }
            if let Some(project) = self.projects.get(&item.project_id) {
                relations
                    .projects
                    .insert(item.project_id.clone(), project.clone());
            }
        }
        relations
    }
}

/// Answer of `items/get`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDetails {
    #[serde(default)]
    pub item: Item,
    #[serde(default)]
    pub project: Project,
    #[serde(default, deserialize_with = "null_default")]
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub karma: f64,
    #[serde(default)]
    pub karma_last_update: f64,
    #[serde(default)]
    pub karma_trend: String,
    #[serde(default)]
    pub karma_graph: String,
    #[serde(default)]
    pub completed_count: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub days_items: Vec<DayItems>,
    #[serde(default, deserialize_with = "null_default")]
    pub week_items: Vec<DayItems>,
    #[serde(default, deserialize_with = "null_default")]
    pub karma_update_reasons: Vec<KarmaUpdate>,
    #[serde(default)]
    pub goals: Goals,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayItems {
    #[serde(default)]
    pub date: String,
    #[serde(default, deserialize_with = "null_default")]
    pub items: Vec<ProjectCount>,
    #[serde(default)]
    pub total_completed: i64,
}

/// Completions in one project for a day or week.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectCount {
    #[serde(default)]
    pub id: Id,
    #[serde(default)]
    pub completed: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KarmaUpdate {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub new_karma: f64,
    #[serde(default)]
    pub positive_karma: f64,
    #[serde(default)]
    pub negative_karma: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub positive_karma_reasons: Vec<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub negative_karma_reasons: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Goals {
    #[serde(default)]
    pub user_id: Id,
    #[serde(default)]
    pub daily_goal: i64,
    #[serde(default)]
    pub weekly_goal: i64,
    #[serde(default)]
    pub karma_disabled: i64,
    #[serde(default)]
    pub vacation_mode: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub ignore_days: Vec<i64>,
    #[serde(default)]
    pub current_daily_streak: Streak,
    #[serde(default)]
    pub max_daily_streak: Streak,
    #[serde(default)]
    pub last_daily_streak: Streak,
    #[serde(default)]
    pub current_weekly_streak: Streak,
    #[serde(default)]
    pub max_weekly_streak: Streak,
    #[serde(default)]
    pub last_weekly_streak: Streak,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Streak {
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

pub struct Completed<'a> {
    transport: &'a dyn SyncTransport,
}

impl<'a> Completed<'a> {
    pub(crate) fn new(transport: &'a dyn SyncTransport) -> Self {
        Self { transport }
    }

    pub fn get_all(&self) -> Result<CompletedItems> {
        self.fetch_json(ApiRequest::post("completed/get_all"))
    }

    pub fn get_stats(&self) -> Result<Stats> {
        self.fetch_json(ApiRequest::post("completed/get_stats"))
    }

    /// Completed items of one project, including archived ones.
    pub fn items_in_project(&self, project_id: &Id) -> Result<Vec<Item>> {
        require_id(project_id)?;
        self.fetch_json(ApiRequest::get("items/get_completed").param("project_id", project_id.as_str()))
    }

    /// An item with its project and notes, straight from the server.
    pub fn item(&self, id: &Id) -> Result<ItemDetails> {
        require_id(id)?;
        self.fetch_json(ApiRequest::get("items/get").param("item_id", id.as_str()))
    }

    fn fetch_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let body = self.transport.fetch(&request)?;
        debug!(path = %request.path, bytes = body.len(), "api response received");
        Ok(serde_json::from_str(&body).map_err(TransportError::Decode)?)
    }
}
