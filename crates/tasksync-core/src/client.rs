use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::Mirror;
use crate::command::{Command, CommandQueue};
use crate::completed::Completed;
use crate::config::{default_cache_dir, resolve_tasksync_home_dir, validate_endpoint, ConfigError};
use crate::error::{Error, Result};
use crate::filters::Filters;
use crate::id::{Id, IdError};
use crate::items::Items;
use crate::labels::Labels;
use crate::model::{Item, SyncState};
use crate::notes::Notes;
use crate::projects::Projects;
use crate::relation::{item_relations, ItemRelations};
use crate::snapshot::SnapshotStore;
use crate::transport::{HttpTransport, SyncTransport, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};

/// Cursor value that asks the server for everything.
pub const FULL_SYNC_CURSOR: &str = "*";

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub token: String,
    /// Defaults to [`DEFAULT_ENDPOINT`].
    pub endpoint: Option<String>,
    /// Defaults to `<tasksync home>/cache`.
    pub cache_dir: Option<PathBuf>,
    pub timeout: Duration,
}

impl ClientOptions {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            endpoint: None,
            cache_dir: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// One sync session: the local mirror, the cursor, and the pending commands.
///
/// Mutations go through the per-kind handles ([`Client::items`] and friends),
/// which enqueue commands; [`Client::commit`] pushes them and merges the
/// server's answer back into the mirror.
pub struct Client {
    transport: Box<dyn SyncTransport>,
    store: SnapshotStore,
    cursor: String,
    mirror: Mirror,
    queue: CommandQueue,
    confirmed: HashMap<Id, Id>,
}

impl Client {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let token = options.token.trim().to_string();
        if token.is_empty() {
            return Err(ConfigError::MissingToken.into());
        }
        let endpoint = options
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        validate_endpoint(&endpoint)?;
        let cache_dir = match options.cache_dir {
            Some(dir) => dir,
            None => default_cache_dir(&resolve_tasksync_home_dir().ok_or(ConfigError::MissingHome)?),
        };
        fs::create_dir_all(&cache_dir).map_err(ConfigError::from)?;

        let transport = HttpTransport::new(&endpoint, &token, options.timeout);
        Ok(Self::with_transport(
            Box::new(transport),
            SnapshotStore::new(cache_dir, &token),
        ))
    }

    /// Builds a session over any transport, restoring the last snapshot when
    /// one is readable. An unreadable snapshot means the next sync is a full
    /// pull.
    pub fn with_transport(transport: Box<dyn SyncTransport>, store: SnapshotStore) -> Self {
        let (mirror, cursor) = match store.load() {
            Ok((mirror, cursor)) => {
                debug!(
                    cursor = %cursor,
                    entities = mirror.entity_count(),
                    "restored snapshot"
                );
                (mirror, cursor)
            }
            Err(err) if err.is_missing() => {
                debug!(dir = %store.dir().display(), "no snapshot yet; starting empty");
                (Mirror::default(), FULL_SYNC_CURSOR.to_string())
            }
            Err(err) => {
                warn!(error = %err, "snapshot unreadable; starting from an empty mirror");
                (Mirror::default(), FULL_SYNC_CURSOR.to_string())
            }
        };
        Self {
            transport,
            store,
            cursor,
            mirror,
            queue: CommandQueue::new(),
            confirmed: HashMap::new(),
        }
    }

    pub fn projects(&mut self) -> Projects<'_> {
        Projects::new(self)
    }

    pub fn items(&mut self) -> Items<'_> {
        Items::new(self)
    }

    pub fn labels(&mut self) -> Labels<'_> {
        Labels::new(self)
    }

    pub fn filters(&mut self) -> Filters<'_> {
        Filters::new(self)
    }

    pub fn notes(&mut self) -> Notes<'_> {
        Notes::new(self)
    }

    /// Server-side reads (completed items, stats, item details). These never
    /// touch the mirror.
    pub fn completed(&self) -> Completed<'_> {
        Completed::new(self.transport.as_ref())
    }

    /// Read-only view of the mirror.
    pub fn state(&self) -> &Mirror {
        &self.mirror
    }

    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    pub fn pending(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn snapshot_store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Pushes every pending command. A failed exchange leaves the batch
    /// queued so the caller can retry.
    pub fn commit(&mut self) -> Result<()> {
        if self.queue.is_empty() {
            debug!("nothing to commit");
            return Ok(());
        }
        let batch = self.queue.drain();
        if let Err(err) = self.exchange_and_merge(&batch) {
            warn!(commands = batch.len(), error = %err, "commit failed; keeping commands queued");
            self.queue.restore(batch);
            return Err(err);
        }
        self.persist()
    }

    /// Sends `commands` with the current cursor and folds the response into
    /// the mirror, then persists mirror and cursor.
    pub fn sync(&mut self, commands: &[Command]) -> Result<()> {
        self.exchange_and_merge(commands)?;
        self.persist()
    }

    /// Drops the mirror and cursor and pulls everything again.
    pub fn full_sync(&mut self) -> Result<()> {
        self.cursor = FULL_SYNC_CURSOR.to_string();
        self.mirror.clear();
        self.sync(&[])
    }

    /// Makes the next sync a full pull while keeping the cached entities.
    pub fn reset_cursor(&mut self) {
        self.cursor = FULL_SYNC_CURSOR.to_string();
    }

    /// Server-assigned id for a temp id, when a response carried the mapping.
    pub fn confirmed_id(&self, temp_id: &Id) -> Option<&Id> {
        self.confirmed.get(temp_id)
    }

    /// Best-effort lookup of an item created earlier in this session, for
    /// servers that do not report temp id mappings. Among items whose content
    /// contains `content`, the most recently added one wins; ties fall back to
    /// mirror order.
    pub fn locate_created_item(&self, content: &str) -> Option<&Item> {
        self.mirror
            .items
            .find_by_content(content)
            .into_iter()
            .enumerate()
            .max_by_key(|(position, item)| (item.added_at(), *position))
            .map(|(_, item)| item)
    }

    pub fn relations_for_items(&self, items: &[Item]) -> ItemRelations {
        item_relations(&self.mirror, items)
    }

    pub(crate) fn enqueue(&mut self, command: Command) {
        debug!(kind = command.kind(), uuid = %command.uuid, "queued command");
        self.queue.enqueue(command);
    }

    pub(crate) fn mirror_mut(&mut self) -> &mut Mirror {
        &mut self.mirror
    }

    fn exchange_and_merge(&mut self, commands: &[Command]) -> Result<()> {
        let state = self.transport.exchange(&self.cursor, commands)?;
        self.apply(state);
        Ok(())
    }

    fn apply(&mut self, state: SyncState) {
        info!(
            full_sync = state.full_sync,
            entities = state.entity_count(),
            mapped = state.temp_id_mapping.len(),
            "merging sync response"
        );
        if !state.sync_token.is_empty() {
            self.cursor = state.sync_token.clone();
        }
        self.confirmed.extend(
            state
                .temp_id_mapping
                .iter()
                .map(|(temp, real)| (temp.clone(), real.clone())),
        );
        self.mirror.merge(state);
    }

    fn persist(&self) -> Result<()> {
        self.store.save(&self.mirror, &self.cursor)?;
        debug!(path = %self.store.mirror_path().display(), "snapshot written");
        Ok(())
    }
}

/// Rejects the empty identifier before anything is enqueued.
pub(crate) fn require_id(id: &Id) -> Result<()> {
    if id.is_zero() || !id.is_valid() {
        return Err(IdError::Invalid(id.as_str().to_string()).into());
    }
    Ok(())
}

pub(crate) fn require_ids(ids: &[Id]) -> Result<()> {
    if ids.is_empty() {
        return Err(Error::validation("At least one id is required"));
    }
    ids.iter().try_for_each(require_id)
}
