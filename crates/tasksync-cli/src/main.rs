mod version;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use tasksync_core::completed::{CompletedItems, CompletedOrder};
use tasksync_core::config::{
    client_options_from, config_path, load_config, resolve_tasksync_home_dir, validate_endpoint,
    write_config, TOKEN_ENV,
};
use tasksync_core::model::{Due, Filter, Item, Label, Note, Project};
use tasksync_core::relation::ItemRelations;
use tasksync_core::time::{end_of_next_7_days, end_of_today};
use tasksync_core::{Client, Id};

#[derive(Parser)]
#[command(name = "tasksync", version = version::FULL, about = "Local-first task sync client")]
struct Cli {
    /// API token; falls back to the config file.
    #[arg(long, global = true, env = TOKEN_ENV, hide_env_values = true)]
    token: Option<String>,
    /// Override the snapshot directory.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
    /// Print JSON instead of plain lines.
    #[arg(long, global = true)]
    json: bool,
    /// Debug logging on stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Pull changes since the last sync
    Sync {
        /// Discard the local mirror and pull everything
        #[arg(long)]
        full: bool,
    },
    /// Show cursor, cached entity counts and snapshot location
    Status,
    /// Forget the cursor and pull everything again
    Reset,
    /// Projects
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    /// Items (tasks)
    Item {
        #[command(subcommand)]
        command: ItemCommand,
    },
    /// Labels
    Label {
        #[command(subcommand)]
        command: LabelCommand,
    },
    /// Saved filters
    Filter {
        #[command(subcommand)]
        command: FilterCommand,
    },
    /// Comments on items
    Note {
        #[command(subcommand)]
        command: NoteCommand,
    },
    /// Karma, streaks and completion counts from the server
    Stats,
    /// Read or edit the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Print version information
    Version,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the config file (the token is masked)
    Show,
    /// Store one setting in the config file
    Set { key: ConfigKey, value: String },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ConfigKey {
    Token,
    Endpoint,
    CacheDir,
    TimeoutSecs,
}

#[derive(Subcommand)]
enum ProjectCommand {
    List,
    Add {
        name: String,
        /// Parent project name or id
        #[arg(long)]
        parent: Option<String>,
    },
}

#[derive(Subcommand)]
enum ItemCommand {
    List {
        /// Only items in this project (name or id)
        #[arg(long)]
        project: Option<String>,
        /// Only items carrying this label
        #[arg(long)]
        label: Option<String>,
        /// Only items due before the end of `today` or `week`
        #[arg(long)]
        due: Option<DueWindow>,
    },
    Add {
        content: String,
        #[arg(long)]
        project: Option<String>,
        #[arg(long = "label")]
        labels: Vec<String>,
        /// Natural-language due date, e.g. "tomorrow 9am"
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        priority: Option<i64>,
    },
    Update {
        id: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        priority: Option<i64>,
    },
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    Complete {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Keep completed sub-tasks in history
        #[arg(long)]
        force_history: bool,
    },
    Move {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Destination project name or id
        #[arg(long)]
        to: String,
    },
    /// Completed items, fetched from the server
    Completed {
        /// Only this project (name or id), archived ones included
        #[arg(long)]
        project: Option<String>,
        #[arg(long, value_enum, default_value = "time")]
        sort: CompletedSort,
    },
    /// One item with its project and notes, fetched from the server
    Show { id: String },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CompletedSort {
    Time,
    Project,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum DueWindow {
    Today,
    Week,
}

#[derive(Subcommand)]
enum LabelCommand {
    List,
    Add { name: String },
}

#[derive(Subcommand)]
enum FilterCommand {
    List,
    Add { name: String, query: String },
}

#[derive(Subcommand)]
enum NoteCommand {
    Add { item_id: String, content: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command.as_ref() else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Command::Version => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&version::as_json())?);
            } else {
                println!("tasksync {}", version::FULL);
            }
        }
        Command::Sync { full } => {
            let mut client = open_client(&cli)?;
            if *full {
                client.full_sync().context("Full sync failed")?;
            } else {
                client.sync(&[]).context("Sync failed")?;
            }
            print_status(&client, cli.json)?;
        }
        Command::Status => {
            let client = open_client(&cli)?;
            print_status(&client, cli.json)?;
        }
        Command::Reset => {
            let mut client = open_client(&cli)?;
            client.reset_cursor();
            client.sync(&[]).context("Sync failed")?;
            print_status(&client, cli.json)?;
        }
        Command::Project { command } => run_project(&cli, command)?,
        Command::Item { command } => run_item(&cli, command)?,
        Command::Label { command } => run_label(&cli, command)?,
        Command::Filter { command } => run_filter(&cli, command)?,
        Command::Note { command } => run_note(&cli, command)?,
        Command::Stats => {
            let client = open_client(&cli)?;
            let stats = client
                .completed()
                .get_stats()
                .context("Failed to fetch stats")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("karma: {} ({})", stats.karma, stats.karma_trend);
                println!("completed: {}", stats.completed_count);
                let goals = &stats.goals;
                println!(
                    "daily: goal {}, streak {}",
                    goals.daily_goal, goals.current_daily_streak.count
                );
                println!(
                    "weekly: goal {}, streak {}",
                    goals.weekly_goal, goals.current_weekly_streak.count
                );
            }
        }
        Command::Config { command } => run_config(&cli, command)?,
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "tasksync=debug,tasksync_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_client(cli: &Cli) -> Result<Client> {
    let home = tasksync_home()?;
    let config = load_config(&home)
        .with_context(|| format!("Failed to read config under {}", home.display()))?
        .unwrap_or_default();
    let mut options = client_options_from(&home, config, cli.token.clone())?;
    if let Some(dir) = cli.cache_dir.as_ref() {
        options.cache_dir = Some(dir.clone());
    }
    debug!(home = %home.display(), "opening client");
    Client::new(options).context("Failed to open tasksync client")
}

fn tasksync_home() -> Result<PathBuf> {
    resolve_tasksync_home_dir()
        .ok_or_else(|| anyhow!("Unable to resolve home directory; set TASKSYNC_HOME"))
}

fn run_config(cli: &Cli, command: &ConfigCommand) -> Result<()> {
    let home = tasksync_home()?;
    let mut config = load_config(&home)
        .with_context(|| format!("Failed to read config under {}", home.display()))?
        .unwrap_or_default();
    match command {
        ConfigCommand::Show => {
            if let Some(token) = config.token.as_mut() {
                *token = mask_token(token);
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("path: {}", config_path(&home).display());
                println!("token: {}", config.token.as_deref().unwrap_or("-"));
                println!("endpoint: {}", config.endpoint.as_deref().unwrap_or("-"));
                println!("cache_dir: {}", config.cache_dir.as_deref().unwrap_or("-"));
                match config.timeout_secs {
                    Some(secs) => println!("timeout_secs: {secs}"),
                    None => println!("timeout_secs: -"),
                }
            }
        }
        ConfigCommand::Set { key, value } => {
            let value = value.trim();
            match key {
                ConfigKey::Token => {
                    if value.is_empty() {
                        bail!("Token must not be empty");
                    }
                    config.token = Some(value.to_string());
                }
                ConfigKey::Endpoint => {
                    validate_endpoint(value)?;
                    config.endpoint = Some(value.to_string());
                }
                ConfigKey::CacheDir => config.cache_dir = Some(value.to_string()),
                ConfigKey::TimeoutSecs => {
                    let secs = value
                        .parse::<u64>()
                        .with_context(|| format!("Invalid timeout: {value}"))?;
                    config.timeout_secs = Some(secs);
                }
            }
            let path = write_config(&home, &config)?;
            debug!(path = %path.display(), "config written");
            if cli.json {
                println!("{}", json!({ "path": path.to_string_lossy() }));
            } else {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}

fn mask_token(token: &str) -> String {
    let keep_from = token.chars().count().saturating_sub(4);
    let tail: String = token.chars().skip(keep_from).collect();
    format!("****{tail}")
}

fn run_project(cli: &Cli, command: &ProjectCommand) -> Result<()> {
    let mut client = open_client(cli)?;
    match command {
        ProjectCommand::List => {
            let projects = client.state().projects.get_all();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(projects)?);
            } else {
                for project in projects {
                    println!("{}\t{}", project.id, project.display_name());
                }
            }
        }
        ProjectCommand::Add { name, parent } => {
            let parent_id = match parent {
                Some(value) => resolve_project(&client, value)?,
                None => Id::default(),
            };
            let project = client.projects().add(Project {
                name: name.clone(),
                parent_id,
                ..Project::default()
            })?;
            client.commit().context("Failed to push project")?;
            print_created(&client, &project.id, cli.json);
        }
    }
    Ok(())
}

fn run_item(cli: &Cli, command: &ItemCommand) -> Result<()> {
    let mut client = open_client(cli)?;
    match command {
        ItemCommand::List {
            project,
            label,
            due,
        } => {
            let project_id = project
                .as_deref()
                .map(|value| resolve_project(&client, value))
                .transpose()?;
            let label_id = label
                .as_deref()
                .map(|value| resolve_label(&client, value))
                .transpose()?;
            let deadline = due.map(|window| match window {
                DueWindow::Today => end_of_today(),
                DueWindow::Week => end_of_next_7_days(),
            });
            let items = &client.state().items;
            let mut selected: Vec<&Item> = match deadline {
                Some(deadline) => items.find_due_before(deadline),
                None => items.get_all().iter().collect(),
            };
            if let Some(project_id) = project_id.as_ref() {
                selected.retain(|item| &item.project_id == project_id);
            }
            if let Some(label_id) = label_id.as_ref() {
                selected.retain(|item| item.labels.contains(label_id));
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&selected)?);
            } else {
                let owned: Vec<Item> = selected.iter().map(|item| (*item).clone()).collect();
                let relations = client.relations_for_items(&owned);
                print_item_rows(&owned, &relations, |item| {
                    item.due
                        .as_ref()
                        .map(|due| due.date.clone())
                        .unwrap_or_default()
                });
            }
        }
        ItemCommand::Add {
            content,
            project,
            labels,
            due,
            priority,
        } => {
            let project_id = match project {
                Some(value) => resolve_project(&client, value)?,
                None => Id::default(),
            };
            let label_ids = labels
                .iter()
                .map(|value| resolve_label(&client, value))
                .collect::<Result<Vec<_>>>()?;
            let item = client.items().add(Item {
                content: content.clone(),
                project_id,
                labels: label_ids,
                due: due.as_deref().map(Due::from_text),
                priority: priority.unwrap_or_default(),
                ..Item::default()
            })?;
            client.commit().context("Failed to push item")?;
            if client.confirmed_id(&item.id).is_none() {
                // Server did not report the mapping; find the item by content.
                client.full_sync().context("Full sync failed")?;
            }
            let id = client
                .confirmed_id(&item.id)
                .cloned()
                .or_else(|| client.locate_created_item(content).map(|found| found.id.clone()))
                .unwrap_or(item.id);
            print_created(&client, &id, cli.json);
        }
        ItemCommand::Update {
            id,
            content,
            due,
            priority,
        } => {
            let id = Id::new(id)?;
            let mut item = match client.state().items.resolve(&id) {
                Some(cached) => cached.clone(),
                None if content.is_some() => Item {
                    id: id.clone(),
                    ..Item::default()
                },
                None => bail!("Item {id} is not cached; run `tasksync sync` or pass --content"),
            };
            if let Some(content) = content {
                item.content = content.clone();
            }
            if let Some(due) = due {
                item.due = Some(Due::from_text(due));
            }
            if let Some(priority) = priority {
                item.priority = *priority;
            }
            client.items().update(item)?;
            client.commit().context("Failed to push update")?;
        }
        ItemCommand::Delete { ids } => {
            let ids = Id::parse_many(ids)?;
            client.items().delete(&ids)?;
            client.commit().context("Failed to push delete")?;
        }
        ItemCommand::Complete { ids, force_history } => {
            let ids = Id::parse_many(ids)?;
            client.items().complete(&ids, *force_history)?;
            client.commit().context("Failed to push completion")?;
        }
        ItemCommand::Move { ids, to } => {
            let ids = Id::parse_many(ids)?;
            let to_project = resolve_project(&client, to)?;
            client.items().move_items(&ids, to_project)?;
            client.commit().context("Failed to push move")?;
        }
        ItemCommand::Completed { project, sort } => {
            let mut completed = match project {
                Some(value) => {
                    let project_id = resolve_project(&client, value)?;
                    CompletedItems {
                        items: client
                            .completed()
                            .items_in_project(&project_id)
                            .context("Failed to fetch completed items")?,
                        ..CompletedItems::default()
                    }
                }
                None => client
                    .completed()
                    .get_all()
                    .context("Failed to fetch completed items")?,
            };
            completed.sort(match sort {
                CompletedSort::Time => CompletedOrder::Time,
                CompletedSort::Project => CompletedOrder::Project,
            });
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&completed.items)?);
            } else {
                let relations = completed.relations(client.state());
                print_item_rows(&completed.items, &relations, |item| {
                    item.date_completed.clone().unwrap_or_default()
                });
            }
        }
        ItemCommand::Show { id } => {
            let id = Id::new(id)?;
            let details = client
                .completed()
                .item(&id)
                .context("Failed to fetch item")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&details)?);
            } else {
                println!("{}\t#{}\t{}", details.item.id, details.project.name, details.item.content);
                for note in &details.notes {
                    println!("  - {}", note.content);
                }
            }
        }
    }
    Ok(())
}

fn run_label(cli: &Cli, command: &LabelCommand) -> Result<()> {
    let mut client = open_client(cli)?;
    match command {
        LabelCommand::List => {
            let labels = client.state().labels.get_all();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(labels)?);
            } else {
                for label in labels {
                    println!("{}\t{}", label.id, label.display_name());
                }
            }
        }
        LabelCommand::Add { name } => {
            let name = name.strip_prefix('@').unwrap_or(name);
            let label = client.labels().add(Label {
                name: name.to_string(),
                ..Label::default()
            })?;
            client.commit().context("Failed to push label")?;
            print_created(&client, &label.id, cli.json);
        }
    }
    Ok(())
}

fn run_filter(cli: &Cli, command: &FilterCommand) -> Result<()> {
    let mut client = open_client(cli)?;
    match command {
        FilterCommand::List => {
            let filters = client.state().filters.get_all();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(filters)?);
            } else {
                for filter in filters {
                    println!("{}\t{}\t{}", filter.id, filter.name, filter.query);
                }
            }
        }
        FilterCommand::Add { name, query } => {
            let filter = client.filters().add(Filter {
                name: name.clone(),
                query: query.clone(),
                ..Filter::default()
            })?;
            client.commit().context("Failed to push filter")?;
            print_created(&client, &filter.id, cli.json);
        }
    }
    Ok(())
}

fn run_note(cli: &Cli, command: &NoteCommand) -> Result<()> {
    let mut client = open_client(cli)?;
    match command {
        NoteCommand::Add { item_id, content } => {
            let note = client.notes().add(Note {
                item_id: Id::new(item_id)?,
                content: content.clone(),
                ..Note::default()
            })?;
            client.commit().context("Failed to push note")?;
            print_created(&client, &note.id, cli.json);
        }
    }
    Ok(())
}

/// Accepts an id or a (partial) project name.
fn resolve_project(client: &Client, value: &str) -> Result<Id> {
    if let Ok(id) = Id::new(value) {
        return Ok(id);
    }
    let name = value.strip_prefix('#').unwrap_or(value);
    client
        .state()
        .projects
        .find_one_by_name(name)
        .map(|project| project.id.clone())
        .ok_or_else(|| anyhow!("Unknown project: {value}"))
}

fn resolve_label(client: &Client, value: &str) -> Result<Id> {
    if let Ok(id) = Id::new(value) {
        return Ok(id);
    }
    client
        .state()
        .labels
        .find_one_by_name(value)
        .map(|label| label.id.clone())
        .ok_or_else(|| anyhow!("Unknown label: {value}"))
}

fn print_created(client: &Client, temp_id: &Id, json: bool) {
    let id = client.confirmed_id(temp_id).unwrap_or(temp_id);
    if json {
        println!("{}", json!({ "id": id.as_str() }));
    } else {
        println!("{id}");
    }
}

fn print_item_rows(items: &[Item], relations: &ItemRelations, date_of: impl Fn(&Item) -> String) {
    for item in items {
        let project = relations
            .project_for(item)
            .map(|project| format!("#{}", project.name))
            .unwrap_or_default();
        let labels = relations
            .labels_for(item)
            .iter()
            .map(|label| label.display_name())
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "{}\t{}\t{}\t{}\t{}",
            item.id,
            date_of(item),
            project,
            item.content,
            labels
        );
    }
}

fn print_status(client: &Client, json: bool) -> Result<()> {
    let state = client.state();
    let snapshot = client.snapshot_store().mirror_path();
    if json {
        let status = json!({
            "cursor": client.cursor(),
            "pending": client.pending().len(),
            "projects": state.projects.len(),
            "items": state.items.len(),
            "labels": state.labels.len(),
            "filters": state.filters.len(),
            "notes": state.notes.len(),
            "snapshot": snapshot.to_string_lossy(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("cursor: {}", client.cursor());
        println!("pending: {}", client.pending().len());
        println!(
            "projects: {}, items: {}, labels: {}, filters: {}, notes: {}",
            state.projects.len(),
            state.items.len(),
            state.labels.len(),
            state.filters.len(),
            state.notes.len()
        );
        println!("snapshot: {}", snapshot.display());
    }
    Ok(())
}
