use std::sync::Arc;

use anyhow::{Context, anyhow};
use taskdeck_shared::{TaskCreate, TaskFilter, TaskPatch};
use tracing::{debug, info, instrument};

use crate::browse;
use crate::cli::{AddArgs, Command, EditArgs, ListArgs};
use crate::coalescer::FilterInputs;
use crate::config::Config;
use crate::manager::TaskStateManager;
use crate::remote::RemoteStore;
use crate::render::Renderer;
use crate::stats::StatsAccessor;

/// Wiring shared by every command: one store, one manager per session.
pub struct Session {
    pub cfg: Config,
    pub manager: Arc<TaskStateManager>,
    pub stats: StatsAccessor,
    pub renderer: Renderer,
}

impl Session {
    pub fn new(cfg: Config, store: Arc<dyn RemoteStore>) -> anyhow::Result<Self> {
        let ordering = cfg.load_ordering()?;
        let renderer = Renderer::new(&cfg)?;
        Ok(Self {
            manager: Arc::new(TaskStateManager::with_ordering(Arc::clone(&store), ordering)),
            stats: StatsAccessor::new(store),
            renderer,
            cfg,
        })
    }
}

#[instrument(skip(session, command))]
pub async fn dispatch(session: &mut Session, command: Command) -> anyhow::Result<()> {
    debug!(?command, "dispatching command");
    match command {
        Command::List(args) => cmd_list(session, args).await,
        Command::Show { id } => cmd_show(session, &id).await,
        Command::Add(args) => cmd_add(session, args).await,
        Command::Edit(args) => cmd_edit(session, args).await,
        Command::Done { id } => cmd_set_completed(session, &id, true).await,
        Command::Undo { id } => cmd_set_completed(session, &id, false).await,
        Command::Toggle { id } => cmd_toggle(session, &id).await,
        Command::Delete { id } => cmd_delete(session, &id).await,
        Command::Stats => cmd_stats(session).await,
        Command::Browse => browse::run(session).await,
    }
}

fn list_filter(args: ListArgs) -> TaskFilter {
    FilterInputs {
        search: args.search.unwrap_or_default(),
        priority: args.priority,
        category: args.category.unwrap_or_default(),
        completion: args.status,
    }
    .to_filter()
}

async fn cmd_list(session: &mut Session, args: ListArgs) -> anyhow::Result<()> {
    let filter = list_filter(args);
    session.manager.load(filter).await;

    if let Some(status) = session.manager.error() {
        return Err(anyhow!("{}: {}", status.label(), status.detail));
    }

    let tasks = session.manager.tasks();
    session.renderer.print_task_table(&tasks)
}

async fn cmd_show(session: &mut Session, id: &str) -> anyhow::Result<()> {
    let task = session
        .manager
        .get(id)
        .await
        .with_context(|| format!("failed to fetch task {id}"))?;
    session.renderer.print_task_info(&task)
}

async fn cmd_add(session: &mut Session, args: AddArgs) -> anyhow::Result<()> {
    let draft = TaskCreate {
        title: args.title.join(" "),
        description: args.description,
        priority: args.priority,
        category: args.category,
        due_date: args.due,
    };

    let created = session
        .manager
        .create(draft)
        .await
        .context("failed to create task")?;
    info!(id = %created.id, "created task");
    println!("Created task {}.", created.id);
    Ok(())
}

async fn cmd_edit(session: &mut Session, args: EditArgs) -> anyhow::Result<()> {
    if args.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(anyhow!("task title must not be blank"));
    }

    let patch = TaskPatch {
        title: args.title.map(|t| t.trim().to_string()),
        description: args.description,
        completed: None,
        priority: args.priority,
        category: args.category,
        due_date: args.due,
    };
    if patch.is_empty() {
        return Err(anyhow!("nothing to change; pass at least one field"));
    }

    let updated = session
        .manager
        .update(&args.id, patch)
        .await
        .with_context(|| format!("failed to update task {}", args.id))?;
    println!("Modified task {}.", updated.id);
    Ok(())
}

async fn cmd_set_completed(session: &mut Session, id: &str, completed: bool) -> anyhow::Result<()> {
    let updated = session
        .manager
        .update(id, TaskPatch::completed(completed))
        .await
        .with_context(|| format!("failed to update task {id}"))?;
    println!(
        "Marked task {} {}.",
        updated.id,
        if updated.completed { "completed" } else { "pending" }
    );
    Ok(())
}

async fn cmd_toggle(session: &mut Session, id: &str) -> anyhow::Result<()> {
    session.manager.load(TaskFilter::default()).await;
    if let Some(status) = session.manager.error() {
        return Err(anyhow!("{}: {}", status.label(), status.detail));
    }

    let updated = session
        .manager
        .toggle_complete(id)
        .await
        .with_context(|| format!("failed to toggle task {id}"))?;
    println!(
        "Marked task {} {}.",
        updated.id,
        if updated.completed { "completed" } else { "pending" }
    );
    Ok(())
}

async fn cmd_delete(session: &mut Session, id: &str) -> anyhow::Result<()> {
    session
        .manager
        .delete(id)
        .await
        .with_context(|| format!("failed to delete task {id}"))?;
    println!("Deleted task {id}.");
    Ok(())
}

async fn cmd_stats(session: &mut Session) -> anyhow::Result<()> {
    let stats = session
        .stats
        .fetch_stats()
        .await
        .context("failed to fetch stats")?;
    session.renderer.print_stats(&stats)
}
