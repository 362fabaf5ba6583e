use std::sync::Arc;

use anyhow::Context;
use taskdeck_shared::{TaskCreate, TaskFilter, TaskPriority};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::coalescer::{Completion, FilterCoalescer};
use crate::commands::Session;
use crate::stats::StatsPanel;

const HELP: &str = "\
commands:
  search <text>        filter by title/description text (empty clears)
  priority <p|any>     low, medium, high or any
  category <name>      filter by category (empty clears)
  status <s>           all, pending or completed
  clear                drop every filter
  add <title>          create a task
  toggle <id>          flip completion
  delete <id>          delete a task
  refresh              reload with the current filters
  stats                show or hide statistics
  quit                 leave";

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Search(String),
    Priority(Option<TaskPriority>),
    Category(String),
    Status(Completion),
    Clear,
    Add(String),
    Toggle(String),
    Delete(String),
    Refresh,
    Stats,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map(|(w, r)| (w, r.trim()))
        .unwrap_or((line, ""));

    match word {
        "search" | "/" => Ok(Input::Search(rest.to_string())),
        "priority" => {
            if rest.is_empty() || rest == "any" {
                Ok(Input::Priority(None))
            } else {
                rest.parse::<TaskPriority>()
                    .map(|p| Input::Priority(Some(p)))
                    .map_err(|e| e.to_string())
            }
        }
        "category" => Ok(Input::Category(rest.to_string())),
        "status" => rest
            .parse::<Completion>()
            .map(Input::Status)
            .map_err(|e| e.to_string()),
        "clear" => Ok(Input::Clear),
        "add" if !rest.is_empty() => Ok(Input::Add(rest.to_string())),
        "toggle" if !rest.is_empty() => Ok(Input::Toggle(rest.to_string())),
        "delete" if !rest.is_empty() => Ok(Input::Delete(rest.to_string())),
        "refresh" => Ok(Input::Refresh),
        "stats" => Ok(Input::Stats),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" | "q" => Ok(Input::Quit),
        "" => Err(String::new()),
        other => Err(format!("unrecognised input '{other}'; type help")),
    }
}

/// Line-driven view over the manager. Filter edits go through the coalescer;
/// every published state change re-renders the list.
pub async fn run(session: &mut Session) -> anyhow::Result<()> {
    let debounce = session.cfg.debounce()?;
    let coalescer = FilterCoalescer::new(Arc::clone(&session.manager), debounce);
    let mut panel = StatsPanel::new(session.stats.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    info!(debounce_ms = debounce.as_millis() as u64, "starting browse session");
    println!("{HELP}");
    session.manager.load(TaskFilter::default()).await;
    render(session)?;
    let mut updates = session.manager.subscribe();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                render(session)?;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed reading input")? else {
                    break;
                };
                let input = match parse_input(&line) {
                    Ok(input) => input,
                    Err(msg) => {
                        if !msg.is_empty() {
                            println!("{msg}");
                        }
                        continue;
                    }
                };
                debug!(?input, "browse input");

                match input {
                    Input::Search(text) => coalescer.set_search(text),
                    Input::Priority(priority) => coalescer.set_priority(priority),
                    Input::Category(category) => coalescer.set_category(category),
                    Input::Status(completion) => coalescer.set_completion(completion),
                    Input::Clear => coalescer.clear(),
                    Input::Add(title) => {
                        if let Err(err) = session.manager.create(TaskCreate::new(title)).await {
                            println!("add failed: {err}");
                        }
                    }
                    Input::Toggle(id) => {
                        if let Err(err) = session.manager.toggle_complete(&id).await {
                            println!("toggle failed: {err}");
                        }
                    }
                    Input::Delete(id) => {
                        if let Err(err) = session.manager.delete(&id).await {
                            println!("delete failed: {err}");
                        }
                    }
                    Input::Refresh => session.manager.refresh().await,
                    Input::Stats => {
                        if panel.toggle().await {
                            match panel.snapshot() {
                                Some(stats) => session.renderer.print_stats(stats)?,
                                None => warn!("stats unavailable"),
                            }
                        } else {
                            println!("stats hidden");
                        }
                    }
                    Input::Help => println!("{HELP}"),
                    Input::Quit => break,
                }
            }
        }
    }

    coalescer.shutdown();
    info!("browse session ended");
    Ok(())
}

fn render(session: &mut Session) -> anyhow::Result<()> {
    let view = session.manager.snapshot();
    println!();
    session.renderer.print_view_status(&view)?;
    session.renderer.print_task_table(&view.tasks)
}
