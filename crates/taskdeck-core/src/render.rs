use std::io::{self, IsTerminal, Write};

use chrono::{Local, NaiveDate};
use taskdeck_shared::{StatBucket, TaskDto, TaskPriority, TaskStats};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::manager::ViewState;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            color: cfg.color()?,
        })
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_task_table(&mut self, tasks: &[TaskDto]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let today = Local::now().date_naive();
        let table = self.task_table(tasks, today);
        write_table(&mut out, table.0, table.1)?;
        writeln!(
            out,
            "{} {}",
            tasks.len(),
            if tasks.len() == 1 { "task" } else { "tasks" }
        )?;
        Ok(())
    }

    fn task_table(&self, tasks: &[TaskDto], today: NaiveDate) -> (Vec<String>, Vec<Vec<String>>) {
        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Pri".to_string(),
            "Category".to_string(),
            "Due".to_string(),
            "Title".to_string(),
        ];

        let rows = tasks
            .iter()
            .map(|task| {
                let done = if task.completed { "[x]" } else { "[ ]" }.to_string();

                let priority = match task.priority {
                    TaskPriority::High => self.paint("high", "31"),
                    TaskPriority::Medium => self.paint("medium", "33"),
                    TaskPriority::Low => self.paint("low", "32"),
                };

                let due = task
                    .due_date
                    .map(|date| {
                        let text = date.format("%Y-%m-%d").to_string();
                        if !task.completed && date < today {
                            self.paint(&text, "31")
                        } else {
                            text
                        }
                    })
                    .unwrap_or_default();

                let title = if task.completed {
                    self.paint(&task.title, "2")
                } else {
                    task.title.clone()
                };

                vec![
                    self.paint(&task.id, "33"),
                    done,
                    priority,
                    task.category.clone(),
                    due,
                    title,
                ]
            })
            .collect();

        (headers, rows)
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_info(&mut self, task: &TaskDto) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "title       {}", task.title)?;
        writeln!(
            out,
            "description {}",
            task.description.clone().unwrap_or_default()
        )?;
        writeln!(
            out,
            "status      {}",
            if task.completed { "completed" } else { "pending" }
        )?;
        writeln!(out, "priority    {}", task.priority)?;
        writeln!(out, "category    {}", task.category)?;
        if let Some(due) = task.due_date {
            writeln!(out, "due         {}", due.format("%Y-%m-%d"))?;
        }
        writeln!(out, "created     {}", task.created_at.format("%Y-%m-%dT%H:%M:%SZ"))?;
        writeln!(out, "modified    {}", task.updated_at.format("%Y-%m-%dT%H:%M:%SZ"))?;

        Ok(())
    }

    pub fn print_stats(&mut self, stats: &TaskStats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "total       {}", stats.total)?;
        writeln!(out, "completed   {}", self.paint(&stats.completed.to_string(), "32"))?;
        writeln!(out, "pending     {}", self.paint(&stats.pending.to_string(), "33"))?;

        for (label, buckets) in [
            ("by priority", &stats.by_priority),
            ("by category", &stats.by_category),
        ] {
            if buckets.is_empty() {
                continue;
            }
            writeln!(out)?;
            writeln!(out, "{label}")?;
            write_table(
                &mut out,
                vec!["Key".to_string(), "Count".to_string()],
                bucket_rows(buckets),
            )?;
        }

        Ok(())
    }

    /// Loading and error lines shown above a browse listing.
    pub fn print_view_status(&mut self, view: &ViewState) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if view.loading {
            writeln!(out, "{}", self.paint("loading...", "36"))?;
        }
        if let Some(status) = view.error.as_ref() {
            writeln!(out, "{}", self.paint(status.label(), "31"))?;
        }
        Ok(())
    }

    pub fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn bucket_rows(buckets: &[StatBucket]) -> Vec<Vec<String>> {
    buckets
        .iter()
        .map(|bucket| vec![bucket.key.clone(), bucket.count.to_string()])
        .collect()
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
