// Projection of the task list into a printable view

use crate::filter::Filter;
use crate::task::{Task, TaskId};
use crate::time::human_time;
use chrono::{DateTime, Utc};
use colored::Colorize;
use std::fmt::Write;

/// One visible task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub age: String,
    pub controls: Controls,
}

/// Actions offered next to a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controls {
    pub toggle: &'static str,
    pub edit: &'static str,
    pub delete: &'static str,
}

impl Controls {
    fn for_task(task: &Task) -> Self {
        Self {
            toggle: if task.completed { "Mark incomplete" } else { "Mark complete" },
            edit: "Edit task",
            delete: "Delete task",
        }
    }
}

/// Body of a rendered view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Rows(Vec<Row>),
    Placeholder(&'static str),
}

/// Complete view for one filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub filter: Filter,
    pub total: usize,
    pub body: Body,
}

/// Build the view for `filter`; pure, order preserving
pub fn project(tasks: &[Task], filter: Filter, now: DateTime<Utc>) -> View {
    let rows: Vec<Row> = filter
        .apply(tasks)
        .into_iter()
        .map(|task| Row {
            id: task.id,
            text: task.text.clone(),
            completed: task.completed,
            age: human_time(task.created, now),
            controls: Controls::for_task(task),
        })
        .collect();

    let body = if rows.is_empty() {
        Body::Placeholder(placeholder(filter))
    } else {
        Body::Rows(rows)
    };

    View {
        filter,
        total: tasks.len(),
        body,
    }
}

fn placeholder(filter: Filter) -> &'static str {
    match filter {
        Filter::Completed => "No completed tasks yet",
        Filter::All | Filter::Active => "No tasks here. Add something meaningful.",
    }
}

impl View {
    pub fn rows(&self) -> &[Row] {
        match &self.body {
            Body::Rows(rows) => rows,
            Body::Placeholder(_) => &[],
        }
    }

    /// Full-replace text rendering
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        let bar: Vec<String> = Filter::ALL
            .iter()
            .map(|f| {
                if *f == self.filter {
                    format!("[{}]", f).bold().cyan().to_string()
                } else {
                    format!(" {} ", f).dimmed().to_string()
                }
            })
            .collect();
        let _ = writeln!(out, "{}  {}", bar.join(" "), format!("{} total", self.total).dimmed());

        match &self.body {
            Body::Placeholder(message) => {
                let _ = writeln!(out, "  {}", message.dimmed());
            }
            Body::Rows(rows) => {
                let width = rows.iter().map(|r| r.id.to_string().len()).max().unwrap_or(1);
                for row in rows {
                    let mark = if row.completed { "✓".green() } else { " ".normal() };
                    let text = if row.completed {
                        row.text.strikethrough().dimmed()
                    } else {
                        row.text.normal()
                    };
                    let _ = writeln!(
                        out,
                        "  {:>width$} [{}] {}  {}",
                        row.id.to_string().yellow(),
                        mark,
                        text,
                        row.age.dimmed(),
                        width = width
                    );
                }
            }
        }

        out
    }
}
