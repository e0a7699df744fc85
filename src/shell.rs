// Interactive session: read a line, dispatch, re-render

use crate::app::{App, Command};
use crate::filter::Filter;
use crate::prompt::{Prompt, TerminalPrompt};
use crate::storage::KeyValueStorage;
use crate::task::TaskId;
use eyre::{Result, eyre};
use std::io::{BufRead, Write};
use tracing::debug;

pub const HELP: &str = "\
Commands:
  add <text>             add a task
  toggle <id>            mark complete / incomplete (alias: done)
  edit <id> [text]       change a task's text
  rm <id>                delete a task (alias: delete)
  clear                  delete all tasks
  filter <all|active|completed>
  list                   show the list again
  help                   show this help
  quit                   leave (alias: exit, q)";

/// What one input line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Run(Command),
    /// Edit without replacement text: ask for it
    EditInteractive(TaskId),
    Show,
    Help,
    Quit,
    Nothing,
}

/// Parse one line of shell input
pub fn parse_line(line: &str) -> Result<Action> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Action::Nothing);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let action = match word.to_ascii_lowercase().as_str() {
        "add" | "a" => Action::Run(Command::Add(rest.to_string())),
        "toggle" | "done" | "t" => Action::Run(Command::Toggle(parse_id(rest)?)),
        "edit" | "e" => {
            let (id, text) = match rest.split_once(char::is_whitespace) {
                Some((id, text)) => (id, text.trim()),
                None => (rest, ""),
            };
            let id = parse_id(id)?;
            if text.is_empty() {
                Action::EditInteractive(id)
            } else {
                Action::Run(Command::Edit(id, text.to_string()))
            }
        }
        "rm" | "delete" | "del" => Action::Run(Command::Delete(parse_id(rest)?)),
        "clear" => Action::Run(Command::ClearAll),
        "filter" | "f" => Action::Run(Command::SetFilter(rest.parse::<Filter>()?)),
        "all" | "active" | "completed" => Action::Run(Command::SetFilter(word.parse::<Filter>()?)),
        "list" | "ls" => Action::Show,
        "help" | "?" => Action::Help,
        "quit" | "exit" | "q" => Action::Quit,
        other => return Err(eyre!("Unknown command: {} (try 'help')", other)),
    };

    Ok(action)
}

fn parse_id(s: &str) -> Result<TaskId> {
    if s.is_empty() {
        return Err(eyre!("Missing task id"));
    }
    s.parse::<TaskId>().map_err(|_| eyre!("Invalid task id: {}", s))
}

/// Ask for replacement text, starting from the task's current text
pub fn edit_command<S: KeyValueStorage>(app: &App<S>, id: TaskId, prompt: &mut dyn Prompt) -> Option<Command> {
    let Some(task) = app.store().get(id) else {
        prompt.alert(&crate::task::TaskError::NotFound(id).to_string());
        return None;
    };
    let text = task.text.clone();
    prompt.input("Edit task:", &text).map(|updated| Command::Edit(id, updated))
}

/// Run the session until `quit` or end of input
pub async fn run<S, R, W>(app: &mut App<S>, prompt: &mut TerminalPrompt<R>, out: &mut W) -> Result<()>
where
    S: KeyValueStorage,
    R: BufRead,
    W: Write,
{
    let view = app.start().await;
    write!(out, "{}", view.to_text())?;
    writeln!(out, "Type 'help' for commands.")?;

    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = prompt.read_line() else {
            debug!("End of input, leaving shell");
            break;
        };

        let action = match parse_line(&line) {
            Ok(action) => action,
            Err(e) => {
                prompt.alert(&e.to_string());
                continue;
            }
        };

        let command = match action {
            Action::Run(command) => command,
            Action::EditInteractive(id) => match edit_command(app, id, prompt) {
                Some(command) => command,
                None => continue,
            },
            Action::Show => {
                write!(out, "{}", app.view().to_text())?;
                continue;
            }
            Action::Help => {
                writeln!(out, "{}", HELP)?;
                continue;
            }
            Action::Quit => break,
            Action::Nothing => continue,
        };

        app.dispatch(command, prompt, out)?;
    }

    Ok(())
}
