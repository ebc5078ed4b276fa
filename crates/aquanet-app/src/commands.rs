//! Line commands understood by the interactive prompt.

use std::path::PathBuf;

use aquanet_chat::{ChatError, TaskCatalog};
use aquanet_core::types::TaskKind;

pub const HELP: &str = "\
Commands:
  <text>               ask a question (uses the selected task, if any)
  /task <kind>         select a task, e.g. /task water_quality_analysis
  /task none           clear the selected task
  /task                show the selected task and the available kinds
  /analyze             run the selected task with no question
  /input <file.json>   load pond data from a JSON file
  /reset               clear the conversation and analytics
  /export              write the transcript to the export directory
  /debug               show the last request or error
  /stats               show response-time analytics
  /help                show this help
  /quit                exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ask(String),
    Analyze,
    SelectTask(Option<TaskKind>),
    ShowTask,
    LoadInput(PathBuf),
    Reset,
    Export,
    Debug,
    Stats,
    Help,
    Quit,
    Empty,
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command, ChatError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Ask(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name.to_lowercase().as_str() {
        "task" if arg.is_empty() => Ok(Command::ShowTask),
        "task" if arg.eq_ignore_ascii_case("none") => Ok(Command::SelectTask(None)),
        "task" => TaskCatalog::parse(arg).map(|kind| Command::SelectTask(Some(kind))),
        "analyze" => Ok(Command::Analyze),
        "input" if arg.is_empty() => {
            Err(ChatError::Config("usage: /input <file.json>".to_string()))
        }
        "input" => Ok(Command::LoadInput(PathBuf::from(arg))),
        "reset" | "clear" => Ok(Command::Reset),
        "export" => Ok(Command::Export),
        "debug" => Ok(Command::Debug),
        "stats" => Ok(Command::Stats),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(ChatError::Config(format!(
            "unknown command '/{}', try /help",
            other
        ))),
    }
}
