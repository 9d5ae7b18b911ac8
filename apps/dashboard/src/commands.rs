//! Commands typed at the dashboard prompt.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardCommand {
    Refresh,
    Quit,
    Help,
    Unknown(String),
}

pub const HELP_TEXT: &str = "Commands: [r]efresh / retry, [h]elp, [q]uit";

/// Blank lines are ignored.
pub fn parse_command(line: &str) -> Option<DashboardCommand> {
    let input = line.trim();
    if input.is_empty() {
        return None;
    }

    let command = match input.to_ascii_lowercase().as_str() {
        "r" | "retry" | "refresh" | "reload" => DashboardCommand::Refresh,
        "q" | "quit" | "exit" => DashboardCommand::Quit,
        "h" | "?" | "help" => DashboardCommand::Help,
        _ => DashboardCommand::Unknown(input.to_string()),
    };
    Some(command)
}
