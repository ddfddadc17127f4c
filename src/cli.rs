use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{ArgAction, Args, Parser, Subcommand};
use time::Date;

use crate::domain::issue::IssueStatus;
use crate::due::parse_day;
use crate::view::{request_sort, FilterCriteria, SortDirective, SortField};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

#[derive(Debug, Parser)]
#[command(name = "dvt")]
#[command(bin_name = "dvt")]
#[command(version)]
#[command(about = "A shared deviation (non-conformance) tracker")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        env = "DVT_DB_PATH",
        default_value = ".dvt/state.sqlite",
        help = "Path to the shared SQLite database."
    )]
    pub db: String,

    #[arg(
        long,
        env = "DVT_PREFS_PATH",
        help = "Device-local preferences file (defaults to ~/.config/dvt/prefs.toml)."
    )]
    pub prefs: Option<PathBuf>,

    #[arg(long = "user-id", env = "DVT_USER_ID", help = "Signed-in user id.")]
    pub user_id: Option<String>,

    #[arg(long = "user-email", env = "DVT_USER_EMAIL", help = "Signed-in user email.")]
    pub user_email: Option<String>,

    #[arg(long = "user-name", env = "DVT_USER_NAME", help = "Signed-in display name.")]
    pub user_name: Option<String>,

    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help = "Increase log verbosity (repeatable)."
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Report a new deviation.")]
    New(NewArgs),
    #[command(about = "List deviations with filters and sorting.")]
    Ls(ListArgs),
    #[command(about = "Show one deviation by id or #issue/<id> link.")]
    Show(ShowArgs),
    #[command(about = "Edit fields of one deviation.")]
    Update(UpdateArgs),
    #[command(about = "Drag a row of the current view to a new position.")]
    Move(MoveArgs),
    #[command(about = "Print the shareable link of one deviation.")]
    Link(LinkArgs),
    #[command(about = "Show the values available to each filter.")]
    Filters(FiltersArgs),
    #[command(about = "Follow live changes to the collection.")]
    Watch(WatchArgs),
    #[command(about = "Inspect and edit shared form defaults.")]
    Defaults(DefaultsArgs),
    #[command(about = "Inspect and edit this device's column layout.")]
    Columns(ColumnsArgs),
}

/// Filter and sort state shared by every command that renders a view.
#[derive(Debug, Clone, Default, Args)]
pub struct ViewArgs {
    #[arg(long = "status", help = "Filter by progress (repeatable).")]
    pub status: Vec<IssueStatus>,

    #[arg(long = "author", help = "Filter by author (repeatable).")]
    pub author: Vec<String>,

    #[arg(long = "assigned-to", help = "Filter by assignee (repeatable).")]
    pub assigned_to: Vec<String>,

    #[arg(long = "priority", help = "Filter by priority (repeatable).")]
    pub priority: Vec<String>,

    #[arg(long = "technology", help = "Filter by technology (repeatable).")]
    pub technology: Vec<String>,

    #[arg(
        long = "due-before",
        value_parser = parse_day_arg,
        help = "Only issues due on or before YYYY-MM-DD."
    )]
    pub due_before: Option<Date>,

    #[arg(
        long = "sort",
        help = "Click a column header; repeat the same field to flip or clear the sort."
    )]
    pub sort: Vec<SortField>,
}

impl ViewArgs {
    pub fn resolve(&self) -> (FilterCriteria, SortDirective) {
        let filters = FilterCriteria {
            status: self.status.clone(),
            author: self.author.clone(),
            assigned_to: self.assigned_to.clone(),
            priority: self.priority.clone(),
            technology: self.technology.clone(),
            due_on_or_before: self.due_before,
        };
        let sort = self
            .sort
            .iter()
            .fold(SortDirective::default(), |current, field| {
                request_sort(current, *field)
            });
        (filters, sort)
    }
}

fn parse_day_arg(raw: &str) -> Result<Date, String> {
    parse_day(raw).map_err(|_| format!("invalid date '{raw}'; use YYYY-MM-DD"))
}

/// Converts a 1-based position from the command line.
pub fn zero_based(position: u64) -> usize {
    usize::try_from(position.saturating_sub(1)).unwrap_or(usize::MAX)
}

#[derive(Debug, Args)]
pub struct NewArgs {
    #[arg(help = "Short title of the deviation.")]
    pub title: String,

    #[arg(short = 'p', long = "problem", help = "Problem description.")]
    pub problem: String,

    #[arg(short = 's', long = "solution", help = "Proposed or applied solution.")]
    pub solution: Option<String>,

    #[arg(long, help = "Priority (defaults to the first configured priority).")]
    pub priority: Option<String>,

    #[arg(short = 'a', long = "assigned-to", help = "Assignee name.")]
    pub assigned_to: Option<String>,

    #[arg(
        short = 't',
        long,
        help = "Technology (defaults to the first configured technology)."
    )]
    pub technology: Option<String>,

    #[arg(long = "due", help = "Due date as YYYY-MM-DD.")]
    pub due: Option<String>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(help = "Issue id, or a link ending in #issue/<id>.")]
    pub target: String,

    #[command(flatten)]
    pub view: ViewArgs,

    #[arg(
        long,
        env = "DVT_LINK_BASE",
        help = "Base URL used to print the issue's shareable link."
    )]
    pub base: Option<String>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    #[arg(help = "Issue id.")]
    pub id: String,

    #[arg(long, help = "Set title.")]
    pub title: Option<String>,

    #[arg(short = 'p', long = "problem", help = "Set problem description.")]
    pub problem: Option<String>,

    #[arg(short = 's', long = "solution", help = "Set solution description.")]
    pub solution: Option<String>,

    #[arg(long = "clear-solution", help = "Remove the solution description.")]
    pub clear_solution: bool,

    #[arg(long, help = "Set progress: Open, Work In Progress, Closed.")]
    pub status: Option<String>,

    #[arg(long, help = "Set priority.")]
    pub priority: Option<String>,

    #[arg(short = 'a', long = "assigned-to", help = "Set assignee (empty clears).")]
    pub assigned_to: Option<String>,

    #[arg(short = 't', long, help = "Set technology.")]
    pub technology: Option<String>,

    #[arg(long = "due", help = "Set due date as YYYY-MM-DD.")]
    pub due: Option<String>,

    #[arg(long = "clear-due", help = "Remove the due date.")]
    pub clear_due: bool,
}

#[derive(Debug, Args)]
pub struct MoveArgs {
    #[arg(
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Current 1-based row in the view."
    )]
    pub from: u64,

    #[arg(
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Target 1-based row in the view."
    )]
    pub to: u64,

    #[command(flatten)]
    pub view: ViewArgs,

    #[arg(short = 'j', long, help = "Render the written orders as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct LinkArgs {
    #[arg(help = "Issue id.")]
    pub id: String,

    #[arg(
        long,
        env = "DVT_LINK_BASE",
        default_value = "",
        help = "Base URL the fragment is appended to."
    )]
    pub base: String,
}

#[derive(Debug, Args)]
pub struct FiltersArgs {
    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    #[arg(long, help = "Select the issue named by this #issue/<id> link once loaded.")]
    pub select: Option<String>,

    #[arg(
        long = "interval-ms",
        value_parser = clap::value_parser!(u64).range(10..),
        help = "Change polling interval in milliseconds (default 250)."
    )]
    pub interval_ms: Option<u64>,

    #[arg(long = "max-snapshots", help = "Exit after rendering this many snapshots.")]
    pub max_snapshots: Option<usize>,
}

#[derive(Debug, Args)]
pub struct DefaultsArgs {
    #[command(subcommand)]
    pub command: DefaultsSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum DefaultsSubcommands {
    #[command(about = "Show assignees, priorities and technologies.")]
    Show(FiltersArgs),
    #[command(about = "Add an assignee to the roster.")]
    AddPerson(AddPersonArgs),
    #[command(about = "Remove an assignee from the roster.")]
    RemovePerson(ValueArgs),
    #[command(about = "Add a priority label.")]
    AddPriority(ValueArgs),
    #[command(about = "Remove a priority label.")]
    RemovePriority(ValueArgs),
    #[command(about = "Add a technology label.")]
    AddTechnology(ValueArgs),
    #[command(about = "Remove a technology label.")]
    RemoveTechnology(ValueArgs),
}

#[derive(Debug, Args)]
pub struct AddPersonArgs {
    #[arg(help = "Assignee name.")]
    pub name: String,

    #[arg(short = 'e', long, help = "Optional email address.")]
    pub email: Option<String>,
}

#[derive(Debug, Args)]
pub struct ValueArgs {
    #[arg(help = "Value to add or remove.")]
    pub value: String,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    #[command(subcommand)]
    pub command: ColumnsSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum ColumnsSubcommands {
    #[command(about = "Show the column layout.", alias = "ls")]
    Show(FiltersArgs),
    #[command(about = "Show or hide one column.")]
    Toggle(ColumnToggleArgs),
    #[command(about = "Move a visible column before another.")]
    Move(ColumnMoveArgs),
    #[command(about = "Restore the default layout.")]
    Reset,
}

#[derive(Debug, Args)]
pub struct ColumnToggleArgs {
    #[arg(help = "Column id, e.g. technology.")]
    pub id: String,
}

#[derive(Debug, Args)]
pub struct ColumnMoveArgs {
    #[arg(
        value_parser = clap::value_parser!(u64).range(1..),
        help = "1-based position among visible columns."
    )]
    pub from: u64,

    #[arg(
        value_parser = clap::value_parser!(u64).range(1..),
        help = "1-based position to drop before."
    )]
    pub to: u64,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
