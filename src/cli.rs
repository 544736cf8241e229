use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::{GoalSort, TaskSort, Theme};

#[derive(Parser, Debug)]
#[command(
    name = "goalmap",
    version,
    about = "Track goals as trees of tasks"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Data directory (defaults to $GOALMAP_HOME, then ~/.goalmap)"
    )]
    pub home: Option<PathBuf>,
    #[arg(long, global = true, value_enum, default_value = "newest")]
    pub goal_sort: GoalSortArg,
    #[arg(long, global = true, value_enum, default_value = "default")]
    pub task_sort: TaskSortArg,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    Auth(AuthCommand),
    #[command(subcommand)]
    Goal(GoalCommand),
    #[command(subcommand)]
    Task(TaskCommand),
    #[command(subcommand)]
    Theme(ThemeCommand),
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    #[command(name = "sign-up")]
    SignUp(AuthSignUp),
    #[command(name = "sign-in")]
    SignIn(AuthSignIn),
    #[command(name = "sign-out")]
    SignOut,
    Whoami,
}

#[derive(Subcommand, Debug)]
pub enum GoalCommand {
    Add(GoalAdd),
    List,
    Show(GoalShow),
    Update(GoalUpdate),
    Pin(GoalPin),
    Remove(GoalRemove),
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    Add(TaskAdd),
    Update(TaskUpdate),
    Done(TaskRef),
    Undo(TaskRef),
    Remove(TaskRemove),
}

#[derive(Subcommand, Debug)]
pub enum ThemeCommand {
    Show,
    Set(ThemeSet),
    Toggle,
}

#[derive(Args, Debug)]
pub struct AuthSignUp {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Args, Debug)]
pub struct AuthSignIn {
    pub email: String,
    pub password: String,
}

#[derive(Args, Debug)]
pub struct GoalAdd {
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct GoalShow {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct GoalUpdate {
    pub id: i64,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, help = "New description; pass an empty string to clear it")]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct GoalPin {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct GoalRemove {
    pub id: i64,
    #[arg(long, help = "Show what would be deleted without deleting it")]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct TaskAdd {
    pub goal_id: i64,
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_name = "TASK_ID")]
    pub parent: Option<String>,
}

#[derive(Args, Debug)]
pub struct TaskUpdate {
    pub goal_id: i64,
    pub task_id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, help = "New description; pass an empty string to clear it")]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct TaskRef {
    pub goal_id: i64,
    pub task_id: String,
}

#[derive(Args, Debug)]
pub struct TaskRemove {
    pub goal_id: i64,
    pub task_id: String,
    #[arg(long, help = "Show what would be deleted without deleting it")]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ThemeSet {
    #[arg(value_enum)]
    pub theme: ThemeArg,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum GoalSortArg {
    Newest,
    Oldest,
    Progress,
    ProgressDesc,
    Title,
    TitleDesc,
    Pinned,
}

impl From<GoalSortArg> for GoalSort {
    fn from(arg: GoalSortArg) -> Self {
        match arg {
            GoalSortArg::Newest => GoalSort::Newest,
            GoalSortArg::Oldest => GoalSort::Oldest,
            GoalSortArg::Progress => GoalSort::Progress,
            GoalSortArg::ProgressDesc => GoalSort::ProgressDesc,
            GoalSortArg::Title => GoalSort::Title,
            GoalSortArg::TitleDesc => GoalSort::TitleDesc,
            GoalSortArg::Pinned => GoalSort::Pinned,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum TaskSortArg {
    Default,
    Completed,
    Active,
    Title,
    TitleDesc,
}

impl From<TaskSortArg> for TaskSort {
    fn from(arg: TaskSortArg) -> Self {
        match arg {
            TaskSortArg::Default => TaskSort::Default,
            TaskSortArg::Completed => TaskSort::Completed,
            TaskSortArg::Active => TaskSort::Active,
            TaskSortArg::Title => TaskSort::Title,
            TaskSortArg::TitleDesc => TaskSort::TitleDesc,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}
