use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type GoalId = i64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub subtasks: Vec<Task>,
}

impl Task {
    pub fn new(id: String, title: String, description: Option<String>) -> Self {
        Self {
            id,
            title,
            description,
            completed: false,
            subtasks: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub subtasks: Option<Vec<Task>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Goal {
    pub id: GoalId,
    pub title: String,
    pub description: Option<String>,
    pub tasks: Vec<Task>,
    pub pinned: bool,
    pub owner_id: String,
    pub owner_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewGoal {
    pub title: String,
    pub description: Option<String>,
    pub tasks: Vec<Task>,
    pub pinned: bool,
    pub owner_id: String,
    pub owner_name: String,
}

#[derive(Clone, Debug)]
pub struct GoalInput {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub tasks: Option<Vec<Task>>,
    pub pinned: Option<bool>,
}

#[derive(Clone, Debug)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum GoalSort {
    #[default]
    Newest,
    Oldest,
    Progress,
    ProgressDesc,
    Title,
    TitleDesc,
    Pinned,
}

impl GoalSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::Progress => "progress",
            Self::ProgressDesc => "progress-desc",
            Self::Title => "title",
            Self::TitleDesc => "title-desc",
            Self::Pinned => "pinned",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum TaskSort {
    #[default]
    Default,
    Completed,
    Active,
    Title,
    TitleDesc,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl User {
    pub fn display_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }

    pub fn owner_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeleteKind {
    Goal,
    Task,
}

impl DeleteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Goal => "goal",
            Self::Task => "task",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeleteTarget {
    Goal(GoalId),
    Task { goal_id: GoalId, task_id: String },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingDelete {
    pub target: DeleteTarget,
    pub display_title: String,
}

impl PendingDelete {
    pub fn kind(&self) -> DeleteKind {
        match self.target {
            DeleteTarget::Goal(_) => DeleteKind::Goal,
            DeleteTarget::Task { .. } => DeleteKind::Task,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlobalStats {
    pub total_goals: usize,
    pub completed_goals: usize,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub productivity: u8,
}
