use crate::collection::{sort_goals, sort_tasks};
use crate::error::AppError;
use crate::model::{Goal, GoalId, GoalSort, GlobalStats, PendingDelete, Task, TaskSort, User};
use crate::progress::global_stats;

#[derive(Debug, Default)]
pub struct Session {
    pub user: Option<User>,
    pub goals: Vec<Goal>,
    pub current_goal: Option<GoalId>,
    pub editing_goal: Option<GoalId>,
    pub editing_task: Option<String>,
    pub pending_delete: Option<PendingDelete>,
    pub goal_sort: GoalSort,
    pub task_sort: TaskSort,
}

impl Session {
    pub fn new(goal_sort: GoalSort, task_sort: TaskSort) -> Self {
        Self {
            goal_sort,
            task_sort,
            ..Default::default()
        }
    }

    /// Drops everything tied to the signed-in user. Sort keys survive.
    pub fn reset(&mut self) {
        *self = Self::new(self.goal_sort, self.task_sort);
    }

    pub fn goal(&self, id: GoalId) -> Option<&Goal> {
        self.goals.iter().find(|goal| goal.id == id)
    }

    pub fn goal_mut(&mut self, id: GoalId) -> Option<&mut Goal> {
        self.goals.iter_mut().find(|goal| goal.id == id)
    }

    pub fn require_goal(&self, id: GoalId) -> Result<&Goal, AppError> {
        self.goal(id)
            .ok_or_else(|| AppError::NotFound(format!("goal id {id}")))
    }

    pub fn require_goal_mut(&mut self, id: GoalId) -> Result<&mut Goal, AppError> {
        self.goal_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("goal id {id}")))
    }

    pub fn require_user(&self) -> Result<&User, AppError> {
        self.user
            .as_ref()
            .ok_or_else(|| AppError::Auth("not signed in".to_string()))
    }

    pub fn current_goal(&self) -> Option<&Goal> {
        self.current_goal.and_then(|id| self.goal(id))
    }

    pub fn require_current_goal(&self) -> Result<&Goal, AppError> {
        self.current_goal()
            .ok_or_else(|| AppError::Validation("select a goal first".to_string()))
    }

    pub fn resort(&mut self) {
        sort_goals(&mut self.goals, self.goal_sort);
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        match self.current_goal() {
            Some(goal) => sort_tasks(&goal.tasks, self.task_sort),
            None => Vec::new(),
        }
    }

    pub fn stats(&self) -> GlobalStats {
        global_stats(&self.goals)
    }
}
