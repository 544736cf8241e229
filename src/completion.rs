use crate::error::AppError;
use crate::model::{Task, TaskPatch};
use crate::tree::{find_parent, find_task, first_incomplete_descendant, update_in_place};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskStatusChange {
    pub task_id: String,
    pub from: bool,
    pub to: bool,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TogglePlan {
    pub changes: Vec<TaskStatusChange>,
}

impl TogglePlan {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        self.changes.iter().fold(tasks.to_vec(), |forest, change| {
            set_completed(&forest, &change.task_id, change.to)
        })
    }

    /// Restores every flag this plan changed, leaving the rest of the forest as it is.
    pub fn rollback(&self, tasks: &[Task]) -> Vec<Task> {
        self.changes.iter().rev().fold(tasks.to_vec(), |forest, change| {
            set_completed(&forest, &change.task_id, change.from)
        })
    }
}

fn set_completed(tasks: &[Task], id: &str, completed: bool) -> Vec<Task> {
    update_in_place(
        tasks,
        id,
        &TaskPatch {
            completed: Some(completed),
            ..Default::default()
        },
    )
}

pub fn plan_toggle(tasks: &[Task], task_id: &str, completed: bool) -> Result<TogglePlan, AppError> {
    let task = find_task(tasks, task_id)
        .ok_or_else(|| AppError::NotFound(format!("task id {task_id}")))?;
    if completed {
        plan_complete(task)
    } else {
        Ok(plan_reopen(tasks, task))
    }
}

fn plan_complete(task: &Task) -> Result<TogglePlan, AppError> {
    if let Some(pending) = first_incomplete_descendant(task) {
        return Err(AppError::Validation(format!(
            "cannot mark task done; complete all subtasks first: {} (task id {})",
            pending.title, pending.id
        )));
    }
    let mut plan = TogglePlan::default();
    if !task.completed {
        plan.changes.push(TaskStatusChange {
            task_id: task.id.clone(),
            from: false,
            to: true,
            reason: "marked done".to_string(),
        });
    }
    Ok(plan)
}

fn plan_reopen(tasks: &[Task], task: &Task) -> TogglePlan {
    let mut plan = TogglePlan::default();
    if task.completed {
        plan.changes.push(TaskStatusChange {
            task_id: task.id.clone(),
            from: true,
            to: false,
            reason: "marked not done".to_string(),
        });
    }
    if let Some(parent) = find_parent(tasks, &task.id) {
        if parent.completed {
            plan.changes.push(TaskStatusChange {
                task_id: parent.id.clone(),
                from: true,
                to: false,
                reason: format!("subtask {} reopened", task.id),
            });
        }
    }
    plan
}
