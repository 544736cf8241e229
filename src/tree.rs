use uuid::Uuid;

use crate::model::{Task, TaskPatch};

pub fn new_task_id() -> String {
    format!("task_{}", Uuid::new_v4().simple())
}

pub fn find_task<'a>(tasks: &'a [Task], id: &str) -> Option<&'a Task> {
    for task in tasks {
        if task.id == id {
            return Some(task);
        }
        if let Some(found) = find_task(&task.subtasks, id) {
            return Some(found);
        }
    }
    None
}

pub fn find_parent<'a>(tasks: &'a [Task], id: &str) -> Option<&'a Task> {
    for task in tasks {
        if task.subtasks.iter().any(|child| child.id == id) {
            return Some(task);
        }
        if let Some(found) = find_parent(&task.subtasks, id) {
            return Some(found);
        }
    }
    None
}

/// Appends `child` to the subtasks of `parent_id`. Unknown parents leave the forest unchanged.
pub fn insert_as_child(tasks: &[Task], parent_id: &str, child: Task) -> Vec<Task> {
    let mut pending = Some(child);
    insert_into(tasks, parent_id, &mut pending)
}

fn insert_into(tasks: &[Task], parent_id: &str, pending: &mut Option<Task>) -> Vec<Task> {
    tasks
        .iter()
        .map(|task| {
            let mut subtasks = insert_into(&task.subtasks, parent_id, pending);
            if task.id == parent_id {
                if let Some(child) = pending.take() {
                    subtasks.push(child);
                }
            }
            Task {
                subtasks,
                ..task.clone_shallow()
            }
        })
        .collect()
}

pub fn update_in_place(tasks: &[Task], id: &str, patch: &TaskPatch) -> Vec<Task> {
    tasks
        .iter()
        .map(|task| {
            if task.id == id {
                return apply_patch(task, patch);
            }
            Task {
                subtasks: update_in_place(&task.subtasks, id, patch),
                ..task.clone_shallow()
            }
        })
        .collect()
}

fn apply_patch(task: &Task, patch: &TaskPatch) -> Task {
    Task {
        id: task.id.clone(),
        title: patch.title.clone().unwrap_or_else(|| task.title.clone()),
        description: patch
            .description
            .clone()
            .unwrap_or_else(|| task.description.clone()),
        completed: patch.completed.unwrap_or(task.completed),
        subtasks: patch
            .subtasks
            .clone()
            .unwrap_or_else(|| task.subtasks.clone()),
    }
}

pub fn remove_by_id(tasks: &[Task], id: &str) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| task.id != id)
        .map(|task| Task {
            subtasks: remove_by_id(&task.subtasks, id),
            ..task.clone_shallow()
        })
        .collect()
}

pub fn first_incomplete_descendant(task: &Task) -> Option<&Task> {
    for child in &task.subtasks {
        if !child.completed {
            return Some(child);
        }
        if let Some(found) = first_incomplete_descendant(child) {
            return Some(found);
        }
    }
    None
}

impl Task {
    // Copies the node's own fields; callers always supply `subtasks` themselves.
    fn clone_shallow(&self) -> Task {
        Task {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            completed: self.completed,
            subtasks: Vec::new(),
        }
    }
}
