use std::cmp::Ordering;

use crate::model::{Goal, GoalSort, Task, TaskSort};
use crate::progress::goal_progress;

pub fn sort_goals(goals: &mut Vec<Goal>, sort: GoalSort) {
    let (mut pinned, mut unpinned): (Vec<Goal>, Vec<Goal>) =
        goals.drain(..).partition(|goal| goal.pinned);
    pinned.sort_by(|a, b| compare_goals(a, b, sort));
    unpinned.sort_by(|a, b| compare_goals(a, b, sort));
    goals.extend(pinned);
    goals.extend(unpinned);
}

fn compare_goals(a: &Goal, b: &Goal, sort: GoalSort) -> Ordering {
    match sort {
        GoalSort::Newest | GoalSort::Pinned => b.created_at.cmp(&a.created_at),
        GoalSort::Oldest => a.created_at.cmp(&b.created_at),
        GoalSort::Progress => goal_progress(a).cmp(&goal_progress(b)),
        GoalSort::ProgressDesc => goal_progress(b).cmp(&goal_progress(a)),
        GoalSort::Title => compare_titles(&a.title, &b.title),
        GoalSort::TitleDesc => compare_titles(&b.title, &a.title),
    }
}

pub fn sort_tasks(tasks: &[Task], sort: TaskSort) -> Vec<&Task> {
    let mut ordered: Vec<&Task> = tasks.iter().collect();
    match sort {
        TaskSort::Default => {}
        TaskSort::Completed => ordered.sort_by_key(|task| !task.completed),
        TaskSort::Active => ordered.sort_by_key(|task| task.completed),
        TaskSort::Title => ordered.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        TaskSort::TitleDesc => ordered.sort_by(|a, b| compare_titles(&b.title, &a.title)),
    }
    ordered
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
