use crate::model::{Goal, GlobalStats, Task};

pub fn flatten(tasks: &[Task]) -> Vec<&Task> {
    let mut out = Vec::new();
    collect(tasks, &mut out);
    out
}

fn collect<'a>(tasks: &'a [Task], out: &mut Vec<&'a Task>) {
    for task in tasks {
        out.push(task);
        collect(&task.subtasks, out);
    }
}

pub fn task_counts(tasks: &[Task]) -> (usize, usize) {
    let all = flatten(tasks);
    let done = all.iter().filter(|task| task.completed).count();
    (done, all.len())
}

/// Round-half-up integer percentage; 0 when `total` is 0.
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let value = (200 * done + total) / (2 * total);
    value.min(100) as u8
}

pub fn goal_progress(goal: &Goal) -> u8 {
    let (done, total) = task_counts(&goal.tasks);
    percent(done, total)
}

pub fn global_stats(goals: &[Goal]) -> GlobalStats {
    let mut stats = GlobalStats {
        total_goals: goals.len(),
        ..Default::default()
    };
    for goal in goals {
        let (done, total) = task_counts(&goal.tasks);
        if percent(done, total) == 100 {
            stats.completed_goals += 1;
        }
        stats.completed_tasks += done;
        stats.total_tasks += total;
    }
    stats.productivity = percent(stats.completed_tasks, stats.total_tasks);
    stats
}
