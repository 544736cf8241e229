use chrono::{DateTime, Utc};

use crate::model::{GlobalStats, Goal, GoalSort, Task};
use crate::progress::{goal_progress, task_counts};

const CHART_GOALS: usize = 10;
const CHART_WIDTH: usize = 20;

fn has_text(value: &Option<String>) -> bool {
    value
        .as_deref()
        .map(|text| !text.trim().is_empty())
        .unwrap_or(false)
}

fn checkbox(completed: bool) -> &'static str {
    if completed {
        "x"
    } else {
        " "
    }
}

pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

pub fn format_goal_list(goals: &[Goal], stats: &GlobalStats, sort: GoalSort) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Goals: {} (completed: {}), sorted by {}\n",
        stats.total_goals,
        stats.completed_goals,
        sort.as_str()
    ));
    output.push_str(&format!(
        "{:<4} {:<3} {:<5} {:<7} {}\n",
        "ID", "PIN", "PROG", "TASKS", "TITLE"
    ));
    for goal in goals {
        let (done, total) = task_counts(&goal.tasks);
        output.push_str(&format!(
            "{:<4} {:<3} {:<5} {:<7} {}\n",
            goal.id,
            if goal.pinned { "*" } else { "" },
            format!("{}%", goal_progress(goal)),
            format!("{done}/{total}"),
            goal.title
        ));
    }
    output.trim_end().to_string()
}

pub fn format_goal_detail(goal: &Goal, roots: &[&Task]) -> String {
    let (done, total) = task_counts(&goal.tasks);
    let mut output = String::new();
    output.push_str(&format!("Goal ID: {}\n", goal.id));
    output.push_str(&format!("Title: {}\n", goal.title));
    if has_text(&goal.description) {
        output.push_str(&format!(
            "Description: {}\n",
            goal.description.as_deref().unwrap_or("")
        ));
    }
    output.push_str(&format!("Owner: {}\n", goal.owner_name));
    output.push_str(&format!(
        "Pinned: {}\n",
        if goal.pinned { "yes" } else { "no" }
    ));
    output.push_str(&format!(
        "Progress: {}% ({done}/{total} tasks)\n",
        goal_progress(goal)
    ));
    output.push_str(&format!("Created: {}\n", format_datetime(goal.created_at)));
    output.push_str(&format!("Updated: {}\n", format_datetime(goal.updated_at)));
    output.push('\n');
    if roots.is_empty() {
        output.push_str("Tasks: (none)");
        return output;
    }
    output.push_str("Tasks:\n");
    for task in roots {
        push_task(&mut output, task, 0);
    }
    output.trim_end().to_string()
}

fn push_task(output: &mut String, task: &Task, depth: usize) {
    let indent = "  ".repeat(depth);
    output.push_str(&format!(
        "{indent}- [{}] {} (task id {})\n",
        checkbox(task.completed),
        task.title,
        task.id
    ));
    if has_text(&task.description) {
        output.push_str(&format!(
            "{indent}  {}\n",
            task.description.as_deref().unwrap_or("")
        ));
    }
    for child in &task.subtasks {
        push_task(output, child, depth + 1);
    }
}

pub fn format_stats(stats: &GlobalStats, goals: &[Goal]) -> String {
    let mut output = String::new();
    output.push_str(&format!("Total goals: {}\n", stats.total_goals));
    output.push_str(&format!("Completed goals: {}\n", stats.completed_goals));
    output.push_str(&format!("Total tasks: {}\n", stats.total_tasks));
    output.push_str(&format!("Completed tasks: {}\n", stats.completed_tasks));
    output.push_str(&format!("Productivity: {}%\n", stats.productivity));
    if goals.is_empty() {
        return output.trim_end().to_string();
    }
    output.push('\n');
    output.push_str("Progress by goal:\n");
    for goal in goals.iter().take(CHART_GOALS) {
        let progress = goal_progress(goal);
        let filled = usize::from(progress) * CHART_WIDTH / 100;
        output.push_str(&format!(
            "{:>4}% [{}{}] {}\n",
            progress,
            "#".repeat(filled),
            ".".repeat(CHART_WIDTH - filled),
            goal.title
        ));
    }
    output.trim_end().to_string()
}
