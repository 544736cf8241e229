use chrono::Utc;
use tracing::{debug, info, warn};

use crate::completion::{plan_toggle, TogglePlan};
use crate::error::AppError;
use crate::model::{
    DeleteTarget, Goal, GoalId, GoalInput, GoalPatch, GoalSort, NewGoal, PendingDelete, Task,
    TaskInput, TaskPatch, TaskSort, User,
};
use crate::session::Session;
use crate::store::{normalize_text, GoalStore};
use crate::tree::{find_task, insert_as_child, new_task_id, remove_by_id, update_in_place};

pub struct App<S: GoalStore> {
    store: S,
    session: Session,
}

impl<S: GoalStore> App<S> {
    pub fn new(store: S, goal_sort: GoalSort, task_sort: TaskSort) -> Self {
        Self {
            store,
            session: Session::new(goal_sort, task_sort),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn handle_auth_change(&mut self, user: Option<User>) -> Result<(), AppError> {
        match user {
            Some(user) => {
                self.session.user = Some(user);
                self.load_goals().await
            }
            None => {
                self.session.reset();
                Ok(())
            }
        }
    }

    pub async fn load_goals(&mut self) -> Result<(), AppError> {
        let owner_id = self.session.require_user()?.id.clone();
        let goals = self.store.query_all_for_owner(&owner_id).await?;
        debug!(count = goals.len(), "loaded goals");
        self.session.goals = goals;
        self.session.resort();
        Ok(())
    }

    pub fn select_goal(&mut self, id: GoalId) -> Result<&Goal, AppError> {
        self.session.require_goal(id)?;
        self.session.current_goal = Some(id);
        self.session.require_goal(id)
    }

    pub fn back_to_list(&mut self) {
        self.session.current_goal = None;
    }

    pub fn begin_goal_edit(&mut self, id: Option<GoalId>) -> Result<(), AppError> {
        if let Some(id) = id {
            self.session.require_goal(id)?;
        }
        self.session.editing_goal = id;
        Ok(())
    }

    pub async fn submit_goal(&mut self, input: GoalInput) -> Result<GoalId, AppError> {
        let title = input.title.trim().to_string();
        ensure_non_empty("goal title", &title)?;
        let description = normalize_text(input.description);
        let id = match self.session.editing_goal {
            Some(id) => self.update_goal_fields(id, title, description).await?,
            None => self.create_goal(title, description).await?,
        };
        self.session.editing_goal = None;
        Ok(id)
    }

    async fn create_goal(
        &mut self,
        title: String,
        description: Option<String>,
    ) -> Result<GoalId, AppError> {
        let user = self.session.require_user()?.clone();
        let new_goal = NewGoal {
            title,
            description,
            tasks: Vec::new(),
            pinned: false,
            owner_id: user.id.clone(),
            owner_name: user.owner_name().to_string(),
        };
        let goal = self.store.create(new_goal).await?;
        let id = goal.id;
        self.session.goals.insert(0, goal);
        self.session.resort();
        info!(goal_id = id, "goal created");
        Ok(id)
    }

    async fn update_goal_fields(
        &mut self,
        id: GoalId,
        title: String,
        description: Option<String>,
    ) -> Result<GoalId, AppError> {
        let goal = self.session.require_goal_mut(id)?;
        let previous = (goal.title.clone(), goal.description.clone());
        goal.title = title.clone();
        goal.description = description.clone();

        let patch = GoalPatch {
            title: Some(title),
            description: Some(description),
            ..Default::default()
        };
        match self.store.update(id, patch).await {
            Ok(()) => {
                self.touch(id);
                self.session.resort();
                info!(goal_id = id, "goal updated");
                Ok(id)
            }
            Err(err) => {
                if let Some(goal) = self.session.goal_mut(id) {
                    (goal.title, goal.description) = previous;
                }
                warn!(goal_id = id, "goal update failed, restored cached fields: {err}");
                Err(err)
            }
        }
    }

    pub async fn toggle_pin(&mut self, id: GoalId) -> Result<bool, AppError> {
        let goal = self.session.require_goal_mut(id)?;
        let pinned = !goal.pinned;
        goal.pinned = pinned;

        let patch = GoalPatch {
            pinned: Some(pinned),
            ..Default::default()
        };
        match self.store.update(id, patch).await {
            Ok(()) => {
                self.touch(id);
                self.session.resort();
                info!(goal_id = id, pinned, "goal pin toggled");
                Ok(pinned)
            }
            Err(err) => {
                if let Some(goal) = self.session.goal_mut(id) {
                    goal.pinned = !pinned;
                }
                warn!(goal_id = id, "pin update failed, restored flag: {err}");
                Err(err)
            }
        }
    }

    pub fn request_delete(&mut self, target: DeleteTarget) -> Result<&PendingDelete, AppError> {
        let display_title = match &target {
            DeleteTarget::Goal(id) => self.session.require_goal(*id)?.title.clone(),
            DeleteTarget::Task { goal_id, task_id } => {
                let goal = self.session.require_goal(*goal_id)?;
                find_task(&goal.tasks, task_id)
                    .ok_or_else(|| AppError::NotFound(format!("task id {task_id}")))?
                    .title
                    .clone()
            }
        };
        Ok(&*self.session.pending_delete.insert(PendingDelete {
            target,
            display_title,
        }))
    }

    pub fn cancel_delete(&mut self) {
        self.session.pending_delete = None;
    }

    /// Performs the pending delete. The descriptor is cleared whatever the outcome.
    pub async fn confirm_delete(&mut self) -> Result<PendingDelete, AppError> {
        let pending = self
            .session
            .pending_delete
            .take()
            .ok_or_else(|| AppError::Validation("nothing pending deletion".to_string()))?;
        match &pending.target {
            DeleteTarget::Goal(id) => self.delete_goal(*id).await?,
            DeleteTarget::Task { goal_id, task_id } => self.delete_task(*goal_id, task_id).await?,
        }
        Ok(pending)
    }

    async fn delete_goal(&mut self, id: GoalId) -> Result<(), AppError> {
        let index = self
            .session
            .goals
            .iter()
            .position(|goal| goal.id == id)
            .ok_or_else(|| AppError::NotFound(format!("goal id {id}")))?;
        let removed = self.session.goals.remove(index);

        match self.store.delete(id).await {
            Ok(()) => {
                if self.session.current_goal == Some(id) {
                    self.back_to_list();
                }
                if self.session.editing_goal == Some(id) {
                    self.session.editing_goal = None;
                }
                info!(goal_id = id, "goal deleted");
                Ok(())
            }
            Err(err) => {
                self.session.goals.insert(index, removed);
                warn!(goal_id = id, "goal delete failed, restored cache entry: {err}");
                Err(err)
            }
        }
    }

    async fn delete_task(&mut self, goal_id: GoalId, task_id: &str) -> Result<(), AppError> {
        let goal = self.session.require_goal(goal_id)?;
        if find_task(&goal.tasks, task_id).is_none() {
            return Err(AppError::NotFound(format!("task id {task_id}")));
        }
        let updated = remove_by_id(&goal.tasks, task_id);
        self.replace_tasks(goal_id, updated).await?;
        if self
            .session
            .editing_task
            .as_deref()
            .is_some_and(|editing| editing == task_id)
        {
            self.session.editing_task = None;
        }
        Ok(())
    }

    pub fn begin_task_edit(&mut self, task_id: Option<String>) -> Result<(), AppError> {
        if let Some(task_id) = task_id.as_deref() {
            let goal = self.session.require_current_goal()?;
            if find_task(&goal.tasks, task_id).is_none() {
                return Err(AppError::NotFound(format!("task id {task_id}")));
            }
        }
        self.session.editing_task = task_id;
        Ok(())
    }

    pub async fn submit_task(&mut self, input: TaskInput) -> Result<String, AppError> {
        let title = input.title.trim().to_string();
        ensure_non_empty("task title", &title)?;
        let description = normalize_text(input.description);
        let goal = self.session.require_current_goal()?;
        let goal_id = goal.id;

        let (task_id, updated) = match self.session.editing_task.clone() {
            Some(task_id) => {
                let patch = TaskPatch {
                    title: Some(title),
                    description: Some(description),
                    ..Default::default()
                };
                let updated = update_in_place(&goal.tasks, &task_id, &patch);
                (task_id, updated)
            }
            None => {
                let task = Task::new(new_task_id(), title, description);
                let task_id = task.id.clone();
                let updated = match input.parent_id.as_deref() {
                    Some(parent_id) => {
                        let parent = find_task(&goal.tasks, parent_id).ok_or_else(|| {
                            AppError::NotFound(format!("parent task id {parent_id}"))
                        })?;
                        if parent.completed {
                            return Err(AppError::Validation(format!(
                                "cannot add a subtask to completed task {} (task id {})",
                                parent.title, parent.id
                            )));
                        }
                        insert_as_child(&goal.tasks, parent_id, task)
                    }
                    None => {
                        let mut tasks = goal.tasks.clone();
                        tasks.push(task);
                        tasks
                    }
                };
                (task_id, updated)
            }
        };

        self.replace_tasks(goal_id, updated).await?;
        self.session.editing_task = None;
        Ok(task_id)
    }

    pub async fn toggle_task(
        &mut self,
        task_id: &str,
        completed: bool,
    ) -> Result<TogglePlan, AppError> {
        let goal = self.session.require_current_goal()?;
        let goal_id = goal.id;
        let plan = match plan_toggle(&goal.tasks, task_id, completed) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(goal_id, task_id, "toggle rejected: {err}");
                return Err(err);
            }
        };
        if plan.is_empty() {
            return Ok(plan);
        }

        let goal = self.session.require_goal_mut(goal_id)?;
        goal.tasks = plan.apply(&goal.tasks);
        let tasks = goal.tasks.clone();

        match self.persist_tasks(goal_id, tasks).await {
            Ok(()) => Ok(plan),
            Err(err) => {
                if let Some(goal) = self.session.goal_mut(goal_id) {
                    goal.tasks = plan.rollback(&goal.tasks);
                }
                warn!(goal_id, task_id, "toggle failed, restored completion flags: {err}");
                Err(err)
            }
        }
    }

    async fn replace_tasks(&mut self, goal_id: GoalId, tasks: Vec<Task>) -> Result<(), AppError> {
        let goal = self.session.require_goal_mut(goal_id)?;
        let previous = std::mem::replace(&mut goal.tasks, tasks.clone());
        match self.persist_tasks(goal_id, tasks).await {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Some(goal) = self.session.goal_mut(goal_id) {
                    goal.tasks = previous;
                }
                warn!(goal_id, "task update failed, restored cached tasks: {err}");
                Err(err)
            }
        }
    }

    async fn persist_tasks(&mut self, goal_id: GoalId, tasks: Vec<Task>) -> Result<(), AppError> {
        let patch = GoalPatch {
            tasks: Some(tasks),
            ..Default::default()
        };
        self.store.update(goal_id, patch).await?;
        self.touch(goal_id);
        self.session.resort();
        debug!(goal_id, "persisted task forest");
        Ok(())
    }

    fn touch(&mut self, id: GoalId) {
        if let Some(goal) = self.session.goal_mut(id) {
            goal.updated_at = Utc::now();
        }
    }
}

fn ensure_non_empty(label: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{label} cannot be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::progress::goal_progress;
    use crate::store::SeaOrmGoalStore;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Wraps the sqlite store; writes fail while `fail` is set.
    #[derive(Clone)]
    struct FlakyStore {
        inner: SeaOrmGoalStore,
        fail: Arc<AtomicBool>,
        writes: Arc<AtomicUsize>,
    }

    impl FlakyStore {
        fn check(&self) -> Result<(), AppError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::Store(sea_orm::DbErr::Custom(
                    "connection reset".to_string(),
                )));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl GoalStore for FlakyStore {
        async fn create(&self, goal: NewGoal) -> Result<Goal, AppError> {
            self.check()?;
            self.inner.create(goal).await
        }

        async fn update(&self, id: GoalId, patch: GoalPatch) -> Result<(), AppError> {
            self.check()?;
            self.inner.update(id, patch).await
        }

        async fn delete(&self, id: GoalId) -> Result<(), AppError> {
            self.check()?;
            self.inner.delete(id).await
        }

        async fn query_all_for_owner(&self, owner_id: &str) -> Result<Vec<Goal>, AppError> {
            self.inner.query_all_for_owner(owner_id).await
        }
    }

    fn user() -> User {
        User {
            id: "u1".to_string(),
            email: "ada@example.com".to_string(),
            display_name: None,
        }
    }

    async fn setup_app() -> (TempDir, App<FlakyStore>) {
        let dir = TempDir::new().expect("temp dir");
        let db = db::open_temp(dir.path()).await;
        let store = FlakyStore {
            inner: SeaOrmGoalStore::new(db),
            fail: Arc::new(AtomicBool::new(false)),
            writes: Arc::new(AtomicUsize::new(0)),
        };
        let mut app = App::new(store, GoalSort::Newest, TaskSort::Default);
        app.handle_auth_change(Some(user())).await.expect("sign in");
        (dir, app)
    }

    async fn add_goal(app: &mut App<FlakyStore>, title: &str) -> GoalId {
        app.begin_goal_edit(None).expect("begin");
        app.submit_goal(GoalInput {
            title: title.to_string(),
            description: None,
        })
        .await
        .expect("create goal")
    }

    async fn add_task(app: &mut App<FlakyStore>, title: &str, parent: Option<&str>) -> String {
        app.submit_task(TaskInput {
            title: title.to_string(),
            description: None,
            parent_id: parent.map(str::to_string),
        })
        .await
        .expect("add task")
    }

    fn fail_writes(app: &App<FlakyStore>, fail: bool) {
        app.store().fail.store(fail, Ordering::SeqCst);
    }

    fn writes(app: &App<FlakyStore>) -> usize {
        app.store().writes.load(Ordering::SeqCst)
    }

    async fn stored_goal(app: &App<FlakyStore>, id: GoalId) -> Goal {
        app.store()
            .inner
            .query_all_for_owner("u1")
            .await
            .expect("query")
            .into_iter()
            .find(|goal| goal.id == id)
            .expect("stored goal")
    }

    #[tokio::test]
    async fn created_goal_is_owned_and_listed_first() {
        let (_dir, mut app) = setup_app().await;
        add_goal(&mut app, "Older").await;
        let id = add_goal(&mut app, "  Learn Rust  ").await;

        let goal = app.session().require_goal(id).expect("cached");
        assert_eq!(goal.title, "Learn Rust");
        assert_eq!(goal.owner_name, "ada@example.com");
        assert_eq!(app.session().goals[0].id, id);
        assert_eq!(stored_goal(&app, id).await.owner_id, "u1");
    }

    #[tokio::test]
    async fn created_goal_carries_store_timestamps() {
        let (_dir, mut app) = setup_app().await;
        let id = add_goal(&mut app, "Goal").await;
        let cached = app.session().require_goal(id).expect("cached").clone();
        assert_eq!(cached, stored_goal(&app, id).await);
    }

    #[tokio::test]
    async fn empty_goal_title_is_rejected_without_write() {
        let (_dir, mut app) = setup_app().await;
        let err = app
            .submit_goal(GoalInput {
                title: "   ".to_string(),
                description: None,
            })
            .await
            .expect_err("empty");
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(writes(&app), 0);
    }

    #[tokio::test]
    async fn failed_create_leaves_cache_untouched() {
        let (_dir, mut app) = setup_app().await;
        fail_writes(&app, true);
        let result = app
            .submit_goal(GoalInput {
                title: "Goal".to_string(),
                description: None,
            })
            .await;
        assert!(matches!(result, Err(AppError::Store(_))));
        assert!(app.session().goals.is_empty());
    }

    #[tokio::test]
    async fn goal_edit_keeps_tasks_and_rolls_back_on_failure() {
        let (_dir, mut app) = setup_app().await;
        let id = add_goal(&mut app, "Goal").await;
        app.select_goal(id).expect("select");
        add_task(&mut app, "Task", None).await;

        app.begin_goal_edit(Some(id)).expect("edit");
        app.submit_goal(GoalInput {
            title: "Renamed".to_string(),
            description: Some("notes".to_string()),
        })
        .await
        .expect("update");
        let stored = stored_goal(&app, id).await;
        assert_eq!(stored.title, "Renamed");
        assert_eq!(stored.tasks.len(), 1);
        assert!(app.session().editing_goal.is_none());

        fail_writes(&app, true);
        app.begin_goal_edit(Some(id)).expect("edit");
        app.submit_goal(GoalInput {
            title: "Broken".to_string(),
            description: None,
        })
        .await
        .expect_err("store down");
        let cached = app.session().require_goal(id).expect("cached");
        assert_eq!(cached.title, "Renamed");
        assert_eq!(cached.description.as_deref(), Some("notes"));
    }

    #[tokio::test]
    async fn pin_failure_restores_flag() {
        let (_dir, mut app) = setup_app().await;
        let id = add_goal(&mut app, "Goal").await;

        assert!(app.toggle_pin(id).await.expect("pin"));
        assert!(stored_goal(&app, id).await.pinned);

        fail_writes(&app, true);
        app.toggle_pin(id).await.expect_err("store down");
        assert!(app.session().require_goal(id).expect("cached").pinned);
    }

    #[tokio::test]
    async fn pinned_goal_moves_to_front() {
        let (_dir, mut app) = setup_app().await;
        let old = add_goal(&mut app, "Old").await;
        let new = add_goal(&mut app, "New").await;
        app.toggle_pin(old).await.expect("pin");
        let ids: Vec<GoalId> = app.session().goals.iter().map(|goal| goal.id).collect();
        assert_eq!(ids, vec![old, new]);
    }

    #[tokio::test]
    async fn toggle_rejection_writes_nothing() {
        let (_dir, mut app) = setup_app().await;
        let id = add_goal(&mut app, "Goal").await;
        app.select_goal(id).expect("select");
        let parent = add_task(&mut app, "Parent", None).await;
        add_task(&mut app, "Child", Some(&parent)).await;
        let before = writes(&app);

        let err = app.toggle_task(&parent, true).await.expect_err("rejected");
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(writes(&app), before);
        let goal = app.session().require_goal(id).expect("cached");
        assert!(!find_task(&goal.tasks, &parent).expect("parent").completed);
    }

    #[tokio::test]
    async fn completing_children_then_parent_reaches_full_progress() {
        let (_dir, mut app) = setup_app().await;
        let id = add_goal(&mut app, "Goal").await;
        app.select_goal(id).expect("select");
        let parent = add_task(&mut app, "Parent", None).await;
        let child = add_task(&mut app, "Child", Some(&parent)).await;

        app.toggle_task(&child, true).await.expect("child");
        app.toggle_task(&parent, true).await.expect("parent");
        assert_eq!(goal_progress(&stored_goal(&app, id).await), 100);

        let plan = app.toggle_task(&child, false).await.expect("reopen");
        assert_eq!(plan.changes.len(), 2);
        let stored = stored_goal(&app, id).await;
        assert!(!find_task(&stored.tasks, &parent).expect("parent").completed);
        assert_eq!(goal_progress(&stored), 0);
    }

    #[tokio::test]
    async fn reopening_grandchild_leaves_grandparent_done() {
        let (_dir, mut app) = setup_app().await;
        let id = add_goal(&mut app, "Goal").await;
        app.select_goal(id).expect("select");
        let top = add_task(&mut app, "Top", None).await;
        let mid = add_task(&mut app, "Mid", Some(&top)).await;
        let leaf = add_task(&mut app, "Leaf", Some(&mid)).await;
        for task_id in [&leaf, &mid, &top] {
            app.toggle_task(task_id, true).await.expect("complete");
        }

        app.toggle_task(&leaf, false).await.expect("reopen");
        let tasks = &app.session().require_goal(id).expect("cached").tasks;
        assert!(!find_task(tasks, &mid).expect("mid").completed);
        assert!(find_task(tasks, &top).expect("top").completed);
    }

    #[tokio::test]
    async fn failed_toggle_restores_node_and_parent() {
        let (_dir, mut app) = setup_app().await;
        let id = add_goal(&mut app, "Goal").await;
        app.select_goal(id).expect("select");
        let parent = add_task(&mut app, "Parent", None).await;
        let child = add_task(&mut app, "Child", Some(&parent)).await;
        app.toggle_task(&child, true).await.expect("child");
        app.toggle_task(&parent, true).await.expect("parent");

        fail_writes(&app, true);
        app.toggle_task(&child, false).await.expect_err("store down");
        let tasks = &app.session().require_goal(id).expect("cached").tasks;
        assert!(find_task(tasks, &child).expect("child").completed);
        assert!(find_task(tasks, &parent).expect("parent").completed);
    }

    #[tokio::test]
    async fn subtask_under_missing_or_completed_parent_is_rejected() {
        let (_dir, mut app) = setup_app().await;
        let id = add_goal(&mut app, "Goal").await;
        app.select_goal(id).expect("select");
        let done = add_task(&mut app, "Done", None).await;
        app.toggle_task(&done, true).await.expect("complete");
        let before = writes(&app);

        let input = |parent: &str| TaskInput {
            title: "Child".to_string(),
            description: None,
            parent_id: Some(parent.to_string()),
        };
        let err = app.submit_task(input("missing")).await.expect_err("missing");
        assert!(matches!(err, AppError::NotFound(_)));
        let err = app.submit_task(input(&done)).await.expect_err("completed");
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(writes(&app), before);
    }

    #[tokio::test]
    async fn failed_task_insert_restores_forest() {
        let (_dir, mut app) = setup_app().await;
        let id = add_goal(&mut app, "Goal").await;
        app.select_goal(id).expect("select");
        let parent = add_task(&mut app, "Parent", None).await;

        fail_writes(&app, true);
        app.submit_task(TaskInput {
            title: "Child".to_string(),
            description: None,
            parent_id: Some(parent.clone()),
        })
        .await
        .expect_err("store down");
        let tasks = &app.session().require_goal(id).expect("cached").tasks;
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].subtasks.is_empty());
    }

    #[tokio::test]
    async fn task_edit_changes_text_only() {
        let (_dir, mut app) = setup_app().await;
        let id = add_goal(&mut app, "Goal").await;
        app.select_goal(id).expect("select");
        let parent = add_task(&mut app, "Parent", None).await;
        add_task(&mut app, "Child", Some(&parent)).await;

        app.begin_task_edit(Some(parent.clone())).expect("edit");
        app.submit_task(TaskInput {
            title: "Renamed".to_string(),
            description: Some("why".to_string()),
            parent_id: None,
        })
        .await
        .expect("update");
        let stored = stored_goal(&app, id).await;
        let task = find_task(&stored.tasks, &parent).expect("parent");
        assert_eq!(task.title, "Renamed");
        assert_eq!(task.description.as_deref(), Some("why"));
        assert_eq!(task.subtasks.len(), 1);
        assert!(app.session().editing_task.is_none());
    }

    #[tokio::test]
    async fn deleting_current_goal_returns_to_list() {
        let (_dir, mut app) = setup_app().await;
        let id = add_goal(&mut app, "Goal").await;
        app.select_goal(id).expect("select");

        let pending = app.request_delete(DeleteTarget::Goal(id)).expect("request");
        assert_eq!(pending.display_title, "Goal");
        app.confirm_delete().await.expect("delete");

        assert!(app.session().current_goal.is_none());
        assert!(app.session().pending_delete.is_none());
        assert!(app.session().goals.is_empty());
    }

    #[tokio::test]
    async fn failed_goal_delete_reinserts_in_place() {
        let (_dir, mut app) = setup_app().await;
        let first = add_goal(&mut app, "First").await;
        let second = add_goal(&mut app, "Second").await;
        let third = add_goal(&mut app, "Third").await;

        fail_writes(&app, true);
        app.request_delete(DeleteTarget::Goal(second)).expect("request");
        app.confirm_delete().await.expect_err("store down");

        let ids: Vec<GoalId> = app.session().goals.iter().map(|goal| goal.id).collect();
        assert_eq!(ids, vec![third, second, first]);
        assert!(app.session().pending_delete.is_none());
    }

    #[tokio::test]
    async fn deleting_task_removes_subtree() {
        let (_dir, mut app) = setup_app().await;
        let id = add_goal(&mut app, "Goal").await;
        app.select_goal(id).expect("select");
        let parent = add_task(&mut app, "Parent", None).await;
        add_task(&mut app, "Child", Some(&parent)).await;
        let keep = add_task(&mut app, "Keep", None).await;

        app.request_delete(DeleteTarget::Task {
            goal_id: id,
            task_id: parent.clone(),
        })
        .expect("request");
        app.confirm_delete().await.expect("delete");
        let stored = stored_goal(&app, id).await;
        assert_eq!(stored.tasks.len(), 1);
        assert_eq!(stored.tasks[0].id, keep);
    }

    #[tokio::test]
    async fn cancel_and_missing_pending_delete() {
        let (_dir, mut app) = setup_app().await;
        let id = add_goal(&mut app, "Goal").await;
        app.request_delete(DeleteTarget::Goal(id)).expect("request");
        app.cancel_delete();
        assert!(app.confirm_delete().await.is_err());
        assert_eq!(app.session().goals.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_sessions_last_write_wins() {
        let (dir, mut first) = setup_app().await;
        let id = add_goal(&mut first, "Goal").await;
        first.select_goal(id).expect("select");
        add_task(&mut first, "From first", None).await;

        let db = db::open_temp(dir.path()).await;
        let store = FlakyStore {
            inner: SeaOrmGoalStore::new(db),
            fail: Arc::new(AtomicBool::new(false)),
            writes: Arc::new(AtomicUsize::new(0)),
        };
        let mut second = App::new(store, GoalSort::Newest, TaskSort::Default);
        second.handle_auth_change(Some(user())).await.expect("sign in");
        second.select_goal(id).expect("select");

        add_task(&mut first, "Only in first", None).await;
        add_task(&mut second, "From second", None).await;

        let titles: Vec<String> = stored_goal(&first, id)
            .await
            .tasks
            .into_iter()
            .map(|task| task.title)
            .collect();
        assert_eq!(titles, vec!["From first", "From second"]);
    }

    #[tokio::test]
    async fn sign_out_clears_session_but_keeps_sorts() {
        let (_dir, mut app) = setup_app().await;
        app.session.goal_sort = GoalSort::Title;
        let id = add_goal(&mut app, "Goal").await;
        app.select_goal(id).expect("select");
        app.request_delete(DeleteTarget::Goal(id)).expect("request");

        app.handle_auth_change(None).await.expect("sign out");
        let session = app.session();
        assert!(session.user.is_none());
        assert!(session.goals.is_empty());
        assert!(session.current_goal.is_none());
        assert!(session.pending_delete.is_none());
        assert_eq!(session.goal_sort, GoalSort::Title);
    }

    #[tokio::test]
    async fn mutations_require_signed_in_user_and_selection() {
        let (_dir, mut app) = setup_app().await;
        let err = app.toggle_task("t1", true).await.expect_err("no goal");
        assert!(matches!(err, AppError::Validation(_)));

        app.handle_auth_change(None).await.expect("sign out");
        let err = app
            .submit_goal(GoalInput {
                title: "Goal".to_string(),
                description: None,
            })
            .await
            .expect_err("signed out");
        assert!(matches!(err, AppError::Auth(_)));
    }
}
