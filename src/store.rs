use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::debug;

use crate::entities::goal;
use crate::error::AppError;
use crate::model::{Goal, GoalId, GoalPatch, NewGoal, Task};

/// Last write wins: `update` overwrites the fields it is given, `tasks` always
/// as a whole forest, with no version check.
#[async_trait]
pub trait GoalStore: Send + Sync {
    async fn create(&self, goal: NewGoal) -> Result<Goal, AppError>;

    async fn update(&self, id: GoalId, patch: GoalPatch) -> Result<(), AppError>;

    async fn delete(&self, id: GoalId) -> Result<(), AppError>;

    async fn query_all_for_owner(&self, owner_id: &str) -> Result<Vec<Goal>, AppError>;
}

#[derive(Clone)]
pub struct SeaOrmGoalStore {
    db: DatabaseConnection,
}

impl SeaOrmGoalStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl GoalStore for SeaOrmGoalStore {
    async fn create(&self, input: NewGoal) -> Result<Goal, AppError> {
        let now = Utc::now();
        let active = goal::ActiveModel {
            owner_id: Set(input.owner_id),
            owner_name: Set(input.owner_name),
            title: Set(input.title),
            description: Set(normalize_text(input.description)),
            tasks: Set(tasks_to_json(&input.tasks)?),
            pinned: Set(input.pinned),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let insert = goal::Entity::insert(active).exec(&self.db).await?;
        let model = goal::Entity::find_by_id(insert.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("goal not found after insert".to_string()))?;
        debug!(goal_id = model.id, "created goal document");
        goal_from_model(model)
    }

    async fn update(&self, id: GoalId, patch: GoalPatch) -> Result<(), AppError> {
        let mut active = goal::ActiveModel {
            id: Set(id),
            ..Default::default()
        };
        if let Some(title) = patch.title {
            active.title = Set(title);
        }
        if let Some(description) = patch.description {
            active.description = Set(normalize_text(description));
        }
        if let Some(tasks) = patch.tasks {
            active.tasks = Set(tasks_to_json(&tasks)?);
        }
        if let Some(pinned) = patch.pinned {
            active.pinned = Set(pinned);
        }
        active.updated_at = Set(Utc::now());

        match active.update(&self.db).await {
            Ok(_) => {
                debug!(goal_id = id, "updated goal document");
                Ok(())
            }
            Err(sea_orm::DbErr::RecordNotFound(_)) | Err(sea_orm::DbErr::RecordNotUpdated) => {
                Err(AppError::NotFound(format!("goal id {id}")))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, id: GoalId) -> Result<(), AppError> {
        let result = goal::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("goal id {id}")));
        }
        debug!(goal_id = id, "deleted goal document");
        Ok(())
    }

    async fn query_all_for_owner(&self, owner_id: &str) -> Result<Vec<Goal>, AppError> {
        let models = goal::Entity::find()
            .filter(goal::Column::OwnerId.eq(owner_id))
            .order_by_desc(goal::Column::CreatedAt)
            .order_by_desc(goal::Column::Id)
            .all(&self.db)
            .await?;
        models.into_iter().map(goal_from_model).collect()
    }
}

fn goal_from_model(model: goal::Model) -> Result<Goal, AppError> {
    let tasks: Vec<Task> = if model.tasks.is_null() {
        Vec::new()
    } else {
        serde_json::from_value(model.tasks)?
    };
    Ok(Goal {
        id: model.id,
        title: model.title,
        description: normalize_text(model.description),
        tasks,
        pinned: model.pinned,
        owner_id: model.owner_id,
        owner_name: model.owner_name,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

fn tasks_to_json(tasks: &[Task]) -> Result<serde_json::Value, AppError> {
    Ok(serde_json::to_value(tasks)?)
}

pub fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
