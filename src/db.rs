use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use url::Url;

use crate::entities::{goal, user};
use crate::error::AppError;

pub const HOME_ENV: &str = "GOALMAP_HOME";

pub fn resolve_db_path(home: &Path) -> PathBuf {
    home.join("goalmap.db")
}

pub fn resolve_session_path(home: &Path) -> PathBuf {
    home.join("session.json")
}

pub fn resolve_prefs_path(home: &Path) -> PathBuf {
    home.join("prefs.json")
}

pub fn resolve_home(flag: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Ok(value) = std::env::var(HOME_ENV) {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        return Ok(PathBuf::from(home).join(".goalmap"));
    }
    Err(AppError::Validation(format!(
        "unable to resolve data directory; pass --home or set {HOME_ENV}"
    )))
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn open_lock(path: &Path) -> Result<fd_lock::RwLock<File>, AppError> {
    let lock_path = path.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path)?;
    Ok(fd_lock::RwLock::new(file))
}

pub async fn connect(path: &Path) -> Result<DatabaseConnection, AppError> {
    let mut url = Url::from_file_path(path)
        .map_err(|_| AppError::Validation(format!("invalid sqlite path: {}", path.display())))?;
    url.set_query(Some("mode=rwc"));
    let sqlite_url = url.as_str().replacen("file://", "sqlite://", 1);
    Ok(Database::connect(&sqlite_url).await?)
}

pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), AppError> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut goal_stmt = schema.create_table_from_entity(goal::Entity);
    goal_stmt.if_not_exists();
    db.execute(builder.build(&goal_stmt)).await?;

    let mut user_stmt = schema.create_table_from_entity(user::Entity);
    user_stmt.if_not_exists();
    db.execute(builder.build(&user_stmt)).await?;

    let mut owner_index = Index::create()
        .name("idx_goals_owner_created")
        .table(goal::Entity)
        .col(goal::Column::OwnerId)
        .col(goal::Column::CreatedAt)
        .to_owned();
    owner_index.if_not_exists();
    db.execute(builder.build(&owner_index)).await?;

    Ok(())
}

#[cfg(test)]
pub async fn open_temp(dir: &Path) -> DatabaseConnection {
    let db_path = resolve_db_path(dir);
    ensure_parent_dir(&db_path).expect("ensure parent");
    let db = connect(&db_path).await.expect("connect db");
    ensure_schema(&db).await.expect("ensure schema");
    db
}
