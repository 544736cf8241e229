use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db;
use crate::entities::user;
use crate::error::AppError;
use crate::model::User;

const MIN_PASSWORD_LEN: usize = 6;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AppError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<User, AppError>;

    async fn sign_out(&self) -> Result<(), AppError>;

    fn subscribe(&self) -> watch::Receiver<Option<User>>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    user_id: String,
}

pub struct LocalIdentity {
    db: DatabaseConnection,
    session_path: PathBuf,
    current: watch::Sender<Option<User>>,
}

impl LocalIdentity {
    pub fn new(db: DatabaseConnection, session_path: PathBuf) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            db,
            session_path,
            current,
        }
    }

    pub async fn restore(&self) -> Result<Option<User>, AppError> {
        if !self.session_path.exists() {
            self.current.send_replace(None);
            return Ok(None);
        }
        let session = match self.read_session() {
            Ok(session) => session,
            Err(err) => {
                warn!(path = %self.session_path.display(), "discarding unreadable session: {err}");
                fs::remove_file(&self.session_path)?;
                self.current.send_replace(None);
                return Ok(None);
            }
        };
        let found = user::Entity::find_by_id(session.user_id.clone())
            .one(&self.db)
            .await?;
        let restored = match found {
            Some(model) => Some(user_from_model(model)),
            None => {
                debug!(user_id = %session.user_id, "session refers to unknown user; clearing");
                fs::remove_file(&self.session_path)?;
                None
            }
        };
        self.current.send_replace(restored.clone());
        Ok(restored)
    }

    fn read_session(&self) -> Result<SessionFile, AppError> {
        let raw = fs::read_to_string(&self.session_path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn persist_session(&self, user: &User) -> Result<(), AppError> {
        db::ensure_parent_dir(&self.session_path)?;
        let body = serde_json::to_string(&SessionFile {
            user_id: user.id.clone(),
        })?;
        fs::write(&self.session_path, body)?;
        Ok(())
    }

    fn publish(&self, user: Option<User>) {
        info!(
            user = user.as_ref().map(|u| u.email.as_str()).unwrap_or("-"),
            "auth state changed"
        );
        self.current.send_replace(user);
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = normalize_email(email);
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&self.db)
            .await?;
        let Some(model) = found else {
            return Err(invalid_credentials());
        };
        if hash_password(&model.salt, password) != model.password_hash {
            return Err(invalid_credentials());
        }
        let user = user_from_model(model);
        self.persist_session(&user)?;
        self.publish(Some(user.clone()));
        Ok(user)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<User, AppError> {
        let email = normalize_email(email);
        validate_email(&email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Auth(format!(
                "password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(AppError::Auth(
                "email address is already in use by another account".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let salt = Uuid::new_v4().simple().to_string();
        let display_name = Some(display_name.trim().to_string()).filter(|name| !name.is_empty());
        let active = user::ActiveModel {
            id: Set(id.clone()),
            email: Set(email),
            display_name: Set(display_name),
            password_hash: Set(hash_password(&salt, password)),
            salt: Set(salt),
            created_at: Set(Utc::now()),
        };
        user::Entity::insert(active).exec(&self.db).await?;
        let model = user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found after insert".to_string()))?;
        let user = user_from_model(model);
        self.persist_session(&user)?;
        self.publish(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        if self.session_path.exists() {
            fs::remove_file(&self.session_path)?;
        }
        self.publish(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.current.subscribe()
    }
}

fn user_from_model(model: user::Model) -> User {
    User {
        id: model.id,
        email: model.email,
        display_name: model.display_name,
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::Auth("the email address is badly formatted".to_string()))
    }
}

fn invalid_credentials() -> AppError {
    AppError::Auth("invalid email or password".to_string())
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
