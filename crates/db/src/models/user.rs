use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::user;

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),
    #[error("User not found")]
    UserNotFound,
    #[error("User name is already taken")]
    UserNameTaken,
    #[error("User not registered")]
    UserNotRegistered,
    #[error("Incorrect password")]
    WrongPassword,
}

/// Public view of a user; the password hash never leaves this module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub user_name: String,
    pub full_name: String,
    pub password: String,
}

impl User {
    fn from_model(model: user::Model) -> Self {
        Self {
            id: model.uuid,
            user_name: model.user_name,
            full_name: model.full_name,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_by_user_name<C: ConnectionTrait>(
        db: &C,
        user_name: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::UserName.eq(user_name))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateUser,
        user_id: Uuid,
    ) -> Result<Self, UserError> {
        let existing = user::Entity::find()
            .filter(user::Column::UserName.eq(&data.user_name))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(UserError::UserNameTaken);
        }

        let password_hash = bcrypt::hash(&data.password, bcrypt::DEFAULT_COST)?;
        let now = Utc::now();
        let active = user::ActiveModel {
            uuid: Set(user_id),
            user_name: Set(data.user_name.clone()),
            full_name: Set(data.full_name.clone()),
            password_hash: Set(password_hash),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    /// Checks the credentials and returns the matching user.
    pub async fn authenticate<C: ConnectionTrait>(
        db: &C,
        user_name: &str,
        password: &str,
    ) -> Result<Self, UserError> {
        let record = user::Entity::find()
            .filter(user::Column::UserName.eq(user_name))
            .one(db)
            .await?
            .ok_or(UserError::UserNotRegistered)?;

        if !bcrypt::verify(password, &record.password_hash)? {
            return Err(UserError::WrongPassword);
        }

        Ok(Self::from_model(record))
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    fn alice() -> CreateUser {
        CreateUser {
            user_name: "alice".to_string(),
            full_name: "Alice Doe".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_user_name_is_rejected() {
        let db = setup_db().await;

        User::create(&db, &alice(), Uuid::new_v4()).await.unwrap();
        let err = User::create(&db, &alice(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::UserNameTaken));
    }

    #[tokio::test]
    async fn authenticate_verifies_password() {
        let db = setup_db().await;
        let created = User::create(&db, &alice(), Uuid::new_v4()).await.unwrap();

        let user = User::authenticate(&db, "alice", "hunter2").await.unwrap();
        assert_eq!(user.id, created.id);

        let err = User::authenticate(&db, "alice", "wrong").await.unwrap_err();
        assert!(matches!(err, UserError::WrongPassword));

        let err = User::authenticate(&db, "bob", "hunter2").await.unwrap_err();
        assert!(matches!(err, UserError::UserNotRegistered));
    }
}
