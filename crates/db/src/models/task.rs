use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use crate::types::TaskStatus;

use crate::{entities::task, models::ids};

pub const DEFAULT_PRIORITY: i16 = 2;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Task not found")]
    TaskNotFound,
    #[error("You are not authorized to modify this task")]
    Unauthorized,
    #[error("User not found")]
    UserNotFound,
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Parent task not found")]
    ParentTaskNotFound,
    #[error("Priority must be between 1 (high) and 3 (low), got {0}")]
    InvalidPriority(i16),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub parent_task_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: i16,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<i16>,
    pub project_id: Option<Uuid>,
    pub parent_task_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

impl CreateTask {
    pub fn from_title(title: String) -> Self {
        Self {
            title,
            description: None,
            status: None,
            priority: None,
            project_id: None,
            parent_task_id: None,
            due_date: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<i16>,
    pub parent_task_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

impl Task {
    async fn from_model<C: ConnectionTrait>(db: &C, model: task::Model) -> Result<Self, DbErr> {
        let mut tasks = Self::from_models(db, vec![model]).await?;
        tasks
            .pop()
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))
    }

    /// Converts entity rows to public models, resolving row-id references to
    /// uuids. Parents inside the batch resolve without extra reads.
    pub(crate) async fn from_models<C: ConnectionTrait>(
        db: &C,
        models: Vec<task::Model>,
    ) -> Result<Vec<Self>, DbErr> {
        let uuid_by_row: HashMap<i64, Uuid> =
            models.iter().map(|model| (model.id, model.uuid)).collect();
        let mut user_uuids: HashMap<i64, Uuid> = HashMap::new();
        let mut project_uuids: HashMap<i64, Uuid> = HashMap::new();

        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            let user_id = match user_uuids.get(&model.user_id) {
                Some(uuid) => *uuid,
                None => {
                    let resolved = ids::user_uuid_by_id(db, model.user_id)
                        .await?
                        .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
                    user_uuids.insert(model.user_id, resolved);
                    resolved
                }
            };
            let project_id = match model.project_id {
                Some(row_id) => match project_uuids.get(&row_id) {
                    Some(uuid) => Some(*uuid),
                    None => {
                        let resolved = ids::project_uuid_by_id(db, row_id)
                            .await?
                            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;
                        project_uuids.insert(row_id, resolved);
                        Some(resolved)
                    }
                },
                None => None,
            };
            let parent_task_id = match model.parent_task_id {
                Some(row_id) => match uuid_by_row.get(&row_id) {
                    Some(uuid) => Some(*uuid),
                    // Parent outside the batch, e.g. scoped to another query.
                    None => ids::task_uuid_by_id(db, row_id).await?,
                },
                None => None,
            };

            tasks.push(Self {
                id: model.uuid,
                user_id,
                project_id,
                parent_task_id,
                title: model.title,
                description: model.description,
                status: model.status,
                priority: model.priority,
                due_date: model.due_date.map(Into::into),
                created_at: model.created_at.into(),
                updated_at: model.updated_at.into(),
            });
        }

        Ok(tasks)
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// All tasks owned by the user, oldest first. Sibling order downstream in
    /// the forest build relies on this ordering.
    pub async fn find_by_user<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<Self>, TaskError> {
        let user_row_id = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(TaskError::UserNotFound)?;

        let models = task::Entity::find()
            .filter(task::Column::UserId.eq(user_row_id))
            .order_by_asc(task::Column::CreatedAt)
            .order_by_asc(task::Column::Id)
            .all(db)
            .await?;

        Ok(Self::from_models(db, models).await?)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTask,
        task_id: Uuid,
        user_id: Uuid,
    ) -> Result<Self, TaskError> {
        if let Some(priority) = data.priority
            && !(1..=3).contains(&priority)
        {
            return Err(TaskError::InvalidPriority(priority));
        }

        let user_row_id = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(TaskError::UserNotFound)?;
        let project_row_id = match data.project_id {
            Some(id) => Some(
                ids::project_id_by_uuid(db, id)
                    .await?
                    .ok_or(TaskError::ProjectNotFound)?,
            ),
            None => None,
        };
        let parent_row_id = match data.parent_task_id {
            Some(id) => Some(
                ids::task_id_by_uuid(db, id)
                    .await?
                    .ok_or(TaskError::ParentTaskNotFound)?,
            ),
            None => None,
        };

        let now = Utc::now();
        let active = task::ActiveModel {
            uuid: Set(task_id),
            user_id: Set(user_row_id),
            project_id: Set(project_row_id),
            parent_task_id: Set(parent_row_id),
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            status: Set(data.status.clone().unwrap_or_default()),
            priority: Set(data.priority.unwrap_or(DEFAULT_PRIORITY)),
            due_date: Set(data.due_date.map(Into::into)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(db, model).await?)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        user_id: Uuid,
        title: String,
        description: Option<String>,
        status: TaskStatus,
        priority: i16,
        due_date: Option<DateTime<Utc>>,
        parent_task_id: Option<Uuid>,
    ) -> Result<Self, TaskError> {
        if !(1..=3).contains(&priority) {
            return Err(TaskError::InvalidPriority(priority));
        }

        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::TaskNotFound)?;

        let caller_row_id = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(TaskError::Unauthorized)?;
        if record.user_id != caller_row_id {
            return Err(TaskError::Unauthorized);
        }

        let parent_row_id = match parent_task_id {
            Some(parent_id) => Some(
                ids::task_id_by_uuid(db, parent_id)
                    .await?
                    .ok_or(TaskError::ParentTaskNotFound)?,
            ),
            None => None,
        };

        let mut active: task::ActiveModel = record.into();
        active.title = Set(title);
        active.description = Set(description);
        active.status = Set(status);
        active.priority = Set(priority);
        active.due_date = Set(due_date.map(Into::into));
        active.parent_task_id = Set(parent_row_id);
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// Deletes the task and every transitive subtask.
    ///
    /// Descendants are collected first, level by level, then removed with a
    /// single bulk delete, so a subtree is never left half-deleted by a
    /// failure between per-node deletes. The visited set bounds the walk on
    /// corrupt data that links tasks into a cycle.
    pub async fn delete_with_descendants<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, TaskError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::TaskNotFound)?;

        let caller_row_id = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(TaskError::Unauthorized)?;
        if record.user_id != caller_row_id {
            return Err(TaskError::Unauthorized);
        }

        let mut seen: HashSet<i64> = HashSet::from([record.id]);
        let mut to_delete: Vec<i64> = vec![record.id];
        let mut frontier: Vec<i64> = vec![record.id];

        while !frontier.is_empty() {
            let children: Vec<i64> = task::Entity::find()
                .select_only()
                .column(task::Column::Id)
                .filter(task::Column::ParentTaskId.is_in(frontier.clone()))
                .into_tuple()
                .all(db)
                .await?;

            frontier = children
                .into_iter()
                .filter(|child_id| seen.insert(*child_id))
                .collect();
            to_delete.extend(frontier.iter().copied());
        }

        let result = task::Entity::delete_many()
            .filter(task::Column::Id.is_in(to_delete))
            .exec(db)
            .await?;

        if result.rows_affected > 1 {
            tracing::debug!(
                "Deleted task {} together with {} subtasks",
                id,
                result.rows_affected - 1
            );
        }

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::models::user::{CreateUser, User};

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn create_user(db: &sea_orm::DatabaseConnection, user_name: &str) -> Uuid {
        let user = User::create(
            db,
            &CreateUser {
                user_name: user_name.to_string(),
                full_name: user_name.to_string(),
                password: "secret".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        user.id
    }

    async fn create_task(
        db: &sea_orm::DatabaseConnection,
        user_id: Uuid,
        title: &str,
        parent: Option<Uuid>,
    ) -> Task {
        let mut data = CreateTask::from_title(title.to_string());
        data.parent_task_id = parent;
        Task::create(db, &data, Uuid::new_v4(), user_id).await.unwrap()
    }

    #[tokio::test]
    async fn cascade_delete_removes_whole_subtree_and_nothing_else() {
        let db = setup_db().await;
        let user_id = create_user(&db, "alice").await;

        let a = create_task(&db, user_id, "A", None).await;
        let b = create_task(&db, user_id, "B", Some(a.id)).await;
        let c = create_task(&db, user_id, "C", Some(b.id)).await;
        let d = create_task(&db, user_id, "D", None).await;

        let rows = Task::delete_with_descendants(&db, a.id, user_id)
            .await
            .unwrap();
        assert_eq!(rows, 3);

        let remaining = Task::find_by_user(&db, user_id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, d.id);
        for task in &remaining {
            assert_ne!(task.parent_task_id, Some(a.id));
            assert_ne!(task.parent_task_id, Some(b.id));
            assert_ne!(task.parent_task_id, Some(c.id));
        }
    }

    #[tokio::test]
    async fn cascade_delete_requires_ownership() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let mallory = create_user(&db, "mallory").await;

        let a = create_task(&db, alice, "A", None).await;
        let _b = create_task(&db, alice, "B", Some(a.id)).await;

        let err = Task::delete_with_descendants(&db, a.id, mallory)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Unauthorized));

        // Nothing was deleted.
        let remaining = Task::find_by_user(&db, alice).await.unwrap();
        assert_eq!(remaining.len(), 2);
    }

    #[tokio::test]
    async fn delete_of_unknown_task_is_not_found() {
        let db = setup_db().await;
        let user_id = create_user(&db, "alice").await;

        let err = Task::delete_with_descendants(&db, Uuid::new_v4(), user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::TaskNotFound));
    }

    #[tokio::test]
    async fn create_validates_priority_and_references() {
        let db = setup_db().await;
        let user_id = create_user(&db, "alice").await;

        let mut data = CreateTask::from_title("bad".to_string());
        data.priority = Some(4);
        let err = Task::create(&db, &data, Uuid::new_v4(), user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::InvalidPriority(4)));

        let mut data = CreateTask::from_title("orphan".to_string());
        data.parent_task_id = Some(Uuid::new_v4());
        let err = Task::create(&db, &data, Uuid::new_v4(), user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::ParentTaskNotFound));
    }

    #[tokio::test]
    async fn update_replaces_fields_and_checks_ownership() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let mallory = create_user(&db, "mallory").await;

        let task = create_task(&db, alice, "draft", None).await;

        let updated = Task::update(
            &db,
            task.id,
            alice,
            "final".to_string(),
            Some("ready".to_string()),
            TaskStatus::InProgress,
            1,
            None,
            None,
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "final");
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert_eq!(updated.priority, 1);

        let err = Task::update(
            &db,
            task.id,
            mallory,
            "stolen".to_string(),
            None,
            TaskStatus::Pending,
            2,
            None,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TaskError::Unauthorized));
    }
}
