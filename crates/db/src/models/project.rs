use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    entities::{project, task},
    models::{
        ids,
        task::Task,
        task_tree::{self, TaskTree},
    },
};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Project not found")]
    ProjectNotFound,
    #[error("User not found")]
    UserNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A project with its root tasks, each carrying the nested subtask forest.
#[derive(Debug, Serialize)]
pub struct ProjectWithTasks {
    #[serde(flatten)]
    pub project: Project,
    pub tasks: Vec<TaskTree>,
}

impl Project {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: project::Model,
    ) -> Result<Self, DbErr> {
        let user_id = ids::user_uuid_by_id(db, model.user_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            user_id,
            name: model.name,
            description: model.description,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// The user's projects, newest first.
    pub async fn find_all<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<Self>, ProjectError> {
        let user_row_id = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(ProjectError::UserNotFound)?;

        let models = project::Entity::find()
            .filter(project::Column::UserId.eq(user_row_id))
            .order_by_desc(project::Column::CreatedAt)
            .order_by_desc(project::Column::Id)
            .all(db)
            .await?;

        let mut projects = Vec::with_capacity(models.len());
        for model in models {
            projects.push(Self::from_model(db, model).await?);
        }
        Ok(projects)
    }

    /// The user's projects, each with its task forest attached.
    ///
    /// All tasks of all projects come back in one read and are grouped by
    /// project before the per-project forest build. Unfiled tasks (null
    /// project) never appear here.
    pub async fn find_all_with_tasks<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<ProjectWithTasks>, ProjectError> {
        let user_row_id = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(ProjectError::UserNotFound)?;

        let project_models = project::Entity::find()
            .filter(project::Column::UserId.eq(user_row_id))
            .order_by_desc(project::Column::CreatedAt)
            .order_by_desc(project::Column::Id)
            .all(db)
            .await?;

        if project_models.is_empty() {
            return Ok(Vec::new());
        }

        let project_row_ids: Vec<i64> = project_models.iter().map(|model| model.id).collect();
        let task_models = task::Entity::find()
            .filter(task::Column::ProjectId.is_in(project_row_ids))
            .order_by_asc(task::Column::CreatedAt)
            .order_by_asc(task::Column::Id)
            .all(db)
            .await?;

        let mut grouped: HashMap<i64, Vec<task::Model>> = HashMap::new();
        for model in task_models {
            if let Some(project_row_id) = model.project_id {
                grouped.entry(project_row_id).or_default().push(model);
            }
        }

        let mut projects = Vec::with_capacity(project_models.len());
        for model in project_models {
            let row_id = model.id;
            let project = Self::from_model(db, model).await?;
            let tasks = match grouped.remove(&row_id) {
                Some(models) => task_tree::build_forest(Task::from_models(db, models).await?),
                None => Vec::new(),
            };
            projects.push(ProjectWithTasks { project, tasks });
        }

        Ok(projects)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateProject,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Self, ProjectError> {
        let user_row_id = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(ProjectError::UserNotFound)?;

        let now = Utc::now();
        let active = project::ActiveModel {
            uuid: Set(project_id),
            user_id: Set(user_row_id),
            name: Set(data.name.clone()),
            description: Set(data.description.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(db, model).await?)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateProject,
    ) -> Result<Self, ProjectError> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ProjectError::ProjectNotFound)?;

        let mut active: project::ActiveModel = record.into();
        if let Some(name) = payload.name.clone() {
            active.name = Set(name);
        }
        if let Some(description) = payload.description.clone() {
            active.description = Set(description);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// Removes the project. Its tasks go with it through the storage-layer
    /// `ON DELETE CASCADE` on `tasks.project_id`.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = project::Entity::delete_many()
            .filter(project::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
