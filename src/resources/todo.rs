//! Todos: a titled list of tasks

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{present, Resource, ResourceKind};
use crate::error::{AppError, AppResult};
use crate::store::{query::new_id, to_document, Document, OWNER_FIELD};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
    pub created_at: String,
    pub updated_at: String,
}

impl Resource for Todo {
    const KIND: ResourceKind = ResourceKind::Todo;
    type Listed = Todo;

    fn owner(&self) -> &str {
        &self.user_id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub text: Option<String>,
    pub completed: Option<bool>,
}

impl NewTask {
    fn into_task(self) -> AppResult<Task> {
        let text = present(self.text)
            .ok_or_else(|| AppError::Validation("Every task needs text".to_string()))?;
        Ok(Task {
            id: new_id(),
            text,
            completed: self.completed.unwrap_or(false),
        })
    }
}

fn build_tasks(tasks: Vec<NewTask>) -> AppResult<Value> {
    let tasks = tasks
        .into_iter()
        .map(NewTask::into_task)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(serde_json::to_value(tasks)?)
}

/// Body of a create request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTodo {
    pub title: Option<String>,
    pub tasks: Option<Vec<NewTask>>,
}

impl NewTodo {
    pub fn into_document(self, user_id: &str) -> AppResult<Document> {
        let title = present(self.title)
            .ok_or_else(|| AppError::Validation("Title is required".to_string()))?;

        let mut doc = Document::new();
        doc.insert(OWNER_FIELD.to_string(), Value::from(user_id));
        doc.insert("title".to_string(), Value::from(title));
        doc.insert(
            "tasks".to_string(),
            build_tasks(self.tasks.unwrap_or_default())?,
        );
        Ok(doc)
    }
}

/// Body of a replace request: a new title and/or a new task list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoUpdate {
    pub title: Option<String>,
    pub tasks: Option<Vec<NewTask>>,
}

impl TodoUpdate {
    pub fn into_update(self) -> AppResult<Document> {
        let mut update = Document::new();
        if let Some(title) = present(self.title) {
            update.insert("title".to_string(), Value::from(title));
        }
        if let Some(tasks) = self.tasks {
            update.insert("tasks".to_string(), build_tasks(tasks)?);
        }

        if update.is_empty() {
            return Err(AppError::Validation(
                "At least one field (title or tasks) is required to update".to_string(),
            ));
        }
        Ok(update)
    }
}

/// Body of a single-task update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub task_id: Option<String>,
    pub text: Option<String>,
    pub completed: Option<bool>,
}

impl Todo {
    /// Apply `update` to the matching task and return the `$set` document
    /// replacing the task list
    pub fn apply_task_update(&mut self, update: &TaskUpdate) -> AppResult<Document> {
        let task_id = present(update.task_id.clone())
            .ok_or_else(|| AppError::Validation("taskId is required".to_string()))?;
        let text = present(update.text.clone());
        if text.is_none() && update.completed.is_none() {
            return Err(AppError::Validation(
                "At least one field (text or completed) is required to update".to_string(),
            ));
        }

        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;
        if let Some(text) = text {
            task.text = text;
        }
        if let Some(completed) = update.completed {
            task.completed = completed;
        }

        self.tasks_update()
    }

    pub fn has_task(&self, task_id: &str) -> bool {
        self.tasks.iter().any(|t| t.id == task_id)
    }

    /// Remove a task, returning the `$set` document if it was present
    pub fn remove_task(&mut self, task_id: &str) -> AppResult<Option<Document>> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != task_id);
        if self.tasks.len() == before {
            return Ok(None);
        }
        self.tasks_update().map(Some)
    }

    fn tasks_update(&self) -> AppResult<Document> {
        #[derive(Serialize)]
        struct Tasks<'a> {
            tasks: &'a [Task],
        }
        Ok(to_document(&Tasks { tasks: &self.tasks })?)
    }
}
