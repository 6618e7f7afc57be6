#![forbid(unsafe_code)]

use crate::clock::{self, Clock};
use crate::error::{BoardError, Result};
use crate::ids::{self, IdInput};
use crate::input;
use crate::store::{EntityKind, RecordStore};
use crate::task::filter::{self, TaskFilter};
use crate::task::model::{NewTask, Priority, Task, TaskPatch};
use crate::task::status::{self, TaskStatus};

/// CRUD over the task collection.
///
/// The repository owns task identity and the canonical form of `projectId`.
/// It does not check that the project exists; callers resolve the project
/// before creating a task.
#[derive(Debug, Clone, Copy)]
pub struct TaskRepository<'a> {
    store: &'a RecordStore,
    clock: &'a dyn Clock,
}

impl<'a> TaskRepository<'a> {
    #[must_use]
    pub fn new(store: &'a RecordStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    pub fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        Ok(filter::apply(self.store.load()?, filter))
    }

    pub fn get(&self, id: &str) -> Result<Task> {
        let id = existing_id(id)?;
        self.store.get(&id)
    }

    pub fn create(&self, input: NewTask) -> Result<Task> {
        let project_id = input
            .project_id
            .as_ref()
            .and_then(IdInput::canonical)
            .ok_or_else(|| BoardError::validation("projectId is required"))?;
        let title = input::required("title", input.title)?;
        let status = match input.status.as_deref() {
            Some(s) => s.parse()?,
            None => TaskStatus::default(),
        };
        let priority = match input.priority.as_deref() {
            Some(p) => p.parse()?,
            None => Priority::default(),
        };

        let now = self.clock.now();
        let task = self.store.insert(Task {
            id: ids::new_id(),
            project_id,
            title,
            description: input::optional(input.description),
            status,
            priority,
            created_at: now,
            updated_at: now,
        })?;
        tracing::debug!(task_id = %task.id, project_id = %task.project_id, "created task");
        Ok(task)
    }

    /// Merges `patch` over the stored task. An absent `projectId` keeps the
    /// current project.
    pub fn update(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        let id = existing_id(id)?;
        let project_id = match &patch.project_id {
            Some(p) => Some(
                p.canonical()
                    .ok_or_else(|| BoardError::validation("projectId must not be empty"))?,
            ),
            None => None,
        };
        let title = match patch.title {
            Some(t) => Some(input::required("title", Some(t))?),
            None => None,
        };
        let priority: Option<Priority> = patch.priority.as_deref().map(str::parse).transpose()?;
        let now = self.clock.now();

        let task = self.store.update::<Task, _>(&id, |task| {
            if let Some(raw) = patch.status.as_deref() {
                task.status = status::validate_transition(task.status, raw)?;
            }
            if let Some(project_id) = project_id {
                task.project_id = project_id;
            }
            if let Some(title) = title {
                task.title = title;
            }
            if let Some(description) = patch.description {
                task.description = input::optional(Some(description));
            }
            if let Some(priority) = priority {
                task.priority = priority;
            }
            task.updated_at = clock::touch(task.updated_at, now);
            Ok(())
        })?;
        tracing::debug!(task_id = %task.id, status = %task.status, "updated task");
        Ok(task)
    }

    /// Moves a task to another board column.
    pub fn move_to(&self, id: &str, status: &str) -> Result<Task> {
        self.update(id, TaskPatch::status(status))
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let id = existing_id(id)?;
        self.store.delete::<Task>(&id)?;
        tracing::debug!(task_id = %id, "deleted task");
        Ok(())
    }
}

fn existing_id(id: &str) -> Result<String> {
    ids::canonical_id(id).ok_or_else(|| BoardError::not_found(EntityKind::Tasks, id))
}
