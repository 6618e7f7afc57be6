#![forbid(unsafe_code)]

use crate::clock::{self, Clock};
use crate::error::{BoardError, Result};
use crate::ids;
use crate::input;
use crate::integrity;
use crate::project::model::{DEFAULT_COLOR, NewProject, Project, ProjectPatch};
use crate::store::{EntityKind, RecordStore};

#[derive(Debug, Clone, Copy)]
pub struct ProjectRepository<'a> {
    store: &'a RecordStore,
    clock: &'a dyn Clock,
}

impl<'a> ProjectRepository<'a> {
    #[must_use]
    pub fn new(store: &'a RecordStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    pub fn list(&self) -> Result<Vec<Project>> {
        self.store.load()
    }

    pub fn get(&self, id: &str) -> Result<Project> {
        let id = existing_id(id)?;
        self.store.get(&id)
    }

    pub fn create(&self, input: NewProject) -> Result<Project> {
        let name = input::required("name", input.name)?;
        let color = input::optional(input.color).unwrap_or_else(|| DEFAULT_COLOR.to_owned());
        let now = self.clock.now();
        let project = self.store.insert(Project {
            id: ids::new_id(),
            name,
            description: input::optional(input.description),
            color,
            created_at: now,
            updated_at: now,
        })?;
        tracing::debug!(project_id = %project.id, name = %project.name, "created project");
        Ok(project)
    }

    pub fn update(&self, id: &str, patch: ProjectPatch) -> Result<Project> {
        let id = existing_id(id)?;
        let name = match patch.name {
            Some(n) => Some(input::required("name", Some(n))?),
            None => None,
        };
        let now = self.clock.now();

        let project = self.store.update::<Project, _>(&id, |project| {
            if let Some(name) = name {
                project.name = name;
            }
            if let Some(description) = patch.description {
                project.description = input::optional(Some(description));
            }
            if let Some(color) = input::optional(patch.color) {
                project.color = color;
            }
            project.updated_at = clock::touch(project.updated_at, now);
            Ok(())
        })?;
        tracing::debug!(project_id = %project.id, "updated project");
        Ok(project)
    }

    /// Deletes the project and every task that belongs to it.
    pub fn delete(&self, id: &str) -> Result<()> {
        let id = existing_id(id)?;
        integrity::delete_project(self.store, &id)
    }
}

fn existing_id(id: &str) -> Result<String> {
    ids::canonical_id(id).ok_or_else(|| BoardError::not_found(EntityKind::Projects, id))
}
