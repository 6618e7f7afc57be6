#![forbid(unsafe_code)]

//! The operations a front end (CLI, HTTP, UI) calls into.

use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::integrity::{self, RepairReport};
use crate::project::model::{NewProject, Project, ProjectPatch};
use crate::project::repository::ProjectRepository;
use crate::store::{Medium, RecordStore};
use crate::task::filter::TaskFilter;
use crate::task::model::{NewTask, Task, TaskPatch};
use crate::task::repository::TaskRepository;

#[derive(Debug)]
pub struct Board {
    store: RecordStore,
    clock: Box<dyn Clock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub projects: usize,
    pub tasks: usize,
    pub orphaned_tasks: Vec<String>,
}

impl Board {
    /// Opens a board over `medium` using the system clock.
    pub fn open(medium: impl Medium + 'static) -> Result<Self> {
        Ok(Self::new(RecordStore::open(medium)?, SystemClock))
    }

    #[must_use]
    pub fn new(store: RecordStore, clock: impl Clock + 'static) -> Self {
        Self {
            store,
            clock: Box::new(clock),
        }
    }

    #[must_use]
    pub fn projects(&self) -> ProjectRepository<'_> {
        ProjectRepository::new(&self.store, self.clock.as_ref())
    }

    #[must_use]
    pub fn tasks(&self) -> TaskRepository<'_> {
        TaskRepository::new(&self.store, self.clock.as_ref())
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.projects().list()
    }

    pub fn get_project(&self, id: &str) -> Result<Project> {
        self.projects().get(id)
    }

    pub fn create_project(&self, input: NewProject) -> Result<Project> {
        self.projects().create(input)
    }

    pub fn update_project(&self, id: &str, patch: ProjectPatch) -> Result<Project> {
        self.projects().update(id, patch)
    }

    pub fn delete_project(&self, id: &str) -> Result<()> {
        self.projects().delete(id)
    }

    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        self.tasks().list(filter)
    }

    pub fn get_task(&self, id: &str) -> Result<Task> {
        self.tasks().get(id)
    }

    pub fn create_task(&self, input: NewTask) -> Result<Task> {
        self.tasks().create(input)
    }

    pub fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        self.tasks().update(id, patch)
    }

    pub fn move_task(&self, id: &str, status: &str) -> Result<Task> {
        self.tasks().move_to(id, status)
    }

    pub fn delete_task(&self, id: &str) -> Result<()> {
        self.tasks().delete(id)
    }

    pub fn repair_orphans(&self) -> Result<RepairReport> {
        integrity::repair_orphans(&self.store)
    }

    /// Read-only consistency check of both collections.
    pub fn check(&self) -> Result<HealthReport> {
        let projects = self.list_projects()?;
        let tasks = self.list_tasks(&TaskFilter::all())?;
        let orphaned_tasks = integrity::find_orphans(&projects, &tasks)
            .into_iter()
            .map(|t| t.id.clone())
            .collect();
        Ok(HealthReport {
            projects: projects.len(),
            tasks: tasks.len(),
            orphaned_tasks,
        })
    }
}
