#![forbid(unsafe_code)]

//! Writes that span both collections.
//!
//! Both functions hold the projects lock and then the tasks lock for their
//! whole duration, so no task create or update on the same store can land
//! between the two rewrites.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{BoardError, Result};
use crate::project::model::Project;
use crate::store::{EntityKind, RecordStore};
use crate::task::model::Task;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// Ids of the orphaned tasks that were removed.
    pub removed: Vec<String>,
}

/// Removes the project `id` and then every task that references it.
///
/// Success is only reported once the task rewrite is durable. If the project
/// rewrite succeeded but the task rewrite did not, the error is
/// [`BoardError::IntegrityFailure`] and the store may hold orphaned tasks
/// until [`repair_orphans`] runs.
pub fn delete_project(store: &RecordStore, id: &str) -> Result<()> {
    let _projects_guard = store.write_lock(EntityKind::Projects);
    let _tasks_guard = store.write_lock(EntityKind::Tasks);

    let mut projects: Vec<Project> = store.load()?;
    // Load tasks before the first write so a corrupted task collection
    // aborts the delete instead of orphaning tasks.
    let mut tasks: Vec<Task> = store.load()?;

    let before = projects.len();
    projects.retain(|p| p.id != id);
    if projects.len() == before {
        return Err(BoardError::not_found(EntityKind::Projects, id));
    }
    store.save_all(&projects)?;

    let before = tasks.len();
    tasks.retain(|t| t.project_id != id);
    let removed = before - tasks.len();
    if removed > 0 {
        store.save_all(&tasks).map_err(|source| {
            tracing::error!(project_id = %id, error = %source, "cascade delete of tasks failed");
            BoardError::IntegrityFailure {
                project_id: id.to_owned(),
                source: Box::new(source),
            }
        })?;
    }

    tracing::info!(project_id = %id, removed_tasks = removed, "deleted project");
    Ok(())
}

/// Tasks whose project no longer exists.
#[must_use]
pub fn find_orphans<'t>(projects: &[Project], tasks: &'t [Task]) -> Vec<&'t Task> {
    let known: HashSet<&str> = projects.iter().map(|p| p.id.as_str()).collect();
    tasks
        .iter()
        .filter(|t| !known.contains(t.project_id.as_str()))
        .collect()
}

/// Deletes every orphaned task.
pub fn repair_orphans(store: &RecordStore) -> Result<RepairReport> {
    let _projects_guard = store.write_lock(EntityKind::Projects);
    let _tasks_guard = store.write_lock(EntityKind::Tasks);

    let projects: Vec<Project> = store.load()?;
    let tasks: Vec<Task> = store.load()?;

    let removed: Vec<String> = find_orphans(&projects, &tasks)
        .into_iter()
        .map(|t| t.id.clone())
        .collect();
    if removed.is_empty() {
        return Ok(RepairReport::default());
    }

    let gone: HashSet<&str> = removed.iter().map(String::as_str).collect();
    let kept: Vec<Task> = tasks
        .iter()
        .filter(|t| !gone.contains(t.id.as_str()))
        .cloned()
        .collect();
    store.save_all(&kept)?;

    tracing::info!(count = removed.len(), "removed orphaned tasks");
    Ok(RepairReport { removed })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::clock::ManualClock;
    use crate::project::model::NewProject;
    use crate::project::repository::ProjectRepository;
    use crate::store::{Medium, MemoryMedium};
    use crate::task::filter::TaskFilter;
    use crate::task::model::NewTask;
    use crate::task::repository::TaskRepository;

    /// Fails task writes once armed.
    #[derive(Debug, Default)]
    struct FlakyMedium {
        inner: MemoryMedium,
        fail_tasks: AtomicBool,
    }

    impl Medium for Arc<FlakyMedium> {
        fn read(&self, kind: EntityKind) -> Result<Option<Vec<u8>>> {
            self.inner.read(kind)
        }

        fn write(&self, kind: EntityKind, data: &[u8]) -> Result<()> {
            if kind == EntityKind::Tasks && self.fail_tasks.load(Ordering::SeqCst) {
                return Err(BoardError::Io {
                    path: "tasks.json".into(),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.inner.write(kind, data)
        }
    }

    #[test]
    fn cascade_removes_only_the_projects_tasks() {
        let store = RecordStore::open(MemoryMedium::new()).unwrap();
        let clock = ManualClock::default();
        let projects = ProjectRepository::new(&store, &clock);
        let tasks = TaskRepository::new(&store, &clock);

        let doomed = projects.create(NewProject::named("doomed")).unwrap();
        let kept = projects.create(NewProject::named("kept")).unwrap();
        for i in 0..5 {
            tasks
                .create(NewTask::new(format!("d{i}"), doomed.id.as_str()))
                .unwrap();
        }
        let survivor = tasks.create(NewTask::new("k", kept.id.as_str())).unwrap();

        delete_project(&store, &doomed.id).unwrap();

        assert!(tasks.list(&TaskFilter::project(doomed.id.as_str())).unwrap().is_empty());
        assert_eq!(tasks.list(&TaskFilter::all()).unwrap(), vec![survivor]);
        assert_eq!(projects.list().unwrap(), vec![kept]);
    }

    #[test]
    fn failed_cascade_surfaces_integrity_failure() {
        let medium = Arc::new(FlakyMedium::default());
        let store = RecordStore::open(Arc::clone(&medium)).unwrap();
        let clock = ManualClock::default();
        let projects = ProjectRepository::new(&store, &clock);
        let tasks = TaskRepository::new(&store, &clock);

        let p = projects.create(NewProject::named("p")).unwrap();
        tasks.create(NewTask::new("t", p.id.as_str())).unwrap();

        medium.fail_tasks.store(true, Ordering::SeqCst);
        let err = delete_project(&store, &p.id).unwrap_err();
        match err {
            BoardError::IntegrityFailure { project_id, .. } => assert_eq!(project_id, p.id),
            other => panic!("unexpected error: {other}"),
        }

        medium.fail_tasks.store(false, Ordering::SeqCst);
        assert!(projects.list().unwrap().is_empty());
        let report = repair_orphans(&store).unwrap();
        assert_eq!(report.removed.len(), 1);
        assert!(tasks.list(&TaskFilter::all()).unwrap().is_empty());
    }

    #[test]
    fn project_without_tasks_skips_task_rewrite() {
        let medium = Arc::new(FlakyMedium::default());
        let store = RecordStore::open(Arc::clone(&medium)).unwrap();
        let clock = ManualClock::default();
        let p = ProjectRepository::new(&store, &clock)
            .create(NewProject::named("empty"))
            .unwrap();

        medium.fail_tasks.store(true, Ordering::SeqCst);
        delete_project(&store, &p.id).unwrap();
    }

    #[test]
    fn corrupted_task_collection_aborts_before_any_write() {
        let medium = Arc::new(FlakyMedium::default());
        let store = RecordStore::open(Arc::clone(&medium)).unwrap();
        let clock = ManualClock::default();
        let p = ProjectRepository::new(&store, &clock)
            .create(NewProject::named("p"))
            .unwrap();

        medium.inner.write(EntityKind::Tasks, b"garbage").unwrap();
        let err = delete_project(&store, &p.id).unwrap_err();
        assert!(matches!(err, BoardError::StoreCorrupted { .. }));
        assert_eq!(
            ProjectRepository::new(&store, &clock).list().unwrap(),
            vec![p]
        );
    }

    #[test]
    fn repair_keeps_tasks_with_live_projects() {
        let store = RecordStore::open(MemoryMedium::new()).unwrap();
        let clock = ManualClock::default();
        let projects = ProjectRepository::new(&store, &clock);
        let tasks = TaskRepository::new(&store, &clock);

        let p = projects.create(NewProject::named("p")).unwrap();
        let live = tasks.create(NewTask::new("live", p.id.as_str())).unwrap();
        let orphan = tasks.create(NewTask::new("orphan", "no-such-project")).unwrap();

        let all = tasks.list(&TaskFilter::all()).unwrap();
        let orphans = find_orphans(&projects.list().unwrap(), &all);
        assert_eq!(orphans, vec![&orphan]);

        let report = repair_orphans(&store).unwrap();
        assert_eq!(report.removed, vec![orphan.id]);
        assert_eq!(tasks.list(&TaskFilter::all()).unwrap(), vec![live]);
        assert_eq!(repair_orphans(&store).unwrap(), RepairReport::default());
    }

    #[test]
    fn concurrent_task_creates_do_not_resurrect_cascaded_tasks() {
        let store = Arc::new(RecordStore::open(MemoryMedium::new()).unwrap());
        let clock = Arc::new(ManualClock::default());
        let p = ProjectRepository::new(&store, clock.as_ref())
            .create(NewProject::named("busy"))
            .unwrap();
        let other = ProjectRepository::new(&store, clock.as_ref())
            .create(NewProject::named("other"))
            .unwrap();
        for i in 0..10 {
            TaskRepository::new(&store, clock.as_ref())
                .create(NewTask::new(format!("t{i}"), p.id.as_str()))
                .unwrap();
        }

        let writer = {
            let store = Arc::clone(&store);
            let clock = Arc::clone(&clock);
            let other_id = other.id.clone();
            std::thread::spawn(move || {
                let repo = TaskRepository::new(&store, clock.as_ref());
                for i in 0..20 {
                    repo.create(NewTask::new(format!("o{i}"), other_id.as_str()))
                        .unwrap();
                }
            })
        };
        delete_project(&store, &p.id).unwrap();
        writer.join().unwrap();

        let repo = TaskRepository::new(&store, clock.as_ref());
        assert!(repo.list(&TaskFilter::project(p.id.as_str())).unwrap().is_empty());
        assert_eq!(repo.list(&TaskFilter::project(other.id.as_str())).unwrap().len(), 20);
    }
}
