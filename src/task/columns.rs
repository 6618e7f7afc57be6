#![forbid(unsafe_code)]

use crate::task::model::Task;
use crate::task::status::TaskStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column<'a> {
    pub status: TaskStatus,
    pub tasks: Vec<&'a Task>,
}

/// Groups tasks into one column per status in pipeline order. Tasks keep
/// their stored order within a column; empty columns are still returned.
#[must_use]
pub fn columns(tasks: &[Task]) -> Vec<Column<'_>> {
    TaskStatus::ALL
        .into_iter()
        .map(|status| Column {
            status,
            tasks: tasks.iter().filter(|t| t.status == status).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::task::model::Priority;

    fn task(id: &str, status: TaskStatus) -> Task {
        Task {
            id: id.to_owned(),
            project_id: "p".to_owned(),
            title: id.to_owned(),
            description: None,
            status,
            priority: Priority::Low,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn groups_by_status_in_pipeline_order() {
        let tasks = vec![
            task("a", TaskStatus::Done),
            task("b", TaskStatus::ToDo),
            task("c", TaskStatus::Done),
        ];
        let cols = columns(&tasks);
        let statuses: Vec<TaskStatus> = cols.iter().map(|c| c.status).collect();
        assert_eq!(statuses, TaskStatus::ALL.to_vec());

        let done: Vec<&str> = cols[3].tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(done, vec!["a", "c"]);
        assert!(cols[1].tasks.is_empty());
        assert_eq!(cols[0].tasks[0].id, "b");
    }
}
