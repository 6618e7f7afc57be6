#![forbid(unsafe_code)]

use serde::Deserialize;

use crate::ids::IdInput;
use crate::task::model::Task;

/// Narrowing applied to a task listing. Empty values are treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub project_id: Option<IdInput>,
    pub search: Option<String>,
}

impl TaskFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn project(project_id: impl Into<IdInput>) -> Self {
        Self::default().with_project(project_id)
    }

    #[must_use]
    pub fn search(term: impl Into<String>) -> Self {
        Self::default().with_search(term)
    }

    #[must_use]
    pub fn with_project(mut self, project_id: impl Into<IdInput>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    #[must_use]
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }
}

/// Filter with its values normalized once per listing.
struct Criteria {
    project_id: Option<String>,
    term: Option<String>,
}

impl From<&TaskFilter> for Criteria {
    fn from(f: &TaskFilter) -> Self {
        Self {
            project_id: f.project_id.as_ref().and_then(IdInput::canonical),
            term: f
                .search
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(str::to_lowercase),
        }
    }
}

impl Criteria {
    fn matches(&self, task: &Task) -> bool {
        if let Some(project_id) = &self.project_id
            && task.project_id != *project_id
        {
            return false;
        }
        if let Some(term) = &self.term {
            let hit = |field: Option<&str>| field.is_some_and(|s| s.to_lowercase().contains(term));
            if !hit(Some(task.title.as_str())) && !hit(task.description.as_deref()) {
                return false;
            }
        }
        true
    }
}

/// Retains the tasks matching `filter`, keeping their stored order.
#[must_use]
pub fn apply(tasks: Vec<Task>, filter: &TaskFilter) -> Vec<Task> {
    let criteria = Criteria::from(filter);
    tasks.into_iter().filter(|t| criteria.matches(t)).collect()
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::task::model::Priority;
    use crate::task::status::TaskStatus;

    fn task(id: &str, project_id: &str, title: &str, description: Option<&str>) -> Task {
        Task {
            id: id.to_owned(),
            project_id: project_id.to_owned(),
            title: title.to_owned(),
            description: description.map(str::to_owned),
            status: TaskStatus::ToDo,
            priority: Priority::Medium,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    fn sample() -> Vec<Task> {
        vec![
            task("1", "7", "Refactor Parser", None),
            task("2", "8", "Write docs", Some("cover the PARSER api")),
            task("3", "7", "Fix login", Some("")),
            task("4", "7", "Ship it", Some("release notes")),
        ]
    }

    #[test]
    fn no_filter_keeps_everything_in_order() {
        let out = apply(sample(), &TaskFilter::all());
        assert_eq!(ids(&out), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn project_filter_matches_numeric_and_textual_ids() {
        assert_eq!(ids(&apply(sample(), &TaskFilter::project(7_u64))), vec!["1", "3", "4"]);
        assert_eq!(ids(&apply(sample(), &TaskFilter::project("7"))), vec!["1", "3", "4"]);
        assert_eq!(ids(&apply(sample(), &TaskFilter::project("8"))), vec!["2"]);
        assert!(apply(sample(), &TaskFilter::project("9")).is_empty());
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        assert_eq!(ids(&apply(sample(), &TaskFilter::search("parser"))), vec!["1", "2"]);
        assert_eq!(ids(&apply(sample(), &TaskFilter::search("PARSER"))), vec!["1", "2"]);
        assert_eq!(ids(&apply(sample(), &TaskFilter::search("Notes"))), vec!["4"]);
    }

    #[test]
    fn empty_filters_are_ignored() {
        let f = TaskFilter::project("").with_search("  ");
        assert_eq!(apply(sample(), &f).len(), 4);
    }

    #[test]
    fn filters_compose_with_and() {
        let f = TaskFilter::project("7").with_search("parser");
        assert_eq!(ids(&apply(sample(), &f)), vec!["1"]);
        let f = TaskFilter::project("8").with_search("ship");
        assert!(apply(sample(), &f).is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let f = TaskFilter::project("7");
        let once = apply(sample(), &f);
        let twice = apply(once.clone(), &f);
        assert_eq!(once, twice);
    }
}
