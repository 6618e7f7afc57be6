use std::path::Path;

use taskboard::board::Board;
use taskboard::error::BoardError;
use taskboard::project::model::NewProject;
use taskboard::store::{EntityKind, FileMedium};
use taskboard::task::filter::TaskFilter;
use taskboard::task::model::{NewTask, TaskPatch};
use taskboard::task::status::TaskStatus;

fn open(dir: &Path) -> Board {
    Board::open(FileMedium::new(dir.to_path_buf())).expect("open board")
}

fn read_json(dir: &Path, kind: EntityKind) -> serde_json::Value {
    let data = std::fs::read(dir.join(kind.file_name())).expect("read data file");
    serde_json::from_slice(&data).expect("valid json")
}

#[test]
fn fresh_directory_gets_empty_wrapped_collections() {
    let td = tempfile::tempdir().expect("tempdir");
    let board = open(td.path());

    assert!(board.list_projects().expect("list").is_empty());
    assert_eq!(
        read_json(td.path(), EntityKind::Projects),
        serde_json::json!({ "projects": [] })
    );
    assert_eq!(
        read_json(td.path(), EntityKind::Tasks),
        serde_json::json!({ "tasks": [] })
    );
}

#[test]
fn board_survives_reopen_and_cascades_on_disk() {
    let td = tempfile::tempdir().expect("tempdir");

    let (project, task) = {
        let board = open(td.path());
        let p = board
            .create_project(NewProject::named("Website"))
            .expect("create project");
        let t = board
            .create_task(NewTask::new("Design mockup", p.id.as_str()))
            .expect("create task");
        board
            .update_task(&t.id, TaskPatch::status("In Progress"))
            .expect("update task");
        (p, t)
    };

    let board = open(td.path());
    let tasks = board
        .list_tasks(&TaskFilter::project(project.id.as_str()))
        .expect("list tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, task.id);
    assert_eq!(tasks[0].status, TaskStatus::InProgress);

    let on_disk = read_json(td.path(), EntityKind::Tasks);
    assert_eq!(on_disk["tasks"][0]["status"], "In Progress");
    assert_eq!(on_disk["tasks"][0]["projectId"], project.id.as_str());

    board.delete_project(&project.id).expect("delete project");
    assert_eq!(
        read_json(td.path(), EntityKind::Tasks),
        serde_json::json!({ "tasks": [] })
    );
    assert_eq!(
        read_json(td.path(), EntityKind::Projects),
        serde_json::json!({ "projects": [] })
    );
}

#[test]
fn legacy_bare_array_is_rewritten_wrapped() {
    let td = tempfile::tempdir().expect("tempdir");
    let legacy = r#"[
        {
            "id": 1,
            "projectId": 7,
            "title": "Refactor Parser",
            "status": "Testing",
            "priority": "High",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z"
        }
    ]"#;
    std::fs::write(td.path().join("tasks.json"), legacy).expect("seed legacy file");

    let board = open(td.path());
    let on_disk = read_json(td.path(), EntityKind::Tasks);
    assert!(on_disk.is_object());
    assert_eq!(on_disk["tasks"].as_array().map(Vec::len), Some(1));

    let tasks = board
        .list_tasks(&TaskFilter::project(7_u64))
        .expect("list tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, "1");
    assert_eq!(tasks[0].project_id, "7");
    assert_eq!(tasks[0].status, TaskStatus::Testing);

    let found = board.get_task("1").expect("get by canonical id");
    assert_eq!(found.title, "Refactor Parser");
}

#[test]
fn task_list_from_before_projects_loads_as_orphans() {
    let td = tempfile::tempdir().expect("tempdir");
    let legacy = r#"[{"id":"1712345678901","title":"Old","description":"d","status":"To Do","createdAt":"2024-04-05T10:00:00.000Z"}]"#;
    std::fs::write(td.path().join("tasks.json"), legacy).expect("seed legacy file");

    let board = open(td.path());
    let p = board
        .create_project(NewProject::named("Website"))
        .expect("create project");

    let tasks = board.list_tasks(&TaskFilter::all()).expect("list tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, "1712345678901");
    assert_eq!(tasks[0].project_id, "");
    assert_eq!(tasks[0].updated_at, tasks[0].created_at);
    assert!(
        board
            .list_tasks(&TaskFilter::project(p.id.as_str()))
            .expect("list project tasks")
            .is_empty()
    );

    let report = board.check().expect("check");
    assert_eq!(report.orphaned_tasks, vec!["1712345678901".to_owned()]);
    assert_eq!(
        board.repair_orphans().expect("repair").removed,
        vec!["1712345678901".to_owned()]
    );
    assert_eq!(
        read_json(td.path(), EntityKind::Tasks),
        serde_json::json!({ "tasks": [] })
    );
}

#[test]
fn unparsable_file_is_reported_as_corrupted() {
    let td = tempfile::tempdir().expect("tempdir");
    std::fs::write(td.path().join("projects.json"), "{ not json").expect("seed file");

    let err = Board::open(FileMedium::new(td.path().to_path_buf())).unwrap_err();
    assert!(matches!(
        err,
        BoardError::StoreCorrupted {
            kind: EntityKind::Projects,
            ..
        }
    ));
    // The damaged file is left for the user to inspect.
    let raw = std::fs::read_to_string(td.path().join("projects.json")).expect("read");
    assert_eq!(raw, "{ not json");
}

#[test]
fn orphans_left_on_disk_are_found_and_repaired() {
    let td = tempfile::tempdir().expect("tempdir");
    let board = open(td.path());
    let p = board
        .create_project(NewProject::named("kept"))
        .expect("create project");
    board
        .create_task(NewTask::new("ok", p.id.as_str()))
        .expect("create task");
    let orphan = board
        .create_task(NewTask::new("lost", "deleted-elsewhere"))
        .expect("create task");

    let board = open(td.path());
    assert_eq!(
        board.check().expect("check").orphaned_tasks,
        vec![orphan.id.clone()]
    );
    assert_eq!(board.repair_orphans().expect("repair").removed, vec![orphan.id]);
    assert_eq!(board.list_tasks(&TaskFilter::all()).expect("list").len(), 1);
}
