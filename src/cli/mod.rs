#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{ArgAction, CommandFactory as _, Parser, Subcommand};
use time::OffsetDateTime;

use crate::board::Board;
use crate::clock::SystemClock;
use crate::config::{self, Config};
use crate::error::BoardError;
use crate::ids::IdInput;
use crate::logging;
use crate::output::table::{Table, truncate};
use crate::project::model::{NewProject, Project, ProjectPatch};
use crate::store::{EntityKind, FileMedium, RecordStore};
use crate::task::columns;
use crate::task::filter::TaskFilter;
use crate::task::model::{NewTask, Task, TaskPatch};

#[derive(Debug, Parser)]
#[command(
    name = "taskboard",
    version,
    about = "Projects and tasks on a four-column Kanban board"
)]
pub struct Cli {
    /// Data directory (overrides config and TASKBOARD_DATA_DIR)
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,
    /// More log output (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage projects
    Project(ProjectArgs),
    /// Manage tasks
    Task(TaskArgs),
    /// Show tasks grouped by status column
    Board(BoardArgs),
    /// Check the data files for orphaned tasks
    Doctor(DoctorArgs),
    /// Read or change configuration
    Config(ConfigArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
    Version,
}

#[derive(Debug, Parser)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub cmd: ProjectCmd,
}

#[derive(Debug, Subcommand)]
pub enum ProjectCmd {
    #[command(alias = "ls")]
    List(OutputArgs),
    Add(ProjectAddArgs),
    Edit(ProjectEditArgs),
    #[command(alias = "rm")]
    Remove(IdArgs),
}

#[derive(Debug, Parser)]
pub struct OutputArgs {
    /// Output in JSON format
    #[arg(long = "json", conflicts_with = "csv")]
    pub json: bool,
    /// Output as CSV
    #[arg(long = "csv")]
    pub csv: bool,
}

#[derive(Debug, Parser)]
pub struct IdArgs {
    /// Id or unique id prefix
    pub id: String,
}

#[derive(Debug, Parser)]
pub struct ProjectAddArgs {
    pub name: String,
    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,
    /// Display color, e.g. #2196f3
    #[arg(long = "color")]
    pub color: Option<String>,
}

#[derive(Debug, Parser)]
pub struct ProjectEditArgs {
    /// Id or unique id prefix
    pub id: String,
    #[arg(long = "name")]
    pub name: Option<String>,
    /// New description; pass "" to clear it
    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,
    #[arg(long = "color")]
    pub color: Option<String>,
}

#[derive(Debug, Parser)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub cmd: TaskCmd,
}

#[derive(Debug, Subcommand)]
pub enum TaskCmd {
    #[command(alias = "ls")]
    List(TaskListArgs),
    Add(TaskAddArgs),
    Edit(TaskEditArgs),
    Move(TaskMoveArgs),
    Show(IdArgs),
    #[command(alias = "rm")]
    Remove(IdArgs),
}

#[derive(Debug, Parser)]
pub struct TaskListArgs {
    /// Only tasks of this project
    #[arg(short = 'p', long = "project")]
    pub project: Option<String>,
    /// Case-insensitive match on title or description
    #[arg(short = 's', long = "search")]
    pub search: Option<String>,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Parser)]
pub struct TaskAddArgs {
    pub title: String,
    /// Owning project (id or unique id prefix)
    #[arg(short = 'p', long = "project")]
    pub project: String,
    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,
    /// To Do, In Progress, Testing or Done
    #[arg(long = "status")]
    pub status: Option<String>,
    /// Low, Medium or High (default from tasks.default_priority)
    #[arg(long = "priority")]
    pub priority: Option<String>,
}

#[derive(Debug, Parser)]
pub struct TaskEditArgs {
    /// Id or unique id prefix
    pub id: String,
    #[arg(long = "title")]
    pub title: Option<String>,
    /// New description; pass "" to clear it
    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,
    #[arg(long = "status")]
    pub status: Option<String>,
    #[arg(long = "priority")]
    pub priority: Option<String>,
    /// Move the task to another project
    #[arg(short = 'p', long = "project")]
    pub project: Option<String>,
}

#[derive(Debug, Parser)]
pub struct TaskMoveArgs {
    /// Id or unique id prefix
    pub id: String,
    /// Target column: todo, in-progress, testing, done
    pub status: String,
}

#[derive(Debug, Parser)]
pub struct BoardArgs {
    #[arg(short = 'p', long = "project")]
    pub project: Option<String>,
    #[arg(short = 's', long = "search")]
    pub search: Option<String>,
}

#[derive(Debug, Parser)]
pub struct DoctorArgs {
    /// Delete tasks whose project no longer exists
    #[arg(long = "repair")]
    pub repair: bool,
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct CompletionArgs {
    pub shell: clap_complete::Shell,
}

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCmd,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    List,
    Set(ConfigSetArgs),
    Get(ConfigGetArgs),
}

#[derive(Debug, Parser)]
pub struct ConfigSetArgs {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Parser)]
pub struct ConfigGetArgs {
    pub key: String,
}

pub async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            exit_code_for(&err)
        }
    }
}

/// 2 validation, 3 not found, 4 store damage, 1 anything else.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<BoardError>() {
        Some(BoardError::Validation(_)) => ExitCode::from(2),
        Some(BoardError::NotFound { .. }) => ExitCode::from(3),
        Some(BoardError::StoreCorrupted { .. } | BoardError::IntegrityFailure { .. }) => {
            ExitCode::from(4)
        }
        _ => ExitCode::from(1),
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let Cli {
        data_dir,
        verbose,
        cmd,
    } = cli;
    match cmd {
        Commands::Completion(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "taskboard", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version => Ok(cmd_version()),
        Commands::Config(args) => cmd_config(args).await,
        Commands::Project(args) => {
            let ctx = Ctx::load(data_dir.as_deref(), verbose).await?;
            cmd_project(&ctx, args).await
        }
        Commands::Task(args) => {
            let ctx = Ctx::load(data_dir.as_deref(), verbose).await?;
            cmd_task(&ctx, args).await
        }
        Commands::Board(args) => {
            let ctx = Ctx::load(data_dir.as_deref(), verbose).await?;
            cmd_board(&ctx, args).await
        }
        Commands::Doctor(args) => {
            let ctx = Ctx::load(data_dir.as_deref(), verbose).await?;
            cmd_doctor(&ctx, args).await
        }
    }
}

async fn load_cfg() -> anyhow::Result<Config> {
    let cfg = tokio::task::spawn_blocking(|| -> anyhow::Result<Config> {
        let (cfg, _doc, _paths) = config::load()?;
        Ok(cfg)
    })
    .await??;
    Ok(cfg)
}

/// Resolved configuration plus the data directory the board lives in.
#[derive(Debug, Clone)]
struct Ctx {
    cfg: Config,
    data_dir: PathBuf,
}

impl Ctx {
    async fn load(data_dir: Option<&Path>, verbose: u8) -> anyhow::Result<Self> {
        let cfg = load_cfg().await?;
        logging::init(&cfg.log, verbose);
        let data_dir = config::resolve_data_dir(&cfg, data_dir)?;
        tracing::debug!(data_dir = %data_dir.display(), "using data directory");
        Ok(Self { cfg, data_dir })
    }

    /// Runs `f` against a freshly opened board on the blocking pool.
    async fn with_board<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Board) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let dir = self.data_dir.clone();
        let pretty = self.cfg.store.pretty;
        tokio::task::spawn_blocking(move || {
            let store = RecordStore::open(FileMedium::new(dir.clone()))
                .with_context(|| format!("failed to open board at {}", dir.display()))?
                .with_pretty(pretty);
            f(&Board::new(store, SystemClock))
        })
        .await?
    }
}

async fn cmd_config(args: ConfigArgs) -> anyhow::Result<ExitCode> {
    tokio::task::spawn_blocking(move || match args.cmd {
        ConfigCmd::List => {
            print!("{}", config::list_resolved_toml()?);
            Ok(ExitCode::SUCCESS)
        }
        ConfigCmd::Set(set) => {
            config::set_value_string(&set.key, &set.value)?;
            println!("Set {} = {}", set.key, set.value);
            Ok(ExitCode::SUCCESS)
        }
        ConfigCmd::Get(get) => match config::get_value_string(&get.key)? {
            Some(v) => {
                println!("{v}");
                Ok(ExitCode::SUCCESS)
            }
            None => anyhow::bail!(
                "configuration key '{}' not found - use 'taskboard config list' to see available keys",
                get.key
            ),
        },
    })
    .await?
}

async fn cmd_project(ctx: &Ctx, args: ProjectArgs) -> anyhow::Result<ExitCode> {
    match args.cmd {
        ProjectCmd::List(out) => {
            let (projects, counts) = ctx
                .with_board(|board| {
                    let projects = board.list_projects()?;
                    let counts = task_counts(&board.list_tasks(&TaskFilter::all())?);
                    Ok((projects, counts))
                })
                .await?;
            print_projects(ctx, &projects, &counts, &out)?;
        }
        ProjectCmd::Add(a) => {
            let input = NewProject {
                name: Some(a.name),
                description: a.description,
                color: a.color,
            };
            let project = ctx.with_board(move |board| Ok(board.create_project(input)?)).await?;
            println!(
                "Project '{}' created (ID: {})",
                project.name,
                short_id(&project.id)
            );
        }
        ProjectCmd::Edit(a) => {
            let patch = ProjectPatch {
                name: a.name,
                description: a.description,
                color: a.color,
            };
            let project = ctx
                .with_board(move |board| {
                    let id = resolve_project(board, &a.id)?;
                    Ok(board.update_project(&id, patch)?)
                })
                .await?;
            println!("Project '{}' updated", project.name);
        }
        ProjectCmd::Remove(a) => {
            let (project, removed) = ctx
                .with_board(move |board| {
                    let id = resolve_project(board, &a.id)?;
                    let project = board.get_project(&id)?;
                    let removed = board.list_tasks(&TaskFilter::project(id.as_str()))?.len();
                    board.delete_project(&id)?;
                    Ok((project, removed))
                })
                .await?;
            println!(
                "Project '{}' deleted along with {} task{}",
                project.name,
                removed,
                if removed == 1 { "" } else { "s" }
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_projects(
    ctx: &Ctx,
    projects: &[Project],
    counts: &HashMap<String, usize>,
    out: &OutputArgs,
) -> anyhow::Result<()> {
    if out.json {
        let mut s = serde_json::to_string_pretty(projects)?;
        s.push('\n');
        print!("{s}");
        return Ok(());
    }

    if out.csv {
        let mut t = Table::new(["id", "name", "color", "tasks", "updated_at"]);
        for p in projects {
            t.row([
                p.id.clone(),
                p.name.clone(),
                p.color.clone(),
                counts.get(&p.id).copied().unwrap_or(0).to_string(),
                format_rfc3339(p.updated_at),
            ]);
        }
        t.write_csv()?;
        return Ok(());
    }

    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    let mut t = Table::new(["ID", "NAME", "COLOR", "TASKS", "UPDATED"]);
    for p in projects {
        let name = if ctx.cfg.ui.icons {
            format!("■ {}", p.name)
        } else {
            p.name.clone()
        };
        t.row([
            short_id(&p.id).to_owned(),
            truncate(&name, 40),
            p.color.clone(),
            counts.get(&p.id).copied().unwrap_or(0).to_string(),
            format_activity(p.updated_at),
        ]);
    }
    t.print()?;
    Ok(())
}

fn task_counts(tasks: &[Task]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for t in tasks {
        *counts.entry(t.project_id.clone()).or_insert(0) += 1;
    }
    counts
}

async fn cmd_task(ctx: &Ctx, args: TaskArgs) -> anyhow::Result<ExitCode> {
    match args.cmd {
        TaskCmd::List(TaskListArgs {
            project,
            search,
            output,
        }) => {
            let tasks = ctx
                .with_board(move |board| {
                    let filter = build_filter(board, project.as_deref(), search)?;
                    Ok(board.list_tasks(&filter)?)
                })
                .await?;
            print_tasks(ctx, &tasks, &output)?;
        }
        TaskCmd::Add(a) => {
            let priority = a
                .priority
                .unwrap_or_else(|| ctx.cfg.tasks.priority().as_str().to_owned());
            let task = ctx
                .with_board(move |board| {
                    // Tasks may only be created inside an existing project.
                    let project_id = resolve_project(board, &a.project)?;
                    let input = NewTask {
                        title: Some(a.title),
                        description: a.description,
                        status: a.status,
                        priority: Some(priority),
                        project_id: Some(project_id.into()),
                    };
                    Ok(board.create_task(input)?)
                })
                .await?;
            println!(
                "Task '{}' added (ID: {}) in {}",
                task.title,
                short_id(&task.id),
                task.status
            );
        }
        TaskCmd::Edit(a) => {
            let task = ctx
                .with_board(move |board| {
                    let id = resolve_task(board, &a.id)?;
                    let project_id: Option<IdInput> = match a.project.as_deref() {
                        Some(p) => Some(resolve_project(board, p)?.into()),
                        None => None,
                    };
                    let patch = TaskPatch {
                        title: a.title,
                        description: a.description,
                        status: a.status,
                        priority: a.priority,
                        project_id,
                    };
                    Ok(board.update_task(&id, patch)?)
                })
                .await?;
            println!("Task '{}' updated", task.title);
        }
        TaskCmd::Move(a) => {
            let task = ctx
                .with_board(move |board| {
                    let id = resolve_task(board, &a.id)?;
                    Ok(board.move_task(&id, &a.status)?)
                })
                .await?;
            println!("Task '{}' moved to {}", task.title, task.status);
        }
        TaskCmd::Show(a) => {
            let (task, project) = ctx
                .with_board(move |board| {
                    let id = resolve_task(board, &a.id)?;
                    let task = board.get_task(&id)?;
                    let project = board.get_project(&task.project_id).ok();
                    Ok((task, project))
                })
                .await?;
            print_task_details(&task, project.as_ref());
        }
        TaskCmd::Remove(a) => {
            let task = ctx
                .with_board(move |board| {
                    let id = resolve_task(board, &a.id)?;
                    let task = board.get_task(&id)?;
                    board.delete_task(&id)?;
                    Ok(task)
                })
                .await?;
            println!("Task '{}' deleted", task.title);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Builds a listing filter, resolving a project prefix when one matches.
/// Unresolvable values are used verbatim so orphaned tasks stay listable.
fn build_filter(
    board: &Board,
    project: Option<&str>,
    search: Option<String>,
) -> anyhow::Result<TaskFilter> {
    let mut filter = TaskFilter::all();
    if let Some(p) = project {
        let id = match resolve_project(board, p) {
            Ok(id) => id,
            Err(e) if is_not_found(&e) => p.to_owned(),
            Err(e) => return Err(e),
        };
        filter = filter.with_project(id);
    }
    if let Some(s) = search {
        filter = filter.with_search(s);
    }
    Ok(filter)
}

fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<BoardError>(),
        Some(BoardError::NotFound { .. })
    )
}

fn print_tasks(ctx: &Ctx, tasks: &[Task], out: &OutputArgs) -> anyhow::Result<()> {
    if out.json {
        let mut s = serde_json::to_string_pretty(tasks)?;
        s.push('\n');
        print!("{s}");
        return Ok(());
    }

    if out.csv {
        let mut t = Table::new([
            "id",
            "project_id",
            "title",
            "status",
            "priority",
            "updated_at",
        ]);
        for task in tasks {
            t.row([
                task.id.clone(),
                task.project_id.clone(),
                task.title.clone(),
                task.status.to_string(),
                task.priority.to_string(),
                format_rfc3339(task.updated_at),
            ]);
        }
        t.write_csv()?;
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    let mut t = Table::new(["TASK", "PROJECT", "TITLE", "STATUS", "PRIORITY", "UPDATED"]);
    for task in tasks {
        let mut id = short_id(&task.id).to_owned();
        if ctx.cfg.ui.icons {
            id = format!("{} {id}", task.status.icon());
        }
        t.row([
            id,
            short_id(&task.project_id).to_owned(),
            truncate(&task.title, 50),
            task.status.to_string(),
            task.priority.to_string(),
            format_activity(task.updated_at),
        ]);
    }
    t.print()?;
    Ok(())
}

fn print_task_details(task: &Task, project: Option<&Project>) {
    println!("Task: {}", task.title);
    println!("  ID:       {}", task.id);
    match project {
        Some(p) => println!("  Project:  {} ({})", p.name, p.id),
        None => println!("  Project:  {} (missing)", task.project_id),
    }
    println!("  Status:   {}", task.status);
    println!("  Priority: {}", task.priority);
    println!("  Created:  {}", format_rfc3339(task.created_at));
    println!("  Updated:  {}", format_rfc3339(task.updated_at));
    if let Some(d) = task.description.as_deref() {
        println!();
        for line in d.lines() {
            println!("  {line}");
        }
    }
}

async fn cmd_board(ctx: &Ctx, args: BoardArgs) -> anyhow::Result<ExitCode> {
    let tasks = ctx
        .with_board(move |board| {
            let filter = build_filter(board, args.project.as_deref(), args.search)?;
            Ok(board.list_tasks(&filter)?)
        })
        .await?;

    for (i, col) in columns::columns(&tasks).iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{} ({})", col.status, col.tasks.len());
        for task in &col.tasks {
            let icon = if ctx.cfg.ui.icons {
                format!("{} ", task.status.icon())
            } else {
                String::new()
            };
            println!(
                "  {icon}{}  {}  [{}]",
                short_id(&task.id),
                truncate(&task.title, 60),
                task.priority
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_doctor(ctx: &Ctx, args: DoctorArgs) -> anyhow::Result<ExitCode> {
    let repair = args.repair;
    let (report, repaired) = ctx
        .with_board(move |board| {
            let report = board.check()?;
            let repaired = if repair && !report.orphaned_tasks.is_empty() {
                Some(board.repair_orphans()?)
            } else {
                None
            };
            Ok((report, repaired))
        })
        .await?;

    if args.json {
        let v = serde_json::json!({
            "data_dir": ctx.data_dir,
            "report": report,
            "repaired": repaired,
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
    } else {
        println!(
            "Data directory: {}",
            config::tilde_path(&ctx.data_dir.to_string_lossy())
        );
        println!("Projects: {}", report.projects);
        println!("Tasks:    {}", report.tasks);
        println!("Orphaned tasks: {}", report.orphaned_tasks.len());
        match &repaired {
            Some(r) => println!("Removed {} orphaned tasks", r.removed.len()),
            None if !report.orphaned_tasks.is_empty() => {
                println!("Run 'taskboard doctor --repair' to remove them");
            }
            None => {}
        }
    }

    if report.orphaned_tasks.is_empty() || repaired.is_some() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(4))
    }
}

fn resolve_project(board: &Board, pattern: &str) -> anyhow::Result<String> {
    let projects = board.list_projects()?;
    Ok(resolve_id(
        EntityKind::Projects,
        pattern,
        projects.iter().map(|p| p.id.as_str()),
    )?)
}

fn resolve_task(board: &Board, pattern: &str) -> anyhow::Result<String> {
    let tasks = board.list_tasks(&TaskFilter::all())?;
    Ok(resolve_id(
        EntityKind::Tasks,
        pattern,
        tasks.iter().map(|t| t.id.as_str()),
    )?)
}

/// Matches a full id, or a prefix shared by exactly one id.
fn resolve_id<'a>(
    kind: EntityKind,
    pattern: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<String, BoardError> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(BoardError::not_found(kind, pattern));
    }
    let mut matches = Vec::new();
    for id in ids {
        if id == pattern {
            return Ok(id.to_owned());
        }
        if id.starts_with(pattern) {
            matches.push(id);
        }
    }
    match matches.as_slice() {
        [] => Err(BoardError::not_found(kind, pattern)),
        [one] => Ok((*one).to_owned()),
        many => Err(BoardError::Validation(format!(
            "{kind} id prefix '{pattern}' is ambiguous: {} matches",
            many.len()
        ))),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn format_rfc3339(t: OffsetDateTime) -> String {
    t.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_owned())
}

fn format_activity(t: OffsetDateTime) -> String {
    let diff = OffsetDateTime::now_utc() - t;
    if diff < time::Duration::minutes(1) {
        "just now".to_owned()
    } else if diff < time::Duration::hours(1) {
        let mins = diff.whole_minutes();
        if mins == 1 {
            "1 min ago".to_owned()
        } else {
            format!("{mins} mins ago")
        }
    } else if diff < time::Duration::days(1) {
        let hours = diff.whole_hours();
        if hours == 1 {
            "1 hour ago".to_owned()
        } else {
            format!("{hours} hours ago")
        }
    } else if diff < time::Duration::days(7) {
        let days = diff.whole_days();
        if days == 1 {
            "1 day ago".to_owned()
        } else {
            format!("{days} days ago")
        }
    } else {
        t.date().to_string()
    }
}

fn cmd_version() -> ExitCode {
    println!("taskboard version {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  os/arch: {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    ExitCode::SUCCESS
}
