use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use taskhub::task::today;
use taskhub::{
    AppState, Collaborator, Config, EXPORT_FILE_NAME, ImportMode, Outcome, Priority, Session, SortMode, SqliteSlot,
    StatusFilter, Task, TaskDraft, TaskStore,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskhub")]
#[command(about = "TaskHub CLI - manage a local task list")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Directory holding the task database (overrides the config file)
    #[arg(long)]
    store_path: Option<PathBuf>,

    /// Path to a config.yml (default: <config dir>/taskhub/config.yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Answer yes to every confirmation
    #[arg(short, long)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task to the top of the list
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        notes: String,
        #[arg(short, long, default_value = "medium")]
        priority: String,
        /// Due date as YYYY-MM-DD
        #[arg(short, long, default_value = "")]
        due: String,
    },

    /// Show tasks
    List {
        /// all, active or completed
        #[arg(long)]
        filter: Option<StatusFilter>,
        /// manual, newest, oldest, priority, dueSoon or overdue
        #[arg(long)]
        sort: Option<SortMode>,
        /// Case-insensitive text to look for in titles and notes
        #[arg(long, default_value = "")]
        search: String,
    },

    /// Flip a task between active and completed
    Toggle { id: String },

    /// Replace a task's title, and optionally its other fields
    Edit {
        id: String,
        title: String,
        #[arg(short, long)]
        notes: Option<String>,
        #[arg(short, long)]
        priority: Option<String>,
        #[arg(short, long)]
        due: Option<String>,
    },

    /// Delete a task
    Delete { id: String },

    /// Delete every completed task
    ClearCompleted,

    /// Move a task in the manual order
    Move {
        id: String,
        /// Place it immediately before this task (default: at the end)
        #[arg(long)]
        before: Option<String>,
    },

    /// Write every task to a JSON backup
    Export {
        /// Output file, or `-` for stdout
        #[arg(short, long, default_value = EXPORT_FILE_NAME)]
        out: PathBuf,
    },

    /// Load tasks from a JSON backup
    Import {
        file: PathBuf,
        /// replace or merge
        #[arg(short, long, default_value = "replace")]
        mode: ImportMode,
    },
}

/// Terminal collaborator: prompts on stdin and prints the view
struct Terminal {
    assume_yes: bool,
    today: String,
}

impl Collaborator for Terminal {
    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        print!("{} [y/N] ", prompt.yellow());
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        if io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }

    fn refresh(&mut self, state: &AppState) {
        render(state, &self.today);
    }
}

fn render(state: &AppState, today: &str) {
    for task in state.visible(today) {
        println!("{}", task_line(task, today));
        if !task.notes.trim().is_empty() {
            println!("      {}", task.notes.dimmed());
        }
    }

    let summary = state.summary(today);
    if let Some(empty) = summary.empty_state {
        println!("{}", empty.message().italic());
    }
    println!("{}", summary.counter_label().bold());

    if state.is_manual() {
        println!("{}", "Manual order: use `taskhub move <id> --before <id>` to rearrange".dimmed());
    }
}

fn task_line(task: &Task, today: &str) -> String {
    let check = if task.completed { "[x]" } else { "[ ]" };
    let title = if task.completed {
        task.title.strikethrough().dimmed().to_string()
    } else {
        task.title.clone()
    };

    let badge = match task.priority {
        Priority::High => "HIGH".red().bold(),
        Priority::Medium => "MEDIUM".yellow(),
        Priority::Low => "LOW".blue(),
    };

    let due = if task.due_date.is_empty() {
        String::new()
    } else if task.is_overdue(today) {
        format!(" {}", format!("Due: {}", task.due_date).red().bold())
    } else {
        format!(" Due: {}", task.due_date)
    };

    format!("{} {} {}{} {}", check, title, badge, due, task.id.dimmed())
}

fn report(outcome: Outcome, unchanged: &str) {
    match outcome {
        Outcome::Applied => {}
        Outcome::Unchanged => println!("{}", unchanged.yellow()),
        Outcome::Declined => println!("{}", "Cancelled".yellow()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let store_path = cli.store_path.clone().unwrap_or_else(|| config.store_path.clone());
    let slot = SqliteSlot::open(&store_path)?;
    let store = TaskStore::open(slot, config.storage_key.clone(), config.query())?;

    let terminal = Terminal {
        assume_yes: cli.yes,
        today: today(),
    };
    let mut session = Session::new(store, terminal);

    match cli.command {
        Commands::Add {
            title,
            notes,
            priority,
            due,
        } => {
            let draft = TaskDraft::new(title).notes(notes).priority(priority).due_date(due);
            report(session.add(&draft)?, "Title is empty, nothing added");
        }
        Commands::List { filter, sort, search } => {
            session.with_state(|state| {
                if let Some(filter) = filter {
                    state.set_filter(filter);
                }
                if let Some(sort) = sort {
                    state.set_sort(sort);
                }
                state.set_search(&search);
            });
        }
        Commands::Toggle { id } => {
            report(session.toggle(&id)?, "No such task");
        }
        Commands::Edit {
            id,
            title,
            notes,
            priority,
            due,
        } => {
            let Some(current) = session.state().find(&id) else {
                println!("{}", "No such task".yellow());
                return Ok(());
            };
            let draft = TaskDraft::new(title)
                .notes(notes.unwrap_or_else(|| current.notes.clone()))
                .priority(priority.unwrap_or_else(|| current.priority.to_string()))
                .due_date(due.unwrap_or_else(|| current.due_date.clone()));
            report(session.edit(&id, &draft)?, "Title is empty, nothing changed");
        }
        Commands::Delete { id } => {
            report(session.delete(&id)?, "No such task");
        }
        Commands::ClearCompleted => {
            report(session.clear_completed()?, "No completed tasks");
        }
        Commands::Move { id, before } => {
            session.state_mut().set_sort(SortMode::Manual);
            report(session.move_task(&id, before.as_deref())?, "No such task");
        }
        Commands::Export { out } => {
            let store = session.store();
            if out.as_os_str() == "-" {
                println!("{}", store.export()?);
            } else {
                store.export_to(&out)?;
                println!("Exported {} task(s) to {}", store.tasks().len(), out.display().to_string().green());
            }
        }
        Commands::Import { file, mode } => {
            let payload =
                std::fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let outcome = session.import(&payload, mode)?;
            if outcome == Outcome::Applied {
                println!("{}", "Import successful!".green());
            }
            report(outcome, "Nothing imported");
        }
    }

    Ok(())
}
