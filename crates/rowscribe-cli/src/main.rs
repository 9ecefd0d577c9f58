mod commands;
mod config;
mod registry;
mod rule_spec;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use rowscribe_core::{Error as CoreError, TableRef};
use rowscribe_recommend::StoreError;

use config::DEFAULT_CONFIG_PATH;
use rule_spec::{RuleSpec, parse_rule_spec};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("task store error: {0}")]
    Store(#[from] StoreError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),
}

#[derive(Parser, Debug)]
#[command(name = "rowscribe", version, about = "INSERT script generation and NE-ID migration")]
struct Cli {
    /// Settings file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Database connection string, overriding the settings file.
    #[arg(long, global = true, value_name = "CONNECTION_STRING")]
    database_url: Option<String>,
    /// Output directory for runs, overriding the settings file.
    #[arg(long, global = true)]
    run_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the declared columns of a table.
    Columns(ColumnsArgs),
    /// Render INSERTs for the rows of one table.
    Generate(GenerateArgs),
    /// Rewrite a network element's rows under a new NE id.
    Migrate(MigrateArgs),
    /// Count the rows a migration would read.
    Preview(PreviewArgs),
    /// Ask the translation service to check a SQL script.
    Verify(VerifyArgs),
    /// Rank registered tasks by similarity to a SQL script.
    Recommend(RecommendArgs),
    /// Manage registered tasks.
    #[command(subcommand)]
    Task(TaskCommand),
}

#[derive(Args, Debug)]
struct ColumnsArgs {
    /// Table as schema.table.
    table: TableRef,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Table as schema.table.
    table: TableRef,
    /// Row filter appended after WHERE.
    #[arg(long = "where", value_name = "CLAUSE")]
    where_clause: Option<String>,
    /// Column rule: col=default, col=replace:OLD:NEW, col=now or col=value:VALUE.
    /// Write a literal `:` in OLD or NEW as `\:`.
    #[arg(long = "rule", value_name = "SPEC", value_parser = parse_rule_spec)]
    rules: Vec<RuleSpec>,
    /// Also write the script to this path.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MigrateArgs {
    #[arg(long, value_name = "NE_ID")]
    source: String,
    #[arg(long, value_name = "NE_ID")]
    target: String,
    /// Skip the translation service and keep the original statements.
    #[arg(long, default_value_t = false)]
    no_convert: bool,
    /// Also write the final script to this path.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    #[arg(long, value_name = "NE_ID")]
    source: String,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// SQL script, one statement per line.
    file: PathBuf,
    /// Table whose column layout is sent along with the statements.
    #[arg(long)]
    table: Option<TableRef>,
}

#[derive(Args, Debug)]
struct RecommendArgs {
    /// SQL script, or `-` for stdin.
    input: String,
    #[arg(long, default_value_t = rowscribe_recommend::DEFAULT_TOP_N)]
    top: usize,
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// Register a task.
    Add(TaskAddArgs),
    /// List tasks, newest first.
    List,
    /// Print one task.
    Show { task_id: String },
    /// Remove a task.
    Delete { task_id: String },
}

#[derive(Args, Debug)]
struct TaskAddArgs {
    /// Task id, conventionally PREFIX-YYYY-NNNNN.
    task_id: String,
    #[arg(long)]
    title: String,
    /// SQL script of the task, or `-` for stdin.
    #[arg(long, value_name = "FILE")]
    sql_file: String,
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    author: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = commands::Settings::load(&cli.config, cli.database_url, cli.run_dir)?;

    match cli.command {
        Command::Columns(args) => commands::run_columns(&settings, args).await,
        Command::Generate(args) => commands::run_generate(&settings, args).await,
        Command::Migrate(args) => commands::run_migrate(&settings, args).await,
        Command::Preview(args) => commands::run_preview(&settings, args).await,
        Command::Verify(args) => commands::run_verify(&settings, args).await,
        Command::Recommend(args) => commands::run_recommend(&settings, args),
        Command::Task(command) => commands::run_task(&settings, command),
    }
}
