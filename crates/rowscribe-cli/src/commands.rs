use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use rowscribe_core::{MigrationRequest, redact_url};
use rowscribe_extract::{PostgresExtractor, TableExtractor};
use rowscribe_generate::generate_custom;
use rowscribe_migrate::{
    ChatServiceConverter, MigrationEvent, MigrationOrchestrator, verification_input,
};
use rowscribe_recommend::{FileTaskStore, NewTask, TaskStore, recommend, register_task};

use crate::config::{AppConfig, load_config};
use crate::registry::{RunContext, RunPaths, init_logging, start_run, write_result, write_statements};
use crate::rule_spec::collect_rules;
use crate::{
    CliError, ColumnsArgs, GenerateArgs, MigrateArgs, PreviewArgs, RecommendArgs, TaskAddArgs,
    TaskCommand, VerifyArgs,
};

/// Settings file merged with command-line overrides.
pub struct Settings {
    config: AppConfig,
    run_dir: PathBuf,
}

impl Settings {
    pub fn load(
        path: &Path,
        database_url: Option<String>,
        run_dir: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let mut config = load_config(path)?;
        if database_url.is_some() {
            config.database_url = database_url;
        }
        let run_dir = run_dir.unwrap_or_else(|| config.run_dir.clone());
        Ok(Self { config, run_dir })
    }

    fn run(&self, command: &'static str, options: serde_json::Value) -> RunContext {
        RunContext::new(command, &self.run_dir, options)
    }

    fn task_store(&self) -> Result<FileTaskStore, CliError> {
        Ok(FileTaskStore::open(&self.config.tasks_dir)?)
    }
}

/// Start the run directory and route logs into it.
fn begin(mut ctx: RunContext, settings: &Settings, uses_db: bool) -> Result<RunPaths, CliError> {
    if uses_db {
        ctx.connection = Some(redact_url(&settings.config.database_url()?));
    }
    ctx.translator = settings
        .config
        .translator
        .api_url
        .as_deref()
        .map(redact_url);
    let paths = start_run(&ctx)?;
    init_logging(Some(&paths.logs_path))?;
    info!(
        event = "run_started",
        run_id = %ctx.run_id,
        command = ctx.command,
        run_dir = %paths.root.display()
    );
    Ok(paths)
}

async fn connect(settings: &Settings) -> Result<PgPool, CliError> {
    let url = settings.config.database_url()?;
    detect_engine(&url)?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&url)
        .await?;
    Ok(pool)
}

fn detect_engine(conn: &str) -> Result<&'static str, CliError> {
    if conn.starts_with("postgres://") || conn.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(CliError::UnsupportedEngine(redact_url(conn).redacted))
    }
}

fn finish(started: Instant) {
    info!(
        event = "run_finished",
        status = "success",
        duration_ms = started.elapsed().as_millis() as u64
    );
}

pub async fn run_columns(settings: &Settings, args: ColumnsArgs) -> Result<(), CliError> {
    let started = Instant::now();
    let paths = begin(
        settings.run("columns", json!({ "table": args.table.qualified() })),
        settings,
        true,
    )?;
    let extractor = PostgresExtractor::new(connect(settings).await?);

    let columns = extractor.columns(&args.table).await?;
    write_result(&paths, &columns)?;
    for column in &columns {
        println!("{}\t{}", column.name, column.sql_type);
    }
    finish(started);
    Ok(())
}

pub async fn run_generate(settings: &Settings, args: GenerateArgs) -> Result<(), CliError> {
    let started = Instant::now();
    let rules = collect_rules(args.rules);
    let paths = begin(
        settings.run(
            "generate",
            json!({
                "table": args.table.qualified(),
                "where": args.where_clause,
                "rules": rules,
                "out": args.out,
            }),
        ),
        settings,
        true,
    )?;
    let extractor = PostgresExtractor::new(connect(settings).await?);

    let statements =
        generate_custom(&extractor, &args.table, args.where_clause.as_deref(), &rules).await?;
    info!(
        event = "extraction_finished",
        table = %args.table,
        statements = statements.len()
    );

    write_statements(&paths, &statements, args.out.as_deref())?;
    if args.out.is_none() {
        println!("{}", statements.to_sql_text());
    }
    eprintln!("{} statements for {}", statements.len(), args.table);
    finish(started);
    Ok(())
}

pub async fn run_migrate(settings: &Settings, args: MigrateArgs) -> Result<(), CliError> {
    let started = Instant::now();
    let request = MigrationRequest::new(&args.source, &args.target)?;
    let paths = begin(
        settings.run(
            "migrate",
            json!({
                "source_id": request.source_id,
                "target_id": request.target_id,
                "no_convert": args.no_convert,
                "schema": settings.config.migration.schema,
                "conversion_timeout_secs": settings.config.migration.conversion_timeout_secs,
                "out": args.out,
            }),
        ),
        settings,
        true,
    )?;
    let extractor = Arc::new(PostgresExtractor::new(connect(settings).await?));

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            log_event(&event);
        }
    });

    let mut orchestrator = MigrationOrchestrator::new(extractor)
        .with_options(settings.config.migration_options())
        .with_events(events_tx);
    if !args.no_convert {
        match settings.config.translator()? {
            Some(translator) => {
                orchestrator =
                    orchestrator.with_converter(Arc::new(ChatServiceConverter::new(translator)?));
            }
            None => {
                tracing::warn!("no translator configured, keeping original statements");
            }
        }
    }

    let result = orchestrator.migrate(&request).await;
    drop(orchestrator);
    finish_progress(progress).await;
    let result = result?;

    let statements = result.final_statements();
    write_result(&paths, &result)?;
    write_statements(&paths, &statements, args.out.as_deref())?;
    if args.out.is_none() {
        println!("{}", statements.to_sql_text());
    }
    eprintln!(
        "{} -> {}: {} original statements from {} tables, {} final{}",
        result.source_id,
        result.target_id,
        result.original_count,
        result.tables_with_data(),
        statements.len(),
        if result.used_fallback {
            " (conversion failed, original statements kept)"
        } else {
            ""
        }
    );
    for failed in result.failed_tables() {
        eprintln!(
            "  {} failed: {}",
            failed.table,
            failed.error.as_deref().unwrap_or_default()
        );
    }
    finish(started);
    Ok(())
}

/// Wait for the event forwarder, reporting whether it ended cleanly.
async fn finish_progress(progress: JoinHandle<()>) -> bool {
    match progress.await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(event = "progress_failed", error = %err, "migration progress task failed");
            false
        }
    }
}

fn log_event(event: &MigrationEvent) {
    match event {
        MigrationEvent::State(state) => info!(event = "migration_state", state = ?state),
        MigrationEvent::TableExtracted { table, rows } => {
            info!(event = "table_extracted", table = %table, rows = *rows)
        }
        MigrationEvent::TableFailed { table, error } => {
            tracing::warn!(event = "table_failed", table = %table, error = %error)
        }
        MigrationEvent::ConversionFallback { reason } => {
            tracing::warn!(event = "conversion_fallback", reason = %reason)
        }
    }
}

pub async fn run_preview(settings: &Settings, args: PreviewArgs) -> Result<(), CliError> {
    let started = Instant::now();
    let paths = begin(
        settings.run("preview", json!({ "source_id": args.source })),
        settings,
        true,
    )?;
    let extractor = Arc::new(PostgresExtractor::new(connect(settings).await?));
    let orchestrator =
        MigrationOrchestrator::new(extractor).with_options(settings.config.migration_options());

    let preview = orchestrator.preview(&args.source).await?;
    write_result(&paths, &preview)?;
    println!("{}", serde_json::to_string_pretty(&preview)?);
    finish(started);
    Ok(())
}

pub async fn run_verify(settings: &Settings, args: VerifyArgs) -> Result<(), CliError> {
    let started = Instant::now();
    let translator = settings.config.translator()?.ok_or_else(|| {
        CliError::InvalidArgs("verify needs [translator] api_url in the settings file".to_string())
    })?;
    let paths = begin(
        settings.run(
            "verify",
            json!({
                "file": args.file,
                "table": args.table.as_ref().map(|table| table.qualified()),
            }),
        ),
        settings,
        args.table.is_some(),
    )?;

    let script = std::fs::read_to_string(&args.file)?;
    let statements: Vec<String> = script
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if statements.is_empty() {
        return Err(CliError::InvalidArgs(format!(
            "{} contains no statements",
            args.file.display()
        )));
    }

    let columns = match &args.table {
        Some(table) => {
            PostgresExtractor::new(connect(settings).await?)
                .columns(table)
                .await?
        }
        None => Vec::new(),
    };

    let converter = ChatServiceConverter::new(translator)?;
    let verification = converter
        .verify(&verification_input(&columns, &statements), statements.len())
        .await?;
    write_result(
        &paths,
        &json!({
            "validated_count": verification.validated_count,
            "answer": verification.answer,
        }),
    )?;
    println!("{}", verification.answer);
    finish(started);
    Ok(())
}

pub fn run_recommend(settings: &Settings, args: RecommendArgs) -> Result<(), CliError> {
    init_logging(None)?;
    let sql = read_input(&args.input)?;
    let corpus = settings.task_store()?.list()?;
    let ranked = recommend(&sql, &corpus, args.top);
    info!(corpus = corpus.len(), returned = ranked.len(), "recommendation completed");
    println!("{}", serde_json::to_string_pretty(&ranked)?);
    Ok(())
}

pub fn run_task(settings: &Settings, command: TaskCommand) -> Result<(), CliError> {
    init_logging(None)?;
    let store = settings.task_store()?;
    match command {
        TaskCommand::Add(TaskAddArgs {
            task_id,
            title,
            sql_file,
            content,
            author,
        }) => {
            let sql = read_input(&sql_file)?;
            let record = register_task(
                &store,
                NewTask {
                    task_id,
                    title,
                    content,
                    sql,
                    author,
                },
            )?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        TaskCommand::List => {
            for task in store.list()? {
                println!(
                    "{}\t{}\t{}",
                    task.task_id,
                    task.created_at.to_rfc3339(),
                    task.title
                );
            }
        }
        TaskCommand::Show { task_id } => match store.get(&task_id)? {
            Some(task) => println!("{}", serde_json::to_string_pretty(&task)?),
            None => {
                return Err(CliError::InvalidArgs(format!("task '{task_id}' not found")));
            }
        },
        TaskCommand::Delete { task_id } => {
            if !store.delete(&task_id)? {
                return Err(CliError::InvalidArgs(format!("task '{task_id}' not found")));
            }
            eprintln!("deleted {task_id}");
        }
    }
    Ok(())
}

fn read_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(std::fs::read_to_string(input)?)
    }
}
