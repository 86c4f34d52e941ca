mod error_presentation;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use error_presentation::{CliError, CliResult, render_runtime_error};
use lpdb_core::Dialect;
use lpdb_driver::{Driver, DriverConfig};
use lpdb_migrate::{DownOptions, ModuleStore, Runner, UpOptions, collect};
use lpdb_registry::Registry;

#[derive(Parser)]
#[command(name = "lpdb", about = "Multi-dialect schema migration and registry tool")]
struct Cli {
    #[arg(long, env = "LPDB_CONNECTION_STRING", global = true)]
    connection_string: Option<String>,

    #[arg(long, env = "LPDB_DIALECT", global = true)]
    dialect: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply, revert, and inspect file-based migrations.
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Inspect and register entries in the module registry.
    Module {
        #[command(subcommand)]
        action: ModuleAction,
    },
    /// Reconcile a persisted application schema.
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    Up {
        #[arg(long, default_value = "migrations")]
        dir: PathBuf,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        executed_by: Option<String>,
    },
    Down {
        #[arg(long)]
        steps: Option<usize>,
        #[arg(long)]
        to_version: Option<i64>,
        #[arg(long)]
        dry_run: bool,
    },
    Status {
        #[arg(long, default_value = "migrations")]
        dir: PathBuf,
    },
    Verify {
        #[arg(long, default_value = "migrations")]
        dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum ModuleAction {
    List,
    Register {
        name: String,
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        version: String,
        #[arg(long)]
        migration_prefix: String,
        #[arg(long, value_delimiter = ',')]
        depends_on: Vec<String>,
        #[arg(long, default_value = "")]
        description: String,
    },
}

#[derive(Subcommand)]
enum SchemaAction {
    Register {
        app_id: String,
        schema_name: String,
        version: String,
        #[arg(long)]
        file: PathBuf,
    },
}

fn resolve_dialect(name: Option<&str>) -> CliResult<Arc<dyn Dialect>> {
    match name.unwrap_or("postgres") {
        #[cfg(feature = "postgres")]
        "postgres" => Ok(Arc::new(lpdb_dialect_postgres::PostgresDialect)),
        #[cfg(feature = "mysql")]
        "mysql" => Ok(Arc::new(lpdb_dialect_mysql::MysqlDialect)),
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(lpdb_dialect_sqlite::SqliteDialect)),
        other => Err(CliError::UnknownDialect(other.to_string())),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("{}", render_runtime_error(error));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let dialect = resolve_dialect(cli.dialect.as_deref())?;

    match cli.command {
        Command::Migrate { action } => run_migrate(&cli.connection_string, dialect, action).await,
        Command::Module { action } => run_module(&cli.connection_string, action).await,
        Command::Schema { action } => run_schema(&cli.connection_string, dialect, action).await,
    }
}

async fn connect(connection_string: &Option<String>) -> CliResult<Driver> {
    let connection_string = connection_string.clone().unwrap_or_default();
    Ok(Driver::connect(DriverConfig::new(connection_string)).await?)
}

fn io_error(source: lpdb_migrate::CollectError) -> std::io::Error {
    std::io::Error::other(source.to_string())
}

async fn run_migrate(connection_string: &Option<String>, dialect: Arc<dyn Dialect>, action: MigrateAction) -> CliResult<()> {
    match action {
        MigrateAction::Up { dir, dry_run, executed_by } => {
            let discovered = collect(&dir).map_err(|source| CliError::ReadFile { path: dir.clone(), source: io_error(source) })?;
            if dry_run {
                for migration in &discovered {
                    println!("pending: {}/{}__{}", migration.module_name, migration.version, migration.name);
                }
                return Ok(());
            }
            let driver = Arc::new(connect(connection_string).await?);
            let runner = Runner::new(driver, dialect);
            runner.ensure_ledger_table().await?;
            let options = UpOptions { executed_by, ..Default::default() };
            for record in runner.up(&discovered, &options).await? {
                println!("applied {} {}", record.version, record.name);
            }
        }
        MigrateAction::Down { steps, to_version, dry_run } => {
            let driver = Arc::new(connect(connection_string).await?);
            let runner = Runner::new(driver, dialect);
            let options = DownOptions { steps, to_version, dry_run };
            let label = if dry_run { "pending revert" } else { "reverted" };
            for record in runner.down(&options).await? {
                println!("{label} {} {}", record.version, record.name);
            }
        }
        MigrateAction::Status { dir } => {
            let discovered = collect(&dir).map_err(|source| CliError::ReadFile { path: dir.clone(), source: io_error(source) })?;
            let driver = Arc::new(connect(connection_string).await?);
            let runner = Runner::new(driver, dialect);
            runner.ensure_ledger_table().await?;
            for entry in runner.status(&discovered).await? {
                println!(
                    "{} {} [{}] {}",
                    entry.version,
                    entry.name,
                    entry.module_name,
                    if entry.applied { "applied" } else { "pending" }
                );
            }
        }
        MigrateAction::Verify { dir } => {
            let discovered = collect(&dir).map_err(|source| CliError::ReadFile { path: dir.clone(), source: io_error(source) })?;
            let driver = Arc::new(connect(connection_string).await?);
            let runner = Runner::new(driver, dialect);
            let tampered = runner.verify(&discovered).await?;
            if tampered.is_empty() {
                println!("ok: ledger matches files");
            } else {
                for entry in &tampered {
                    println!(
                        "tampered: version {} recorded={} recomputed={}",
                        entry.version, entry.recorded_checksum, entry.recomputed_checksum
                    );
                }
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

async fn run_module(connection_string: &Option<String>, action: ModuleAction) -> CliResult<()> {
    let driver = Arc::new(connect(connection_string).await?);
    let store = ModuleStore::new(driver);
    store.ensure_table().await?;
    match action {
        ModuleAction::List => {
            for module in store.list().await? {
                println!("{} v{} ({})", module.name, module.version, module.display_name);
            }
        }
        ModuleAction::Register { name, display_name, version, migration_prefix, depends_on, description } => {
            store
                .register(&lpdb_core::ModuleDefinition {
                    name,
                    display_name,
                    version,
                    migration_prefix,
                    dependencies: depends_on,
                    description,
                })
                .await?;
        }
    }
    Ok(())
}

async fn run_schema(connection_string: &Option<String>, dialect: Arc<dyn Dialect>, action: SchemaAction) -> CliResult<()> {
    match action {
        SchemaAction::Register { app_id, schema_name, version, file } => {
            let contents = std::fs::read_to_string(&file).map_err(|source| CliError::ReadFile { path: file.clone(), source })?;
            let schema: lpdb_core::SchemaDefinition = serde_json::from_str(&contents).map_err(CliError::SchemaJson)?;
            let driver = Arc::new(connect(connection_string).await?);
            let registry = Registry::new(driver, dialect);
            let results = registry.register(&app_id, &schema_name, &version, &schema).await?;
            for result in &results {
                println!("{} ({}ms): {}", result.name, result.duration_ms, if result.success { "ok" } else { "failed" });
            }
        }
    }
    Ok(())
}
