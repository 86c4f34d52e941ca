use std::{io, path::PathBuf};

use anyhow::Context;
use miette::Report;

const FILE_READ_CONTEXT: &str = "while reading schema file";
const RUNNER_CONTEXT: &str = "while running the migration runner";
const REGISTRY_CONTEXT: &str = "while registering the schema";
const DRIVER_CONTEXT: &str = "while connecting to the database";

pub(crate) type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug)]
pub(crate) enum CliError {
    UnknownDialect(String),
    ReadFile { path: PathBuf, source: io::Error },
    Driver(lpdb_driver::Error),
    Runner(lpdb_migrate::RunnerError),
    Registry(lpdb_registry::RegistryError),
    SchemaJson(serde_json::Error),
}

impl From<lpdb_driver::Error> for CliError {
    fn from(value: lpdb_driver::Error) -> Self {
        Self::Driver(value)
    }
}

impl From<lpdb_migrate::RunnerError> for CliError {
    fn from(value: lpdb_migrate::RunnerError) -> Self {
        Self::Runner(value)
    }
}

impl From<lpdb_registry::RegistryError> for CliError {
    fn from(value: lpdb_registry::RegistryError) -> Self {
        Self::Registry(value)
    }
}

pub(crate) fn render_runtime_error(error: CliError) -> String {
    match error {
        CliError::UnknownDialect(name) => {
            format!("[config] unknown dialect `{name}`; expected one of postgres, mysql, sqlite")
        }
        CliError::ReadFile { path, source } => {
            let context = format!("{FILE_READ_CONTEXT} `{}`", path.display());
            format!("[io] {}", report_with_context(source, context))
        }
        CliError::Driver(source) => format!("[driver] {}", report_with_context(source, DRIVER_CONTEXT)),
        CliError::Runner(source) => format!("[migrate] {}", report_with_context(source, RUNNER_CONTEXT)),
        CliError::Registry(source) => format!("[registry] {}", report_with_context(source, REGISTRY_CONTEXT)),
        CliError::SchemaJson(source) => format!("[schema] {}", report_with_context(source, "while parsing the desired schema")),
    }
}

fn report_with_context<E, C>(source: E, context: C) -> Report
where
    E: std::error::Error + Send + Sync + 'static,
    C: Into<String>,
{
    let context = context.into();
    let anyhow_error =
        std::result::Result::<(), E>::Err(source).context(context).expect_err("context wrapping must produce an error");
    miette::miette!("{anyhow_error:#}")
}
