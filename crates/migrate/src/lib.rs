//! File-based migration discovery and application: the statement splitter,
//! the directory collector, the ledger-backed runner, and the module-order
//! wrapper around it (§4.3, §4.4).

mod collector;
mod module_store;
mod runner;
mod statement_split;

pub use collector::{CollectError, CollectedMigration, collect};
pub use module_store::ModuleStore;
pub use runner::{DownOptions, MigrationStatusEntry, Result, Runner, RunnerError, TamperedMigration, UpOptions};
pub use statement_split::split_statements;
