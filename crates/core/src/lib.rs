//! Declarative schema IR, dialect contract, structural diff engine, and
//! schema-validation invariants shared by every lpdb crate.
//!
//! This crate is deliberately connection-free: dialect implementations are
//! pure functions from the IR to DDL text, and the diff engine only ever
//! calls into a [`Dialect`] to render statements. `lpdb-driver` is the only
//! place a socket gets opened.

mod dialect;
mod diff;
mod error;
mod introspect;
mod ir;
mod migration;
mod module_registry;
mod util;
mod validate;

pub use dialect::{Dialect, is_now_default_token, is_uuid_default_token, quote_identifier};
pub use diff::{
    ChangeKind, DiffEngine, DiffResult, DiffSummary, GeneratedMigration, RenderFormat,
    SchemaChange, is_breaking_column_modify, render_diff,
};
pub use error::{Error, Result};
pub use introspect::{
    IntrospectedColumn, IntrospectedForeignKey, IntrospectedIndex, IntrospectedTable,
    classify_column_type, is_launchpad_internal_table,
};
pub use ir::{ColumnDefinition, ColumnType, IndexDefinition, Reference, ReferentialAction, SchemaDefinition, TableDefinition};
pub use migration::{MigrationRecord, MigrationScope};
pub use module_registry::{ModuleDefinition, ModuleOrderingError, index_by_name, order_modules};
pub use validate::validate_schema;

/// Default table names for the three ledger tables lpdb persists (§6).
pub const DEFAULT_MIGRATIONS_TABLE: &str = "lp_migrations";
pub const DEFAULT_SCHEMA_REGISTRY_TABLE: &str = "lp_schema_registry";
pub const DEFAULT_MODULE_REGISTRY_TABLE: &str = "lp_module_registry";

/// Default tenant column names the compiler injects (§4.8).
pub const DEFAULT_APP_ID_COLUMN: &str = "app_id";
pub const DEFAULT_ORGANIZATION_ID_COLUMN: &str = "organization_id";
