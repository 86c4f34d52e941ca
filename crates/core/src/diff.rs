mod compare;
mod types;

pub use compare::{DiffEngine, is_breaking_column_modify};
pub use types::{ChangeKind, DiffResult, DiffSummary, SchemaChange};

use chrono::{DateTime, Utc};

/// A generated, versioned migration: the diff's `up_sql`/`down_sql` flattened
/// in order, stamped with a `YYYYMMDDHHMMSS` version and a checksum over the
/// joined text (§4.6 "Migration generation").
#[derive(Debug, Clone)]
pub struct GeneratedMigration {
    pub version: String,
    pub up_sql: Vec<String>,
    pub down_sql: Vec<String>,
    pub checksum: String,
}

impl DiffResult {
    #[must_use]
    pub fn generate_migration_at(&self, now: DateTime<Utc>) -> GeneratedMigration {
        GeneratedMigration {
            version: now.format("%Y%m%d%H%M%S").to_string(),
            up_sql: self.up_sql(),
            down_sql: self.down_sql(),
            checksum: self.checksum(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Text,
    Json,
    Sql,
}

/// Renders a diff result in one of the three output formats the diff CLI
/// surface and the registry's dry-run mode share (§4.6 "Rendering").
#[must_use]
pub fn render_diff(result: &DiffResult, format: RenderFormat) -> String {
    match format {
        RenderFormat::Text => render_text(result),
        RenderFormat::Json => serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string()),
        RenderFormat::Sql => render_sql(result),
    }
}

fn render_text(result: &DiffResult) -> String {
    let mut out = String::new();
    out.push_str("+----------------------------------------+\n");
    out.push_str(&format!(
        "| {} table(s), {} column(s), {} index(es), {} fk(s)\n",
        result.summary.tables_added + result.summary.tables_dropped,
        result.summary.columns_added + result.summary.columns_dropped + result.summary.columns_modified,
        result.summary.indexes_added + result.summary.indexes_dropped,
        result.summary.foreign_keys_added + result.summary.foreign_keys_dropped,
    ));
    out.push_str("+----------------------------------------+\n");

    for change in &result.changes {
        let suffix = if change.breaking { " (BREAKING)" } else { "" };
        out.push_str(&format!("{} {}.{}{suffix}\n", change.symbol(), change.table, change.object));
    }

    out
}

fn render_sql(result: &DiffResult) -> String {
    let mut out = String::new();
    out.push_str("-- up\n");
    for statement in result.up_sql() {
        out.push_str(&statement);
        if !statement.trim_end().ends_with(';') {
            out.push(';');
        }
        out.push('\n');
    }
    out.push_str("-- down\n");
    for statement in result.down_sql() {
        out.push_str(&statement);
        if !statement.trim_end().ends_with(';') {
            out.push(';');
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::types::DiffSummary;

    fn sample_result() -> DiffResult {
        DiffResult {
            has_differences: true,
            summary: DiffSummary {
                tables_added: 1,
                ..DiffSummary::default()
            },
            changes: vec![SchemaChange {
                kind: ChangeKind::TableAdd,
                table: "users".to_string(),
                object: "users".to_string(),
                breaking: false,
                up_sql: vec!["CREATE TABLE \"users\" (id TEXT)".to_string()],
                down_sql: vec!["DROP TABLE \"users\"".to_string()],
                old_column: None,
                new_column: None,
            }],
        }
    }

    #[test]
    fn text_render_marks_additions_with_plus() {
        let rendered = render_diff(&sample_result(), RenderFormat::Text);
        assert!(rendered.contains("+ users.users"));
    }

    #[test]
    fn sql_render_terminates_statements_with_semicolons() {
        let rendered = render_diff(&sample_result(), RenderFormat::Sql);
        assert!(rendered.contains("CREATE TABLE \"users\" (id TEXT);"));
        assert!(rendered.contains("DROP TABLE \"users\";"));
    }

    #[test]
    fn json_render_round_trips_has_differences() {
        let rendered = render_diff(&sample_result(), RenderFormat::Json);
        let parsed: DiffResult = serde_json::from_str(&rendered).unwrap();
        assert!(parsed.has_differences);
    }
}
