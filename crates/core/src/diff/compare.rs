use crate::{
    Dialect, Result,
    diff::types::{ChangeKind, DiffResult, DiffSummary, SchemaChange},
    ir::{ColumnDefinition, IndexDefinition, SchemaDefinition, TableDefinition},
};

/// Structural diff of two declared schemas (§4.6). Forward/reverse DDL for
/// each change is rendered through the supplied dialect, so a
/// [`DiffEngine`] is always scoped to one target database.
pub struct DiffEngine<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> DiffEngine<'a> {
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    pub fn diff(
        &self,
        current: Option<&SchemaDefinition>,
        target: &SchemaDefinition,
    ) -> Result<DiffResult> {
        let empty = SchemaDefinition::new();
        let current = current.unwrap_or(&empty);

        let mut changes = Vec::new();
        let mut summary = DiffSummary::default();

        for (name, table) in &target.tables {
            if !current.tables.contains_key(name) {
                self.emit_table_add(name, table, &mut changes, &mut summary)?;
            }
        }

        for (name, table) in &current.tables {
            if !target.tables.contains_key(name) {
                self.emit_table_drop(name, table, &mut changes, &mut summary);
            }
        }

        for (name, target_table) in &target.tables {
            let Some(current_table) = current.tables.get(name) else {
                continue;
            };
            self.diff_columns(name, current_table, target_table, &mut changes, &mut summary)?;
            self.diff_indexes(name, current_table, target_table, &mut changes, &mut summary)?;
        }

        let has_differences = !changes.is_empty();
        Ok(DiffResult {
            has_differences,
            summary,
            changes,
        })
    }

    fn emit_table_add(
        &self,
        name: &str,
        table: &TableDefinition,
        changes: &mut Vec<SchemaChange>,
        summary: &mut DiffSummary,
    ) -> Result<()> {
        changes.push(SchemaChange {
            kind: ChangeKind::TableAdd,
            table: name.to_string(),
            object: name.to_string(),
            breaking: false,
            up_sql: vec![self.dialect.create_table(name, table)],
            down_sql: vec![self.dialect.drop_table(name)],
            old_column: None,
            new_column: None,
        });
        summary.tables_added += 1;

        for index in &table.indexes {
            changes.push(SchemaChange {
                kind: ChangeKind::IndexAdd,
                table: name.to_string(),
                object: index.resolved_name(name),
                breaking: false,
                up_sql: vec![self.dialect.create_index(name, index)],
                down_sql: vec![self.dialect.drop_index(name, &index.resolved_name(name))?],
                old_column: None,
                new_column: None,
            });
            summary.indexes_added += 1;
        }

        Ok(())
    }

    fn emit_table_drop(
        &self,
        name: &str,
        table: &TableDefinition,
        changes: &mut Vec<SchemaChange>,
        summary: &mut DiffSummary,
    ) {
        changes.push(SchemaChange {
            kind: ChangeKind::TableDrop,
            table: name.to_string(),
            object: name.to_string(),
            breaking: true,
            up_sql: vec![self.dialect.drop_table(name)],
            down_sql: vec![self.dialect.create_table(name, table)],
            old_column: None,
            new_column: None,
        });
        summary.tables_dropped += 1;
    }

    fn diff_columns(
        &self,
        table_name: &str,
        current: &TableDefinition,
        target: &TableDefinition,
        changes: &mut Vec<SchemaChange>,
        summary: &mut DiffSummary,
    ) -> Result<()> {
        for (column_name, column) in &target.columns {
            if !current.columns.contains_key(column_name) {
                self.emit_column_add(table_name, column_name, column, changes, summary)?;
            }
        }

        for (column_name, column) in &current.columns {
            if !target.columns.contains_key(column_name) {
                self.emit_column_drop(table_name, column_name, column, changes, summary);
            }
        }

        for (column_name, target_column) in &target.columns {
            let Some(current_column) = current.columns.get(column_name) else {
                continue;
            };
            if !current_column.diff_eq(target_column) {
                self.emit_column_modify(
                    table_name,
                    column_name,
                    current_column,
                    target_column,
                    changes,
                    summary,
                )?;
            }
        }

        Ok(())
    }

    fn emit_column_add(
        &self,
        table_name: &str,
        column_name: &str,
        column: &ColumnDefinition,
        changes: &mut Vec<SchemaChange>,
        summary: &mut DiffSummary,
    ) -> Result<()> {
        changes.push(SchemaChange {
            kind: ChangeKind::ColumnAdd,
            table: table_name.to_string(),
            object: column_name.to_string(),
            breaking: false,
            up_sql: vec![self.dialect.add_column(table_name, column_name, column)],
            down_sql: vec![self.dialect.drop_column(table_name, column_name)],
            old_column: None,
            new_column: Some(column.clone()),
        });
        summary.columns_added += 1;

        if let Some(reference) = &column.references {
            let constraint_name = foreign_key_constraint_name(table_name, column_name);
            changes.push(SchemaChange {
                kind: ChangeKind::ForeignKeyAdd,
                table: table_name.to_string(),
                object: constraint_name.clone(),
                breaking: false,
                up_sql: vec![self.dialect.add_foreign_key(table_name, column_name, reference)?],
                down_sql: vec![self.dialect.drop_foreign_key(table_name, &constraint_name)?],
                old_column: None,
                new_column: None,
            });
            summary.foreign_keys_added += 1;
        }

        Ok(())
    }

    fn emit_column_drop(
        &self,
        table_name: &str,
        column_name: &str,
        column: &ColumnDefinition,
        changes: &mut Vec<SchemaChange>,
        summary: &mut DiffSummary,
    ) {
        changes.push(SchemaChange {
            kind: ChangeKind::ColumnDrop,
            table: table_name.to_string(),
            object: column_name.to_string(),
            breaking: true,
            up_sql: vec![self.dialect.drop_column(table_name, column_name)],
            down_sql: vec![self.dialect.add_column(table_name, column_name, column)],
            old_column: Some(column.clone()),
            new_column: None,
        });
        summary.columns_dropped += 1;
    }

    fn emit_column_modify(
        &self,
        table_name: &str,
        column_name: &str,
        old: &ColumnDefinition,
        new: &ColumnDefinition,
        changes: &mut Vec<SchemaChange>,
        summary: &mut DiffSummary,
    ) -> Result<()> {
        let up_sql = self.dialect.alter_column(table_name, column_name, old, new)?;
        let down_sql = self.dialect.alter_column(table_name, column_name, new, old)?;

        changes.push(SchemaChange {
            kind: ChangeKind::ColumnModify,
            table: table_name.to_string(),
            object: column_name.to_string(),
            breaking: is_breaking_column_modify(old, new),
            up_sql,
            down_sql,
            old_column: Some(old.clone()),
            new_column: Some(new.clone()),
        });
        summary.columns_modified += 1;

        Ok(())
    }

    fn diff_indexes(
        &self,
        table_name: &str,
        current: &TableDefinition,
        target: &TableDefinition,
        changes: &mut Vec<SchemaChange>,
        summary: &mut DiffSummary,
    ) -> Result<()> {
        let current_by_name = keyed_by_name(table_name, &current.indexes);
        let target_by_name = keyed_by_name(table_name, &target.indexes);

        for (resolved_name, index) in &target_by_name {
            if !current_by_name.contains_key(resolved_name) {
                changes.push(SchemaChange {
                    kind: ChangeKind::IndexAdd,
                    table: table_name.to_string(),
                    object: resolved_name.clone(),
                    breaking: false,
                    up_sql: vec![self.dialect.create_index(table_name, index)],
                    down_sql: vec![self.dialect.drop_index(table_name, resolved_name)?],
                    old_column: None,
                    new_column: None,
                });
                summary.indexes_added += 1;
            }
        }

        for (resolved_name, index) in &current_by_name {
            if !target_by_name.contains_key(resolved_name) {
                changes.push(SchemaChange {
                    kind: ChangeKind::IndexDrop,
                    table: table_name.to_string(),
                    object: resolved_name.clone(),
                    breaking: false,
                    up_sql: vec![self.dialect.drop_index(table_name, resolved_name)?],
                    down_sql: vec![self.dialect.create_index(table_name, index)],
                    old_column: None,
                    new_column: None,
                });
                summary.indexes_dropped += 1;
            }
        }

        Ok(())
    }
}

fn keyed_by_name<'a>(
    table_name: &str,
    indexes: &'a [IndexDefinition],
) -> std::collections::BTreeMap<String, &'a IndexDefinition> {
    indexes
        .iter()
        .map(|index| (index.resolved_name(table_name), index))
        .collect()
}

fn foreign_key_constraint_name(table: &str, column: &str) -> String {
    format!("fk_{table}_{column}")
}

/// Breaking-change policy for `column_modify` (§4.6): tightening nullability
/// from nullable to non-null, or narrowing the type per the widening
/// ranking in [`crate::ColumnType::breaking_rank`].
#[must_use]
pub fn is_breaking_column_modify(old: &ColumnDefinition, new: &ColumnDefinition) -> bool {
    let tightens_nullability = old.nullable && !new.nullable;
    let narrows_type = new.column_type.breaking_rank() < old.column_type.breaking_rank();
    tightens_nullability || narrows_type
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ColumnDefinition, ColumnType, IndexDefinition, Reference, SchemaDefinition,
        TableDefinition,
    };

    struct FakeDialect;

    impl Dialect for FakeDialect {
        fn name(&self) -> &str {
            "fake"
        }
        fn supports_transactional_ddl(&self) -> bool {
            true
        }
        fn map_type(&self, _column_type: ColumnType) -> String {
            "TEXT".to_string()
        }
        fn quote_ident(&self, ident: &str) -> String {
            crate::quote_identifier(ident, '"')
        }
        fn rewrite_default(&self, expr: &str) -> String {
            expr.to_string()
        }
        fn create_table(&self, name: &str, _table: &TableDefinition) -> String {
            format!("CREATE TABLE {}", self.quote_ident(name))
        }
        fn drop_table(&self, name: &str) -> String {
            format!("DROP TABLE {}", self.quote_ident(name))
        }
        fn add_column(&self, table: &str, column_name: &str, _column: &ColumnDefinition) -> String {
            format!("ALTER TABLE {} ADD COLUMN {}", self.quote_ident(table), column_name)
        }
        fn drop_column(&self, table: &str, column_name: &str) -> String {
            format!("ALTER TABLE {} DROP COLUMN {}", self.quote_ident(table), column_name)
        }
        fn alter_column(
            &self,
            table: &str,
            column_name: &str,
            _old: &ColumnDefinition,
            _new: &ColumnDefinition,
        ) -> Result<Vec<String>> {
            Ok(vec![format!(
                "ALTER TABLE {} ALTER COLUMN {}",
                self.quote_ident(table),
                column_name
            )])
        }
        fn create_index(&self, table: &str, index: &IndexDefinition) -> String {
            format!("CREATE INDEX {} ON {}", index.resolved_name(table), self.quote_ident(table))
        }
        fn drop_index(&self, _table: &str, index_name: &str) -> Result<String> {
            Ok(format!("DROP INDEX {}", self.quote_ident(index_name)))
        }
        fn add_foreign_key(
            &self,
            table: &str,
            column_name: &str,
            reference: &Reference,
        ) -> Result<String> {
            Ok(format!(
                "ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {}",
                self.quote_ident(table),
                column_name,
                reference.table
            ))
        }
        fn drop_foreign_key(&self, table: &str, constraint_name: &str) -> Result<String> {
            Ok(format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.quote_ident(table),
                constraint_name
            ))
        }
        fn introspect_tables_query(&self) -> &'static str {
            ""
        }
        fn introspect_columns_query(&self) -> &'static str {
            ""
        }
        fn introspect_indexes_query(&self) -> &'static str {
            ""
        }
        fn introspect_foreign_keys_query(&self) -> &'static str {
            ""
        }
    }

    #[test]
    fn table_add_emits_create_table_and_indexes() {
        let dialect = FakeDialect;
        let engine = DiffEngine::new(&dialect);
        let target = SchemaDefinition::new().with_table(
            "users",
            TableDefinition::new()
                .with_column("id", ColumnDefinition::new(ColumnType::Uuid).primary_key())
                .with_index(IndexDefinition::new(vec!["id".to_string()])),
        );

        let result = engine.diff(None, &target).unwrap();
        assert!(result.has_differences);
        assert_eq!(result.summary.tables_added, 1);
        assert_eq!(result.summary.indexes_added, 1);
        assert!(result.changes[0].up_sql[0].starts_with("CREATE TABLE \"users\""));
    }

    #[test]
    fn diffing_identical_schemas_yields_no_changes() {
        let dialect = FakeDialect;
        let engine = DiffEngine::new(&dialect);
        let schema = SchemaDefinition::new().with_table(
            "users",
            TableDefinition::new().with_column("id", ColumnDefinition::new(ColumnType::Uuid)),
        );

        let result = engine.diff(Some(&schema), &schema).unwrap();
        assert!(!result.has_differences);
        assert!(result.changes.is_empty());
    }

    #[test]
    fn nullable_to_non_null_is_breaking() {
        let old = ColumnDefinition::new(ColumnType::String).nullable();
        let new = ColumnDefinition::new(ColumnType::String);
        assert!(is_breaking_column_modify(&old, &new));
    }

    #[test]
    fn widening_type_is_not_breaking() {
        let old = ColumnDefinition::new(ColumnType::Integer);
        let new = ColumnDefinition::new(ColumnType::BigInt);
        assert!(!is_breaking_column_modify(&old, &new));
    }

    #[test]
    fn narrowing_type_is_breaking() {
        let old = ColumnDefinition::new(ColumnType::Text);
        let new = ColumnDefinition::new(ColumnType::Integer);
        assert!(is_breaking_column_modify(&old, &new));
    }

    #[test]
    fn column_add_with_reference_emits_follow_up_foreign_key() {
        let dialect = FakeDialect;
        let engine = DiffEngine::new(&dialect);
        let current = SchemaDefinition::new().with_table(
            "posts",
            TableDefinition::new().with_column("id", ColumnDefinition::new(ColumnType::Uuid)),
        );
        let target = SchemaDefinition::new().with_table(
            "posts",
            TableDefinition::new()
                .with_column("id", ColumnDefinition::new(ColumnType::Uuid))
                .with_column(
                    "author_id",
                    ColumnDefinition::new(ColumnType::Uuid).references(Reference {
                        table: "users".to_string(),
                        column: "id".to_string(),
                        on_delete: None,
                        on_update: None,
                    }),
                ),
        );

        let result = engine.diff(Some(&current), &target).unwrap();
        let kinds: Vec<_> = result.changes.iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&ChangeKind::ColumnAdd));
        assert!(kinds.contains(&ChangeKind::ForeignKeyAdd));
    }
}
