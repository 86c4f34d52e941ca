//! Pure-function SQLite DDL emitter (§4.1). SQLite has no native
//! `ALTER COLUMN` or post-creation foreign-key DDL, so several capability
//! methods here fail fast with a remedy pointing at table recreation.

mod introspection;
mod type_mapping;

use lpdb_core::{
    ColumnDefinition, ColumnType, Dialect, Error, IndexDefinition, Reference, Result,
    TableDefinition, quote_identifier,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

const NAME: &str = "sqlite";
const RECREATION_REMEDY: &str =
    "recreate the table (CREATE new table, copy rows, DROP old, rename) instead";

/// Deterministic SQLite expression producing a UUIDv4-shaped string at
/// insert time: four `randomblob`-derived hex groups assembled with the
/// version/variant nibbles fixed in place (§4.1).
const SQLITE_UUID_EXPR: &str = "(lower(hex(randomblob(4)) || '-' || hex(randomblob(2)) || '-4' || \
substr(hex(randomblob(2)),2) || '-' || substr('89ab',abs(random()) % 4 + 1, 1) || \
substr(hex(randomblob(2)),2) || '-' || hex(randomblob(6))))";

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        NAME
    }

    fn supports_transactional_ddl(&self) -> bool {
        true
    }

    fn map_type(&self, column_type: ColumnType) -> String {
        type_mapping::map_type(column_type).to_string()
    }

    fn quote_ident(&self, ident: &str) -> String {
        quote_identifier(ident, '"')
    }

    fn rewrite_default(&self, expr: &str) -> String {
        if lpdb_core::is_uuid_default_token(expr) {
            SQLITE_UUID_EXPR.to_string()
        } else if lpdb_core::is_now_default_token(expr) {
            "(datetime('now'))".to_string()
        } else {
            expr.to_string()
        }
    }

    fn create_table(&self, name: &str, table: &TableDefinition) -> String {
        let mut column_defs: Vec<String> = table
            .columns
            .iter()
            .map(|(column_name, column)| self.column_definition_sql(column_name, column))
            .collect();

        let pk_columns = table.primary_key_columns();
        if !pk_columns.is_empty() {
            let quoted: Vec<String> = pk_columns.iter().map(|c| self.quote_ident(c)).collect();
            column_defs.push(format!("PRIMARY KEY ({})", quoted.join(", ")));
        }

        for (column_name, column) in &table.columns {
            if let Some(reference) = &column.references {
                column_defs.push(format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    self.quote_ident(column_name),
                    self.quote_ident(&reference.table),
                    self.quote_ident(&reference.column)
                ));
            }
        }

        format!("CREATE TABLE {} (\n  {}\n)", self.quote_ident(name), column_defs.join(",\n  "))
    }

    fn drop_table(&self, name: &str) -> String {
        format!("DROP TABLE {}", self.quote_ident(name))
    }

    fn add_column(&self, table: &str, column_name: &str, column: &ColumnDefinition) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_ident(table),
            self.column_definition_sql(column_name, column)
        )
    }

    fn drop_column(&self, table: &str, column_name: &str) -> String {
        format!("ALTER TABLE {} DROP COLUMN {}", self.quote_ident(table), self.quote_ident(column_name))
    }

    fn alter_column(
        &self,
        _table: &str,
        _column_name: &str,
        _old: &ColumnDefinition,
        _new: &ColumnDefinition,
    ) -> Result<Vec<String>> {
        Err(unsupported("alterColumn"))
    }

    fn create_index(&self, table: &str, index: &IndexDefinition) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        let columns: Vec<String> = index.columns.iter().map(|c| self.quote_ident(c)).collect();
        let predicate = index.predicate.as_ref().map(|p| format!(" WHERE {p}")).unwrap_or_default();

        format!(
            "CREATE {unique}INDEX {} ON {} ({}){predicate}",
            self.quote_ident(&index.resolved_name(table)),
            self.quote_ident(table),
            columns.join(", ")
        )
    }

    fn drop_index(&self, _table: &str, index_name: &str) -> Result<String> {
        Ok(format!("DROP INDEX {}", self.quote_ident(index_name)))
    }

    fn add_foreign_key(&self, _table: &str, _column_name: &str, _reference: &Reference) -> Result<String> {
        Err(unsupported("addForeignKey after table creation"))
    }

    fn drop_foreign_key(&self, _table: &str, _constraint_name: &str) -> Result<String> {
        Err(unsupported("dropForeignKey"))
    }

    fn introspect_tables_query(&self) -> &'static str {
        introspection::TABLES_QUERY
    }

    fn introspect_columns_query(&self) -> &'static str {
        introspection::COLUMNS_QUERY
    }

    fn introspect_indexes_query(&self) -> &'static str {
        introspection::INDEXES_QUERY
    }

    fn introspect_foreign_keys_query(&self) -> &'static str {
        introspection::FOREIGN_KEYS_QUERY
    }
}

impl SqliteDialect {
    fn column_definition_sql(&self, column_name: &str, column: &ColumnDefinition) -> String {
        let mut parts = vec![self.quote_ident(column_name), self.map_type(column.column_type)];

        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }
        if column.unique {
            parts.push("UNIQUE".to_string());
        }
        if let Some(default) = &column.default {
            parts.push(format!("DEFAULT {}", self.rewrite_default(default)));
        }

        parts.join(" ")
    }
}

fn unsupported(operation: &str) -> Error {
    Error::UnsupportedFeature {
        dialect: NAME.to_string(),
        operation: operation.to_string(),
        remedy: RECREATION_REMEDY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpdb_core::ColumnType;

    #[test]
    fn alter_column_is_unsupported() {
        let old = ColumnDefinition::new(ColumnType::String);
        let new = ColumnDefinition::new(ColumnType::Text);
        let err = SqliteDialect.alter_column("users", "bio", &old, &new).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFeature { .. }));
    }

    #[test]
    fn add_foreign_key_after_creation_is_unsupported() {
        let reference = Reference {
            table: "users".to_string(),
            column: "id".to_string(),
            on_delete: None,
            on_update: None,
        };
        let err = SqliteDialect.add_foreign_key("posts", "author_id", &reference).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFeature { .. }));
    }

    #[test]
    fn drop_foreign_key_is_unsupported() {
        let err = SqliteDialect.drop_foreign_key("posts", "fk_posts_author_id").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFeature { .. }));
    }

    #[test]
    fn uuid_default_token_becomes_randomblob_expression() {
        let column = ColumnDefinition::new(ColumnType::Uuid).with_default("gen_random_uuid()");
        let sql = SqliteDialect.add_column("users", "id", &column);
        assert!(sql.contains("randomblob"));
    }

    #[test]
    fn now_default_token_becomes_datetime_now() {
        let column = ColumnDefinition::new(ColumnType::DateTime).with_default("now()");
        let sql = SqliteDialect.add_column("users", "created_at", &column);
        assert!(sql.contains("datetime('now')"));
    }

    #[test]
    fn create_table_includes_single_column_primary_key() {
        let table = TableDefinition::new().with_column("id", ColumnDefinition::new(ColumnType::Uuid).primary_key());

        let sql = SqliteDialect.create_table("users", &table);
        assert!(sql.contains("PRIMARY KEY (\"id\")"));
    }

    #[test]
    fn foreign_keys_are_inline_at_creation() {
        let table = TableDefinition::new().with_column(
            "author_id",
            ColumnDefinition::new(ColumnType::Uuid).references(Reference {
                table: "users".to_string(),
                column: "id".to_string(),
                on_delete: None,
                on_update: None,
            }),
        );
        let sql = SqliteDialect.create_table("posts", &table);
        assert!(sql.contains("FOREIGN KEY (\"author_id\") REFERENCES \"users\" (\"id\")"));
    }
}
