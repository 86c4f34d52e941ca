//! Pure-function PostgreSQL DDL emitter (§4.1). Never touches a connection;
//! `lpdb-driver` executes the strings this crate returns.

mod introspection;
mod type_mapping;

use lpdb_core::{
    ColumnDefinition, ColumnType, Dialect, IndexDefinition, Reference, Result, TableDefinition,
    quote_identifier,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

const NAME: &str = "postgres";

impl Dialect for PostgresDialect {
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
        // Postgres has `gen_random_uuid()` and `now()` natively; only the
        // uuid token needs normalizing to the canonical pgcrypto spelling.
        if lpdb_core::is_uuid_default_token(expr) {
            "gen_random_uuid()".to_string()
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
                column_defs.push(self.inline_foreign_key(column_name, reference));
            }
        }

        format!(
            "CREATE TABLE {} (\n  {}\n)",
            self.quote_ident(name),
            column_defs.join(",\n  ")
        )
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
        table: &str,
        column_name: &str,
        old: &ColumnDefinition,
        new: &ColumnDefinition,
    ) -> Result<Vec<String>> {
        // Postgres needs one ALTER TABLE clause per property changed; the
        // dialect returns the list rather than a `;`-joined string (§9).
        let quoted_table = self.quote_ident(table);
        let quoted_column = self.quote_ident(column_name);
        let mut statements = Vec::new();

        if old.column_type != new.column_type {
            statements.push(format!(
                "ALTER TABLE {quoted_table} ALTER COLUMN {quoted_column} TYPE {} USING {quoted_column}::{}",
                self.map_type(new.column_type),
                self.map_type(new.column_type)
            ));
        }

        if old.nullable != new.nullable {
            let clause = if new.nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
            statements.push(format!("ALTER TABLE {quoted_table} ALTER COLUMN {quoted_column} {clause}"));
        }

        if old.default != new.default {
            match &new.default {
                Some(default) => statements.push(format!(
                    "ALTER TABLE {quoted_table} ALTER COLUMN {quoted_column} SET DEFAULT {}",
                    self.rewrite_default(default)
                )),
                None => statements.push(format!("ALTER TABLE {quoted_table} ALTER COLUMN {quoted_column} DROP DEFAULT")),
            }
        }

        Ok(statements)
    }

    fn create_index(&self, table: &str, index: &IndexDefinition) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        let columns: Vec<String> = index.columns.iter().map(|c| self.quote_ident(c)).collect();
        let predicate = index
            .predicate
            .as_ref()
            .map(|p| format!(" WHERE {p}"))
            .unwrap_or_default();

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

    fn add_foreign_key(&self, table: &str, column_name: &str, reference: &Reference) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD {}",
            self.quote_ident(table),
            self.inline_foreign_key(column_name, reference)
        ))
    }

    fn drop_foreign_key(&self, table: &str, constraint_name: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_ident(table),
            self.quote_ident(constraint_name)
        ))
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

impl PostgresDialect {
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

    fn inline_foreign_key(&self, column_name: &str, reference: &Reference) -> String {
        let mut clause = format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_ident(column_name),
            self.quote_ident(&reference.table),
            self.quote_ident(&reference.column)
        );
        if let Some(on_delete) = reference.on_delete {
            clause.push_str(&format!(" ON DELETE {}", action_sql(on_delete)));
        }
        if let Some(on_update) = reference.on_update {
            clause.push_str(&format!(" ON UPDATE {}", action_sql(on_update)));
        }
        clause
    }
}

fn action_sql(action: lpdb_core::ReferentialAction) -> &'static str {
    match action {
        lpdb_core::ReferentialAction::Cascade => "CASCADE",
        lpdb_core::ReferentialAction::SetNull => "SET NULL",
        lpdb_core::ReferentialAction::Restrict => "RESTRICT",
        lpdb_core::ReferentialAction::NoAction => "NO ACTION",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpdb_core::{ColumnType, IndexDefinition};

    #[test]
    fn quotes_identifiers_with_double_quotes() {
        assert_eq!(PostgresDialect.quote_ident("users"), "\"users\"");
    }

    #[test]
    fn maps_uuid_to_native_type() {
        assert_eq!(PostgresDialect.map_type(ColumnType::Uuid), "UUID");
    }

    #[test]
    fn create_table_includes_not_null_and_composite_pk() {
        let table = TableDefinition::new()
            .with_column("id", ColumnDefinition::new(ColumnType::Uuid))
            .with_column("app_id", ColumnDefinition::new(ColumnType::Uuid).tenant())
            .with_composite_primary_key(vec!["id".to_string(), "app_id".to_string()]);

        let sql = PostgresDialect.create_table("users", &table);
        assert!(sql.starts_with("CREATE TABLE \"users\""));
        assert!(sql.contains("NOT NULL"));
        assert!(sql.contains("PRIMARY KEY (\"id\", \"app_id\")"));
    }

    #[test]
    fn create_table_includes_single_column_primary_key() {
        let table = TableDefinition::new()
            .with_column("id", ColumnDefinition::new(ColumnType::Uuid).primary_key())
            .with_column("app_id", ColumnDefinition::new(ColumnType::Uuid).tenant());

        let sql = PostgresDialect.create_table("users", &table);
        assert!(sql.contains("PRIMARY KEY (\"id\")"));
    }

    #[test]
    fn uuid_default_token_becomes_native_function() {
        let column = ColumnDefinition::new(ColumnType::Uuid).with_default("gen_random_uuid()");
        let sql = PostgresDialect.add_column("users", "id", &column);
        assert!(sql.contains("DEFAULT gen_random_uuid()"));
    }

    #[test]
    fn create_index_renders_unique_and_predicate() {
        let index = IndexDefinition::new(vec!["email".to_string()])
            .unique()
            .named("idx_users_email");
        let mut index = index;
        index.predicate = Some("deleted_at IS NULL".to_string());

        let sql = PostgresDialect.create_index("users", &index);
        assert!(sql.starts_with("CREATE UNIQUE INDEX \"idx_users_email\""));
        assert!(sql.ends_with("WHERE deleted_at IS NULL"));
    }

    #[test]
    fn alter_column_emits_one_statement_per_changed_property() {
        let old = ColumnDefinition::new(ColumnType::String).nullable();
        let new = ColumnDefinition::new(ColumnType::Text);

        let statements = PostgresDialect.alter_column("users", "bio", &old, &new).unwrap();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("TYPE TEXT"));
        assert!(statements[1].contains("SET NOT NULL"));
    }
}
