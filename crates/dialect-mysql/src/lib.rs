//! Pure-function MySQL DDL emitter (§4.1).

mod introspection;
mod type_mapping;

use lpdb_core::{
    ColumnDefinition, ColumnType, Dialect, Error, IndexDefinition, Reference, Result,
    TableDefinition, quote_identifier,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct MysqlDialect;

const NAME: &str = "mysql";

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        NAME
    }

    fn supports_transactional_ddl(&self) -> bool {
        false
    }

    fn map_type(&self, column_type: ColumnType) -> String {
        type_mapping::map_type(column_type).to_string()
    }

    fn quote_ident(&self, ident: &str) -> String {
        quote_identifier(ident, '`')
    }

    fn rewrite_default(&self, expr: &str) -> String {
        if lpdb_core::is_uuid_default_token(expr) {
            "(UUID())".to_string()
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
                column_defs.push(self.foreign_key_constraint(table_fk_name(name, column_name), column_name, reference));
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
        table: &str,
        column_name: &str,
        _old: &ColumnDefinition,
        new: &ColumnDefinition,
    ) -> Result<Vec<String>> {
        // MySQL has no standalone ALTER COLUMN; MODIFY COLUMN redefines the
        // whole column in one statement.
        Ok(vec![format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.quote_ident(table),
            self.column_definition_sql(column_name, new)
        )])
    }

    fn create_index(&self, table: &str, index: &IndexDefinition) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        let columns: Vec<String> = index.columns.iter().map(|c| self.quote_ident(c)).collect();

        format!(
            "CREATE {unique}INDEX {} ON {} ({})",
            self.quote_ident(&index.resolved_name(table)),
            self.quote_ident(table),
            columns.join(", ")
        )
    }

    fn drop_index(&self, table: &str, index_name: &str) -> Result<String> {
        if table.is_empty() {
            return Err(Error::UnsupportedFeature {
                dialect: NAME.to_string(),
                operation: "dropIndex without a table name".to_string(),
                remedy: "pass the owning table name; MySQL's DROP INDEX requires ON <table>".to_string(),
            });
        }

        Ok(format!("DROP INDEX {} ON {}", self.quote_ident(index_name), self.quote_ident(table)))
    }

    fn add_foreign_key(&self, table: &str, column_name: &str, reference: &Reference) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD {}",
            self.quote_ident(table),
            self.foreign_key_constraint(table_fk_name(table, column_name), column_name, reference)
        ))
    }

    fn drop_foreign_key(&self, table: &str, constraint_name: &str) -> Result<String> {
        Ok(format!("ALTER TABLE {} DROP FOREIGN KEY {}", self.quote_ident(table), self.quote_ident(constraint_name)))
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

impl MysqlDialect {
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

    fn foreign_key_constraint(&self, constraint_name: String, column_name: &str, reference: &Reference) -> String {
        // MySQL emits foreign keys as a separate CONSTRAINT clause rather
        // than inline on the column definition (§4.1).
        let mut clause = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_ident(&constraint_name),
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

fn table_fk_name(table: &str, column: &str) -> String {
    format!("fk_{table}_{column}")
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
    use lpdb_core::ColumnType;

    #[test]
    fn quotes_identifiers_with_backticks() {
        assert_eq!(MysqlDialect.quote_ident("users"), "`users`");
    }

    #[test]
    fn foreign_keys_are_separate_constraint_clauses() {
        let table = TableDefinition::new()
            .with_column("id", ColumnDefinition::new(ColumnType::Uuid))
            .with_column(
                "author_id",
                ColumnDefinition::new(ColumnType::Uuid).references(Reference {
                    table: "users".to_string(),
                    column: "id".to_string(),
                    on_delete: Some(lpdb_core::ReferentialAction::Cascade),
                    on_update: None,
                }),
            );

        let sql = MysqlDialect.create_table("posts", &table);
        assert!(sql.contains("CONSTRAINT `fk_posts_author_id` FOREIGN KEY"));
        assert!(sql.contains("ON DELETE CASCADE"));
    }

    #[test]
    fn create_table_includes_single_column_primary_key() {
        let table = TableDefinition::new().with_column("id", ColumnDefinition::new(ColumnType::Uuid).primary_key());

        let sql = MysqlDialect.create_table("users", &table);
        assert!(sql.contains("PRIMARY KEY (`id`)"));
    }

    #[test]
    fn drop_index_requires_a_table_name() {
        let err = MysqlDialect.drop_index("", "idx_users_email").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFeature { .. }));
    }

    #[test]
    fn uuid_default_token_becomes_uuid_function_call() {
        let column = ColumnDefinition::new(ColumnType::Uuid).with_default("gen_random_uuid()");
        let sql = MysqlDialect.add_column("users", "id", &column);
        assert!(sql.contains("DEFAULT (UUID())"));
    }

    #[test]
    fn is_not_transactional() {
        assert!(!MysqlDialect.supports_transactional_ddl());
    }
}
