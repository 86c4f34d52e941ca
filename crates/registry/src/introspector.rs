//! Reads live database metadata back into the declarative schema model
//! (§4.5), so the registry can diff a desired [`SchemaDefinition`] against
//! what the database actually contains rather than only its own ledger.

use std::sync::Arc;

use lpdb_core::{
    ColumnDefinition, Dialect, IndexDefinition, IntrospectedColumn, IntrospectedForeignKey,
    IntrospectedIndex, IntrospectedTable, Reference, ReferentialAction, SchemaDefinition,
    TableDefinition, classify_column_type, is_launchpad_internal_table,
};
use lpdb_driver::Driver;

use crate::error::Result;

pub struct Introspector {
    driver: Arc<Driver>,
    dialect: Arc<dyn Dialect>,
}

impl Introspector {
    #[must_use]
    pub fn new(driver: Arc<Driver>, dialect: Arc<dyn Dialect>) -> Self {
        Self { driver, dialect }
    }

    /// Every base table the live database reports, `lp_`/`pg_`/`sql_`-prefixed
    /// tables filtered out unless `include_launchpad_tables` is set (§4.5).
    /// Postgres and MySQL's `TABLES_QUERY` select `table_name`; SQLite's
    /// selects `name` (`sqlite_master` has no `information_schema`).
    async fn table_names(&self, include_launchpad_tables: bool) -> Result<Vec<String>> {
        let column = if self.dialect.name() == "sqlite" { "name" } else { "table_name" };
        let result = self.driver.query(self.dialect.introspect_tables_query(), &[]).await?;
        let mut names = Vec::with_capacity(result.rows.len());
        for row in &result.rows {
            let name: String = row.try_get(column)?;
            if !is_launchpad_internal_table(&name, include_launchpad_tables) {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Assembles the [`IntrospectedTable`] for one named table by issuing the
    /// dialect's columns/indexes/foreign-keys catalog queries (§4.5). Returns
    /// `None` if the table does not exist.
    pub async fn introspect_table(&self, table_name: &str) -> Result<Option<IntrospectedTable>> {
        let columns = self.fetch_columns(table_name).await?;
        if columns.is_empty() {
            return Ok(None);
        }
        let indexes = self.fetch_indexes(table_name).await?;
        let foreign_keys = self.fetch_foreign_keys(table_name).await?;
        let primary_key = indexes
            .iter()
            .find(|index| index.is_primary)
            .map(|index| index.columns.clone())
            .unwrap_or_else(|| {
                // SQLite's single-column `INTEGER PRIMARY KEY` aliases the
                // rowid and gets no `pragma_index_list` entry; `pragma_table_info`'s
                // `pk` flag (surfaced as `is_identity` here) is the only signal.
                if self.dialect.name() == "sqlite" {
                    columns.iter().filter(|c| c.is_identity).map(|c| c.name.clone()).collect()
                } else {
                    Vec::new()
                }
            });

        Ok(Some(IntrospectedTable {
            name: table_name.to_string(),
            columns,
            indexes,
            foreign_keys,
            primary_key,
            constraints: Vec::new(),
        }))
    }

    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<IntrospectedColumn>> {
        let result = self
            .driver
            .query(self.dialect.introspect_columns_query(), &[table_name.to_string()])
            .await?;
        result
            .rows
            .iter()
            .map(|row| {
                Ok(IntrospectedColumn {
                    name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                    udt_name: row.try_get("udt_name")?,
                    is_nullable: parse_bool(&row.try_get::<String>("is_nullable")?),
                    default_value: non_empty(row.try_get("column_default")?),
                    max_length: parse_opt_i64(row.try_get("character_maximum_length")?),
                    numeric_precision: parse_opt_i64(row.try_get("numeric_precision")?),
                    numeric_scale: parse_opt_i64(row.try_get("numeric_scale")?),
                    is_identity: parse_bool(&row.try_get::<String>("is_identity")?),
                    identity_generation: non_empty(row.try_get("identity_generation")?),
                })
            })
            .collect()
    }

    async fn fetch_indexes(&self, table_name: &str) -> Result<Vec<IntrospectedIndex>> {
        let result = self
            .driver
            .query(self.dialect.introspect_indexes_query(), &[table_name.to_string()])
            .await?;

        let mut indexes: Vec<IntrospectedIndex> = Vec::new();
        for row in &result.rows {
            let name: String = row.try_get("index_name")?;
            let column: String = row.try_get("column_name")?;
            let is_unique = parse_bool(&row.try_get::<String>("is_unique")?);
            let is_primary = parse_bool(&row.try_get::<String>("is_primary")?);
            let index_type: String = row.try_get("index_type")?;
            let expression = non_empty(row.try_get("expression")?);

            if let Some(existing) = indexes.iter_mut().find(|index| index.name == name) {
                existing.columns.push(column);
            } else {
                indexes.push(IntrospectedIndex {
                    name,
                    columns: vec![column],
                    is_unique,
                    is_primary,
                    index_type,
                    expression,
                });
            }
        }
        Ok(indexes)
    }

    async fn fetch_foreign_keys(&self, table_name: &str) -> Result<Vec<IntrospectedForeignKey>> {
        let result = self
            .driver
            .query(self.dialect.introspect_foreign_keys_query(), &[table_name.to_string()])
            .await?;

        let mut foreign_keys: Vec<IntrospectedForeignKey> = Vec::new();
        for row in &result.rows {
            let name: String = row.try_get("constraint_name")?;
            let column: String = row.try_get("column_name")?;
            let referenced_table: String = row.try_get("referenced_table")?;
            let referenced_column: String = row.try_get("referenced_column")?;
            let on_delete = non_empty(row.try_get("on_delete")?);
            let on_update = non_empty(row.try_get("on_update")?);

            if let Some(existing) = foreign_keys.iter_mut().find(|fk| fk.name == name) {
                existing.columns.push(column);
                existing.referenced_columns.push(referenced_column);
            } else {
                foreign_keys.push(IntrospectedForeignKey {
                    name,
                    columns: vec![column],
                    referenced_table,
                    referenced_columns: vec![referenced_column],
                    on_delete,
                    on_update,
                });
            }
        }
        Ok(foreign_keys)
    }

    /// Reads every non-internal table in the live database and assembles a
    /// [`SchemaDefinition`] from it — what `register` treats as "current"
    /// before diffing against the desired schema (§4.5, §4.7).
    pub async fn introspect_database(&self, include_launchpad_tables: bool) -> Result<SchemaDefinition> {
        let mut schema = SchemaDefinition::new();
        for table_name in self.table_names(include_launchpad_tables).await? {
            if let Some(introspected) = self.introspect_table(&table_name).await? {
                schema = schema.with_table(table_name, table_definition_from(&introspected, self.dialect.name()));
            }
        }
        Ok(schema)
    }
}

fn table_definition_from(table: &IntrospectedTable, dialect_name: &str) -> TableDefinition {
    let mut definition = TableDefinition::new();

    for column in &table.columns {
        let mut built = ColumnDefinition::new(classify_column_type(&column.data_type, &column.udt_name));
        built.nullable = column.is_nullable;
        built.default = column.default_value.clone();
        if table.primary_key.len() == 1 && table.primary_key[0] == column.name {
            built.primary_key = true;
        }
        if let Some(fk) = table.foreign_keys.iter().find(|fk| fk.columns.first() == Some(&column.name)) {
            built.references = Some(Reference {
                table: fk.referenced_table.clone(),
                column: fk.referenced_columns.first().cloned().unwrap_or_default(),
                on_delete: fk.on_delete.as_deref().and_then(|code| parse_referential_action(code, dialect_name)),
                on_update: fk.on_update.as_deref().and_then(|code| parse_referential_action(code, dialect_name)),
            });
        }
        if let Some(index) = table
            .indexes
            .iter()
            .find(|index| !index.is_primary && index.unique_single_column(&column.name))
        {
            built.unique = index.is_unique;
        }
        definition = definition.with_column(column.name.clone(), built);
    }

    if table.primary_key.len() > 1 {
        definition = definition.with_composite_primary_key(table.primary_key.clone());
    }

    for index in &table.indexes {
        if index.is_primary {
            continue;
        }
        let mut built = IndexDefinition::new(index.columns.clone()).named(index.name.clone());
        if index.is_unique {
            built = built.unique();
        }
        if let Some(predicate) = &index.expression {
            built.predicate = Some(predicate.clone());
        }
        definition = definition.with_index(built);
    }

    definition
}

trait UniqueSingleColumn {
    fn unique_single_column(&self, column: &str) -> bool;
}

impl UniqueSingleColumn for IntrospectedIndex {
    fn unique_single_column(&self, column: &str) -> bool {
        self.columns.len() == 1 && self.columns[0] == column
    }
}

/// Postgres reports `confdeltype`/`confupdtype` as single-character codes;
/// MySQL and SQLite report the full referential-action keyword (§4.5).
fn parse_referential_action(code: &str, dialect_name: &str) -> Option<ReferentialAction> {
    if dialect_name == "postgres" {
        return match code {
            "c" => Some(ReferentialAction::Cascade),
            "n" => Some(ReferentialAction::SetNull),
            "r" => Some(ReferentialAction::Restrict),
            "a" => Some(ReferentialAction::NoAction),
            _ => None,
        };
    }
    match code.to_ascii_uppercase().as_str() {
        "CASCADE" => Some(ReferentialAction::Cascade),
        "SET NULL" => Some(ReferentialAction::SetNull),
        "RESTRICT" => Some(ReferentialAction::Restrict),
        "NO ACTION" => Some(ReferentialAction::NoAction),
        _ => None,
    }
}

fn parse_bool(value: &str) -> bool {
    value == "true"
}

fn parse_opt_i64(value: Option<String>) -> Option<i64> {
    value.and_then(|v| v.parse().ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_referential_action_decodes_postgres_single_char_codes() {
        assert_eq!(parse_referential_action("c", "postgres"), Some(ReferentialAction::Cascade));
        assert_eq!(parse_referential_action("n", "postgres"), Some(ReferentialAction::SetNull));
        assert_eq!(parse_referential_action("r", "postgres"), Some(ReferentialAction::Restrict));
        assert_eq!(parse_referential_action("a", "postgres"), Some(ReferentialAction::NoAction));
    }

    #[test]
    fn parse_referential_action_decodes_textual_rules() {
        assert_eq!(parse_referential_action("CASCADE", "mysql"), Some(ReferentialAction::Cascade));
        assert_eq!(parse_referential_action("SET NULL", "sqlite"), Some(ReferentialAction::SetNull));
        assert_eq!(parse_referential_action("NO ACTION", "mysql"), Some(ReferentialAction::NoAction));
    }

    #[test]
    fn table_definition_from_marks_single_column_primary_key() {
        let table = IntrospectedTable {
            name: "users".to_string(),
            columns: vec![IntrospectedColumn {
                name: "id".to_string(),
                data_type: "uuid".to_string(),
                udt_name: "uuid".to_string(),
                is_nullable: false,
                default_value: None,
                max_length: None,
                numeric_precision: None,
                numeric_scale: None,
                is_identity: false,
                identity_generation: None,
            }],
            indexes: vec![IntrospectedIndex {
                name: "users_pkey".to_string(),
                columns: vec!["id".to_string()],
                is_unique: true,
                is_primary: true,
                index_type: "btree".to_string(),
                expression: None,
            }],
            foreign_keys: vec![],
            primary_key: vec!["id".to_string()],
            constraints: vec![],
        };

        let definition = table_definition_from(&table, "postgres");
        assert!(definition.columns["id"].primary_key);
        assert!(definition.indexes.is_empty());
    }
}
