use crate::{
    Result,
    ir::{ColumnDefinition, ColumnType, IndexDefinition, Reference, TableDefinition},
};

/// Dialect contract: a pure-function mapping from the declarative model to
/// DDL text for one target database, plus the catalog queries the
/// introspector issues for that target.
///
/// Implementations never touch a connection — `lpdb-driver` is the only
/// crate that executes the strings these methods return. `alterColumn`
/// returns a list rather than a single `;`-joined string because Postgres
/// sometimes needs several statements for one logical column change; the
/// runner iterates the list instead of re-splitting it (§9).
///
/// ```
/// use lpdb_core::{ColumnDefinition, ColumnType, Dialect, IndexDefinition, Reference, TableDefinition};
///
/// #[derive(Debug, Default)]
/// struct ExampleDialect;
///
/// impl Dialect for ExampleDialect {
///     fn name(&self) -> &str { "example" }
///     fn supports_transactional_ddl(&self) -> bool { true }
///     fn map_type(&self, _column_type: ColumnType) -> String { "TEXT".to_string() }
///     fn quote_ident(&self, ident: &str) -> String { lpdb_core::quote_identifier(ident, '"') }
///     fn rewrite_default(&self, expr: &str) -> String { expr.to_string() }
///     fn create_table(&self, name: &str, _table: &TableDefinition) -> String {
///         format!("CREATE TABLE {} (id TEXT)", self.quote_ident(name))
///     }
///     fn drop_table(&self, name: &str) -> String {
///         format!("DROP TABLE {}", self.quote_ident(name))
///     }
///     fn add_column(&self, table: &str, column_name: &str, _column: &ColumnDefinition) -> String {
///         format!("ALTER TABLE {} ADD COLUMN {}", self.quote_ident(table), self.quote_ident(column_name))
///     }
///     fn drop_column(&self, table: &str, column_name: &str) -> String {
///         format!("ALTER TABLE {} DROP COLUMN {}", self.quote_ident(table), self.quote_ident(column_name))
///     }
///     fn alter_column(&self, _table: &str, _column_name: &str, _old: &ColumnDefinition, _new: &ColumnDefinition) -> lpdb_core::Result<Vec<String>> {
///         Ok(vec![])
///     }
///     fn create_index(&self, table: &str, index: &IndexDefinition) -> String {
///         format!("CREATE INDEX {} ON {}", index.resolved_name(table), self.quote_ident(table))
///     }
///     fn drop_index(&self, _table: &str, index_name: &str) -> lpdb_core::Result<String> {
///         Ok(format!("DROP INDEX {}", self.quote_ident(index_name)))
///     }
///     fn add_foreign_key(&self, table: &str, column_name: &str, reference: &Reference) -> lpdb_core::Result<String> {
///         Ok(format!("ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {}", self.quote_ident(table), column_name, reference.table))
///     }
///     fn drop_foreign_key(&self, table: &str, constraint_name: &str) -> lpdb_core::Result<String> {
///         Ok(format!("ALTER TABLE {} DROP CONSTRAINT {}", self.quote_ident(table), constraint_name))
///     }
///     fn introspect_tables_query(&self) -> &'static str { "SELECT 1" }
///     fn introspect_columns_query(&self) -> &'static str { "SELECT 1" }
///     fn introspect_indexes_query(&self) -> &'static str { "SELECT 1" }
///     fn introspect_foreign_keys_query(&self) -> &'static str { "SELECT 1" }
/// }
///
/// let dialect = ExampleDialect;
/// assert_eq!(dialect.quote_ident("users"), "\"users\"");
/// assert!(dialect.supports_transactional_ddl());
/// ```
pub trait Dialect: Send + Sync {
    fn name(&self) -> &str;

    /// Whether DDL statements emitted by this dialect can be wrapped in a
    /// transaction (true for Postgres and SQLite, false for MySQL).
    fn supports_transactional_ddl(&self) -> bool;

    fn map_type(&self, column_type: ColumnType) -> String;

    fn quote_ident(&self, ident: &str) -> String;

    /// Rewrites the dialect-neutral default tokens `gen_random_uuid()` and
    /// `now()`/`NOW()` into their native form. Any other expression passes
    /// through unchanged.
    fn rewrite_default(&self, expr: &str) -> String;

    fn create_table(&self, name: &str, table: &TableDefinition) -> String;
    fn drop_table(&self, name: &str) -> String;
    fn add_column(&self, table: &str, column_name: &str, column: &ColumnDefinition) -> String;
    fn drop_column(&self, table: &str, column_name: &str) -> String;

    /// Returns the list of statements needed to change one column from
    /// `old` to `new`. SQLite always errs here: it has no native
    /// `ALTER COLUMN` and expects table recreation instead.
    fn alter_column(
        &self,
        table: &str,
        column_name: &str,
        old: &ColumnDefinition,
        new: &ColumnDefinition,
    ) -> Result<Vec<String>>;

    fn create_index(&self, table: &str, index: &IndexDefinition) -> String;

    /// MySQL requires `table` to be non-empty (`DROP INDEX … ON table`);
    /// other dialects ignore it.
    fn drop_index(&self, table: &str, index_name: &str) -> Result<String>;

    fn add_foreign_key(
        &self,
        table: &str,
        column_name: &str,
        reference: &Reference,
    ) -> Result<String>;

    fn drop_foreign_key(&self, table: &str, constraint_name: &str) -> Result<String>;

    fn introspect_tables_query(&self) -> &'static str;
    fn introspect_columns_query(&self) -> &'static str;
    fn introspect_indexes_query(&self) -> &'static str;
    fn introspect_foreign_keys_query(&self) -> &'static str;
}

/// Default-token rewrite shared by every dialect's `rewrite_default`: only
/// the two recognized tokens are special-cased, everything else is
/// caller-supplied text and passes through untouched.
#[must_use]
pub fn is_uuid_default_token(expr: &str) -> bool {
    expr == "gen_random_uuid()"
}

#[must_use]
pub fn is_now_default_token(expr: &str) -> bool {
    expr == "now()" || expr == "NOW()"
}

/// Identifier quoting shared across dialects: dotted identifiers are split
/// and each segment quoted, `*` passes through, and anything that looks
/// like a SQL expression (contains `(` or a case-insensitive ` as `) passes
/// through unchanged (§4.1).
#[must_use]
pub fn quote_identifier(ident: &str, quote_char: char) -> String {
    if ident == "*" || looks_like_expression(ident) {
        return ident.to_string();
    }

    ident
        .split('.')
        .map(|segment| format!("{quote_char}{segment}{quote_char}"))
        .collect::<Vec<_>>()
        .join(".")
}

fn looks_like_expression(ident: &str) -> bool {
    ident.contains('(') || ident.to_ascii_lowercase().contains(" as ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_dotted_identifiers_segment_by_segment() {
        assert_eq!(quote_identifier("public.users", '"'), "\"public\".\"users\"");
    }

    #[test]
    fn passes_through_star_and_expressions() {
        assert_eq!(quote_identifier("*", '"'), "*");
        assert_eq!(quote_identifier("COUNT(*)", '"'), "COUNT(*)");
        assert_eq!(quote_identifier("id AS user_id", '"'), "id AS user_id");
    }
}
