//! Compiles a [`QueryAst`] into dialect-specific SQL text plus a positional
//! parameter list, injecting tenant predicates the way §4.8 mandates.

use lpdb_core::Dialect;

use crate::ast::{Connector, DeleteQuery, InsertQuery, JoinKind, Operator, QueryAst, SelectQuery, UpdateQuery, WhereClause};
use crate::error::{CompileError, Result};
use crate::tenant::{TenantColumns, TenantContext};

#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<String>,
}

pub struct SqlCompiler<'a> {
    dialect: &'a dyn Dialect,
    tenant_columns: TenantColumns,
    inject_tenant: bool,
}

impl<'a> SqlCompiler<'a> {
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect, tenant_columns: TenantColumns::default(), inject_tenant: true }
    }

    #[must_use]
    pub fn without_tenant_injection(mut self) -> Self {
        self.inject_tenant = false;
        self
    }

    #[must_use]
    pub fn with_tenant_columns(mut self, columns: TenantColumns) -> Self {
        self.tenant_columns = columns;
        self
    }

    pub fn compile(&self, ast: &QueryAst, tenant: Option<&TenantContext>) -> Result<CompiledQuery> {
        if self.inject_tenant && tenant.is_none() {
            return Err(CompileError::TenantContextRequired);
        }
        match ast {
            QueryAst::Select(q) => self.compile_select(q, tenant),
            QueryAst::Insert(q) => self.compile_insert(q, tenant),
            QueryAst::Update(q) => self.compile_update(q, tenant),
            QueryAst::Delete(q) => self.compile_delete(q, tenant),
        }
    }

    fn quote(&self, ident: &str) -> String {
        self.dialect.quote_ident(ident)
    }

    /// `COUNT(*)`-style expressions are emitted unquoted (§4.8 "Identifier-
    /// containing-expression detection").
    fn quote_maybe_expr(&self, ident: &str) -> String {
        if ident.contains('(') { ident.to_string() } else { self.quote(ident) }
    }

    fn placeholder(&self, position: usize) -> String {
        if self.dialect.name() == "postgres" { format!("${position}") } else { "?".to_string() }
    }

    fn tenant_predicate(
        &self,
        column: &str,
        qualifier: Option<&str>,
        value: &str,
        placeholders: &mut usize,
        params: &mut Vec<String>,
    ) -> String {
        *placeholders += 1;
        let ph = self.placeholder(*placeholders);
        params.push(value.to_string());
        match qualifier {
            Some(table) => format!("{}.{} = {ph}", self.quote(table), self.quote(column)),
            None => format!("{} = {ph}", self.quote(column)),
        }
    }

    fn compile_where_clauses(
        &self,
        clauses: &[WhereClause],
        placeholders: &mut usize,
        params: &mut Vec<String>,
        qualifier: Option<&str>,
    ) -> Vec<(String, Connector)> {
        clauses
            .iter()
            .map(|clause| {
                let column = match qualifier {
                    Some(table) => format!("{}.{}", self.quote(table), self.quote(&clause.column)),
                    None => self.quote(&clause.column),
                };
                let predicate = match clause.operator {
                    Operator::IsNull | Operator::IsNotNull => format!("{column} {}", clause.operator.as_sql()),
                    Operator::In if clause.values.is_empty() => "1 = 0".to_string(),
                    Operator::NotIn if clause.values.is_empty() => "1 = 1".to_string(),
                    Operator::In | Operator::NotIn => {
                        let marks: Vec<String> = clause
                            .values
                            .iter()
                            .map(|value| {
                                params.push(value.clone());
                                *placeholders += 1;
                                self.placeholder(*placeholders)
                            })
                            .collect();
                        format!("{column} {} ({})", clause.operator.as_sql(), marks.join(", "))
                    }
                    _ => {
                        params.push(clause.value.clone().unwrap_or_default());
                        *placeholders += 1;
                        format!("{column} {} {}", clause.operator.as_sql(), self.placeholder(*placeholders))
                    }
                };
                (predicate, clause.connector)
            })
            .collect()
    }

    fn render_order_by(&self, columns: &[crate::ast::OrderBy]) -> Result<String> {
        let mut parts = Vec::with_capacity(columns.len());
        for entry in columns {
            let direction = entry.direction.to_uppercase();
            if direction != "ASC" && direction != "DESC" {
                return Err(CompileError::InvalidOrderDirection(entry.direction.clone()));
            }
            parts.push(format!("{} {direction}", self.quote(&entry.column)));
        }
        Ok(parts.join(", "))
    }

    fn render_returning(&self, returning: &[String]) -> Result<String> {
        if returning.is_empty() {
            return Ok(String::new());
        }
        if self.dialect.name() == "mysql" {
            return Err(CompileError::UnsupportedFeature { dialect: "mysql".to_string(), feature: "RETURNING".to_string() });
        }
        let columns = returning.iter().map(|c| self.quote(c)).collect::<Vec<_>>().join(", ");
        Ok(format!(" RETURNING {columns}"))
    }

    fn render_on_conflict(&self, on_conflict: &crate::ast::OnConflict, inserted_columns: &[String]) -> Result<String> {
        use crate::ast::ConflictAction;

        let default_update_columns = || {
            inserted_columns
                .iter()
                .filter(|column| !on_conflict.columns.contains(column))
                .cloned()
                .collect::<Vec<_>>()
        };

        if self.dialect.name() == "mysql" {
            return Ok(match on_conflict.action {
                ConflictAction::Nothing => " ON DUPLICATE KEY UPDATE id = id".to_string(),
                ConflictAction::Update => {
                    let update_columns =
                        if on_conflict.update_columns.is_empty() { default_update_columns() } else { on_conflict.update_columns.clone() };
                    let assignments = update_columns
                        .iter()
                        .map(|c| format!("{0} = VALUES({0})", self.quote(c)))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!(" ON DUPLICATE KEY UPDATE {assignments}")
                }
            });
        }

        let conflict_columns = on_conflict.columns.iter().map(|c| self.quote(c)).collect::<Vec<_>>().join(", ");
        Ok(match on_conflict.action {
            ConflictAction::Nothing => format!(" ON CONFLICT ({conflict_columns}) DO NOTHING"),
            ConflictAction::Update => {
                let update_columns =
                    if on_conflict.update_columns.is_empty() { default_update_columns() } else { on_conflict.update_columns.clone() };
                let assignments = update_columns
                    .iter()
                    .map(|c| format!("{0} = EXCLUDED.{0}", self.quote(c)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(" ON CONFLICT ({conflict_columns}) DO UPDATE SET {assignments}")
            }
        })
    }

    fn compile_select(&self, query: &SelectQuery, tenant: Option<&TenantContext>) -> Result<CompiledQuery> {
        let mut placeholders = 0usize;
        let mut params = Vec::new();

        let columns = if query.columns.is_empty() {
            "*".to_string()
        } else {
            query.columns.iter().map(|c| self.quote_maybe_expr(c)).collect::<Vec<_>>().join(", ")
        };

        let mut sql = format!("SELECT {columns} FROM {}", self.quote(&query.table));
        for join in &query.joins {
            let keyword = match join.kind { JoinKind::Inner => "INNER JOIN", JoinKind::Left => "LEFT JOIN" };
            sql.push_str(&format!(
                " {keyword} {} ON {}.{} = {}.{}",
                self.quote(&join.table),
                self.quote(&query.table),
                self.quote(&join.left_column),
                self.quote(&join.table),
                self.quote(&join.right_column),
            ));
        }

        let qualifier = if query.joins.is_empty() { None } else { Some(query.table.as_str()) };
        let mut predicates = Vec::new();
        if self.inject_tenant {
            let tenant = tenant.expect("checked by caller");
            predicates.push((
                self.tenant_predicate(&self.tenant_columns.app_id, qualifier, &tenant.app_id, &mut placeholders, &mut params),
                Connector::And,
            ));
            predicates.push((
                self.tenant_predicate(
                    &self.tenant_columns.organization_id,
                    qualifier,
                    &tenant.organization_id,
                    &mut placeholders,
                    &mut params,
                ),
                Connector::And,
            ));
        }
        predicates.extend(self.compile_where_clauses(&query.where_clauses, &mut placeholders, &mut params, qualifier));
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&join_predicates(&predicates));
        }

        if !query.group_by.is_empty() {
            let columns = query.group_by.iter().map(|c| self.quote(c)).collect::<Vec<_>>().join(", ");
            sql.push_str(&format!(" GROUP BY {columns}"));
        }

        if !query.having.is_empty() {
            let having = self.compile_where_clauses(&query.having, &mut placeholders, &mut params, None);
            sql.push_str(" HAVING ");
            sql.push_str(&join_predicates(&having));
        }

        if !query.order_by.is_empty() {
            sql.push_str(&format!(" ORDER BY {}", self.render_order_by(&query.order_by)?));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = query.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        Ok(CompiledQuery { sql, params })
    }

    fn compile_insert(&self, query: &InsertQuery, tenant: Option<&TenantContext>) -> Result<CompiledQuery> {
        if query.rows.is_empty() {
            return Err(CompileError::EmptyInsert);
        }

        let mut columns: Vec<String> = query.rows[0].keys().cloned().collect();
        if self.inject_tenant {
            for column in [&self.tenant_columns.app_id, &self.tenant_columns.organization_id] {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut params = Vec::new();
        let mut placeholders = 0usize;
        let mut tuples = Vec::with_capacity(query.rows.len());
        for row in &query.rows {
            let mut marks = Vec::with_capacity(columns.len());
            for column in &columns {
                let value = if self.inject_tenant && *column == self.tenant_columns.app_id {
                    tenant.expect("checked by caller").app_id.clone()
                } else if self.inject_tenant && *column == self.tenant_columns.organization_id {
                    tenant.expect("checked by caller").organization_id.clone()
                } else {
                    row.get(column).cloned().unwrap_or_default()
                };
                params.push(value);
                placeholders += 1;
                marks.push(self.placeholder(placeholders));
            }
            tuples.push(format!("({})", marks.join(", ")));
        }

        let column_list = columns.iter().map(|c| self.quote(c)).collect::<Vec<_>>().join(", ");
        let mut sql = format!("INSERT INTO {} ({column_list}) VALUES {}", self.quote(&query.table), tuples.join(", "));

        if let Some(on_conflict) = &query.on_conflict {
            sql.push_str(&self.render_on_conflict(on_conflict, &columns)?);
        }
        sql.push_str(&self.render_returning(&query.returning)?);

        Ok(CompiledQuery { sql, params })
    }

    fn compile_update(&self, query: &UpdateQuery, tenant: Option<&TenantContext>) -> Result<CompiledQuery> {
        let mut placeholders = 0usize;
        let mut params = Vec::new();

        let assignments: Vec<String> = query
            .data
            .iter()
            .map(|(column, value)| {
                params.push(value.clone());
                placeholders += 1;
                format!("{} = {}", self.quote(column), self.placeholder(placeholders))
            })
            .collect();
        let mut sql = format!("UPDATE {} SET {}", self.quote(&query.table), assignments.join(", "));

        let mut predicates = Vec::new();
        if self.inject_tenant {
            let tenant = tenant.expect("checked by caller");
            predicates.push((
                self.tenant_predicate(&self.tenant_columns.app_id, None, &tenant.app_id, &mut placeholders, &mut params),
                Connector::And,
            ));
            predicates.push((
                self.tenant_predicate(
                    &self.tenant_columns.organization_id,
                    None,
                    &tenant.organization_id,
                    &mut placeholders,
                    &mut params,
                ),
                Connector::And,
            ));
        }
        predicates.extend(self.compile_where_clauses(&query.where_clauses, &mut placeholders, &mut params, None));
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&join_predicates(&predicates));
        }

        sql.push_str(&self.render_returning(&query.returning)?);
        Ok(CompiledQuery { sql, params })
    }

    fn compile_delete(&self, query: &DeleteQuery, tenant: Option<&TenantContext>) -> Result<CompiledQuery> {
        let mut placeholders = 0usize;
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", self.quote(&query.table));

        let mut predicates = Vec::new();
        if self.inject_tenant {
            let tenant = tenant.expect("checked by caller");
            predicates.push((
                self.tenant_predicate(&self.tenant_columns.app_id, None, &tenant.app_id, &mut placeholders, &mut params),
                Connector::And,
            ));
            predicates.push((
                self.tenant_predicate(
                    &self.tenant_columns.organization_id,
                    None,
                    &tenant.organization_id,
                    &mut placeholders,
                    &mut params,
                ),
                Connector::And,
            ));
        }
        predicates.extend(self.compile_where_clauses(&query.where_clauses, &mut placeholders, &mut params, None));
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&join_predicates(&predicates));
        }

        sql.push_str(&self.render_returning(&query.returning)?);
        Ok(CompiledQuery { sql, params })
    }
}

fn join_predicates(predicates: &[(String, Connector)]) -> String {
    let mut out = String::new();
    for (index, (text, connector)) in predicates.iter().enumerate() {
        if index == 0 {
            out.push_str(text);
        } else {
            out.push_str(if *connector == Connector::Or { " OR " } else { " AND " });
            out.push_str(text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use lpdb_core::{ColumnType, IndexDefinition, Reference, TableDefinition};

    use super::*;
    use crate::ast::{ConflictAction, OnConflict, OrderBy};

    struct FakeDialect(&'static str);

    impl Dialect for FakeDialect {
        fn name(&self) -> &str {
            self.0
        }
        fn supports_transactional_ddl(&self) -> bool {
            true
        }
        fn map_type(&self, _column_type: ColumnType) -> String {
            "TEXT".to_string()
        }
        fn quote_ident(&self, ident: &str) -> String {
            let quote_char = if self.0 == "mysql" { '`' } else { '"' };
            lpdb_core::quote_identifier(ident, quote_char)
        }
        fn rewrite_default(&self, expr: &str) -> String {
            expr.to_string()
        }
        fn create_table(&self, _name: &str, _table: &TableDefinition) -> String {
            String::new()
        }
        fn drop_table(&self, _name: &str) -> String {
            String::new()
        }
        fn add_column(&self, _table: &str, _column_name: &str, _column: &lpdb_core::ColumnDefinition) -> String {
            String::new()
        }
        fn drop_column(&self, _table: &str, _column_name: &str) -> String {
            String::new()
        }
        fn alter_column(
            &self,
            _table: &str,
            _column_name: &str,
            _old: &lpdb_core::ColumnDefinition,
            _new: &lpdb_core::ColumnDefinition,
        ) -> lpdb_core::Result<Vec<String>> {
            Ok(vec![])
        }
        fn create_index(&self, _table: &str, _index: &IndexDefinition) -> String {
            String::new()
        }
        fn drop_index(&self, _table: &str, _index_name: &str) -> lpdb_core::Result<String> {
            Ok(String::new())
        }
        fn add_foreign_key(&self, _table: &str, _column_name: &str, _reference: &Reference) -> lpdb_core::Result<String> {
            Ok(String::new())
        }
        fn drop_foreign_key(&self, _table: &str, _constraint_name: &str) -> lpdb_core::Result<String> {
            Ok(String::new())
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

    fn tenant() -> TenantContext {
        TenantContext::new("app-1", "org-1")
    }

    #[test]
    fn missing_tenant_context_is_rejected() {
        let dialect = FakeDialect("postgres");
        let compiler = SqlCompiler::new(&dialect);
        let ast = QueryAst::Select(SelectQuery { table: "users".to_string(), ..Default::default() });
        assert_eq!(compiler.compile(&ast, None).unwrap_err(), CompileError::TenantContextRequired);
    }

    #[test]
    fn select_prepends_tenant_predicates_with_dollar_placeholders() {
        let dialect = FakeDialect("postgres");
        let compiler = SqlCompiler::new(&dialect);
        let ast = QueryAst::Select(SelectQuery {
            table: "users".to_string(),
            where_clauses: vec![WhereClause::new("email", Operator::Eq, "a@example.com")],
            ..Default::default()
        });
        let compiled = compiler.compile(&ast, Some(&tenant())).unwrap();
        assert_eq!(
            compiled.sql,
            r#"SELECT * FROM "users" WHERE "app_id" = $1 AND "organization_id" = $2 AND "email" = $3"#
        );
        assert_eq!(compiled.params, vec!["app-1", "org-1", "a@example.com"]);
    }

    #[test]
    fn or_connector_prefixes_with_or() {
        let dialect = FakeDialect("mysql");
        let compiler = SqlCompiler::new(&dialect);
        let ast = QueryAst::Select(SelectQuery {
            table: "users".to_string(),
            where_clauses: vec![
                WhereClause::new("email", Operator::Eq, "a@example.com"),
                WhereClause::new("phone", Operator::Eq, "555").or(),
            ],
            ..Default::default()
        });
        let compiled = compiler.compile(&ast, Some(&tenant())).unwrap();
        assert!(compiled.sql.ends_with("`email` = ? OR `phone` = ?"));
    }

    #[test]
    fn empty_in_list_becomes_false() {
        let dialect = FakeDialect("postgres");
        let compiler = SqlCompiler::new(&dialect).without_tenant_injection();
        let ast = QueryAst::Select(SelectQuery {
            table: "users".to_string(),
            where_clauses: vec![WhereClause::in_list("id", Operator::In, vec![])],
            ..Default::default()
        });
        let compiled = compiler.compile(&ast, None).unwrap();
        assert!(compiled.sql.contains("1 = 0"));
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn invalid_order_direction_is_rejected() {
        let dialect = FakeDialect("postgres");
        let compiler = SqlCompiler::new(&dialect).without_tenant_injection();
        let ast = QueryAst::Select(SelectQuery {
            table: "users".to_string(),
            order_by: vec![OrderBy { column: "id".to_string(), direction: "sideways".to_string() }],
            ..Default::default()
        });
        assert!(matches!(compiler.compile(&ast, None), Err(CompileError::InvalidOrderDirection(_))));
    }

    #[test]
    fn batch_insert_injects_tenant_columns_into_every_row() {
        let dialect = FakeDialect("postgres");
        let compiler = SqlCompiler::new(&dialect);
        let mut row_a = BTreeMap::new();
        row_a.insert("email".to_string(), "a@example.com".to_string());
        let mut row_b = BTreeMap::new();
        row_b.insert("email".to_string(), "b@example.com".to_string());

        let ast = QueryAst::Insert(InsertQuery { table: "users".to_string(), rows: vec![row_a, row_b], ..Default::default() });
        let compiled = compiler.compile(&ast, Some(&tenant())).unwrap();
        assert!(compiled.sql.contains(r#""app_id""#));
        assert!(compiled.sql.contains(r#""organization_id""#));
        assert_eq!(compiled.params.len(), 6);
    }

    #[test]
    fn empty_insert_rows_is_rejected() {
        let dialect = FakeDialect("postgres");
        let compiler = SqlCompiler::new(&dialect).without_tenant_injection();
        let ast = QueryAst::Insert(InsertQuery { table: "users".to_string(), ..Default::default() });
        assert_eq!(compiler.compile(&ast, None).unwrap_err(), CompileError::EmptyInsert);
    }

    #[test]
    fn mysql_on_conflict_nothing_uses_idempotent_update() {
        let dialect = FakeDialect("mysql");
        let compiler = SqlCompiler::new(&dialect).without_tenant_injection();
        let mut row = BTreeMap::new();
        row.insert("id".to_string(), "1".to_string());
        let ast = QueryAst::Insert(InsertQuery {
            table: "users".to_string(),
            rows: vec![row],
            on_conflict: Some(OnConflict { columns: vec!["id".to_string()], action: ConflictAction::Nothing, update_columns: vec![] }),
            ..Default::default()
        });
        let compiled = compiler.compile(&ast, None).unwrap();
        assert!(compiled.sql.contains("ON DUPLICATE KEY UPDATE id = id"));
    }

    #[test]
    fn mysql_rejects_returning() {
        let dialect = FakeDialect("mysql");
        let compiler = SqlCompiler::new(&dialect).without_tenant_injection();
        let ast = QueryAst::Delete(DeleteQuery { table: "users".to_string(), returning: vec!["id".to_string()], ..Default::default() });
        assert!(matches!(compiler.compile(&ast, None), Err(CompileError::UnsupportedFeature { .. })));
    }
}
