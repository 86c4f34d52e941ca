//! Translates the same [`QueryAst`] used by [`crate::sql::SqlCompiler`] into
//! MongoDB operations, so a caller can target either backend from one AST
//! (§4.8 "Parallel Mongo emitter").

use serde_json::{Map, Value};

use crate::ast::{Connector, JoinKind, Operator, QueryAst, SelectQuery, WhereClause};
use crate::error::{CompileError, Result};
use crate::tenant::{TenantColumns, TenantContext};

#[derive(Debug, Clone)]
pub enum MongoOperation {
    Find {
        filter: Value,
        projection: Option<Value>,
        sort: Option<Value>,
        skip: Option<i64>,
        limit: Option<i64>,
    },
    CountDocuments {
        filter: Value,
    },
    Aggregate {
        pipeline: Vec<Value>,
    },
}

pub struct MongoCompiler {
    tenant_columns: TenantColumns,
    inject_tenant: bool,
}

impl Default for MongoCompiler {
    fn default() -> Self {
        Self { tenant_columns: TenantColumns::default(), inject_tenant: true }
    }
}

impl MongoCompiler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn without_tenant_injection(mut self) -> Self {
        self.inject_tenant = false;
        self
    }

    pub fn compile(&self, ast: &QueryAst, tenant: Option<&TenantContext>) -> Result<MongoOperation> {
        if self.inject_tenant && tenant.is_none() {
            return Err(CompileError::TenantContextRequired);
        }
        match ast {
            QueryAst::Select(query) => self.compile_select(query, tenant),
            _ => Err(CompileError::UnsupportedFeature { dialect: "mongo".to_string(), feature: "non-select queries".to_string() }),
        }
    }

    fn tenant_predicates(&self, tenant: Option<&TenantContext>) -> Vec<Value> {
        if !self.inject_tenant {
            return Vec::new();
        }
        let tenant = tenant.expect("checked by caller");
        vec![
            doc(vec![(self.tenant_columns.app_id.clone(), Value::String(tenant.app_id.clone()))]),
            doc(vec![(self.tenant_columns.organization_id.clone(), Value::String(tenant.organization_id.clone()))]),
        ]
    }

    fn compile_select(&self, query: &SelectQuery, tenant: Option<&TenantContext>) -> Result<MongoOperation> {
        let filter = build_filter(&query.where_clauses, self.tenant_predicates(tenant));

        if is_count_star(&query.columns) {
            return Ok(MongoOperation::CountDocuments { filter });
        }

        if query.joins.is_empty() && query.group_by.is_empty() && query.having.is_empty() {
            let projection = projection_doc(&query.columns);
            let sort = sort_doc(&query.order_by)?;
            return Ok(MongoOperation::Find { filter, projection, sort, skip: query.offset, limit: query.limit });
        }

        let mut pipeline = vec![doc(vec![("$match".to_string(), filter)])];
        for join in &query.joins {
            let lookup = doc(vec![
                ("from".to_string(), Value::String(join.table.clone())),
                ("localField".to_string(), Value::String(join.left_column.clone())),
                ("foreignField".to_string(), Value::String(join.right_column.clone())),
                ("as".to_string(), Value::String(join.table.clone())),
            ]);
            pipeline.push(doc(vec![("$lookup".to_string(), lookup)]));
            let preserve_null = matches!(join.kind, JoinKind::Left);
            pipeline.push(doc(vec![(
                "$unwind".to_string(),
                doc(vec![
                    ("path".to_string(), Value::String(format!("${}", join.table))),
                    ("preserveNullAndEmptyArrays".to_string(), Value::Bool(preserve_null)),
                ]),
            )]));
        }

        if !query.group_by.is_empty() {
            let mut id_fields = Map::new();
            for column in &query.group_by {
                id_fields.insert(column.clone(), Value::String(format!("${column}")));
            }
            pipeline.push(doc(vec![("$group".to_string(), doc(vec![("_id".to_string(), Value::Object(id_fields))]))]));
        }

        if !query.having.is_empty() {
            let having_filter = build_filter(&query.having, Vec::new());
            pipeline.push(doc(vec![("$match".to_string(), having_filter)]));
        }

        if let Some(sort) = sort_doc(&query.order_by)? {
            pipeline.push(doc(vec![("$sort".to_string(), sort)]));
        }
        if let Some(skip) = query.offset {
            pipeline.push(doc(vec![("$skip".to_string(), Value::from(skip))]));
        }
        if let Some(limit) = query.limit {
            pipeline.push(doc(vec![("$limit".to_string(), Value::from(limit))]));
        }
        if let Some(projection) = projection_doc(&query.columns) {
            pipeline.push(doc(vec![("$project".to_string(), projection)]));
        }

        Ok(MongoOperation::Aggregate { pipeline })
    }
}

fn is_count_star(columns: &[String]) -> bool {
    columns.len() == 1 && columns[0].to_uppercase().replace(' ', "") == "COUNT(*)"
}

fn projection_doc(columns: &[String]) -> Option<Value> {
    if columns.is_empty() || columns == ["*"] {
        return None;
    }
    let mut projection = Map::new();
    for column in columns {
        projection.insert(column.clone(), Value::from(1));
    }
    Some(Value::Object(projection))
}

fn sort_doc(order_by: &[crate::ast::OrderBy]) -> Result<Option<Value>> {
    if order_by.is_empty() {
        return Ok(None);
    }
    let mut sort = Map::new();
    for entry in order_by {
        let direction = entry.direction.to_uppercase();
        if direction != "ASC" && direction != "DESC" {
            return Err(CompileError::InvalidOrderDirection(entry.direction.clone()));
        }
        sort.insert(entry.column.clone(), Value::from(if direction == "ASC" { 1 } else { -1 }));
    }
    Ok(Some(Value::Object(sort)))
}

fn doc(pairs: Vec<(String, Value)>) -> Value {
    let mut map = Map::new();
    for (key, value) in pairs {
        map.insert(key, value);
    }
    Value::Object(map)
}

fn string_value(value: &Option<String>) -> Value {
    match value {
        Some(v) => Value::String(v.clone()),
        None => Value::Null,
    }
}

fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::new();
    for ch in pattern.chars() {
        match ch {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            c if "\\^$.|?*+()[]{}".contains(c) => {
                regex.push('\\');
                regex.push(c);
            }
            c => regex.push(c),
        }
    }
    regex
}

fn mongo_predicate(clause: &WhereClause) -> Value {
    let array_of = |values: &[String]| Value::Array(values.iter().map(|v| Value::String(v.clone())).collect());

    match clause.operator {
        Operator::Eq => doc(vec![(clause.column.clone(), string_value(&clause.value))]),
        Operator::Ne => doc(vec![(clause.column.clone(), doc(vec![("$ne".to_string(), string_value(&clause.value))]))]),
        Operator::Gt => doc(vec![(clause.column.clone(), doc(vec![("$gt".to_string(), string_value(&clause.value))]))]),
        Operator::Gte => doc(vec![(clause.column.clone(), doc(vec![("$gte".to_string(), string_value(&clause.value))]))]),
        Operator::Lt => doc(vec![(clause.column.clone(), doc(vec![("$lt".to_string(), string_value(&clause.value))]))]),
        Operator::Lte => doc(vec![(clause.column.clone(), doc(vec![("$lte".to_string(), string_value(&clause.value))]))]),
        Operator::In => doc(vec![(clause.column.clone(), doc(vec![("$in".to_string(), array_of(&clause.values))]))]),
        Operator::NotIn => doc(vec![(clause.column.clone(), doc(vec![("$nin".to_string(), array_of(&clause.values))]))]),
        Operator::IsNull => doc(vec![(clause.column.clone(), Value::Null)]),
        Operator::IsNotNull => doc(vec![(clause.column.clone(), doc(vec![("$ne".to_string(), Value::Null)]))]),
        Operator::Like => {
            let pattern = like_to_regex(clause.value.as_deref().unwrap_or_default());
            doc(vec![(clause.column.clone(), doc(vec![("$regex".to_string(), Value::String(pattern))]))])
        }
        Operator::ILike => {
            let pattern = like_to_regex(clause.value.as_deref().unwrap_or_default());
            doc(vec![(
                clause.column.clone(),
                doc(vec![("$regex".to_string(), Value::String(pattern)), ("$options".to_string(), Value::String("i".to_string()))]),
            )])
        }
    }
}

fn build_filter(clauses: &[WhereClause], tenant_predicates: Vec<Value>) -> Value {
    let mut and_clauses = tenant_predicates;
    let mut or_group = Vec::new();
    for clause in clauses {
        let predicate = mongo_predicate(clause);
        if clause.connector == Connector::Or {
            or_group.push(predicate);
        } else {
            and_clauses.push(predicate);
        }
    }
    if !or_group.is_empty() {
        and_clauses.push(doc(vec![("$or".to_string(), Value::Array(or_group))]));
    }
    match and_clauses.len() {
        0 => Value::Object(Map::new()),
        1 => and_clauses.into_iter().next().expect("length checked above"),
        _ => doc(vec![("$and".to_string(), Value::Array(and_clauses))]),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ast::OrderBy;

    fn tenant() -> TenantContext {
        TenantContext::new("app-1", "org-1")
    }

    #[test]
    fn simple_select_becomes_find_with_tenant_filter() {
        let compiler = MongoCompiler::new();
        let query = SelectQuery { table: "users".to_string(), ..Default::default() };
        let op = compiler.compile(&QueryAst::Select(query), Some(&tenant())).unwrap();
        match op {
            MongoOperation::Find { filter, .. } => {
                assert_eq!(filter, json!({"$and": [{"app_id": "app-1"}, {"organization_id": "org-1"}]}));
            }
            other => panic!("expected Find, got {other:?}"),
        }
    }

    #[test]
    fn count_star_becomes_count_documents() {
        let compiler = MongoCompiler::new().without_tenant_injection();
        let query = SelectQuery { table: "users".to_string(), columns: vec!["COUNT(*)".to_string()], ..Default::default() };
        let op = compiler.compile(&QueryAst::Select(query), None).unwrap();
        assert!(matches!(op, MongoOperation::CountDocuments { .. }));
    }

    #[test]
    fn or_clauses_become_or_group() {
        let compiler = MongoCompiler::new().without_tenant_injection();
        let query = SelectQuery {
            table: "users".to_string(),
            where_clauses: vec![
                WhereClause::new("email", Operator::Eq, "a@example.com"),
                WhereClause::new("phone", Operator::Eq, "555").or(),
            ],
            ..Default::default()
        };
        let op = compiler.compile(&QueryAst::Select(query), None).unwrap();
        match op {
            MongoOperation::Find { filter, .. } => {
                assert_eq!(
                    filter,
                    json!({"$and": [{"email": "a@example.com"}, {"$or": [{"phone": "555"}]}]})
                );
            }
            other => panic!("expected Find, got {other:?}"),
        }
    }

    #[test]
    fn like_pattern_becomes_regex() {
        let compiler = MongoCompiler::new().without_tenant_injection();
        let query = SelectQuery {
            table: "users".to_string(),
            where_clauses: vec![WhereClause::new("email", Operator::Like, "%@example.com")],
            ..Default::default()
        };
        let op = compiler.compile(&QueryAst::Select(query), None).unwrap();
        match op {
            MongoOperation::Find { filter, .. } => {
                assert_eq!(filter, json!({"email": {"$regex": ".*@example\\.com"}}));
            }
            other => panic!("expected Find, got {other:?}"),
        }
    }

    #[test]
    fn join_produces_aggregate_pipeline() {
        let compiler = MongoCompiler::new().without_tenant_injection();
        let query = SelectQuery {
            table: "orders".to_string(),
            joins: vec![crate::ast::Join {
                table: "users".to_string(),
                left_column: "user_id".to_string(),
                right_column: "id".to_string(),
                kind: JoinKind::Inner,
            }],
            order_by: vec![OrderBy { column: "id".to_string(), direction: "asc".to_string() }],
            ..Default::default()
        };
        let op = compiler.compile(&QueryAst::Select(query), None).unwrap();
        assert!(matches!(op, MongoOperation::Aggregate { .. }));
    }
}
