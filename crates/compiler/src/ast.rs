//! The dialect-independent query AST the SQL and Mongo emitters both
//! compile from (§4.8).

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl Operator {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::ILike => "ILIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }
}

/// One predicate. `value` holds the single bound operand (`Eq`, `Like`, …);
/// `values` holds the element list for `In`/`NotIn`. `connector` governs how
/// this clause joins to the predicate before it (ignored for the first
/// clause in a list).
#[derive(Debug, Clone)]
pub struct WhereClause {
    pub column: String,
    pub operator: Operator,
    pub value: Option<String>,
    pub values: Vec<String>,
    pub connector: Connector,
}

impl WhereClause {
    #[must_use]
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self { column: column.into(), operator, value: Some(value.into()), values: Vec::new(), connector: Connector::And }
    }

    #[must_use]
    pub fn or(mut self) -> Self {
        self.connector = Connector::Or;
        self
    }

    #[must_use]
    pub fn in_list(column: impl Into<String>, operator: Operator, values: Vec<String>) -> Self {
        Self { column: column.into(), operator, value: None, values, connector: Connector::And }
    }

    #[must_use]
    pub fn null_check(column: impl Into<String>, operator: Operator) -> Self {
        Self { column: column.into(), operator, value: None, values: Vec::new(), connector: Connector::And }
    }
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub column: String,
    pub direction: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone)]
pub struct Join {
    pub table: String,
    pub left_column: String,
    pub right_column: String,
    pub kind: JoinKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    Nothing,
    Update,
}

/// `columns` are the conflict target; `update_columns` overrides the
/// default (all inserted columns minus the conflict target) when non-empty.
#[derive(Debug, Clone)]
pub struct OnConflict {
    pub columns: Vec<String>,
    pub action: ConflictAction,
    pub update_columns: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub table: String,
    pub columns: Vec<String>,
    pub joins: Vec<Join>,
    pub where_clauses: Vec<WhereClause>,
    pub group_by: Vec<String>,
    pub having: Vec<WhereClause>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct InsertQuery {
    pub table: String,
    pub rows: Vec<BTreeMap<String, String>>,
    pub returning: Vec<String>,
    pub on_conflict: Option<OnConflict>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateQuery {
    pub table: String,
    pub data: BTreeMap<String, String>,
    pub where_clauses: Vec<WhereClause>,
    pub returning: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteQuery {
    pub table: String,
    pub where_clauses: Vec<WhereClause>,
    pub returning: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum QueryAst {
    Select(SelectQuery),
    Insert(InsertQuery),
    Update(UpdateQuery),
    Delete(DeleteQuery),
}

impl QueryAst {
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            QueryAst::Select(q) => &q.table,
            QueryAst::Insert(q) => &q.table,
            QueryAst::Update(q) => &q.table,
            QueryAst::Delete(q) => &q.table,
        }
    }
}
