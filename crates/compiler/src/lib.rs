//! Compiles one dialect-neutral [`QueryAst`] into either parameterized SQL
//! or an equivalent MongoDB operation, injecting tenant predicates along
//! the way (§4.8). Pure: no I/O, no connection.

mod ast;
mod error;
mod mongo;
mod sql;
mod tenant;

pub use ast::{
    ConflictAction, Connector, DeleteQuery, InsertQuery, Join, JoinKind, OnConflict, Operator, OrderBy, QueryAst, SelectQuery,
    UpdateQuery, WhereClause,
};
pub use error::{CompileError, Result};
pub use mongo::{MongoCompiler, MongoOperation};
pub use sql::{CompiledQuery, SqlCompiler};
pub use tenant::{TenantColumns, TenantContext};
