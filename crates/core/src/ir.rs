mod column;
mod index;
mod schema;
mod table;
mod types;

pub use column::{ColumnDefinition, Reference};
pub use index::IndexDefinition;
pub use schema::SchemaDefinition;
pub use table::TableDefinition;
pub use types::{ColumnType, ReferentialAction};
