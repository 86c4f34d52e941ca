use serde::{Deserialize, Serialize};

use crate::ir::ColumnType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrospectedColumn {
    pub name: String,
    pub data_type: String,
    pub udt_name: String,
    pub is_nullable: bool,
    pub default_value: Option<String>,
    pub max_length: Option<i64>,
    pub numeric_precision: Option<i64>,
    pub numeric_scale: Option<i64>,
    pub is_identity: bool,
    pub identity_generation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrospectedIndex {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
    #[serde(rename = "type")]
    pub index_type: String,
    pub expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrospectedForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntrospectedTable {
    pub name: String,
    pub columns: Vec<IntrospectedColumn>,
    pub indexes: Vec<IntrospectedIndex>,
    pub foreign_keys: Vec<IntrospectedForeignKey>,
    pub primary_key: Vec<String>,
    pub constraints: Vec<String>,
}

/// Prefixes the introspector filters out by default (§4.5); opt in with
/// `include_launchpad_tables`.
const FILTERED_PREFIXES: [&str; 3] = ["lp_", "pg_", "sql_"];

#[must_use]
pub fn is_launchpad_internal_table(table_name: &str, include_launchpad_tables: bool) -> bool {
    if include_launchpad_tables {
        return false;
    }
    FILTERED_PREFIXES.iter().any(|prefix| table_name.starts_with(prefix))
}

/// Deterministic classifier mapping a catalog `(data_type, udt_name)` pair
/// back to the declarative [`ColumnType`] (§4.5). Both inputs are matched
/// lowercased; `data_type` is tried first, falling back to `udt_name`.
#[must_use]
pub fn classify_column_type(data_type: &str, udt_name: &str) -> ColumnType {
    classify(&data_type.to_ascii_lowercase()).unwrap_or_else(|| {
        classify(&udt_name.to_ascii_lowercase()).unwrap_or(ColumnType::String)
    })
}

fn classify(lowered: &str) -> Option<ColumnType> {
    if lowered.contains("bigint") || lowered.contains("int8") {
        Some(ColumnType::BigInt)
    } else if lowered.contains("int") && !lowered.contains("interval") {
        Some(ColumnType::Integer)
    } else if lowered.contains("float") || lowered.contains("double") || lowered.contains("real") {
        Some(ColumnType::Float)
    } else if lowered.contains("numeric") || lowered.contains("decimal") {
        Some(ColumnType::Decimal)
    } else if lowered.starts_with("bool") {
        Some(ColumnType::Boolean)
    } else if lowered.contains("timestamp") || lowered.contains("datetime") {
        Some(ColumnType::DateTime)
    } else if lowered.contains("date") {
        Some(ColumnType::Date)
    } else if lowered.contains("time") {
        Some(ColumnType::Time)
    } else if lowered.contains("json") {
        Some(ColumnType::Json)
    } else if lowered.contains("bytea") || lowered.contains("blob") || lowered.contains("binary") {
        Some(ColumnType::Binary)
    } else if lowered.contains("text") {
        Some(ColumnType::Text)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_does_not_match_interval() {
        assert_eq!(classify_column_type("interval", ""), ColumnType::String);
    }

    #[test]
    fn bigint_takes_priority_over_generic_int() {
        assert_eq!(classify_column_type("bigint", ""), ColumnType::BigInt);
        assert_eq!(classify_column_type("int8", ""), ColumnType::BigInt);
    }

    #[test]
    fn falls_back_to_udt_name_when_data_type_is_unrecognized() {
        assert_eq!(classify_column_type("USER-DEFINED", "jsonb"), ColumnType::Json);
    }

    #[test]
    fn unknown_types_default_to_string() {
        assert_eq!(classify_column_type("tsvector", "tsvector"), ColumnType::String);
    }

    #[test]
    fn filters_launchpad_internal_prefixes_by_default() {
        assert!(is_launchpad_internal_table("lp_migrations", false));
        assert!(is_launchpad_internal_table("pg_catalog", false));
        assert!(!is_launchpad_internal_table("lp_migrations", true));
        assert!(!is_launchpad_internal_table("users", false));
    }
}
