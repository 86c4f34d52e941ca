use lpdb_core::ColumnType;

/// Type mapping contract table, SQLite column (§4.1). SQLite's type
/// affinity system means most semantic types collapse onto a handful of
/// storage classes.
#[must_use]
pub fn map_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Uuid => "TEXT",
        ColumnType::String => "TEXT",
        ColumnType::Text => "TEXT",
        ColumnType::Integer => "INTEGER",
        ColumnType::BigInt => "INTEGER",
        ColumnType::Float => "REAL",
        ColumnType::Decimal => "REAL",
        ColumnType::Boolean => "INTEGER",
        ColumnType::DateTime => "TEXT",
        ColumnType::Date => "TEXT",
        ColumnType::Time => "TEXT",
        ColumnType::Json => "TEXT",
        ColumnType::Binary => "BLOB",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bigint_collapses_to_integer_affinity() {
        assert_eq!(map_type(ColumnType::BigInt), "INTEGER");
    }

    #[test]
    fn datetime_is_stored_as_text() {
        assert_eq!(map_type(ColumnType::DateTime), "TEXT");
    }
}
