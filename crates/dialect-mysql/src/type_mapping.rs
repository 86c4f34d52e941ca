use lpdb_core::ColumnType;

/// Type mapping contract table, MySQL column (§4.1).
#[must_use]
pub fn map_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Uuid => "CHAR(36)",
        ColumnType::String => "VARCHAR(255)",
        ColumnType::Text => "TEXT",
        ColumnType::Integer => "INT",
        ColumnType::BigInt => "BIGINT",
        ColumnType::Float => "DOUBLE",
        ColumnType::Decimal => "DECIMAL(10,2)",
        ColumnType::Boolean => "TINYINT(1)",
        ColumnType::DateTime => "DATETIME",
        ColumnType::Date => "DATE",
        ColumnType::Time => "TIME",
        ColumnType::Json => "JSON",
        ColumnType::Binary => "BLOB",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_maps_to_tinyint() {
        assert_eq!(map_type(ColumnType::Boolean), "TINYINT(1)");
    }

    #[test]
    fn uuid_maps_to_fixed_char() {
        assert_eq!(map_type(ColumnType::Uuid), "CHAR(36)");
    }
}
