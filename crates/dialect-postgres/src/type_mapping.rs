use lpdb_core::ColumnType;

/// Type mapping contract table, PostgreSQL column (§4.1). Unknown types are
/// not representable here since [`ColumnType`] is a closed set; every
/// variant has an explicit mapping.
#[must_use]
pub fn map_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Uuid => "UUID",
        ColumnType::String => "TEXT",
        ColumnType::Text => "TEXT",
        ColumnType::Integer => "INTEGER",
        ColumnType::BigInt => "BIGINT",
        ColumnType::Float => "DOUBLE PRECISION",
        ColumnType::Decimal => "NUMERIC",
        ColumnType::Boolean => "BOOLEAN",
        ColumnType::DateTime => "TIMESTAMPTZ",
        ColumnType::Date => "DATE",
        ColumnType::Time => "TIME",
        ColumnType::Json => "JSONB",
        ColumnType::Binary => "BYTEA",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_semantic_type_maps_to_the_contract_table() {
        assert_eq!(map_type(ColumnType::Uuid), "UUID");
        assert_eq!(map_type(ColumnType::Json), "JSONB");
        assert_eq!(map_type(ColumnType::Boolean), "BOOLEAN");
    }
}
