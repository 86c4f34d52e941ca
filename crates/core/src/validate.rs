use crate::{Error, Result, ir::SchemaDefinition};

const REQUIRED_COLUMNS: [&str; 3] = ["id", "app_id", "organization_id"];
const TENANT_COLUMNS: [&str; 2] = ["app_id", "organization_id"];

/// Validates the §3 invariants the registry enforces on every declared
/// schema. Returns the first violation found, scanning tables in their
/// declared (`BTreeMap`, i.e. name-sorted) order.
pub fn validate_schema(schema: &SchemaDefinition) -> Result<()> {
    for (table_name, table) in &schema.tables {
        for required in REQUIRED_COLUMNS {
            if !table.columns.contains_key(required) {
                return Err(Error::SchemaValidation {
                    table: table_name.clone(),
                    reason: format!("missing required column `{required}`"),
                });
            }
        }

        for tenant_column in TENANT_COLUMNS {
            let column = table
                .columns
                .get(tenant_column)
                .expect("presence checked above");
            if !column.tenant {
                return Err(Error::SchemaValidation {
                    table: table_name.clone(),
                    reason: format!("column `{tenant_column}` must carry the tenant flag"),
                });
            }
        }

        let single_column_pk_count = table.columns.values().filter(|column| column.primary_key).count();
        if table.primary_key.is_none() && single_column_pk_count > 1 {
            return Err(Error::SchemaValidation {
                table: table_name.clone(),
                reason: "more than one column flags primaryKey without a composite primaryKey list".to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnDefinition, ColumnType, TableDefinition};

    fn valid_table() -> TableDefinition {
        TableDefinition::new()
            .with_column("id", ColumnDefinition::new(ColumnType::Uuid).primary_key())
            .with_column("app_id", ColumnDefinition::new(ColumnType::Uuid).tenant())
            .with_column("organization_id", ColumnDefinition::new(ColumnType::Uuid).tenant())
    }

    #[test]
    fn accepts_a_schema_with_the_required_columns() {
        let schema = SchemaDefinition::new().with_table("users", valid_table());
        assert!(validate_schema(&schema).is_ok());
    }

    #[test]
    fn rejects_a_table_missing_app_id() {
        let mut table = valid_table();
        table.columns.shift_remove("app_id");
        let schema = SchemaDefinition::new().with_table("users", table);

        let err = validate_schema(&schema).unwrap_err();
        assert!(matches!(err, Error::SchemaValidation { table, .. } if table == "users"));
    }

    #[test]
    fn rejects_a_tenant_column_missing_the_tenant_flag() {
        let mut table = valid_table();
        table.columns.get_mut("app_id").unwrap().tenant = false;
        let schema = SchemaDefinition::new().with_table("users", table);

        assert!(validate_schema(&schema).is_err());
    }

    #[test]
    fn rejects_multiple_primary_key_columns_without_a_composite_list() {
        let mut table = valid_table();
        table.columns.get_mut("app_id").unwrap().primary_key = true;
        let schema = SchemaDefinition::new().with_table("users", table);

        assert!(validate_schema(&schema).is_err());
    }

    #[test]
    fn accepts_multiple_primary_key_columns_with_an_explicit_composite_list() {
        let mut table = valid_table();
        table.columns.get_mut("app_id").unwrap().primary_key = true;
        table.primary_key = Some(vec!["id".to_string(), "app_id".to_string()]);
        let schema = SchemaDefinition::new().with_table("users", table);

        assert!(validate_schema(&schema).is_ok());
    }
}
