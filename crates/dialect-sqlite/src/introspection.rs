//! Catalog query text the introspector issues against SQLite (§4.5).
//! SQLite exposes metadata through the `pragma_*` table-valued functions
//! rather than `information_schema`, so these take the table name as an
//! ordinary bound parameter (`?`) just like the other two dialects, and
//! cast every column to `TEXT` so the dialect-agnostic `sqlx::Any` row
//! decodes it the same way every other row in this workspace is decoded.

pub const TABLES_QUERY: &str = r"
SELECT name
FROM sqlite_master
WHERE type = 'table'
ORDER BY name
";

pub const COLUMNS_QUERY: &str = r#"
SELECT
    CAST(name AS TEXT) AS column_name,
    CAST(type AS TEXT) AS data_type,
    CAST(type AS TEXT) AS udt_name,
    CASE WHEN "notnull" = 0 THEN 'true' ELSE 'false' END AS is_nullable,
    CAST(dflt_value AS TEXT) AS column_default,
    CAST(NULL AS TEXT) AS character_maximum_length,
    CAST(NULL AS TEXT) AS numeric_precision,
    CAST(NULL AS TEXT) AS numeric_scale,
    CASE WHEN pk > 0 THEN 'true' ELSE 'false' END AS is_identity,
    CAST(NULL AS TEXT) AS identity_generation
FROM pragma_table_info(?)
ORDER BY cid
"#;

pub const INDEXES_QUERY: &str = r#"
SELECT
    CAST(il.name AS TEXT) AS index_name,
    CAST(ii.name AS TEXT) AS column_name,
    CASE WHEN il."unique" = 0 THEN 'false' ELSE 'true' END AS is_unique,
    CASE WHEN il.origin = 'pk' THEN 'true' ELSE 'false' END AS is_primary,
    'index' AS index_type,
    CAST(NULL AS TEXT) AS expression
FROM pragma_index_list(?) il
JOIN pragma_index_info(il.name) ii
ORDER BY il.name, ii.seqno
"#;

pub const FOREIGN_KEYS_QUERY: &str = r#"
SELECT
    CAST('fk_' || id AS TEXT) AS constraint_name,
    CAST("from" AS TEXT) AS column_name,
    CAST("table" AS TEXT) AS referenced_table,
    CAST("to" AS TEXT) AS referenced_column,
    CAST(on_delete AS TEXT) AS on_delete,
    CAST(on_update AS TEXT) AS on_update
FROM pragma_foreign_key_list(?)
ORDER BY id, seq
"#;
