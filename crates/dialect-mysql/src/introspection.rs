//! Catalog query text the introspector issues against MySQL (§4.5). Every
//! selected column is cast to `CHAR` (booleans via an explicit `CASE WHEN`
//! to `'true'`/`'false'`, matching the other two dialects) so the
//! dialect-agnostic `sqlx::Any` row decodes it the same way every other row
//! in this workspace is decoded: as a plain `String`.

pub const TABLES_QUERY: &str = r"
SELECT table_name
FROM information_schema.tables
WHERE table_schema = DATABASE()
  AND table_type = 'BASE TABLE'
ORDER BY table_name
";

pub const COLUMNS_QUERY: &str = r"
SELECT
    CAST(column_name AS CHAR) AS column_name,
    CAST(data_type AS CHAR) AS data_type,
    CAST(column_type AS CHAR) AS udt_name,
    CASE WHEN is_nullable = 'YES' THEN 'true' ELSE 'false' END AS is_nullable,
    CAST(column_default AS CHAR) AS column_default,
    CAST(character_maximum_length AS CHAR) AS character_maximum_length,
    CAST(numeric_precision AS CHAR) AS numeric_precision,
    CAST(numeric_scale AS CHAR) AS numeric_scale,
    CASE WHEN extra LIKE '%auto_increment%' THEN 'true' ELSE 'false' END AS is_identity,
    CAST(extra AS CHAR) AS identity_generation
FROM information_schema.columns
WHERE table_schema = DATABASE()
  AND table_name = ?
ORDER BY ordinal_position
";

pub const INDEXES_QUERY: &str = r"
SELECT
    CAST(index_name AS CHAR) AS index_name,
    CAST(column_name AS CHAR) AS column_name,
    CASE WHEN non_unique = 0 THEN 'true' ELSE 'false' END AS is_unique,
    CASE WHEN index_name = 'PRIMARY' THEN 'true' ELSE 'false' END AS is_primary,
    CAST(index_type AS CHAR) AS index_type,
    CAST(NULL AS CHAR) AS expression
FROM information_schema.statistics
WHERE table_schema = DATABASE()
  AND table_name = ?
ORDER BY index_name, seq_in_index
";

pub const FOREIGN_KEYS_QUERY: &str = r"
SELECT
    CAST(kcu.constraint_name AS CHAR) AS constraint_name,
    CAST(kcu.column_name AS CHAR) AS column_name,
    CAST(kcu.referenced_table_name AS CHAR) AS referenced_table,
    CAST(kcu.referenced_column_name AS CHAR) AS referenced_column,
    CAST(rc.delete_rule AS CHAR) AS on_delete,
    CAST(rc.update_rule AS CHAR) AS on_update
FROM information_schema.key_column_usage kcu
JOIN information_schema.referential_constraints rc
    ON rc.constraint_schema = kcu.constraint_schema
   AND rc.constraint_name = kcu.constraint_name
WHERE kcu.table_schema = DATABASE()
  AND kcu.table_name = ?
  AND kcu.referenced_table_name IS NOT NULL
ORDER BY kcu.constraint_name, kcu.ordinal_position
";
