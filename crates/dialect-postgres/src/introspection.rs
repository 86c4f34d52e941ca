//! Catalog query text the introspector issues against PostgreSQL (§4.5).
//! These are plain `&'static str`; `lpdb-driver` binds and executes them.
//! Every selected column is cast to `text` so the dialect-agnostic
//! `sqlx::Any` row decodes it the same way every other row in this
//! workspace is decoded: as a plain `String`.

pub const TABLES_QUERY: &str = r"
SELECT table_name
FROM information_schema.tables
WHERE table_schema = current_schema()
  AND table_type = 'BASE TABLE'
ORDER BY table_name
";

pub const COLUMNS_QUERY: &str = r"
SELECT
    column_name::text AS column_name,
    data_type::text AS data_type,
    udt_name::text AS udt_name,
    (is_nullable = 'YES')::text AS is_nullable,
    column_default::text AS column_default,
    character_maximum_length::text AS character_maximum_length,
    numeric_precision::text AS numeric_precision,
    numeric_scale::text AS numeric_scale,
    (is_identity = 'YES')::text AS is_identity,
    identity_generation::text AS identity_generation
FROM information_schema.columns
WHERE table_schema = current_schema()
  AND table_name = $1
ORDER BY ordinal_position
";

pub const INDEXES_QUERY: &str = r"
SELECT
    ic.relname::text AS index_name,
    a.attname::text AS column_name,
    ix.indisunique::text AS is_unique,
    ix.indisprimary::text AS is_primary,
    am.amname::text AS index_type,
    pg_get_expr(ix.indpred, ix.indrelid)::text AS expression
FROM pg_index ix
JOIN pg_class t ON t.oid = ix.indrelid
JOIN pg_class ic ON ic.oid = ix.indexrelid
JOIN pg_am am ON am.oid = ic.relam
JOIN unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord) ON true
JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
WHERE t.relname = $1
ORDER BY index_name, k.ord
";

pub const FOREIGN_KEYS_QUERY: &str = r"
SELECT
    con.conname::text AS constraint_name,
    att.attname::text AS column_name,
    ref.relname::text AS referenced_table,
    refatt.attname::text AS referenced_column,
    con.confdeltype::text AS on_delete,
    con.confupdtype::text AS on_update
FROM pg_constraint con
JOIN pg_class t ON t.oid = con.conrelid
JOIN pg_class ref ON ref.oid = con.confrelid
JOIN unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord) ON true
JOIN pg_attribute att ON att.attrelid = t.oid AND att.attnum = k.attnum
JOIN unnest(con.confkey) WITH ORDINALITY AS rk(attnum, ord) ON rk.ord = k.ord
JOIN pg_attribute refatt ON refatt.attrelid = ref.oid AND refatt.attnum = rk.attnum
WHERE con.contype = 'f'
  AND t.relname = $1
ORDER BY constraint_name, k.ord
";
