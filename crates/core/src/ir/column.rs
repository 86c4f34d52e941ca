use serde::{Deserialize, Serialize};

use super::types::{ColumnType, ReferentialAction};

/// A foreign-key reference declared on a column.
///
/// The target table is assumed to exist either in the same
/// [`super::schema::SchemaDefinition`] or pre-existing in the live database;
/// the registry does not validate this transitively (§3 invariant 4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub table: String,
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferentialAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferentialAction>,
}

/// One column in a [`super::table::TableDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, rename = "primaryKey")]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
    /// Dialect-neutral default expression text. Certain tokens
    /// (`gen_random_uuid()`, `now()`/`NOW()`) are rewritten per dialect by
    /// the emitter rather than here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Reference>,
    /// Marks `app_id` / `organization_id` columns so the registry and the
    /// compiler can identify the tenant-scoping columns.
    #[serde(default)]
    pub tenant: bool,
}

impl ColumnDefinition {
    #[must_use]
    pub fn new(column_type: ColumnType) -> Self {
        Self {
            column_type,
            nullable: false,
            primary_key: false,
            unique: false,
            default: None,
            references: None,
            tenant: false,
        }
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    #[must_use]
    pub fn tenant(mut self) -> Self {
        self.tenant = true;
        self
    }

    #[must_use]
    pub fn references(mut self, reference: Reference) -> Self {
        self.references = Some(reference);
        self
    }

    /// Structural equality used by the diff engine to decide `column_modify`
    /// (§4.6): type, nullable, unique, default text, and references after
    /// canonical ordering.
    #[must_use]
    pub fn diff_eq(&self, other: &Self) -> bool {
        self.column_type == other.column_type
            && self.nullable == other.nullable
            && self.unique == other.unique
            && self.default == other.default
            && self.references == other.references
    }
}
