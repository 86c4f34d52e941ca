use std::cmp::Ordering;

/// The closed set of semantic column types the declarative model understands.
///
/// Ordinal position matters: [`ColumnType::breaking_rank`] uses declaration
/// order to decide whether a `column_modify` narrows a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Uuid,
    Boolean,
    Integer,
    BigInt,
    Float,
    Decimal,
    String,
    Text,
    Date,
    Time,
    DateTime,
    Json,
    Binary,
}

impl ColumnType {
    /// Position in the widening order `uuid < boolean < integer < bigint <
    /// float < decimal < string < text < date < time < datetime < json <
    /// binary`, used by the diff engine's breaking-change classification.
    #[must_use]
    pub const fn breaking_rank(self) -> u8 {
        match self {
            Self::Uuid => 0,
            Self::Boolean => 1,
            Self::Integer => 2,
            Self::BigInt => 3,
            Self::Float => 4,
            Self::Decimal => 5,
            Self::String => 6,
            Self::Text => 7,
            Self::Date => 8,
            Self::Time => 9,
            Self::DateTime => 10,
            Self::Json => 11,
            Self::Binary => 12,
        }
    }

    #[must_use]
    pub fn cmp_rank(self, other: Self) -> Ordering {
        self.breaking_rank().cmp(&other.breaking_rank())
    }
}

/// Action a foreign key performs when its target row is deleted or updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    Restrict,
    NoAction,
}

impl Default for ReferentialAction {
    fn default() -> Self {
        Self::NoAction
    }
}
