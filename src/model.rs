use std::fmt;

/// System fields stored in their own columns. Everything else is a custom
/// attribute stored under `c_<field>`.
pub const RESERVED_FIELDS: &[&str] = &[
    "id",
    "dateCreated",
    "dateModified",
    "createdBy",
    "createdByName",
    "modifiedBy",
    "modifiedByName",
];

pub const CUSTOM_COLUMN_PREFIX: &str = "c_";

/// Identity value bound by the self-exclusion term of a record that has not
/// been persisted yet (`'1' = ?` is always true).
pub const NEW_RECORD_SENTINEL: &str = "1";

/// Physical storage column for a form field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column(String);

impl Column {
    pub fn for_field(field: &str) -> Self {
        if RESERVED_FIELDS.contains(&field) {
            Self(field.to_string())
        } else {
            Self(format!("{CUSTOM_COLUMN_PREFIX}{field}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Comparison operator of a filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    Like,
    NotLike,
    /// Membership in a `;`-packed multi-value column.
    In,
    NotIn,
    IsTrue,
    IsFalse,
    IsNull,
    IsNotNull,
}

impl FilterOperator {
    /// Parse the operator as written in configuration. Case and inner
    /// whitespace are not significant (`is  not null` == `IS NOT NULL`).
    pub fn from_sql(raw: &str) -> Option<Self> {
        let normalized = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        let op = match normalized.as_str() {
            "=" => Self::Eq,
            "<>" | "!=" => Self::NotEq,
            ">" => Self::Gt,
            ">=" => Self::GtEq,
            "<" => Self::Lt,
            "<=" => Self::LtEq,
            "LIKE" => Self::Like,
            "NOT LIKE" => Self::NotLike,
            "IN" => Self::In,
            "NOT IN" => Self::NotIn,
            "IS TRUE" => Self::IsTrue,
            "IS FALSE" => Self::IsFalse,
            "IS NULL" => Self::IsNull,
            "IS NOT NULL" => Self::IsNotNull,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::IsTrue => "IS TRUE",
            Self::IsFalse => "IS FALSE",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }

    /// Operators that take no bound value.
    pub fn is_unary(self) -> bool {
        matches!(
            self,
            Self::IsTrue | Self::IsFalse | Self::IsNull | Self::IsNotNull
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// How a filter clause combines with the clauses before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinOperator {
    #[default]
    And,
    Or,
}

impl JoinOperator {
    pub fn from_sql(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// One configured filter condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    pub field: String,
    pub operator: FilterOperator,
    pub value: String,
    pub join: JoinOperator,
}

impl FilterClause {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            join: JoinOperator::And,
        }
    }

    pub fn with_join(mut self, join: JoinOperator) -> Self {
        self.join = join;
        self
    }

    pub fn column(&self) -> Column {
        Column::for_field(&self.field)
    }
}

/// Predicate fragment with `?` placeholders plus the values bound to them,
/// in placeholder order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledPredicate {
    pub fragment: String,
    pub params: Vec<String>,
}

/// Caller-owned raw predicate text, appended verbatim and never parsed.
/// A malformed fragment is a configuration error of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedFragment(String);

impl TrustedFragment {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The complete predicate handed to the row counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictQuery {
    pub predicate: String,
    pub params: Vec<String>,
}

impl ConflictQuery {
    pub fn placeholder_count(&self) -> usize {
        crate::sql::count_placeholders(&self.predicate)
    }
}

/// Which interval bound a date belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Start,
    End,
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::End => f.write_str("end"),
        }
    }
}

/// The record under validation, with dates already in storage format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    /// `None` for a record that has not been saved yet.
    pub identity: Option<String>,
    pub resource: String,
    pub start: String,
    pub end: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_fields_are_not_prefixed() {
        assert_eq!(Column::for_field("id").as_str(), "id");
        assert_eq!(Column::for_field("dateModified").as_str(), "dateModified");
        assert_eq!(Column::for_field("createdByName").as_str(), "createdByName");
    }

    #[test]
    fn custom_fields_are_prefixed() {
        assert_eq!(Column::for_field("room").as_str(), "c_room");
        // reserved names are case sensitive
        assert_eq!(Column::for_field("ID").as_str(), "c_ID");
    }

    #[test]
    fn operator_parsing_is_lenient_on_case_and_spacing() {
        assert_eq!(FilterOperator::from_sql("is  not null"), Some(FilterOperator::IsNotNull));
        assert_eq!(FilterOperator::from_sql(" not in "), Some(FilterOperator::NotIn));
        assert_eq!(FilterOperator::from_sql("!="), Some(FilterOperator::NotEq));
        assert_eq!(FilterOperator::from_sql("<>"), Some(FilterOperator::NotEq));
        assert_eq!(FilterOperator::from_sql("BETWEEN"), None);
        assert_eq!(FilterOperator::from_sql(""), None);
    }

    #[test]
    fn operator_sql_text() {
        assert_eq!(FilterOperator::NotEq.as_sql(), "<>");
        assert_eq!(FilterOperator::IsNotNull.to_string(), "IS NOT NULL");
        assert!(FilterOperator::IsFalse.is_unary());
        assert!(!FilterOperator::In.is_unary());
    }

    #[test]
    fn join_parsing() {
        assert_eq!(JoinOperator::from_sql("or"), Some(JoinOperator::Or));
        assert_eq!(JoinOperator::from_sql(" AND"), Some(JoinOperator::And));
        assert_eq!(JoinOperator::from_sql("XOR"), None);
        assert_eq!(JoinOperator::default(), JoinOperator::And);
    }

    #[test]
    fn conflict_query_counts_placeholders_outside_literals() {
        let q = ConflictQuery {
            predicate: "id != ? AND c_note = '?' AND (c_start < ? AND ? < c_end)".into(),
            params: vec!["x".into(), "b".into(), "a".into()],
        };
        assert_eq!(q.placeholder_count(), 3);
    }
}
