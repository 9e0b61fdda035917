use std::path::Path;

use serde::Deserialize;

use crate::limits::*;
use crate::model::*;
use crate::validator::{DatePattern, PatternError, split_candidates};

pub const DEFAULT_ERROR_MESSAGE: &str =
    "The selected time overlaps #duplicate.count# existing record(s)";
pub const DEFAULT_MANDATORY_ERROR_MESSAGE: &str = "Missing required value";

/// Validator configuration, checked once at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    pub mandatory: bool,
    pub mandatory_error_message: String,
    /// Field scoping the overlap check per resource. `None` checks across all rows.
    pub resource: Option<String>,
    pub start_date: String,
    pub end_date: String,
    /// Storage date pattern.
    pub data_format: DatePattern,
    /// Input date pattern.
    pub display_format: DatePattern,
    pub extra_condition: Option<TrustedFragment>,
    pub filters: Vec<FilterClause>,
    /// Supports `#duplicate.count#`.
    pub error_message: String,
}

impl ValidatorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Read)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(content).map_err(ConfigError::Parse)?;
        Self::try_from(raw)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_value(value).map_err(ConfigError::Parse)?;
        Self::try_from(raw)
    }

    pub fn start_column(&self) -> Column {
        Column::for_field(&self.start_date)
    }

    pub fn end_column(&self) -> Column {
        Column::for_field(&self.end_date)
    }

    pub fn resource_column(&self) -> Option<Column> {
        self.resource.as_deref().map(Column::for_field)
    }
}

// ── Raw (wire) form ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default, deserialize_with = "flag")]
    mandatory: bool,
    #[serde(default)]
    mandatory_error_message: String,
    #[serde(default)]
    resource: String,
    #[serde(default)]
    start_date: String,
    #[serde(default)]
    end_date: String,
    #[serde(default)]
    data_format: String,
    #[serde(default)]
    display_format: String,
    #[serde(default)]
    extra_condition: String,
    #[serde(default)]
    filters: Vec<RawFilter>,
    #[serde(default)]
    error_message: String,
}

#[derive(Debug, Deserialize)]
struct RawFilter {
    #[serde(default)]
    field: String,
    #[serde(default)]
    operator: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    join: String,
}

/// Accepts `true`/`false` or the string forms the form builder stores.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.trim().eq_ignore_ascii_case("true"),
    })
}

impl TryFrom<RawConfig> for ValidatorConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let start_date = required_field_id("startDate", raw.start_date)?;
        let end_date = required_field_id("endDate", raw.end_date)?;
        let resource = if raw.resource.trim().is_empty() {
            None
        } else {
            Some(checked_field_id("resource", raw.resource.trim().to_string())?)
        };

        let data_format = date_pattern("dataFormat", &raw.data_format)?;
        let display_format = date_pattern("displayFormat", &raw.display_format)?;

        let extra_condition = match raw.extra_condition.trim() {
            "" => None,
            extra => {
                if extra.len() > MAX_EXTRA_CONDITION_LEN {
                    return Err(ConfigError::LimitExceeded("extra condition too long"));
                }
                // Nothing is bound for the fragment, so it can't carry placeholders.
                if crate::sql::count_placeholders(extra) > 0 {
                    return Err(ConfigError::ExtraConditionPlaceholder);
                }
                Some(TrustedFragment::new(extra))
            }
        };

        if raw.filters.len() > MAX_FILTER_CLAUSES {
            return Err(ConfigError::LimitExceeded("too many filter clauses"));
        }
        let filters = raw
            .filters
            .into_iter()
            .map(filter_clause)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            mandatory: raw.mandatory,
            mandatory_error_message: non_empty_or(
                raw.mandatory_error_message,
                DEFAULT_MANDATORY_ERROR_MESSAGE,
            ),
            resource,
            start_date,
            end_date,
            data_format,
            display_format,
            extra_condition,
            filters,
            error_message: non_empty_or(raw.error_message, DEFAULT_ERROR_MESSAGE),
        })
    }
}

fn filter_clause(raw: RawFilter) -> Result<FilterClause, ConfigError> {
    let field = required_field_id("filters.field", raw.field)?;
    let operator = FilterOperator::from_sql(&raw.operator).ok_or_else(|| {
        ConfigError::UnknownOperator {
            field: field.clone(),
            operator: raw.operator.clone(),
        }
    })?;
    let join = if raw.join.trim().is_empty() {
        JoinOperator::default()
    } else {
        JoinOperator::from_sql(&raw.join).ok_or_else(|| ConfigError::UnknownJoin {
            field: field.clone(),
            join: raw.join.clone(),
        })?
    };
    if matches!(operator, FilterOperator::In | FilterOperator::NotIn)
        && split_candidates(&raw.value).count() > MAX_IN_CANDIDATES
    {
        return Err(ConfigError::LimitExceeded("too many IN candidates"));
    }
    Ok(FilterClause {
        field,
        operator,
        value: raw.value,
        join,
    })
}

fn required_field_id(key: &'static str, value: String) -> Result<String, ConfigError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ConfigError::MissingField(key));
    }
    checked_field_id(key, value)
}

/// Field ids are interpolated into predicate text, so only identifier
/// characters are allowed.
fn checked_field_id(key: &'static str, value: String) -> Result<String, ConfigError> {
    if value.len() > MAX_FIELD_ID_LEN {
        return Err(ConfigError::LimitExceeded("field id too long"));
    }
    let mut chars = value.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(ConfigError::InvalidFieldId { key, value });
    }
    Ok(value)
}

fn date_pattern(key: &'static str, value: &str) -> Result<DatePattern, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField(key));
    }
    DatePattern::new(value).map_err(|source| ConfigError::DateFormat { key, source })
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Read(std::io::Error),
    Parse(serde_json::Error),
    MissingField(&'static str),
    InvalidFieldId { key: &'static str, value: String },
    UnknownOperator { field: String, operator: String },
    UnknownJoin { field: String, join: String },
    DateFormat { key: &'static str, source: PatternError },
    ExtraConditionPlaceholder,
    LimitExceeded(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read(e) => write!(f, "cannot read config: {e}"),
            ConfigError::Parse(e) => write!(f, "cannot parse config: {e}"),
            ConfigError::MissingField(key) => write!(f, "missing config value: {key}"),
            ConfigError::InvalidFieldId { key, value } => {
                write!(f, "{key}: invalid field id {value:?}")
            }
            ConfigError::UnknownOperator { field, operator } => {
                write!(f, "filter on {field}: unknown operator {operator:?}")
            }
            ConfigError::UnknownJoin { field, join } => {
                write!(f, "filter on {field}: unknown join {join:?}")
            }
            ConfigError::DateFormat { key, source } => write!(f, "{key}: {source}"),
            ConfigError::ExtraConditionPlaceholder => {
                write!(f, "extraCondition must not contain ? placeholders")
            }
            ConfigError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::DateFormat { source, .. } => Some(source),
            _ => None,
        }
    }
}
