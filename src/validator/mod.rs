mod conflict;
mod dates;
mod error;
mod filter;

pub use conflict::{ConflictTerms, build_conflict_query};
pub use dates::{DatePattern, PatternError, Shape, normalize};
pub use error::{RegistryError, StoreError, ValidationError, ValidatorError};
pub use filter::{MULTI_VALUE_SEPARATOR, compile_clause, compile_filters, split_candidates};

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::ValidatorConfig;
use crate::model::*;

/// Token in the conflict message replaced by the number of conflicting rows.
pub const DUPLICATE_COUNT_TOKEN: &str = "#duplicate.count#";

pub const START_PARSE_ERROR_MESSAGE: &str = "Parsing start date error";
pub const END_PARSE_ERROR_MESSAGE: &str = "Parsing end date error";

// ── Collaborators ────────────────────────────────────────

/// Read access to the submitted record.
pub trait RecordReader {
    fn form_id(&self) -> &str;
    /// Identity of the record being saved; `None` for a new record.
    fn primary_key(&self) -> Option<&str>;
    fn value(&self, field_id: &str) -> Option<&str>;
}

/// Receives field-level error messages.
pub trait FormErrors {
    fn add_error(&mut self, field_id: &str, message: String);
}

/// Resolves a form id to its physical table.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    async fn resolve_table_name(&self, form_id: &str) -> Result<String, RegistryError>;
}

/// Read-only count of rows in `table` matching `predicate`, with `params`
/// bound to its `?` placeholders in order.
#[async_trait]
pub trait RowCounter: Send + Sync {
    async fn count(&self, table: &str, predicate: &str, params: &[String]) -> Result<u64, StoreError>;
}

// ── Outcome ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Pass,
    Fail {
        error: ValidationError,
        message: String,
    },
}

impl ValidationOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Pass => None,
            Self::Fail { message, .. } => Some(message.as_str()),
        }
    }

    /// Number of conflicting rows, if the failure was a conflict.
    pub fn conflict_count(&self) -> Option<u64> {
        match self {
            Self::Fail {
                error: ValidationError::DuplicateConflict(n),
                ..
            } => Some(*n),
            _ => None,
        }
    }
}

// ── Validator ────────────────────────────────────────────

pub struct OverlapValidator {
    config: ValidatorConfig,
    registry: Arc<dyn SchemaRegistry>,
    counter: Arc<dyn RowCounter>,
}

impl OverlapValidator {
    pub fn new(
        config: ValidatorConfig,
        registry: Arc<dyn SchemaRegistry>,
        counter: Arc<dyn RowCounter>,
    ) -> Self {
        Self {
            config,
            registry,
            counter,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Marker shown next to the field label.
    pub fn decoration(&self) -> &'static str {
        if self.config.mandatory { "*" } else { "" }
    }

    /// Validate and attach the failure message (if any) to `field_id`.
    ///
    /// `values` are the raw submitted values of the validated element,
    /// used by the mandatory check.
    pub async fn validate<R>(
        &self,
        field_id: &str,
        record: &mut R,
        values: &[&str],
    ) -> Result<bool, ValidatorError>
    where
        R: RecordReader + FormErrors,
    {
        match self.check(&*record, values).await? {
            ValidationOutcome::Pass => Ok(true),
            ValidationOutcome::Fail { message, .. } => {
                record.add_error(field_id, message);
                Ok(false)
            }
        }
    }

    /// Run the check without touching the record.
    pub async fn check<R>(&self, record: &R, values: &[&str]) -> Result<ValidationOutcome, ValidatorError>
    where
        R: RecordReader + ?Sized,
    {
        let result = self.run(record, values).await;
        metrics::counter!(
            crate::observability::VALIDATIONS_TOTAL,
            "outcome" => crate::observability::outcome_label(&result)
        )
        .increment(1);
        result
    }

    async fn run<R>(&self, record: &R, values: &[&str]) -> Result<ValidationOutcome, ValidatorError>
    where
        R: RecordReader + ?Sized,
    {
        if self.config.mandatory && !all_present(values) {
            return Ok(self.fail(ValidationError::MandatoryMissing));
        }

        let candidate = match self.candidate(record) {
            Ok(candidate) => candidate,
            Err(error) => {
                warn!(form = record.form_id(), "{error}");
                return Ok(self.fail(error));
            }
        };

        let query = self.conflict_query(&candidate);
        let table = self.registry.resolve_table_name(record.form_id()).await?;
        debug!(
            table = %table,
            predicate = %query.predicate,
            params = ?query.params,
            "counting overlapping rows"
        );

        let started = Instant::now();
        let count = self
            .counter
            .count(&table, &query.predicate, &query.params)
            .await?;
        metrics::histogram!(crate::observability::COUNT_QUERY_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        if count == 0 {
            return Ok(ValidationOutcome::Pass);
        }
        info!(
            table = %table,
            resource = %candidate.resource,
            start = %candidate.start,
            end = %candidate.end,
            count,
            "overlap detected"
        );
        Ok(self.fail(ValidationError::DuplicateConflict(count)))
    }

    /// Read the record and normalize its interval bounds.
    pub fn candidate<R>(&self, record: &R) -> Result<CandidateRecord, ValidationError>
    where
        R: RecordReader + ?Sized,
    {
        let cfg = &self.config;
        let start = normalize(
            record.value(&cfg.start_date).unwrap_or_default(),
            &cfg.display_format,
            &cfg.data_format,
            DateField::Start,
        )?;
        let end = normalize(
            record.value(&cfg.end_date).unwrap_or_default(),
            &cfg.display_format,
            &cfg.data_format,
            DateField::End,
        )?;
        let resource = cfg
            .resource
            .as_deref()
            .and_then(|field| record.value(field))
            .unwrap_or_default()
            .to_string();

        Ok(CandidateRecord {
            identity: record
                .primary_key()
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            resource,
            start,
            end,
        })
    }

    /// Compile filters and assemble the conflict query for `candidate`.
    pub fn conflict_query(&self, candidate: &CandidateRecord) -> ConflictQuery {
        let cfg = &self.config;
        let filter = compile_filters(&cfg.filters);
        let resource_column = cfg.resource_column();
        let start_column = cfg.start_column();
        let end_column = cfg.end_column();

        build_conflict_query(&ConflictTerms {
            identity: candidate.identity.as_deref(),
            extra: cfg.extra_condition.as_ref(),
            filter: filter.as_ref(),
            resource: resource_column
                .as_ref()
                .map(|column| (column, candidate.resource.as_str())),
            start_column: &start_column,
            end_column: &end_column,
            start: &candidate.start,
            end: &candidate.end,
        })
    }

    fn fail(&self, error: ValidationError) -> ValidationOutcome {
        let message = match &error {
            ValidationError::MandatoryMissing => self.config.mandatory_error_message.clone(),
            ValidationError::DateParseFailure(DateField::Start) => START_PARSE_ERROR_MESSAGE.to_string(),
            ValidationError::DateParseFailure(DateField::End) => END_PARSE_ERROR_MESSAGE.to_string(),
            ValidationError::DuplicateConflict(count) => self
                .config
                .error_message
                .replace(DUPLICATE_COUNT_TOKEN, &count.to_string()),
        };
        ValidationOutcome::Fail { error, message }
    }
}

fn all_present(values: &[&str]) -> bool {
    !values.is_empty() && values.iter().all(|v| !v.trim().is_empty())
}
